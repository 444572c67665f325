//! Action catalog
//!
//! A catalog is the embedder's set of semantic actions for one grammar, indexed by the
//! operator/token id they answer to and by arity:
//!
//!     term        fn(&Invocation) -> R                      one per matched token
//!     unary       fn(&Invocation, A) -> R                   prefix/postfix ops, enclosures, top level
//!     binary      fn(&Invocation, L, R) -> Out              infix ops, glue, leading enclosures
//!     converter   fn(&Invocation, I) -> O                   single-hop coercion, tried only when
//!                                                           an argument can't be produced directly
//!
//! Registration is typed; the catalog stores everything type-erased next to an
//! [`ActionSignature`] so that the resolver and the validator can reason over [`TypeKey`]s.
//! Several actions may share an id and arity; they are tried in registration order.
//!
//! Candidate lists (actions for an id/arity whose return type is assignable to a requested
//! type) are computed on first use and cached. The cache is safe to fill from several threads.

use crate::error::CatalogError;
use crate::lexing::Token;
use crate::parsing::Arity;
use crate::semantics::types::{TypeKey, TypeUniverse, UniverseBuilder, Value};
use once_cell::sync::OnceCell;
use std::any::type_name;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// What an action sees besides its arguments
pub struct Invocation<'a, C> {
    /// Embedder context passed to the parse call
    pub context: &'a C,
    /// The token of the node being resolved (operator token for unary/binary nodes)
    pub token: &'a Token,
}

impl<'a, C> Invocation<'a, C> {
    pub fn text(&self) -> &str {
        self.token.text()
    }
}

/// Failure reported by an action or converter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// The action doesn't apply to these inputs; the resolver moves on to the next candidate.
    #[error("{0}")]
    Decline(String),
    /// The action applies but the input is invalid; the parse fails.
    #[error("{0}")]
    Reject(String),
}

/// Which converters may be used to coerce one argument
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Allow {
    #[default]
    Any,
    Only(Vec<Arc<str>>),
}

impl Allow {
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Allow::Only(names.into_iter().map(|s| Arc::from(s.as_ref())).collect())
    }

    /// No converter may be applied to the argument.
    pub fn none() -> Self {
        Allow::Only(Vec::new())
    }

    pub fn permits(&self, converter: &str) -> bool {
        match self {
            Allow::Any => true,
            Allow::Only(names) => names.iter().any(|n| &**n == converter),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSignature {
    op: Arc<str>,
    arity: Arity,
    returns: TypeKey,
    args: Vec<TypeKey>,
    allow: Vec<Allow>,
}

impl ActionSignature {
    pub fn op(&self) -> &Arc<str> {
        &self.op
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn returns(&self) -> TypeKey {
        self.returns
    }

    pub fn args(&self) -> &[TypeKey] {
        &self.args
    }

    pub fn allow(&self) -> &[Allow] {
        &self.allow
    }
}

impl fmt::Display for ActionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' (", self.arity, self.op)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ") -> {}", self.returns)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionSignature {
    name: Arc<str>,
    input: TypeKey,
    output: TypeKey,
}

impl ConversionSignature {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input(&self) -> TypeKey {
        self.input
    }

    pub fn output(&self) -> TypeKey {
        self.output
    }
}

impl fmt::Display for ConversionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "converter '{}' {} -> {}", self.name, self.input, self.output)
    }
}

type ActionFn<C> =
    Arc<dyn Fn(&Invocation<'_, C>, Vec<Value>) -> Result<Value, ActionError> + Send + Sync>;
type ConvertFn<C> =
    Arc<dyn Fn(&Invocation<'_, C>, Value) -> Result<Value, ActionError> + Send + Sync>;

pub(crate) struct Action<C> {
    pub(crate) signature: ActionSignature,
    pub(crate) call: ActionFn<C>,
}

pub(crate) struct Converter<C> {
    pub(crate) signature: ConversionSignature,
    pub(crate) call: ConvertFn<C>,
}

/// A bundle of registrations that can be added to a builder in one go.
///
/// Closures taking and returning a builder are sources too, so a library of actions can be
/// shared as a plain function.
pub trait ActionSource<C> {
    fn register(self, builder: CatalogBuilder<C>) -> CatalogBuilder<C>;
}

impl<C, F> ActionSource<C> for F
where
    F: FnOnce(CatalogBuilder<C>) -> CatalogBuilder<C>,
{
    fn register(self, builder: CatalogBuilder<C>) -> CatalogBuilder<C> {
        self(builder)
    }
}

fn boxed<T: 'static>(value: T) -> Value {
    Box::new(value)
}

fn take<T: 'static>(value: Option<Value>) -> Result<T, ActionError> {
    match value.map(|v| v.downcast::<T>()) {
        Some(Ok(v)) => Ok(*v),
        _ => Err(ActionError::Decline(format!(
            "expected an argument of type {}",
            type_name::<T>()
        ))),
    }
}

pub struct CatalogBuilder<C> {
    actions: Vec<Action<C>>,
    converters: Vec<Converter<C>>,
    universe: UniverseBuilder,
    results: Vec<TypeKey>,
}

impl<C: 'static> Default for CatalogBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: 'static> CatalogBuilder<C> {
    pub fn new() -> Self {
        Self {
            actions: Vec::new(),
            converters: Vec::new(),
            universe: UniverseBuilder::default(),
            results: Vec::new(),
        }
    }

    /// Register an action for tokens matched by the term rule `op`.
    pub fn term<R, F>(self, op: &str, action: F) -> Self
    where
        R: 'static,
        F: Fn(&Invocation<'_, C>) -> Result<R, ActionError> + Send + Sync + 'static,
    {
        let call: ActionFn<C> = Arc::new(move |inv: &Invocation<'_, C>, _args: Vec<Value>| {
            action(inv).map(boxed)
        });
        self.push_action(op, Arity::Term, TypeKey::of::<R>(), Vec::new(), Vec::new(), call)
    }

    pub fn unary<A, R, F>(self, op: &str, action: F) -> Self
    where
        A: 'static,
        R: 'static,
        F: Fn(&Invocation<'_, C>, A) -> Result<R, ActionError> + Send + Sync + 'static,
    {
        self.unary_from(op, Allow::Any, action)
    }

    /// Like [`unary`](Self::unary), restricting which converters may coerce the operand.
    pub fn unary_from<A, R, F>(self, op: &str, allow: Allow, action: F) -> Self
    where
        A: 'static,
        R: 'static,
        F: Fn(&Invocation<'_, C>, A) -> Result<R, ActionError> + Send + Sync + 'static,
    {
        let call: ActionFn<C> = Arc::new(move |inv: &Invocation<'_, C>, mut args: Vec<Value>| {
            let operand = take::<A>(args.pop())?;
            action(inv, operand).map(boxed)
        });
        self.push_action(
            op,
            Arity::Unary,
            TypeKey::of::<R>(),
            vec![TypeKey::of::<A>()],
            vec![allow],
            call,
        )
    }

    pub fn binary<L, R, Out, F>(self, op: &str, action: F) -> Self
    where
        L: 'static,
        R: 'static,
        Out: 'static,
        F: Fn(&Invocation<'_, C>, L, R) -> Result<Out, ActionError> + Send + Sync + 'static,
    {
        self.binary_from(op, Allow::Any, Allow::Any, action)
    }

    /// Like [`binary`](Self::binary), restricting which converters may coerce each side.
    pub fn binary_from<L, R, Out, F>(self, op: &str, left: Allow, right: Allow, action: F) -> Self
    where
        L: 'static,
        R: 'static,
        Out: 'static,
        F: Fn(&Invocation<'_, C>, L, R) -> Result<Out, ActionError> + Send + Sync + 'static,
    {
        let call: ActionFn<C> = Arc::new(move |inv: &Invocation<'_, C>, mut args: Vec<Value>| {
            let rhs = take::<R>(args.pop())?;
            let lhs = take::<L>(args.pop())?;
            action(inv, lhs, rhs).map(boxed)
        });
        self.push_action(
            op,
            Arity::Binary,
            TypeKey::of::<Out>(),
            vec![TypeKey::of::<L>(), TypeKey::of::<R>()],
            vec![left, right],
            call,
        )
    }

    /// Register a named single-hop conversion from `I` to `O`.
    pub fn converter<I, O, F>(mut self, name: &str, convert: F) -> Self
    where
        I: 'static,
        O: 'static,
        F: Fn(&Invocation<'_, C>, I) -> Result<O, ActionError> + Send + Sync + 'static,
    {
        let signature = ConversionSignature {
            name: Arc::from(name),
            input: TypeKey::of::<I>(),
            output: TypeKey::of::<O>(),
        };
        self.universe.mention(signature.input);
        self.universe.mention(signature.output);
        let call: ConvertFn<C> = Arc::new(move |inv: &Invocation<'_, C>, value: Value| {
            let input = take::<I>(Some(value))?;
            convert(inv, input).map(boxed)
        });
        self.converters.push(Converter { signature, call });
        self
    }

    /// Declare `Vec<E>` a homogeneous sequence of `E`: a single `E` is accepted where the
    /// sequence is expected.
    pub fn sequence<E: 'static>(mut self) -> Self {
        self.universe.sequence::<E>();
        self
    }

    /// Declare `Sub` assignable to `Super`, widening values with `upcast`.
    pub fn subtype<Sub, Super, F>(mut self, upcast: F) -> Self
    where
        Sub: 'static,
        Super: 'static,
        F: Fn(Sub) -> Super + Send + Sync + 'static,
    {
        self.universe.subtype(
            TypeKey::of::<Sub>(),
            TypeKey::of::<Super>(),
            Arc::new(move |value: Value| match value.downcast::<Sub>() {
                Ok(sub) => Box::new(upcast(*sub)),
                Err(value) => value,
            }),
        );
        self
    }

    /// Declare `T` a type parse results are requested as.
    pub fn result<T: 'static>(mut self) -> Self {
        let key = TypeKey::of::<T>();
        self.universe.mention(key);
        if !self.results.contains(&key) {
            self.results.push(key);
        }
        self
    }

    pub fn source(self, source: impl ActionSource<C>) -> Self {
        source.register(self)
    }

    pub fn build(self) -> Result<Catalog<C>, CatalogError> {
        let universe = self.universe.build();
        check_converters(&self.converters, &universe)?;

        let mut by_op: HashMap<(Arity, Arc<str>), Vec<usize>> = HashMap::new();
        for (index, action) in self.actions.iter().enumerate() {
            let key = (action.signature.arity, Arc::clone(&action.signature.op));
            by_op.entry(key).or_default().push(index);
        }

        let catalog = Catalog {
            actions: self.actions,
            converters: self.converters,
            by_op,
            universe,
            results: self.results,
            candidates: LookupCache::default(),
            conversions: LookupCache::default(),
        };
        tracing::debug!(
            terms = catalog.term_actions().count(),
            unary = catalog.unary_actions().count(),
            binary = catalog.binary_actions().count(),
            converters = catalog.converters.len(),
            types = catalog.universe.types().len(),
            "catalog built"
        );
        Ok(catalog)
    }

    fn push_action(
        mut self,
        op: &str,
        arity: Arity,
        returns: TypeKey,
        args: Vec<TypeKey>,
        allow: Vec<Allow>,
        call: ActionFn<C>,
    ) -> Self {
        self.universe.mention(returns);
        for arg in &args {
            self.universe.mention(*arg);
        }
        let signature = ActionSignature {
            op: Arc::from(op),
            arity,
            returns,
            args,
            allow,
        };
        self.actions.push(Action { signature, call });
        self
    }
}

/// Converter names are unique, and two converters producing the same type must not accept
/// overlapping inputs.
fn check_converters<C>(
    converters: &[Converter<C>],
    universe: &TypeUniverse,
) -> Result<(), CatalogError> {
    for (i, first) in converters.iter().enumerate() {
        for second in &converters[i + 1..] {
            let (a, b) = (&first.signature, &second.signature);
            if a.name == b.name {
                return Err(CatalogError::DuplicateConverter {
                    name: a.name.to_string(),
                });
            }
            let overlapping = universe.is_assignable(a.input, b.input)
                || universe.is_assignable(b.input, a.input);
            if a.output == b.output && overlapping {
                return Err(CatalogError::AmbiguousConverter {
                    output: a.output.name(),
                    first: a.name.to_string(),
                    second: b.name.to_string(),
                });
            }
        }
    }
    Ok(())
}

type Slot = Arc<OnceCell<Arc<[usize]>>>;

/// Compute-once lookup table. The map lock is held only to find the slot; the value is
/// computed outside it, exactly once per key.
struct LookupCache<K> {
    slots: Mutex<HashMap<K, Slot>>,
}

impl<K> Default for LookupCache<K> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash> LookupCache<K> {
    fn get_or_compute(&self, key: K, compute: impl FnOnce() -> Vec<usize>) -> Arc<[usize]> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(key).or_default())
        };
        Arc::clone(slot.get_or_init(|| compute().into()))
    }
}

pub struct Catalog<C> {
    actions: Vec<Action<C>>,
    converters: Vec<Converter<C>>,
    by_op: HashMap<(Arity, Arc<str>), Vec<usize>>,
    universe: TypeUniverse,
    results: Vec<TypeKey>,
    candidates: LookupCache<(Arity, Arc<str>, TypeKey)>,
    conversions: LookupCache<TypeKey>,
}

impl<C: 'static> Catalog<C> {
    pub fn builder() -> CatalogBuilder<C> {
        CatalogBuilder::new()
    }
}

impl<C> Catalog<C> {
    pub fn universe(&self) -> &TypeUniverse {
        &self.universe
    }

    /// Types parse results may be requested as; empty when none were declared
    pub fn results(&self) -> &[TypeKey] {
        &self.results
    }

    pub fn actions(&self) -> impl Iterator<Item = &ActionSignature> {
        self.actions.iter().map(|a| &a.signature)
    }

    pub fn term_actions(&self) -> impl Iterator<Item = &ActionSignature> {
        self.actions_of(Arity::Term)
    }

    pub fn unary_actions(&self) -> impl Iterator<Item = &ActionSignature> {
        self.actions_of(Arity::Unary)
    }

    pub fn binary_actions(&self) -> impl Iterator<Item = &ActionSignature> {
        self.actions_of(Arity::Binary)
    }

    pub fn converters(&self) -> impl Iterator<Item = &ConversionSignature> {
        self.converters.iter().map(|c| &c.signature)
    }

    /// Whether any action of `arity` answers to `op`
    pub fn has_action(&self, arity: Arity, op: &str) -> bool {
        self.by_op.contains_key(&(arity, Arc::from(op)))
    }

    fn actions_of(&self, arity: Arity) -> impl Iterator<Item = &ActionSignature> {
        self.actions()
            .filter(move |signature| signature.arity == arity)
    }

    pub(crate) fn action(&self, index: usize) -> &Action<C> {
        &self.actions[index]
    }

    pub(crate) fn converter(&self, index: usize) -> &Converter<C> {
        &self.converters[index]
    }

    /// Actions for `op` of `arity` whose return type is assignable to `want`, in registration
    /// order.
    pub(crate) fn candidates(&self, arity: Arity, op: &Arc<str>, want: TypeKey) -> Arc<[usize]> {
        self.candidates
            .get_or_compute((arity, Arc::clone(op), want), || {
                self.by_op
                    .get(&(arity, Arc::clone(op)))
                    .into_iter()
                    .flatten()
                    .copied()
                    .filter(|&i| {
                        self.universe
                            .is_assignable(self.actions[i].signature.returns, want)
                    })
                    .collect()
            })
    }

    /// Converters whose output is assignable to `target`, in registration order.
    pub(crate) fn converters_to(&self, target: TypeKey) -> Arc<[usize]> {
        self.conversions.get_or_compute(target, || {
            self.converters
                .iter()
                .enumerate()
                .filter(|(_, c)| self.universe.is_assignable(c.signature.output, target))
                .map(|(i, _)| i)
                .collect()
        })
    }
}

impl<C> fmt::Debug for Catalog<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog")
            .field("actions", &self.actions().map(|s| s.to_string()).collect::<Vec<_>>())
            .field(
                "converters",
                &self.converters().map(|s| s.to_string()).collect::<Vec<_>>(),
            )
            .field("universe", &self.universe)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Celsius(f64);

    #[derive(Debug, PartialEq)]
    struct Kelvin(f64);

    fn catalog() -> Catalog<()> {
        Catalog::builder()
            .term("num", |inv| {
                inv.text()
                    .parse::<f64>()
                    .map(Celsius)
                    .map_err(|e| ActionError::Reject(e.to_string()))
            })
            .binary("+", |_, a: Celsius, b: Celsius| Ok(Celsius(a.0 + b.0)))
            .binary("+", |_, a: Kelvin, b: Kelvin| Ok(Kelvin(a.0 + b.0)))
            .unary("-", |_, a: Celsius| Ok(Celsius(-a.0)))
            .converter("to_kelvin", |_, c: Celsius| Ok(Kelvin(c.0 + 273.15)))
            .result::<Kelvin>()
            .build()
            .unwrap()
    }

    #[test]
    fn test_enumerators() {
        let catalog = catalog();
        assert_eq!(catalog.term_actions().count(), 1);
        assert_eq!(catalog.unary_actions().count(), 1);
        assert_eq!(catalog.binary_actions().count(), 2);
        assert_eq!(catalog.converters().count(), 1);
        assert!(catalog.has_action(Arity::Binary, "+"));
        assert!(!catalog.has_action(Arity::Unary, "+"));
    }

    #[test]
    fn test_candidates_filter_by_return_type() {
        let catalog = catalog();
        let plus: Arc<str> = Arc::from("+");
        let kelvin = catalog.candidates(Arity::Binary, &plus, TypeKey::of::<Kelvin>());
        assert_eq!(&*kelvin, &[2]);
        let again = catalog.candidates(Arity::Binary, &plus, TypeKey::of::<Kelvin>());
        assert!(Arc::ptr_eq(&kelvin, &again));
        assert!(catalog
            .candidates(Arity::Binary, &plus, TypeKey::of::<String>())
            .is_empty());
    }

    #[test]
    fn test_signature_display() {
        let catalog = catalog();
        let sig = catalog.unary_actions().next().unwrap();
        let celsius = TypeKey::of::<Celsius>().name();
        assert_eq!(
            sig.to_string(),
            format!("unary '-' ({}) -> {}", celsius, celsius)
        );
    }

    #[test]
    fn test_ambiguous_converters_rejected() {
        let result = Catalog::<()>::builder()
            .converter("a", |_, c: Celsius| Ok(Kelvin(c.0)))
            .converter("b", |_, c: Celsius| Ok(Kelvin(c.0 + 1.0)))
            .build();
        assert!(matches!(
            result,
            Err(CatalogError::AmbiguousConverter { .. })
        ));
    }

    #[test]
    fn test_duplicate_converter_names_rejected() {
        let result = Catalog::<()>::builder()
            .converter("x", |_, c: Celsius| Ok(Kelvin(c.0)))
            .converter("x", |_, k: Kelvin| Ok(Celsius(k.0)))
            .build();
        assert!(matches!(
            result,
            Err(CatalogError::DuplicateConverter { .. })
        ));
    }

    #[test]
    fn test_allow_list() {
        assert!(Allow::Any.permits("anything"));
        assert!(Allow::only(["x"]).permits("x"));
        assert!(!Allow::only(["x"]).permits("y"));
        assert!(!Allow::none().permits("x"));
    }

    #[test]
    fn test_closure_sources() {
        let doubled = |b: CatalogBuilder<()>| b.unary("dbl", |_, x: i64| Ok(x * 2));
        let catalog = Catalog::<()>::builder().source(doubled).build().unwrap();
        assert_eq!(catalog.unary_actions().count(), 1);
    }
}
