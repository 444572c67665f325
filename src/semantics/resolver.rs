//! Type-directed resolution
//!
//!     Walks a parse tree top-down. Each node is asked for a value of one type; the node picks
//!     an action whose id and arity match and whose return type is assignable to that type,
//!     then asks its children for the action's argument types.
//!
//! Phases
//!
//!     Each argument is produced either directly (the child resolves to the argument type by
//!     itself) or by conversion (the child resolves to the input of a single converter whose
//!     output is assignable to the argument type). Candidates are tried phase by phase, in
//!     registration order within a phase:
//!
//!         unary       [direct]  [convert]
//!         binary      [direct, direct]  [convert, direct]  [direct, convert]  [convert, convert]
//!
//!     So an exact match anywhere in the catalog always wins over a converted one.
//!
//! Sequences
//!
//!     When an argument type is a declared sequence of E and the child cannot produce the
//!     sequence, it is asked for an E instead and the result is wrapped.
//!
//! Errors
//!
//!     Type and conversion failures are recoverable: the next candidate is tried and the first
//!     such failure is what the caller sees if nothing succeeds, its message prefixed by each
//!     enclosing node that gave up ("no action for '+' yields i64: ..."). Semantic failures
//!     (an action rejecting its input) end resolution at once. Failures are remembered per
//!     node and type, so a subtree is never re-resolved for a type it already failed to
//!     produce.
//!
//! Matching before invoking
//!
//!     A candidate's arguments are first matched on types alone: can each child produce the
//!     argument type in the phase's mode? The answer depends only on the catalog and the shape
//!     of the subtree and is memoized per node and type. Children are resolved (and their
//!     actions run) only for a candidate that matches, so unless an action declines at run
//!     time every action in the tree runs once.

use crate::error::{ErrorKind, ParseError};
use crate::lexing::Token;
use crate::parsing::{Arity, ParseNode};
use crate::semantics::catalog::{
    Action, ActionError, ActionSignature, Allow, Catalog, Invocation,
};
use crate::semantics::types::{TypeKey, Value};
use std::cell::RefCell;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Direct,
    Convert,
}

const UNARY_PHASES: &[&[Mode]] = &[&[Mode::Direct], &[Mode::Convert]];
const BINARY_PHASES: &[&[Mode]] = &[
    &[Mode::Direct, Mode::Direct],
    &[Mode::Convert, Mode::Direct],
    &[Mode::Direct, Mode::Convert],
    &[Mode::Convert, Mode::Convert],
];

/// Resolution failure, positioned at the token of the node that failed
#[derive(Debug, Clone)]
struct Failure {
    kind: ErrorKind,
    message: String,
    token: Token,
}

impl Failure {
    fn new(kind: ErrorKind, message: impl Into<String>, token: &Token) -> Self {
        Self {
            kind,
            message: message.into(),
            token: token.clone(),
        }
    }

    fn from_action(error: ActionError, recoverable: ErrorKind, token: &Token) -> Self {
        match error {
            ActionError::Decline(message) => Self::new(recoverable, message, token),
            ActionError::Reject(message) => Self::new(ErrorKind::Semantic, message, token),
        }
    }

    fn is_recoverable(&self) -> bool {
        self.kind.is_recoverable()
    }
}

impl From<Failure> for ParseError {
    fn from(failure: Failure) -> Self {
        ParseError::at(failure.kind, failure.message, &failure.token)
    }
}

type Attempt = Result<Value, Failure>;

/// Keeps the first recoverable failure seen, and stops at the first fatal one.
#[derive(Default)]
struct FirstFailure(Option<Failure>);

impl FirstFailure {
    /// `Err` when `failure` is fatal and must be returned right away.
    fn note(&mut self, failure: Failure) -> Result<(), Failure> {
        if !failure.is_recoverable() {
            return Err(failure);
        }
        self.0.get_or_insert(failure);
        Ok(())
    }

    /// The failure of a whole node: the first recorded failure, keeping its kind and
    /// position, with `context` in front of its message. Without one, `context` itself.
    fn finish(self, kind: ErrorKind, context: String, token: &Token) -> Failure {
        match self.0 {
            Some(mut first) => {
                first.message = format!("{}: {}", context, first.message);
                first
            }
            None => Failure::new(kind, context, token),
        }
    }
}

/// Resolves trees against one catalog and one embedder context.
///
/// A resolver is cheap; create one per parse call. The failure memo it carries is keyed by
/// node address and is only meaningful for trees that outlive it.
pub struct Resolver<'a, C> {
    catalog: &'a Catalog<C>,
    context: &'a C,
    failures: RefCell<HashMap<(usize, TypeKey), Failure>>,
    producible: RefCell<HashMap<(usize, TypeKey), bool>>,
}

fn node_key(node: &ParseNode) -> usize {
    node as *const ParseNode as usize
}

impl<'a, C> Resolver<'a, C> {
    pub fn new(catalog: &'a Catalog<C>, context: &'a C) -> Self {
        Self {
            catalog,
            context,
            failures: RefCell::new(HashMap::new()),
            producible: RefCell::new(HashMap::new()),
        }
    }

    /// Resolve `node` into a `T`.
    pub fn resolve<T: 'static>(&self, node: &ParseNode) -> Result<T, ParseError> {
        let want = TypeKey::of::<T>();
        if !self.catalog.universe().contains(want) {
            return Err(ParseError::at(
                ErrorKind::Type,
                format!("type {} is not known to the catalog", want),
                node.token(),
            ));
        }
        let value = self.resolve_node(node, want)?;
        match value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(_) => Err(ParseError::at(
                ErrorKind::Type,
                format!("resolved value is not a {}", want),
                node.token(),
            )),
        }
    }

    fn resolve_node(&self, node: &ParseNode, want: TypeKey) -> Attempt {
        let key = (node_key(node), want);
        if let Some(failure) = self.failures.borrow().get(&key) {
            return Err(failure.clone());
        }

        let result = match node {
            ParseNode::Term { .. } => self.resolve_term(node, want),
            ParseNode::Unary { operand, .. } => {
                self.resolve_applied(node, &[&**operand], want, UNARY_PHASES)
            }
            ParseNode::Binary { left, right, .. } => {
                self.resolve_applied(node, &[&**left, &**right], want, BINARY_PHASES)
            }
        };

        if let Err(failure) = &result {
            if failure.is_recoverable() {
                self.failures.borrow_mut().insert(key, failure.clone());
            }
        }
        result
    }

    fn resolve_term(&self, node: &ParseNode, want: TypeKey) -> Attempt {
        let token = node.token();
        let mut first = FirstFailure::default();
        for &index in self.catalog.candidates(Arity::Term, node.op(), want).iter() {
            let action = self.catalog.action(index);
            match self.invoke(action, token, Vec::new(), want) {
                Ok(value) => return Ok(value),
                Err(failure) => first.note(failure)?,
            }
        }

        if want == TypeKey::raw_text() {
            return Ok(Box::new(token.text().to_string()));
        }
        Err(first.finish(
            ErrorKind::Type,
            format!("no token action for '{}' yields {}", node.op(), want),
            token,
        ))
    }

    fn resolve_applied(
        &self,
        node: &ParseNode,
        children: &[&ParseNode],
        want: TypeKey,
        phases: &[&[Mode]],
    ) -> Attempt {
        let token = node.token();
        let candidates = self.catalog.candidates(node.arity(), node.op(), want);
        let mut first = FirstFailure::default();

        for (phase, modes) in phases.iter().enumerate() {
            for &index in candidates.iter() {
                let action = self.catalog.action(index);
                tracing::trace!(op = %node.op(), phase, action = %action.signature, "trying");
                let args = match self.resolve_args(children, &action.signature, modes) {
                    Ok(args) => args,
                    Err(failure) => {
                        first.note(failure)?;
                        continue;
                    }
                };
                match self.invoke(action, token, args, want) {
                    Ok(value) => return Ok(value),
                    Err(failure) => first.note(failure)?,
                }
            }
        }

        Err(first.finish(
            ErrorKind::Type,
            format!("no action for '{}' yields {}", node.op(), want),
            token,
        ))
    }

    fn resolve_args(
        &self,
        children: &[&ParseNode],
        signature: &ActionSignature,
        modes: &[Mode],
    ) -> Result<Vec<Value>, Failure> {
        if let Some(failure) = self.mismatch(children, signature, modes) {
            return Err(failure);
        }
        children
            .iter()
            .zip(modes)
            .enumerate()
            .map(|(i, (child, mode))| {
                self.resolve_arg(child, signature.args()[i], &signature.allow()[i], *mode)
            })
            .collect()
    }

    fn resolve_arg(&self, child: &ParseNode, want: TypeKey, allow: &Allow, mode: Mode) -> Attempt {
        let attempt = |want: TypeKey| match mode {
            Mode::Direct => self.resolve_node(child, want),
            Mode::Convert => self.convert(child, want, allow),
        };

        let failure = match attempt(want) {
            Ok(value) => return Ok(value),
            Err(failure) if !failure.is_recoverable() => return Err(failure),
            Err(failure) => failure,
        };

        let universe = self.catalog.universe();
        let Some(element) = universe.element_of(want) else {
            return Err(failure);
        };
        match attempt(element) {
            Ok(value) => universe.wrap(want, value).ok_or(failure),
            Err(promoted) if !promoted.is_recoverable() => Err(promoted),
            Err(_) => Err(failure),
        }
    }

    /// The first argument `signature` cannot get from its child in `modes`, judged on types.
    fn mismatch(
        &self,
        children: &[&ParseNode],
        signature: &ActionSignature,
        modes: &[Mode],
    ) -> Option<Failure> {
        children.iter().zip(modes).enumerate().find_map(|(i, (child, mode))| {
            let want = signature.args()[i];
            if self.can_fill(child, want, &signature.allow()[i], *mode) {
                return None;
            }
            Some(match mode {
                Mode::Direct => Failure::new(
                    ErrorKind::Type,
                    format!("'{}' cannot yield {}", child.op(), want),
                    child.token(),
                ),
                Mode::Convert => Failure::new(
                    ErrorKind::Conversion,
                    format!("no converter from '{}' to {}", child.op(), want),
                    child.token(),
                ),
            })
        })
    }

    /// Whether `node` can produce a `want`, ignoring what its actions decide at run time.
    fn can_produce(&self, node: &ParseNode, want: TypeKey) -> bool {
        let key = (node_key(node), want);
        if let Some(&known) = self.producible.borrow().get(&key) {
            return known;
        }

        let known = match node {
            ParseNode::Term { .. } => {
                want == TypeKey::raw_text()
                    || !self.catalog.candidates(Arity::Term, node.op(), want).is_empty()
            }
            ParseNode::Unary { operand, .. } => {
                self.can_apply(node, &[&**operand], want, UNARY_PHASES)
            }
            ParseNode::Binary { left, right, .. } => {
                self.can_apply(node, &[&**left, &**right], want, BINARY_PHASES)
            }
        };
        self.producible.borrow_mut().insert(key, known);
        known
    }

    fn can_apply(
        &self,
        node: &ParseNode,
        children: &[&ParseNode],
        want: TypeKey,
        phases: &[&[Mode]],
    ) -> bool {
        let candidates = self.catalog.candidates(node.arity(), node.op(), want);
        phases.iter().any(|modes| {
            candidates.iter().any(|&index| {
                let signature = &self.catalog.action(index).signature;
                self.mismatch(children, signature, modes).is_none()
            })
        })
    }

    fn can_fill(&self, child: &ParseNode, want: TypeKey, allow: &Allow, mode: Mode) -> bool {
        let can = |want: TypeKey| match mode {
            Mode::Direct => self.can_produce(child, want),
            Mode::Convert => self.can_convert(child, want, allow),
        };
        can(want) || self.catalog.universe().element_of(want).is_some_and(can)
    }

    fn can_convert(&self, child: &ParseNode, target: TypeKey, allow: &Allow) -> bool {
        self.catalog.converters_to(target).iter().any(|&index| {
            let signature = &self.catalog.converter(index).signature;
            allow.permits(signature.name()) && self.can_produce(child, signature.input())
        })
    }

    /// Produce a `target` from `child` through exactly one converter.
    fn convert(&self, child: &ParseNode, target: TypeKey, allow: &Allow) -> Attempt {
        let token = child.token();
        let converters: Vec<usize> = self
            .catalog
            .converters_to(target)
            .iter()
            .copied()
            .filter(|&i| allow.permits(self.catalog.converter(i).signature.name()))
            .collect();

        let mut first = FirstFailure::default();
        for index in converters {
            let converter = self.catalog.converter(index);
            let signature = &converter.signature;
            if !self.can_produce(child, signature.input()) {
                first.note(Failure::new(
                    ErrorKind::Conversion,
                    format!("'{}' cannot yield {}", child.op(), signature.input()),
                    token,
                ))?;
                continue;
            }
            let input = match self.resolve_node(child, signature.input()) {
                Ok(input) => input,
                Err(failure) => {
                    first.note(failure)?;
                    continue;
                }
            };

            let invocation = Invocation {
                context: self.context,
                token,
            };
            match (converter.call)(&invocation, input) {
                Ok(value) => return self.widen(value, signature.output(), target, token),
                Err(error) => first.note(Failure::from_action(error, ErrorKind::Conversion, token))?,
            }
        }

        Err(first.finish(
            ErrorKind::Conversion,
            format!("no converter from '{}' to {}", child.op(), target),
            token,
        ))
    }

    fn invoke(
        &self,
        action: &Action<C>,
        token: &Token,
        args: Vec<Value>,
        want: TypeKey,
    ) -> Attempt {
        let invocation = Invocation {
            context: self.context,
            token,
        };
        match (action.call)(&invocation, args) {
            Ok(value) => self.widen(value, action.signature.returns(), want, token),
            Err(error) => Err(Failure::from_action(error, ErrorKind::Type, token)),
        }
    }

    fn widen(&self, value: Value, from: TypeKey, to: TypeKey, token: &Token) -> Attempt {
        self.catalog
            .universe()
            .upcast(value, from, to)
            .ok_or_else(|| Failure::new(ErrorKind::Type, format!("{} is not a {}", from, to), token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexing::Source;
    use std::sync::Arc;

    fn node(text: &str) -> (Arc<Source>, impl Fn(&str, usize, usize) -> ParseNode) {
        let source = Arc::new(Source::new(text));
        let s = Arc::clone(&source);
        let term = move |op: &str, start: usize, end: usize| {
            ParseNode::term(Arc::from(op), Token::new(&s, start..end))
        };
        (source, term)
    }

    #[derive(Debug, PartialEq)]
    struct Celsius(f64);

    #[derive(Debug, PartialEq)]
    struct Kelvin(f64);

    fn temperatures() -> Catalog<()> {
        Catalog::builder()
            .term("num", |inv| {
                inv.text()
                    .parse::<f64>()
                    .map(Celsius)
                    .map_err(|e| ActionError::Reject(e.to_string()))
            })
            .binary("+", |_, a: Kelvin, b: Kelvin| Ok(Kelvin(a.0 + b.0)))
            .converter("kelvin", |_, c: Celsius| Ok(Kelvin(c.0 + 273.0)))
            .result::<Kelvin>()
            .build()
            .unwrap()
    }

    #[test]
    fn test_converter_fills_both_arguments() {
        let (source, term) = node("1+2");
        let tree = ParseNode::binary(
            Arc::from("+"),
            Token::new(&source, 1..2),
            term("num", 0, 1),
            term("num", 2, 3),
        );
        let catalog = temperatures();
        let resolver = Resolver::new(&catalog, &());
        assert_eq!(resolver.resolve::<Kelvin>(&tree).unwrap(), Kelvin(549.0));
    }

    #[test]
    fn test_raw_text_fallback() {
        let (_source, term) = node("abc");
        let catalog = temperatures();
        let resolver = Resolver::new(&catalog, &());
        assert_eq!(resolver.resolve::<String>(&term("word", 0, 3)).unwrap(), "abc");
    }

    #[test]
    fn test_reject_is_semantic() {
        let (_source, term) = node("1.2.3");
        let catalog = temperatures();
        let resolver = Resolver::new(&catalog, &());
        let err = resolver.resolve::<Celsius>(&term("num", 0, 5)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Semantic);
    }

    #[test]
    fn test_unknown_type() {
        let (_source, term) = node("1");
        let catalog = temperatures();
        let resolver = Resolver::new(&catalog, &());
        let err = resolver.resolve::<u8>(&term("num", 0, 1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
        assert!(err.message().contains("u8"));
    }

    #[derive(Debug, PartialEq)]
    struct Label(String);

    #[test]
    fn test_direct_match_beats_conversion() {
        let catalog = Catalog::<()>::builder()
            .term("n", |inv| Ok(inv.text().len() as i64))
            .unary("!", |_, l: Label| Ok(format!("label {}", l.0)))
            .unary("!", |_, n: i64| Ok(format!("int {}", n)))
            .converter("label", |_, n: i64| Ok(Label(n.to_string())))
            .build()
            .unwrap();
        let (source, term) = node("!xy");
        let tree = ParseNode::unary(Arc::from("!"), Token::new(&source, 0..1), term("n", 1, 3));
        let resolver = Resolver::new(&catalog, &());
        assert_eq!(resolver.resolve::<String>(&tree).unwrap(), "int 2");
    }

    #[test]
    fn test_conversion_used_when_nothing_direct() {
        let catalog = Catalog::<()>::builder()
            .term("n", |inv| Ok(inv.text().len() as i64))
            .unary("!", |_, l: Label| Ok(format!("label {}", l.0)))
            .converter("label", |_, n: i64| Ok(Label(n.to_string())))
            .build()
            .unwrap();
        let (source, term) = node("!xyz");
        let tree = ParseNode::unary(Arc::from("!"), Token::new(&source, 0..1), term("n", 1, 4));
        let resolver = Resolver::new(&catalog, &());
        assert_eq!(resolver.resolve::<String>(&tree).unwrap(), "label 3");
    }
}
