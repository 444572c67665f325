//! Closed type universe
//!
//! Values travel through the resolver type-erased ([`Value`]) and are tagged with a
//! [`TypeKey`]. The universe knows:
//!
//! - every type mentioned by the catalog (plus `String`, the raw-text type);
//! - which types are assignable to which: each type to itself, plus the transitive closure of
//!   declared subtype edges, each edge carrying the function that widens a value;
//! - which types are homogeneous sequences (`Vec<E>`) and how to wrap a single `E` into one.

use std::any::{type_name, Any, TypeId};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

/// A type-erased value produced by an action or converter
pub type Value = Box<dyn Any>;

/// Widens a value of a subtype into its supertype
pub type Upcast = Arc<dyn Fn(Value) -> Value + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// The type a term resolves to when only its matched text is wanted
    pub fn raw_text() -> Self {
        Self::of::<String>()
    }

    pub fn name(self) -> &'static str {
        self.name
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[derive(Clone)]
enum Assignment {
    Identity,
    Widen(Vec<Upcast>),
}

#[derive(Clone, Copy)]
struct Sequence {
    element: TypeKey,
    wrap: fn(Value) -> Value,
}

fn wrap_single<E: 'static>(value: Value) -> Value {
    match value.downcast::<E>() {
        Ok(element) => Box::new(vec![*element]),
        Err(value) => value,
    }
}

pub struct TypeUniverse {
    types: Vec<TypeKey>,
    assignable: HashMap<(TypeKey, TypeKey), Assignment>,
    sequences: HashMap<TypeKey, Sequence>,
}

impl TypeUniverse {
    pub fn types(&self) -> &[TypeKey] {
        &self.types
    }

    pub fn contains(&self, key: TypeKey) -> bool {
        self.assignable.contains_key(&(key, key))
    }

    pub fn is_assignable(&self, from: TypeKey, to: TypeKey) -> bool {
        self.assignable.contains_key(&(from, to))
    }

    /// Widen `value` (of type `from`) to `to`; `None` when not assignable.
    pub fn upcast(&self, value: Value, from: TypeKey, to: TypeKey) -> Option<Value> {
        match self.assignable.get(&(from, to))? {
            Assignment::Identity => Some(value),
            Assignment::Widen(chain) => Some(chain.iter().fold(value, |value, step| step(value))),
        }
    }

    /// Element type of a declared homogeneous sequence type
    pub fn element_of(&self, sequence: TypeKey) -> Option<TypeKey> {
        self.sequences.get(&sequence).map(|s| s.element)
    }

    /// Wrap one element into a single-element sequence of type `sequence`.
    pub fn wrap(&self, sequence: TypeKey, element: Value) -> Option<Value> {
        self.sequences.get(&sequence).map(|s| (s.wrap)(element))
    }
}

impl fmt::Debug for TypeUniverse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeUniverse")
            .field("types", &self.types)
            .field("assignable", &self.assignable.len())
            .field("sequences", &self.sequences.len())
            .finish()
    }
}

#[derive(Default)]
pub(crate) struct UniverseBuilder {
    types: Vec<TypeKey>,
    edges: Vec<(TypeKey, TypeKey, Upcast)>,
    sequences: HashMap<TypeKey, Sequence>,
}

impl UniverseBuilder {
    pub(crate) fn mention(&mut self, key: TypeKey) {
        if !self.types.contains(&key) {
            self.types.push(key);
        }
    }

    pub(crate) fn subtype(&mut self, sub: TypeKey, sup: TypeKey, upcast: Upcast) {
        self.mention(sub);
        self.mention(sup);
        self.edges.push((sub, sup, upcast));
    }

    pub(crate) fn sequence<E: 'static>(&mut self) {
        let element = TypeKey::of::<E>();
        let sequence = TypeKey::of::<Vec<E>>();
        self.mention(element);
        self.mention(sequence);
        self.sequences.insert(
            sequence,
            Sequence {
                element,
                wrap: wrap_single::<E>,
            },
        );
    }

    /// Close the subtype edges transitively, keeping the shortest widening chain per pair.
    pub(crate) fn build(mut self) -> TypeUniverse {
        self.mention(TypeKey::raw_text());

        let mut assignable = HashMap::new();
        for &start in &self.types {
            assignable.insert((start, start), Assignment::Identity);

            let mut queue = VecDeque::from([(start, Vec::<Upcast>::new())]);
            while let Some((current, chain)) = queue.pop_front() {
                for (sub, sup, upcast) in &self.edges {
                    if *sub != current || assignable.contains_key(&(start, *sup)) {
                        continue;
                    }
                    let mut next = chain.clone();
                    next.push(Arc::clone(upcast));
                    assignable.insert((start, *sup), Assignment::Widen(next.clone()));
                    queue.push_back((*sup, next));
                }
            }
        }

        TypeUniverse {
            types: self.types,
            assignable,
            sequences: self.sequences,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Meters(f64);

    #[derive(Debug, PartialEq)]
    enum Quantity {
        Length(f64),
    }

    #[derive(Debug, PartialEq)]
    struct Reading(String);

    fn universe() -> TypeUniverse {
        let mut builder = UniverseBuilder::default();
        builder.subtype(
            TypeKey::of::<Meters>(),
            TypeKey::of::<Quantity>(),
            Arc::new(|v: Value| match v.downcast::<Meters>() {
                Ok(m) => Box::new(Quantity::Length(m.0)),
                Err(v) => v,
            }),
        );
        builder.subtype(
            TypeKey::of::<Quantity>(),
            TypeKey::of::<Reading>(),
            Arc::new(|v: Value| match v.downcast::<Quantity>() {
                Ok(q) => Box::new(Reading(format!("{:?}", q))),
                Err(v) => v,
            }),
        );
        builder.sequence::<i64>();
        builder.build()
    }

    #[test]
    fn test_assignability_is_reflexive_and_transitive() {
        let universe = universe();
        let meters = TypeKey::of::<Meters>();
        let reading = TypeKey::of::<Reading>();
        assert!(universe.is_assignable(meters, meters));
        assert!(universe.is_assignable(meters, reading));
        assert!(!universe.is_assignable(reading, meters));
        assert!(universe.contains(TypeKey::raw_text()));
    }

    #[test]
    fn test_upcast_applies_whole_chain() {
        let universe = universe();
        let value = universe
            .upcast(
                Box::new(Meters(2.5)),
                TypeKey::of::<Meters>(),
                TypeKey::of::<Reading>(),
            )
            .unwrap();
        let reading = value.downcast::<Reading>().unwrap();
        assert_eq!(*reading, Reading("Length(2.5)".to_string()));
    }

    #[test]
    fn test_sequence_wrap() {
        let universe = universe();
        let vec_key = TypeKey::of::<Vec<i64>>();
        assert_eq!(universe.element_of(vec_key), Some(TypeKey::of::<i64>()));
        let wrapped = universe.wrap(vec_key, Box::new(7i64)).unwrap();
        assert_eq!(*wrapped.downcast::<Vec<i64>>().unwrap(), vec![7]);
    }
}
