//! Semantics
//!
//!     Interprets untyped parse trees against a type the caller asks for. There is no runtime
//!     introspection: every type an action, converter or declaration mentions is collected into
//!     a closed [`TypeUniverse`] when the catalog is built, together with a precomputed
//!     assignable-to relation. Resolution then only ever compares [`TypeKey`]s.
//!
//! Structure:
//!     types       Type keys, the closed universe, sequences and declared subtypes.
//!     catalog     Registration of term/unary/binary actions and converters.
//!     resolver    The node-local, phase-ordered search that picks and invokes actions.

pub mod catalog;
pub mod resolver;
pub mod types;

pub use catalog::{
    ActionError, ActionSignature, ActionSource, Allow, Catalog, CatalogBuilder,
    ConversionSignature, Invocation,
};
pub use resolver::Resolver;
pub use types::{TypeKey, TypeUniverse, Value};
