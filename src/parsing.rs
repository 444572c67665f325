//! Parsing
//!
//! The precedence engine consumes lexemes and builds an untyped tree of [`ParseNode`]s. It
//! knows nothing about types or actions; the semantics module interprets the tree afterwards.
//!
//! Structure:
//!     ir          The parse tree: a tagged union of term, unary and binary nodes.
//!     engine      Single-stack operator-precedence algorithm, recursing for enclosures.
//!     cursor      Shared position for multi-statement sources.

pub mod cursor;
pub mod engine;
pub mod ir;

pub use cursor::Cursor;
pub use engine::{Engine, Outcome, Termination};
pub use ir::{Arity, ParseNode};
