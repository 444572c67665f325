//! # opgram
//!
//! An embeddable operator-precedence grammar toolkit. A grammar is declared as data (tokens,
//! operators with ranks, nested bracket-like scopes) and parsing produces strongly-typed values
//! directly, by dispatching each parse node to registered semantic actions chosen by the type
//! the caller asks for.
//!
//! File Layout
//!
//!     The crate follows the pipeline order, leaves first:
//!
//!     grammar     Immutable scope/rule tree, built once through [`grammar::GrammarBuilder`].
//!     lexing      Source positions, tokens and the first-match tokenizer.
//!     parsing     The operator-precedence engine producing untyped [`parsing::ParseNode`] trees.
//!     semantics   The closed type universe, the action catalog and the type-directed resolver.
//!     validation  Static grammar/catalog consistency checks, no input required.
//!     parser      The public entry points tying the stages together.
//!
//! Usage
//!
//! ```ignore
//! let grammar = Arc::new(grammar);
//! let catalog = Arc::new(catalog);
//! let parser = Parser::new(grammar, catalog);
//! let value: i64 = parser.parse(&context, "1 + 2 * 3")?;
//! ```
//!
//! For shared fixtures (a small arithmetic grammar used across the tests and the CLI), see the
//! [testing module](crate::testing).

pub mod config;
pub mod error;
pub mod grammar;
pub mod lexing;
pub mod parser;
pub mod parsing;
pub mod semantics;
pub mod testing;
pub mod validation;

pub use error::{CatalogError, ErrorKind, GrammarError, ParseError};
pub use grammar::{Grammar, GrammarBuilder, OperatorKind, Pattern, ScopeRef};
pub use lexing::Token;
pub use parser::Parser;
pub use parsing::{Arity, Cursor, ParseNode};
pub use semantics::{ActionError, ActionSource, Catalog, CatalogBuilder, Invocation, TypeKey};
pub use validation::validate;
