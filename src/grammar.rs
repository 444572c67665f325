//! Grammar model
//!
//!     A grammar is a tree of scopes. Each scope is an ordered list of rules, and declaration
//!     order is match priority: the first rule whose pattern matches at the current offset wins.
//!     This is not longest-match. A scope that declares `=` before `==` will never see `==`.
//!
//! Rules
//!
//!     Token       A term: its match becomes a leaf node.
//!     Operator    Prefix, postfix, infix or infix-or-prefix, with a rank (higher binds
//!                 tighter) and an associativity.
//!     Enclosure   An open pattern that enters a nested scope, left again on the close pattern.
//!                 It may name an implicit leading operator inserted when the bracket directly
//!                 follows a term, which is how calls and indexing are expressed.
//!     Glue        At most one per scope: an implicit infix operator synthesized between two
//!                 adjacent terms.
//!     Skip        Discarded on match (whitespace, comments).
//!     Separator   The scope's escape pattern. At most one per scope. It ends a statement when
//!                 the scope is the entry scope of a parse call.
//!
//! Scopes live in an arena and are referenced through [`ScopeRef`] handles, which is what lets
//! a scope contain enclosures leading back to itself. The arena is resolved once, in
//! [`GrammarBuilder::build`], and the resulting [`Grammar`] is immutable and freely shared.

pub mod builder;
pub mod pattern;
pub mod scope;

pub use builder::{GrammarBuilder, ScopeBuilder};
pub use pattern::{IntoPattern, Pattern};
pub use scope::{Associativity, Enclosure, Grammar, OperatorKind, OperatorSpec, Rule, Scope, ScopeRef};
