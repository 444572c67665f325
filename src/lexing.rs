//! Lexing
//!
//! This module turns source text into tokens, one at a time, against the rule table of the
//! scope the parse engine is currently in. There is no separate token stream: the engine pulls
//! the next lexeme on demand because which rules apply depends on the scope (and on the escape
//! pattern of the enclosure being parsed).
//!
//! Structure:
//!     source      Shared source text plus the offset to line/column table.
//!     token       The matched-text token with its position.
//!     tokenizer   Skip / escape / first-match rule testing anchored at an offset.

pub mod source;
pub mod token;
pub mod tokenizer;

pub use source::{Position, Source};
pub use token::Token;
pub use tokenizer::{Lexeme, Tokenizer};
