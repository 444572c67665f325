//! Error types
//!
//! Three families of errors exist, matching the three moments something can go wrong:
//!
//!     GrammarError    Building a grammar (bad pattern, bad rank, duplicate glue/escape, ...).
//!     CatalogError    Building an action catalog (ambiguous converter registrations).
//!     ParseError      Parsing and resolving one input. Every parse error carries the position
//!                     of the token it concerns and can render a two-line excerpt.
//!
//! Parse errors are classified by [`ErrorKind`]. Tokenize and structural errors abort a parse
//! immediately; type and conversion errors are recoverable inside the resolver (it moves on to
//! the next candidate or phase); semantic errors are final.

use crate::lexing::{Source, Token};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Classification of a parse failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No rule of the current scope matches at the offset
    Tokenize,
    /// The precedence engine could not build a tree (missing operand, consecutive operators, ...)
    Structural,
    /// No action yields a value of the requested type for a node
    Type,
    /// A required coercion has no applicable converter
    Conversion,
    /// A matched action rejected its input
    Semantic,
    /// A configured resource limit (nesting depth, input size) was exceeded
    Limit,
}

impl ErrorKind {
    /// Whether the resolver may try further candidates after this failure
    pub fn is_recoverable(self) -> bool {
        matches!(self, ErrorKind::Type | ErrorKind::Conversion)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Tokenize => "tokenize",
            ErrorKind::Structural => "structural",
            ErrorKind::Type => "type",
            ErrorKind::Conversion => "conversion",
            ErrorKind::Semantic => "semantic",
            ErrorKind::Limit => "limit",
        };
        f.write_str(name)
    }
}

/// The single error a failed parse call yields
#[derive(Debug, Clone, Error)]
#[error("{kind} error at {line}:{column}: {message}")]
pub struct ParseError {
    kind: ErrorKind,
    message: String,
    offset: usize,
    line: usize,
    column: usize,
    text: Arc<Source>,
}

impl ParseError {
    /// An error positioned at a token.
    pub fn at(kind: ErrorKind, message: impl Into<String>, token: &Token) -> Self {
        Self {
            kind,
            message: message.into(),
            offset: token.offset(),
            line: token.line(),
            column: token.column(),
            text: Arc::clone(token.source()),
        }
    }

    /// An error positioned at a raw offset of `source`.
    pub fn at_offset(
        kind: ErrorKind,
        message: impl Into<String>,
        source: &Arc<Source>,
        offset: usize,
    ) -> Self {
        Self::at(kind, message, &Token::synthetic(source, offset))
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> usize {
        self.column
    }

    /// Two-line excerpt: the error line (truncated to `width` characters) and a caret under
    /// the error column.
    pub fn excerpt(&self, width: usize) -> String {
        excerpt(self.text.line_text(self.line), self.column, width)
    }
}

const ELLIPSIS: &str = "...";

/// Render `line` with a caret under the 1-based `column`.
///
/// Lines longer than `width` characters are cut to a `width`-character window around the
/// column, with `...` marking each side that was cut. The caret line is spaces followed by `^`
/// and the result has no trailing newline.
pub fn excerpt(line: &str, column: usize, width: usize) -> String {
    let chars: Vec<char> = line.chars().collect();
    let width = width.max(1);
    let col = column.clamp(1, chars.len() + 1) - 1;

    let (shown, caret) = if chars.len() <= width {
        (line.to_string(), col)
    } else {
        let start = col.saturating_sub(width / 2).min(chars.len() - width);
        let end = start + width;

        let mut shown = String::new();
        let mut caret = col - start;
        if start > 0 {
            shown.push_str(ELLIPSIS);
            caret += ELLIPSIS.len();
        }
        shown.extend(&chars[start..end]);
        if end < chars.len() {
            shown.push_str(ELLIPSIS);
        }
        (shown, caret)
    };

    format!("{}\n{}^", shown, " ".repeat(caret))
}

/// Mistakes detected while building a grammar
#[derive(Debug, Clone, Error)]
pub enum GrammarError {
    #[error("invalid regular expression '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },

    #[error("empty pattern")]
    EmptyPattern,

    #[error("operator '{id}' has rank {rank}; ranks start at 1")]
    InvalidRank { id: String, rank: u32 },

    #[error("scope '{scope}' declares more than one glue rule")]
    DuplicateGlue { scope: String },

    #[error("scope '{scope}' declares more than one escape pattern")]
    DuplicateEscape { scope: String },

    #[error("scope '{scope}' is referenced but never defined")]
    UndefinedScope { scope: String },

    #[error("scope '{scope}' is defined twice")]
    ScopeRedefined { scope: String },

    #[error("grammar has no scopes")]
    NoRootScope,
}

/// Mistakes detected while building an action catalog
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("converters '{first}' and '{second}' both produce {output} from overlapping inputs")]
    AmbiguousConverter {
        output: &'static str,
        first: String,
        second: String,
    },

    #[error("converter '{name}' is registered twice")]
    DuplicateConverter { name: String },
}
