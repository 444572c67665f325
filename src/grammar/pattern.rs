//! Token patterns
//!
//! Patterns are written as strings where a leading `~` marks a regular expression and anything
//! else is literal text (`\~` escapes a literal leading tilde):
//!
//! ```text
//! "+"           literal plus
//! "~[0-9]+"     regular expression
//! "\~"          literal tilde
//! ```
//!
//! Regular expressions are anchored at the current offset. A pattern only matches with a
//! length of at least one byte, so a regex that can match the empty string never stalls the
//! tokenizer.

use crate::error::GrammarError;
use regex::Regex;
use std::fmt;

const REGEX_SIGIL: char = '~';

#[derive(Debug, Clone)]
pub enum Pattern {
    /// Exact text
    Literal(String),
    /// Anchored regular expression; keeps the expression as written for messages
    Regex { source: String, compiled: Regex },
    /// First-match-wins union
    AnyOf(Vec<Pattern>),
}

impl Pattern {
    /// Parse a pattern string, honouring the regular-expression sigil.
    pub fn parse(spec: &str) -> Result<Self, GrammarError> {
        if let Some(rest) = spec.strip_prefix('\\') {
            if rest.starts_with(REGEX_SIGIL) {
                return Self::literal(rest);
            }
        }
        match spec.strip_prefix(REGEX_SIGIL) {
            Some(expr) => Self::regex(expr),
            None => Self::literal(spec),
        }
    }

    pub fn literal(text: impl Into<String>) -> Result<Self, GrammarError> {
        let text = text.into();
        if text.is_empty() {
            return Err(GrammarError::EmptyPattern);
        }
        Ok(Pattern::Literal(text))
    }

    pub fn regex(expr: &str) -> Result<Self, GrammarError> {
        if expr.is_empty() {
            return Err(GrammarError::EmptyPattern);
        }
        let compiled = Regex::new(&format!("^(?:{})", expr)).map_err(|e| {
            GrammarError::InvalidRegex {
                pattern: expr.to_string(),
                message: e.to_string(),
            }
        })?;
        Ok(Pattern::Regex {
            source: expr.to_string(),
            compiled,
        })
    }

    /// Union of patterns; the first alternative that matches wins.
    pub fn any_of<I>(patterns: I) -> Result<Self, GrammarError>
    where
        I: IntoIterator,
        I::Item: IntoPattern,
    {
        let alternatives = patterns
            .into_iter()
            .map(IntoPattern::into_pattern)
            .collect::<Result<Vec<_>, _>>()?;
        if alternatives.is_empty() {
            return Err(GrammarError::EmptyPattern);
        }
        Ok(Pattern::AnyOf(alternatives))
    }

    /// Length in bytes of the match at the start of `input`, if any.
    pub fn match_len(&self, input: &str) -> Option<usize> {
        let len = match self {
            Pattern::Literal(text) => input.starts_with(text.as_str()).then_some(text.len()),
            Pattern::Regex { compiled, .. } => compiled.find(input).map(|m| m.end()),
            Pattern::AnyOf(alternatives) => {
                alternatives.iter().find_map(|pattern| pattern.match_len(input))
            }
        }?;
        (len > 0).then_some(len)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Literal(text) => write!(f, "{:?}", text),
            Pattern::Regex { source, .. } => write!(f, "/{}/", source),
            Pattern::AnyOf(alternatives) => {
                for (i, alternative) in alternatives.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{}", alternative)?;
                }
                Ok(())
            }
        }
    }
}

/// Anything the grammar builder accepts where a pattern is expected
pub trait IntoPattern {
    fn into_pattern(self) -> Result<Pattern, GrammarError>;
}

impl IntoPattern for Pattern {
    fn into_pattern(self) -> Result<Pattern, GrammarError> {
        Ok(self)
    }
}

impl IntoPattern for &str {
    fn into_pattern(self) -> Result<Pattern, GrammarError> {
        Pattern::parse(self)
    }
}

impl IntoPattern for String {
    fn into_pattern(self) -> Result<Pattern, GrammarError> {
        Pattern::parse(&self)
    }
}

impl IntoPattern for Result<Pattern, GrammarError> {
    fn into_pattern(self) -> Result<Pattern, GrammarError> {
        self
    }
}
