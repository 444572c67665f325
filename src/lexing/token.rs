//! Tokens
//!
//! A token is a matched slice of the source: its byte span, its 1-based line and column, and a
//! shared handle on the full source so that errors raised long after tokenizing can still print
//! an excerpt of the offending line.
//!
//! Synthetic tokens (the implicit glue operator, the implicit operator in front of an enclosure,
//! the whole-scope conversion hook) have an empty span at the position they stand for.

use super::source::{Position, Source};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

#[derive(Clone)]
pub struct Token {
    span: Range<usize>,
    position: Position,
    source: Arc<Source>,
}

impl Token {
    pub fn new(source: &Arc<Source>, span: Range<usize>) -> Self {
        Self {
            position: source.position(span.start),
            span,
            source: Arc::clone(source),
        }
    }

    /// An empty token standing for an implicit construct at `offset`.
    pub fn synthetic(source: &Arc<Source>, offset: usize) -> Self {
        Self::new(source, offset..offset)
    }

    pub fn text(&self) -> &str {
        &self.source.text()[self.span.clone()]
    }

    pub fn offset(&self) -> usize {
        self.span.start
    }

    pub fn end(&self) -> usize {
        self.span.end
    }

    pub fn span(&self) -> Range<usize> {
        self.span.clone()
    }

    pub fn line(&self) -> usize {
        self.position.line
    }

    pub fn column(&self) -> usize {
        self.position.column
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn source(&self) -> &Arc<Source> {
        &self.source
    }

    pub fn is_synthetic(&self) -> bool {
        self.span.is_empty()
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.span == other.span && self.text() == other.text()
    }
}

impl Eq for Token {}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{}", self.text(), self.position)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Token", 4)?;
        state.serialize_field("text", self.text())?;
        state.serialize_field("offset", &self.span.start)?;
        state.serialize_field("line", &self.position.line)?;
        state.serialize_field("column", &self.position.column)?;
        state.end()
    }
}
