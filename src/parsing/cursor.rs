//! Multi-statement cursor
//!
//! A cursor owns the source of a multi-statement input and the offset of the next statement.
//! [`Parser::parse_next`](crate::Parser::parse_next) advances it past one statement and its
//! separator per call. The cursor is the one piece of mutable state shared across calls; it is
//! borrowed mutably, so it cannot be driven from two threads at once.

use crate::lexing::Source;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Cursor {
    source: Arc<Source>,
    offset: usize,
}

impl Cursor {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            source: Arc::new(Source::new(text)),
            offset: 0,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn source(&self) -> &Arc<Source> {
        &self.source
    }

    /// Input not consumed yet
    pub fn remaining(&self) -> &str {
        &self.source.text()[self.offset..]
    }

    pub(crate) fn advance_to(&mut self, offset: usize) {
        self.offset = offset.clamp(self.offset, self.source.len());
    }
}
