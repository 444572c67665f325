//! Testing utilities
//!
//! Shared fixtures for unit tests, integration tests and the CLI.
//!
//! The [calculator](calculator) is a small but complete integer arithmetic language exercising
//! most of the toolkit: prefix/infix overloading (`-`), right associativity (`^`), nested
//! enclosures, an enclosure-leading operator (function calls), sequence promotion (a single
//! call argument becomes a one-element list), the raw-text fallback (function names), context
//! lookups (variables) and semantic rejection (division by zero, overflow).
//!
//! Prefer the fixture over ad-hoc grammars in tests that are not about grammar construction
//! itself; the precedence and resolution behavior it pins down is what embedders rely on.

pub mod calculator;

pub use calculator::{CalcContext, FixtureError};

use crate::parser::Parser;

/// Render the untyped tree of `text` as an s-expression, or the error with its excerpt.
///
/// Both outcomes are plain strings, which keeps snapshot assertions short.
pub fn render_tree<C>(parser: &Parser<C>, text: &str) -> String {
    match parser.tree(text) {
        Ok(node) => node.to_string(),
        Err(error) => format!(
            "{}\n{}",
            error,
            error.excerpt(parser.config().diagnostics.excerpt_width)
        ),
    }
}
