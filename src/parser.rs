//! Parse entry points
//!
//! [`Parser`] ties a grammar and an action catalog together. Both are shared behind `Arc`s and
//! never mutated, so one parser can serve any number of threads; every call keeps its own
//! tokenizer, operator stack and resolver on the stack.
//!
//!     tree          text -> untyped ParseNode (the whole input must be consumed)
//!     parse         text -> T
//!     parse_next    cursor -> Option<T>, one separator-terminated statement per call

use crate::config::ParserConfig;
use crate::error::{ErrorKind, ParseError};
use crate::grammar::Grammar;
use crate::lexing::{Source, Token};
use crate::parsing::{Cursor, Engine, Outcome, ParseNode, Termination};
use crate::semantics::{Catalog, Resolver};
use std::sync::Arc;

pub struct Parser<C> {
    grammar: Arc<Grammar>,
    catalog: Arc<Catalog<C>>,
    config: ParserConfig,
}

impl<C> Clone for Parser<C> {
    fn clone(&self) -> Self {
        Self {
            grammar: Arc::clone(&self.grammar),
            catalog: Arc::clone(&self.catalog),
            config: self.config.clone(),
        }
    }
}

impl<C> Parser<C> {
    pub fn new(grammar: Arc<Grammar>, catalog: Arc<Catalog<C>>) -> Self {
        Self {
            grammar,
            catalog,
            config: ParserConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn catalog(&self) -> &Catalog<C> {
        &self.catalog
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse the whole of `text` into an untyped tree.
    pub fn tree(&self, text: &str) -> Result<ParseNode, ParseError> {
        let source = Arc::new(Source::new(text));
        self.check_size(&source)?;
        let engine = self.engine(&source);
        let outcome = engine.parse_statement(self.grammar.root(), 0)?;
        self.ensure_consumed(&engine, &outcome)?;
        Ok(outcome.node)
    }

    /// Parse the whole of `text` and resolve it into a `T`.
    pub fn parse<T: 'static>(&self, context: &C, text: &str) -> Result<T, ParseError> {
        tracing::debug!(bytes = text.len(), target = std::any::type_name::<T>(), "parse");
        let node = self.tree(text)?;
        self.resolve(context, node)
    }

    /// Parse and resolve the next statement of `cursor`.
    ///
    /// Returns `Ok(None)` once only skippable input remains. After a successful parse the
    /// cursor sits past the statement and its separator, whether or not resolution succeeded,
    /// so the caller may carry on with the next statement. Tokenize and structural errors
    /// leave no reliable resume point and move the cursor to the end of the input.
    pub fn parse_next<T: 'static>(
        &self,
        context: &C,
        cursor: &mut Cursor,
    ) -> Result<Option<T>, ParseError> {
        let source = Arc::clone(cursor.source());
        self.check_size(&source)?;
        let engine = self.engine(&source);

        let start = engine
            .tokenizer()
            .skip(self.grammar.root_scope(), cursor.offset());
        if start >= source.len() {
            cursor.advance_to(source.len());
            return Ok(None);
        }

        let outcome = match engine.parse_statement(self.grammar.root(), start) {
            Ok(outcome) => outcome,
            Err(error) => {
                cursor.advance_to(source.len());
                return Err(error);
            }
        };
        cursor.advance_to(outcome.end);
        tracing::debug!(
            start,
            end = outcome.end,
            target = std::any::type_name::<T>(),
            "statement parsed"
        );
        self.resolve(context, outcome.node).map(Some)
    }

    fn engine<'g>(&'g self, source: &Arc<Source>) -> Engine<'g> {
        Engine::new(&self.grammar, Arc::clone(source), self.config.limits.max_depth)
    }

    fn check_size(&self, source: &Arc<Source>) -> Result<(), ParseError> {
        let limit = self.config.limits.max_input_bytes;
        if limit > 0 && source.len() > limit {
            return Err(ParseError::at_offset(
                ErrorKind::Limit,
                format!("input of {} bytes exceeds the limit of {}", source.len(), limit),
                source,
                0,
            ));
        }
        Ok(())
    }

    /// After a separator only skippable input may follow.
    fn ensure_consumed(&self, engine: &Engine<'_>, outcome: &Outcome) -> Result<(), ParseError> {
        if let Termination::End = outcome.termination {
            return Ok(());
        }
        let tokenizer = engine.tokenizer();
        let rest = tokenizer.skip(self.grammar.root_scope(), outcome.end);
        if rest < tokenizer.source().len() {
            return Err(ParseError::at_offset(
                ErrorKind::Structural,
                "unexpected trailing input",
                tokenizer.source(),
                rest,
            ));
        }
        Ok(())
    }

    /// Resolve a tree, wrapping it in the grammar's top-level operator when one is set.
    fn resolve<T: 'static>(&self, context: &C, node: ParseNode) -> Result<T, ParseError> {
        let node = match self.grammar.top_level() {
            Some(op) => {
                let token = Token::synthetic(node.token().source(), node.start());
                ParseNode::unary(Arc::clone(op), token, node)
            }
            None => node,
        };
        Resolver::new(&self.catalog, context).resolve(&node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimitsConfig;
    use crate::grammar::GrammarBuilder;
    use crate::semantics::ActionError;

    fn words() -> Parser<()> {
        let mut builder = GrammarBuilder::new();
        builder.scope("words", |s| {
            s.skip("~[ \\n]+")
                .term("word", "~[a-z]+")
                .infix("+", "+", 1)
                .separator(".")
        });
        builder.top_level("sentence");
        let catalog = Catalog::<()>::builder()
            .binary("+", |_, a: String, b: String| Ok(format!("{} {}", a, b)))
            .unary("sentence", |_, s: String| {
                let mut chars = s.chars();
                match chars.next() {
                    Some(first) => Ok(first.to_uppercase().chain(chars).collect::<String>()),
                    None => Err(ActionError::Reject("empty sentence".into())),
                }
            })
            .build()
            .unwrap();
        Parser::new(Arc::new(builder.build().unwrap()), Arc::new(catalog))
    }

    #[test]
    fn test_top_level_hook_applies_to_root() {
        let parser = words();
        assert_eq!(parser.parse::<String>(&(), "hello + world").unwrap(), "Hello world");
    }

    #[test]
    fn test_single_trailing_separator_is_accepted() {
        let parser = words();
        assert!(parser.parse::<String>(&(), "a + b. ").is_ok());
        let err = parser.parse::<String>(&(), "a. b").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
        assert_eq!(err.message(), "unexpected trailing input");
        assert_eq!(err.column(), 4);
    }

    #[test]
    fn test_parse_next_walks_statements() {
        let parser = words();
        let mut cursor = Cursor::new("a + b.\nc.  ");
        assert_eq!(parser.parse_next::<String>(&(), &mut cursor).unwrap().unwrap(), "A b");
        assert_eq!(parser.parse_next::<String>(&(), &mut cursor).unwrap().unwrap(), "C");
        assert_eq!(parser.parse_next::<String>(&(), &mut cursor).unwrap(), None);
        assert_eq!(parser.parse_next::<String>(&(), &mut cursor).unwrap(), None);
    }

    #[test]
    fn test_input_size_limit() {
        let config = ParserConfig {
            limits: LimitsConfig {
                max_depth: 8,
                max_input_bytes: 4,
            },
            ..ParserConfig::default()
        };
        let parser = words().with_config(config);
        assert!(parser.tree("a+b").is_ok());
        let err = parser.tree("a + b").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Limit);
    }
}
