//! First-match tokenizer
//!
//! Given a scope and an offset, the tokenizer:
//!
//! 1. consumes skip-rule matches, repeatedly;
//! 2. tests the escape pattern in effect (the enclosure's close pattern, or the entry scope's
//!    separator), which ends the current scope;
//! 3. tests the scope's rules in declaration order, each anchored at the offset.
//!
//! The first rule that matches wins. No match anywhere in the table is a tokenize error at the
//! exact offset.

use super::source::Source;
use super::token::Token;
use crate::error::{ErrorKind, ParseError};
use crate::grammar::{Enclosure, Grammar, OperatorSpec, Pattern, Rule, Scope};
use std::sync::Arc;

/// What the tokenizer found at an offset
#[derive(Debug, Clone)]
pub enum Lexeme<'g> {
    /// Input exhausted (only skip matches remained)
    End,
    /// The escape pattern in effect matched
    Escape(Token),
    Term(&'g OperatorSpec, Token),
    Operator(&'g OperatorSpec, Token),
    Open(&'g Enclosure, Token),
}

impl Lexeme<'_> {
    pub fn token(&self) -> Option<&Token> {
        match self {
            Lexeme::End => None,
            Lexeme::Escape(token)
            | Lexeme::Term(_, token)
            | Lexeme::Operator(_, token)
            | Lexeme::Open(_, token) => Some(token),
        }
    }
}

pub struct Tokenizer<'g> {
    grammar: &'g Grammar,
    source: Arc<Source>,
}

impl<'g> Tokenizer<'g> {
    pub fn new(grammar: &'g Grammar, source: Arc<Source>) -> Self {
        Self { grammar, source }
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    pub fn source(&self) -> &Arc<Source> {
        &self.source
    }

    /// Offset of the first non-skip input at or after `offset`.
    pub fn skip(&self, scope: &Scope, mut offset: usize) -> usize {
        let text = self.source.text();
        'outer: while offset < text.len() {
            for pattern in scope.skips() {
                if let Some(len) = pattern.match_len(&text[offset..]) {
                    offset += len;
                    continue 'outer;
                }
            }
            break;
        }
        offset
    }

    /// The next lexeme at `offset` and the offset just past it.
    pub fn next(
        &self,
        scope: &'g Scope,
        escape: Option<&Pattern>,
        offset: usize,
    ) -> Result<(Lexeme<'g>, usize), ParseError> {
        let start = self.skip(scope, offset);
        let rest = &self.source.text()[start..];
        if rest.is_empty() {
            return Ok((Lexeme::End, start));
        }

        if let Some(len) = escape.and_then(|pattern| pattern.match_len(rest)) {
            return Ok((Lexeme::Escape(self.token(start, len)), start + len));
        }

        for rule in scope.rules() {
            let lexeme = match rule {
                Rule::Token { pattern, op } => pattern
                    .match_len(rest)
                    .map(|len| (Lexeme::Term(op, self.token(start, len)), len)),
                Rule::Operator { pattern, op } => pattern
                    .match_len(rest)
                    .map(|len| (Lexeme::Operator(op, self.token(start, len)), len)),
                Rule::Enclosure(enclosure) => enclosure
                    .open()
                    .match_len(rest)
                    .map(|len| (Lexeme::Open(enclosure, self.token(start, len)), len)),
            };
            if let Some((lexeme, len)) = lexeme {
                return Ok((lexeme, start + len));
            }
        }

        let shown = match rest.chars().next() {
            Some(c) if c.is_whitespace() => format!("{:?}", c),
            _ => {
                let word: String = rest.chars().take_while(|c| !c.is_whitespace()).take(16).collect();
                format!("'{}'", word)
            }
        };
        Err(ParseError::at_offset(
            ErrorKind::Tokenize,
            format!("no rule of scope '{}' matches {}", scope.name(), shown),
            &self.source,
            start,
        ))
    }

    fn token(&self, start: usize, len: usize) -> Token {
        Token::new(&self.source, start..start + len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarBuilder;

    fn grammar() -> Grammar {
        let mut builder = GrammarBuilder::new();
        let expr = builder.declare("expr");
        builder.define(expr, |s| {
            s.skip("~[ \\t]+")
                .skip("~#[^\\n]*")
                .term("int", "~[0-9]+")
                .infix("=", "=", 1)
                .infix("==", "==", 1)
                .enclosure("(", ")", expr)
                .separator(";")
        });
        builder.build().unwrap()
    }

    fn lex_all(grammar: &Grammar, text: &str) -> Result<Vec<String>, ParseError> {
        let tokenizer = Tokenizer::new(grammar, Arc::new(Source::new(text)));
        let scope = grammar.root_scope();
        let mut offset = 0;
        let mut out = Vec::new();
        loop {
            let (lexeme, next) = tokenizer.next(scope, scope.escape(), offset)?;
            let label = match &lexeme {
                Lexeme::End => break,
                Lexeme::Escape(t) => format!("escape {}", t.text()),
                Lexeme::Term(op, t) => format!("term {} {}", op.id(), t.text()),
                Lexeme::Operator(op, t) => format!("op {} {}", op.id(), t.text()),
                Lexeme::Open(_, t) => format!("open {}", t.text()),
            };
            out.push(label);
            offset = next;
        }
        Ok(out)
    }

    #[test]
    fn test_declaration_order_wins() {
        let grammar = grammar();
        // '=' is declared before '==', so '==' lexes as two '='
        let tokens = lex_all(&grammar, "1 == 2").unwrap();
        assert_eq!(
            tokens,
            vec!["term int 1", "op = =", "op = =", "term int 2"]
        );
    }

    #[test]
    fn test_skips_and_escape() {
        let grammar = grammar();
        let tokens = lex_all(&grammar, " 1 ; (2 ").unwrap();
        assert_eq!(tokens, vec!["term int 1", "escape ;", "open (", "term int 2"]);
    }

    #[test]
    fn test_unskipped_newline_fails() {
        let grammar = grammar();
        let err = lex_all(&grammar, "1 # comment\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Tokenize);
        assert_eq!((err.line(), err.column()), (1, 12));
        assert_eq!(err.message(), "no rule of scope 'expr' matches '\\n'");
    }

    #[test]
    fn test_no_match_reports_position() {
        let grammar = grammar();
        let err = lex_all(&grammar, "1 = $x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Tokenize);
        assert_eq!(err.offset(), 4);
        assert_eq!(err.column(), 5);
        assert_eq!(err.message(), "no rule of scope 'expr' matches '$x'");
    }
}
