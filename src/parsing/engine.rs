//! Operator-precedence engine
//!
//!     A shunting-yard variant working on a single stack. Each slot is either an operand (a
//!     completed subtree) or a pending operator waiting for its right operand.
//!
//! Pushing an operand
//!
//!     Two operands are never adjacent on the stack. If the top is already an operand, the
//!     scope's glue operator is synthesized between them; without glue this is a structural
//!     error.
//!
//! Pushing an operator of rank r
//!
//!     While the nearest pending operator has rank >= r (> r for right-associative incoming
//!     operators), it is reduced: combined with the operand to its right, and with the operand
//!     to its left unless it sits in prefix position. Then the new operator is pushed. Prefix
//!     operators go straight onto the stack (on an empty stack or after another operator, so
//!     `- - 1` stacks as `-(-(1))`). Postfix operators reduce the same way and then apply at
//!     once to the operand on top.
//!
//! End of scope
//!
//!     Input exhausted or the escape pattern matched: reduce until one operand remains. A
//!     pending operator still waiting for its right operand is a "missing right-hand side".
//!
//! Enclosures
//!
//!     An open pattern optionally pushes the enclosure's leading operator (when it directly
//!     follows an operand), then recursively runs this same algorithm on the nested scope,
//!     bounded by the close pattern. The resulting subtree is pushed as a single operand.
//!
//! Every push is O(1) and every operator is reduced once, so parsing is linear in the number
//! of tokens. Recursion depth equals enclosure nesting and is capped by `max_depth`.

use crate::error::{ErrorKind, ParseError};
use crate::grammar::{Associativity, Grammar, OperatorKind, OperatorSpec, Pattern, Scope, ScopeRef};
use crate::lexing::{Lexeme, Source, Token, Tokenizer};
use crate::parsing::ir::ParseNode;
use std::sync::Arc;

/// Why a scope ended
#[derive(Debug, Clone)]
pub enum Termination {
    /// Input exhausted
    End,
    /// The escape pattern in effect matched this token
    Escape(Token),
}

/// A completed scope
#[derive(Debug, Clone)]
pub struct Outcome {
    pub node: ParseNode,
    /// Offset just past the input consumed, including the escape match
    pub end: usize,
    pub termination: Termination,
}

/// What ends the scope being parsed
#[derive(Debug, Clone, Copy)]
enum Bound<'g, 't> {
    /// Entry scope of a parse call, ended by its separator or by end of input
    Entry(Option<&'g Pattern>),
    /// Nested scope, ended only by the enclosure's close pattern
    Enclosure { close: &'g Pattern, open: &'t Token },
}

pub struct Engine<'g> {
    tokenizer: Tokenizer<'g>,
    max_depth: usize,
}

impl<'g> Engine<'g> {
    pub fn new(grammar: &'g Grammar, source: Arc<Source>, max_depth: usize) -> Self {
        Self {
            tokenizer: Tokenizer::new(grammar, source),
            max_depth,
        }
    }

    pub fn tokenizer(&self) -> &Tokenizer<'g> {
        &self.tokenizer
    }

    /// Parse one statement of `scope` starting at `offset`, as the entry scope of a call.
    pub fn parse_statement(&self, scope: ScopeRef, offset: usize) -> Result<Outcome, ParseError> {
        let grammar = self.tokenizer.grammar();
        let escape = grammar.scope(scope).escape();
        self.parse_scope(scope, Bound::Entry(escape), offset, 0)
    }

    fn parse_scope(
        &self,
        scope: ScopeRef,
        bound: Bound<'g, '_>,
        mut offset: usize,
        depth: usize,
    ) -> Result<Outcome, ParseError> {
        let scope = self.tokenizer.grammar().scope(scope);
        let source = self.tokenizer.source();
        let escape = match bound {
            Bound::Entry(escape) => escape,
            Bound::Enclosure { close, .. } => Some(close),
        };
        let mut stack = OperatorStack::new(scope, Arc::clone(source));

        loop {
            let (lexeme, next) = self.tokenizer.next(scope, escape, offset)?;
            match lexeme {
                Lexeme::End => {
                    if let Bound::Enclosure { open, .. } = bound {
                        return Err(ParseError::at(
                            ErrorKind::Structural,
                            format!("unclosed '{}'", open.text()),
                            open,
                        ));
                    }
                    let node = stack.finish(&Token::synthetic(source, next))?;
                    return Ok(Outcome {
                        node,
                        end: next,
                        termination: Termination::End,
                    });
                }
                Lexeme::Escape(token) => {
                    let node = stack.finish(&token)?;
                    return Ok(Outcome {
                        node,
                        end: next,
                        termination: Termination::Escape(token),
                    });
                }
                Lexeme::Term(op, token) => {
                    stack.push_operand(ParseNode::term(Arc::clone(op.id()), token))?;
                }
                Lexeme::Operator(op, token) => {
                    stack.push_operator(op, token)?;
                }
                Lexeme::Open(enclosure, token) => {
                    if depth >= self.max_depth {
                        return Err(ParseError::at(
                            ErrorKind::Limit,
                            format!("enclosures nested deeper than {} levels", self.max_depth),
                            &token,
                        ));
                    }
                    if stack.top_is_operand() {
                        if let Some(leading) = enclosure.leading() {
                            stack.push_operator(leading, Token::synthetic(source, token.offset()))?;
                        }
                    }

                    tracing::trace!(open = %token.text(), depth, "entering enclosure");
                    let inner = self.parse_scope(
                        enclosure.scope(),
                        Bound::Enclosure {
                            close: enclosure.close(),
                            open: &token,
                        },
                        next,
                        depth + 1,
                    )?;
                    stack.push_operand(inner.node)?;
                    offset = inner.end;
                    continue;
                }
            }
            offset = next;
        }
    }
}

#[derive(Debug)]
enum Slot<'g> {
    Operand(ParseNode),
    Pending {
        op: &'g OperatorSpec,
        token: Token,
        prefix: bool,
    },
}

struct OperatorStack<'g> {
    scope: &'g Scope,
    source: Arc<Source>,
    slots: Vec<Slot<'g>>,
}

impl<'g> OperatorStack<'g> {
    fn new(scope: &'g Scope, source: Arc<Source>) -> Self {
        Self {
            scope,
            source,
            slots: Vec::new(),
        }
    }

    fn top_is_operand(&self) -> bool {
        matches!(self.slots.last(), Some(Slot::Operand(_)))
    }

    fn push_operand(&mut self, node: ParseNode) -> Result<(), ParseError> {
        if self.top_is_operand() {
            self.glue_before(node.start())?;
        }
        self.slots.push(Slot::Operand(node));
        Ok(())
    }

    fn push_operator(&mut self, op: &'g OperatorSpec, token: Token) -> Result<(), ParseError> {
        let after_operand = self.top_is_operand();
        match (op.kind(), after_operand) {
            (OperatorKind::Term, _) => {
                self.push_operand(ParseNode::term(Arc::clone(op.id()), token))?;
            }
            (OperatorKind::Prefix, false) | (OperatorKind::InfixOrPrefix, false) => {
                self.push_pending(op, token, true);
            }
            (OperatorKind::Prefix, true) => {
                self.glue_before(token.offset())?;
                self.push_pending(op, token, true);
            }
            (OperatorKind::Infix, true) | (OperatorKind::InfixOrPrefix, true) => {
                self.reduce_for(op)?;
                self.push_pending(op, token, false);
            }
            (OperatorKind::Postfix, true) => {
                self.reduce_for(op)?;
                let operand = self.pop_operand(&token)?;
                tracing::trace!(op = %op.id(), "apply postfix");
                self.slots.push(Slot::Operand(ParseNode::unary(
                    Arc::clone(op.id()),
                    token,
                    operand,
                )));
            }
            (OperatorKind::Infix, false) | (OperatorKind::Postfix, false) => {
                let message = if self.slots.is_empty() {
                    format!("missing left-hand side for '{}'", token.text())
                } else {
                    format!("two consecutive operators before '{}'", token.text())
                };
                return Err(ParseError::at(ErrorKind::Structural, message, &token));
            }
        }
        Ok(())
    }

    fn push_pending(&mut self, op: &'g OperatorSpec, token: Token, prefix: bool) {
        self.slots.push(Slot::Pending { op, token, prefix });
    }

    /// Synthesize the glue operator in front of input starting at `offset`.
    fn glue_before(&mut self, offset: usize) -> Result<(), ParseError> {
        let token = Token::synthetic(&self.source, offset);
        match self.scope.glue() {
            Some(glue) => {
                self.reduce_for(glue)?;
                self.push_pending(glue, token, false);
                Ok(())
            }
            None => Err(ParseError::at(
                ErrorKind::Structural,
                "two consecutive operands",
                &token,
            )),
        }
    }

    /// Rank of the nearest pending operator, when its right operand is complete.
    fn pending_rank(&self) -> Option<u32> {
        let len = self.slots.len();
        if len < 2 || !self.top_is_operand() {
            return None;
        }
        match &self.slots[len - 2] {
            Slot::Pending { op, .. } => Some(op.rank()),
            Slot::Operand(_) => None,
        }
    }

    fn reduce_for(&mut self, incoming: &OperatorSpec) -> Result<(), ParseError> {
        while let Some(rank) = self.pending_rank() {
            let binds = match incoming.associativity() {
                Associativity::Left => rank >= incoming.rank(),
                Associativity::Right => rank > incoming.rank(),
            };
            if !binds {
                break;
            }
            self.reduce_top()?;
        }
        Ok(())
    }

    /// Combine the nearest pending operator with its operand(s).
    fn reduce_top(&mut self) -> Result<(), ParseError> {
        let end = Token::synthetic(&self.source, self.source.len());
        let right = self.pop_operand(&end)?;
        let Some(Slot::Pending { op, token, prefix }) = self.slots.pop() else {
            return Err(malformed(&end));
        };

        tracing::trace!(op = %op.id(), prefix, "reduce");
        let node = if prefix {
            ParseNode::unary(Arc::clone(op.id()), token, right)
        } else {
            let left = self.pop_operand(&token)?;
            ParseNode::binary(Arc::clone(op.id()), token, left, right)
        };
        self.slots.push(Slot::Operand(node));
        Ok(())
    }

    fn pop_operand(&mut self, near: &Token) -> Result<ParseNode, ParseError> {
        match self.slots.pop() {
            Some(Slot::Operand(node)) => Ok(node),
            _ => Err(malformed(near)),
        }
    }

    /// Reduce everything and return the single remaining tree.
    fn finish(mut self, end: &Token) -> Result<ParseNode, ParseError> {
        match self.slots.last() {
            None => {
                return Err(ParseError::at(ErrorKind::Structural, "empty expression", end));
            }
            Some(Slot::Pending { token, .. }) => {
                return Err(ParseError::at(
                    ErrorKind::Structural,
                    format!("missing right-hand side for '{}'", token.text()),
                    token,
                ));
            }
            Some(Slot::Operand(_)) => {}
        }

        while self.slots.len() > 1 {
            self.reduce_top()?;
        }
        self.pop_operand(end)
    }
}

fn malformed(near: &Token) -> ParseError {
    ParseError::at(ErrorKind::Structural, "malformed operator stack", near)
}
