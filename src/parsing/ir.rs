//! Parse tree
//!
//! The engine produces one node per operator application. Terms are leaves; prefix and postfix
//! applications are unary; infix, glue and enclosure-leading applications are binary. Every
//! node keeps the token it was built from (synthetic, empty tokens for implicit operators).

use crate::lexing::Token;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Shape class of a node, also used to index actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Arity {
    Term,
    Unary,
    Binary,
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Arity::Term => "term",
            Arity::Unary => "unary",
            Arity::Binary => "binary",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum ParseNode {
    Term {
        op: Arc<str>,
        token: Token,
    },
    Unary {
        op: Arc<str>,
        token: Token,
        operand: Box<ParseNode>,
    },
    Binary {
        op: Arc<str>,
        token: Token,
        left: Box<ParseNode>,
        right: Box<ParseNode>,
    },
}

impl ParseNode {
    pub fn term(op: Arc<str>, token: Token) -> Self {
        ParseNode::Term { op, token }
    }

    pub fn unary(op: Arc<str>, token: Token, operand: ParseNode) -> Self {
        ParseNode::Unary {
            op,
            token,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: Arc<str>, token: Token, left: ParseNode, right: ParseNode) -> Self {
        ParseNode::Binary {
            op,
            token,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn op(&self) -> &Arc<str> {
        match self {
            ParseNode::Term { op, .. }
            | ParseNode::Unary { op, .. }
            | ParseNode::Binary { op, .. } => op,
        }
    }

    pub fn token(&self) -> &Token {
        match self {
            ParseNode::Term { token, .. }
            | ParseNode::Unary { token, .. }
            | ParseNode::Binary { token, .. } => token,
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            ParseNode::Term { .. } => Arity::Term,
            ParseNode::Unary { .. } => Arity::Unary,
            ParseNode::Binary { .. } => Arity::Binary,
        }
    }

    /// Children in source order
    pub fn children(&self) -> Vec<&ParseNode> {
        match self {
            ParseNode::Term { .. } => Vec::new(),
            ParseNode::Unary { operand, .. } => vec![operand.as_ref()],
            ParseNode::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
        }
    }

    /// Offset of the leftmost token of the subtree.
    pub fn start(&self) -> usize {
        match self {
            ParseNode::Term { token, .. } => token.offset(),
            ParseNode::Unary { token, operand, .. } => token.offset().min(operand.start()),
            ParseNode::Binary { left, .. } => left.start(),
        }
    }
}

/// S-expression rendering, handy in tests and the CLI
impl fmt::Display for ParseNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseNode::Term { token, .. } => f.write_str(token.text()),
            ParseNode::Unary { op, operand, .. } => write!(f, "({} {})", op, operand),
            ParseNode::Binary {
                op, left, right, ..
            } => write!(f, "({} {} {})", op, left, right),
        }
    }
}
