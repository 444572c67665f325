//! Integer calculator fixture
//!
//!     statement   expr (';' expr)*
//!     expr        int | name | '-' expr | expr op expr | '(' expr ')' | name '(' args ')'
//!     op          ',' (1)   '+' '-' (2)   '*' '/' (3)   '^' (4, right)   call (5)
//!
//! Values are `i64`. Every arithmetic action is checked; overflow and division by zero are
//! rejected. Names resolve through [`CalcContext`], except in call position where the raw
//! function name is used.

use crate::error::{CatalogError, GrammarError};
use crate::grammar::{Grammar, GrammarBuilder};
use crate::parser::Parser;
use crate::semantics::{ActionError, Catalog, Invocation};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Variables visible to the calculator
#[derive(Debug, Clone, Default)]
pub struct CalcContext {
    vars: HashMap<String, i64>,
}

impl CalcContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: i64) -> Self {
        self.vars.insert(name.to_string(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.vars.get(name).copied()
    }
}

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

pub fn grammar() -> Result<Grammar, GrammarError> {
    let mut builder = GrammarBuilder::new();
    let expr = builder.declare("expr");
    builder.define(expr, |s| {
        s.skip("~\\s+")
            .term("int", "~[0-9]+")
            .term("name", "~[A-Za-z_][A-Za-z0-9_]*")
            .infix(",", ",", 1)
            .infix("+", "+", 2)
            .infix_or_prefix("-", "-", 2)
            .infix("*", "*", 3)
            .infix("/", "/", 3)
            .infix_right("^", "^", 4)
            .enclosure_with("(", ")", expr, "call", 5)
            .separator(";")
    });
    builder.build()
}

pub fn catalog() -> Result<Catalog<CalcContext>, CatalogError> {
    Catalog::<CalcContext>::builder()
        .term("int", |inv| {
            inv.text()
                .parse::<i64>()
                .map_err(|_| ActionError::Reject(format!("integer '{}' out of range", inv.text())))
        })
        .term("name", variable)
        .binary(",", |_, mut list: Vec<i64>, item: i64| {
            list.push(item);
            Ok(list)
        })
        .binary("+", |_, a: i64, b: i64| checked(a.checked_add(b)))
        .binary("-", |_, a: i64, b: i64| checked(a.checked_sub(b)))
        .unary("-", |_, a: i64| checked(a.checked_neg()))
        .binary("*", |_, a: i64, b: i64| checked(a.checked_mul(b)))
        .binary("/", |_, a: i64, b: i64| {
            if b == 0 {
                return Err(ActionError::Reject("division by zero".into()));
            }
            checked(a.checked_div(b))
        })
        .binary("^", |_, a: i64, b: i64| {
            let exponent = u32::try_from(b)
                .map_err(|_| ActionError::Reject(format!("invalid exponent {}", b)))?;
            checked(a.checked_pow(exponent))
        })
        .binary("call", |_, name: String, args: Vec<i64>| call(&name, &args))
        .sequence::<i64>()
        .result::<i64>()
        .build()
}

/// The calculator grammar and catalog behind a ready-to-share parser.
pub fn parser() -> Result<Parser<CalcContext>, FixtureError> {
    Ok(Parser::new(Arc::new(grammar()?), Arc::new(catalog()?)))
}

fn variable(inv: &Invocation<'_, CalcContext>) -> Result<i64, ActionError> {
    inv.context
        .get(inv.text())
        .ok_or_else(|| ActionError::Reject(format!("unknown variable '{}'", inv.text())))
}

fn checked(value: Option<i64>) -> Result<i64, ActionError> {
    value.ok_or_else(|| ActionError::Reject("integer overflow".into()))
}

fn call(name: &str, args: &[i64]) -> Result<i64, ActionError> {
    match (name, args) {
        ("sum", _) => checked(args.iter().try_fold(0i64, |acc, &x| acc.checked_add(x))),
        ("max", _) => checked(args.iter().copied().max()),
        ("min", _) => checked(args.iter().copied().min()),
        ("abs", [x]) => checked(x.checked_abs()),
        ("abs", _) => Err(ActionError::Reject(format!(
            "abs takes 1 argument, got {}",
            args.len()
        ))),
        _ => Err(ActionError::Reject(format!("unknown function '{}'", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::validation::validate;

    #[test]
    fn test_fixture_is_consistent() {
        let grammar = grammar().unwrap();
        let catalog = catalog().unwrap();
        assert_eq!(validate(&grammar, &catalog), Vec::<String>::new());
    }

    #[test]
    fn test_calls_and_variables() {
        let parser = parser().unwrap();
        let ctx = CalcContext::new().with("x", 10);
        assert_eq!(parser.parse::<i64>(&ctx, "max(1, x, 3)").unwrap(), 10);
        assert_eq!(parser.parse::<i64>(&ctx, "abs(-x)").unwrap(), 10);
        assert_eq!(parser.parse::<i64>(&ctx, "sum(1, 2) * 2").unwrap(), 6);
    }

    #[test]
    fn test_semantic_rejections() {
        let parser = parser().unwrap();
        let ctx = CalcContext::new();

        let err = parser.parse::<i64>(&ctx, "1 / (2 - 2)").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Semantic);
        assert_eq!(err.message(), "division by zero");
        assert_eq!(err.column(), 3);

        let err = parser.parse::<i64>(&ctx, "y + 1").unwrap_err();
        assert_eq!(err.message(), "unknown variable 'y'");

        let err = parser.parse::<i64>(&ctx, "nope(1)").unwrap_err();
        assert_eq!(err.message(), "unknown function 'nope'");
    }
}
