//! Fluent grammar builder
//!
//! Scopes are declared first and defined afterwards, so that a scope can reference itself or a
//! scope defined later:
//!
//! ```ignore
//! let mut builder = GrammarBuilder::new();
//! let expr = builder.declare("expr");
//! builder.define(expr, |s| {
//!     s.skip("~\\s+")
//!         .term("int", "~[0-9]+")
//!         .infix("+", "+", 1)
//!         .infix("*", "*", 2)
//!         .enclosure("(", ")", expr)
//! });
//! let grammar = builder.build()?;
//! ```
//!
//! Mistakes (bad regular expressions, rank 0, a second glue or escape in one scope) are latched
//! at the first occurrence and reported by [`GrammarBuilder::build`].

use super::pattern::{IntoPattern, Pattern};
use super::scope::{Associativity, Enclosure, Grammar, OperatorKind, OperatorSpec, Rule, Scope, ScopeRef};
use crate::error::GrammarError;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct GrammarBuilder {
    names: Vec<String>,
    scopes: Vec<Option<Scope>>,
    root: Option<ScopeRef>,
    top_level: Option<Arc<str>>,
    error: Option<GrammarError>,
}

impl GrammarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a scope handle without defining its rules yet.
    pub fn declare(&mut self, name: &str) -> ScopeRef {
        self.names.push(name.to_string());
        self.scopes.push(None);
        ScopeRef(self.scopes.len() - 1)
    }

    /// Define the rules of a declared scope.
    pub fn define<F>(&mut self, scope: ScopeRef, f: F) -> &mut Self
    where
        F: FnOnce(ScopeBuilder) -> ScopeBuilder,
    {
        let Some(name) = self.names.get(scope.0).cloned() else {
            self.latch(GrammarError::UndefinedScope {
                scope: format!("#{}", scope.0),
            });
            return self;
        };
        if self.scopes[scope.0].is_some() {
            self.latch(GrammarError::ScopeRedefined { scope: name });
            return self;
        }

        let built = f(ScopeBuilder::new(&name));
        if let Some(error) = built.error {
            self.latch(error);
        }
        self.scopes[scope.0] = Some(built.scope);
        self
    }

    /// Declare and define a scope in one step.
    pub fn scope<F>(&mut self, name: &str, f: F) -> ScopeRef
    where
        F: FnOnce(ScopeBuilder) -> ScopeBuilder,
    {
        let scope = self.declare(name);
        self.define(scope, f);
        scope
    }

    /// Entry scope of parse calls; defaults to the first declared scope.
    pub fn root(&mut self, scope: ScopeRef) -> &mut Self {
        self.root = Some(scope);
        self
    }

    /// Designate a pseudo operator applied as one final unary step to every parsed statement.
    pub fn top_level(&mut self, id: &str) -> &mut Self {
        self.top_level = Some(Arc::from(id));
        self
    }

    pub fn build(self) -> Result<Grammar, GrammarError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let mut scopes = Vec::with_capacity(self.scopes.len());
        for (scope, name) in self.scopes.into_iter().zip(&self.names) {
            match scope {
                Some(scope) => scopes.push(scope),
                None => return Err(GrammarError::UndefinedScope { scope: name.clone() }),
            }
        }

        for scope in &scopes {
            for rule in &scope.rules {
                if let Rule::Enclosure(enclosure) = rule {
                    if enclosure.scope.0 >= scopes.len() {
                        return Err(GrammarError::UndefinedScope {
                            scope: format!("#{}", enclosure.scope.0),
                        });
                    }
                }
            }
        }

        let root = match self.root {
            Some(root) if root.0 < scopes.len() => root,
            Some(root) => {
                return Err(GrammarError::UndefinedScope {
                    scope: format!("#{}", root.0),
                })
            }
            None if scopes.is_empty() => return Err(GrammarError::NoRootScope),
            None => ScopeRef(0),
        };

        tracing::debug!(
            scopes = scopes.len(),
            root = %scopes[root.0].name,
            "grammar built"
        );

        Ok(Grammar {
            scopes,
            root,
            top_level: self.top_level,
        })
    }

    fn latch(&mut self, error: GrammarError) {
        self.error.get_or_insert(error);
    }
}

/// Rule declarations for one scope, in match-priority order
#[derive(Debug)]
pub struct ScopeBuilder {
    scope: Scope,
    error: Option<GrammarError>,
}

impl ScopeBuilder {
    fn new(name: &str) -> Self {
        Self {
            scope: Scope::new(name),
            error: None,
        }
    }

    /// A term: the match becomes a leaf node with operator id `id`.
    pub fn term(self, id: &str, pattern: impl IntoPattern) -> Self {
        self.with_pattern(pattern, |scope, pattern| {
            scope.rules.push(Rule::Token {
                pattern,
                op: OperatorSpec::new(id, OperatorKind::Term, 0, Associativity::Left),
            });
            Ok(())
        })
    }

    pub fn operator(
        self,
        id: &str,
        pattern: impl IntoPattern,
        kind: OperatorKind,
        rank: u32,
        associativity: Associativity,
    ) -> Self {
        if kind == OperatorKind::Term {
            return self.term(id, pattern);
        }
        self.with_pattern(pattern, |scope, pattern| {
            let op = checked_operator(id, kind, rank, associativity)?;
            scope.rules.push(Rule::Operator { pattern, op });
            Ok(())
        })
    }

    pub fn prefix(self, id: &str, pattern: impl IntoPattern, rank: u32) -> Self {
        self.operator(id, pattern, OperatorKind::Prefix, rank, Associativity::Left)
    }

    pub fn postfix(self, id: &str, pattern: impl IntoPattern, rank: u32) -> Self {
        self.operator(id, pattern, OperatorKind::Postfix, rank, Associativity::Left)
    }

    pub fn infix(self, id: &str, pattern: impl IntoPattern, rank: u32) -> Self {
        self.operator(id, pattern, OperatorKind::Infix, rank, Associativity::Left)
    }

    pub fn infix_right(self, id: &str, pattern: impl IntoPattern, rank: u32) -> Self {
        self.operator(id, pattern, OperatorKind::Infix, rank, Associativity::Right)
    }

    pub fn infix_or_prefix(self, id: &str, pattern: impl IntoPattern, rank: u32) -> Self {
        self.operator(id, pattern, OperatorKind::InfixOrPrefix, rank, Associativity::Left)
    }

    /// A bracket entering `scope`, left again when `close` matches.
    pub fn enclosure(self, open: impl IntoPattern, close: impl IntoPattern, scope: ScopeRef) -> Self {
        self.with_enclosure(open, close, scope, None)
    }

    /// A bracket that, when directly following a term, is joined to it by the implicit infix
    /// operator `leading` (calls, indexing).
    pub fn enclosure_with(
        self,
        open: impl IntoPattern,
        close: impl IntoPattern,
        scope: ScopeRef,
        leading: &str,
        rank: u32,
    ) -> Self {
        match checked_operator(leading, OperatorKind::Infix, rank, Associativity::Left) {
            Ok(op) => self.with_enclosure(open, close, scope, Some(op)),
            Err(error) => self.fail(error),
        }
    }

    /// Implicit infix operator synthesized between two adjacent terms.
    pub fn glue(mut self, id: &str, rank: u32) -> Self {
        if self.scope.glue.is_some() {
            let error = GrammarError::DuplicateGlue {
                scope: self.scope.name.clone(),
            };
            return self.fail(error);
        }
        match checked_operator(id, OperatorKind::Infix, rank, Associativity::Left) {
            Ok(op) => {
                self.scope.glue = Some(op);
                self
            }
            Err(error) => self.fail(error),
        }
    }

    /// Input discarded wherever it matches ahead of a token.
    pub fn skip(self, pattern: impl IntoPattern) -> Self {
        self.with_pattern(pattern, |scope, pattern| {
            scope.skips.push(pattern);
            Ok(())
        })
    }

    /// The scope's escape pattern, ending a statement.
    pub fn separator(self, pattern: impl IntoPattern) -> Self {
        self.with_pattern(pattern, |scope, pattern| {
            if scope.escape.is_some() {
                return Err(GrammarError::DuplicateEscape {
                    scope: scope.name.clone(),
                });
            }
            scope.escape = Some(pattern);
            Ok(())
        })
    }

    fn with_enclosure(
        self,
        open: impl IntoPattern,
        close: impl IntoPattern,
        scope: ScopeRef,
        leading: Option<OperatorSpec>,
    ) -> Self {
        let close = match close.into_pattern() {
            Ok(close) => close,
            Err(error) => return self.fail(error),
        };
        self.with_pattern(open, |target, open| {
            target.rules.push(Rule::Enclosure(Enclosure {
                open,
                close,
                scope,
                leading,
            }));
            Ok(())
        })
    }

    fn with_pattern<F>(mut self, pattern: impl IntoPattern, f: F) -> Self
    where
        F: FnOnce(&mut Scope, Pattern) -> Result<(), GrammarError>,
    {
        if self.error.is_some() {
            return self;
        }
        let result = pattern
            .into_pattern()
            .and_then(|pattern| f(&mut self.scope, pattern));
        match result {
            Ok(()) => self,
            Err(error) => self.fail(error),
        }
    }

    fn fail(mut self, error: GrammarError) -> Self {
        self.error.get_or_insert(error);
        self
    }
}

fn checked_operator(
    id: &str,
    kind: OperatorKind,
    rank: u32,
    associativity: Associativity,
) -> Result<OperatorSpec, GrammarError> {
    if rank == 0 {
        return Err(GrammarError::InvalidRank {
            id: id.to_string(),
            rank,
        });
    }
    Ok(OperatorSpec::new(id, kind, rank, associativity))
}
