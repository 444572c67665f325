//! Scopes, rules and operator specifications

use super::pattern::Pattern;
use std::fmt;
use std::sync::Arc;

/// How an operator combines with its operands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Term,
    Prefix,
    Postfix,
    Infix,
    /// Prefix when no left operand is pending, infix otherwise
    InfixOrPrefix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Associativity {
    #[default]
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorSpec {
    id: Arc<str>,
    kind: OperatorKind,
    rank: u32,
    associativity: Associativity,
}

impl OperatorSpec {
    pub(crate) fn new(id: &str, kind: OperatorKind, rank: u32, associativity: Associativity) -> Self {
        Self {
            id: Arc::from(id),
            kind,
            rank,
            associativity,
        }
    }

    pub fn id(&self) -> &Arc<str> {
        &self.id
    }

    pub fn kind(&self) -> OperatorKind {
        self.kind
    }

    pub fn rank(&self) -> u32 {
        self.rank
    }

    pub fn associativity(&self) -> Associativity {
        self.associativity
    }
}

impl fmt::Display for OperatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.id)
    }
}

/// Handle on a scope in the grammar arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeRef(pub(crate) usize);

impl ScopeRef {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A bracket-like construct owning a nested scope
#[derive(Debug, Clone)]
pub struct Enclosure {
    pub(crate) open: Pattern,
    pub(crate) close: Pattern,
    pub(crate) scope: ScopeRef,
    pub(crate) leading: Option<OperatorSpec>,
}

impl Enclosure {
    pub fn open(&self) -> &Pattern {
        &self.open
    }

    /// Escape pattern of the nested scope while inside this enclosure
    pub fn close(&self) -> &Pattern {
        &self.close
    }

    pub fn scope(&self) -> ScopeRef {
        self.scope
    }

    /// Implicit operator inserted when the open bracket directly follows a term
    pub fn leading(&self) -> Option<&OperatorSpec> {
        self.leading.as_ref()
    }
}

#[derive(Debug, Clone)]
pub enum Rule {
    Token { pattern: Pattern, op: OperatorSpec },
    Operator { pattern: Pattern, op: OperatorSpec },
    Enclosure(Enclosure),
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub(crate) name: String,
    pub(crate) rules: Vec<Rule>,
    pub(crate) skips: Vec<Pattern>,
    pub(crate) escape: Option<Pattern>,
    pub(crate) glue: Option<OperatorSpec>,
}

impl Scope {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rules: Vec::new(),
            skips: Vec::new(),
            escape: None,
            glue: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rules in declaration (= match priority) order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn skips(&self) -> &[Pattern] {
        &self.skips
    }

    pub fn escape(&self) -> Option<&Pattern> {
        self.escape.as_ref()
    }

    pub fn glue(&self) -> Option<&OperatorSpec> {
        self.glue.as_ref()
    }
}

/// An immutable, shareable grammar
#[derive(Debug, Clone)]
pub struct Grammar {
    pub(crate) scopes: Vec<Scope>,
    pub(crate) root: ScopeRef,
    pub(crate) top_level: Option<Arc<str>>,
}

impl Grammar {
    pub fn root(&self) -> ScopeRef {
        self.root
    }

    pub fn root_scope(&self) -> &Scope {
        self.scope(self.root)
    }

    /// Panics only on a handle from another grammar; handles from this grammar's builder are
    /// always valid.
    pub fn scope(&self, scope: ScopeRef) -> &Scope {
        &self.scopes[scope.0]
    }

    pub fn scopes(&self) -> impl Iterator<Item = (ScopeRef, &Scope)> {
        self.scopes
            .iter()
            .enumerate()
            .map(|(i, scope)| (ScopeRef(i), scope))
    }

    /// Pseudo operator applied as a final unary step to every parsed statement
    pub fn top_level(&self) -> Option<&Arc<str>> {
        self.top_level.as_ref()
    }
}
