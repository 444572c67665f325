//! Grammar validation
//!
//!     Checks a grammar against an action catalog without any input text, answering: can every
//!     operator the grammar can produce ever be resolved?
//!
//!     1. Walk the scopes reachable from the root (through enclosures) and collect the
//!        distinct (arity, id) pairs a parse tree could contain.
//!     2. Every reachable token id needs at least one term action.
//!     3. A type is *producible* when it is the raw-text type, when a reachable term action
//!        yields it, or when a reachable unary/binary action yields it and all of that
//!        action's arguments are producible in turn. Arguments may also go through one
//!        converter, or be promoted from the element of a declared sequence, since the
//!        resolver does both. Actions already on the current path are skipped, so cyclic
//!        grammars terminate.
//!     4. Every reachable unary/binary id needs an action whose result is consumed somewhere
//!        (as an argument, a converter input or a declared result type) and whose arguments
//!        are all producible.
//!     5. Actions that never satisfy step 4 (or term actions for ids the grammar never
//!        produces) are dead entries.
//!
//! The result is a list of human readable diagnostics; empty means consistent.

use crate::grammar::{Grammar, OperatorKind, Rule, ScopeRef};
use crate::parsing::Arity;
use crate::semantics::{ActionSignature, Allow, Catalog, TypeKey};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

/// Nesting bound for the scope walk
const MAX_SCOPE_DEPTH: usize = 32;

pub fn validate<C>(grammar: &Grammar, catalog: &Catalog<C>) -> Vec<String> {
    let reachable = reachable_ops(grammar);
    let checker = Checker::new(catalog, &reachable);
    let mut diagnostics = Vec::new();

    for (arity, id) in &reachable {
        if *arity == Arity::Term && !catalog.has_action(Arity::Term, id) {
            diagnostics.push(format!("missing token action for '{}'", id));
        }
    }

    let mut satisfied = HashSet::new();
    for (arity, id) in &reachable {
        if *arity == Arity::Term {
            continue;
        }
        let mut resolvable = false;
        for (index, signature) in checker.actions.iter().enumerate() {
            if signature.arity() != *arity || signature.op() != id {
                continue;
            }
            if checker.is_consumed(signature.returns())
                && checker.arguments_producible(signature, &mut vec![index])
            {
                satisfied.insert(index);
                resolvable = true;
            }
        }
        if !resolvable {
            diagnostics.push(format!("unresolvable action for '{}'", id));
        }
    }

    for (index, signature) in checker.actions.iter().enumerate() {
        let used = match signature.arity() {
            Arity::Term => reachable.contains(&(Arity::Term, Arc::clone(signature.op()))),
            Arity::Unary | Arity::Binary => satisfied.contains(&index),
        };
        if !used {
            diagnostics.push(format!("unreachable action '{}'", signature));
        }
    }

    tracing::debug!(
        reachable = reachable.len(),
        diagnostics = diagnostics.len(),
        "grammar validated"
    );
    diagnostics
}

/// Distinct (arity, id) pairs a parse tree of `grammar` may contain.
fn reachable_ops(grammar: &Grammar) -> BTreeSet<(Arity, Arc<str>)> {
    let mut ops = BTreeSet::new();
    let mut visited = HashSet::new();
    walk(grammar, grammar.root(), 0, &mut visited, &mut ops);
    if let Some(top) = grammar.top_level() {
        ops.insert((Arity::Unary, Arc::clone(top)));
    }
    ops
}

fn walk(
    grammar: &Grammar,
    scope: ScopeRef,
    depth: usize,
    visited: &mut HashSet<ScopeRef>,
    ops: &mut BTreeSet<(Arity, Arc<str>)>,
) {
    if depth > MAX_SCOPE_DEPTH || !visited.insert(scope) {
        return;
    }
    let scope = grammar.scope(scope);
    if let Some(glue) = scope.glue() {
        ops.insert((Arity::Binary, Arc::clone(glue.id())));
    }
    for rule in scope.rules() {
        match rule {
            Rule::Token { op, .. } | Rule::Operator { op, .. } => {
                let id = Arc::clone(op.id());
                match op.kind() {
                    OperatorKind::Term => {
                        ops.insert((Arity::Term, id));
                    }
                    OperatorKind::Prefix | OperatorKind::Postfix => {
                        ops.insert((Arity::Unary, id));
                    }
                    OperatorKind::Infix => {
                        ops.insert((Arity::Binary, id));
                    }
                    OperatorKind::InfixOrPrefix => {
                        ops.insert((Arity::Unary, Arc::clone(&id)));
                        ops.insert((Arity::Binary, id));
                    }
                }
            }
            Rule::Enclosure(enclosure) => {
                if let Some(leading) = enclosure.leading() {
                    ops.insert((Arity::Binary, Arc::clone(leading.id())));
                }
                walk(grammar, enclosure.scope(), depth + 1, visited, ops);
            }
        }
    }
}

struct Checker<'a, C> {
    catalog: &'a Catalog<C>,
    reachable: &'a BTreeSet<(Arity, Arc<str>)>,
    actions: Vec<&'a ActionSignature>,
    consumers: Vec<TypeKey>,
}

impl<'a, C> Checker<'a, C> {
    fn new(catalog: &'a Catalog<C>, reachable: &'a BTreeSet<(Arity, Arc<str>)>) -> Self {
        let actions: Vec<_> = catalog.actions().collect();
        let mut consumers: Vec<TypeKey> = actions
            .iter()
            .flat_map(|signature| signature.args().iter().copied())
            .chain(catalog.converters().map(|c| c.input()))
            .collect();
        consumers.extend_from_slice(catalog.results());
        Self {
            catalog,
            reachable,
            actions,
            consumers,
        }
    }

    fn is_reachable(&self, signature: &ActionSignature) -> bool {
        self.reachable
            .contains(&(signature.arity(), Arc::clone(signature.op())))
    }

    fn is_consumed(&self, ty: TypeKey) -> bool {
        let universe = self.catalog.universe();
        self.catalog.results().is_empty()
            || self
                .consumers
                .iter()
                .any(|&consumer| universe.is_assignable(ty, consumer))
    }

    /// A node can yield `ty` without conversion.
    fn producible(&self, ty: TypeKey, guard: &mut Vec<usize>) -> bool {
        if ty == TypeKey::raw_text() {
            return true;
        }
        let universe = self.catalog.universe();
        for (index, signature) in self.actions.iter().enumerate() {
            if !self.is_reachable(signature) || !universe.is_assignable(signature.returns(), ty) {
                continue;
            }
            if signature.arity() == Arity::Term {
                return true;
            }
            if guard.contains(&index) {
                continue;
            }
            guard.push(index);
            let ok = self.arguments_producible(signature, guard);
            guard.pop();
            if ok {
                return true;
            }
        }
        false
    }

    fn arguments_producible(&self, signature: &ActionSignature, guard: &mut Vec<usize>) -> bool {
        signature
            .args()
            .iter()
            .zip(signature.allow())
            .all(|(&arg, allow)| self.argument(arg, allow, guard))
    }

    /// An argument slot of type `ty` can be filled: directly, through one converter, or by
    /// promoting a single element into a declared sequence.
    fn argument(&self, ty: TypeKey, allow: &Allow, guard: &mut Vec<usize>) -> bool {
        let universe = self.catalog.universe();
        let direct_or_converted = |ty: TypeKey, guard: &mut Vec<usize>| {
            self.producible(ty, guard)
                || self.catalog.converters().any(|converter| {
                    allow.permits(converter.name())
                        && universe.is_assignable(converter.output(), ty)
                        && self.producible(converter.input(), guard)
                })
        };
        direct_or_converted(ty, guard)
            || universe
                .element_of(ty)
                .is_some_and(|element| direct_or_converted(element, guard))
    }
}
