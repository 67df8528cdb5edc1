#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

//! The assignment stack and the reason bookkeeping.
//!
//! Literals are pushed in the order they are bound, across all decision
//! levels, so truncating the stack undoes the most recent bindings first.
//! For every variable bound by propagation, `reasons` records the constraint
//! that forced it; decision variables have no reason. Reasons are non-owning
//! references into the clause database, paired with the lock count carried
//! by the clauses themselves.

use crate::sat::clause_db::ClauseRef;
use crate::sat::literal::{Lit, Variable};

#[derive(Debug, Clone, Default)]
pub struct Trail {
    stack: Vec<Lit>,
    reasons: Vec<Option<ClauseRef>>,
}

impl Trail {
    #[must_use]
    pub fn new(nb_vars: usize) -> Self {
        Self {
            stack: Vec::with_capacity(nb_vars),
            reasons: vec![None; nb_vars],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    #[must_use]
    pub fn get(&self, i: usize) -> Lit {
        self.stack[i]
    }

    #[must_use]
    pub fn last(&self) -> Option<Lit> {
        self.stack.last().copied()
    }

    pub fn push(&mut self, lit: Lit) {
        self.stack.push(lit);
    }

    pub fn truncate(&mut self, len: usize) {
        self.stack.truncate(len);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Lit> {
        self.stack.iter()
    }

    #[must_use]
    pub fn reason(&self, var: Variable) -> Option<ClauseRef> {
        self.reasons[var as usize]
    }

    pub fn set_reason(&mut self, var: Variable, cref: ClauseRef) {
        self.reasons[var as usize] = Some(cref);
    }

    /// Clears and returns the reason of `var`, so the caller can unlock the
    /// referenced clause.
    pub fn take_reason(&mut self, var: Variable) -> Option<ClauseRef> {
        self.reasons[var as usize].take()
    }
}
