#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

//! Storage for problem and learned constraints.
//!
//! Constraints live in a slot arena and are addressed by [`ClauseRef`].
//! References stay valid for the constraint's whole lifetime, so reason
//! pointers and watcher entries never need remapping when other constraints
//! are deleted. Problem constraints and learned constraints are tracked in
//! separate lists: the learned list is the one the reduction policy prunes.

use crate::sat::clause::Clause;
use std::ops::{Index, IndexMut};

/// A stable handle to a constraint in the [`ClauseDb`].
pub type ClauseRef = usize;

#[derive(Debug, Clone, Default)]
pub struct ClauseDb {
    slots: Vec<Option<Clause>>,
    free: Vec<usize>,
    problem: Vec<ClauseRef>,
    learned: Vec<ClauseRef>,
}

impl ClauseDb {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, clause: Clause) -> ClauseRef {
        if let Some(slot) = self.free.pop() {
            self.slots[slot] = Some(clause);
            slot
        } else {
            self.slots.push(Some(clause));
            self.slots.len() - 1
        }
    }

    /// Stores a problem constraint and returns its handle.
    pub fn add_problem(&mut self, clause: Clause) -> ClauseRef {
        let cref = self.alloc(clause);
        self.problem.push(cref);
        cref
    }

    /// Stores a learned clause and returns its handle.
    pub fn add_learned(&mut self, mut clause: Clause) -> ClauseRef {
        clause.set_learned();
        let cref = self.alloc(clause);
        self.learned.push(cref);
        cref
    }

    #[must_use]
    pub fn problem(&self) -> &[ClauseRef] {
        &self.problem
    }

    #[must_use]
    pub fn learned(&self) -> &[ClauseRef] {
        &self.learned
    }

    #[must_use]
    pub fn nb_problem(&self) -> usize {
        self.problem.len()
    }

    #[must_use]
    pub fn nb_learned(&self) -> usize {
        self.learned.len()
    }

    /// Drops the learned clauses rejected by `keep` and frees their slots.
    /// Watcher entries must have been detached beforehand.
    pub fn retain_learned(&mut self, mut keep: impl FnMut(ClauseRef) -> bool) {
        let mut kept = Vec::with_capacity(self.learned.len());
        for &cref in &self.learned {
            if keep(cref) {
                kept.push(cref);
            } else {
                self.slots[cref] = None;
                self.free.push(cref);
            }
        }
        self.learned = kept;
    }

    /// Same as [`Self::retain_learned`], for the problem list.
    pub fn retain_problem(&mut self, mut keep: impl FnMut(ClauseRef) -> bool) {
        let mut kept = Vec::with_capacity(self.problem.len());
        for &cref in &self.problem {
            if keep(cref) {
                kept.push(cref);
            } else {
                self.slots[cref] = None;
                self.free.push(cref);
            }
        }
        self.problem = kept;
    }
}

impl Index<ClauseRef> for ClauseDb {
    type Output = Clause;

    /// # Panics
    ///
    /// Panics when `cref` addresses a freed slot; a live reason or watcher
    /// pointing at a deleted constraint is a bug in the engine.
    fn index(&self, cref: ClauseRef) -> &Clause {
        self.slots[cref].as_ref().expect("dangling clause reference")
    }
}

impl IndexMut<ClauseRef> for ClauseDb {
    fn index_mut(&mut self, cref: ClauseRef) -> &mut Clause {
        self.slots[cref].as_mut().expect("dangling clause reference")
    }
}
