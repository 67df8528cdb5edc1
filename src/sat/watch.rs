#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

//! Watcher lists: for each literal, the constraints that must be inspected
//! when it becomes false.
//!
//! Every entry carries a blocker literal; when the blocker is already true
//! the constraint is satisfied and the entry can be skipped without touching
//! the constraint itself. Blockers are only meaningful for plain clauses,
//! where the other watched literal is stored; cardinality and pseudo-Boolean
//! entries store the watched literal itself, which is false whenever the
//! list is scanned, so the shortcut never fires for them.

use crate::sat::clause::Clause;
use crate::sat::clause_db::{ClauseDb, ClauseRef};
use crate::sat::literal::Lit;
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watcher {
    pub cref: ClauseRef,
    pub blocker: Lit,
}

#[derive(Debug, Clone, Default)]
pub struct Watches {
    lists: Vec<SmallVec<[Watcher; 4]>>,
}

impl Watches {
    #[must_use]
    pub fn new(nb_vars: usize) -> Self {
        Self {
            lists: vec![SmallVec::new(); nb_vars * 2],
        }
    }

    /// Recomputes the watched prefix of `cref` and registers one watcher
    /// entry per watched literal.
    pub fn attach(&mut self, db: &mut ClauseDb, cref: ClauseRef) {
        db[cref].reset_watch_prefix();
        let clause = &db[cref];
        let plain = !clause.is_pseudo_boolean() && clause.cardinality() == 1;
        for i in 0..clause.watch_len() {
            let lit = clause.get(i);
            let blocker = if plain && clause.watch_len() == 2 {
                clause.get(1 - i)
            } else {
                lit
            };
            self.push(lit, Watcher { cref, blocker });
        }
    }

    /// Removes every watcher entry of `clause` (addressed as `cref`).
    pub fn detach(&mut self, clause: &Clause, cref: ClauseRef) {
        for i in 0..clause.watch_len() {
            self.remove(clause.get(i), cref);
        }
    }

    /// Adds a watcher on `lit`.
    pub fn push(&mut self, lit: Lit, watcher: Watcher) {
        self.lists[lit.index()].push(watcher);
    }

    /// Removes the watcher of `cref` from `lit`'s list, if present.
    pub fn remove(&mut self, lit: Lit, cref: ClauseRef) {
        let list = &mut self.lists[lit.index()];
        if let Some(pos) = list.iter().position(|w| w.cref == cref) {
            list.swap_remove(pos);
        }
    }

    #[must_use]
    pub fn len_of(&self, lit_index: usize) -> usize {
        self.lists[lit_index].len()
    }

    #[must_use]
    pub fn entry(&self, lit_index: usize, i: usize) -> Watcher {
        self.lists[lit_index][i]
    }

    pub fn set_blocker(&mut self, lit_index: usize, i: usize, blocker: Lit) {
        self.lists[lit_index][i].blocker = blocker;
    }

    /// Drops the entry at `i`; the last entry takes its place, so the caller
    /// must revisit index `i`.
    pub fn swap_remove(&mut self, lit_index: usize, i: usize) {
        self.lists[lit_index].swap_remove(i);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sat::literal::Lit;

    fn lits(vals: &[i32]) -> Vec<Lit> {
        vals.iter().map(|&v| Lit::from_i32(v)).collect()
    }

    #[test]
    fn test_attach_plain_watches_first_two() {
        let mut db = ClauseDb::new();
        let cref = db.add_problem(Clause::new(&lits(&[1, 2, 3])));
        let mut watches = Watches::new(3);
        watches.attach(&mut db, cref);

        assert_eq!(watches.len_of(Lit::from_i32(1).index()), 1);
        assert_eq!(watches.len_of(Lit::from_i32(2).index()), 1);
        assert_eq!(watches.len_of(Lit::from_i32(3).index()), 0);
        // Blockers point at the sibling watch.
        assert_eq!(
            watches.entry(Lit::from_i32(1).index(), 0).blocker,
            Lit::from_i32(2)
        );
    }

    #[test]
    fn test_attach_cardinality_watches_k_plus_one() {
        let mut db = ClauseDb::new();
        let cref = db.add_problem(Clause::new_cardinality(&lits(&[1, 2, 3, 4]), 2));
        let mut watches = Watches::new(4);
        watches.attach(&mut db, cref);

        for v in [1, 2, 3] {
            assert_eq!(watches.len_of(Lit::from_i32(v).index()), 1);
        }
        assert_eq!(watches.len_of(Lit::from_i32(4).index()), 0);
    }

    #[test]
    fn test_detach_clears_entries() {
        let mut db = ClauseDb::new();
        let cref = db.add_problem(Clause::new(&lits(&[1, 2])));
        let mut watches = Watches::new(2);
        watches.attach(&mut db, cref);
        let clause = db[cref].clone();
        watches.detach(&clause, cref);
        assert_eq!(watches.len_of(Lit::from_i32(1).index()), 0);
        assert_eq!(watches.len_of(Lit::from_i32(2).index()), 0);
    }
}
