#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

//! Unit propagation over watched literals, generalized to cardinality and
//! pseudo-Boolean constraints.
//!
//! Binding a literal walks the trail like a queue: every literal made false
//! has the watcher list of its negation scanned, and each watching
//! constraint either finds a replacement watch, forces further literals, or
//! reports a conflict.
//!
//! - A plain clause watches two literals; when one becomes false it looks
//!   for a non-false literal beyond slot 1 to take over the watch, and
//!   propagates (or conflicts on) the remaining watched literal otherwise.
//! - A cardinality constraint of threshold `k` watches `k + 1` literals; a
//!   false watched literal is replaced from the unwatched suffix, and when
//!   no replacement exists the `k` remaining non-false watched literals are
//!   all forced.
//! - A pseudo-Boolean constraint watches a prefix whose weights cover
//!   `max_weight + k - 1`; when a watched literal falls the prefix is
//!   extended with non-false literals, then the constraint forces every
//!   literal whose weight is irreplaceable and conflicts when even the full
//!   non-false weight cannot reach `k`.
//!
//! Forced literals are appended to the trail in the order they are
//! detected, with the forcing constraint as their reason; the reason is
//! locked until the binding is undone.

use crate::sat::assignment::{DecisionLevel, Model};
use crate::sat::clause::Clause;
use crate::sat::clause_db::{ClauseDb, ClauseRef};
use crate::sat::literal::Lit;
use crate::sat::trail::Trail;
use crate::sat::watch::{Watcher, Watches};

/// What a constraint decided when one of its watched literals became false.
enum WatchAction {
    /// The entry stays on this literal's list.
    Keep,
    /// The entry stays, with a fresher blocker.
    KeepBlocker(Lit),
    /// The watch moved to another literal; the entry leaves this list.
    Moved,
    /// The constraint cannot be satisfied any more.
    Conflict,
}

#[derive(Debug, Clone, Default)]
pub struct Propagator {
    watches: Watches,
    num_propagations: usize,
}

impl Propagator {
    #[must_use]
    pub fn new(nb_vars: usize) -> Self {
        Self {
            watches: Watches::new(nb_vars),
            num_propagations: 0,
        }
    }

    /// Total number of literals bound through this propagator.
    #[must_use]
    pub const fn num_propagations(&self) -> usize {
        self.num_propagations
    }

    /// Starts watching `cref`.
    pub fn attach(&mut self, db: &mut ClauseDb, cref: ClauseRef) {
        self.watches.attach(db, cref);
    }

    /// Stops watching `cref`.
    pub fn detach(&mut self, db: &ClauseDb, cref: ClauseRef) {
        self.watches.detach(&db[cref], cref);
    }

    /// Binds `lit` at `lvl` and propagates every consequence.
    ///
    /// Returns the conflicting constraint if propagation runs into one,
    /// `None` on quiescence. Conflict handling (analysis, backtracking) is
    /// the caller's business; the trail is left as it stood when the
    /// conflict was found.
    pub fn unify_literal(
        &mut self,
        db: &mut ClauseDb,
        model: &mut Model,
        trail: &mut Trail,
        lit: Lit,
        lvl: DecisionLevel,
    ) -> Option<ClauseRef> {
        debug_assert!(!model.is_bound(lit.variable()), "literal already bound");
        let mut cursor = trail.len();
        model.bind(lit, lvl);
        trail.push(lit);

        while cursor < trail.len() {
            let propagated = trail.get(cursor);
            cursor += 1;
            self.num_propagations += 1;

            let false_lit = propagated.negated();
            let fidx = false_lit.index();
            let mut i = 0;
            while i < self.watches.len_of(fidx) {
                let Watcher { cref, blocker } = self.watches.entry(fidx, i);
                if model.lit_true(blocker) {
                    i += 1;
                    continue;
                }
                let plain = {
                    let c = &db[cref];
                    !c.is_pseudo_boolean() && c.cardinality() == 1
                };
                let action = if plain {
                    self.visit_clause(db, model, trail, cref, false_lit, lvl)
                } else if db[cref].is_pseudo_boolean() {
                    self.visit_pseudo_boolean(db, model, trail, cref, lvl)
                } else {
                    self.visit_cardinality(db, model, trail, cref, false_lit, lvl)
                };
                match action {
                    WatchAction::Keep => i += 1,
                    WatchAction::KeepBlocker(b) => {
                        self.watches.set_blocker(fidx, i, b);
                        i += 1;
                    }
                    WatchAction::Moved => {
                        self.watches.swap_remove(fidx, i);
                    }
                    WatchAction::Conflict => return Some(cref),
                }
            }
        }
        None
    }

    /// Binds a forced literal and records the forcing constraint as its
    /// locked reason.
    fn enqueue(
        clause: &mut Clause,
        cref: ClauseRef,
        lit: Lit,
        lvl: DecisionLevel,
        model: &mut Model,
        trail: &mut Trail,
    ) {
        model.bind(lit, lvl);
        trail.push(lit);
        trail.set_reason(lit.variable(), cref);
        clause.lock();
    }

    fn visit_clause(
        &mut self,
        db: &mut ClauseDb,
        model: &mut Model,
        trail: &mut Trail,
        cref: ClauseRef,
        false_lit: Lit,
        lvl: DecisionLevel,
    ) -> WatchAction {
        let clause = &mut db[cref];
        // Normalize so the falsified watch sits in slot 1.
        if clause.get(0) == false_lit {
            clause.swap(0, 1);
        }
        debug_assert_eq!(clause.get(1), false_lit);

        let first = clause.get(0);
        if model.lit_true(first) {
            return WatchAction::KeepBlocker(first);
        }

        for k in 2..clause.len() {
            if !model.lit_false(clause.get(k)) {
                clause.swap(1, k);
                let new_watch = clause.get(1);
                self.watches.push(
                    new_watch,
                    Watcher {
                        cref,
                        blocker: first,
                    },
                );
                return WatchAction::Moved;
            }
        }

        if model.lit_false(first) {
            return WatchAction::Conflict;
        }
        Self::enqueue(clause, cref, first, lvl, model, trail);
        WatchAction::Keep
    }

    fn visit_cardinality(
        &mut self,
        db: &mut ClauseDb,
        model: &mut Model,
        trail: &mut Trail,
        cref: ClauseRef,
        false_lit: Lit,
        lvl: DecisionLevel,
    ) -> WatchAction {
        let clause = &mut db[cref];
        let wlen = clause.watch_len();
        let slot = (0..wlen)
            .position(|k| clause.get(k) == false_lit)
            .expect("watched literal missing from its prefix");

        for k in wlen..clause.len() {
            if !model.lit_false(clause.get(k)) {
                clause.swap(slot, k);
                let new_watch = clause.get(slot);
                self.watches.push(
                    new_watch,
                    Watcher {
                        cref,
                        blocker: new_watch,
                    },
                );
                return WatchAction::Moved;
            }
        }

        #[allow(clippy::cast_sign_loss)]
        let card = clause.cardinality() as usize;
        let non_false = (0..wlen).filter(|&k| !model.lit_false(clause.get(k))).count();
        if non_false < card {
            return WatchAction::Conflict;
        }
        // Exactly `card` candidates left: every unbound one is forced.
        for k in 0..wlen {
            let l = clause.get(k);
            if model.lit_value(l).is_none() {
                Self::enqueue(clause, cref, l, lvl, model, trail);
            }
        }
        WatchAction::Keep
    }

    fn visit_pseudo_boolean(
        &mut self,
        db: &mut ClauseDb,
        model: &mut Model,
        trail: &mut Trail,
        cref: ClauseRef,
        lvl: DecisionLevel,
    ) -> WatchAction {
        let clause = &mut db[cref];
        let card = i64::from(clause.cardinality());
        let needed = card + i64::from(clause.max_weight()) - 1;

        let mut watched_non_false: i64 = (0..clause.watch_len())
            .filter(|&k| !model.lit_false(clause.get(k)))
            .map(|k| i64::from(clause.weight(k)))
            .sum();

        // Restore the coverage invariant by pulling non-false literals into
        // the watched prefix. Everything skipped over is false, so the scan
        // index always advances.
        let mut k = clause.watch_len();
        while watched_non_false < needed && k < clause.len() {
            if !model.lit_false(clause.get(k)) {
                let wl = clause.watch_len();
                clause.swap(wl, k);
                let new_watch = clause.get(wl);
                watched_non_false += i64::from(clause.weight(wl));
                clause.grow_watch();
                self.watches.push(
                    new_watch,
                    Watcher {
                        cref,
                        blocker: new_watch,
                    },
                );
            }
            k += 1;
        }

        let possible: i64 = (0..clause.len())
            .filter(|&k| !model.lit_false(clause.get(k)))
            .map(|k| i64::from(clause.weight(k)))
            .sum();
        if possible < card {
            return WatchAction::Conflict;
        }
        for k in 0..clause.len() {
            let l = clause.get(k);
            if model.lit_value(l).is_none() && possible - i64::from(clause.weight(k)) < card {
                Self::enqueue(clause, cref, l, lvl, model, trail);
            }
        }
        WatchAction::Keep
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lits(vals: &[i32]) -> Vec<Lit> {
        vals.iter().map(|&v| Lit::from_i32(v)).collect()
    }

    struct Fixture {
        db: ClauseDb,
        model: Model,
        trail: Trail,
        propagator: Propagator,
    }

    fn fixture(nb_vars: usize) -> Fixture {
        Fixture {
            db: ClauseDb::new(),
            model: Model::new(nb_vars),
            trail: Trail::new(nb_vars),
            propagator: Propagator::new(nb_vars),
        }
    }

    impl Fixture {
        fn add(&mut self, clause: Clause) -> ClauseRef {
            let cref = self.db.add_problem(clause);
            self.propagator.attach(&mut self.db, cref);
            cref
        }

        fn unify(&mut self, lit: i32, lvl: DecisionLevel) -> Option<ClauseRef> {
            self.propagator.unify_literal(
                &mut self.db,
                &mut self.model,
                &mut self.trail,
                Lit::from_i32(lit),
                lvl,
            )
        }
    }

    #[test]
    fn test_clause_chain_propagation() {
        let mut f = fixture(4);
        f.add(Clause::new(&lits(&[-1, 2])));
        f.add(Clause::new(&lits(&[-2, 3])));

        let conflict = f.unify(1, 2);
        assert!(conflict.is_none());
        assert_eq!(f.trail.len(), 3);
        assert!(f.model.lit_true(Lit::from_i32(2)));
        assert!(f.model.lit_true(Lit::from_i32(3)));
        assert_eq!(f.model.level(2), 2);
    }

    #[test]
    fn test_clause_conflict() {
        let mut f = fixture(3);
        f.add(Clause::new(&lits(&[-1, 2])));
        let bad = f.add(Clause::new(&lits(&[-1, -2])));

        let conflict = f.unify(1, 2);
        assert_eq!(conflict, Some(bad));
    }

    #[test]
    fn test_clause_finds_replacement_watch() {
        let mut f = fixture(4);
        let cref = f.add(Clause::new(&lits(&[1, 2, 3])));

        assert!(f.unify(-1, 2).is_none());
        // No propagation: literal 2 or 3 took over the watch.
        assert_eq!(f.trail.len(), 1);
        assert!(f.unify(-2, 3).is_none());
        // Now the clause is unit: 3 is forced.
        assert!(f.model.lit_true(Lit::from_i32(3)));
        assert_eq!(f.trail.reason(2), Some(cref));
        assert!(f.db[cref].is_locked());
    }

    #[test]
    fn test_cardinality_forces_remaining() {
        // x1 + x2 + x3 >= 2: falsifying one literal forces the other two.
        let mut f = fixture(3);
        f.add(Clause::new_cardinality(&lits(&[1, 2, 3]), 2));

        assert!(f.unify(-1, 2).is_none());
        assert!(f.model.lit_true(Lit::from_i32(2)));
        assert!(f.model.lit_true(Lit::from_i32(3)));
    }

    #[test]
    fn test_cardinality_replacement_then_conflict() {
        let mut f = fixture(4);
        let cref = f.add(Clause::new_cardinality(&lits(&[1, 2, 3, 4]), 2));

        assert!(f.unify(-1, 2).is_none());
        assert_eq!(f.trail.len(), 1);
        assert!(f.unify(-2, 3).is_none());
        // 3 and 4 forced.
        assert!(f.model.lit_true(Lit::from_i32(3)));
        assert!(f.model.lit_true(Lit::from_i32(4)));
        assert_eq!(f.trail.reason(2), Some(cref));
    }

    #[test]
    fn test_cardinality_conflict() {
        // x4 falsifies both x1 and x2, leaving the cardinality constraint
        // with a single candidate for a threshold of two.
        let mut f = fixture(4);
        f.add(Clause::new(&lits(&[-4, -1])));
        f.add(Clause::new(&lits(&[-4, -2])));
        let card = f.add(Clause::new_cardinality(&lits(&[1, 2, 3]), 2));

        let conflict = f.unify(4, 2);
        assert_eq!(conflict, Some(card));
    }

    #[test]
    fn test_pb_forces_heavy_literal() {
        // 3 x1 + 2 x2 + 1 x3 >= 3: falsifying x1 forces x2 (3 - 2 < 3... the
        // remaining max is 3, and losing x2 would leave only 1).
        let mut f = fixture(3);
        f.add(Clause::new_pb(&lits(&[1, 2, 3]), &[3, 2, 1], 3));

        assert!(f.unify(-1, 2).is_none());
        assert!(f.model.lit_true(Lit::from_i32(2)));
        assert!(f.model.lit_true(Lit::from_i32(3)));
    }

    #[test]
    fn test_pb_conflict_when_weight_unreachable() {
        let mut f = fixture(3);
        let pb = f.add(Clause::new_pb(&lits(&[1, 2, 3]), &[3, 2, 1], 4));

        // Falsifying x1 leaves at most 2 + 1 = 3 < 4.
        let conflict = f.unify(-1, 2);
        assert_eq!(conflict, Some(pb));
    }

    #[test]
    fn test_pb_immediate_forcing_is_left_to_problem_reduction() {
        // 3 x1 + 1 x2 >= 3 forces x1 from the start; constraints like this
        // are reduced at problem construction, so propagation only sees it
        // once a watched literal falls.
        let mut f = fixture(2);
        f.add(Clause::new_pb(&lits(&[1, 2]), &[3, 1], 3));
        assert!(f.unify(-2, 2).is_none());
        assert!(f.model.lit_true(Lit::from_i32(1)));
    }
}
