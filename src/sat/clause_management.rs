#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

//! Learned-clause database reduction.
//!
//! The learned database is allowed to grow to a ceiling that itself grows
//! over time: reduction number `i` fires once the conflict count crosses
//! `i * nb_max`, `nb_max` starting at 2000 and gaining 300 per reduction —
//! plus an extra 1000 whenever most surviving clauses have a small LBD,
//! which signals a database worth keeping around.
//!
//! A reduction sorts the learned clauses best-first (LBD ascending, then
//! activity descending) and deletes the worst half, except clauses that are
//! locked as a reason, binary clauses, and clauses with LBD <= 2, which are
//! kept permanently.

use crate::sat::clause_db::{ClauseDb, ClauseRef};
use crate::sat::propagation::Propagator;
use rustc_hash::FxHashSet;
use std::cmp::Ordering;

/// Initial learned-clause ceiling.
const INIT_NB_MAX: usize = 2000;
/// Ceiling increment applied at every reduction.
const INCR_NB_MAX: usize = 300;
/// Extra increment when the database looks healthy.
const INCR_POSTPONE_NB_MAX: usize = 1000;
/// Clause activity decay per conflict.
const CLAUSE_DECAY: f64 = 0.999;
/// Clause activities are rescaled once one passes this bound.
const CLAUSE_RESCALE_LIMIT: f64 = 1e30;
const CLAUSE_RESCALE_FACTOR: f64 = 1e-30;

#[derive(Debug, Clone)]
pub struct ClauseManager {
    nb_max: usize,
    idx_reduce: usize,
    clause_inc: f64,
}

impl Default for ClauseManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ClauseManager {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            nb_max: INIT_NB_MAX,
            idx_reduce: 1,
            clause_inc: 1.0,
        }
    }

    /// Number of reductions triggered so far.
    #[must_use]
    pub const fn reduce_epoch(&self) -> usize {
        self.idx_reduce - 1
    }

    /// `true` once the conflict count crosses the current ceiling.
    #[must_use]
    pub const fn should_reduce(&self, nb_conflicts: usize) -> bool {
        nb_conflicts >= self.idx_reduce * self.nb_max
    }

    /// Bumps a clause's activity, rescaling the whole learned database when
    /// the score overflows its working range.
    pub fn bump_clause(&mut self, db: &mut ClauseDb, cref: ClauseRef) {
        if !db[cref].is_learned() {
            return;
        }
        db[cref].bump_activity(self.clause_inc);
        if db[cref].activity() > CLAUSE_RESCALE_LIMIT {
            for i in 0..db.learned().len() {
                let lref = db.learned()[i];
                db[lref].scale_activity(CLAUSE_RESCALE_FACTOR);
            }
            self.clause_inc *= CLAUSE_RESCALE_FACTOR;
        }
    }

    /// Geometrically decays every clause activity by growing the increment.
    pub fn decay(&mut self) {
        self.clause_inc *= 1.0 / CLAUSE_DECAY;
    }

    /// Deletes the worst half of the learned database. Returns how many
    /// clauses were dropped.
    pub fn reduce(
        &mut self,
        db: &mut ClauseDb,
        propagator: &mut Propagator,
        nb_conflicts: usize,
    ) -> usize {
        self.idx_reduce = nb_conflicts / self.nb_max + 1;

        let mut order: Vec<ClauseRef> = db.learned().to_vec();
        order.sort_by(|&a, &b| {
            let (ca, cb) = (&db[a], &db[b]);
            match ca.lbd().cmp(&cb.lbd()) {
                Ordering::Equal => cb
                    .activity()
                    .partial_cmp(&ca.activity())
                    .unwrap_or(Ordering::Equal),
                other => other,
            }
        });

        let mut to_delete: FxHashSet<ClauseRef> = FxHashSet::default();
        for &cref in &order[order.len() / 2..] {
            let clause = &db[cref];
            if clause.lbd() <= 2 || clause.len() == 2 || clause.is_locked() {
                continue;
            }
            to_delete.insert(cref);
        }

        for &cref in &to_delete {
            propagator.detach(db, cref);
        }
        db.retain_learned(|cref| !to_delete.contains(&cref));

        self.bump_nb_max(db);
        to_delete.len()
    }

    fn bump_nb_max(&mut self, db: &ClauseDb) {
        self.nb_max += INCR_NB_MAX;
        let small = db
            .learned()
            .iter()
            .filter(|&&cref| db[cref].lbd() <= 3)
            .count();
        if small * 2 > db.nb_learned() {
            self.nb_max += INCR_POSTPONE_NB_MAX;
        }
    }
}
