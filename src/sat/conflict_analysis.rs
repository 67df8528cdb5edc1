#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

//! First-UIP conflict analysis.
//!
//! Starting from a conflicting constraint, the analysis walks the trail
//! backwards, resolving the working clause against the reason of each
//! current-level literal it meets, until a single current-level literal
//! remains — the first unique implication point. The negation of that
//! literal becomes the asserting literal of the learned clause.
//!
//! Cardinality and pseudo-Boolean reasons are handled by clausal
//! projection: the literals of the reason that are currently falsified are
//! exactly the bindings that made it force (or falsify), so they join the
//! working clause the same way a plain clause's literals would. This is the
//! conservative generalization of resolution; cutting-planes style
//! multiply-and-add derivations would learn stronger constraints but plain
//! clauses keep the learned database uniform.
//!
//! Before the clause is handed back it is minimized by self-subsumption:
//! literals whose whole reason is already implied by the rest of the clause
//! are dropped.

use crate::sat::assignment::{DecisionLevel, Model};
use crate::sat::clause::Clause;
use crate::sat::clause_db::{ClauseDb, ClauseRef};
use crate::sat::literal::{Lit, Variable};
use crate::sat::trail::Trail;
use bit_vec::BitVec;

/// What conflict analysis produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Learnt {
    /// A unit literal: true in every model of the problem.
    Unit(Lit),
    /// An asserting clause. Slot 0 holds the asserting literal, slot 1 a
    /// literal of the backtrack level.
    Clause {
        clause: Clause,
        bt_level: DecisionLevel,
    },
}

/// A learned clause plus the bookkeeping the search driver needs to apply
/// activity heuristics.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub learnt: Learnt,
    /// Variables met in any reason; their activity gets bumped.
    pub vars_to_bump: Vec<Variable>,
    /// Learned clauses used as reasons; their activity gets bumped.
    pub learned_reasons: Vec<ClauseRef>,
}

#[derive(Debug, Clone, Default)]
pub struct Analyser {
    seen: BitVec,
    /// Number of conflicts analysed, for statistics.
    pub count: usize,
}

impl Analyser {
    #[must_use]
    pub fn new(nb_vars: usize) -> Self {
        Self {
            seen: BitVec::from_elem(nb_vars, false),
            count: 0,
        }
    }

    fn is_seen(&self, var: Variable) -> bool {
        self.seen.get(var as usize).unwrap_or(false)
    }

    fn set_seen(&mut self, var: Variable) {
        self.seen.set(var as usize, true);
    }

    /// Analyses the conflict `conflict` found at decision level `lvl`.
    ///
    /// # Panics
    ///
    /// Panics if the implication graph is inconsistent (a resolved literal
    /// without a reason, or a conflict with no current-level literal at a
    /// level where one must exist); both indicate a propagation bug.
    pub fn analyse(
        &mut self,
        db: &ClauseDb,
        model: &Model,
        trail: &Trail,
        conflict: ClauseRef,
        lvl: DecisionLevel,
    ) -> Analysis {
        self.count += 1;
        self.seen.clear();

        let mut lower_lits: Vec<Lit> = Vec::new();
        let mut vars_to_bump: Vec<Variable> = Vec::new();
        let mut learned_reasons: Vec<ClauseRef> = Vec::new();
        let mut counter = 0_usize;
        let mut cref = conflict;
        let mut pivot: Option<Lit> = None;
        let mut idx = trail.len();

        let asserting = loop {
            let clause = &db[cref];
            if clause.is_learned() {
                learned_reasons.push(cref);
            }
            for &q in clause.iter() {
                if pivot == Some(q) {
                    continue;
                }
                // Only falsified literals explain a forced binding or a
                // conflict; for cardinality/PB reasons the rest of the
                // constraint may be true or unbound.
                if !model.lit_false(q) {
                    continue;
                }
                let v = q.variable();
                if model.level(v) <= 1 || self.is_seen(v) {
                    continue;
                }
                self.set_seen(v);
                vars_to_bump.push(v);
                if model.level(v) >= lvl {
                    counter += 1;
                } else {
                    lower_lits.push(q);
                }
            }

            // Walk back to the most recent literal still involved.
            let next = loop {
                assert!(idx > 0, "conflict without a current-level literal");
                idx -= 1;
                let lit = trail.get(idx);
                if self.is_seen(lit.variable()) && model.level(lit.variable()) >= lvl {
                    break lit;
                }
            };
            counter -= 1;
            if counter == 0 {
                break next.negated();
            }
            pivot = Some(next);
            cref = trail
                .reason(next.variable())
                .expect("non-UIP literal at conflict level has no reason");
        };

        self.minimize(db, model, trail, &mut lower_lits);

        let learnt = if lower_lits.is_empty() {
            Learnt::Unit(asserting)
        } else {
            let mut lits = Vec::with_capacity(lower_lits.len() + 1);
            lits.push(asserting);
            lits.extend(lower_lits);
            let mut clause = Clause::new(&lits);
            // Slot 1 must hold a literal of the highest remaining level: it
            // decides where to backtrack, and makes a correct watch.
            let mut best = 1;
            for k in 2..clause.len() {
                if model.level(clause.get(k).variable()) > model.level(clause.get(best).variable())
                {
                    best = k;
                }
            }
            clause.swap(1, best);
            let bt_level = model.level(clause.get(1).variable());
            clause.calculate_lbd(model);
            Learnt::Clause { clause, bt_level }
        };

        Analysis {
            learnt,
            vars_to_bump,
            learned_reasons,
        }
    }

    /// Self-subsumption: a literal is redundant when its reason is entirely
    /// implied by the other literals of the learned clause (or by top-level
    /// facts).
    fn minimize(&self, db: &ClauseDb, model: &Model, trail: &Trail, lits: &mut Vec<Lit>) {
        lits.retain(|&lit| {
            let Some(reason) = trail.reason(lit.variable()) else {
                return true;
            };
            let implied = db[reason].iter().all(|&q| {
                q.variable() == lit.variable()
                    || !model.lit_false(q)
                    || model.level(q.variable()) <= 1
                    || self.is_seen(q.variable())
            });
            !implied
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sat::propagation::Propagator;

    fn lits(vals: &[i32]) -> Vec<Lit> {
        vals.iter().map(|&v| Lit::from_i32(v)).collect()
    }

    struct Fixture {
        db: ClauseDb,
        model: Model,
        trail: Trail,
        propagator: Propagator,
    }

    fn fixture(nb_vars: usize, clauses: &[&[i32]]) -> Fixture {
        let mut f = Fixture {
            db: ClauseDb::new(),
            model: Model::new(nb_vars),
            trail: Trail::new(nb_vars),
            propagator: Propagator::new(nb_vars),
        };
        for c in clauses {
            let cref = f.db.add_problem(Clause::new(&lits(c)));
            f.propagator.attach(&mut f.db, cref);
        }
        f
    }

    #[test]
    fn test_learns_unit_from_single_decision() {
        // Deciding x1 forces x2 and x3, which conflict; the UIP is x1 and
        // the learned clause is the unit !x1.
        let mut f = fixture(3, &[&[-1, 2], &[-1, 3], &[-2, -3]]);
        let conflict = f
            .propagator
            .unify_literal(&mut f.db, &mut f.model, &mut f.trail, Lit::from_i32(1), 2)
            .expect("conflict expected");

        let mut analyser = Analyser::new(3);
        let analysis = analyser.analyse(&f.db, &f.model, &f.trail, conflict, 2);

        assert_eq!(analysis.learnt, Learnt::Unit(Lit::from_i32(-1)));
        assert_eq!(analyser.count, 1);
        assert!(analysis.vars_to_bump.len() >= 2);
    }

    #[test]
    fn test_learns_asserting_clause_with_backtrack_level() {
        // Level 2: decide x1. Level 3: decide x2, forcing a conflict that
        // depends on both decisions.
        let mut f = fixture(4, &[&[-1, -2, 3], &[-1, -2, -3]]);
        assert!(f
            .propagator
            .unify_literal(&mut f.db, &mut f.model, &mut f.trail, Lit::from_i32(1), 2)
            .is_none());
        let conflict = f
            .propagator
            .unify_literal(&mut f.db, &mut f.model, &mut f.trail, Lit::from_i32(2), 3)
            .expect("conflict expected");

        let mut analyser = Analyser::new(4);
        let analysis = analyser.analyse(&f.db, &f.model, &f.trail, conflict, 3);

        match analysis.learnt {
            Learnt::Clause { clause, bt_level } => {
                assert_eq!(clause.len(), 2);
                assert_eq!(clause.get(0), Lit::from_i32(-2));
                assert_eq!(clause.get(1), Lit::from_i32(-1));
                assert_eq!(bt_level, 2);
                assert_eq!(clause.lbd(), 2);
            }
            other => panic!("expected learned clause, got {other:?}"),
        }
    }

    #[test]
    fn test_minimization_drops_implied_literal() {
        // x1 forces x2 (level 2); deciding x3 (level 3) conflicts through
        // two clauses mentioning both x1 and x2. The raw learned clause
        // would carry !x1 and !x2, but !x2's reason (!x1 v x2) is implied
        // by !x1, so the minimized clause is binary.
        let mut f = fixture(4, &[&[-1, 2], &[-3, -2, 4], &[-3, -1, -4, -2]]);
        assert!(f
            .propagator
            .unify_literal(&mut f.db, &mut f.model, &mut f.trail, Lit::from_i32(1), 2)
            .is_none());
        let conflict = f
            .propagator
            .unify_literal(&mut f.db, &mut f.model, &mut f.trail, Lit::from_i32(3), 3)
            .expect("conflict expected");

        let mut analyser = Analyser::new(4);
        let analysis = analyser.analyse(&f.db, &f.model, &f.trail, conflict, 3);

        match analysis.learnt {
            Learnt::Clause { clause, .. } => {
                assert!(
                    clause.iter().all(|&l| l.variable() != 1),
                    "implied literal on x2 should be minimized away: {clause:?}"
                );
            }
            other => panic!("expected learned clause, got {other:?}"),
        }
    }
}
