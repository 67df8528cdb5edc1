#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

//! The CDCL search driver and the public face of the engine.
//!
//! The driver runs the classic loop: pick a decision literal, propagate,
//! and on conflict learn an asserting clause, jump back to its assertion
//! level and continue. Restarts are requested by the LBD policy, learned
//! clauses are pruned by the reduction policy, and top-level facts survive
//! everything.
//!
//! Level numbering: 0 means unbound, level 1 is reserved for top-level
//! facts (problem units and learned units), decision levels start at 2.

use crate::sat::assignment::{DecisionLevel, Model, Status};
use crate::sat::clause::Clause;
use crate::sat::clause_db::{ClauseDb, ClauseRef};
use crate::sat::clause_management::ClauseManager;
use crate::sat::conflict_analysis::{Analyser, Learnt};
use crate::sat::literal::Lit;
use crate::sat::phase_saving::SavedPhases;
use crate::sat::problem::Problem;
use crate::sat::propagation::Propagator;
use crate::sat::restarter::LbdStats;
use crate::sat::trail::Trail;
use crate::sat::variable_selection::VsidsHeap;
use log::debug;
use rustc_hash::FxHashMap;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

/// The decay factor hardens every this many conflicts.
const DECAY_HARDEN_PERIOD: usize = 5000;
/// Minimum delay between two progress lines.
const PROGRESS_PERIOD: Duration = Duration::from_secs(3);

/// A satisfying assignment keyed by DIMACS variable numbers (1-based).
pub type ModelMap = FxHashMap<i32, bool>;

/// Counters about the solving process, for information purpose only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub nb_restarts: usize,
    pub nb_conflicts: usize,
    pub nb_decisions: usize,
    pub nb_unit_learned: usize,
    pub nb_binary_learned: usize,
    pub nb_learned: usize,
    pub nb_deleted: usize,
}

/// Returns `true` when the caller asked to stop: either a message arrived
/// on the cancellation channel, or its sending side was dropped.
pub(crate) fn cancelled(stop: Option<&Receiver<()>>) -> bool {
    stop.is_some_and(|r| {
        matches!(r.try_recv(), Ok(()) | Err(TryRecvError::Disconnected))
    })
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ProgressMeter {
    last: Instant,
}

impl ProgressMeter {
    fn new() -> Self {
        Self {
            last: Instant::now(),
        }
    }

    fn tick(&mut self) -> bool {
        if self.last.elapsed() >= PROGRESS_PERIOD {
            self.last = Instant::now();
            true
        } else {
            false
        }
    }
}

/// A CDCL solver over plain clauses, cardinality constraints and
/// pseudo-Boolean constraints.
#[derive(Debug)]
pub struct Solver {
    /// Emit `c |...|` progress lines through the `log` crate while solving.
    pub verbose: bool,
    pub(crate) nb_vars: usize,
    pub(crate) status: Status,
    pub(crate) db: ClauseDb,
    pub(crate) propagator: Propagator,
    pub(crate) model: Model,
    pub(crate) last_model: Option<Model>,
    pub(crate) trail: Trail,
    pub(crate) order: VsidsHeap,
    pub(crate) phases: SavedPhases,
    analyser: Analyser,
    pub(crate) lbd_stats: LbdStats,
    pub(crate) manager: ClauseManager,
    /// Statistics about the solving process.
    pub stats: Stats,
    pub(crate) min_lits: Vec<Lit>,
    pub(crate) min_weights: Option<Vec<i32>>,
    progress: ProgressMeter,
}

impl Solver {
    /// Builds a solver from a problem. Known units are bound and propagated
    /// at the top level right away; a contradiction among them makes the
    /// solver start out Unsat.
    #[must_use]
    pub fn new(problem: Problem) -> Self {
        let nb_vars = problem.nb_vars;
        let mut solver = Self {
            verbose: false,
            nb_vars,
            status: problem.status,
            db: ClauseDb::new(),
            propagator: Propagator::new(nb_vars),
            model: Model::new(nb_vars),
            last_model: None,
            trail: Trail::new(nb_vars),
            order: VsidsHeap::new(nb_vars),
            phases: SavedPhases::new(nb_vars),
            analyser: Analyser::new(nb_vars),
            lbd_stats: LbdStats::new(),
            manager: ClauseManager::new(),
            stats: Stats::default(),
            min_lits: problem.min_lits,
            min_weights: problem.min_weights,
            progress: ProgressMeter::new(),
        };

        for (i, &lit) in solver.min_lits.iter().enumerate() {
            let weight = solver.min_weights.as_ref().map_or(1, |ws| ws[i]);
            solver.order.add_activity(lit.variable(), f64::from(weight));
        }
        solver.phases.reset_objective(&solver.min_lits);

        for clause in problem.clauses {
            let cref = solver.db.add_problem(clause);
            solver.propagator.attach(&mut solver.db, cref);
        }
        for &unit in &problem.units {
            if solver.status == Status::Unsat {
                break;
            }
            match solver.model.lit_status(unit) {
                Status::Sat => {}
                Status::Unsat => solver.status = Status::Unsat,
                Status::Indet => {
                    if solver
                        .propagator
                        .unify_literal(&mut solver.db, &mut solver.model, &mut solver.trail, unit, 1)
                        .is_some()
                    {
                        solver.status = Status::Unsat;
                    }
                }
            }
        }
        solver.order.rebuild(&solver.model);
        solver
    }

    /// `true` iff the problem carries an optimization objective.
    #[must_use]
    pub fn optim(&self) -> bool {
        !self.min_lits.is_empty()
    }

    /// The current solver status.
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// Total number of literals bound by propagation so far.
    #[must_use]
    pub const fn nb_propagations(&self) -> usize {
        self.propagator.num_propagations()
    }

    /// Solves the problem and returns Sat, Unsat, or — only if a previous
    /// run was cancelled — Indet.
    pub fn solve(&mut self) -> Status {
        self.solve_with_stop(None)
    }

    pub(crate) fn solve_with_stop(&mut self, stop: Option<&Receiver<()>>) -> Status {
        if self.status == Status::Unsat {
            return Status::Unsat;
        }
        self.status = Status::Indet;
        while self.status == Status::Indet {
            if cancelled(stop) {
                return Status::Indet;
            }
            self.search();
            if self.status == Status::Indet {
                self.stats.nb_restarts += 1;
                self.rebuild_order_heap();
                self.maybe_log_progress();
            }
        }
        if self.status == Status::Sat {
            self.last_model = Some(self.model.clone());
        }
        self.status
    }

    /// One search episode: from level 2 until Sat, Unsat, or a restart.
    pub(crate) fn search(&mut self) -> Status {
        let lit = self.choose_lit();
        let status = self.propagate_and_search(lit, 2);
        self.status = status;
        status
    }

    /// Binds `lit`, propagates, and keeps searching until the episode ends.
    /// `Indet` means a restart was requested.
    pub(crate) fn propagate_and_search(
        &mut self,
        mut lit: Option<Lit>,
        mut lvl: DecisionLevel,
    ) -> Status {
        while let Some(decision) = lit {
            let conflict = self.propagator.unify_literal(
                &mut self.db,
                &mut self.model,
                &mut self.trail,
                decision,
                lvl,
            );
            let Some(conflict) = conflict else {
                if self.lbd_stats.must_restart() {
                    self.lbd_stats.clear();
                    self.cleanup_bindings(1);
                    return Status::Indet;
                }
                if self.manager.should_reduce(self.stats.nb_conflicts) {
                    let deleted =
                        self.manager
                            .reduce(&mut self.db, &mut self.propagator, self.stats.nb_conflicts);
                    self.stats.nb_deleted += deleted;
                    debug!("reduced learned database: {deleted} clauses dropped");
                }
                lvl += 1;
                lit = self.choose_lit();
                continue;
            };

            self.stats.nb_conflicts += 1;
            if self.stats.nb_conflicts % DECAY_HARDEN_PERIOD == 0 {
                self.order.harden_decay();
            }
            self.lbd_stats.add_conflict(self.trail.len());
            if lvl <= 1 {
                self.status = Status::Unsat;
                return Status::Unsat;
            }

            let analysis = self.analyser.analyse(&self.db, &self.model, &self.trail, conflict, lvl);
            for &var in &analysis.vars_to_bump {
                self.order.bump(var);
            }
            self.order.decay();
            for &cref in &analysis.learned_reasons {
                self.manager.bump_clause(&mut self.db, cref);
            }
            self.manager.decay();

            match analysis.learnt {
                Learnt::Unit(unit) => {
                    self.stats.nb_unit_learned += 1;
                    self.lbd_stats.add_lbd(1);
                    debug!("learned unit {unit}");
                    if !self.assert_unit(unit) {
                        return Status::Unsat;
                    }
                    self.simplify_top_level();
                    self.rebuild_order_heap();
                    lvl = 2;
                    lit = self.choose_lit();
                }
                Learnt::Clause { clause, bt_level } => {
                    self.stats.nb_learned += 1;
                    if clause.len() == 2 {
                        self.stats.nb_binary_learned += 1;
                    }
                    self.lbd_stats.add_lbd(clause.lbd());
                    let asserting = clause.first();
                    let cref = self.db.add_learned(clause);
                    self.propagator.attach(&mut self.db, cref);
                    self.manager.bump_clause(&mut self.db, cref);
                    self.cleanup_bindings(bt_level);
                    self.trail.set_reason(asserting.variable(), cref);
                    self.db[cref].lock();
                    lvl = bt_level;
                    lit = Some(asserting);
                }
            }
        }
        Status::Sat
    }

    /// Binds a top-level fact after undoing everything else. Returns
    /// `false` (and flips to Unsat) when the fact contradicts the top
    /// level.
    pub(crate) fn assert_unit(&mut self, unit: Lit) -> bool {
        self.cleanup_bindings(1);
        match self.model.lit_status(unit) {
            Status::Sat => true,
            Status::Unsat => {
                self.status = Status::Unsat;
                false
            }
            Status::Indet => {
                let conflict = self.propagator.unify_literal(
                    &mut self.db,
                    &mut self.model,
                    &mut self.trail,
                    unit,
                    1,
                );
                if conflict.is_some() {
                    self.status = Status::Unsat;
                    return false;
                }
                true
            }
        }
    }

    /// Asserts several facts in sequence, as the enumeration and
    /// append-clause paths need.
    pub(crate) fn propagate_units(&mut self, units: &[Lit]) {
        for &unit in units {
            self.lbd_stats.add_lbd(1);
            self.stats.nb_unit_learned += 1;
            if !self.assert_unit(unit) {
                return;
            }
            self.rebuild_order_heap();
        }
    }

    /// Picks the unbound variable with the highest activity and decides it
    /// with its preferred polarity.
    pub(crate) fn choose_lit(&mut self) -> Option<Lit> {
        while let Some(var) = self.order.pop() {
            if !self.model.is_bound(var) {
                self.stats.nb_decisions += 1;
                return Some(Lit::new(var, self.phases.preferred(var)));
            }
        }
        None
    }

    /// Undoes every binding above `lvl`: unbinds the variable, unlocks and
    /// clears its reason, saves its phase, and puts it back in the order
    /// heap. Objective polarities are re-applied afterwards.
    pub(crate) fn cleanup_bindings(&mut self, lvl: DecisionLevel) {
        let mut cut = self.trail.len();
        for i in (0..self.trail.len()).rev() {
            let lit = self.trail.get(i);
            let var = lit.variable();
            if self.model.level(var) <= lvl {
                break;
            }
            self.model.unbind(var);
            if let Some(cref) = self.trail.take_reason(var) {
                self.db[cref].unlock();
            }
            self.phases.save(var, lit.is_positive());
            self.order.insert(var);
            cut = i;
        }
        self.trail.truncate(cut);
        self.phases.reset_objective(&self.min_lits);
    }

    pub(crate) fn rebuild_order_heap(&mut self) {
        self.order.rebuild(&self.model);
    }

    /// Removes problem and learned clauses satisfied by a top-level
    /// binding. Only plain, non-binary clauses are considered; cardinality
    /// and pseudo-Boolean constraints would need weight-aware rewriting and
    /// are left alone.
    pub(crate) fn simplify_top_level(&mut self) {
        let sat_at_top = |db: &ClauseDb, model: &Model, cref: ClauseRef| {
            let c = &db[cref];
            if c.len() == 2 || c.cardinality() != 1 || c.is_pseudo_boolean() || c.is_locked() {
                return false;
            }
            c.iter()
                .any(|&l| model.level(l.variable()) == 1 && model.lit_true(l))
        };

        let doomed: Vec<ClauseRef> = self
            .db
            .problem()
            .iter()
            .chain(self.db.learned())
            .copied()
            .filter(|&cref| sat_at_top(&self.db, &self.model, cref))
            .collect();
        for &cref in &doomed {
            self.propagator.detach(&self.db, cref);
        }
        let dead: rustc_hash::FxHashSet<ClauseRef> = doomed.into_iter().collect();
        self.db.retain_problem(|cref| !dead.contains(&cref));
        self.db.retain_learned(|cref| !dead.contains(&cref));
    }

    /// Appends a constraint to the problem after initialization. The
    /// constraint is first reduced against the top level: satisfied
    /// literals lower the threshold, falsified literals disappear. It may
    /// turn out already satisfied, impossible (Unsat), fully forced
    /// (propagated as units), or worth watching like any other constraint.
    pub fn append_clause(&mut self, mut clause: Clause) {
        self.cleanup_bindings(1);
        let card = i64::from(clause.cardinality());
        let mut min_w: i64 = 0;
        let mut max_w: i64 = 0;
        let mut i = 0;
        while i < clause.len() {
            let lit = clause.get(i);
            match self.model.lit_status(lit) {
                Status::Sat => {
                    let w = i64::from(clause.weight(i));
                    min_w += w;
                    max_w += w;
                    clause.remove_lit(i);
                    #[allow(clippy::cast_possible_truncation)]
                    clause.update_cardinality(-(w as i32));
                }
                Status::Unsat => clause.remove_lit(i),
                Status::Indet => {
                    max_w += i64::from(clause.weight(i));
                    i += 1;
                }
            }
        }
        if min_w >= card {
            return;
        }
        if max_w < card {
            self.status = Status::Unsat;
            return;
        }
        if max_w == card {
            let units: Vec<Lit> = clause.iter().copied().collect();
            self.propagate_units(&units);
        } else {
            self.attach_clause(clause);
        }
    }

    /// Adds and watches a problem constraint without top-level reduction.
    pub(crate) fn attach_clause(&mut self, clause: Clause) -> ClauseRef {
        let cref = self.db.add_problem(clause);
        self.propagator.attach(&mut self.db, cref);
        cref
    }

    /// The model found by the last successful run, as a boolean per
    /// variable.
    ///
    /// # Panics
    ///
    /// Panics if no model was ever found; calling this on a non-Sat solver
    /// is a programming error.
    #[must_use]
    pub fn model(&self) -> Vec<bool> {
        let model = self
            .last_model
            .as_ref()
            .expect("cannot read a model from a solver that is not Sat");
        (0..self.nb_vars)
            .map(|v| {
                #[allow(clippy::cast_possible_truncation)]
                let var = v as u32;
                model.signed(var) > 0
            })
            .collect()
    }

    /// The model found by the last successful run, keyed by DIMACS variable
    /// numbers.
    ///
    /// # Panics
    ///
    /// Panics if no model was ever found.
    #[must_use]
    pub fn model_map(&self) -> ModelMap {
        let model = self
            .last_model
            .as_ref()
            .expect("cannot read a model from a solver that is not Sat");
        (0..self.nb_vars)
            .map(|v| {
                #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
                let var = v as u32;
                (v as i32 + 1, model.signed(var) > 0)
            })
            .collect()
    }

    pub(crate) fn maybe_log_progress(&mut self) {
        if self.verbose && self.progress.tick() {
            log::info!("{}", self.progress_line());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problem(nb_vars: usize, clauses: &[&[i32]]) -> Problem {
        let mut p = Problem::new(nb_vars);
        for c in clauses {
            p.add_clause(c).unwrap();
        }
        p
    }

    #[test]
    fn test_simple_sat() {
        let p = problem(2, &[&[1, 2], &[-1, 2], &[1, -2]]);
        let mut solver = Solver::new(p);
        assert_eq!(solver.solve(), Status::Sat);
        assert_eq!(solver.model(), vec![true, true]);
    }

    #[test]
    fn test_contradictory_units_are_unsat() {
        let p = problem(1, &[&[1], &[-1]]);
        let mut solver = Solver::new(p);
        assert_eq!(solver.solve(), Status::Unsat);
    }

    #[test]
    fn test_pigeonhole_3_2_is_unsat() {
        // Three pigeons, two holes: p_{i,h} with i in 0..3, h in 0..2.
        let mut p = Problem::new(6);
        for pigeon in 0..3 {
            p.add_clause(&[pigeon * 2 + 1, pigeon * 2 + 2]).unwrap();
        }
        for hole in 0..2_i32 {
            for a in 0..3 {
                for b in (a + 1)..3 {
                    p.add_clause(&[-(a * 2 + hole + 1), -(b * 2 + hole + 1)])
                        .unwrap();
                }
            }
        }
        let mut solver = Solver::new(p);
        assert_eq!(solver.solve(), Status::Unsat);
    }

    #[test]
    fn test_solving_twice_is_idempotent() {
        let p = problem(3, &[&[1, 2, 3], &[-1, -2], &[-2, -3]]);
        let mut solver = Solver::new(p);
        let first = solver.solve();
        let second = solver.solve();
        assert_eq!(first, Status::Sat);
        assert_eq!(first, second);
    }

    #[test]
    fn test_model_respects_problem() {
        let clauses: &[&[i32]] = &[
            &[1, 2, -3],
            &[-1, 3],
            &[-2, 3],
            &[2, 3],
            &[-3, 1, 2],
        ];
        let p = problem(3, clauses);
        let check = p.clone();
        let mut solver = Solver::new(p);
        assert_eq!(solver.solve(), Status::Sat);
        assert!(check.check_model(&solver.model()));
    }

    #[test]
    fn test_trail_model_consistency_after_solve() {
        let p = problem(3, &[&[1, 2], &[-1, 3]]);
        let mut solver = Solver::new(p);
        solver.solve();
        for i in 0..solver.trail.len() {
            let lit = solver.trail.get(i);
            assert!(solver.model.lit_true(lit));
        }
    }

    #[test]
    fn test_append_clause_forces_units() {
        let p = problem(2, &[&[1, 2]]);
        let mut solver = Solver::new(p);
        assert_eq!(solver.solve(), Status::Sat);
        solver.append_clause(Clause::new(&[Lit::from_i32(-1)]));
        solver.append_clause(Clause::new(&[Lit::from_i32(-2)]));
        assert_eq!(solver.solve(), Status::Unsat);
    }

    #[test]
    fn test_append_satisfied_clause_is_dropped() {
        let p = problem(1, &[&[1]]);
        let mut solver = Solver::new(p);
        let before = solver.db.nb_problem();
        solver.append_clause(Clause::new(&[Lit::from_i32(1), Lit::from_i32(-1)]));
        assert_eq!(solver.db.nb_problem(), before);
        assert_eq!(solver.solve(), Status::Sat);
    }

    #[test]
    #[should_panic(expected = "cannot read a model")]
    fn test_model_on_unsat_panics() {
        let p = problem(1, &[&[1], &[-1]]);
        let mut solver = Solver::new(p);
        solver.solve();
        let _ = solver.model();
    }

    #[test]
    fn test_backtrack_restores_heap_model_and_reasons() {
        let p = problem(3, &[&[-1, 2]]);
        let mut solver = Solver::new(p);
        solver.propagate_and_search(Some(Lit::from_i32(3)), 2);
        // All variables are bound once the search reaches Sat.
        assert!((0..3).all(|v| solver.model.is_bound(v)));

        solver.cleanup_bindings(2);
        for v in 0..3 {
            let lvl = solver.model.level(v);
            assert!(lvl <= 2);
            if lvl == 0 {
                assert!(solver.order.contains(v), "unbound var must be decidable");
                assert_eq!(solver.trail.reason(v), None);
            }
        }
        for i in 0..solver.trail.len() {
            assert!(solver.model.level(solver.trail.get(i).variable()) <= 2);
        }
    }

    #[test]
    fn test_pb_problem_end_to_end() {
        // 3 x1 + 2 x2 + x3 >= 3 with x1 forbidden forces x2 and x3.
        let mut p = Problem::new(3);
        p.add_pb(&[1, 2, 3], &[3, 2, 1], 3).unwrap();
        p.add_clause(&[-1]).unwrap();
        let check = p.clone();
        let mut solver = Solver::new(p);
        assert_eq!(solver.solve(), Status::Sat);
        let model = solver.model();
        assert!(!model[0]);
        assert!(model[1]);
        assert!(model[2]);
        assert!(check.check_model(&model));
    }
}
