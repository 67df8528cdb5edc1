#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

//! Model enumeration and counting.
//!
//! After every model, the decision literals on the trail are negated into a
//! blocking clause: any later model must flip at least one decision. With
//! no decision the model was forced and nothing else exists; with a single
//! decision its negation is simply a new top-level fact. Otherwise the
//! blocking clause is attached, the search backtracks just below the
//! deepest decision and resumes with the negated decision bound by the new
//! clause, so enumeration continues where the last model left off instead
//! of restarting from scratch.

use crate::sat::assignment::Status;
use crate::sat::clause::Clause;
use crate::sat::literal::Lit;
use crate::sat::solver::{cancelled, ModelMap, Solver};
use log::debug;
use std::sync::mpsc::{Receiver, Sender};

impl Solver {
    /// Enumerates every model of the problem, sending each one to `models`
    /// as it is discovered, and returns how many were found. The
    /// cancellation channel is polled at restart boundaries and between
    /// models.
    pub fn enumerate(&mut self, models: Option<&Sender<ModelMap>>, stop: Option<&Receiver<()>>) -> usize {
        let mut nb = 0;
        while self.status != Status::Unsat {
            while self.status == Status::Indet {
                if cancelled(stop) {
                    return nb;
                }
                self.search_step();
            }
            if self.status == Status::Sat {
                nb += 1;
                self.last_model = Some(self.model.clone());
                debug!("model {nb} found");
                if let Some(sink) = models {
                    if sink.send(self.model_map()).is_err() {
                        return nb;
                    }
                }
                if cancelled(stop) {
                    return nb;
                }
                self.status = Status::Indet;
                self.block_current_model();
            }
        }
        nb
    }

    /// Counts the models of the problem.
    pub fn count_models(&mut self) -> usize {
        self.enumerate(None, None)
    }

    fn search_step(&mut self) {
        self.search();
        if self.status == Status::Indet {
            self.stats.nb_restarts += 1;
            self.rebuild_order_heap();
            self.maybe_log_progress();
        }
    }

    /// Forbids the model currently on the trail.
    fn block_current_model(&mut self) {
        let lits = self.decision_lits();
        match lits.len() {
            0 => self.status = Status::Unsat,
            1 => self.propagate_units(&lits),
            _ => {
                let highest = lits[0];
                let cref = self.attach_clause(Clause::new(&lits));
                let lvl = self.model.level(highest.variable()) - 1;
                self.cleanup_bindings(lvl);
                self.trail.set_reason(highest.variable(), cref);
                self.db[cref].lock();
                let status = self.propagate_and_search(Some(highest), lvl);
                self.status = status;
            }
        }
    }

    /// The negations of all decision literals, deepest level first, so that
    /// the blocking clause watches the two most recently decided levels.
    fn decision_lits(&self) -> Vec<Lit> {
        let Some(last) = self.trail.last() else {
            return Vec::new();
        };
        let max_lvl = self.model.level(last.variable());
        if max_lvl <= 1 {
            return Vec::new();
        }
        let mut lits = vec![Lit::default(); (max_lvl - 1) as usize];
        let mut filled = 0;
        for i in 0..self.trail.len() {
            let lit = self.trail.get(i);
            let var = lit.variable();
            let lvl = self.model.level(var);
            if lvl > 1 && self.trail.reason(var).is_none() {
                lits[(max_lvl - lvl) as usize] = lit.negated();
                filled += 1;
            }
        }
        debug_assert_eq!(filled, lits.len(), "one decision per level expected");
        lits
    }
}
