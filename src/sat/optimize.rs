#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

//! Weighted optimization by iterative model improvement.
//!
//! With an objective `minimize Σ w_i * [m_i true]`, the engine solves,
//! reads the cost of the model, then appends a pseudo-Boolean constraint
//! demanding any further model be strictly cheaper:
//! `Σ w_i * !m_i >= maxCost - cost + 1`. When the tightened problem turns
//! Unsat, the last model found was optimal. The costs emitted along the way
//! are strictly decreasing.
//!
//! The negated objective literals double as soft assumptions: they are
//! sorted by decreasing weight when the tightening constraint is built, and
//! decision phases keep preferring to falsify heavy objective literals.

use crate::sat::assignment::Status;
use crate::sat::clause::Clause;
use crate::sat::literal::Lit;
use crate::sat::solver::{cancelled, ModelMap, Solver};
use log::info;
use std::sync::mpsc::{Receiver, Sender};

/// One (possibly intermediate) optimization result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub status: Status,
    /// The model, empty unless `status` is Sat.
    pub model: ModelMap,
    /// The objective cost of `model`; 0 for decision problems.
    pub weight: i32,
}

impl Solver {
    /// Searches for a model of minimal objective cost. Every improving
    /// model is sent to `models` on the way; the returned solution is the
    /// best one found. Cancellation is polled between solving rounds — when
    /// it fires, the best model so far is returned without an optimality
    /// guarantee.
    pub fn optimal(
        &mut self,
        models: Option<&Sender<Solution>>,
        stop: Option<&Receiver<()>>,
    ) -> Solution {
        let mut status = self.solve_with_stop(stop);
        if status != Status::Sat {
            return Solution {
                status,
                model: ModelMap::default(),
                weight: -1,
            };
        }
        if !self.optim() {
            return Solution {
                status: Status::Sat,
                model: self.model_map(),
                weight: 0,
            };
        }

        let weights: Vec<i32> = self
            .min_weights
            .clone()
            .unwrap_or_else(|| vec![1; self.min_lits.len()]);
        let max_cost: i64 = weights.iter().map(|&w| i64::from(w)).sum();
        // Tightening constraints falsify objective literals, heaviest first.
        let mut assumptions: Vec<(Lit, i32)> = self
            .min_lits
            .iter()
            .map(|&lit| lit.negated())
            .zip(weights)
            .collect();
        assumptions.sort_by_key(|&(_, w)| std::cmp::Reverse(w));
        let (assumption_lits, assumption_weights): (Vec<Lit>, Vec<i32>) =
            assumptions.into_iter().unzip();

        let mut best = Solution {
            status: Status::Sat,
            model: ModelMap::default(),
            weight: -1,
        };
        while status == Status::Sat {
            self.last_model = Some(self.model.clone());
            let cost = self.current_cost();
            best = Solution {
                status: Status::Sat,
                model: self.model_map(),
                weight: cost,
            };
            if let Some(sink) = models {
                let _ = sink.send(best.clone());
            }
            if cost == 0 {
                break;
            }
            if self.verbose {
                info!("o {cost}");
            }
            let threshold = i32::try_from(max_cost - i64::from(cost) + 1)
                .expect("objective threshold overflow");
            self.append_clause(Clause::new_pb(
                &assumption_lits,
                &assumption_weights,
                threshold,
            ));
            self.rebuild_order_heap();
            if cancelled(stop) {
                break;
            }
            status = self.solve_with_stop(stop);
        }
        best
    }

    /// Minimizes the objective and returns the optimal cost: -1 when the
    /// problem is unsatisfiable, 0 for decision problems. The optimal model
    /// is available through [`Solver::model`] afterwards.
    pub fn minimize(&mut self) -> i32 {
        let solution = self.optimal(None, None);
        if solution.status == Status::Sat {
            solution.weight
        } else {
            -1
        }
    }

    /// The objective cost of the model currently on the trail.
    fn current_cost(&self) -> i32 {
        let mut cost = 0;
        for (i, &lit) in self.min_lits.iter().enumerate() {
            if self.model.lit_true(lit) {
                cost += self.min_weights.as_ref().map_or(1, |ws| ws[i]);
            }
        }
        cost
    }
}
