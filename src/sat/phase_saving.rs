#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

//! Per-variable preferred polarities.
//!
//! Decisions reuse the polarity a variable last held before being undone
//! (phase saving). Variables that appear in the optimization objective are
//! special: after every backtrack their preferred polarity is reset to the
//! one falsifying the objective literal, so the search keeps pressure
//! towards cheaper models.

use crate::sat::literal::{Lit, Variable};

#[derive(Debug, Clone, Default)]
pub struct SavedPhases(Vec<bool>);

impl SavedPhases {
    #[must_use]
    pub fn new(nb_vars: usize) -> Self {
        Self(vec![false; nb_vars])
    }

    /// Remembers the polarity `var` held when it was unbound.
    pub fn save(&mut self, var: Variable, polarity: bool) {
        self.0[var as usize] = polarity;
    }

    /// The polarity the next decision on `var` should try first.
    #[must_use]
    pub fn preferred(&self, var: Variable) -> bool {
        self.0[var as usize]
    }

    /// Forces the preferred polarity of every objective literal to the one
    /// that falsifies it.
    pub fn reset_objective(&mut self, objective_lits: &[Lit]) {
        for lit in objective_lits {
            self.0[lit.variable() as usize] = !lit.is_positive();
        }
    }
}
