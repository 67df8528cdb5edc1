#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

//! Variable bindings as signed decision levels.
//!
//! The model stores, for every variable, the level at which it was bound:
//! `0` means unbound, a positive value means bound true at that level, a
//! negative value means bound false. Level 1 is reserved for top-level
//! bindings (units and unit-learned facts); decision levels start at 2.
//!
//! Keeping the polarity and the level in one signed integer is what lets
//! backtracking, reason bookkeeping and blocking-clause construction all
//! work off a single array.

use crate::sat::literal::{Lit, Variable};

/// The decision level a variable was bound at, with its polarity folded into
/// the sign. `0` = unbound, `±1` = top level, `|lvl| >= 2` = search levels.
pub type DecisionLevel = i32;

/// The outcome of a solving step or of a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    /// Not (yet) decided. Also the outcome of a cancelled run.
    #[default]
    Indet,
    /// A satisfying assignment was found.
    Sat,
    /// The constraints admit no assignment.
    Unsat,
}

/// Folds a literal's polarity into a decision level.
#[must_use]
pub const fn signed_level(lit: Lit, lvl: DecisionLevel) -> DecisionLevel {
    if lit.is_positive() {
        lvl
    } else {
        -lvl
    }
}

/// A (possibly partial) binding of all variables, indexed by variable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Model(Vec<DecisionLevel>);

impl Model {
    /// Creates a model with all `nb_vars` variables unbound.
    #[must_use]
    pub fn new(nb_vars: usize) -> Self {
        Self(vec![0; nb_vars])
    }

    /// Number of variables covered by this model.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` iff the model covers no variable at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The raw signed level of `var` (0 if unbound).
    #[must_use]
    pub fn signed(&self, var: Variable) -> DecisionLevel {
        self.0[var as usize]
    }

    /// The decision level `var` was bound at, 0 if unbound.
    #[must_use]
    pub fn level(&self, var: Variable) -> DecisionLevel {
        self.0[var as usize].abs()
    }

    /// `true` iff `var` has a binding.
    #[must_use]
    pub fn is_bound(&self, var: Variable) -> bool {
        self.0[var as usize] != 0
    }

    /// The truth value of `var`, if bound.
    #[must_use]
    pub fn value(&self, var: Variable) -> Option<bool> {
        match self.0[var as usize] {
            0 => None,
            lvl => Some(lvl > 0),
        }
    }

    /// The truth value of `lit` under the current bindings, if its variable
    /// is bound.
    #[must_use]
    pub fn lit_value(&self, lit: Lit) -> Option<bool> {
        self.value(lit.variable()).map(|b| b == lit.is_positive())
    }

    /// `true` iff `lit` is currently bound true.
    #[must_use]
    pub fn lit_true(&self, lit: Lit) -> bool {
        self.lit_value(lit) == Some(true)
    }

    /// `true` iff `lit` is currently bound false.
    #[must_use]
    pub fn lit_false(&self, lit: Lit) -> bool {
        self.lit_value(lit) == Some(false)
    }

    /// Whether `lit` is satisfied, falsified or unbound.
    #[must_use]
    pub fn lit_status(&self, lit: Lit) -> Status {
        match self.lit_value(lit) {
            None => Status::Indet,
            Some(true) => Status::Sat,
            Some(false) => Status::Unsat,
        }
    }

    /// Binds `lit` true at decision level `lvl`.
    pub fn bind(&mut self, lit: Lit, lvl: DecisionLevel) {
        debug_assert!(lvl > 0, "binding level must be positive");
        self.0[lit.variable() as usize] = signed_level(lit, lvl);
    }

    /// Removes the binding of `var`.
    pub fn unbind(&mut self, var: Variable) {
        self.0[var as usize] = 0;
    }

    /// Iterates over all unbound variables.
    #[allow(clippy::cast_possible_truncation)]
    pub fn unbound(&self) -> impl Iterator<Item = Variable> + '_ {
        self.0.iter().enumerate().filter_map(|(v, &lvl)| {
            let var = v as Variable;
            if lvl == 0 {
                Some(var)
            } else {
                None
            }
        })
    }
}
