#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

//! The input handed to the engine: variables, constraints, known units and
//! an optional objective.
//!
//! Constraints arrive in DIMACS-style integers (`±(var + 1)`); building a
//! [`Problem`] validates ranges and weights, normalizes pseudo-Boolean
//! constraints (merging duplicate literals, cancelling complementary
//! pairs), and strips out what can be decided immediately: tautologies are
//! dropped, unit facts are collected, and constraints that cannot be met
//! flip the problem's status to Unsat up front. Inconsistent inputs are an
//! Unsat outcome, never an error; errors are reserved for malformed input.
//!
//! Parsing of DIMACS or OPB text is a caller concern; this type is the
//! hand-off point.

use crate::sat::assignment::Status;
use crate::sat::clause::Clause;
use crate::sat::literal::Lit;
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Malformed input to [`Problem`] construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProblemError {
    /// `0` never encodes a literal in DIMACS conventions.
    #[error("0 is not a valid literal")]
    ZeroLiteral,
    /// A literal refers to a variable outside `[1, nb_vars]`.
    #[error("literal {0} out of range for {1} variables")]
    LiteralOutOfRange(i32, usize),
    /// Pseudo-Boolean weights must be strictly positive.
    #[error("weight {0} is not positive")]
    NonPositiveWeight(i32),
    /// A pseudo-Boolean constraint or objective needs one weight per literal.
    #[error("{lits} literals but {weights} weights")]
    ArityMismatch { lits: usize, weights: usize },
}

/// A ready-to-solve problem.
#[derive(Debug, Clone, Default)]
pub struct Problem {
    pub(crate) nb_vars: usize,
    pub(crate) status: Status,
    pub(crate) clauses: Vec<Clause>,
    pub(crate) units: Vec<Lit>,
    pub(crate) min_lits: Vec<Lit>,
    pub(crate) min_weights: Option<Vec<i32>>,
}

impl Problem {
    /// Creates an empty problem over `nb_vars` variables.
    #[must_use]
    pub fn new(nb_vars: usize) -> Self {
        Self {
            nb_vars,
            status: Status::Indet,
            ..Self::default()
        }
    }

    /// Number of variables.
    #[must_use]
    pub const fn nb_vars(&self) -> usize {
        self.nb_vars
    }

    /// `Unsat` when construction already decided the problem.
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    fn check_lit(&self, lit: i32) -> Result<Lit, ProblemError> {
        if lit == 0 {
            return Err(ProblemError::ZeroLiteral);
        }
        if lit.unsigned_abs() as usize > self.nb_vars {
            return Err(ProblemError::LiteralOutOfRange(lit, self.nb_vars));
        }
        Ok(Lit::from_i32(lit))
    }

    /// Adds a plain clause. Tautologies are dropped, the empty clause makes
    /// the problem Unsat, and single literals become known units.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero or out-of-range literal.
    pub fn add_clause(&mut self, lits: &[i32]) -> Result<(), ProblemError> {
        let lits = lits
            .iter()
            .map(|&l| self.check_lit(l))
            .collect::<Result<Vec<_>, _>>()?;
        let clause = Clause::new(&lits);
        if clause.iter().any(|&l| lits.contains(&l.negated())) {
            return Ok(());
        }
        match clause.len() {
            0 => self.status = Status::Unsat,
            1 => self.units.push(clause.first()),
            _ => self.clauses.push(clause),
        }
        Ok(())
    }

    /// Adds a cardinality constraint: at least `cardinality` of `lits` must
    /// be true. A repeated literal counts once per occurrence, which makes
    /// the constraint pseudo-Boolean; such inputs are rewritten as one.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero or out-of-range literal.
    pub fn add_cardinality(&mut self, lits: &[i32], cardinality: i32) -> Result<(), ProblemError> {
        if cardinality <= 0 {
            return Ok(());
        }
        let distinct: rustc_hash::FxHashSet<i32> = lits.iter().copied().collect();
        if distinct.len() != lits.len() || lits.iter().any(|&l| distinct.contains(&-l)) {
            return self.add_pb(lits, &vec![1; lits.len()], cardinality);
        }
        let lits = lits
            .iter()
            .map(|&l| self.check_lit(l))
            .collect::<Result<Vec<_>, _>>()?;
        let clause = Clause::new_cardinality(&lits, cardinality);
        #[allow(clippy::cast_possible_wrap)]
        let len = clause.len() as i32;
        if len < cardinality {
            self.status = Status::Unsat;
        } else if len == cardinality {
            self.units.extend(clause.iter());
        } else if cardinality == 1 {
            self.clauses.push(Clause::new(&lits));
        } else {
            self.clauses.push(clause);
        }
        Ok(())
    }

    /// Adds a pseudo-Boolean constraint `Σ weights[i] * lits[i] >= cardinality`.
    ///
    /// Duplicate literals have their weights merged and complementary pairs
    /// are cancelled against the threshold, so the stored constraint has at
    /// most one term per variable. Literals forced by weight alone are
    /// turned into known units.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid literals, non-positive weights, or a
    /// weight/literal count mismatch.
    pub fn add_pb(
        &mut self,
        lits: &[i32],
        weights: &[i32],
        cardinality: i32,
    ) -> Result<(), ProblemError> {
        if lits.len() != weights.len() {
            return Err(ProblemError::ArityMismatch {
                lits: lits.len(),
                weights: weights.len(),
            });
        }
        let mut merged: FxHashMap<Lit, i64> = FxHashMap::default();
        for (&l, &w) in lits.iter().zip(weights) {
            if w <= 0 {
                return Err(ProblemError::NonPositiveWeight(w));
            }
            *merged.entry(self.check_lit(l)?).or_insert(0) += i64::from(w);
        }

        // Cancel `a*l + b*!l` into `(a-b)*l`, lowering the threshold by the
        // smaller weight.
        let mut cardinality = i64::from(cardinality);
        let mut terms: Vec<(Lit, i64)> = Vec::with_capacity(merged.len());
        for (&lit, &w) in &merged {
            if !lit.is_positive() {
                continue;
            }
            match merged.get(&lit.negated()) {
                None => terms.push((lit, w)),
                Some(&nw) => {
                    cardinality -= w.min(nw);
                    if w > nw {
                        terms.push((lit, w - nw));
                    } else if nw > w {
                        terms.push((lit.negated(), nw - w));
                    }
                }
            }
        }
        for (&lit, &w) in &merged {
            if !lit.is_positive() && !merged.contains_key(&lit.negated()) {
                terms.push((lit, w));
            }
        }

        if cardinality <= 0 {
            return Ok(());
        }
        let total: i64 = terms.iter().map(|&(_, w)| w).sum();
        if total < cardinality {
            self.status = Status::Unsat;
            return Ok(());
        }
        // A literal whose absence leaves less than the threshold is forced.
        for &(lit, w) in &terms {
            if total - w < cardinality {
                self.units.push(lit);
            }
        }
        if total == cardinality {
            return Ok(());
        }

        let lits: Vec<Lit> = terms.iter().map(|&(l, _)| l).collect();
        let weights: Vec<i32> = terms
            .iter()
            .map(|&(_, w)| i32::try_from(w).expect("pseudo-Boolean weight overflow"))
            .collect();
        let card = i32::try_from(cardinality).expect("pseudo-Boolean threshold overflow");
        if weights.iter().all(|&w| w == 1) {
            return self
                .add_cardinality(&lits.iter().map(|l| l.to_i32()).collect::<Vec<_>>(), card);
        }
        self.clauses.push(Clause::new_pb(&lits, &weights, card));
        Ok(())
    }

    /// Declares the objective: minimize `Σ weights[i] * [lits[i] is true]`.
    /// Without weights every literal costs 1.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid literals, non-positive weights, or a
    /// weight/literal count mismatch.
    pub fn set_objective(
        &mut self,
        lits: &[i32],
        weights: Option<&[i32]>,
    ) -> Result<(), ProblemError> {
        if let Some(ws) = weights {
            if ws.len() != lits.len() {
                return Err(ProblemError::ArityMismatch {
                    lits: lits.len(),
                    weights: ws.len(),
                });
            }
            if let Some(&w) = ws.iter().find(|&&w| w <= 0) {
                return Err(ProblemError::NonPositiveWeight(w));
            }
        }
        self.min_lits = lits
            .iter()
            .map(|&l| self.check_lit(l))
            .collect::<Result<Vec<_>, _>>()?;
        self.min_weights = weights.map(<[i32]>::to_vec);
        Ok(())
    }

    /// Checks a total assignment against every constraint and unit of the
    /// problem. Mostly useful for testing and certification.
    #[must_use]
    pub fn check_model(&self, assignment: &[bool]) -> bool {
        let lit_true =
            |l: Lit| assignment.get(l.variable() as usize).copied() == Some(l.is_positive());
        if !self.units.iter().all(|&u| lit_true(u)) {
            return false;
        }
        self.clauses.iter().all(|c| {
            let satisfied: i64 = (0..c.len())
                .filter(|&i| lit_true(c.get(i)))
                .map(|i| i64::from(c.weight(i)))
                .sum();
            satisfied >= i64::from(c.cardinality())
        })
    }
}
