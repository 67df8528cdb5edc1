#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

//! The single constraint representation used by the whole engine.
//!
//! One layout covers three shapes:
//!
//! - a plain clause: cardinality 1, all weights 1 — at least one literal
//!   must be true;
//! - a cardinality constraint: cardinality `k`, all weights 1 — at least
//!   `k` literals must be true;
//! - a pseudo-Boolean constraint: per-literal positive weights and a
//!   threshold `k` — the weights of the true literals must sum to at
//!   least `k`.
//!
//! The metadata carried here (learned flag, activity, LBD, lock count,
//! watched-prefix length) is what clause-database reduction and reason
//! bookkeeping dispatch on. Weights of pseudo-Boolean constraints are kept
//! sorted in decreasing order so that the maximum weight is always at slot
//! 0 and the watched prefix can be computed greedily.

use crate::sat::assignment::Model;
use crate::sat::literal::Lit;
use bit_vec::BitVec;
use itertools::Itertools;
use ordered_float::OrderedFloat;
use smallvec::SmallVec;
use std::fmt::Write as _;

/// A clause, cardinality constraint or pseudo-Boolean constraint.
#[derive(Debug, Clone, PartialEq, PartialOrd, Default)]
pub struct Clause {
    lits: SmallVec<[Lit; 8]>,
    /// Per-literal weights; `None` means every weight is 1.
    weights: Option<Vec<i32>>,
    /// How many literals (plain, cardinality) or how much weight (PB) must
    /// be satisfied.
    cardinality: i32,
    /// Length of the watched prefix of `lits`.
    watch_len: usize,
    /// Literal Block Distance at learning time; only meaningful for learned
    /// clauses.
    lbd: u32,
    learned: bool,
    /// How many variables currently hold this clause as their reason. A
    /// locked clause must not be deleted.
    lock_count: u32,
    /// Bumped when the clause takes part in conflict analysis; reduction
    /// prefers deleting low-activity clauses.
    activity: OrderedFloat<f64>,
}

impl Clause {
    /// Creates a plain clause from literals, deduplicating them.
    #[must_use]
    pub fn new(lits: &[Lit]) -> Self {
        let lits: SmallVec<[Lit; 8]> = lits.iter().copied().unique().collect();
        Self {
            watch_len: 2.min(lits.len()),
            lits,
            weights: None,
            cardinality: 1,
            ..Self::default()
        }
    }

    /// Creates a cardinality constraint requiring at least `cardinality`
    /// true literals.
    #[must_use]
    pub fn new_cardinality(lits: &[Lit], cardinality: i32) -> Self {
        let lits: SmallVec<[Lit; 8]> = lits.iter().copied().unique().collect();
        let mut c = Self {
            lits,
            weights: None,
            cardinality,
            ..Self::default()
        };
        c.reset_watch_prefix();
        c
    }

    /// Creates a pseudo-Boolean constraint `Σ weights[i] * lits[i] >= cardinality`.
    ///
    /// Literals and weights are reordered together by decreasing weight.
    ///
    /// # Panics
    ///
    /// Panics if `lits` and `weights` have different lengths.
    #[must_use]
    pub fn new_pb(lits: &[Lit], weights: &[i32], cardinality: i32) -> Self {
        assert_eq!(lits.len(), weights.len(), "one weight per literal");
        let mut pairs: Vec<(Lit, i32)> = lits.iter().copied().zip(weights.iter().copied()).collect();
        pairs.sort_by_key(|&(_, w)| std::cmp::Reverse(w));
        let mut c = Self {
            lits: pairs.iter().map(|&(l, _)| l).collect(),
            weights: Some(pairs.iter().map(|&(_, w)| w).collect()),
            cardinality,
            ..Self::default()
        };
        c.reset_watch_prefix();
        c
    }

    /// Number of literals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lits.len()
    }

    /// `true` iff the clause holds no literal.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lits.is_empty()
    }

    /// The required cardinality (or weight threshold, for PB constraints).
    #[must_use]
    pub const fn cardinality(&self) -> i32 {
        self.cardinality
    }

    /// Adjusts the cardinality by `delta`; used when literals satisfied at
    /// the top level are stripped out.
    pub fn update_cardinality(&mut self, delta: i32) {
        self.cardinality += delta;
    }

    /// The literal at slot `i`.
    #[must_use]
    pub fn get(&self, i: usize) -> Lit {
        self.lits[i]
    }

    /// Overwrites the literal at slot `i`; used to swap watched and
    /// unwatched literals.
    pub fn set(&mut self, i: usize, lit: Lit) {
        self.lits[i] = lit;
    }

    /// Swaps the literals (and weights, for PB constraints) at `i` and `j`.
    pub fn swap(&mut self, i: usize, j: usize) {
        self.lits.swap(i, j);
        if let Some(w) = &mut self.weights {
            w.swap(i, j);
        }
    }

    /// The literal currently in slot 0. By convention, after propagation
    /// the asserting literal of a learned clause sits there.
    #[must_use]
    pub fn first(&self) -> Lit {
        self.lits[0]
    }

    /// The weight of the literal at slot `i` (1 unless pseudo-Boolean).
    #[must_use]
    pub fn weight(&self, i: usize) -> i32 {
        self.weights.as_ref().map_or(1, |w| w[i])
    }

    /// The largest single weight. Sorted construction keeps it at slot 0
    /// for PB constraints.
    #[must_use]
    pub fn max_weight(&self) -> i32 {
        if self.weights.is_some() && !self.lits.is_empty() {
            self.weight(0)
        } else {
            1
        }
    }

    /// The sum of all weights (the number of literals unless PB).
    #[must_use]
    pub fn weight_sum(&self) -> i64 {
        self.weights.as_ref().map_or(self.lits.len() as i64, |w| {
            w.iter().map(|&x| i64::from(x)).sum()
        })
    }

    /// `true` iff the constraint carries explicit weights.
    #[must_use]
    pub const fn is_pseudo_boolean(&self) -> bool {
        self.weights.is_some()
    }

    /// `true` for clauses produced by conflict analysis.
    #[must_use]
    pub const fn is_learned(&self) -> bool {
        self.learned
    }

    /// Marks this clause as learned.
    pub fn set_learned(&mut self) {
        self.learned = true;
    }

    /// Removes the literal (and weight) at `i`, preserving the order of the
    /// remaining literals so PB weights stay sorted.
    pub fn remove_lit(&mut self, i: usize) {
        self.lits.remove(i);
        if let Some(w) = &mut self.weights {
            w.remove(i);
        }
    }

    /// Length of the watched prefix.
    #[must_use]
    pub const fn watch_len(&self) -> usize {
        self.watch_len
    }

    /// Grows the watched prefix by one slot.
    pub fn grow_watch(&mut self) {
        debug_assert!(self.watch_len < self.lits.len());
        self.watch_len += 1;
    }

    /// Recomputes the watched prefix from scratch:
    ///
    /// - plain clauses and cardinality constraints watch their first
    ///   `cardinality + 1` literals;
    /// - PB constraints watch the shortest prefix whose weights sum to at
    ///   least `max_weight + cardinality - 1`, so that any assignment able
    ///   to falsify the constraint must touch a watched literal.
    pub fn reset_watch_prefix(&mut self) {
        #[allow(clippy::cast_sign_loss)]
        let target = if self.weights.is_some() {
            let needed = i64::from(self.max_weight()) + i64::from(self.cardinality) - 1;
            let mut sum = 0_i64;
            let mut w = 0;
            while w < self.lits.len() && sum < needed {
                sum += i64::from(self.weight(w));
                w += 1;
            }
            w
        } else {
            (self.cardinality as usize + 1).min(self.lits.len())
        };
        self.watch_len = target;
    }

    /// The cached LBD of a learned clause.
    #[must_use]
    pub const fn lbd(&self) -> u32 {
        self.lbd
    }

    /// Computes and caches the Literal Block Distance: the number of
    /// distinct decision levels among the clause's literals.
    pub fn calculate_lbd(&mut self, model: &Model) {
        let max_level = self
            .lits
            .iter()
            .map(|l| model.level(l.variable()))
            .max()
            .unwrap_or(0);
        #[allow(clippy::cast_sign_loss)]
        let mut seen = BitVec::from_elem(max_level as usize + 1, false);
        let mut count = 0;
        for lit in &self.lits {
            #[allow(clippy::cast_sign_loss)]
            let lvl = model.level(lit.variable()) as usize;
            if lvl > 0 && !seen.get(lvl).unwrap_or(true) {
                seen.set(lvl, true);
                count += 1;
            }
        }
        self.lbd = count;
    }

    /// Increments the lock count. A variable's reason clause is locked for
    /// as long as the binding stands.
    pub fn lock(&mut self) {
        self.lock_count += 1;
    }

    /// Decrements the lock count.
    pub fn unlock(&mut self) {
        debug_assert!(self.lock_count > 0, "unlocking an unlocked clause");
        self.lock_count -= 1;
    }

    /// `true` iff some variable holds this clause as its reason.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.lock_count > 0
    }

    /// The clause's current activity score.
    #[must_use]
    pub fn activity(&self) -> f64 {
        self.activity.0
    }

    /// Adds `increment` to the activity score.
    pub fn bump_activity(&mut self, increment: f64) {
        self.activity += increment;
    }

    /// Multiplies the activity score by `factor`; used when rescaling the
    /// whole learned database to avoid overflow.
    pub fn scale_activity(&mut self, factor: f64) {
        self.activity *= factor;
    }

    /// Iterates over the literals.
    pub fn iter(&self) -> impl Iterator<Item = &Lit> {
        self.lits.iter()
    }

    /// Renders the constraint as an OPB-style line, e.g.
    /// `2 x1 +1 ~x2 >= 2 ;`.
    #[must_use]
    pub fn pb_string(&self) -> String {
        let mut out = String::new();
        for (i, lit) in self.lits.iter().enumerate() {
            if i > 0 {
                out.push_str(" +");
            }
            let var = lit.variable() + 1;
            if lit.is_positive() {
                let _ = write!(out, "{} x{var}", self.weight(i));
            } else {
                let _ = write!(out, "{} ~x{var}", self.weight(i));
            }
        }
        let _ = write!(out, " >= {} ;", self.cardinality);
        out
    }
}
