#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

//! Activity-ordered decision variable selection.
//!
//! A VSIDS-style scheme: every variable carries a floating-point activity
//! bumped whenever it takes part in a conflict, and decisions pick the free
//! variable of highest activity. The variables sit in an indexed binary
//! max-heap with a position map, so membership tests and decrease-key
//! operations are O(1) and O(log n).
//!
//! Activities are rescaled by `1e-100` once they pass `1e100`; the bump
//! increment grows geometrically instead of decaying every score, which is
//! the usual trick to make old conflicts fade.

use crate::sat::assignment::Model;
use crate::sat::literal::Variable;

const RESCALE_LIMIT: f64 = 1e100;
const RESCALE_FACTOR: f64 = 1e-100;
/// Initial activity decay; hardened towards [`MAX_DECAY`] as conflicts
/// accumulate.
pub const INITIAL_DECAY: f64 = 0.8;
/// Upper bound for the decay factor.
pub const MAX_DECAY: f64 = 0.95;

#[derive(Debug, Clone, Default)]
pub struct VsidsHeap {
    heap: Vec<Variable>,
    /// Position of each variable in `heap`, or -1 when absent.
    positions: Vec<i32>,
    activity: Vec<f64>,
    var_inc: f64,
    var_decay: f64,
}

impl VsidsHeap {
    #[must_use]
    pub fn new(nb_vars: usize) -> Self {
        Self {
            heap: Vec::with_capacity(nb_vars),
            positions: vec![-1; nb_vars],
            activity: vec![0.0; nb_vars],
            var_inc: 1.0,
            var_decay: INITIAL_DECAY,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    #[must_use]
    pub fn contains(&self, var: Variable) -> bool {
        self.positions[var as usize] >= 0
    }

    /// Adds a flat amount to a variable's activity; used to bias objective
    /// variables before the search starts.
    pub fn add_activity(&mut self, var: Variable, amount: f64) {
        self.activity[var as usize] += amount;
        if self.contains(var) {
            self.percolate_up(self.positions[var as usize] as usize);
        }
    }

    /// Rebuilds the heap over all currently unbound variables.
    pub fn rebuild(&mut self, model: &Model) {
        self.heap.clear();
        self.positions.iter_mut().for_each(|p| *p = -1);
        for var in model.unbound() {
            self.positions[var as usize] = i32::try_from(self.heap.len()).unwrap_or(i32::MAX);
            self.heap.push(var);
        }
        for i in (0..self.heap.len() / 2).rev() {
            self.percolate_down(i);
        }
    }

    /// Puts a variable back into the heap if it is not already there.
    pub fn insert(&mut self, var: Variable) {
        if self.contains(var) {
            return;
        }
        self.positions[var as usize] = i32::try_from(self.heap.len()).unwrap_or(i32::MAX);
        self.heap.push(var);
        self.percolate_up(self.heap.len() - 1);
    }

    /// Extracts the variable with the highest activity.
    pub fn pop(&mut self) -> Option<Variable> {
        if self.heap.is_empty() {
            return None;
        }
        let top = self.heap.swap_remove(0);
        self.positions[top as usize] = -1;
        if !self.heap.is_empty() {
            self.positions[self.heap[0] as usize] = 0;
            self.percolate_down(0);
        }
        Some(top)
    }

    /// Bumps a variable's activity and restores its heap position.
    pub fn bump(&mut self, var: Variable) {
        self.activity[var as usize] += self.var_inc;
        if self.activity[var as usize] > RESCALE_LIMIT {
            for a in &mut self.activity {
                *a *= RESCALE_FACTOR;
            }
            self.var_inc *= RESCALE_FACTOR;
        }
        if self.contains(var) {
            self.percolate_up(self.positions[var as usize] as usize);
        }
    }

    /// Grows the bump increment, which decays every other activity
    /// relatively.
    pub fn decay(&mut self) {
        self.var_inc *= 1.0 / self.var_decay;
    }

    /// Moves the decay factor one step closer to [`MAX_DECAY`]. Called every
    /// few thousand conflicts so that early search is more reactive than
    /// late search.
    pub fn harden_decay(&mut self) {
        if self.var_decay < MAX_DECAY {
            self.var_decay += 0.01;
        }
    }

    fn percolate_up(&mut self, mut i: usize) {
        let var = self.heap[i];
        let act = self.activity[var as usize];
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.activity[self.heap[parent] as usize] >= act {
                break;
            }
            self.heap[i] = self.heap[parent];
            self.positions[self.heap[i] as usize] = i32::try_from(i).unwrap_or(i32::MAX);
            i = parent;
        }
        self.heap[i] = var;
        self.positions[var as usize] = i32::try_from(i).unwrap_or(i32::MAX);
    }

    fn percolate_down(&mut self, mut i: usize) {
        let var = self.heap[i];
        let act = self.activity[var as usize];
        loop {
            let left = i * 2 + 1;
            if left >= self.heap.len() {
                break;
            }
            let right = left + 1;
            let child = if right < self.heap.len()
                && self.activity[self.heap[right] as usize] > self.activity[self.heap[left] as usize]
            {
                right
            } else {
                left
            };
            if self.activity[self.heap[child] as usize] <= act {
                break;
            }
            self.heap[i] = self.heap[child];
            self.positions[self.heap[i] as usize] = i32::try_from(i).unwrap_or(i32::MAX);
            i = child;
        }
        self.heap[i] = var;
        self.positions[var as usize] = i32::try_from(i).unwrap_or(i32::MAX);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heap_with_activities(acts: &[f64]) -> VsidsHeap {
        let mut h = VsidsHeap::new(acts.len());
        for (v, &a) in acts.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            h.add_activity(v as Variable, a);
        }
        h.rebuild(&Model::new(acts.len()));
        h
    }

    #[test]
    fn test_pop_returns_highest_activity_first() {
        let mut h = heap_with_activities(&[1.0, 5.0, 3.0, 4.0]);
        assert_eq!(h.pop(), Some(1));
        assert_eq!(h.pop(), Some(3));
        assert_eq!(h.pop(), Some(2));
        assert_eq!(h.pop(), Some(0));
        assert_eq!(h.pop(), None);
    }

    #[test]
    fn test_bump_reorders() {
        let mut h = heap_with_activities(&[1.0, 2.0, 3.0]);
        h.bump(0);
        h.bump(0);
        h.bump(0);
        assert_eq!(h.pop(), Some(0));
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut h = heap_with_activities(&[1.0, 2.0]);
        assert!(h.contains(0));
        h.insert(0);
        assert_eq!(h.pop(), Some(1));
        assert_eq!(h.pop(), Some(0));
        assert!(h.is_empty());
        h.insert(0);
        assert!(h.contains(0));
        assert!(!h.contains(1));
    }

    #[test]
    fn test_rebuild_skips_bound_vars() {
        let mut model = Model::new(3);
        model.bind(crate::sat::literal::Lit::new(1, true), 2);
        let mut h = heap_with_activities(&[1.0, 9.0, 2.0]);
        h.rebuild(&model);
        assert!(!h.contains(1));
        assert_eq!(h.pop(), Some(2));
        assert_eq!(h.pop(), Some(0));
    }
}
