#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

//! Dynamic restart policy driven by Literal Block Distances.
//!
//! The policy keeps a short sliding window of recently learned clauses'
//! LBDs next to a long-running average. When the recent window is clearly
//! worse (higher) than the long-term average, the current search branch is
//! judged unproductive and a restart is requested. Conversely, when the
//! trail grows well past its long-term average the solver is probably
//! closing in on a model, and the pending restart is cancelled by clearing
//! the window.

/// Size of the sliding LBD window.
const LBD_WINDOW: usize = 50;
/// A restart fires when `recent_avg * RESTART_FACTOR > global_avg`.
const RESTART_FACTOR: f64 = 0.8;
/// Restarts are postponed when the trail exceeds `BLOCK_FACTOR` times its
/// long-term average length.
const BLOCK_FACTOR: f64 = 1.4;

#[derive(Debug, Clone)]
pub struct LbdStats {
    recent: [u32; LBD_WINDOW],
    idx: usize,
    filled: usize,
    window_sum: u64,
    total_sum: u64,
    total_count: u64,
    trail_sum: u64,
    trail_count: u64,
}

impl Default for LbdStats {
    fn default() -> Self {
        Self::new()
    }
}

impl LbdStats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            recent: [0; LBD_WINDOW],
            idx: 0,
            filled: 0,
            window_sum: 0,
            total_sum: 0,
            total_count: 0,
            trail_sum: 0,
            trail_count: 0,
        }
    }

    /// Records the LBD of a freshly learned clause.
    pub fn add_lbd(&mut self, lbd: u32) {
        self.total_sum += u64::from(lbd);
        self.total_count += 1;
        if self.filled == LBD_WINDOW {
            self.window_sum -= u64::from(self.recent[self.idx]);
        } else {
            self.filled += 1;
        }
        self.recent[self.idx] = lbd;
        self.window_sum += u64::from(lbd);
        self.idx = (self.idx + 1) % LBD_WINDOW;
    }

    /// Records the trail length at a conflict. When the trail is much longer
    /// than usual, the pending window is dropped so the imminent restart is
    /// postponed.
    #[allow(clippy::cast_precision_loss)]
    pub fn add_conflict(&mut self, trail_len: usize) {
        self.trail_sum += trail_len as u64;
        self.trail_count += 1;
        if self.filled == LBD_WINDOW && self.trail_count > 0 {
            let avg = self.trail_sum as f64 / self.trail_count as f64;
            if trail_len as f64 > BLOCK_FACTOR * avg {
                self.clear();
            }
        }
    }

    /// `true` when the recent LBD window is worse than the long-term
    /// average, scaled by [`RESTART_FACTOR`].
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn must_restart(&self) -> bool {
        if self.filled < LBD_WINDOW || self.total_count == 0 {
            return false;
        }
        let recent_avg = self.window_sum as f64 / LBD_WINDOW as f64;
        let global_avg = self.total_sum as f64 / self.total_count as f64;
        recent_avg * RESTART_FACTOR > global_avg
    }

    /// Empties the sliding window. Long-term averages survive.
    pub fn clear(&mut self) {
        self.recent = [0; LBD_WINDOW];
        self.idx = 0;
        self.filled = 0;
        self.window_sum = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_restart_before_window_fills() {
        let mut stats = LbdStats::new();
        for _ in 0..LBD_WINDOW - 1 {
            stats.add_lbd(100);
        }
        assert!(!stats.must_restart());
    }

    #[test]
    fn test_restart_on_degrading_lbds() {
        let mut stats = LbdStats::new();
        // A long run of good clauses establishes a low global average...
        for _ in 0..1000 {
            stats.add_lbd(2);
        }
        stats.clear();
        // ...then a window of much worse clauses triggers the restart.
        for _ in 0..LBD_WINDOW {
            stats.add_lbd(30);
        }
        assert!(stats.must_restart());
    }

    #[test]
    fn test_steady_lbds_do_not_restart() {
        let mut stats = LbdStats::new();
        for _ in 0..10 * LBD_WINDOW {
            stats.add_lbd(5);
        }
        // recent_avg == global_avg, damped by the restart factor.
        assert!(!stats.must_restart());
    }

    #[test]
    fn test_long_trail_blocks_restart() {
        let mut stats = LbdStats::new();
        for _ in 0..1000 {
            stats.add_lbd(2);
        }
        stats.clear();
        for _ in 0..LBD_WINDOW {
            stats.add_lbd(30);
        }
        for _ in 0..100 {
            stats.add_conflict(10);
        }
        assert!(stats.must_restart());
        // A conflict with a far larger trail clears the window.
        stats.add_conflict(1000);
        assert!(!stats.must_restart());
    }
}
