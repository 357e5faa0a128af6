//! Completion accounting, throughput and ETA.
//!
//! `completed` counts every finished job, failed or not; `failed` is the
//! subset that produced no output. The tracker only observes outcomes.

use std::time::Duration;

use keepsake_common::{format_eta, RunClock};

/// Running counters for one run.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: usize,
    completed: usize,
    failed: usize,
    clock: RunClock,
}

/// Point-in-time view of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub completed: usize,
    pub failed: usize,
    pub total: usize,
    pub elapsed: Duration,
    /// Finished jobs per second.
    pub throughput: f64,
    pub eta: Duration,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            failed: 0,
            clock: RunClock::start(),
        }
    }

    /// Account for one finished job.
    pub fn record(&mut self, succeeded: bool) {
        self.completed += 1;
        if !succeeded {
            self.failed += 1;
        }
    }

    pub fn clock(&self) -> &RunClock {
        &self.clock
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.snapshot_at(self.clock.elapsed())
    }

    /// Snapshot as if `elapsed` time had passed since the run started.
    pub fn snapshot_at(&self, elapsed: Duration) -> ProgressSnapshot {
        let secs = elapsed.as_secs_f64();
        let throughput = if secs > 0.0 {
            self.completed as f64 / secs
        } else {
            0.0
        };

        let remaining = self.total.saturating_sub(self.completed);
        let eta = if throughput > 0.0 && throughput.is_finite() {
            Duration::from_secs_f64(remaining as f64 / throughput)
        } else {
            Duration::ZERO
        };

        ProgressSnapshot {
            completed: self.completed,
            failed: self.failed,
            total: self.total,
            elapsed,
            throughput,
            eta,
        }
    }
}

impl ProgressSnapshot {
    /// Completion in `[0, 1]`; an empty run counts as done.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            (self.completed as f64 / self.total as f64).min(1.0)
        }
    }

    /// `[=====-----] n/total ETA: 12s`
    pub fn render_bar(&self, width: usize) -> String {
        let filled = ((self.fraction() * width as f64).round() as usize).min(width);
        format!(
            "[{}{}] {}/{} ETA: {}",
            "=".repeat(filled),
            "-".repeat(width - filled),
            self.completed,
            self.total,
            format_eta(self.eta)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let mut tracker = ProgressTracker::new(3);
        tracker.record(true);
        tracker.record(false);
        let snap = tracker.snapshot();
        assert_eq!((snap.completed, snap.failed, snap.total), (2, 1, 3));
        assert!(snap.fraction() < 1.0);
        tracker.record(true);
        assert_eq!(tracker.snapshot().fraction(), 1.0);
    }

    #[test]
    fn test_throughput_and_eta() {
        let mut tracker = ProgressTracker::new(10);
        for _ in 0..4 {
            tracker.record(true);
        }
        let snap = tracker.snapshot_at(Duration::from_secs(2));
        assert!((snap.throughput - 2.0).abs() < 1e-9);
        assert_eq!(snap.eta, Duration::from_secs(3));
    }

    #[test]
    fn test_eta_is_zero_without_throughput() {
        let tracker = ProgressTracker::new(5);
        assert_eq!(tracker.snapshot_at(Duration::from_secs(10)).eta, Duration::ZERO);
        assert_eq!(tracker.snapshot_at(Duration::ZERO).eta, Duration::ZERO);
        assert_eq!(tracker.snapshot_at(Duration::ZERO).throughput, 0.0);
    }

    #[test]
    fn test_render_bar() {
        let mut tracker = ProgressTracker::new(4);
        tracker.record(true);
        tracker.record(true);
        let snap = tracker.snapshot_at(Duration::from_secs(4));
        assert_eq!(snap.render_bar(10), "[=====-----] 2/4 ETA: 4s");
    }

    #[test]
    fn test_empty_run_is_complete() {
        let tracker = ProgressTracker::new(0);
        let snap = tracker.snapshot_at(Duration::from_secs(1));
        assert_eq!(snap.fraction(), 1.0);
        assert_eq!(snap.render_bar(4), "[====] 0/0 ETA: 0s");
    }
}
