//! Atomic lifecycle state shared by the tick loop and the control plane.
//!
//! [`ControlState`] is the scheduler's state machine: `Stopped` and
//! `Running`, with a stop signal that takes effect within one tick
//! period and an optional auto-stop after a configured number of ticks.
//! All fields are atomics (plus a [`Notify`] to cut the inter-tick
//! sleep short) so the tick loop never takes a lock on its hot path.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

/// Shared scheduler lifecycle state.
#[derive(Debug)]
pub struct ControlState {
    /// Whether the tick loop is currently running.
    running: AtomicBool,

    /// Whether a stop has been requested for the current run.
    stop_requested: AtomicBool,

    /// Ticks completed in the current run.
    ticks_completed: AtomicU64,

    /// Fixed tick period in milliseconds.
    tick_interval_ms: u64,

    /// Auto-stop after this many ticks (0 = unlimited).
    max_ticks: u64,

    /// Wakes the tick loop out of its inter-tick sleep on stop.
    stop_notify: Notify,
}

impl ControlState {
    /// Create control state from the configured tick period and
    /// auto-stop bound.
    pub const fn new(tick_interval_ms: u64, max_ticks: u64) -> Self {
        Self {
            running: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            ticks_completed: AtomicU64::new(0),
            tick_interval_ms,
            max_ticks,
            stop_notify: Notify::const_new(),
        }
    }

    /// Attempt the `Stopped -> Running` transition.
    ///
    /// Returns `false` (and changes nothing) if already running.
    /// On success the stop flag and tick counter are reset for the
    /// new run.
    pub fn try_begin_run(&self) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.stop_requested.store(false, Ordering::Release);
        self.ticks_completed.store(0, Ordering::Release);
        true
    }

    /// Mark the run finished (`Running -> Stopped`). Called by the tick
    /// loop as it exits, after any in-flight tick has completed.
    pub fn finish_run(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Request a stop and wake the tick loop.
    ///
    /// The loop exits after completing any in-flight tick; no new tick
    /// begins.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.stop_notify.notify_one();
    }

    /// Whether the tick loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Wait until a stop is signalled (used to race the inter-tick sleep).
    pub async fn stop_signalled(&self) {
        self.stop_notify.notified().await;
    }

    /// Record a completed tick and return the new count (1-based).
    pub fn record_tick(&self) -> u64 {
        self.ticks_completed
            .fetch_add(1, Ordering::AcqRel)
            .saturating_add(1)
    }

    /// Ticks completed in the current (or last) run.
    pub fn ticks_completed(&self) -> u64 {
        self.ticks_completed.load(Ordering::Acquire)
    }

    /// The fixed tick period in milliseconds.
    pub const fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms
    }

    /// The configured auto-stop bound (0 = unlimited).
    pub const fn max_ticks(&self) -> u64 {
        self.max_ticks
    }

    /// Whether the auto-stop bound has been reached.
    pub const fn tick_limit_reached(&self, ticks: u64) -> bool {
        self.max_ticks > 0 && ticks >= self.max_ticks
    }

    /// Snapshot the lifecycle state for the `check` endpoint.
    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            running: self.is_running(),
            ticks_completed: self.ticks_completed(),
            tick_interval_ms: self.tick_interval_ms,
            max_ticks: self.max_ticks,
        }
    }
}

/// JSON-serializable scheduler status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStatus {
    /// Whether the tick loop is running.
    pub running: bool,
    /// Ticks completed in the current (or last) run.
    pub ticks_completed: u64,
    /// Tick period in milliseconds.
    pub tick_interval_ms: u64,
    /// Auto-stop bound (0 = unlimited).
    pub max_ticks: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_stopped() {
        let control = ControlState::new(1000, 0);
        assert!(!control.is_running());
        assert!(!control.is_stop_requested());
        assert_eq!(control.ticks_completed(), 0);
    }

    #[test]
    fn begin_run_is_exclusive() {
        let control = ControlState::new(1000, 0);
        assert!(control.try_begin_run());
        assert!(control.is_running());
        // Second start while running is rejected.
        assert!(!control.try_begin_run());

        control.finish_run();
        assert!(!control.is_running());
        assert!(control.try_begin_run());
    }

    #[test]
    fn begin_run_resets_previous_run() {
        let control = ControlState::new(1000, 0);
        assert!(control.try_begin_run());
        let _ = control.record_tick();
        control.request_stop();
        control.finish_run();

        assert!(control.try_begin_run());
        assert!(!control.is_stop_requested());
        assert_eq!(control.ticks_completed(), 0);
    }

    #[test]
    fn record_tick_counts_from_one() {
        let control = ControlState::new(1000, 0);
        assert_eq!(control.record_tick(), 1);
        assert_eq!(control.record_tick(), 2);
        assert_eq!(control.ticks_completed(), 2);
    }

    #[test]
    fn zero_max_ticks_means_unlimited() {
        let control = ControlState::new(1000, 0);
        assert!(!control.tick_limit_reached(1_000_000));
    }

    #[test]
    fn tick_limit_reached_at_bound() {
        let control = ControlState::new(1000, 100);
        assert!(!control.tick_limit_reached(99));
        assert!(control.tick_limit_reached(100));
        assert!(control.tick_limit_reached(101));
    }

    #[test]
    fn status_reflects_state() {
        let control = ControlState::new(250, 10);
        let _ = control.try_begin_run();
        let _ = control.record_tick();

        let status = control.status();
        assert!(status.running);
        assert_eq!(status.ticks_completed, 1);
        assert_eq!(status.tick_interval_ms, 250);
        assert_eq!(status.max_ticks, 10);
    }
}
