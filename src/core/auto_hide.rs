//! Debounced deadline used for overlay auto-hide and animation completion.
//!
//! Nothing runs in the background: the owner schedules a deadline and polls
//! it from its update loop. Re-scheduling restarts the countdown, so repeated
//! activity keeps pushing the deadline out. Dropping the owner drops the
//! deadline, which makes "fire after teardown" impossible.
//!
//! # Usage
//! ```ignore
//! // On overlay shown:
//! timer.schedule_at(now);
//!
//! // In update loop:
//! if timer.tick_at(now) {
//!     overlay.hide(true);
//! }
//! ```

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct DebouncedDeadline {
    /// Delay between scheduling and firing
    delay: Duration,
    /// Instant the pending deadline fires at
    pending: Option<Instant>,
}

impl Default for DebouncedDeadline {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(3000),
            pending: None,
        }
    }
}

impl DebouncedDeadline {
    /// Create with custom delay
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: None }
    }

    /// Schedule the deadline `delay` after `now`.
    /// If already pending, resets the timer (debounce behavior).
    pub fn schedule_at(&mut self, now: Instant) {
        self.pending = Some(now + self.delay);
        log::trace!("Deadline scheduled in {}ms", self.delay.as_millis());
    }

    /// Cancel any pending deadline
    pub fn cancel(&mut self) {
        if self.pending.take().is_some() {
            log::trace!("Deadline cancelled");
        }
    }

    /// Returns true exactly once when the deadline has passed.
    /// Clears the pending state when triggered.
    pub fn tick_at(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(fire_at) if now >= fire_at => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Check if there's a pending deadline
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_immediate_no_trigger() {
        let mut timer = DebouncedDeadline::new(Duration::from_millis(100));
        let now = Instant::now();

        timer.schedule_at(now);
        assert!(timer.is_pending());
        assert!(!timer.tick_at(now));
    }

    #[test]
    fn test_trigger_after_delay() {
        let mut timer = DebouncedDeadline::new(Duration::from_millis(10));
        let now = Instant::now();

        timer.schedule_at(now);
        assert!(timer.tick_at(now + Duration::from_millis(15)));
        assert!(!timer.is_pending());
        // Fires only once
        assert!(!timer.tick_at(now + Duration::from_millis(30)));
    }

    #[test]
    fn test_debounce_resets_timer() {
        let mut timer = DebouncedDeadline::new(Duration::from_millis(50));
        let now = Instant::now();

        timer.schedule_at(now);
        timer.schedule_at(now + Duration::from_millis(30));

        // Original deadline passed, but the timer was reset
        assert!(!timer.tick_at(now + Duration::from_millis(60)));
        assert!(timer.tick_at(now + Duration::from_millis(80)));
    }

    #[test]
    fn test_cancel() {
        let mut timer = DebouncedDeadline::new(Duration::from_millis(5));
        let now = Instant::now();
        timer.schedule_at(now);
        timer.cancel();
        assert!(!timer.tick_at(now + Duration::from_secs(1)));
        assert!(!timer.is_pending());
    }
}
