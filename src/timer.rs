use std::time::{Duration, Instant};

/// A re-armable deadline, polled by whoever owns the clock.
#[derive(Debug, Clone)]
pub struct Timer {
    interval: Duration,
    deadline: Option<Instant>,
}

impl Timer {
    pub fn new(interval: Duration) -> Self {
        Timer {
            interval,
            deadline: None,
        }
    }

    /// Clear any pending deadline and fire again one interval after `now`.
    /// An interval too long for the clock leaves the timer disarmed.
    pub fn rearm(&mut self, now: Instant) {
        self.deadline = now.checked_add(self.interval);
    }

    /// Arm only if not already armed. Returns false when it was a no-op.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.deadline.is_some() {
            return false;
        }
        self.rearm(now);
        true
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }

    /// For repeating timers: if due, re-arm from `now` and return true.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        if self.is_due(now) {
            self.rearm(now);
            true
        } else {
            false
        }
    }
}
