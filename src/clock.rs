//! Wall-clock source for the rotation window.

use chrono::{DateTime, Local, TimeDelta};
use std::sync::{Arc, Mutex};

/// Source of "now" for the session buffer.
pub trait Clock: Send + std::fmt::Debug {
    fn now(&self) -> DateTime<Local>;
}

/// Local wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Manually advanced clock. Clones share the same instant, so a test can keep
/// one handle while the session owns another.
#[derive(Clone, Debug)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Local>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Local>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += delta;
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance(TimeDelta::seconds(secs));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_handles_share_time() {
        let start = Local::now();
        let clock = ManualClock::new(start);
        let handle = clock.clone();

        handle.advance_secs(5);
        assert_eq!((clock.now() - start).num_seconds(), 5);
    }
}
