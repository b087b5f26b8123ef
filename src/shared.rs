//! Serialized access for hosts with more than one producer thread.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::annotation::AnnotationSession;
use crate::error::Result;
use crate::rotation::{RotationInterval, RotationOutcome};

/// Cloneable handle to one session behind a single lock.
///
/// `check_rotation` holds the lock from the elapsed-time decision through
/// write, clear and clock reset, so two producers cannot both flush the same window.
#[derive(Clone, Debug)]
pub struct SharedSession {
    inner: Arc<Mutex<AnnotationSession>>,
}

impl SharedSession {
    pub fn new(session: AnnotationSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AnnotationSession> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            log::warn!("annotation session lock poisoned, continuing with inner state");
            poisoned.into_inner()
        })
    }

    /// Run `f` with exclusive access to the session.
    pub fn with<R>(&self, f: impl FnOnce(&mut AnnotationSession) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn check_rotation(
        &self,
        output_dir: impl AsRef<Path>,
        interval: RotationInterval,
    ) -> Result<RotationOutcome> {
        self.lock().check_rotation_with(output_dir, interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::Local;
    use std::thread;

    #[test]
    fn concurrent_checks_flush_once() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(Local::now());
        let shared = SharedSession::new(AnnotationSession::with_clock(0, clock.clone()));
        shared.with(|s| s.add_frame(1)).unwrap();
        clock.advance_secs(5);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                let out = dir.path().to_path_buf();
                thread::spawn(move || {
                    shared
                        .check_rotation(&out, RotationInterval::new(0, 0, 2))
                        .unwrap()
                })
            })
            .collect();

        let flushed = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(RotationOutcome::is_flushed)
            .count();
        assert_eq!(flushed, 1);
        assert!(shared.with(|s| s.is_empty()));
    }
}
