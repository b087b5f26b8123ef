//! Wall-clock rotation of the session buffer.
//!
//! The host calls `check_rotation` once per processed frame. While the window
//! is young the call is a timestamp subtraction and nothing else. Once the
//! elapsed whole seconds strictly exceed the clamped interval, the window is
//! `Flushing`: the validated tree is written to `<window start>.json`, then
//! the frames are cleared and the window restarts.
//!
//! Writing happens on a shared borrow and only a written file is committed
//! back into the session, so a failed flush (incomplete labels, I/O, a file
//! already holding that window name) leaves frames and window start
//! untouched and the next check retries against the same baseline.

use std::fs;
use std::path::{Path, PathBuf};

use crate::annotation::AnnotationSession;
use crate::error::{AnnotationError, Result};
use crate::output::write_atomic_new;

pub const MAX_ROTATION_HOURS: u32 = 3;
pub const MAX_ROTATION_MINUTES: u32 = 59;
pub const MAX_ROTATION_SECONDS: u32 = 59;

pub const DEFAULT_OUTPUT_DIR: &str = "jsons";

/// Sortable file stem derived from the window start.
pub const OUTPUT_NAME_FORMAT: &str = "%Y-%m-%d %H-%M-%S";

/// Requested rotation interval. Each component is capped before summing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RotationInterval {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl Default for RotationInterval {
    fn default() -> Self {
        Self::new(0, 0, 60)
    }
}

impl RotationInterval {
    pub const fn new(hours: u32, minutes: u32, seconds: u32) -> Self {
        Self {
            hours,
            minutes,
            seconds,
        }
    }

    /// Split a plain number of seconds into h/m/s before clamping.
    pub fn from_secs(total: u64) -> Self {
        let hours = u32::try_from(total / 3600).unwrap_or(u32::MAX);
        Self {
            hours,
            minutes: ((total % 3600) / 60) as u32,
            seconds: (total % 60) as u32,
        }
    }

    pub fn clamped(self) -> Self {
        Self {
            hours: self.hours.min(MAX_ROTATION_HOURS),
            minutes: self.minutes.min(MAX_ROTATION_MINUTES),
            seconds: self.seconds.min(MAX_ROTATION_SECONDS),
        }
    }

    /// Threshold in seconds after clamping.
    pub fn threshold_secs(self) -> i64 {
        let c = self.clamped();
        i64::from(c.hours) * 3600 + i64::from(c.minutes) * 60 + i64::from(c.seconds)
    }
}

/// Where the current window stands for a given interval.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RotationState {
    #[default]
    Accumulating,
    Flushing,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RotationOutcome {
    Idle,
    Flushed { path: PathBuf, frames: usize },
}

impl RotationOutcome {
    pub fn is_flushed(&self) -> bool {
        matches!(self, RotationOutcome::Flushed { .. })
    }
}

/// A window written to disk, waiting to be cleared from the session.
struct WrittenWindow {
    path: PathBuf,
    frames: usize,
}

impl AnnotationSession {
    /// Whole seconds since the window started. Negative if the clock stepped back.
    pub fn elapsed_secs(&self) -> i64 {
        (self.now() - self.started_at()).num_seconds()
    }

    /// Path the current window would be written to under `output_dir`.
    pub fn window_file(&self, output_dir: &Path) -> PathBuf {
        let stem = self.started_at().format(OUTPUT_NAME_FORMAT);
        output_dir.join(format!("{stem}.json"))
    }

    pub fn check_rotation(
        &mut self,
        output_dir: impl AsRef<Path>,
        hours: u32,
        minutes: u32,
        seconds: u32,
    ) -> Result<RotationOutcome> {
        self.check_rotation_with(output_dir, RotationInterval::new(hours, minutes, seconds))
    }

    pub fn rotation_state(&self, interval: RotationInterval) -> RotationState {
        if self.elapsed_secs() > interval.threshold_secs() {
            RotationState::Flushing
        } else {
            RotationState::Accumulating
        }
    }

    pub fn check_rotation_with(
        &mut self,
        output_dir: impl AsRef<Path>,
        interval: RotationInterval,
    ) -> Result<RotationOutcome> {
        match self.rotation_state(interval) {
            RotationState::Accumulating => Ok(RotationOutcome::Idle),
            RotationState::Flushing => self.flush(output_dir),
        }
    }

    /// Run one flush cycle now, regardless of the elapsed time.
    ///
    /// Refuses to overwrite an existing window file: two windows starting in
    /// the same second (forced flushes, a clock stepping back, a DST fall-back)
    /// fail with `ErrorKind::AlreadyExists` and keep the buffer.
    pub fn flush(&mut self, output_dir: impl AsRef<Path>) -> Result<RotationOutcome> {
        let output_dir = output_dir.as_ref();
        match self.write_window(output_dir) {
            Ok(written) => {
                log::info!("flushed {} frames to {}", written.frames, written.path.display());
                Ok(self.commit(written))
            }
            Err(err) => {
                log::warn!(
                    "flush to {} failed, buffer kept ({} frames): {}",
                    output_dir.display(),
                    self.frame_count(),
                    err
                );
                Err(err)
            }
        }
    }

    fn write_window(&self, output_dir: &Path) -> Result<WrittenWindow> {
        let path = self.window_file(output_dir);
        fs::create_dir_all(output_dir).map_err(|e| AnnotationError::io(output_dir, e))?;
        let document = self.build_output()?;
        let encoded = serde_json::to_vec(&document)?;
        write_atomic_new(&path, &encoded)?;
        Ok(WrittenWindow {
            path,
            frames: self.frame_count(),
        })
    }

    fn commit(&mut self, written: WrittenWindow) -> RotationOutcome {
        self.clear();
        self.reset_start();
        RotationOutcome::Flushed {
            path: written.path,
            frames: written.frames,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use chrono::{Local, TimeZone};

    fn session_at(clock: &ManualClock) -> AnnotationSession {
        AnnotationSession::with_clock(0, clock.clone())
    }

    #[test]
    fn interval_is_clamped_per_component() {
        assert_eq!(
            RotationInterval::new(100, 0, 0).threshold_secs(),
            RotationInterval::new(3, 0, 0).threshold_secs()
        );
        assert_eq!(RotationInterval::new(0, 75, 90).threshold_secs(), 59 * 60 + 59);
        assert_eq!(RotationInterval::default().threshold_secs(), 59);
    }

    #[test]
    fn interval_from_secs_splits_components() {
        assert_eq!(RotationInterval::from_secs(3725), RotationInterval::new(1, 2, 5));
        assert_eq!(RotationInterval::from_secs(2), RotationInterval::new(0, 0, 2));
    }

    #[test]
    fn window_file_uses_start_timestamp() {
        let start = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let clock = ManualClock::new(start);
        let session = session_at(&clock);
        clock.advance_secs(600);

        assert_eq!(
            session.window_file(Path::new("out")),
            Path::new("out").join("2024-03-09 14-05-07.json")
        );
    }

    #[test]
    fn no_flush_until_threshold_strictly_exceeded() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(Local::now());
        let mut session = session_at(&clock);
        session.add_frame(0).unwrap();

        clock.advance_secs(2);
        let outcome = session.check_rotation(dir.path(), 0, 0, 2).unwrap();
        assert_eq!(outcome, RotationOutcome::Idle);
        assert_eq!(session.frame_count(), 1);

        clock.advance_secs(1);
        assert!(session.check_rotation(dir.path(), 0, 0, 2).unwrap().is_flushed());
        assert!(session.is_empty());
        assert_eq!(
            session.rotation_state(RotationInterval::new(0, 0, 2)),
            RotationState::Accumulating
        );
    }

    #[test]
    fn backwards_clock_never_flushes() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(Local::now());
        let mut session = session_at(&clock);
        clock.advance_secs(-30);
        assert_eq!(
            session.check_rotation(dir.path(), 0, 0, 0).unwrap(),
            RotationOutcome::Idle
        );
    }

    #[test]
    fn failed_flush_keeps_buffer_and_window() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(Local::now());
        let mut session = AnnotationSession::with_clock(1, clock.clone());
        let started = session.started_at();
        session.add_frame(0).unwrap();
        session.add_bbox_to_frame(0, 0, 0, 0, 4, 4).unwrap();

        clock.advance_secs(10);
        let err = session.check_rotation(dir.path(), 0, 0, 5).unwrap_err();
        assert!(matches!(err, AnnotationError::IncompleteLabels { .. }));
        assert_eq!(session.frame_count(), 1);
        assert_eq!(session.started_at(), started);
        assert_eq!(
            session.rotation_state(RotationInterval::new(0, 0, 5)),
            RotationState::Flushing
        );
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);

        // Topping up the label lets the very next check succeed.
        session.add_label_to_bbox(0, 0, "person", 0.9).unwrap();
        assert!(session.check_rotation(dir.path(), 0, 0, 5).unwrap().is_flushed());
        assert!(session.is_empty());
    }

    #[test]
    fn flush_creates_missing_directory_and_resets_window() {
        let root = tempfile::tempdir().unwrap();
        let out = root.path().join("nested").join("jsons");
        let clock = ManualClock::new(Local::now());
        let mut session = session_at(&clock);
        session.add_frame(1).unwrap();
        clock.advance_secs(4);

        let outcome = session.flush(&out).unwrap();
        let RotationOutcome::Flushed { path, frames } = outcome else {
            panic!("expected a flush");
        };
        assert_eq!(frames, 1);
        assert!(path.exists());
        assert_eq!(session.started_at(), clock.now());
        assert_eq!(session.elapsed_secs(), 0);
    }

    #[test]
    fn state_turns_flushing_only_past_threshold() {
        let clock = ManualClock::new(Local::now());
        let session = session_at(&clock);
        let interval = RotationInterval::new(0, 1, 0);

        clock.advance_secs(60);
        assert_eq!(session.rotation_state(interval), RotationState::Accumulating);
        clock.advance_secs(1);
        assert_eq!(session.rotation_state(interval), RotationState::Flushing);
    }

    #[test]
    fn same_second_flush_keeps_second_window() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let mut session = session_at(&clock);

        session.add_frame(1).unwrap();
        let first = session.flush(dir.path()).unwrap();
        assert!(first.is_flushed());

        session.add_frame(2).unwrap();
        let err = session.flush(dir.path()).unwrap_err();
        let AnnotationError::Io { source, .. } = err else {
            panic!("expected an i/o error");
        };
        assert_eq!(source.kind(), std::io::ErrorKind::AlreadyExists);
        assert!(session.frame_exists(2));

        let path = dir.path().join("2024-01-01 00-00-00.json");
        let written: crate::output::AnnotationDocument =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written.frames[0].frame_id, 1);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);

        // Once the clock moves on, the kept window gets its own file.
        clock.advance_secs(1);
        session.reset_start();
        assert!(session.flush(dir.path()).unwrap().is_flushed());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }
}
