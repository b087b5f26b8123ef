//! Detection annotator
//!
//! Accumulates per-frame detections (frames, bounding boxes, top-k labels)
//! into a validated, nested record and rotates it to JSON files on a
//! wall-clock schedule.
//!
//! # Flow
//!
//! Once per processed frame the host:
//!
//! 1. records the frame, its boxes and their labels on an `AnnotationSession`
//! 2. calls `check_rotation`, which either returns immediately or writes the
//!    window to `<window start>.json`, clears the buffer and restarts the window
//!
//! Every box must carry exactly the current label quota before anything is
//! written. A flush that fails validation or I/O leaves the buffer intact.
//!
//! # Module Structure
//!
//! - `annotation`: session buffer and the Frame → Bbox → Label hierarchy
//! - `output`: validation pass and serializable output tree
//! - `rotation`: interval clamping and the accumulate/flush cycle
//! - `shared`: single-lock wrapper for multi-threaded producers
//! - `detect`: detector backend seam and a seeded synthetic backend
//! - `config`: file + environment configuration for host binaries

pub mod annotation;
pub mod clock;
pub mod config;
pub mod detect;
pub mod error;
pub mod output;
pub mod rotation;
pub mod shared;

pub use annotation::{
    AnnotationSession, Bbox, BboxId, Frame, FrameId, Geometry, Label, VideoDetails,
    DEFAULT_TOP_K_LABELS,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AnnotatorConfig;
pub use detect::{DetectorBackend, FrameDetection, SyntheticBackend};
pub use error::{AnnotationError, Result};
pub use output::{AnnotationDocument, BboxRecord, FrameRecord, LabelRecord, VideoDetailsRecord};
pub use rotation::{
    RotationInterval, RotationOutcome, RotationState, DEFAULT_OUTPUT_DIR, MAX_ROTATION_HOURS,
    MAX_ROTATION_MINUTES, MAX_ROTATION_SECONDS, OUTPUT_NAME_FORMAT,
};
pub use shared::SharedSession;
