//! Session buffer and the entity hierarchy it owns.
//!
//! - `AnnotationSession`: frames keyed by id, label quota, video metadata, window start
//! - `Frame` → `Bbox` → `Label`: each level exclusively owned by its parent

mod entities;
mod session;

pub use entities::{Bbox, BboxId, Frame, FrameId, Geometry, Label, VideoDetails};
pub use session::{AnnotationSession, DEFAULT_TOP_K_LABELS};
