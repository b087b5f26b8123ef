use anyhow::Result;

use crate::detect::FrameDetection;

/// Detector backend feeding the annotation session.
///
/// Inference, non-maximum suppression and drawing happen behind this trait.
/// The session only sees the resulting boxes and labels.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Detect objects in the next frame, returning at most `top_k` labels per box.
    fn detect(&mut self, frame_id: i64, top_k: usize) -> Result<Vec<FrameDetection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
