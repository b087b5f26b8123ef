use crate::annotation::{BboxId, Geometry, Label};

/// One box reported by an external detector for a single frame,
/// with its top-k labels in descending confidence.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameDetection {
    pub bbox_id: BboxId,
    pub geometry: Geometry,
    pub labels: Vec<Label>,
}
