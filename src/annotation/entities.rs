use serde_json::Value;

use crate::error::{AnnotationError, Result};

pub type FrameId = i64;
pub type BboxId = i64;

/// One (category, confidence) pair attached to a bounding box.
#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    category: String,
    confidence: f64,
}

impl Label {
    pub fn new(category: impl Into<String>, confidence: f64) -> Self {
        Self {
            category: category.into(),
            confidence,
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }
}

/// Pixel geometry of a box: top, left, width, height.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Geometry {
    pub top: i32,
    pub left: i32,
    pub width: i32,
    pub height: i32,
}

impl From<(i32, i32, i32, i32)> for Geometry {
    fn from((top, left, width, height): (i32, i32, i32, i32)) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }
}

const GEOMETRY_FIELDS: [&str; 4] = ["top", "left", "width", "height"];

impl Geometry {
    /// Parse the keyed form `{"top": .., "left": .., "width": .., "height": ..}`.
    ///
    /// All four fields must be present and fit in `i32`. Extra keys are ignored.
    pub fn from_keyed(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| AnnotationError::InvalidGeometry("must be a JSON object".into()))?;
        let mut parsed = [0i32; 4];
        for (slot, key) in parsed.iter_mut().zip(GEOMETRY_FIELDS) {
            let raw = obj
                .get(key)
                .ok_or_else(|| AnnotationError::InvalidGeometry(format!("{key} is required")))?
                .as_i64()
                .ok_or_else(|| {
                    AnnotationError::InvalidGeometry(format!("{key} must be an integer"))
                })?;
            *slot = i32::try_from(raw)
                .map_err(|_| AnnotationError::InvalidGeometry(format!("{key} out of range")))?;
        }
        let [top, left, width, height] = parsed;
        Ok(Self {
            top,
            left,
            width,
            height,
        })
    }
}

/// One detected region in one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Bbox {
    bbox_id: BboxId,
    geometry: Geometry,
    labels: Vec<Label>,
}

impl Bbox {
    pub fn new(bbox_id: BboxId, geometry: Geometry) -> Self {
        Self {
            bbox_id,
            geometry,
            labels: Vec::new(),
        }
    }

    pub fn bbox_id(&self) -> BboxId {
        self.bbox_id
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Labels in insertion order.
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// True when the box carries exactly `quota` labels.
    pub fn labels_full(&self, quota: usize) -> bool {
        self.labels.len() == quota
    }

    pub fn set_geometry_tuple(&mut self, values: (i32, i32, i32, i32)) {
        self.geometry = values.into();
    }

    /// Replace the geometry from its keyed form. On error the old geometry stays.
    pub fn set_geometry_keyed(&mut self, values: &Value) -> Result<()> {
        self.geometry = Geometry::from_keyed(values)?;
        Ok(())
    }

    // Quota enforcement lives in the session, which knows the current quota.
    pub(crate) fn push_label(&mut self, label: Label) {
        self.labels.push(label);
    }
}

/// One processed video frame with its boxes in insertion order.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    frame_id: FrameId,
    bboxes: Vec<Bbox>,
}

impl Frame {
    pub fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            bboxes: Vec::new(),
        }
    }

    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    pub fn bboxes(&self) -> &[Bbox] {
        &self.bboxes
    }

    pub fn contains_bbox(&self, bbox_id: BboxId) -> bool {
        self.bboxes.iter().any(|bbox| bbox.bbox_id == bbox_id)
    }

    pub fn bbox(&self, bbox_id: BboxId) -> Option<&Bbox> {
        self.bboxes.iter().find(|bbox| bbox.bbox_id == bbox_id)
    }

    pub fn bbox_mut(&mut self, bbox_id: BboxId) -> Option<&mut Bbox> {
        self.bboxes.iter_mut().find(|bbox| bbox.bbox_id == bbox_id)
    }

    pub fn add_bbox(&mut self, bbox_id: BboxId, geometry: Geometry) -> Result<()> {
        if self.contains_bbox(bbox_id) {
            return Err(AnnotationError::DuplicateBbox {
                frame_id: self.frame_id,
                bbox_id,
            });
        }
        self.bboxes.push(Bbox::new(bbox_id, geometry));
        Ok(())
    }
}

/// Session-level video metadata. Every field starts unset.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VideoDetails {
    pub frame_width: Option<u32>,
    pub frame_height: Option<u32>,
    pub frame_rate: Option<f64>,
    pub video_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn frame_rejects_duplicate_bbox() {
        let mut frame = Frame::new(4);
        frame.add_bbox(1, (10, 20, 30, 40).into()).unwrap();

        let err = frame.add_bbox(1, Geometry::default()).unwrap_err();
        assert!(matches!(
            err,
            AnnotationError::DuplicateBbox {
                frame_id: 4,
                bbox_id: 1
            }
        ));
        assert_eq!(frame.bboxes().len(), 1);
        assert_eq!(frame.bboxes()[0].geometry().width, 30);
    }

    #[test]
    fn bbox_geometry_tuple_and_keyed_forms_agree() {
        let mut a = Bbox::new(0, Geometry::default());
        let mut b = Bbox::new(0, Geometry::default());
        a.set_geometry_tuple((1, 5, 200, 100));
        b.set_geometry_keyed(&json!({"top": 1, "left": 5, "width": 200, "height": 100}))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn keyed_geometry_missing_field_leaves_box_untouched() {
        let mut bbox = Bbox::new(0, (1, 2, 3, 4).into());
        let err = bbox
            .set_geometry_keyed(&json!({"top": 9, "left": 9, "width": 9}))
            .unwrap_err();
        assert!(format!("{err}").contains("height is required"));
        assert_eq!(bbox.geometry(), Geometry::from((1, 2, 3, 4)));
    }

    #[test]
    fn keyed_geometry_rejects_non_integer() {
        let err = Geometry::from_keyed(&json!({
            "top": 1, "left": "2", "width": 3, "height": 4
        }))
        .unwrap_err();
        assert!(format!("{err}").contains("left must be an integer"));
    }

    #[test]
    fn labels_full_is_exact() {
        let mut bbox = Bbox::new(0, Geometry::default());
        assert!(bbox.labels_full(0));
        bbox.push_label(Label::new("car", 0.9));
        assert!(bbox.labels_full(1));
        assert!(!bbox.labels_full(2));
    }
}
