use chrono::{DateTime, Local};
use std::collections::{HashMap, HashSet};

use crate::annotation::entities::{Bbox, BboxId, Frame, FrameId, Geometry, Label, VideoDetails};
use crate::clock::{Clock, SystemClock};
use crate::detect::FrameDetection;
use crate::error::{AnnotationError, Result};

/// Quota used when none is given, matching a detector that reports its top class only.
pub const DEFAULT_TOP_K_LABELS: usize = 1;

/// In-memory accumulation of frames, boxes and labels since the last flush.
///
/// The session exclusively owns every frame, each frame owns its boxes and
/// each box owns its labels. Frames are kept in insertion order; the index
/// maps a frame id to its position.
#[derive(Debug)]
pub struct AnnotationSession {
    frames: Vec<Frame>,
    index: HashMap<FrameId, usize>,
    top_k_labels: usize,
    video_details: VideoDetails,
    started_at: DateTime<Local>,
    clock: Box<dyn Clock>,
}

impl Default for AnnotationSession {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_K_LABELS)
    }
}

impl AnnotationSession {
    pub fn new(top_k_labels: usize) -> Self {
        Self::with_clock(top_k_labels, SystemClock)
    }

    pub fn with_clock(top_k_labels: usize, clock: impl Clock + 'static) -> Self {
        let clock: Box<dyn Clock> = Box::new(clock);
        let started_at = clock.now();
        Self {
            frames: Vec::new(),
            index: HashMap::new(),
            top_k_labels,
            video_details: VideoDetails::default(),
            started_at,
            clock,
        }
    }

    // -------------------- Quota & metadata --------------------

    pub fn label_quota(&self) -> usize {
        self.top_k_labels
    }

    /// Replace the quota for subsequent label insertions and output checks.
    /// Existing boxes are not re-validated here.
    pub fn set_label_quota(&mut self, value: usize) {
        self.top_k_labels = value;
    }

    pub fn set_video_metadata(
        &mut self,
        frame_width: u32,
        frame_height: u32,
        frame_rate: f64,
        video_name: impl Into<String>,
    ) {
        self.video_details = VideoDetails {
            frame_width: Some(frame_width),
            frame_height: Some(frame_height),
            frame_rate: Some(frame_rate),
            video_name: Some(video_name.into()),
        };
    }

    pub fn video_details(&self) -> &VideoDetails {
        &self.video_details
    }

    // -------------------- Clock --------------------

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    /// Restart the rotation window at the current time.
    pub fn reset_start(&mut self) {
        self.started_at = self.clock.now();
    }

    pub(crate) fn now(&self) -> DateTime<Local> {
        self.clock.now()
    }

    // -------------------- Lookups --------------------

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frame_exists(&self, frame_id: FrameId) -> bool {
        self.index.contains_key(&frame_id)
    }

    pub fn frame(&self, frame_id: FrameId) -> Option<&Frame> {
        self.index.get(&frame_id).map(|&pos| &self.frames[pos])
    }

    fn frame_mut(&mut self, frame_id: FrameId) -> Result<&mut Frame> {
        match self.index.get(&frame_id) {
            Some(&pos) => Ok(&mut self.frames[pos]),
            None => Err(AnnotationError::UnknownFrame { frame_id }),
        }
    }

    pub fn bbox_exists(&self, frame_id: FrameId, bbox_id: BboxId) -> bool {
        self.frame(frame_id)
            .is_some_and(|frame| frame.contains_bbox(bbox_id))
    }

    pub fn find_bbox(&self, frame_id: FrameId, bbox_id: BboxId) -> Result<&Bbox> {
        self.frame(frame_id)
            .ok_or(AnnotationError::UnknownFrame { frame_id })?
            .bbox(bbox_id)
            .ok_or(AnnotationError::UnknownBbox { frame_id, bbox_id })
    }

    /// Mutable access to a box, e.g. to replace its geometry.
    pub fn find_bbox_mut(&mut self, frame_id: FrameId, bbox_id: BboxId) -> Result<&mut Bbox> {
        self.frame_mut(frame_id)?
            .bbox_mut(bbox_id)
            .ok_or(AnnotationError::UnknownBbox { frame_id, bbox_id })
    }

    // -------------------- Mutators --------------------

    pub fn add_frame(&mut self, frame_id: FrameId) -> Result<()> {
        if self.frame_exists(frame_id) {
            return Err(AnnotationError::DuplicateFrame { frame_id });
        }
        self.index.insert(frame_id, self.frames.len());
        self.frames.push(Frame::new(frame_id));
        Ok(())
    }

    pub fn add_bbox_to_frame(
        &mut self,
        frame_id: FrameId,
        bbox_id: BboxId,
        top: i32,
        left: i32,
        width: i32,
        height: i32,
    ) -> Result<()> {
        self.frame_mut(frame_id)?
            .add_bbox(bbox_id, Geometry::from((top, left, width, height)))
    }

    /// Append a label to a box. Fails once the box holds the current quota.
    pub fn add_label_to_bbox(
        &mut self,
        frame_id: FrameId,
        bbox_id: BboxId,
        category: impl Into<String>,
        confidence: f64,
    ) -> Result<()> {
        let quota = self.top_k_labels;
        let bbox = self.find_bbox_mut(frame_id, bbox_id)?;
        if bbox.labels().len() >= quota {
            return Err(AnnotationError::LabelQuotaExceeded {
                frame_id,
                bbox_id,
                quota,
            });
        }
        bbox.push_label(Label::new(category, confidence));
        Ok(())
    }

    /// Record one processed frame with all of its detections.
    ///
    /// The batch is checked up front, so a rejected batch leaves the buffer as it was.
    pub fn ingest_detections(
        &mut self,
        frame_id: FrameId,
        detections: &[FrameDetection],
    ) -> Result<()> {
        if self.frame_exists(frame_id) {
            return Err(AnnotationError::DuplicateFrame { frame_id });
        }
        let mut seen = HashSet::with_capacity(detections.len());
        for det in detections {
            if !seen.insert(det.bbox_id) {
                return Err(AnnotationError::DuplicateBbox {
                    frame_id,
                    bbox_id: det.bbox_id,
                });
            }
            if det.labels.len() > self.top_k_labels {
                return Err(AnnotationError::LabelQuotaExceeded {
                    frame_id,
                    bbox_id: det.bbox_id,
                    quota: self.top_k_labels,
                });
            }
        }

        self.add_frame(frame_id)?;
        let frame = self.frame_mut(frame_id)?;
        for det in detections {
            frame.add_bbox(det.bbox_id, det.geometry)?;
            if let Some(bbox) = frame.bbox_mut(det.bbox_id) {
                for label in &det.labels {
                    bbox.push_label(label.clone());
                }
            }
        }
        log::debug!(
            "ingested frame {} with {} detections",
            frame_id,
            detections.len()
        );
        Ok(())
    }

    /// Drop every frame. Metadata, quota and the window start are kept.
    pub fn clear(&mut self) {
        self.frames.clear();
        self.index.clear();
    }
}
