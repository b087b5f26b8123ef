//! Validation pass and output tree.
//!
//! `build_output` is the only externalization entry point: it walks every
//! box, refuses to produce anything while a box is short of (or over) the
//! current label quota, and otherwise builds the ordered record tree.

use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::annotation::{AnnotationSession, Bbox, BboxId, Frame, FrameId, Label, VideoDetails};
use crate::error::{AnnotationError, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnnotationDocument {
    pub video_details: VideoDetailsRecord,
    pub frames: Vec<FrameRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VideoDetailsRecord {
    pub frame_width: Option<u32>,
    pub frame_height: Option<u32>,
    pub frame_rate: Option<f64>,
    pub video_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub frame_id: FrameId,
    pub bboxes: Vec<BboxRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BboxRecord {
    pub bbox_id: BboxId,
    pub top: i32,
    pub left: i32,
    pub width: i32,
    pub height: i32,
    pub labels: Vec<LabelRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabelRecord {
    pub category: String,
    pub confidence: f64,
}

impl From<&VideoDetails> for VideoDetailsRecord {
    fn from(details: &VideoDetails) -> Self {
        Self {
            frame_width: details.frame_width,
            frame_height: details.frame_height,
            frame_rate: details.frame_rate,
            video_name: details.video_name.clone(),
        }
    }
}

impl From<&Label> for LabelRecord {
    fn from(label: &Label) -> Self {
        Self {
            category: label.category().to_string(),
            confidence: label.confidence(),
        }
    }
}

impl From<&Bbox> for BboxRecord {
    fn from(bbox: &Bbox) -> Self {
        let g = bbox.geometry();
        Self {
            bbox_id: bbox.bbox_id(),
            top: g.top,
            left: g.left,
            width: g.width,
            height: g.height,
            labels: bbox.labels().iter().map(LabelRecord::from).collect(),
        }
    }
}

impl From<&Frame> for FrameRecord {
    fn from(frame: &Frame) -> Self {
        Self {
            frame_id: frame.frame_id(),
            bboxes: frame.bboxes().iter().map(BboxRecord::from).collect(),
        }
    }
}

impl AnnotationSession {
    /// Check every box against the current quota.
    pub fn validate(&self) -> Result<()> {
        let expected = self.label_quota();
        for frame in self.frames() {
            for bbox in frame.bboxes() {
                if !bbox.labels_full(expected) {
                    return Err(AnnotationError::IncompleteLabels {
                        frame_id: frame.frame_id(),
                        bbox_id: bbox.bbox_id(),
                        expected,
                        actual: bbox.labels().len(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Validate, then build the output tree. Does not touch the buffer.
    pub fn build_output(&self) -> Result<AnnotationDocument> {
        self.validate()?;
        Ok(AnnotationDocument {
            video_details: self.video_details().into(),
            frames: self.frames().iter().map(FrameRecord::from).collect(),
        })
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.build_output()?)?)
    }

    /// Write the validated tree to `path`, adding a `.json` extension when missing.
    /// The parent directory must already exist.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = with_json_extension(path.as_ref());
        let encoded = self.to_json_string()?;
        write_atomic(&path, encoded.as_bytes())?;
        Ok(path)
    }
}

fn with_json_extension(path: &Path) -> PathBuf {
    match path.extension() {
        Some(ext) if ext == "json" => path.to_path_buf(),
        _ => {
            let mut raw = path.as_os_str().to_owned();
            raw.push(".json");
            PathBuf::from(raw)
        }
    }
}

/// Write through a sibling temp file and rename, so readers never see a partial file.
/// An existing file at `path` is replaced.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let tmp_path = write_temp(path, data)?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(AnnotationError::io(path, e));
    }
    Ok(())
}

/// Like `write_atomic`, but fails with `ErrorKind::AlreadyExists` instead of
/// replacing an existing file. The temp file is linked into place, never renamed over.
pub(crate) fn write_atomic_new(path: &Path, data: &[u8]) -> Result<()> {
    let tmp_path = write_temp(path, data)?;
    let linked = fs::hard_link(&tmp_path, path);
    let _ = fs::remove_file(&tmp_path);
    linked.map_err(|e| AnnotationError::io(path, e))
}

/// Create a fresh sibling temp file holding `data`. A leftover temp file is
/// never reused, and a failed write removes what it created.
fn write_temp(path: &Path, data: &[u8]) -> Result<PathBuf> {
    let tmp_path = path.with_extension(format!("{}.tmp", std::process::id()));
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp_path)
        .map_err(|e| AnnotationError::io(&tmp_path, e))?;
    if let Err(e) = file.write_all(data).and_then(|()| file.sync_all()) {
        let _ = fs::remove_file(&tmp_path);
        return Err(AnnotationError::io(&tmp_path, e));
    }
    Ok(tmp_path)
}
