use std::path::PathBuf;

use crate::annotation::{BboxId, FrameId};

/// Precondition failures raised by the session buffer and the flush path.
///
/// None of these are retried internally. The caller decides whether to skip
/// the detection, top up labels, or surface the failure.
#[derive(Debug, thiserror::Error)]
pub enum AnnotationError {
    #[error("frame id {frame_id} already exists")]
    DuplicateFrame { frame_id: FrameId },

    #[error("frame {frame_id} already contains bbox {bbox_id}")]
    DuplicateBbox { frame_id: FrameId, bbox_id: BboxId },

    #[error("frame {frame_id} does not exist")]
    UnknownFrame { frame_id: FrameId },

    #[error("frame {frame_id} does not contain bbox {bbox_id}")]
    UnknownBbox { frame_id: FrameId, bbox_id: BboxId },

    #[error("labels of frame {frame_id}, bbox {bbox_id} are full (quota {quota})")]
    LabelQuotaExceeded {
        frame_id: FrameId,
        bbox_id: BboxId,
        quota: usize,
    },

    #[error(
        "labels of frame {frame_id}, bbox {bbox_id} are incomplete before output: {actual} of {expected}"
    )]
    IncompleteLabels {
        frame_id: FrameId,
        bbox_id: BboxId,
        expected: usize,
        actual: usize,
    },

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("i/o failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl AnnotationError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AnnotationError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnnotationError>;
