use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::annotation::DEFAULT_TOP_K_LABELS;
use crate::rotation::{RotationInterval, DEFAULT_OUTPUT_DIR};

#[derive(Debug, Deserialize, Default)]
struct AnnotatorConfigFile {
    output_dir: Option<PathBuf>,
    top_k_labels: Option<usize>,
    video_name: Option<String>,
    rotation: Option<RotationConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct RotationConfigFile {
    hours: Option<u32>,
    minutes: Option<u32>,
    seconds: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatorConfig {
    pub output_dir: PathBuf,
    pub top_k_labels: usize,
    pub rotation: RotationInterval,
    pub video_name: Option<String>,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self::from_file(AnnotatorConfigFile::default())
    }
}

impl AnnotatorConfig {
    /// File at `$ANNOTATOR_CONFIG` (optional), then environment overrides, then validation.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("ANNOTATOR_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AnnotatorConfigFile) -> Self {
        let defaults = RotationInterval::default();
        let rotation = match file.rotation {
            Some(r) => RotationInterval::new(
                r.hours.unwrap_or(0),
                r.minutes.unwrap_or(0),
                r.seconds.unwrap_or(0),
            ),
            None => defaults,
        };
        Self {
            output_dir: file
                .output_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            top_k_labels: file.top_k_labels.unwrap_or(DEFAULT_TOP_K_LABELS),
            rotation,
            video_name: file.video_name,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(dir) = std::env::var("ANNOTATOR_OUTPUT_DIR") {
            if !dir.trim().is_empty() {
                self.output_dir = PathBuf::from(dir);
            }
        }
        if let Ok(top_k) = std::env::var("ANNOTATOR_TOP_K") {
            self.top_k_labels = top_k
                .trim()
                .parse()
                .map_err(|_| anyhow!("ANNOTATOR_TOP_K must be a non-negative integer"))?;
        }
        if let Ok(secs) = std::env::var("ANNOTATOR_ROTATE_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                anyhow!("ANNOTATOR_ROTATE_SECS must be an integer number of seconds")
            })?;
            self.rotation = RotationInterval::from_secs(secs);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(anyhow!("output_dir must not be empty"));
        }
        if self.top_k_labels == 0 {
            return Err(anyhow!("top_k_labels must be at least 1"));
        }
        let clamped = self.rotation.clamped();
        if clamped != self.rotation {
            log::warn!(
                "rotation interval {:?} exceeds maxima, using {:?}",
                self.rotation,
                clamped
            );
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<AnnotatorConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_library_constants() {
        let cfg = AnnotatorConfig::default();
        assert_eq!(cfg.output_dir, PathBuf::from("jsons"));
        assert_eq!(cfg.top_k_labels, 1);
        assert_eq!(cfg.rotation, RotationInterval::new(0, 0, 60));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_quota_is_rejected() {
        let cfg = AnnotatorConfig {
            top_k_labels: 0,
            ..AnnotatorConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
