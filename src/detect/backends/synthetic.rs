use anyhow::{anyhow, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::annotation::{Geometry, Label};
use crate::detect::backend::DetectorBackend;
use crate::detect::result::FrameDetection;

const DEFAULT_CATEGORIES: [&str; 6] = ["person", "car", "truck", "bus", "bicycle", "dog"];
const MAX_BOXES_PER_FRAME: usize = 4;

/// Seeded stand-in for a real network. Same seed, same detections.
pub struct SyntheticBackend {
    rng: StdRng,
    frame_width: i32,
    frame_height: i32,
    categories: Vec<String>,
}

impl SyntheticBackend {
    pub fn new(seed: u64, frame_width: u32, frame_height: u32) -> Result<Self> {
        let frame_width =
            i32::try_from(frame_width).map_err(|_| anyhow!("frame width out of range"))?;
        let frame_height =
            i32::try_from(frame_height).map_err(|_| anyhow!("frame height out of range"))?;
        if frame_width < 2 || frame_height < 2 {
            return Err(anyhow!("synthetic frames must be at least 2x2 pixels"));
        }
        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            frame_width,
            frame_height,
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
        })
    }

    fn random_geometry(&mut self) -> Geometry {
        let width = self.rng.gen_range(1..=self.frame_width / 2);
        let height = self.rng.gen_range(1..=self.frame_height / 2);
        Geometry {
            top: self.rng.gen_range(0..=self.frame_height - height),
            left: self.rng.gen_range(0..=self.frame_width - width),
            width,
            height,
        }
    }

    /// `top_k` distinct categories with strictly descending confidence.
    fn random_labels(&mut self, top_k: usize) -> Vec<Label> {
        let picked: Vec<String> = self
            .categories
            .choose_multiple(&mut self.rng, top_k)
            .cloned()
            .collect();
        let mut confidence: f64 = self.rng.gen_range(0.5..1.0);
        picked
            .into_iter()
            .map(|category| {
                let label = Label::new(category, confidence);
                confidence *= self.rng.gen_range(0.1..0.9);
                label
            })
            .collect()
    }
}

impl DetectorBackend for SyntheticBackend {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn detect(&mut self, _frame_id: i64, top_k: usize) -> Result<Vec<FrameDetection>> {
        if top_k > self.categories.len() {
            return Err(anyhow!(
                "synthetic backend knows {} categories, {} requested",
                self.categories.len(),
                top_k
            ));
        }
        let count = self.rng.gen_range(0..=MAX_BOXES_PER_FRAME);
        Ok((0..count)
            .map(|i| FrameDetection {
                bbox_id: i as i64,
                geometry: self.random_geometry(),
                labels: self.random_labels(top_k),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_detections() {
        let mut a = SyntheticBackend::new(42, 640, 480).unwrap();
        let mut b = SyntheticBackend::new(42, 640, 480).unwrap();
        for frame in 0..5 {
            assert_eq!(a.detect(frame, 2).unwrap(), b.detect(frame, 2).unwrap());
        }
    }

    #[test]
    fn detections_fit_frame_and_quota() {
        let mut backend = SyntheticBackend::new(7, 320, 240).unwrap();
        for frame in 0..50 {
            for det in backend.detect(frame, 3).unwrap() {
                let g = det.geometry;
                assert!(g.left >= 0 && g.left + g.width <= 320);
                assert!(g.top >= 0 && g.top + g.height <= 240);
                assert_eq!(det.labels.len(), 3);
                assert!(det.labels[0].confidence() > det.labels[1].confidence());
            }
        }
    }

    #[test]
    fn rejects_quota_beyond_vocabulary() {
        let mut backend = SyntheticBackend::new(1, 64, 64).unwrap();
        assert!(backend.detect(0, 99).is_err());
    }
}
