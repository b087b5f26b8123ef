//! annotate_demo - drives a synthetic detector through the annotation session
//!
//! Per processed frame: detect → ingest → rotation check. On Ctrl-C or when the
//! requested duration is over, whatever is still buffered is flushed.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use detection_annotator::{
    AnnotationSession, AnnotatorConfig, DetectorBackend, RotationInterval, RotationOutcome,
    SyntheticBackend,
};

const FRAME_WIDTH: u32 = 640;
const FRAME_HEIGHT: u32 = 480;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Duration in seconds of synthetic video.
    #[arg(long, default_value_t = 10)]
    seconds: u64,
    /// Frames per second of the synthetic source.
    #[arg(long, default_value_t = 10)]
    fps: u32,
    /// Run detection on every n-th frame only.
    #[arg(long, default_value_t = 4)]
    step: u64,
    /// Output directory for rotated JSON files (overrides config).
    #[arg(long)]
    out: Option<PathBuf>,
    /// Labels recorded per box (overrides config).
    #[arg(long)]
    top_k: Option<usize>,
    /// Rotation interval in seconds (overrides config).
    #[arg(long)]
    rotate_secs: Option<u64>,
    /// Seed for the synthetic detector.
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Name recorded in video_details.
    #[arg(long)]
    video_name: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.fps == 0 {
        return Err(anyhow!("fps must be >= 1"));
    }

    let mut cfg = AnnotatorConfig::load().context("loading annotator config")?;
    if let Some(out) = args.out {
        cfg.output_dir = out;
    }
    if let Some(top_k) = args.top_k {
        cfg.top_k_labels = top_k;
    }
    if let Some(secs) = args.rotate_secs {
        cfg.rotation = RotationInterval::from_secs(secs);
    }
    let video_name = args
        .video_name
        .or(cfg.video_name.clone())
        .unwrap_or_else(|| "synthetic.mp4".to_string());

    let mut detector = SyntheticBackend::new(args.seed, FRAME_WIDTH, FRAME_HEIGHT)?;
    detector.warm_up()?;

    let mut session = AnnotationSession::new(cfg.top_k_labels);
    session.set_video_metadata(FRAME_WIDTH, FRAME_HEIGHT, f64::from(args.fps), video_name);
    session.reset_start();

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))
            .context("installing Ctrl-C handler")?;
    }

    log::info!("annotate_demo starting");
    log::info!("  Detector: {}", detector.name());
    log::info!("  Output: {}", cfg.output_dir.display());
    log::info!("  Top-k labels: {}", cfg.top_k_labels);
    log::info!(
        "  Rotation threshold: {}s",
        cfg.rotation.threshold_secs()
    );

    let frame_period = Duration::from_secs(1) / args.fps;
    let total_frames = args.seconds.saturating_mul(u64::from(args.fps));
    let step = args.step.max(1);
    let mut files_written = 0usize;

    for frame_counter in 1..=total_frames {
        if !running.load(Ordering::SeqCst) {
            log::info!("shutdown signal received after {} frames", frame_counter - 1);
            break;
        }
        std::thread::sleep(frame_period);
        if frame_counter % step != 0 {
            continue;
        }

        let frame_id = i64::try_from(frame_counter)?;
        let detections = detector.detect(frame_id, cfg.top_k_labels)?;
        session.ingest_detections(frame_id, &detections)?;

        match session.check_rotation_with(&cfg.output_dir, cfg.rotation) {
            Ok(RotationOutcome::Flushed { path, frames }) => {
                files_written += 1;
                log::debug!("window closed: {} ({} frames)", path.display(), frames);
            }
            Ok(RotationOutcome::Idle) => {}
            Err(err) => {
                // The buffer is intact; stop and let the drain below retry.
                log::warn!("rotation failed at frame {}: {}", frame_id, err);
                break;
            }
        }
    }

    if !session.is_empty() {
        session
            .flush(&cfg.output_dir)
            .with_context(|| format!("draining {} buffered frames", session.frame_count()))?;
        files_written += 1;
    }
    log::info!("annotate_demo done: {} files written", files_written);
    Ok(())
}
