//! Demonstration CLI: runs the document-localization pipeline over a
//! still image, rectifies the best detection, and writes the result to
//! disk.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use doc_types::{Config, Frame, Rotation};

/// Scan a single image for a document boundary and write the rectified
/// result.
#[derive(Debug, Parser)]
#[command(name = "document-scanner", author, version)]
struct Args {
    /// Input image (any format the `image` crate can decode).
    input: PathBuf,

    /// Where to write the rectified output PNG.
    #[arg(short, long, default_value = "rectified.png")]
    output: PathBuf,

    /// Optional YAML configuration file overriding the defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override `autoCaptureConfidenceThreshold`.
    #[arg(long)]
    confidence_threshold: Option<f64>,

    /// Number of times to feed the same frame through the pipeline
    /// before capturing, simulating repeated live-preview frames
    /// building up stability.
    #[arg(long, default_value_t = 20)]
    warmup_frames: u32,
}

fn main() -> anyhow::Result<()> {
    let _guard = doc_capture::logging::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            let yaml = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            Config::from_yaml(&yaml).context("parsing config YAML")?
        }
        None => Config::default(),
    };
    if let Some(threshold) = args.confidence_threshold {
        config.auto_capture_confidence_threshold = threshold;
    }

    let source = image::open(&args.input)
        .with_context(|| format!("opening {}", args.input.display()))?
        .to_rgb8();
    let (width, height) = (source.width(), source.height());
    let luma: Vec<u8> = source
        .pixels()
        .map(|p| (0.299 * p[0] as f64 + 0.587 * p[1] as f64 + 0.114 * p[2] as f64).round() as u8)
        .collect();

    let mut pipeline = doc_vision::DetectionPipeline::new(config.strategy_time_budget_ms);
    let mut last_detection = None;
    for frame_no in 0..args.warmup_frames.max(1) as u64 {
        let frame = Frame::new(width, height, &luma, None, Rotation::Deg0, frame_no)?;
        last_detection = pipeline.detect(&frame, frame_no).or(last_detection);
    }

    let Some(detection) = last_detection else {
        bail!("no document detected in {}", args.input.display());
    };
    tracing::info!(
        confidence = detection.confidence,
        is_partial = detection.is_partial_document,
        "document detected"
    );

    let output = doc_rectify::rectify(&source, &detection.quad)
        .context("rectifying detected document")?;
    output
        .rectified
        .save(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;

    println!(
        "wrote {} ({}x{}, aspect ratio {:.3}, rotation {:?})",
        args.output.display(),
        output.rectified.width(),
        output.rectified.height(),
        output.aspect_ratio.ratio,
        output.auto_rotation_steps
    );
    Ok(())
}
