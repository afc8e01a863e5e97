use std::path::PathBuf;
use std::process;

use clap::Parser;

use framesink_core::pipeline::encode_frames_use_case::{
    EncodeFramesUseCase, EncodeOptions, ProgressCallback,
};
use framesink_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use framesink_core::shared::constants::DEFAULT_FRAME_RATE;
use framesink_core::video::domain::frame_sink::FrameSink;
use framesink_core::video::domain::frame_source::FrameSource;
use framesink_core::video::infrastructure::backend_factory::{create_backend, BackendKind};
use framesink_core::video::infrastructure::encoder_options::EncoderOptions;
use framesink_core::video::infrastructure::image_file_source::{
    collect_image_paths, ImageFileSource,
};
use framesink_core::video::infrastructure::prefetching_source::PrefetchingSource;

/// Encode a sequence of images into a video file.
#[derive(Parser)]
#[command(name = "framesink")]
struct Cli {
    /// Output video file, or a directory for the images backend.
    output: PathBuf,

    /// Input image files or directories of images (sorted by name).
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Frames per second.
    #[arg(long, default_value_t = DEFAULT_FRAME_RATE)]
    fps: u32,

    /// Output backend: mpeg4-raw, h264-raw, h264 or images (default: from OUTPUT).
    #[arg(long)]
    backend: Option<BackendKind>,

    /// Frame width (default: width of the first image).
    #[arg(long, requires = "height")]
    width: Option<u32>,

    /// Frame height (default: height of the first image).
    #[arg(long, requires = "width")]
    height: Option<u32>,

    /// Target bit rate in bits per second.
    #[arg(long)]
    bit_rate: Option<u64>,

    /// Frames between key frames (0 = intra only).
    #[arg(long)]
    gop_size: Option<u32>,

    /// Maximum consecutive B-frames.
    #[arg(long)]
    max_b_frames: Option<usize>,

    /// Constant rate factor (0=lossless, 51=worst).
    #[arg(long)]
    crf: Option<u32>,

    /// Encoder speed preset, e.g. veryfast or slow.
    #[arg(long)]
    preset: Option<String>,

    /// JSON file with encoder options (default: <config dir>/framesink/encoder.json).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Frames decoded ahead on a background thread (0 = decode inline).
    #[arg(long, default_value = "4")]
    prefetch: usize,

    /// Skip images whose size differs from the video instead of aborting.
    #[arg(long)]
    skip_mismatched: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let paths = collect_inputs(&cli.inputs)?;
    let options = encoder_options(&cli)?;
    let kind = cli
        .backend
        .unwrap_or_else(|| BackendKind::from_target(&cli.output));

    let source = open_source(paths, cli.prefetch);
    let sink = FrameSink::new(create_backend(kind, options));

    let progress: ProgressCallback = Box::new(|current, total| {
        eprint!("\rEncoding frame {current}/{total}");
        true
    });

    let mut use_case = EncodeFramesUseCase::new(
        source,
        sink,
        Box::new(StdoutPipelineLogger::default()),
        EncodeOptions {
            skip_mismatched: cli.skip_mismatched,
            on_progress: Some(progress),
            cancelled: None,
        },
    );
    let size = cli.width.zip(cli.height);
    let report = use_case.execute(&cli.output, cli.fps, size)?;
    eprintln!();

    if report.frames_skipped > 0 {
        log::warn!("Skipped {} mismatched images", report.frames_skipped);
    }
    log::info!(
        "Wrote {} frames to {}",
        report.frames_written,
        cli.output.display()
    );
    Ok(())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    for input in &cli.inputs {
        if !input.exists() {
            return Err(format!("Input not found: {}", input.display()).into());
        }
    }
    if cli.fps == 0 {
        return Err("Frame rate must be positive".into());
    }
    if cli.width == Some(0) || cli.height == Some(0) {
        return Err("Frame size must be positive".into());
    }
    if let Some(config) = &cli.config {
        if !config.exists() {
            return Err(format!("Config file not found: {}", config.display()).into());
        }
    }
    Ok(())
}

fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let found = collect_image_paths(input)?;
            if found.is_empty() {
                log::warn!("No images found in {}", input.display());
            }
            paths.extend(found);
        } else {
            paths.push(input.clone());
        }
    }
    if paths.is_empty() {
        return Err("No input images".into());
    }
    Ok(paths)
}

/// Config file values, overridden by any flags given on the command line.
fn encoder_options(cli: &Cli) -> Result<EncoderOptions, Box<dyn std::error::Error>> {
    let mut options = match &cli.config {
        Some(path) => EncoderOptions::load(path)?,
        None => EncoderOptions::load_or_default(),
    };
    if let Some(bit_rate) = cli.bit_rate {
        options.bit_rate = bit_rate;
    }
    if let Some(gop_size) = cli.gop_size {
        options.gop_size = gop_size;
    }
    if cli.max_b_frames.is_some() {
        options.max_b_frames = cli.max_b_frames;
    }
    if cli.crf.is_some() {
        options.crf = cli.crf;
    }
    if cli.preset.is_some() {
        options.preset = cli.preset.clone();
    }
    options.validate()?;
    Ok(options)
}

fn open_source(paths: Vec<PathBuf>, prefetch: usize) -> Box<dyn FrameSource> {
    let source: Box<dyn FrameSource> = Box::new(ImageFileSource::new(paths));
    if prefetch > 0 {
        Box::new(PrefetchingSource::new(source, prefetch))
    } else {
        source
    }
}
