use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::video::domain::frame_sink::{FrameSink, SinkState};
use crate::video::domain::frame_source::FrameSource;
use crate::video::domain::sink_error::SinkError;

use super::pipeline_logger::PipelineLogger;

/// Returns `false` to cancel the run. Called with `(frames_done, total)`.
pub type ProgressCallback = Box<dyn Fn(usize, usize) -> bool + Send>;

#[derive(Default)]
pub struct EncodeOptions {
    /// Skip frames whose size differs from the session instead of aborting.
    pub skip_mismatched: bool,
    pub on_progress: Option<ProgressCallback>,
    pub cancelled: Option<Arc<AtomicBool>>,
}

/// Outcome of a finished run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncodeReport {
    pub frames_written: u64,
    pub frames_skipped: usize,
    pub cancelled: bool,
}

/// Feeds every frame of a source into a frame sink and seals the output.
///
/// This is a single-use struct: `execute` consumes the source, so calling it
/// twice will fail.
pub struct EncodeFramesUseCase {
    source: Option<Box<dyn FrameSource>>,
    sink: FrameSink,
    logger: Box<dyn PipelineLogger>,
    skip_mismatched: bool,
    on_progress: Option<ProgressCallback>,
    cancelled: Arc<AtomicBool>,
}

impl EncodeFramesUseCase {
    pub fn new(
        source: Box<dyn FrameSource>,
        sink: FrameSink,
        logger: Box<dyn PipelineLogger>,
        options: EncodeOptions,
    ) -> Self {
        Self {
            source: Some(source),
            sink,
            logger,
            skip_mismatched: options.skip_mismatched,
            on_progress: options.on_progress,
            cancelled: options
                .cancelled
                .unwrap_or_else(|| Arc::new(AtomicBool::new(false))),
        }
    }

    pub fn sink(&self) -> &FrameSink {
        &self.sink
    }

    /// Encodes the source into `target`.
    ///
    /// The session takes its size from `size`, or from the source's first
    /// frame when `None`. A cancelled run still finalizes, leaving a playable
    /// file with the frames written so far.
    pub fn execute(
        &mut self,
        target: &Path,
        frame_rate: u32,
        size: Option<(u32, u32)>,
    ) -> Result<EncodeReport, Box<dyn std::error::Error>> {
        let mut source = self.source.take().ok_or("Encoding already executed")?;
        let result = self.run(source.as_mut(), target, frame_rate, size);
        source.close();
        result
    }

    fn run(
        &mut self,
        source: &mut dyn FrameSource,
        target: &Path,
        frame_rate: u32,
        size: Option<(u32, u32)>,
    ) -> Result<EncodeReport, Box<dyn std::error::Error>> {
        let info = source
            .open()
            .map_err(|e| format!("failed to open frame source: {e}"))?;
        let (width, height) = size.unwrap_or((info.width, info.height));
        let total = info.total_frames;

        self.sink.configure(target, width, height, frame_rate)?;
        self.logger.info(&format!(
            "Encoding {total} frames ({width}x{height} @ {frame_rate} fps) to {} with {}",
            target.display(),
            self.sink.backend_name()
        ));

        let mut report = EncodeReport::default();
        let mut aborted: Option<Box<dyn std::error::Error>> = None;

        for (index, frame_result) in source.frames().enumerate() {
            if self.cancelled.load(Ordering::Relaxed) {
                report.cancelled = true;
                break;
            }

            let frame = match frame_result {
                Ok(frame) => frame,
                Err(e) => {
                    aborted = Some(format!("failed to read frame {index}: {e}").into());
                    break;
                }
            };

            let started = Instant::now();
            match self.sink.submit_frame(&frame) {
                Ok(()) => self
                    .logger
                    .timing("encode", started.elapsed().as_secs_f64() * 1000.0),
                Err(e @ SinkError::FrameShapeMismatch { .. }) if self.skip_mismatched => {
                    log::warn!("Skipping input frame {index}: {e}");
                    report.frames_skipped += 1;
                }
                Err(e) => {
                    aborted = Some(e.into());
                    break;
                }
            }

            let done = index + 1;
            self.logger.progress(done, total);
            if let Some(ref cb) = self.on_progress {
                if !cb(done, total) {
                    self.cancelled.store(true, Ordering::Relaxed);
                    report.cancelled = true;
                    break;
                }
            }
        }

        if let Some(e) = aborted {
            // Seal what was written; a failed backend has nothing left to seal.
            if self.sink.state() == SinkState::Open {
                if let Err(fe) = self.sink.finalize() {
                    log::warn!("Could not seal partial output: {fe}");
                }
            }
            return Err(e);
        }

        self.sink.finalize()?;
        report.frames_written = self.sink.frame_count();

        if report.cancelled {
            self.logger.info(&format!("Cancelled after {} frames", report.frames_written));
        }
        self.logger
            .metric("skipped_frames", report.frames_skipped as f64);
        self.logger.summary();

        Ok(report)
    }
}
