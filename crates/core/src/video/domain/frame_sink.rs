use std::fmt;
use std::path::{Path, PathBuf};

use crate::shared::frame::Frame;
use crate::shared::session_params::SessionParams;

use super::encoder_backend::{EncoderBackend, EncoderHandle};
use super::sink_error::SinkError;

/// Externally observable lifecycle state of a [`FrameSink`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinkState {
    Unconfigured,
    Open,
    Finalized,
    Failed,
}

impl fmt::Display for SinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkState::Unconfigured => write!(f, "unconfigured"),
            SinkState::Open => write!(f, "open"),
            SinkState::Finalized => write!(f, "finalized"),
            SinkState::Failed => write!(f, "failed"),
        }
    }
}

/// Internal state; the backend handle only exists while open.
enum Stage {
    Unconfigured,
    Open(Box<dyn EncoderHandle>),
    Finalized,
    Failed,
}

impl Stage {
    fn state(&self) -> SinkState {
        match self {
            Stage::Unconfigured => SinkState::Unconfigured,
            Stage::Open(_) => SinkState::Open,
            Stage::Finalized => SinkState::Finalized,
            Stage::Failed => SinkState::Failed,
        }
    }
}

/// Governs one video-writing session: configure once, submit frames in
/// order, finalize once.
///
/// Encoding itself is delegated to the injected [`EncoderBackend`]. Every
/// backend failure is fatal to the session; shape mismatches and calls made
/// in the wrong state are rejected without touching the backend.
///
/// All operations take `&mut self`, so concurrent use needs external
/// synchronization.
pub struct FrameSink {
    backend: Box<dyn EncoderBackend>,
    stage: Stage,
    target: Option<PathBuf>,
    params: Option<SessionParams>,
    frame_count: u64,
}

impl FrameSink {
    pub fn new(backend: Box<dyn EncoderBackend>) -> Self {
        Self {
            backend,
            stage: Stage::Unconfigured,
            target: None,
            params: None,
            frame_count: 0,
        }
    }

    pub fn state(&self) -> SinkState {
        self.stage.state()
    }

    /// Frames accepted so far; also the timestamp of the next frame.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn params(&self) -> Option<&SessionParams> {
        self.params.as_ref()
    }

    pub fn target(&self) -> Option<&Path> {
        self.target.as_deref()
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn configure(
        &mut self,
        target: impl AsRef<Path>,
        width: u32,
        height: u32,
        frame_rate: u32,
    ) -> Result<(), SinkError> {
        if !matches!(self.stage, Stage::Unconfigured) {
            return Err(self.invalid_state("configure"));
        }
        let params =
            SessionParams::new(width, height, frame_rate).map_err(SinkError::InvalidParameters)?;
        let target = target.as_ref();

        log::debug!(
            "Opening {} backend for {} ({width}x{height} @ {frame_rate} fps)",
            self.backend.name(),
            target.display()
        );

        self.target = Some(target.to_path_buf());
        self.params = Some(params);

        match self.backend.open(target, &params) {
            Ok(handle) => {
                self.frame_count = 0;
                self.stage = Stage::Open(handle);
                Ok(())
            }
            Err(source) => {
                self.stage = Stage::Failed;
                Err(SinkError::Configuration {
                    backend: self.backend.name().to_string(),
                    target: target.to_path_buf(),
                    source,
                })
            }
        }
    }

    pub fn submit_frame(&mut self, frame: &Frame) -> Result<(), SinkError> {
        let handle = match &mut self.stage {
            Stage::Open(handle) => handle,
            other => {
                return Err(SinkError::InvalidState {
                    operation: "submit a frame",
                    state: other.state(),
                })
            }
        };
        let params = self
            .params
            .expect("open sink always has session parameters");

        if frame.width() != params.width() || frame.height() != params.height() {
            return Err(SinkError::FrameShapeMismatch {
                expected_width: params.width(),
                expected_height: params.height(),
                actual_width: frame.width(),
                actual_height: frame.height(),
            });
        }

        let pts = self.frame_count;
        let result = handle.submit(frame, pts);
        if let Err(source) = result {
            // Dropping the handle releases the backend's resources.
            self.stage = Stage::Failed;
            return Err(SinkError::Encoding {
                frame_index: pts,
                source,
            });
        }

        self.frame_count += 1;
        Ok(())
    }

    pub fn finalize(&mut self) -> Result<(), SinkError> {
        let handle = match std::mem::replace(&mut self.stage, Stage::Failed) {
            Stage::Open(handle) => handle,
            other => {
                self.stage = other;
                return Err(self.invalid_state("finalize"));
            }
        };

        match handle.flush_and_close() {
            Ok(()) => {
                self.stage = Stage::Finalized;
                log::debug!(
                    "Finalized {} after {} frames",
                    self.target
                        .as_deref()
                        .map(|t| t.display().to_string())
                        .unwrap_or_default(),
                    self.frame_count
                );
                Ok(())
            }
            Err(source) => Err(SinkError::Finalization { source }),
        }
    }

    fn invalid_state(&self, operation: &'static str) -> SinkError {
        SinkError::InvalidState {
            operation,
            state: self.stage.state(),
        }
    }
}

impl Drop for FrameSink {
    fn drop(&mut self) {
        if matches!(self.stage, Stage::Open(_)) {
            log::warn!(
                "Frame sink dropped while open; output left unsealed after {} frames",
                self.frame_count
            );
        }
    }
}
