use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::session_params::SessionParams;

/// Diagnostic returned by a backend; carried verbatim inside sink errors.
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

/// Abstracts the codec/container library so the frame sink can drive any
/// encoder without depending on it.
///
/// A backend is a factory: each successful `open` yields a fresh handle that
/// owns every resource of that one output.
pub trait EncoderBackend: Send {
    /// Short human-readable name used in diagnostics.
    fn name(&self) -> &str;

    /// Prepares an encoding session writing to `target`.
    fn open(
        &self,
        target: &Path,
        params: &SessionParams,
    ) -> Result<Box<dyn EncoderHandle>, BackendError>;
}

/// An open output. Dropping a handle without calling
/// [`EncoderHandle::flush_and_close`] releases its resources but leaves the
/// output unsealed.
pub trait EncoderHandle: Send {
    /// Encodes one frame with presentation timestamp `pts` (in frames).
    fn submit(&mut self, frame: &Frame, pts: u64) -> Result<(), BackendError>;

    /// Drains frames the encoder is still holding, then seals the output.
    fn flush_and_close(self: Box<Self>) -> Result<(), BackendError>;
}
