use std::sync::OnceLock;

use crate::video::domain::encoder_backend::BackendError;

static INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// Initializes the FFmpeg libraries once per process.
///
/// Safe to call from every backend `open`; only the first call does work and
/// its outcome is remembered for later callers.
pub fn ensure_initialized() -> Result<(), BackendError> {
    INIT.get_or_init(|| {
        let result = ffmpeg_next::init().map_err(|e| format!("FFmpeg initialization failed: {e}"));
        if result.is_ok() {
            ffmpeg_next::util::log::set_level(ffmpeg_next::util::log::Level::Error);
            log::debug!("FFmpeg initialized");
        }
        result
    })
    .clone()
    .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_initialization_succeeds() {
        assert!(ensure_initialized().is_ok());
        assert!(ensure_initialized().is_ok());
    }

    #[test]
    fn test_encoders_available_after_init() {
        ensure_initialized().unwrap();
        assert!(ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4).is_some());
    }
}
