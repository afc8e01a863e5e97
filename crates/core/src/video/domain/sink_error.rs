use std::path::PathBuf;

use thiserror::Error;

use super::encoder_backend::BackendError;
use super::frame_sink::SinkState;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("cannot {operation} while the sink is {state}")]
    InvalidState {
        operation: &'static str,
        state: SinkState,
    },
    #[error("invalid session parameters: {0}")]
    InvalidParameters(String),
    #[error("{backend} backend rejected {}: {source}", .target.display())]
    Configuration {
        backend: String,
        target: PathBuf,
        #[source]
        source: BackendError,
    },
    #[error(
        "frame is {actual_width}x{actual_height}, session expects {expected_width}x{expected_height}"
    )]
    FrameShapeMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },
    #[error("encoding frame {frame_index} failed: {source}")]
    Encoding {
        frame_index: u64,
        #[source]
        source: BackendError,
    },
    #[error("finalizing output failed: {source}")]
    Finalization {
        #[source]
        source: BackendError,
    },
}

impl SinkError {
    /// Whether the error left the session usable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SinkError::InvalidState { .. }
                | SinkError::InvalidParameters(_)
                | SinkError::FrameShapeMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_invalid_state_message() {
        let err = SinkError::InvalidState {
            operation: "finalize",
            state: SinkState::Finalized,
        };
        assert_eq!(err.to_string(), "cannot finalize while the sink is finalized");
    }

    #[test]
    fn test_shape_mismatch_message() {
        let err = SinkError::FrameShapeMismatch {
            expected_width: 64,
            expected_height: 48,
            actual_width: 32,
            actual_height: 32,
        };
        assert_eq!(err.to_string(), "frame is 32x32, session expects 64x48");
    }

    #[test]
    fn test_backend_diagnostic_is_source() {
        let err = SinkError::Encoding {
            frame_index: 3,
            source: "encoder rejected data".into(),
        };
        assert!(err.to_string().contains("encoder rejected data"));
        assert_eq!(
            err.source().map(|s| s.to_string()),
            Some("encoder rejected data".to_string())
        );
    }

    #[test]
    fn test_recoverable_kinds() {
        assert!(SinkError::InvalidParameters("x".into()).is_recoverable());
        assert!(!SinkError::Finalization {
            source: "disk full".into()
        }
        .is_recoverable());
    }
}
