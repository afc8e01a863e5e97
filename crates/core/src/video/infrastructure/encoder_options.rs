use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::{DEFAULT_BIT_RATE, DEFAULT_GOP_SIZE};

#[derive(Error, Debug)]
pub enum OptionsError {
    #[error("failed to read encoder options from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse encoder options in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    Invalid(String),
}

/// Codec tuning shared by the FFmpeg backends.
///
/// Missing fields in a JSON file fall back to the defaults, so a config file
/// only needs the values it overrides.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderOptions {
    pub bit_rate: u64,
    pub gop_size: u32,
    pub max_b_frames: Option<usize>,
    /// Constant rate factor for encoders that support it (0-51).
    pub crf: Option<u32>,
    pub preset: Option<String>,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            bit_rate: DEFAULT_BIT_RATE,
            gop_size: DEFAULT_GOP_SIZE,
            max_b_frames: None,
            crf: None,
            preset: None,
        }
    }
}

impl EncoderOptions {
    /// `<config dir>/framesink/encoder.json`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("framesink").join("encoder.json"))
    }

    pub fn load(path: &Path) -> Result<Self, OptionsError> {
        let json = fs::read_to_string(path).map_err(|e| OptionsError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let options: Self = serde_json::from_str(&json).map_err(|e| OptionsError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        options.validate()?;
        Ok(options)
    }

    /// Loads the file at [`EncoderOptions::default_path`] when present.
    ///
    /// An unreadable or invalid file is reported and ignored.
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path().filter(|p| p.exists()) else {
            return Self::default();
        };
        match Self::load(&path) {
            Ok(options) => {
                log::debug!("Loaded encoder options from {}", path.display());
                options
            }
            Err(e) => {
                log::warn!("Ignoring encoder options: {e}");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.bit_rate == 0 {
            return Err(OptionsError::Invalid("bit rate must be positive".to_string()));
        }
        if let Some(crf) = self.crf {
            if crf > 51 {
                return Err(OptionsError::Invalid(format!(
                    "CRF must be between 0 and 51, got {crf}"
                )));
            }
        }
        Ok(())
    }
}
