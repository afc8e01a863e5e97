use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::shared::constants::DEFAULT_H264_CRF;
use crate::video::domain::encoder_backend::EncoderBackend;

use super::encoder_options::EncoderOptions;
use super::ffmpeg_container_backend::FfmpegContainerBackend;
use super::ffmpeg_encoder::VideoCodec;
use super::ffmpeg_raw_backend::FfmpegRawStreamBackend;
use super::image_sequence_backend::ImageSequenceBackend;

/// Output profiles a frame sink can be built with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// Raw MPEG-4 Part 2 stream with a sequence end code.
    Mpeg4Raw,
    /// Raw H.264 Annex B stream.
    H264Raw,
    /// H.264 muxed into the container named by the file extension.
    H264Container,
    /// A directory of numbered PNG files.
    ImageSequence,
}

impl BackendKind {
    /// Picks a profile from the target's extension.
    pub fn from_target(target: &Path) -> Self {
        let ext = target
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("m4v" | "mpeg4" | "cmp") => BackendKind::Mpeg4Raw,
            Some("h264" | "264") => BackendKind::H264Raw,
            None => BackendKind::ImageSequence,
            Some(_) => BackendKind::H264Container,
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mpeg4-raw" => Ok(BackendKind::Mpeg4Raw),
            "h264-raw" => Ok(BackendKind::H264Raw),
            "h264" => Ok(BackendKind::H264Container),
            "images" => Ok(BackendKind::ImageSequence),
            other => Err(format!(
                "unknown backend '{other}' (expected mpeg4-raw, h264-raw, h264 or images)"
            )),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Mpeg4Raw => "mpeg4-raw",
            BackendKind::H264Raw => "h264-raw",
            BackendKind::H264Container => "h264",
            BackendKind::ImageSequence => "images",
        };
        f.write_str(name)
    }
}

/// Creates the backend for `kind`.
///
/// H.264 profiles encode losslessly unless `options` sets a CRF.
pub fn create_backend(kind: BackendKind, options: EncoderOptions) -> Box<dyn EncoderBackend> {
    log::info!("Using {kind} backend");
    match kind {
        BackendKind::Mpeg4Raw => Box::new(FfmpegRawStreamBackend::mpeg4(options)),
        BackendKind::H264Raw => Box::new(FfmpegRawStreamBackend::h264(with_h264_crf(options))),
        BackendKind::H264Container => Box::new(FfmpegContainerBackend::new(
            VideoCodec::H264,
            with_h264_crf(options),
        )),
        BackendKind::ImageSequence => Box::new(ImageSequenceBackend::new()),
    }
}

fn with_h264_crf(options: EncoderOptions) -> EncoderOptions {
    EncoderOptions {
        crf: options.crf.or(Some(DEFAULT_H264_CRF)),
        ..options
    }
}
