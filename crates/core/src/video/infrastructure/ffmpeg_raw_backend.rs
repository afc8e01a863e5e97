use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::shared::constants::MPEG_SEQUENCE_END_CODE;
use crate::shared::frame::Frame;
use crate::shared::session_params::SessionParams;
use crate::video::domain::encoder_backend::{BackendError, EncoderBackend, EncoderHandle};

use super::encoder_options::EncoderOptions;
use super::ffmpeg_encoder::{EncoderCore, VideoCodec};
use super::ffmpeg_runtime;

/// Writes encoded packets back to back into a file, without a container.
///
/// Some legacy players expect an end code after the last packet of a raw
/// MPEG stream; set it with [`FfmpegRawStreamBackend::with_end_code`].
pub struct FfmpegRawStreamBackend {
    codec: VideoCodec,
    options: EncoderOptions,
    end_code: Option<[u8; 4]>,
}

impl FfmpegRawStreamBackend {
    pub fn new(codec: VideoCodec, options: EncoderOptions) -> Self {
        Self {
            codec,
            options,
            end_code: None,
        }
    }

    /// Raw MPEG-4 Part 2 stream terminated with the MPEG sequence end code.
    pub fn mpeg4(options: EncoderOptions) -> Self {
        Self::new(VideoCodec::Mpeg4, options).with_end_code(MPEG_SEQUENCE_END_CODE)
    }

    /// Raw H.264 Annex B stream.
    pub fn h264(options: EncoderOptions) -> Self {
        Self::new(VideoCodec::H264, options)
    }

    pub fn with_end_code(mut self, end_code: [u8; 4]) -> Self {
        self.end_code = Some(end_code);
        self
    }
}

impl EncoderBackend for FfmpegRawStreamBackend {
    fn name(&self) -> &str {
        "ffmpeg-raw"
    }

    fn open(
        &self,
        target: &Path,
        params: &SessionParams,
    ) -> Result<Box<dyn EncoderHandle>, BackendError> {
        ffmpeg_runtime::ensure_initialized()?;

        let codec = self.codec.find()?;
        let core = EncoderCore::open(codec, params, &self.options, false)?;

        let file = File::create(target)
            .map_err(|e| format!("could not open {}: {e}", target.display()))?;

        log::debug!("Writing raw {} stream to {}", self.codec, target.display());

        Ok(Box::new(RawStreamHandle {
            out: BufWriter::new(file),
            core,
            end_code: self.end_code,
        }))
    }
}

struct RawStreamHandle {
    out: BufWriter<File>,
    core: EncoderCore,
    end_code: Option<[u8; 4]>,
}

// Safety: a handle is owned by exactly one frame sink and only touched from
// the thread driving it. The raw pointers inside ffmpeg types are not shared.
unsafe impl Send for RawStreamHandle {}

fn write_packet(
    out: &mut BufWriter<File>,
    packet: &ffmpeg_next::Packet,
) -> Result<(), BackendError> {
    if let Some(data) = packet.data() {
        out.write_all(data)?;
    }
    Ok(())
}

impl EncoderHandle for RawStreamHandle {
    fn submit(&mut self, frame: &Frame, pts: u64) -> Result<(), BackendError> {
        let out = &mut self.out;
        self.core.encode(frame, pts, |packet| write_packet(out, packet))
    }

    fn flush_and_close(mut self: Box<Self>) -> Result<(), BackendError> {
        let this = &mut *self;
        let out = &mut this.out;
        this.core.flush(|packet| write_packet(out, packet))?;
        if let Some(end_code) = this.end_code {
            this.out.write_all(&end_code)?;
        }
        this.out.flush()?;
        Ok(())
    }
}
