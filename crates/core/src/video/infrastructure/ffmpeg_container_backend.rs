use std::ffi::CString;
use std::path::Path;
use std::ptr;

use ffmpeg_next::format::context::Output;
use ffmpeg_next::Rational;

use crate::shared::constants::FALLBACK_CONTAINER;
use crate::shared::frame::Frame;
use crate::shared::session_params::SessionParams;
use crate::video::domain::encoder_backend::{BackendError, EncoderBackend, EncoderHandle};

use super::encoder_options::EncoderOptions;
use super::ffmpeg_encoder::{EncoderCore, VideoCodec};
use super::ffmpeg_runtime;

/// Encodes frames with FFmpeg and muxes them into a container file.
///
/// The container is guessed from the target's extension unless one is
/// forced with [`FfmpegContainerBackend::with_format`]; targets FFmpeg cannot
/// place fall back to MPEG program stream.
pub struct FfmpegContainerBackend {
    codec: VideoCodec,
    format: Option<String>,
    options: EncoderOptions,
}

impl FfmpegContainerBackend {
    pub fn new(codec: VideoCodec, options: EncoderOptions) -> Self {
        Self {
            codec,
            format: None,
            options,
        }
    }

    /// Forces a muxer by FFmpeg short name (e.g. `"mp4"`, `"matroska"`).
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    fn open_output(&self, target: &Path) -> Result<Output, BackendError> {
        if let Some(format) = &self.format {
            return Ok(ffmpeg_next::format::output_as(&target, format)?);
        }
        if has_muxer_for(target) {
            return Ok(ffmpeg_next::format::output(target)?);
        }
        log::debug!(
            "No container for {}, using {FALLBACK_CONTAINER}",
            target.display()
        );
        Ok(ffmpeg_next::format::output_as(&target, FALLBACK_CONTAINER)?)
    }
}

/// Whether FFmpeg can pick a muxer from the target's file name alone.
fn has_muxer_for(target: &Path) -> bool {
    let Ok(name) = CString::new(target.to_string_lossy().as_bytes()) else {
        return false;
    };
    // Safety: `name` outlives the call and the result points at a static
    // muxer description that is only compared against null.
    let muxer =
        unsafe { ffmpeg_next::ffi::av_guess_format(ptr::null(), name.as_ptr(), ptr::null()) };
    !muxer.is_null()
}

impl EncoderBackend for FfmpegContainerBackend {
    fn name(&self) -> &str {
        "ffmpeg-container"
    }

    fn open(
        &self,
        target: &Path,
        params: &SessionParams,
    ) -> Result<Box<dyn EncoderHandle>, BackendError> {
        ffmpeg_runtime::ensure_initialized()?;

        let mut octx = self.open_output(target)?;

        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = self.codec.find()?;
        let core = EncoderCore::open(codec, params, &self.options, global_header)?;

        let stream_index = {
            let mut ost = octx.add_stream(codec)?;
            ost.set_parameters(core.encoder());
            ost.set_time_base(core.time_base());
            ost.index()
        };

        octx.write_header()
            .map_err(|e| format!("error writing file header: {e}"))?;

        // The muxer may pick its own stream time base while writing the header.
        let stream_time_base = octx
            .stream(stream_index)
            .ok_or("output stream disappeared after writing header")?
            .time_base();

        log::debug!(
            "Muxing {} into {} via {}",
            self.codec,
            target.display(),
            octx.format().name()
        );

        Ok(Box::new(ContainerHandle {
            octx,
            core,
            stream_index,
            stream_time_base,
        }))
    }
}

struct ContainerHandle {
    octx: Output,
    core: EncoderCore,
    stream_index: usize,
    stream_time_base: Rational,
}

// Safety: a handle is owned by exactly one frame sink and only touched from
// the thread driving it. The raw pointers inside ffmpeg types are not shared.
unsafe impl Send for ContainerHandle {}

impl ContainerHandle {
    fn write_packets<F>(&mut self, step: F) -> Result<(), BackendError>
    where
        F: FnOnce(
            &mut EncoderCore,
            &mut dyn FnMut(&mut ffmpeg_next::Packet) -> Result<(), BackendError>,
        ) -> Result<(), BackendError>,
    {
        let Self {
            octx,
            core,
            stream_index,
            stream_time_base,
        } = self;
        let codec_time_base = core.time_base();
        let mut write = |packet: &mut ffmpeg_next::Packet| -> Result<(), BackendError> {
            packet.set_stream(*stream_index);
            packet.rescale_ts(codec_time_base, *stream_time_base);
            packet.write_interleaved(octx)?;
            Ok(())
        };
        step(core, &mut write)
    }
}

impl EncoderHandle for ContainerHandle {
    fn submit(&mut self, frame: &Frame, pts: u64) -> Result<(), BackendError> {
        self.write_packets(|core, write| core.encode(frame, pts, write))
    }

    fn flush_and_close(mut self: Box<Self>) -> Result<(), BackendError> {
        self.write_packets(|core, write| core.flush(write))?;
        self.octx.write_trailer()?;
        Ok(())
    }
}
