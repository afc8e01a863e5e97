use std::fmt;

use ffmpeg_next::codec::encoder::video::Encoder;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video;
use ffmpeg_next::{Codec, Dictionary, Packet, Rational};

use crate::shared::frame::{Frame, PixelFormat};
use crate::shared::session_params::SessionParams;
use crate::video::domain::encoder_backend::BackendError;

use super::encoder_options::EncoderOptions;

const ENCODER_PIXEL_FORMAT: Pixel = Pixel::YUV420P;

/// Video codecs the FFmpeg backends know how to set up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VideoCodec {
    Mpeg1,
    Mpeg4,
    H264,
}

impl VideoCodec {
    /// Looks up an encoder; for H.264 `libx264` wins over other encoders.
    pub fn find(self) -> Result<Codec, BackendError> {
        let codec = match self {
            VideoCodec::Mpeg1 => ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG1VIDEO),
            VideoCodec::Mpeg4 => ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4),
            VideoCodec::H264 => ffmpeg_next::encoder::find_by_name("libx264")
                .or_else(|| ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::H264)),
        };
        codec.ok_or_else(|| format!("{self} encoder not found").into())
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoCodec::Mpeg1 => write!(f, "MPEG-1"),
            VideoCodec::Mpeg4 => write!(f, "MPEG-4"),
            VideoCodec::H264 => write!(f, "H.264"),
        }
    }
}

fn pixel_for(format: PixelFormat) -> Pixel {
    match format {
        PixelFormat::Bgra => Pixel::BGRA,
        PixelFormat::Rgba => Pixel::RGBA,
        PixelFormat::Rgb24 => Pixel::RGB24,
        PixelFormat::Bgr24 => Pixel::BGR24,
        PixelFormat::Gray8 => Pixel::GRAY8,
    }
}

/// An opened FFmpeg video encoder plus the color conversion feeding it.
///
/// Container and raw-stream backends differ only in where packets go, so
/// both drive this type and hand it a packet callback.
pub(crate) struct EncoderCore {
    encoder: Encoder,
    scaler: Option<(PixelFormat, scaling::Context)>,
    width: u32,
    height: u32,
    time_base: Rational,
}

impl EncoderCore {
    pub(crate) fn open(
        codec: Codec,
        params: &SessionParams,
        options: &EncoderOptions,
        global_header: bool,
    ) -> Result<Self, BackendError> {
        let fps = i32::try_from(params.frame_rate())
            .map_err(|_| format!("frame rate {} is out of range", params.frame_rate()))?;
        let time_base = Rational(1, fps);

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;

        encoder_ctx.set_width(params.width());
        encoder_ctx.set_height(params.height());
        encoder_ctx.set_format(ENCODER_PIXEL_FORMAT);
        encoder_ctx.set_time_base(time_base);
        encoder_ctx.set_frame_rate(Some(Rational(fps, 1)));
        encoder_ctx.set_bit_rate(options.bit_rate as usize);
        encoder_ctx.set_gop(options.gop_size);
        if let Some(b_frames) = options.max_b_frames {
            encoder_ctx.set_max_b_frames(b_frames);
        }

        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let mut codec_options = Dictionary::new();
        if let Some(crf) = options.crf {
            codec_options.set("crf", &crf.to_string());
        }
        if let Some(preset) = &options.preset {
            codec_options.set("preset", preset);
        }

        let encoder = encoder_ctx
            .open_with(codec_options)
            .map_err(|e| format!("could not open {} encoder: {e}", codec.name()))?;

        Ok(Self {
            encoder,
            scaler: None,
            width: params.width(),
            height: params.height(),
            time_base,
        })
    }

    pub(crate) fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    pub(crate) fn time_base(&self) -> Rational {
        self.time_base
    }

    /// Converts `frame` to the encoder's pixel format, sends it with `pts`
    /// and hands every packet that becomes ready to `on_packet`.
    pub(crate) fn encode<F>(
        &mut self,
        frame: &Frame,
        pts: u64,
        on_packet: F,
    ) -> Result<(), BackendError>
    where
        F: FnMut(&mut Packet) -> Result<(), BackendError>,
    {
        let mut yuv_frame = self.convert(frame)?;
        yuv_frame.set_pts(Some(pts as i64));

        self.encoder
            .send_frame(&yuv_frame)
            .map_err(|e| format!("error sending frame {pts} for encoding: {e}"))?;
        self.drain(on_packet)
    }

    /// Signals end of stream and drains the frames the encoder held back.
    pub(crate) fn flush<F>(&mut self, on_packet: F) -> Result<(), BackendError>
    where
        F: FnMut(&mut Packet) -> Result<(), BackendError>,
    {
        self.encoder.send_eof()?;
        self.drain(on_packet)
    }

    fn drain<F>(&mut self, mut on_packet: F) -> Result<(), BackendError>
    where
        F: FnMut(&mut Packet) -> Result<(), BackendError>,
    {
        let mut packet = Packet::empty();
        loop {
            match self.encoder.receive_packet(&mut packet) {
                Ok(()) => on_packet(&mut packet)?,
                Err(ffmpeg_next::Error::Other { errno })
                    if errno == ffmpeg_next::util::error::EAGAIN =>
                {
                    return Ok(())
                }
                Err(ffmpeg_next::Error::Eof) => return Ok(()),
                Err(e) => return Err(format!("error during encoding: {e}").into()),
            }
        }
    }

    fn convert(&mut self, frame: &Frame) -> Result<Video, BackendError> {
        let format = frame.format();
        if self.scaler.as_ref().map(|(f, _)| *f) != Some(format) {
            let scaler = scaling::Context::get(
                pixel_for(format),
                self.width,
                self.height,
                ENCODER_PIXEL_FORMAT,
                self.width,
                self.height,
                scaling::Flags::BICUBIC,
            )
            .map_err(|e| format!("cannot initialize the conversion context: {e}"))?;
            self.scaler = Some((format, scaler));
        }

        let mut source = Video::new(pixel_for(format), self.width, self.height);
        let stride = source.stride(0);
        let data = source.data_mut(0);
        let row_bytes = frame.row_bytes();
        for (row, pixels) in frame.rows().enumerate() {
            let start = row * stride;
            data[start..start + row_bytes].copy_from_slice(pixels);
        }

        let mut converted = Video::empty();
        if let Some((_, scaler)) = self.scaler.as_mut() {
            scaler.run(&source, &mut converted)?;
        }
        Ok(converted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::infrastructure::ffmpeg_runtime::ensure_initialized;
    use rstest::rstest;

    fn core(codec: VideoCodec, w: u32, h: u32) -> EncoderCore {
        ensure_initialized().unwrap();
        let params = SessionParams::new(w, h, 25).unwrap();
        EncoderCore::open(
            codec.find().unwrap(),
            &params,
            &EncoderOptions::default(),
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_mpeg4_encoder_found() {
        ensure_initialized().unwrap();
        assert!(VideoCodec::Mpeg4.find().is_ok());
    }

    #[rstest]
    #[case::bgra(PixelFormat::Bgra)]
    #[case::rgba(PixelFormat::Rgba)]
    #[case::rgb(PixelFormat::Rgb24)]
    #[case::bgr(PixelFormat::Bgr24)]
    #[case::gray(PixelFormat::Gray8)]
    fn test_encodes_every_pixel_format(#[case] format: PixelFormat) {
        let mut core = core(VideoCodec::Mpeg4, 64, 48);
        let bpp = format.bytes_per_pixel();
        let frame = Frame::new(vec![90; 64 * 48 * bpp], 64, 48, format).unwrap();

        let mut packets = 0;
        core.encode(&frame, 0, |_| {
            packets += 1;
            Ok(())
        })
        .unwrap();
        core.flush(|_| {
            packets += 1;
            Ok(())
        })
        .unwrap();
        assert!(packets >= 1);
    }

    #[test]
    fn test_scaler_follows_frame_format() {
        let mut core = core(VideoCodec::Mpeg4, 32, 32);
        let rgb = Frame::new(vec![0; 32 * 32 * 3], 32, 32, PixelFormat::Rgb24).unwrap();
        let bgra = Frame::new(vec![0; 32 * 32 * 4], 32, 32, PixelFormat::Bgra).unwrap();

        core.encode(&rgb, 0, |_| Ok(())).unwrap();
        assert_eq!(core.scaler.as_ref().map(|(f, _)| *f), Some(PixelFormat::Rgb24));
        core.encode(&bgra, 1, |_| Ok(())).unwrap();
        assert_eq!(core.scaler.as_ref().map(|(f, _)| *f), Some(PixelFormat::Bgra));
    }

    #[test]
    fn test_padded_frame_is_accepted() {
        let mut core = core(VideoCodec::Mpeg4, 32, 32);
        let stride = 32 * 4 + 16;
        let frame =
            Frame::with_stride(vec![200; stride * 32], 32, 32, stride, PixelFormat::Bgra).unwrap();
        assert!(core.encode(&frame, 0, |_| Ok(())).is_ok());
    }

    #[test]
    fn test_packet_callback_error_propagates() {
        let mut core = core(VideoCodec::Mpeg4, 32, 32);
        let frame = Frame::new(vec![0; 32 * 32 * 4], 32, 32, PixelFormat::Bgra).unwrap();
        // The packet may surface on send or only on flush depending on codec delay
        let result = match core.encode(&frame, 0, |_| Err("write failed".into())) {
            Ok(()) => core.flush(|_| Err("write failed".into())),
            Err(e) => Err(e),
        };
        assert_eq!(result.unwrap_err().to_string(), "write failed");
    }
}
