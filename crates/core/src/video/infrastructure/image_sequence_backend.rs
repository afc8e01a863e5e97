use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::shared::constants::SEQUENCE_FRAME_PREFIX;
use crate::shared::frame::{Frame, PixelFormat};
use crate::shared::session_params::SessionParams;
use crate::video::domain::encoder_backend::{BackendError, EncoderBackend, EncoderHandle};

/// Writes every frame as a numbered PNG inside the target directory.
///
/// Useful for inspecting output frame by frame, or as a sink on machines
/// without FFmpeg encoders.
pub struct ImageSequenceBackend;

impl ImageSequenceBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageSequenceBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl EncoderBackend for ImageSequenceBackend {
    fn name(&self) -> &str {
        "image-sequence"
    }

    fn open(
        &self,
        target: &Path,
        params: &SessionParams,
    ) -> Result<Box<dyn EncoderHandle>, BackendError> {
        if target.is_file() {
            return Err(format!("{} exists and is not a directory", target.display()).into());
        }
        std::fs::create_dir_all(target)?;
        log::debug!(
            "Writing {}x{} frames to {}",
            params.width(),
            params.height(),
            target.display()
        );
        Ok(Box::new(ImageSequenceHandle {
            dir: target.to_path_buf(),
        }))
    }
}

struct ImageSequenceHandle {
    dir: PathBuf,
}

impl ImageSequenceHandle {
    fn frame_path(&self, pts: u64) -> PathBuf {
        self.dir.join(format!("{SEQUENCE_FRAME_PREFIX}{pts:06}.png"))
    }
}

impl EncoderHandle for ImageSequenceHandle {
    fn submit(&mut self, frame: &Frame, pts: u64) -> Result<(), BackendError> {
        to_rgba_image(frame).save(self.frame_path(pts))?;
        Ok(())
    }

    fn flush_and_close(self: Box<Self>) -> Result<(), BackendError> {
        Ok(())
    }
}

fn to_rgba_image(frame: &Frame) -> RgbaImage {
    let pixels = frame.as_ndarray();
    let format = frame.format();
    RgbaImage::from_fn(frame.width(), frame.height(), |x, y| {
        let px = pixels.slice(ndarray::s![y as usize, x as usize, ..]);
        let rgba = match format {
            PixelFormat::Rgba => [px[0], px[1], px[2], px[3]],
            PixelFormat::Bgra => [px[2], px[1], px[0], px[3]],
            PixelFormat::Rgb24 => [px[0], px[1], px[2], 255],
            PixelFormat::Bgr24 => [px[2], px[1], px[0], 255],
            PixelFormat::Gray8 => [px[0], px[0], px[0], 255],
        };
        image::Rgba(rgba)
    })
}
