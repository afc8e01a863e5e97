use std::path::{Path, PathBuf};

use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::{Frame, PixelFormat};
use crate::video::domain::frame_source::{FrameSource, SourceError, SourceInfo};

/// Decodes a list of image files into RGBA frames, one file per frame.
pub struct ImageFileSource {
    paths: Vec<PathBuf>,
}

impl ImageFileSource {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

fn decode(path: &Path) -> Result<Frame, SourceError> {
    let img = image::open(path)
        .map_err(|e| format!("failed to decode {}: {e}", path.display()))?
        .to_rgba8();
    let (width, height) = img.dimensions();
    Ok(Frame::new(img.into_raw(), width, height, PixelFormat::Rgba)?)
}

impl FrameSource for ImageFileSource {
    fn open(&mut self) -> Result<SourceInfo, SourceError> {
        let first = self.paths.first().ok_or("no input images")?;
        let (width, height) = image::image_dimensions(first)
            .map_err(|e| format!("failed to read {}: {e}", first.display()))?;
        Ok(SourceInfo {
            width,
            height,
            total_frames: self.paths.len(),
        })
    }

    fn frames(&mut self) -> Box<dyn Iterator<Item = Result<Frame, SourceError>> + '_> {
        Box::new(self.paths.iter().map(|p| decode(p)))
    }

    fn close(&mut self) {}
}

/// Lists the supported image files directly inside `dir`, sorted by name.
pub fn collect_image_paths(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_image(p))
        .collect();
    paths.sort();
    Ok(paths)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_png(path: &Path, w: u32, h: u32, rgb: [u8; 3]) {
        image::RgbImage::from_pixel(w, h, image::Rgb(rgb))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_open_reports_first_image_size() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.png");
        let b = tmp.path().join("b.png");
        write_png(&a, 20, 10, [0, 0, 0]);
        write_png(&b, 8, 8, [0, 0, 0]);

        let mut source = ImageFileSource::new(vec![a, b]);
        let info = source.open().unwrap();
        assert_eq!(
            info,
            SourceInfo {
                width: 20,
                height: 10,
                total_frames: 2
            }
        );
    }

    #[test]
    fn test_frames_are_rgba_in_order() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.png");
        let b = tmp.path().join("b.png");
        write_png(&a, 4, 4, [255, 0, 0]);
        write_png(&b, 4, 4, [0, 0, 255]);

        let mut source = ImageFileSource::new(vec![a, b]);
        source.open().unwrap();
        let frames: Vec<Frame> = source.frames().map(Result::unwrap).collect();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].format(), PixelFormat::Rgba);
        assert_eq!(&frames[0].data()[..4], &[255, 0, 0, 255]);
        assert_eq!(&frames[1].data()[..4], &[0, 0, 255, 255]);
    }

    #[test]
    fn test_undecodable_file_yields_error() {
        let tmp = TempDir::new().unwrap();
        let bad = tmp.path().join("bad.png");
        std::fs::write(&bad, b"not an image").unwrap();

        let mut source = ImageFileSource::new(vec![bad]);
        let first = source.frames().next().unwrap();
        assert!(first.unwrap_err().to_string().contains("bad.png"));
    }

    #[test]
    fn test_open_without_paths_fails() {
        assert!(ImageFileSource::new(Vec::new()).open().is_err());
    }

    #[test]
    fn test_collect_image_paths_sorted_and_filtered() {
        let tmp = TempDir::new().unwrap();
        write_png(&tmp.path().join("b.png"), 2, 2, [0, 0, 0]);
        std::fs::copy(tmp.path().join("b.png"), tmp.path().join("a.PNG")).unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "x").unwrap();
        std::fs::create_dir(tmp.path().join("sub.png")).unwrap();

        let paths = collect_image_paths(tmp.path()).unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, ["a.PNG", "b.png"]);
    }
}
