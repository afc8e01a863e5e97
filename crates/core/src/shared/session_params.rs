/// Fixed geometry and timing of one encoding session.
///
/// All fields are strictly positive; [`SessionParams::new`] is the only way
/// to build one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionParams {
    width: u32,
    height: u32,
    frame_rate: u32,
}

impl SessionParams {
    pub fn new(width: u32, height: u32, frame_rate: u32) -> Result<Self, String> {
        if width == 0 || height == 0 {
            return Err(format!("frame size must be positive, got {width}x{height}"));
        }
        if frame_rate == 0 {
            return Err("frame rate must be positive".to_string());
        }
        Ok(Self {
            width,
            height,
            frame_rate,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_construction() {
        let params = SessionParams::new(1920, 1080, 30).unwrap();
        assert_eq!(params.width(), 1920);
        assert_eq!(params.height(), 1080);
        assert_eq!(params.frame_rate(), 30);
    }

    #[rstest]
    #[case::zero_width(0, 48, 30)]
    #[case::zero_height(64, 0, 30)]
    #[case::zero_fps(64, 48, 0)]
    fn test_rejects_non_positive(#[case] w: u32, #[case] h: u32, #[case] fps: u32) {
        assert!(SessionParams::new(w, h, fps).is_err());
    }

    #[test]
    fn test_error_mentions_size() {
        let err = SessionParams::new(0, 48, 30).unwrap_err();
        assert!(err.contains("0x48"));
    }
}
