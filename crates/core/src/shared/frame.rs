use ndarray::{ArrayView3, ShapeBuilder};
use thiserror::Error;

/// Memory layout of one pixel in a [`Frame`] buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 32-bit B, G, R, A byte order (little-endian ARGB32 images).
    Bgra,
    Rgba,
    Rgb24,
    Bgr24,
    Gray8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Bgra | PixelFormat::Rgba => 4,
            PixelFormat::Rgb24 | PixelFormat::Bgr24 => 3,
            PixelFormat::Gray8 => 1,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameLayoutError {
    #[error("stride {stride} is shorter than one packed row ({row_bytes} bytes)")]
    StrideTooShort { stride: usize, row_bytes: usize },
    #[error("buffer holds {actual} bytes, layout needs at least {required}")]
    BufferTooShort { actual: usize, required: usize },
}

/// A caller-supplied image to append to a video.
///
/// Rows may be padded: `stride` is the distance in bytes between the starts
/// of consecutive rows. Format conversion to whatever the encoder wants is
/// the backend's job; the sink only looks at the dimensions.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    stride: usize,
    format: PixelFormat,
}

impl Frame {
    /// Builds a frame from tightly packed rows.
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<Self, FrameLayoutError> {
        let stride = width as usize * format.bytes_per_pixel();
        Self::with_stride(data, width, height, stride, format)
    }

    /// Builds a frame whose rows are `stride` bytes apart.
    pub fn with_stride(
        data: Vec<u8>,
        width: u32,
        height: u32,
        stride: usize,
        format: PixelFormat,
    ) -> Result<Self, FrameLayoutError> {
        let row_bytes = width as usize * format.bytes_per_pixel();
        if stride < row_bytes {
            return Err(FrameLayoutError::StrideTooShort { stride, row_bytes });
        }
        let required = match height as usize {
            0 => 0,
            h => stride * (h - 1) + row_bytes,
        };
        if data.len() < required {
            return Err(FrameLayoutError::BufferTooShort {
                actual: data.len(),
                required,
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
            format,
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Number of meaningful bytes in each row (excludes padding).
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// Iterates over the packed pixel bytes of each row, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> + '_ {
        let row_bytes = self.row_bytes();
        (0..self.height as usize).map(move |y| {
            let start = y * self.stride;
            &self.data[start..start + row_bytes]
        })
    }

    /// Stride-aware `(height, width, channels)` view of the pixel data.
    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        let channels = self.format.bytes_per_pixel();
        let shape = (self.height as usize, self.width as usize, channels)
            .strides((self.stride, channels, 1));
        ArrayView3::from_shape(shape, &self.data)
            .expect("Frame data length must match dimensions")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::bgra(PixelFormat::Bgra, 4)]
    #[case::rgba(PixelFormat::Rgba, 4)]
    #[case::rgb(PixelFormat::Rgb24, 3)]
    #[case::bgr(PixelFormat::Bgr24, 3)]
    #[case::gray(PixelFormat::Gray8, 1)]
    fn test_bytes_per_pixel(#[case] format: PixelFormat, #[case] expected: usize) {
        assert_eq!(format.bytes_per_pixel(), expected);
    }

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 16]; // 2x2x4
        let frame = Frame::new(data.clone(), 2, 2, PixelFormat::Bgra).unwrap();
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.stride(), 8);
        assert_eq!(frame.format(), PixelFormat::Bgra);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    fn test_new_rejects_short_buffer() {
        let err = Frame::new(vec![0u8; 16], 64, 48, PixelFormat::Bgra).unwrap_err();
        assert_eq!(
            err,
            FrameLayoutError::BufferTooShort {
                actual: 16,
                required: 64 * 48 * 4
            }
        );
    }

    #[test]
    fn test_with_stride_accepts_padded_rows() {
        // 2x2 RGB with 2 bytes of padding per row; last row may omit padding
        let data = vec![0u8; 8 + 6];
        let frame = Frame::with_stride(data, 2, 2, 8, PixelFormat::Rgb24).unwrap();
        assert_eq!(frame.stride(), 8);
        assert_eq!(frame.row_bytes(), 6);
    }

    #[test]
    fn test_with_stride_rejects_short_stride() {
        let err = Frame::with_stride(vec![0u8; 32], 4, 2, 12, PixelFormat::Bgra).unwrap_err();
        assert_eq!(
            err,
            FrameLayoutError::StrideTooShort {
                stride: 12,
                row_bytes: 16
            }
        );
    }

    #[test]
    fn test_with_stride_rejects_short_buffer() {
        let err = Frame::with_stride(vec![0u8; 10], 2, 2, 8, PixelFormat::Rgb24).unwrap_err();
        assert_eq!(
            err,
            FrameLayoutError::BufferTooShort {
                actual: 10,
                required: 14
            }
        );
    }

    #[test]
    fn test_rows_skip_padding() {
        // 1x2 gray with stride 3: rows are [1] and [2]
        let frame = Frame::with_stride(vec![1, 9, 9, 2], 1, 2, 3, PixelFormat::Gray8).unwrap();
        let rows: Vec<&[u8]> = frame.rows().collect();
        assert_eq!(rows, vec![&[1u8][..], &[2u8][..]]);
    }

    #[test]
    fn test_as_ndarray_shape() {
        let frame = Frame::new(vec![0u8; 24], 4, 2, PixelFormat::Rgb24).unwrap();
        let arr = frame.as_ndarray();
        assert_eq!(arr.shape(), &[2, 4, 3]); // (height, width, channels)
    }

    #[test]
    fn test_as_ndarray_honors_stride() {
        // 2x2 BGRA, stride 12 (4 bytes padding per row)
        let mut data = vec![0u8; 12 + 8];
        data[12] = 7; // row=1, col=0, B
        let frame = Frame::with_stride(data, 2, 2, 12, PixelFormat::Bgra).unwrap();
        let arr = frame.as_ndarray();
        assert_eq!(arr[[1, 0, 0]], 7);
        assert_eq!(arr[[0, 0, 0]], 0);
    }

    #[test]
    fn test_clone_is_independent() {
        let frame = Frame::new(vec![100u8; 12], 2, 2, PixelFormat::Rgb24).unwrap();
        let cloned = frame.clone();
        assert_eq!(frame.data(), cloned.data());
        assert_eq!(frame.stride(), cloned.stride());
    }
}
