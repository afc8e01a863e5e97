pub const DEFAULT_FRAME_RATE: u32 = 25;

pub const DEFAULT_BIT_RATE: u64 = 400_000;

/// 0 makes every frame an intra frame.
pub const DEFAULT_GOP_SIZE: u32 = 0;

/// x264 constant rate factor used for H.264 profiles (0 = lossless).
pub const DEFAULT_H264_CRF: u32 = 0;

/// Sequence end code appended to legacy raw MPEG elementary streams.
pub const MPEG_SEQUENCE_END_CODE: [u8; 4] = [0x00, 0x00, 0x01, 0xb7];

/// Muxer used when the container cannot be guessed from the target name.
pub const FALLBACK_CONTAINER: &str = "mpeg";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

pub const SEQUENCE_FRAME_PREFIX: &str = "frame_";
