pub mod backend_factory;
pub mod encoder_options;
pub mod ffmpeg_container_backend;
mod ffmpeg_encoder;
pub mod ffmpeg_raw_backend;
pub mod ffmpeg_runtime;
pub mod image_file_source;
pub mod image_sequence_backend;
pub mod prefetching_source;

pub use ffmpeg_encoder::VideoCodec;
