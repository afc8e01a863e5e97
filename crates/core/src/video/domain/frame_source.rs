use crate::shared::frame::Frame;

pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// What a source knows about its frames before decoding them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceInfo {
    pub width: u32,
    pub height: u32,
    pub total_frames: usize,
}

/// Supplies frames to be encoded, in presentation order.
///
/// Where the pixels come from (files, renderers, cameras) is up to the
/// implementation.
pub trait FrameSource: Send {
    /// Prepares the source and reports the size of its first frame.
    fn open(&mut self) -> Result<SourceInfo, SourceError>;

    /// Returns an iterator over the remaining frames.
    fn frames(&mut self) -> Box<dyn Iterator<Item = Result<Frame, SourceError>> + '_>;

    /// Releases any resources held by the source.
    fn close(&mut self);
}
