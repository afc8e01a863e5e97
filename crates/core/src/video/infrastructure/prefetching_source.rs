use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};

use crate::shared::frame::Frame;
use crate::video::domain::frame_source::{FrameSource, SourceError, SourceInfo};

type FrameResult = Result<Frame, SourceError>;

/// Decodes frames of another source ahead of the consumer on a background
/// thread.
///
/// At most `capacity` decoded frames wait in the queue. Order is preserved
/// and decode errors are forwarded in place of the frame that failed.
pub struct PrefetchingSource {
    inner: Option<Box<dyn FrameSource>>,
    capacity: usize,
    frame_rx: Option<Receiver<FrameResult>>,
    worker: Option<JoinHandle<Box<dyn FrameSource>>>,
}

impl PrefetchingSource {
    pub fn new(inner: Box<dyn FrameSource>, capacity: usize) -> Self {
        Self {
            inner: Some(inner),
            capacity: capacity.max(1),
            frame_rx: None,
            worker: None,
        }
    }
}

fn spawn_decoder(
    mut source: Box<dyn FrameSource>,
    frame_tx: Sender<FrameResult>,
) -> JoinHandle<Box<dyn FrameSource>> {
    std::thread::spawn(move || {
        for frame_result in source.frames() {
            // Receiver gone: the consumer stopped early
            if frame_tx.send(frame_result).is_err() {
                break;
            }
        }
        source.close();
        source
    })
}

impl FrameSource for PrefetchingSource {
    fn open(&mut self) -> Result<SourceInfo, SourceError> {
        let inner = self
            .inner
            .as_mut()
            .ok_or("prefetching source is already decoding")?;
        inner.open()
    }

    fn frames(&mut self) -> Box<dyn Iterator<Item = FrameResult> + '_> {
        if let Some(inner) = self.inner.take() {
            let (frame_tx, frame_rx) = crossbeam_channel::bounded(self.capacity);
            self.worker = Some(spawn_decoder(inner, frame_tx));
            self.frame_rx = Some(frame_rx);
        }
        match &self.frame_rx {
            Some(rx) => Box::new(rx.iter()),
            None => Box::new(std::iter::empty()),
        }
    }

    fn close(&mut self) {
        // Dropping the receiver unblocks a worker waiting on a full queue.
        self.frame_rx = None;
        if let Some(worker) = self.worker.take() {
            match worker.join() {
                Ok(source) => self.inner = Some(source),
                Err(_) => log::error!("Frame decoding thread panicked"),
            }
        } else if let Some(inner) = self.inner.as_mut() {
            inner.close();
        }
    }
}

impl Drop for PrefetchingSource {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::frame::PixelFormat;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSource {
        frames: usize,
        fail_at: Option<usize>,
        decoded: Arc<AtomicUsize>,
        closed: Arc<AtomicBool>,
    }

    impl CountingSource {
        fn new(frames: usize) -> Self {
            Self {
                frames,
                fail_at: None,
                decoded: Arc::new(AtomicUsize::new(0)),
                closed: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    impl FrameSource for CountingSource {
        fn open(&mut self) -> Result<SourceInfo, SourceError> {
            Ok(SourceInfo {
                width: 2,
                height: 1,
                total_frames: self.frames,
            })
        }

        fn frames(&mut self) -> Box<dyn Iterator<Item = FrameResult> + '_> {
            let decoded = self.decoded.clone();
            let fail_at = self.fail_at;
            Box::new((0..self.frames).map(move |i| {
                decoded.fetch_add(1, Ordering::SeqCst);
                if Some(i) == fail_at {
                    return Err(format!("frame {i} is corrupt").into());
                }
                Ok(Frame::new(vec![i as u8; 2], 2, 1, PixelFormat::Gray8).unwrap())
            }))
        }

        fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_preserves_order() {
        let mut source = PrefetchingSource::new(Box::new(CountingSource::new(20)), 3);
        assert_eq!(source.open().unwrap().total_frames, 20);

        let values: Vec<u8> = source
            .frames()
            .map(|f| f.unwrap().data()[0])
            .collect();
        assert_eq!(values, (0..20).collect::<Vec<u8>>());
        source.close();
    }

    #[test]
    fn test_forwards_errors_in_place() {
        let mut inner = CountingSource::new(4);
        inner.fail_at = Some(2);
        let mut source = PrefetchingSource::new(Box::new(inner), 2);

        let results: Vec<_> = source.frames().collect();
        assert_eq!(results.len(), 4);
        assert!(results[1].is_ok());
        assert_eq!(results[2].as_ref().unwrap_err().to_string(), "frame 2 is corrupt");
        assert!(results[3].is_ok());
    }

    #[test]
    fn test_close_after_early_stop_joins_worker() {
        let inner = CountingSource::new(1000);
        let decoded = inner.decoded.clone();
        let closed = inner.closed.clone();
        let mut source = PrefetchingSource::new(Box::new(inner), 2);

        let first: Vec<_> = source.frames().take(3).collect();
        assert_eq!(first.len(), 3);
        source.close();

        assert!(closed.load(Ordering::SeqCst));
        // Bounded queue: the worker cannot run far ahead of the consumer
        assert!(decoded.load(Ordering::SeqCst) < 1000);
    }

    #[test]
    fn test_close_without_frames_closes_inner() {
        let inner = CountingSource::new(3);
        let closed = inner.closed.clone();
        let mut source = PrefetchingSource::new(Box::new(inner), 2);
        source.open().unwrap();
        source.close();
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_open_while_decoding_fails() {
        let mut source = PrefetchingSource::new(Box::new(CountingSource::new(3)), 2);
        let _ = source.frames().count();
        assert!(source.open().is_err());
    }
}
