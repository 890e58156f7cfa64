//! Frame readers: the driver's per-modality delivery channel.
//!
//! The driver pushes frames through a [`ReaderFeed`]; the consumer side is a
//! [`FrameReader`] with at most one handler. Each delivery hands the handler
//! a [`FrameArrivedArgs`] whose frame must be acquired before use. The
//! acquired frame is an RAII guard and is released when dropped, on every
//! exit path of the handler.

use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

type Handler<T> = Arc<dyn Fn(&FrameArrivedArgs<T>) + Send + Sync>;

/// Acquisition bookkeeping shared by a reader and the frames it hands out.
#[derive(Debug, Default)]
struct FrameCounters {
    acquired: AtomicU64,
    released: AtomicU64,
}

struct ReaderShared<T> {
    handler: Mutex<Option<Handler<T>>>,
    disposed: AtomicBool,
    counters: Arc<FrameCounters>,
}

/// Consumer end of a modality stream.
pub struct FrameReader<T> {
    shared: Arc<ReaderShared<T>>,
}

/// Driver end of a modality stream.
pub struct ReaderFeed<T> {
    shared: Arc<ReaderShared<T>>,
}

impl<T> Clone for ReaderFeed<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Create a connected reader/feed pair.
pub fn frame_channel<T>() -> (FrameReader<T>, ReaderFeed<T>) {
    let shared = Arc::new(ReaderShared {
        handler: Mutex::new(None),
        disposed: AtomicBool::new(false),
        counters: Arc::new(FrameCounters::default()),
    });

    (
        FrameReader {
            shared: Arc::clone(&shared),
        },
        ReaderFeed { shared },
    )
}

impl<T> FrameReader<T> {
    /// Install the frame handler, replacing any previous one.
    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(&FrameArrivedArgs<T>) + Send + Sync + 'static,
    {
        *self.shared.handler.lock() = Some(Arc::new(handler));
    }

    /// Remove the frame handler.
    pub fn unsubscribe(&self) {
        self.shared.handler.lock().take();
    }

    /// Stop delivery permanently.
    pub fn dispose(&self) {
        self.unsubscribe();
        self.shared.disposed.store(true, Ordering::SeqCst);
    }

    /// Returns true once [`FrameReader::dispose`] was called.
    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::SeqCst)
    }

    /// Frames acquired by the handler so far.
    pub fn acquired_frames(&self) -> u64 {
        self.shared.counters.acquired.load(Ordering::SeqCst)
    }

    /// Acquired frames that have not been released yet.
    pub fn outstanding_frames(&self) -> u64 {
        let acquired = self.shared.counters.acquired.load(Ordering::SeqCst);
        let released = self.shared.counters.released.load(Ordering::SeqCst);
        acquired - released
    }
}

impl<T> Drop for FrameReader<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T> ReaderFeed<T> {
    /// Hand a frame (or an empty reference) to the reader's handler.
    ///
    /// Runs the handler synchronously on the calling thread. Returns false
    /// once the reader has been disposed, so the driver can forget the feed.
    pub fn deliver(&self, frame: Option<T>) -> bool {
        if self.shared.disposed.load(Ordering::SeqCst) {
            return false;
        }

        let handler = self.shared.handler.lock().clone();
        if let Some(handler) = handler {
            let args = FrameArrivedArgs {
                frame: Mutex::new(frame),
                counters: Arc::clone(&self.shared.counters),
            };
            handler(&args);
        } else {
            trace!("Frame delivered with no handler installed");
        }

        true
    }

    /// Returns true while the reader side is alive.
    pub fn is_connected(&self) -> bool {
        !self.shared.disposed.load(Ordering::SeqCst)
    }
}

/// Arguments of one frame-arrived callback.
pub struct FrameArrivedArgs<T> {
    frame: Mutex<Option<T>>,
    counters: Arc<FrameCounters>,
}

impl<T> FrameArrivedArgs<T> {
    /// Take ownership of the frame. Returns `None` if the frame is empty or
    /// was already acquired.
    pub fn acquire_frame(&self) -> Option<AcquiredFrame<T>> {
        let frame = self.frame.lock().take()?;
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        Some(AcquiredFrame {
            frame,
            counters: Arc::clone(&self.counters),
        })
    }
}

/// A frame held by a handler. Released on drop.
pub struct AcquiredFrame<T> {
    frame: T,
    counters: Arc<FrameCounters>,
}

impl<T> Deref for AcquiredFrame<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.frame
    }
}

impl<T> Drop for AcquiredFrame<T> {
    fn drop(&mut self) {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_acquired_frame_released_on_early_return() {
        let (reader, feed) = frame_channel::<u32>();
        let seen = Arc::new(AtomicUsize::new(0));

        let seen_in = Arc::clone(&seen);
        reader.subscribe(move |args| {
            let Some(frame) = args.acquire_frame() else {
                return;
            };
            if *frame == 0 {
                return;
            }
            seen_in.fetch_add(1, Ordering::SeqCst);
        });

        assert!(feed.deliver(Some(0)));
        assert!(feed.deliver(Some(5)));
        assert!(feed.deliver(None));

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(reader.acquired_frames(), 2);
        assert_eq!(reader.outstanding_frames(), 0);
    }

    #[test]
    fn test_frame_can_only_be_acquired_once() {
        let (reader, feed) = frame_channel::<u32>();
        reader.subscribe(|args| {
            let first = args.acquire_frame();
            assert!(first.is_some());
            assert!(args.acquire_frame().is_none());
        });
        feed.deliver(Some(1));
        assert_eq!(reader.outstanding_frames(), 0);
    }

    #[test]
    fn test_dispose_disconnects_feed() {
        let (reader, feed) = frame_channel::<u32>();
        reader.subscribe(|_| panic!("disposed reader must not be called"));
        reader.dispose();

        assert!(!feed.is_connected());
        assert!(!feed.deliver(Some(1)));
    }

    #[test]
    fn test_dropping_reader_disconnects_feed() {
        let (reader, feed) = frame_channel::<u32>();
        drop(reader);
        assert!(!feed.deliver(Some(1)));
    }
}
