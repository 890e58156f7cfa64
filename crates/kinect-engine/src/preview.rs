//! Latest-frame handoff to the display thread.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use kinect_capture::VideoFrame;
use kinect_render::Drawing;

/// Holds the most recent value published by a capture thread.
///
/// Older values are overwritten, never queued.
#[derive(Debug)]
pub struct PreviewSlot<T> {
    latest: Mutex<Option<T>>,
    published: AtomicU64,
}

impl<T> PreviewSlot<T> {
    pub fn new() -> Self {
        Self {
            latest: Mutex::new(None),
            published: AtomicU64::new(0),
        }
    }

    /// Replace the held value.
    pub fn publish(&self, value: T) {
        *self.latest.lock() = Some(value);
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    /// Take the held value, leaving the slot empty.
    pub fn take(&self) -> Option<T> {
        self.latest.lock().take()
    }

    /// Number of values published so far.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Drop the held value.
    pub fn clear(&self) {
        self.latest.lock().take();
    }
}

impl<T: Clone> PreviewSlot<T> {
    /// Copy of the held value.
    pub fn latest(&self) -> Option<T> {
        self.latest.lock().clone()
    }
}

impl<T> Default for PreviewSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Preview outputs of a session.
#[derive(Debug, Default)]
pub struct Previews {
    /// Latest color frame.
    pub video: PreviewSlot<VideoFrame>,

    /// Latest skeleton overlay.
    pub skeleton: PreviewSlot<Drawing>,
}

impl Previews {
    pub fn clear(&self) {
        self.video.clear();
        self.skeleton.clear();
    }
}
