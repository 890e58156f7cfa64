//! Public frame types published by the capturers.

use bytes::Bytes;

use kinect_device::Body;

/// Region of a [`VideoFrame`] rewritten by the last conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A BGRA color image.
///
/// The video capturer publishes a reference to its single backing buffer,
/// which it overwrites when the next frame arrives. Subscribers that need a
/// frame beyond their callback must take a [`VideoFrame::snapshot`].
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    /// BGRA pixel data, `width * height * 4` bytes.
    pub data: Vec<u8>,

    /// Frame width in pixels.
    pub width: u32,

    /// Frame height in pixels.
    pub height: u32,

    /// Area rewritten since the buffer was last published.
    pub dirty: Option<DirtyRect>,

    /// Monotonically increasing sequence number.
    pub sequence: u64,
}

impl VideoFrame {
    /// A black frame of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0; Self::bgra_buffer_size(width, height)],
            width,
            height,
            dirty: None,
            sequence: 0,
        }
    }

    /// Wrap existing BGRA data.
    pub fn from_bgra(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            data,
            width,
            height,
            dirty: None,
            sequence: 0,
        }
    }

    /// Calculate expected BGRA buffer size for given dimensions.
    pub fn bgra_buffer_size(width: u32, height: u32) -> usize {
        width as usize * height as usize * 4
    }

    /// Validate that the frame data matches its dimensions.
    pub fn is_valid(&self) -> bool {
        self.data.len() == Self::bgra_buffer_size(self.width, self.height)
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * 4
    }

    /// Mark the whole frame as rewritten.
    pub fn mark_full_frame_dirty(&mut self) {
        self.dirty = Some(DirtyRect {
            x: 0,
            y: 0,
            width: self.width,
            height: self.height,
        });
    }

    /// An owned copy that outlives the next capture.
    pub fn snapshot(&self) -> VideoFrame {
        self.clone()
    }
}

/// One audio sub-frame: raw bytes as delivered by the microphone array.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Sub-frame payload.
    pub data: Bytes,

    /// Declared payload length in bytes.
    pub length: usize,
}

impl AudioFrame {
    /// The declared part of the payload.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.length.min(self.data.len())]
    }
}

/// One skeletal frame: a fixed number of body slots.
#[derive(Debug, Clone, PartialEq)]
pub struct BodySet {
    /// Slots in sensor order. Untracked slots carry no valid joint data.
    pub bodies: Vec<Body>,
}

impl BodySet {
    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.bodies.len()
    }

    /// Tracked bodies with their slot index.
    pub fn tracked(&self) -> impl Iterator<Item = (usize, &Body)> {
        self.bodies
            .iter()
            .enumerate()
            .filter(|(_, body)| body.is_tracked)
    }
}
