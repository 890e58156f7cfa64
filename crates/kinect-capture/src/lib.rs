//! Video, audio and body capturers for the depth sensor.
//!
//! Each capturer composes a [`DeviceSession`](kinect_device::DeviceSession),
//! opens one frame reader, converts every raw frame to a consumer-ready type
//! and publishes it on its [`Capturer::frames`] notifier. Failures never
//! escape to the caller; they are published on [`Capturer::errors`].

mod audio;
mod body;
mod error;
mod frame;
mod lifecycle;
mod video;

pub use audio::AudioCapturer;
pub use body::BodyCapturer;
pub use error::CaptureError;
pub use frame::{AudioFrame, BodySet, DirtyRect, VideoFrame};
pub use video::VideoCapturer;

use kinect_ipc::{Modality, Notifier};

/// Result type for capture operations.
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Lifecycle shared by every capturer.
pub trait Capturer: Send + Sync {
    /// Frame type published per arrival.
    type Frame;

    /// Which stream this capturer reads.
    fn modality(&self) -> Modality;

    /// Acquire the sensor, open the reader and install the frame handler.
    fn initialize(&self);

    /// Open the sensor channel.
    fn start(&self);

    /// Close the sensor channel.
    fn stop(&self);

    /// Unsubscribe, release the reader, then stop the session.
    fn dispose(&self);

    /// Whether the sensor channel is open for this capturer.
    fn is_running(&self) -> bool;

    /// Frame-arrived notifications.
    fn frames(&self) -> &Notifier<Self::Frame>;

    /// Failure notifications.
    fn errors(&self) -> &Notifier<CaptureError>;

    /// Open/close notifications.
    fn status(&self) -> &Notifier<bool>;
}
