//! Error types for the capture module.

use thiserror::Error;

use kinect_device::DeviceError;

/// Errors published by capturers.
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    /// Device session failure (not found, open/close failure).
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// Opening or subscribing the frame reader failed.
    #[error("Failed to open {stream} reader: {message}")]
    Acquisition {
        stream: &'static str,
        message: String,
    },

    /// A delivered frame could not be converted.
    #[error("Frame conversion error: {0}")]
    FrameConversion(String),
}
