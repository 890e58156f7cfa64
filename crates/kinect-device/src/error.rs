//! Error types for the device module.

use thiserror::Error;

/// Errors that can occur while talking to the sensor.
#[derive(Debug, Clone, Error)]
pub enum DeviceError {
    /// No sensor is connected.
    #[error("No depth sensor detected")]
    DeviceNotFound,

    /// Opening the sensor or one of its readers failed.
    #[error("Acquisition failed: {0}")]
    AcquisitionFailure(String),

    /// Raw frame data could not be converted.
    #[error("Frame conversion error: {0}")]
    FrameConversion(String),

    /// The session has not acquired a sensor yet.
    #[error("Device session not initialized")]
    NotInitialized,

    /// The session was disposed.
    #[error("Device session disposed")]
    Disposed,
}
