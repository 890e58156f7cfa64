//! Error types for the saver module.

use thiserror::Error;

/// Errors that can occur while creating or writing a recording.
#[derive(Debug, Error)]
pub enum SaverError {
    /// Output directory or file operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WAV container error.
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// Video encoder process failed.
    #[error("Encoder error: {0}")]
    Encoder(String),

    /// A frame could not be converted to the output format.
    #[error("Frame conversion error: {0}")]
    FrameConversion(String),

    /// Requested output format is not supported.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}
