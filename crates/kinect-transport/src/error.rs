//! Error types for the transport module.

use thiserror::Error;

/// Errors that can occur on the companion link.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Companion address did not resolve.
    #[error("Invalid companion address: {0}")]
    InvalidAddress(String),

    /// Local socket could not be bound.
    #[error("Bind failed: {0}")]
    Bind(#[source] std::io::Error),

    /// Datagram could not be sent.
    #[error("Send failed: {0}")]
    Send(#[source] std::io::Error),
}
