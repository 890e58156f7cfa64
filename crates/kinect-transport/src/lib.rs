//! Companion recorder command link.
//!
//! The RFID companion listens for plain-text UDP datagrams. Commands are
//! fire-and-forget: no acknowledgement, no retry.

mod companion;
mod error;

pub use companion::{CompanionCommand, CompanionLink};
pub use error::TransportError;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Default companion endpoint.
pub const DEFAULT_COMPANION_ADDRESS: &str = "127.0.0.1:9999";
