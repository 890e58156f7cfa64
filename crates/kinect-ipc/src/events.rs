//! Events sent from the engine to the shell.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::state::EngineState;
use crate::types::Modality;

/// Events that the engine can send to the shell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineEvent {
    /// Engine state has changed.
    StateChanged {
        /// Previous state.
        previous: Box<EngineState>,

        /// Current state.
        current: Box<EngineState>,
    },

    /// A single user-facing notice (connect, disconnect, record toggles).
    Notice(String),

    /// Error occurred in a pipeline stage.
    Error {
        /// Modality the error belongs to, if any.
        modality: Option<Modality>,

        /// Error message.
        message: String,
    },

    /// A saver opened its file and started persisting.
    RecordingStarted {
        /// Modality being recorded.
        modality: Modality,

        /// Output file.
        path: PathBuf,
    },

    /// A saver stopped and closed its file.
    RecordingStopped {
        /// Modality that stopped.
        modality: Modality,
    },

    /// Engine is ready.
    Ready,

    /// Engine has shut down.
    Shutdown,
}
