//! Commands sent from the shell to the engine.

use serde::{Deserialize, Serialize};

/// Commands that the shell can send to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineCommand {
    /// Open the sensor and start all capturers.
    Connect,

    /// Stop recording if active, then release every capturer.
    Disconnect,

    /// Create the savers and start persisting every modality.
    StartRecording,

    /// Stop persisting and close the output files.
    StopRecording,

    /// Request current engine state.
    GetState,

    /// Shutdown the engine completely.
    Shutdown,
}
