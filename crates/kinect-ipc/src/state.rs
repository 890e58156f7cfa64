//! Engine state machine types.

use serde::{Deserialize, Serialize};

use crate::types::Modality;

/// The current state of the recording engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    /// No sensor connected.
    #[default]
    Disconnected,

    /// Capturers are running, nothing is persisted.
    Connected,

    /// One or more savers are persisting.
    Recording {
        /// Modalities whose saver started successfully.
        modalities: Vec<Modality>,
    },
}

impl EngineState {
    /// Returns true if no sensor is connected.
    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// Returns true if capturers are running (recording or not).
    pub fn is_connected(&self) -> bool {
        !self.is_disconnected()
    }

    /// Returns true if any saver is active.
    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording { .. })
    }

    /// Returns a simple string representation of the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connected => "Connected",
            Self::Recording { .. } => "Recording",
        }
    }
}
