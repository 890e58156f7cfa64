//! Typed shell<->engine messages for the Kinect recording tool.
//!
//! This crate defines the message types exchanged between the operator
//! shell and the engine core, the session configuration, and the
//! [`Notifier`] observer list every pipeline stage uses to publish events.

mod commands;
mod events;
mod notify;
mod state;
mod types;

pub use commands::EngineCommand;
pub use events::EngineEvent;
pub use notify::{Notifier, SubscriptionId};
pub use state::EngineState;
pub use types::{
    AudioOutputConfig, BodyOutputConfig, CompanionConfig, Modality, OutputDirs, RenderConfig,
    SessionConfig, VideoOutputConfig,
};

use crossbeam_channel::{Receiver, Sender};

/// Channel capacity for commands (shell → engine).
pub const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Channel capacity for events (engine → shell).
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Creates a bounded command channel.
pub fn command_channel() -> (Sender<EngineCommand>, Receiver<EngineCommand>) {
    crossbeam_channel::bounded(COMMAND_CHANNEL_CAPACITY)
}

/// Creates a bounded event channel.
pub fn event_channel() -> (Sender<EngineEvent>, Receiver<EngineEvent>) {
    crossbeam_channel::bounded(EVENT_CHANNEL_CAPACITY)
}
