//! Core orchestrator for the Kinect recording tool.
//!
//! This crate composes the device session, capturers, savers, skeleton
//! renderer and companion link into one engine driven by shell commands.

mod orchestrator;
mod preview;
mod state;

pub use orchestrator::Engine;
pub use preview::{PreviewSlot, Previews};
pub use state::{CaptureSlot, ResourceManager, SaverSlot, SessionResources};

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

use kinect_device::SensorProvider;
use kinect_ipc::{EngineCommand, EngineEvent, SessionConfig};

/// Create an engine instance with IPC channels.
pub fn create_engine(
    command_rx: Receiver<EngineCommand>,
    event_tx: Sender<EngineEvent>,
    config: SessionConfig,
    provider: Arc<dyn SensorProvider>,
) -> Engine {
    Engine::new(command_rx, event_tx, config, provider)
}
