//! Recording gate shared by all savers.

use std::sync::atomic::{AtomicBool, Ordering};

use kinect_ipc::Notifier;

/// Recording gate transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingEvent {
    Started,
    Stopped,
}

/// Atomic on/off switch that announces genuine transitions only.
///
/// Toggled from the control thread, read on the capture thread.
#[derive(Debug, Default)]
pub struct RecordingGate {
    open: AtomicBool,
    events: Notifier<RecordingEvent>,
}

impl RecordingGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the gate. Returns true if it was closed.
    pub fn start(&self) -> bool {
        let transitioned = !self.open.swap(true, Ordering::SeqCst);
        if transitioned {
            self.events.emit(&RecordingEvent::Started);
        }
        transitioned
    }

    /// Close the gate. Returns true if it was open.
    pub fn stop(&self) -> bool {
        let transitioned = self.open.swap(false, Ordering::SeqCst);
        if transitioned {
            self.events.emit(&RecordingEvent::Stopped);
        }
        transitioned
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> &Notifier<RecordingEvent> {
        &self.events
    }
}
