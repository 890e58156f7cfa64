//! Session handling shared by every capturer.

use std::sync::Arc;

use tracing::{debug, warn};

use kinect_device::{DeviceError, DeviceSession, Sensor, SensorProvider, SessionState};
use kinect_ipc::{Modality, Notifier};

use crate::error::CaptureError;

/// Owns the device session and error channel of one capturer.
pub(crate) struct CaptureCore {
    modality: Modality,
    session: DeviceSession,
    errors: Arc<Notifier<CaptureError>>,
}

impl CaptureCore {
    pub(crate) fn new(modality: Modality, provider: Arc<dyn SensorProvider>) -> Self {
        Self {
            modality,
            session: DeviceSession::new(provider),
            errors: Arc::new(Notifier::new()),
        }
    }

    pub(crate) fn modality(&self) -> Modality {
        self.modality
    }

    /// Ready the session and hand back its sensor. Failures are published.
    pub(crate) fn initialize_session(&self) -> Option<Arc<dyn Sensor>> {
        match self.session.initialize().and_then(|()| self.session.sensor()) {
            Ok(sensor) => Some(sensor),
            Err(e) => {
                self.publish(e.into());
                None
            }
        }
    }

    /// Open the sensor channel. Does nothing if no sensor was acquired;
    /// initialize already published that failure.
    pub(crate) fn start(&self) {
        if self.session.state() == SessionState::Uninitialized {
            debug!(modality = %self.modality, "No sensor acquired, not starting");
            return;
        }
        if let Err(e) = self.session.start() {
            self.publish(e.into());
        }
    }

    pub(crate) fn stop(&self) {
        if let Err(e) = self.session.stop() {
            self.publish(e.into());
        }
    }

    pub(crate) fn dispose_session(&self) {
        self.session.dispose();
    }

    pub(crate) fn is_running(&self) -> bool {
        self.session.is_running()
    }

    pub(crate) fn status(&self) -> &Notifier<bool> {
        self.session.status()
    }

    pub(crate) fn errors(&self) -> &Notifier<CaptureError> {
        &self.errors
    }

    /// Error channel handle for frame handlers.
    pub(crate) fn error_sink(&self) -> Arc<Notifier<CaptureError>> {
        Arc::clone(&self.errors)
    }

    /// Wrap a reader-open failure.
    pub(crate) fn acquisition_failed(&self, stream: &'static str, error: DeviceError) {
        self.publish(CaptureError::Acquisition {
            stream,
            message: error.to_string(),
        });
    }

    pub(crate) fn publish(&self, error: CaptureError) {
        publish(self.modality, &self.errors, error);
    }
}

/// Log and publish a capture error.
pub(crate) fn publish(modality: Modality, errors: &Notifier<CaptureError>, error: CaptureError) {
    warn!(%modality, "Capture error: {}", error);
    errors.emit(&error);
}
