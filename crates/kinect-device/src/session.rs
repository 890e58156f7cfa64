//! Device session: lifecycle of the shared sensor handle.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, instrument, warn};

use kinect_ipc::Notifier;

use crate::error::DeviceError;
use crate::sensor::{Sensor, SensorProvider};
use crate::DeviceResult;

/// Lifecycle of a [`DeviceSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initialized,
    Running,
    Stopped,
    /// Terminal.
    Disposed,
}

/// Owns a handle to the default sensor and its open/close lifecycle.
///
/// Every failure is both returned and published on [`DeviceSession::errors`];
/// open/close transitions are published on [`DeviceSession::status`].
pub struct DeviceSession {
    provider: Arc<dyn SensorProvider>,
    sensor: RwLock<Option<Arc<dyn Sensor>>>,
    state: RwLock<SessionState>,
    errors: Notifier<DeviceError>,
    status: Notifier<bool>,
}

impl DeviceSession {
    /// Create an uninitialized session.
    pub fn new(provider: Arc<dyn SensorProvider>) -> Self {
        Self {
            provider,
            sensor: RwLock::new(None),
            state: RwLock::new(SessionState::Uninitialized),
            errors: Notifier::new(),
            status: Notifier::new(),
        }
    }

    /// Failure notifications.
    pub fn errors(&self) -> &Notifier<DeviceError> {
        &self.errors
    }

    /// Open/close notifications carrying the new state.
    pub fn status(&self) -> &Notifier<bool> {
        &self.status
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Whether this session has opened the sensor and not stopped since.
    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }

    /// The acquired sensor.
    pub fn sensor(&self) -> DeviceResult<Arc<dyn Sensor>> {
        self.sensor.read().clone().ok_or(DeviceError::NotInitialized)
    }

    /// Acquire the default sensor. No-op once a sensor is held.
    #[instrument(name = "device_initialize", skip(self))]
    pub fn initialize(&self) -> DeviceResult<()> {
        match self.state() {
            SessionState::Disposed => return self.fail(DeviceError::Disposed),
            SessionState::Uninitialized => {}
            _ => {
                debug!("Session already initialized");
                return Ok(());
            }
        }

        let Some(sensor) = self.provider.default_sensor() else {
            return self.fail(DeviceError::DeviceNotFound);
        };

        *self.sensor.write() = Some(sensor);
        *self.state.write() = SessionState::Initialized;
        debug!("Sensor acquired");
        Ok(())
    }

    /// Open the hardware channel. Idempotent.
    #[instrument(name = "device_start", skip(self))]
    pub fn start(&self) -> DeviceResult<()> {
        if self.state() == SessionState::Disposed {
            return self.fail(DeviceError::Disposed);
        }

        let sensor = match self.sensor() {
            Ok(sensor) => sensor,
            Err(e) => return self.fail(e),
        };

        let was_open = sensor.is_open();
        if !was_open {
            if let Err(e) = sensor.open() {
                return self.fail(e);
            }
        }

        let was_running = {
            let mut state = self.state.write();
            let was_running = *state == SessionState::Running;
            *state = SessionState::Running;
            was_running
        };

        if !was_open || !was_running {
            info!("Sensor channel open");
            self.status.emit(&true);
        }
        Ok(())
    }

    /// Close the hardware channel. Idempotent.
    #[instrument(name = "device_stop", skip(self))]
    pub fn stop(&self) -> DeviceResult<()> {
        let Some(sensor) = self.sensor.read().clone() else {
            return Ok(());
        };

        let was_open = sensor.is_open();
        if was_open {
            if let Err(e) = sensor.close() {
                return self.fail(e);
            }
        }

        let was_running = {
            let mut state = self.state.write();
            let was_running = *state == SessionState::Running;
            if *state != SessionState::Disposed {
                *state = SessionState::Stopped;
            }
            was_running
        };

        if was_open || was_running {
            info!("Sensor channel closed");
            self.status.emit(&false);
        }
        Ok(())
    }

    /// Stop, then release the sensor handle. Terminal.
    pub fn dispose(&self) {
        if self.state() == SessionState::Disposed {
            return;
        }

        if let Err(e) = self.stop() {
            warn!("Sensor close failed during dispose: {}", e);
        }

        self.sensor.write().take();
        *self.state.write() = SessionState::Disposed;
        debug!("Device session disposed");
    }

    fn fail(&self, error: DeviceError) -> DeviceResult<()> {
        warn!("Device session error: {}", error);
        self.errors.emit(&error);
        Err(error)
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.dispose();
    }
}
