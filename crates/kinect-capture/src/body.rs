//! Skeletal tracking capturer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, instrument};

use kinect_device::{Body, CoordinateMapper, FrameArrivedArgs, FrameReader, RawBodyFrame, SensorProvider};
use kinect_ipc::{Modality, Notifier};

use crate::error::CaptureError;
use crate::frame::BodySet;
use crate::lifecycle::{publish, CaptureCore};
use crate::Capturer;

struct BodyShared {
    frames: Notifier<BodySet>,
    errors: Arc<Notifier<CaptureError>>,
    capacity: AtomicUsize,
}

/// Publishes a fresh [`BodySet`] for every skeletal frame.
pub struct BodyCapturer {
    core: CaptureCore,
    reader: Mutex<Option<FrameReader<RawBodyFrame>>>,
    mapper: Mutex<Option<Arc<dyn CoordinateMapper>>>,
    shared: Arc<BodyShared>,
}

impl BodyCapturer {
    /// Create an uninitialized capturer for the provider's default sensor.
    pub fn new(provider: Arc<dyn SensorProvider>) -> Self {
        let core = CaptureCore::new(Modality::Body, provider);
        let shared = Arc::new(BodyShared {
            frames: Notifier::new(),
            errors: core.error_sink(),
            capacity: AtomicUsize::new(0),
        });

        Self {
            core,
            reader: Mutex::new(None),
            mapper: Mutex::new(None),
            shared,
        }
    }

    /// The sensor's camera-to-color mapper, once initialized.
    pub fn coordinate_mapper(&self) -> Option<Arc<dyn CoordinateMapper>> {
        self.mapper.lock().clone()
    }

    /// Body slots per published set.
    pub fn capacity(&self) -> usize {
        self.shared.capacity.load(Ordering::SeqCst)
    }

    fn on_body_frame_arrived(shared: &BodyShared, args: &FrameArrivedArgs<RawBodyFrame>) {
        let Some(frame) = args.acquire_frame() else {
            return;
        };

        let mut bodies = vec![Body::untracked(); shared.capacity.load(Ordering::SeqCst)];
        if let Err(e) = frame.get_and_refresh_body_data(&mut bodies) {
            publish(Modality::Body, &shared.errors, e.into());
            return;
        }

        shared.frames.emit(&BodySet { bodies });
    }
}

impl Capturer for BodyCapturer {
    type Frame = BodySet;

    fn modality(&self) -> Modality {
        self.core.modality()
    }

    #[instrument(name = "body_capturer_initialize", skip(self))]
    fn initialize(&self) {
        let mut reader_slot = self.reader.lock();
        if reader_slot.is_some() {
            debug!("Body capturer already initialized");
            return;
        }

        let Some(sensor) = self.core.initialize_session() else {
            return;
        };

        let reader = match sensor.open_body_reader() {
            Ok(reader) => reader,
            Err(e) => return self.core.acquisition_failed("body", e),
        };

        let capacity = sensor.body_count();
        self.shared.capacity.store(capacity, Ordering::SeqCst);
        *self.mapper.lock() = Some(sensor.coordinate_mapper());

        let shared = Arc::clone(&self.shared);
        reader.subscribe(move |args| Self::on_body_frame_arrived(&shared, args));
        *reader_slot = Some(reader);

        info!(capacity, "Body capturer initialized");
    }

    fn start(&self) {
        self.core.start();
    }

    fn stop(&self) {
        self.core.stop();
    }

    fn dispose(&self) {
        if let Some(reader) = self.reader.lock().take() {
            reader.unsubscribe();
            reader.dispose();
        }
        self.core.dispose_session();
        debug!("Body capturer disposed");
    }

    fn is_running(&self) -> bool {
        self.core.is_running()
    }

    fn frames(&self) -> &Notifier<BodySet> {
        &self.shared.frames
    }

    fn errors(&self) -> &Notifier<CaptureError> {
        self.core.errors()
    }

    fn status(&self) -> &Notifier<bool> {
        self.core.status()
    }
}
