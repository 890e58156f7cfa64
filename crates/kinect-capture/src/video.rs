//! Color stream capturer.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, instrument, trace};

use kinect_device::{ColorImageFormat, FrameArrivedArgs, FrameReader, RawColorFrame, SensorProvider};
use kinect_ipc::{Modality, Notifier};

use crate::error::CaptureError;
use crate::frame::VideoFrame;
use crate::lifecycle::{publish, CaptureCore};
use crate::Capturer;

struct VideoShared {
    frames: Notifier<VideoFrame>,
    /// Allocated once at initialize, overwritten by every frame.
    bitmap: Mutex<Option<VideoFrame>>,
    errors: Arc<Notifier<CaptureError>>,
}

/// Converts color frames to BGRA into a reused buffer and publishes it.
pub struct VideoCapturer {
    core: CaptureCore,
    reader: Mutex<Option<FrameReader<RawColorFrame>>>,
    shared: Arc<VideoShared>,
}

impl VideoCapturer {
    /// Create an uninitialized capturer for the provider's default sensor.
    pub fn new(provider: Arc<dyn SensorProvider>) -> Self {
        let core = CaptureCore::new(Modality::Video, provider);
        let shared = Arc::new(VideoShared {
            frames: Notifier::new(),
            bitmap: Mutex::new(None),
            errors: core.error_sink(),
        });

        Self {
            core,
            reader: Mutex::new(None),
            shared,
        }
    }

    /// Size of the backing buffer, once initialized.
    pub fn frame_size(&self) -> Option<(u32, u32)> {
        self.shared
            .bitmap
            .lock()
            .as_ref()
            .map(|bitmap| (bitmap.width, bitmap.height))
    }

    fn on_color_frame_arrived(shared: &VideoShared, args: &FrameArrivedArgs<RawColorFrame>) {
        let Some(frame) = args.acquire_frame() else {
            return;
        };

        let mut bitmap = shared.bitmap.lock();
        let Some(bitmap) = bitmap.as_mut() else {
            return;
        };

        let description = frame.description;
        if description.width != bitmap.width || description.height != bitmap.height {
            publish(
                Modality::Video,
                &shared.errors,
                CaptureError::FrameConversion(format!(
                    "color frame is {}x{}, buffer is {}x{}",
                    description.width, description.height, bitmap.width, bitmap.height
                )),
            );
            return;
        }

        if let Err(e) = frame.copy_converted_frame_data(&mut bitmap.data, ColorImageFormat::Bgra) {
            publish(Modality::Video, &shared.errors, e.into());
            return;
        }

        bitmap.mark_full_frame_dirty();
        bitmap.sequence += 1;
        trace!(sequence = bitmap.sequence, "Color frame converted");

        shared.frames.emit(bitmap);
    }
}

impl Capturer for VideoCapturer {
    type Frame = VideoFrame;

    fn modality(&self) -> Modality {
        self.core.modality()
    }

    #[instrument(name = "video_capturer_initialize", skip(self))]
    fn initialize(&self) {
        let mut reader_slot = self.reader.lock();
        if reader_slot.is_some() {
            debug!("Video capturer already initialized");
            return;
        }

        let Some(sensor) = self.core.initialize_session() else {
            return;
        };

        let reader = match sensor.open_color_reader() {
            Ok(reader) => reader,
            Err(e) => return self.core.acquisition_failed("color", e),
        };

        let description = sensor.color_frame_description();
        *self.shared.bitmap.lock() = Some(VideoFrame::new(description.width, description.height));

        let shared = Arc::clone(&self.shared);
        reader.subscribe(move |args| Self::on_color_frame_arrived(&shared, args));
        *reader_slot = Some(reader);

        info!(
            width = description.width,
            height = description.height,
            "Video capturer initialized"
        );
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
        self.shared.bitmap.lock().take();
        self.core.dispose_session();
        debug!("Video capturer disposed");
    }

    fn is_running(&self) -> bool {
        self.core.is_running()
    }

    fn frames(&self) -> &Notifier<VideoFrame> {
        &self.shared.frames
    }

    fn errors(&self) -> &Notifier<CaptureError> {
        self.core.errors()
    }

    fn status(&self) -> &Notifier<bool> {
        self.core.status()
    }
}
