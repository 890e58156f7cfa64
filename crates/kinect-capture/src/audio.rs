//! Microphone array capturer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use kinect_device::{AudioBeamFrameList, AudioSampleFormat, FrameArrivedArgs, FrameReader, SensorProvider};
use kinect_ipc::{Modality, Notifier};

use crate::error::CaptureError;
use crate::frame::AudioFrame;
use crate::lifecycle::{publish, CaptureCore};
use crate::Capturer;

struct AudioShared {
    frames: Notifier<AudioFrame>,
    errors: Arc<Notifier<CaptureError>>,
    format_warned: AtomicBool,
}

/// Publishes every sub-frame of the first beam frame in each delivery.
pub struct AudioCapturer {
    core: CaptureCore,
    reader: Mutex<Option<FrameReader<AudioBeamFrameList>>>,
    shared: Arc<AudioShared>,
}

impl AudioCapturer {
    /// Create an uninitialized capturer for the provider's default sensor.
    pub fn new(provider: Arc<dyn SensorProvider>) -> Self {
        let core = CaptureCore::new(Modality::Audio, provider);
        let shared = Arc::new(AudioShared {
            frames: Notifier::new(),
            errors: core.error_sink(),
            format_warned: AtomicBool::new(false),
        });

        Self {
            core,
            reader: Mutex::new(None),
            shared,
        }
    }

    fn on_audio_frame_arrived(shared: &AudioShared, args: &FrameArrivedArgs<AudioBeamFrameList>) {
        let Some(beam_frames) = args.acquire_frame() else {
            return;
        };
        // Only the first beam frame of a delivery is used.
        let Some(beam_frame) = beam_frames.first() else {
            return;
        };

        for sub_frame in &beam_frame.sub_frames {
            if sub_frame.format != AudioSampleFormat::Float32
                && !shared.format_warned.swap(true, Ordering::Relaxed)
            {
                warn!(format = ?sub_frame.format, "Audio sub-frame is not 32-bit float");
            }

            let length = sub_frame.frame_length_in_bytes();
            let mut buffer = vec![0u8; length];
            if let Err(e) = sub_frame.copy_frame_data_to(&mut buffer) {
                publish(Modality::Audio, &shared.errors, e.into());
                return;
            }

            shared.frames.emit(&AudioFrame {
                data: Bytes::from(buffer),
                length,
            });
        }
    }
}

impl Capturer for AudioCapturer {
    type Frame = AudioFrame;

    fn modality(&self) -> Modality {
        self.core.modality()
    }

    #[instrument(name = "audio_capturer_initialize", skip(self))]
    fn initialize(&self) {
        let mut reader_slot = self.reader.lock();
        if reader_slot.is_some() {
            debug!("Audio capturer already initialized");
            return;
        }

        let Some(sensor) = self.core.initialize_session() else {
            return;
        };

        let reader = match sensor.open_audio_reader() {
            Ok(reader) => reader,
            Err(e) => return self.core.acquisition_failed("audio", e),
        };

        let shared = Arc::clone(&self.shared);
        reader.subscribe(move |args| Self::on_audio_frame_arrived(&shared, args));
        *reader_slot = Some(reader);

        info!("Audio capturer initialized");
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
        debug!("Audio capturer disposed");
    }

    fn is_running(&self) -> bool {
        self.core.is_running()
    }

    fn frames(&self) -> &Notifier<AudioFrame> {
        &self.shared.frames
    }

    fn errors(&self) -> &Notifier<CaptureError> {
        self.core.errors()
    }

    fn status(&self) -> &Notifier<bool> {
        self.core.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinect_device::{AudioBeamFrame, AudioSubFrame, FrameDescription, SyntheticProvider, SyntheticSensor};

    fn rig() -> (Arc<SyntheticSensor>, AudioCapturer, Arc<Mutex<Vec<AudioFrame>>>) {
        let sensor = Arc::new(SyntheticSensor::manual(FrameDescription {
            width: 2,
            height: 2,
        }));
        let capturer = AudioCapturer::new(Arc::new(SyntheticProvider::new(Arc::clone(&sensor))));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        capturer
            .frames()
            .subscribe(move |frame: &AudioFrame| sink.lock().push(frame.clone()));
        capturer.initialize();
        capturer.start();
        (sensor, capturer, seen)
    }

    #[test]
    fn test_one_notification_per_sub_frame() {
        let (sensor, _capturer, seen) = rig();
        let beam = AudioBeamFrame {
            sub_frames: vec![
                AudioSubFrame::from_f32(&[0.5, -0.5]),
                AudioSubFrame::from_f32(&[0.25]),
                AudioSubFrame::from_f32(&[1.0, 0.0, -1.0]),
            ],
        };
        sensor.push_audio(Some(vec![beam]));

        let seen = seen.lock();
        let lengths: Vec<usize> = seen.iter().map(|f| f.length).collect();
        assert_eq!(lengths, vec![8, 4, 12]);
        assert_eq!(seen[0].as_bytes(), &[0.5f32.to_le_bytes(), (-0.5f32).to_le_bytes()].concat()[..]);
    }

    #[test]
    fn test_only_first_beam_frame_is_used() {
        let (sensor, _capturer, seen) = rig();
        let first = AudioBeamFrame {
            sub_frames: vec![AudioSubFrame::from_f32(&[0.1])],
        };
        let second = AudioBeamFrame {
            sub_frames: vec![AudioSubFrame::from_f32(&[0.2]), AudioSubFrame::from_f32(&[0.3])],
        };
        sensor.push_audio(Some(vec![first, second]));

        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_empty_delivery_emits_nothing() {
        let (sensor, capturer, seen) = rig();
        sensor.push_audio(None);
        sensor.push_audio(Some(Vec::new()));
        sensor.push_audio(Some(vec![AudioBeamFrame::default()]));

        assert!(seen.lock().is_empty());
        let reader = capturer.reader.lock();
        assert_eq!(reader.as_ref().map(|r| r.outstanding_frames()), Some(0));
    }

    #[test]
    fn test_reader_failure_is_published() {
        let sensor = Arc::new(SyntheticSensor::manual(FrameDescription {
            width: 2,
            height: 2,
        }));
        sensor.set_fail_readers(true);
        let capturer = AudioCapturer::new(Arc::new(SyntheticProvider::new(sensor)));
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        capturer
            .errors()
            .subscribe(move |e: &CaptureError| sink.lock().push(e.clone()));

        capturer.initialize();

        let errors = errors.lock();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], CaptureError::Acquisition { stream: "audio", .. }));
    }
}
