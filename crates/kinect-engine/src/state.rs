//! Resource management for one device session.

use std::sync::Arc;

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use kinect_capture::{AudioCapturer, BodyCapturer, BodySet, Capturer, VideoCapturer, VideoFrame};
use kinect_device::SensorProvider;
use kinect_ipc::{EngineEvent, Modality, SessionConfig, SubscriptionId};
use kinect_render::SkeletonRenderer;
use kinect_saver::{
    AudioSaver, BodySaver, FfmpegSinkFactory, RecordingEvent, Saver, SaverResult, VideoSaver,
    VideoSinkFactory,
};
use kinect_transport::{CompanionCommand, CompanionLink};

use crate::preview::Previews;

/// A running capturer and the engine's subscriptions on it.
pub struct CaptureSlot<C> {
    pub capturer: C,
    frames: Option<SubscriptionId>,
    errors: SubscriptionId,
}

/// An open saver and its wiring.
pub struct SaverSlot<S> {
    pub saver: Arc<S>,
    frames: SubscriptionId,
    events: SubscriptionId,
}

/// Everything created on connect and on record.
#[derive(Default)]
pub struct SessionResources {
    pub video: Option<CaptureSlot<VideoCapturer>>,
    pub audio: Option<CaptureSlot<AudioCapturer>>,
    pub body: Option<CaptureSlot<BodyCapturer>>,

    pub video_saver: Option<SaverSlot<VideoSaver>>,
    pub audio_saver: Option<SaverSlot<AudioSaver>>,
    pub body_saver: Option<SaverSlot<BodySaver>>,

    pub companion: Option<CompanionLink>,
}

impl SessionResources {
    /// Modalities with an open saver.
    pub fn recording_modalities(&self) -> Vec<Modality> {
        let mut modalities = Vec::new();
        if self.video_saver.is_some() {
            modalities.push(Modality::Video);
        }
        if self.audio_saver.is_some() {
            modalities.push(Modality::Audio);
        }
        if self.body_saver.is_some() {
            modalities.push(Modality::Body);
        }
        modalities
    }
}

/// Creates, wires and tears down capturers, savers and the renderer.
///
/// At most one capturer and one saver exist per modality.
pub struct ResourceManager {
    config: SessionConfig,
    provider: Arc<dyn SensorProvider>,
    sink_factory: Arc<dyn VideoSinkFactory>,
    event_tx: Sender<EngineEvent>,
    resources: Mutex<SessionResources>,
    renderer: Arc<Mutex<Option<SkeletonRenderer>>>,
    previews: Arc<Previews>,
}

impl ResourceManager {
    pub fn new(
        config: SessionConfig,
        provider: Arc<dyn SensorProvider>,
        event_tx: Sender<EngineEvent>,
    ) -> Self {
        Self {
            config,
            provider,
            sink_factory: Arc::new(FfmpegSinkFactory),
            event_tx,
            resources: Mutex::new(SessionResources::default()),
            renderer: Arc::new(Mutex::new(None)),
            previews: Arc::new(Previews::default()),
        }
    }

    /// Replace the video container backend.
    pub fn set_video_sink_factory(&mut self, factory: Arc<dyn VideoSinkFactory>) {
        self.sink_factory = factory;
    }

    pub fn previews(&self) -> Arc<Previews> {
        Arc::clone(&self.previews)
    }

    pub fn resources(&self) -> &Mutex<SessionResources> {
        &self.resources
    }

    pub fn recording_modalities(&self) -> Vec<Modality> {
        self.resources.lock().recording_modalities()
    }

    /// Whether the provider currently exposes a sensor.
    pub fn device_present(&self) -> bool {
        self.provider.default_sensor().is_some()
    }

    /// Whether at least one capturer holds an open sensor channel.
    pub fn any_capturer_running(&self) -> bool {
        let resources = self.resources.lock();
        let video = resources.video.as_ref().is_some_and(|s| s.capturer.is_running());
        let audio = resources.audio.as_ref().is_some_and(|s| s.capturer.is_running());
        let body = resources.body.as_ref().is_some_and(|s| s.capturer.is_running());
        video || audio || body
    }

    /// Create the video capturer and forward its frames to the preview.
    #[instrument(name = "init_video_capturer", skip(self))]
    pub fn initialize_video_capturer(&self) -> bool {
        let mut resources = self.resources.lock();
        if resources.video.is_some() {
            return false;
        }

        let capturer = VideoCapturer::new(Arc::clone(&self.provider));
        let previews = Arc::clone(&self.previews);
        let frames = capturer
            .frames()
            .subscribe(move |frame: &VideoFrame| previews.video.publish(frame.snapshot()));

        let slot = self.prepare(capturer, Some(frames));
        slot.capturer.start();
        resources.video = Some(slot);
        true
    }

    /// Create the audio capturer. Audio has no preview.
    #[instrument(name = "init_audio_capturer", skip(self))]
    pub fn initialize_audio_capturer(&self) -> bool {
        let mut resources = self.resources.lock();
        if resources.audio.is_some() {
            return false;
        }

        let slot = self.prepare(AudioCapturer::new(Arc::clone(&self.provider)), None);
        slot.capturer.start();
        resources.audio = Some(slot);
        true
    }

    /// Create the body capturer and the renderer fed by it.
    #[instrument(name = "init_body_capturer", skip(self))]
    pub fn initialize_body_capturer(&self) -> bool {
        let mut resources = self.resources.lock();
        if resources.body.is_some() {
            return false;
        }

        let capturer = BodyCapturer::new(Arc::clone(&self.provider));
        let renderer = Arc::clone(&self.renderer);
        let previews = Arc::clone(&self.previews);
        let frames = capturer.frames().subscribe(move |set: &BodySet| {
            let mut renderer = renderer.lock();
            if let Some(renderer) = renderer.as_mut() {
                let drawing = renderer.process_frame(&set.bodies);
                previews.skeleton.publish(drawing.snapshot());
            }
        });

        let slot = self.prepare(capturer, Some(frames));

        // The mapper only exists once the capturer holds a sensor.
        match slot.capturer.coordinate_mapper() {
            Some(mapper) => {
                let render = &self.config.render;
                *self.renderer.lock() =
                    Some(SkeletonRenderer::new(mapper, render.width, render.height));
                debug!(width = render.width, height = render.height, "Skeleton renderer ready");
            }
            None => warn!("No coordinate mapper, skeleton preview disabled"),
        }

        slot.capturer.start();
        resources.body = Some(slot);
        true
    }

    /// Open the companion link and announce the device.
    pub fn initialize_companion(&self) -> bool {
        if !self.config.companion.enabled {
            return false;
        }

        let mut resources = self.resources.lock();
        if resources.companion.is_some() {
            return false;
        }

        match CompanionLink::open(&self.config.companion.address) {
            Ok(link) => {
                link.notify(CompanionCommand::Init);
                resources.companion = Some(link);
                true
            }
            Err(e) => {
                self.report(None, format!("Companion link unavailable: {}", e));
                false
            }
        }
    }

    pub fn start_video_saver(&self) -> bool {
        let mut guard = self.resources.lock();
        let resources = &mut *guard;
        let config = &self.config;
        let factory = Arc::clone(&self.sink_factory);
        self.start_saver(resources.video.as_ref(), &mut resources.video_saver, || {
            VideoSaver::with_factory(&config.output.video, &config.video, &*factory)
        })
    }

    pub fn stop_video_saver(&self) -> bool {
        let mut guard = self.resources.lock();
        let resources = &mut *guard;
        stop_saver(resources.video.as_ref(), &mut resources.video_saver)
    }

    pub fn start_audio_saver(&self) -> bool {
        let mut guard = self.resources.lock();
        let resources = &mut *guard;
        let config = &self.config;
        self.start_saver(resources.audio.as_ref(), &mut resources.audio_saver, || {
            AudioSaver::new(&config.output.audio, &config.audio)
        })
    }

    pub fn stop_audio_saver(&self) -> bool {
        let mut guard = self.resources.lock();
        let resources = &mut *guard;
        stop_saver(resources.audio.as_ref(), &mut resources.audio_saver)
    }

    pub fn start_body_saver(&self) -> bool {
        let mut guard = self.resources.lock();
        let resources = &mut *guard;
        let config = &self.config;
        self.start_saver(resources.body.as_ref(), &mut resources.body_saver, || {
            BodySaver::new(&config.output.body, &config.body)
        })
    }

    pub fn stop_body_saver(&self) -> bool {
        let mut guard = self.resources.lock();
        let resources = &mut *guard;
        stop_saver(resources.body.as_ref(), &mut resources.body_saver)
    }

    /// Tell the companion to start recording.
    pub fn start_companion_recording(&self) -> bool {
        self.send_companion(CompanionCommand::Start)
    }

    /// Tell the companion to stop recording.
    pub fn stop_companion_recording(&self) -> bool {
        self.send_companion(CompanionCommand::Stop)
    }

    /// Dispose every saver, then every capturer, then close the companion.
    #[instrument(name = "shutdown_resources", skip(self))]
    pub fn shutdown(&self) {
        let mut guard = self.resources.lock();
        let resources = &mut *guard;

        stop_saver(resources.video.as_ref(), &mut resources.video_saver);
        stop_saver(resources.audio.as_ref(), &mut resources.audio_saver);
        stop_saver(resources.body.as_ref(), &mut resources.body_saver);

        dispose_capturer(resources.video.take());
        dispose_capturer(resources.audio.take());
        dispose_capturer(resources.body.take());

        self.renderer.lock().take();
        self.previews.clear();

        if let Some(link) = resources.companion.take() {
            link.notify(CompanionCommand::Close);
        }

        info!("Session resources released");
    }

    /// Subscribe error forwarding and initialize.
    fn prepare<C: Capturer>(&self, capturer: C, frames: Option<SubscriptionId>) -> CaptureSlot<C> {
        let modality = capturer.modality();
        let event_tx = self.event_tx.clone();
        let errors = capturer.errors().subscribe(move |error| {
            send_event(
                &event_tx,
                EngineEvent::Error {
                    modality: Some(modality),
                    message: error.to_string(),
                },
            );
        });

        capturer.initialize();
        CaptureSlot {
            capturer,
            frames,
            errors,
        }
    }

    /// Open a saver and attach it to its capturer.
    ///
    /// Returns false when the capturer is missing, a saver already exists
    /// or the saver could not be created.
    fn start_saver<C, S, F>(
        &self,
        capture: Option<&CaptureSlot<C>>,
        slot: &mut Option<SaverSlot<S>>,
        create: F,
    ) -> bool
    where
        C: Capturer,
        C::Frame: 'static,
        S: Saver<Frame = C::Frame> + 'static,
        F: FnOnce() -> SaverResult<S>,
    {
        let Some(capture) = capture else {
            debug!("No capturer, saver not started");
            return false;
        };
        if slot.is_some() {
            debug!(modality = %capture.capturer.modality(), "Saver already running");
            return false;
        }

        let modality = capture.capturer.modality();
        let saver = match create() {
            Ok(saver) => Arc::new(saver),
            Err(e) => {
                self.report(Some(modality), format!("Failed to open {} recording: {}", modality, e));
                return false;
            }
        };

        let event_tx = self.event_tx.clone();
        let path = saver.file_path().to_path_buf();
        let events = saver.events().subscribe(move |event: &RecordingEvent| {
            let event = match event {
                RecordingEvent::Started => EngineEvent::RecordingStarted {
                    modality,
                    path: path.clone(),
                },
                RecordingEvent::Stopped => EngineEvent::RecordingStopped { modality },
            };
            send_event(&event_tx, event);
        });

        let writer = Arc::clone(&saver);
        let frames = capture
            .capturer
            .frames()
            .subscribe(move |frame: &C::Frame| writer.write_frame(frame));

        saver.start();
        *slot = Some(SaverSlot {
            saver,
            frames,
            events,
        });
        true
    }

    fn send_companion(&self, command: CompanionCommand) -> bool {
        match self.resources.lock().companion.as_ref() {
            Some(link) => {
                link.notify(command);
                true
            }
            None => false,
        }
    }

    fn report(&self, modality: Option<Modality>, message: String) {
        warn!("{}", message);
        send_event(&self.event_tx, EngineEvent::Error { modality, message });
    }
}

impl Drop for ResourceManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Detach a saver from its capturer and close its file.
fn stop_saver<C, S>(capture: Option<&CaptureSlot<C>>, slot: &mut Option<SaverSlot<S>>) -> bool
where
    C: Capturer,
    S: Saver,
{
    let Some(saver_slot) = slot.take() else {
        return false;
    };

    if let Some(capture) = capture {
        capture.capturer.frames().unsubscribe(saver_slot.frames);
    }
    saver_slot.saver.dispose();
    saver_slot.saver.events().unsubscribe(saver_slot.events);
    true
}

fn dispose_capturer<C: Capturer>(slot: Option<CaptureSlot<C>>) {
    let Some(slot) = slot else {
        return;
    };

    if let Some(frames) = slot.frames {
        slot.capturer.frames().unsubscribe(frames);
    }
    slot.capturer.dispose();
    slot.capturer.errors().unsubscribe(slot.errors);
    debug!(modality = %slot.capturer.modality(), "Capturer disposed");
}

pub(crate) fn send_event(event_tx: &Sender<EngineEvent>, event: EngineEvent) {
    if let Err(e) = event_tx.try_send(event) {
        warn!("Failed to send event: {}", e);
    }
}
