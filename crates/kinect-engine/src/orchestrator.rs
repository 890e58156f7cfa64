//! Main engine orchestrator.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;
use tracing::{debug, info, instrument};

use kinect_device::SensorProvider;
use kinect_ipc::{EngineCommand, EngineEvent, EngineState, SessionConfig};
use kinect_saver::VideoSinkFactory;

use crate::preview::Previews;
use crate::state::{send_event, ResourceManager};

/// The recording engine. Owns the session and reacts to shell commands.
pub struct Engine {
    command_rx: Receiver<EngineCommand>,
    event_tx: Sender<EngineEvent>,
    state: Arc<RwLock<EngineState>>,
    resource_manager: ResourceManager,
}

impl Engine {
    /// Create a new engine.
    pub fn new(
        command_rx: Receiver<EngineCommand>,
        event_tx: Sender<EngineEvent>,
        config: SessionConfig,
        provider: Arc<dyn SensorProvider>,
    ) -> Self {
        let resource_manager = ResourceManager::new(config, provider, event_tx.clone());
        Self {
            command_rx,
            event_tx,
            state: Arc::new(RwLock::new(EngineState::Disconnected)),
            resource_manager,
        }
    }

    /// Use a different video container backend.
    pub fn with_video_sink_factory(mut self, factory: Arc<dyn VideoSinkFactory>) -> Self {
        self.resource_manager.set_video_sink_factory(factory);
        self
    }

    /// Preview outputs, readable from any thread.
    pub fn previews(&self) -> Arc<Previews> {
        self.resource_manager.previews()
    }

    /// Shared view of the engine state.
    pub fn state(&self) -> Arc<RwLock<EngineState>> {
        Arc::clone(&self.state)
    }

    /// Run the engine (blocking).
    #[instrument(name = "engine_run", skip(self))]
    pub fn run(&mut self) {
        info!("Engine starting");
        self.send_event(EngineEvent::Ready);

        while let Ok(command) = self.command_rx.recv() {
            if !self.handle_command(command) {
                break;
            }
        }

        info!("Engine stopped");
    }

    /// Handle a command. Returns false if engine should stop.
    fn handle_command(&mut self, command: EngineCommand) -> bool {
        debug!(?command, "Handling command");

        match command {
            EngineCommand::Connect => self.connect(),
            EngineCommand::Disconnect => self.disconnect(),
            EngineCommand::StartRecording => self.start_recording(),
            EngineCommand::StopRecording => self.stop_recording(),
            EngineCommand::GetState => self.send_state(),
            EngineCommand::Shutdown => {
                self.disconnect();
                self.send_event(EngineEvent::Shutdown);
                return false;
            }
        }

        true
    }

    /// Create and start all capturers.
    #[instrument(name = "connect", skip(self))]
    fn connect(&mut self) {
        if self.state.read().is_connected() {
            debug!("Already connected, ignoring connect command");
            return;
        }

        if !self.resource_manager.device_present() {
            self.notice("No device found");
            return;
        }

        info!("Connecting sensor streams");
        let resources = &self.resource_manager;
        resources.initialize_video_capturer();
        resources.initialize_audio_capturer();
        resources.initialize_body_capturer();

        if !resources.any_capturer_running() {
            resources.shutdown();
            self.notice("Device could not be started");
            return;
        }
        resources.initialize_companion();

        self.transition_to(EngineState::Connected);
        self.notice("Device connected");
    }

    /// Dispose savers and capturers.
    #[instrument(name = "disconnect", skip(self))]
    fn disconnect(&mut self) {
        if self.state.read().is_disconnected() {
            debug!("Already disconnected, ignoring disconnect command");
            return;
        }

        info!("Disconnecting sensor streams");
        self.resource_manager.shutdown();

        self.transition_to(EngineState::Disconnected);
        self.notice("Device disconnected");
    }

    /// Open a saver for every running stream.
    #[instrument(name = "start_recording", skip(self))]
    fn start_recording(&mut self) {
        {
            let state = self.state.read();
            if state.is_recording() {
                debug!("Already recording, ignoring start command");
                return;
            }
            if state.is_disconnected() {
                self.notice("Connect a device before recording");
                return;
            }
        }

        let resources = &self.resource_manager;
        resources.start_video_saver();
        resources.start_audio_saver();
        resources.start_body_saver();

        let modalities = resources.recording_modalities();
        if modalities.is_empty() {
            self.notice("No stream could be recorded");
            return;
        }

        resources.start_companion_recording();
        info!(?modalities, "Recording started");
        self.transition_to(EngineState::Recording { modalities });
        self.notice("Recording started");
    }

    /// Close every saver. Capturers keep running.
    #[instrument(name = "stop_recording", skip(self))]
    fn stop_recording(&mut self) {
        if !self.state.read().is_recording() {
            debug!("Not recording, ignoring stop command");
            return;
        }

        let resources = &self.resource_manager;
        resources.stop_video_saver();
        resources.stop_audio_saver();
        resources.stop_body_saver();
        resources.stop_companion_recording();

        self.transition_to(EngineState::Connected);
        self.notice("Recording stopped");
    }

    fn send_state(&self) {
        let state = self.state.read().clone();
        self.send_event(EngineEvent::StateChanged {
            previous: Box::new(state.clone()),
            current: Box::new(state),
        });
    }

    fn notice(&self, message: &str) {
        info!("{}", message);
        self.send_event(EngineEvent::Notice(message.to_string()));
    }

    fn transition_to(&self, new_state: EngineState) {
        let previous = {
            let mut state = self.state.write();
            let prev = state.clone();
            *state = new_state.clone();
            prev
        };

        debug!(
            previous = %previous.name(),
            current = %new_state.name(),
            "State transition"
        );

        self.send_event(EngineEvent::StateChanged {
            previous: Box::new(previous),
            current: Box::new(new_state),
        });
    }

    fn send_event(&self, event: EngineEvent) {
        send_event(&self.event_tx, event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::UdpSocket;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use bytes::Bytes;
    use parking_lot::Mutex;

    use kinect_device::{
        AudioBeamFrame, AudioSubFrame, Body, CameraSpacePoint, ColorImageFormat,
        FrameDescription, RawBodyFrame, RawColorFrame, Sensor, SyntheticProvider,
        SyntheticSensor, TrackingState,
    };
    use kinect_ipc::{
        command_channel, event_channel, Modality, OutputDirs, RenderConfig, VideoOutputConfig,
    };
    use kinect_saver::{SaverResult, VideoSink};

    #[derive(Clone, Default)]
    struct MemorySinkFactory {
        frames: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    struct MemorySink {
        frames: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl VideoSink for MemorySink {
        fn write_frame(&mut self, bgr: &[u8]) -> SaverResult<()> {
            self.frames.lock().push(bgr.to_vec());
            Ok(())
        }

        fn finish(&mut self) -> SaverResult<()> {
            Ok(())
        }
    }

    impl VideoSinkFactory for MemorySinkFactory {
        fn create(&self, _path: &Path, _config: &VideoOutputConfig) -> SaverResult<Box<dyn VideoSink>> {
            Ok(Box::new(MemorySink {
                frames: Arc::clone(&self.frames),
            }))
        }
    }

    struct Rig {
        sensor: Arc<SyntheticSensor>,
        engine: Engine,
        events: Receiver<EngineEvent>,
        video_frames: Arc<Mutex<Vec<Vec<u8>>>>,
        _commands: Sender<EngineCommand>,
        _dir: tempfile::TempDir,
    }

    impl Rig {
        fn drain(&self) -> Vec<EngineEvent> {
            self.events.try_iter().collect()
        }
    }

    fn config(dir: &Path) -> SessionConfig {
        let mut config = SessionConfig::default();
        config.output = OutputDirs {
            video: dir.join("video"),
            audio: dir.join("audio"),
            body: dir.join("body"),
        };
        config.video = VideoOutputConfig {
            width: 4,
            height: 2,
            fps: 30.0,
        };
        config.render = RenderConfig {
            width: 32,
            height: 32,
        };
        config.companion.enabled = false;
        config
    }

    fn rig_with(adjust: impl FnOnce(&mut SessionConfig)) -> Rig {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        adjust(&mut config);

        let sensor = Arc::new(SyntheticSensor::manual(FrameDescription {
            width: 4,
            height: 2,
        }));
        let (command_tx, command_rx) = command_channel();
        let (event_tx, event_rx) = event_channel();
        let factory = MemorySinkFactory::default();
        let video_frames = Arc::clone(&factory.frames);

        let engine = Engine::new(
            command_rx,
            event_tx,
            config,
            Arc::new(SyntheticProvider::new(Arc::clone(&sensor))),
        )
        .with_video_sink_factory(Arc::new(factory));

        Rig {
            sensor,
            engine,
            events: event_rx,
            video_frames,
            _commands: command_tx,
            _dir: dir,
        }
    }

    fn rig() -> Rig {
        rig_with(|_| {})
    }

    fn color_frame() -> RawColorFrame {
        RawColorFrame {
            description: FrameDescription {
                width: 4,
                height: 2,
            },
            format: ColorImageFormat::Bgra,
            data: Bytes::from(vec![9u8; 4 * 2 * 4]),
        }
    }

    fn body_frame() -> RawBodyFrame {
        RawBodyFrame {
            bodies: vec![Body::uniform(
                11,
                CameraSpacePoint::new(0.0, 0.0, 2.0),
                TrackingState::Tracked,
            )],
        }
    }

    fn audio_frames() -> Vec<AudioBeamFrame> {
        vec![AudioBeamFrame {
            sub_frames: vec![AudioSubFrame::from_f32(&[0.5; 4])],
        }]
    }

    fn notices(events: &[EngineEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                EngineEvent::Notice(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn started_paths(events: &[EngineEvent]) -> Vec<(Modality, PathBuf)> {
        events
            .iter()
            .filter_map(|e| match e {
                EngineEvent::RecordingStarted { modality, path } => Some((*modality, path.clone())),
                _ => None,
            })
            .collect()
    }

    fn stopped(events: &[EngineEvent]) -> Vec<Modality> {
        events
            .iter()
            .filter_map(|e| match e {
                EngineEvent::RecordingStopped { modality } => Some(*modality),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_connect_feeds_previews() {
        let mut rig = rig();
        rig.engine.handle_command(EngineCommand::Connect);

        assert_eq!(*rig.engine.state.read(), EngineState::Connected);
        assert!(rig.sensor.is_open());
        assert_eq!(notices(&rig.drain()), vec!["Device connected"]);

        rig.sensor.push_color(Some(color_frame()));
        rig.sensor.push_body(Some(body_frame()));

        let previews = rig.engine.previews();
        let video = previews.video.latest().expect("video preview");
        assert_eq!(video.data, vec![9u8; 32]);
        let skeleton = previews.skeleton.latest().expect("skeleton preview");
        assert_eq!((skeleton.width, skeleton.height), (32, 32));
        assert!(!skeleton.commands.is_empty());
    }

    #[test]
    fn test_second_connect_is_ignored() {
        let mut rig = rig();
        rig.engine.handle_command(EngineCommand::Connect);
        rig.drain();
        rig.engine.handle_command(EngineCommand::Connect);

        assert!(rig.drain().is_empty());
        assert_eq!(rig.sensor.push_color(Some(color_frame())), 1);
    }

    #[test]
    fn test_record_cycle_writes_every_stream() {
        let mut rig = rig();
        rig.engine.handle_command(EngineCommand::Connect);

        // Not recording yet: nothing persisted.
        rig.sensor.push_color(Some(color_frame()));
        rig.drain();

        rig.engine.handle_command(EngineCommand::StartRecording);
        let events = rig.drain();
        let started = started_paths(&events);
        assert_eq!(started.len(), 3);
        assert_eq!(notices(&events), vec!["Recording started"]);
        assert_eq!(
            *rig.engine.state.read(),
            EngineState::Recording {
                modalities: vec![Modality::Video, Modality::Audio, Modality::Body],
            }
        );

        rig.sensor.push_color(Some(color_frame()));
        rig.sensor.push_audio(Some(audio_frames()));
        rig.sensor.push_body(Some(body_frame()));

        rig.engine.handle_command(EngineCommand::StopRecording);
        let events = rig.drain();
        assert_eq!(
            stopped(&events),
            vec![Modality::Video, Modality::Audio, Modality::Body]
        );
        assert_eq!(*rig.engine.state.read(), EngineState::Connected);

        assert_eq!(rig.video_frames.lock().len(), 1);

        let body_path = &started.iter().find(|(m, _)| *m == Modality::Body).unwrap().1;
        let csv = std::fs::read_to_string(body_path).unwrap();
        let rows: Vec<&str> = csv.lines().collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[1].starts_with("11,"));

        let audio_path = &started.iter().find(|(m, _)| *m == Modality::Audio).unwrap().1;
        // 44-byte header plus four 16-bit samples.
        assert_eq!(std::fs::metadata(audio_path).unwrap().len(), 44 + 8);

        // Capturers keep running after the savers are gone.
        rig.sensor.push_color(Some(color_frame()));
        assert_eq!(rig.video_frames.lock().len(), 1);
        assert!(rig.sensor.is_open());
    }

    #[test]
    fn test_record_requires_connection() {
        let mut rig = rig();
        rig.engine.handle_command(EngineCommand::StartRecording);

        let events = rig.drain();
        assert_eq!(notices(&events), vec!["Connect a device before recording"]);
        assert!(started_paths(&events).is_empty());
        assert_eq!(*rig.engine.state.read(), EngineState::Disconnected);
    }

    #[test]
    fn test_disconnect_while_recording_closes_everything() {
        let mut rig = rig();
        rig.engine.handle_command(EngineCommand::Connect);
        rig.engine.handle_command(EngineCommand::StartRecording);
        rig.drain();

        rig.engine.handle_command(EngineCommand::Disconnect);
        let events = rig.drain();

        assert_eq!(stopped(&events).len(), 3);
        assert_eq!(notices(&events), vec!["Device disconnected"]);
        assert_eq!(*rig.engine.state.read(), EngineState::Disconnected);
        assert!(!rig.sensor.is_open());
        assert!(rig.engine.previews().video.latest().is_none());
        assert!(rig.engine.resource_manager.recording_modalities().is_empty());
    }

    #[test]
    fn test_connect_without_device_is_one_notice() {
        let dir = tempfile::tempdir().unwrap();
        let (_command_tx, command_rx) = command_channel();
        let (event_tx, event_rx) = event_channel();
        let mut engine = Engine::new(
            command_rx,
            event_tx,
            config(dir.path()),
            Arc::new(SyntheticProvider::disconnected()),
        );

        engine.handle_command(EngineCommand::Connect);

        let events: Vec<EngineEvent> = event_rx.try_iter().collect();
        assert_eq!(notices(&events), vec!["No device found"]);
        assert!(!events.iter().any(|e| matches!(e, EngineEvent::Error { .. })));
        assert_eq!(*engine.state.read(), EngineState::Disconnected);
        assert!(!engine.resource_manager.any_capturer_running());
    }

    #[test]
    fn test_sensor_that_will_not_open_stays_disconnected() {
        let mut rig = rig();
        rig.sensor.set_fail_open(true);
        rig.engine.handle_command(EngineCommand::Connect);

        let events = rig.drain();
        assert_eq!(notices(&events), vec!["Device could not be started"]);
        assert_eq!(*rig.engine.state.read(), EngineState::Disconnected);
        assert!(rig.engine.resource_manager.resources().lock().video.is_none());

        rig.sensor.set_fail_open(false);
        rig.engine.handle_command(EngineCommand::Connect);
        assert_eq!(*rig.engine.state.read(), EngineState::Connected);
    }

    #[test]
    fn test_capturer_failures_become_error_events() {
        let mut rig = rig();
        rig.sensor.set_fail_readers(true);
        rig.engine.handle_command(EngineCommand::Connect);

        let errors: Vec<Option<Modality>> = rig
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                EngineEvent::Error { modality, .. } => Some(modality),
                _ => None,
            })
            .collect();
        assert_eq!(
            errors,
            vec![Some(Modality::Video), Some(Modality::Audio), Some(Modality::Body)]
        );
    }

    #[test]
    fn test_saver_construction_failure_is_reported() {
        let mut rig = rig_with(|config| config.audio.bits_per_sample = 8);
        rig.engine.handle_command(EngineCommand::Connect);
        rig.engine.handle_command(EngineCommand::StartRecording);

        let events = rig.drain();
        let started: Vec<Modality> = started_paths(&events).into_iter().map(|(m, _)| m).collect();
        assert_eq!(started, vec![Modality::Video, Modality::Body]);
        assert!(events.iter().any(|e| matches!(
            e,
            EngineEvent::Error {
                modality: Some(Modality::Audio),
                ..
            }
        )));
    }

    #[test]
    fn test_companion_receives_lifecycle_commands() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        listener
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let mut rig = rig_with(|config| {
            config.companion.enabled = true;
            config.companion.address = address;
        });

        let mut received = Vec::new();
        let mut buf = [0u8; 16];
        for command in [
            EngineCommand::Connect,
            EngineCommand::StartRecording,
            EngineCommand::StopRecording,
            EngineCommand::Disconnect,
        ] {
            rig.engine.handle_command(command);
            let (len, _) = listener.recv_from(&mut buf).unwrap();
            received.push(String::from_utf8_lossy(&buf[..len]).into_owned());
        }

        assert_eq!(received, vec!["init", "start", "stop", "close"]);
    }

    #[test]
    fn test_run_loop_until_shutdown() {
        let rig = rig();
        let commands = rig._commands.clone();
        let events = rig.events.clone();
        let mut engine = rig.engine;

        let handle = std::thread::spawn(move || engine.run());
        commands.send(EngineCommand::Connect).unwrap();
        commands.send(EngineCommand::GetState).unwrap();
        commands.send(EngineCommand::Shutdown).unwrap();
        handle.join().unwrap();

        let events: Vec<EngineEvent> = events.try_iter().collect();
        assert!(matches!(events.first(), Some(EngineEvent::Ready)));
        assert!(matches!(events.last(), Some(EngineEvent::Shutdown)));
        assert!(notices(&events).contains(&"Device disconnected".to_string()));
        assert!(!rig.sensor.is_open());
    }
}
