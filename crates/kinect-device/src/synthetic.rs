//! In-process sensor used when no hardware backend is linked, and by tests.
//!
//! In manual mode frames are pushed with [`SyntheticSensor::push_color`] and
//! friends and delivered synchronously on the caller's thread. In generator
//! mode opening the sensor starts one delivery thread per modality at the
//! device's native cadence.

use std::f32::consts::TAU;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::DeviceError;
use crate::mapper::PinholeMapper;
use crate::reader::{frame_channel, FrameReader, ReaderFeed};
use crate::sensor::{CoordinateMapper, Sensor, SensorProvider};
use crate::types::{
    AudioBeamFrame, AudioBeamFrameList, AudioSubFrame, Body, CameraSpacePoint, ColorImageFormat,
    FrameDescription, HandState, JointType, RawBodyFrame, RawColorFrame, TrackingState,
    BODY_COUNT,
};
use crate::DeviceResult;

/// Audio sub-frame length in samples (16 ms at 16 kHz).
const AUDIO_SUBFRAME_SAMPLES: usize = 256;

/// Audio sample rate of the microphone array.
const AUDIO_SAMPLE_RATE: f32 = 16_000.0;

/// Parameters of a synthetic sensor.
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// Color stream size.
    pub description: FrameDescription,

    /// Body slots per skeletal frame.
    pub body_count: usize,

    /// Start delivery threads on open.
    pub generate: bool,

    /// Color frame period.
    pub color_interval: Duration,

    /// Audio beam frame period.
    pub audio_interval: Duration,

    /// Skeletal frame period.
    pub body_interval: Duration,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            description: FrameDescription {
                width: 1920,
                height: 1080,
            },
            body_count: BODY_COUNT,
            generate: false,
            color_interval: Duration::from_millis(33),
            audio_interval: Duration::from_millis(16),
            body_interval: Duration::from_millis(33),
        }
    }
}

struct Generator {
    stop_tx: Sender<()>,
    workers: Vec<JoinHandle<()>>,
}

struct Inner {
    config: SyntheticConfig,
    open: AtomicBool,
    mapper: Arc<PinholeMapper>,
    color_feeds: Mutex<Vec<ReaderFeed<RawColorFrame>>>,
    audio_feeds: Mutex<Vec<ReaderFeed<AudioBeamFrameList>>>,
    body_feeds: Mutex<Vec<ReaderFeed<RawBodyFrame>>>,
    fail_open: AtomicBool,
    fail_readers: AtomicBool,
    open_count: AtomicU64,
}

/// A sensor that fabricates frames.
pub struct SyntheticSensor {
    inner: Arc<Inner>,
    generator: Mutex<Option<Generator>>,
}

impl SyntheticSensor {
    /// Create a sensor with the given parameters.
    pub fn new(config: SyntheticConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                open: AtomicBool::new(false),
                mapper: Arc::new(PinholeMapper::color_camera()),
                color_feeds: Mutex::new(Vec::new()),
                audio_feeds: Mutex::new(Vec::new()),
                body_feeds: Mutex::new(Vec::new()),
                fail_open: AtomicBool::new(false),
                fail_readers: AtomicBool::new(false),
                open_count: AtomicU64::new(0),
            }),
            generator: Mutex::new(None),
        }
    }

    /// A sensor that only delivers pushed frames.
    pub fn manual(description: FrameDescription) -> Self {
        Self::new(SyntheticConfig {
            description,
            ..SyntheticConfig::default()
        })
    }

    /// A full-resolution sensor that generates frames while open.
    pub fn generating() -> Self {
        Self::new(SyntheticConfig {
            generate: true,
            ..SyntheticConfig::default()
        })
    }

    /// Make subsequent `open` calls fail.
    pub fn set_fail_open(&self, fail: bool) {
        self.inner.fail_open.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent reader opens fail.
    pub fn set_fail_readers(&self, fail: bool) {
        self.inner.fail_readers.store(fail, Ordering::SeqCst);
    }

    /// How many times the channel transitioned to open.
    pub fn open_count(&self) -> u64 {
        self.inner.open_count.load(Ordering::SeqCst)
    }

    /// Deliver a color frame to every open color reader.
    pub fn push_color(&self, frame: Option<RawColorFrame>) -> usize {
        self.inner.push_color(frame)
    }

    /// Deliver a beam frame list to every open audio reader.
    pub fn push_audio(&self, frames: Option<AudioBeamFrameList>) -> usize {
        self.inner.push_audio(frames)
    }

    /// Deliver a skeletal frame to every open body reader.
    pub fn push_body(&self, frame: Option<RawBodyFrame>) -> usize {
        self.inner.push_body(frame)
    }

    fn start_generator(&self) {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let config = &self.inner.config;

        let workers = vec![
            spawn_worker("synthetic-color", &self.inner, &stop_rx, config.color_interval, {
                let mut tick = 0u64;
                move |inner: &Inner| {
                    let frame = color_test_pattern(inner.config.description, tick);
                    inner.push_color(Some(frame));
                    tick += 1;
                }
            }),
            spawn_worker("synthetic-audio", &self.inner, &stop_rx, config.audio_interval, {
                let mut phase = 0.0f32;
                move |inner: &Inner| {
                    let frame = sine_beam_frame(&mut phase);
                    inner.push_audio(Some(vec![frame]));
                }
            }),
            spawn_worker("synthetic-body", &self.inner, &stop_rx, config.body_interval, {
                let mut tick = 0u64;
                move |inner: &Inner| {
                    let frame = swaying_body_frame(inner.config.body_count, tick);
                    inner.push_body(Some(frame));
                    tick += 1;
                }
            }),
        ];

        *self.generator.lock() = Some(Generator { stop_tx, workers });
        debug!("Synthetic generator started");
    }

    fn stop_generator(&self) {
        if let Some(generator) = self.generator.lock().take() {
            drop(generator.stop_tx);
            for worker in generator.workers {
                if worker.join().is_err() {
                    warn!("Synthetic worker panicked");
                }
            }
            debug!("Synthetic generator stopped");
        }
    }
}

impl Drop for SyntheticSensor {
    fn drop(&mut self) {
        self.stop_generator();
    }
}

impl Sensor for SyntheticSensor {
    fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::SeqCst)
    }

    #[instrument(name = "synthetic_open", skip(self))]
    fn open(&self) -> DeviceResult<()> {
        if self.inner.fail_open.load(Ordering::SeqCst) {
            return Err(DeviceError::AcquisitionFailure(
                "sensor refused to open".to_string(),
            ));
        }

        if !self.inner.open.swap(true, Ordering::SeqCst) {
            self.inner.open_count.fetch_add(1, Ordering::SeqCst);
            info!("Synthetic sensor opened");
            if self.inner.config.generate {
                self.start_generator();
            }
        }
        Ok(())
    }

    fn close(&self) -> DeviceResult<()> {
        if self.inner.open.swap(false, Ordering::SeqCst) {
            self.stop_generator();
            info!("Synthetic sensor closed");
        }
        Ok(())
    }

    fn coordinate_mapper(&self) -> Arc<dyn CoordinateMapper> {
        self.inner.mapper.clone()
    }

    fn color_frame_description(&self) -> FrameDescription {
        self.inner.config.description
    }

    fn body_count(&self) -> usize {
        self.inner.config.body_count
    }

    fn open_color_reader(&self) -> DeviceResult<FrameReader<RawColorFrame>> {
        self.inner.check_readers("color")?;
        let (reader, feed) = frame_channel();
        self.inner.color_feeds.lock().push(feed);
        Ok(reader)
    }

    fn open_audio_reader(&self) -> DeviceResult<FrameReader<AudioBeamFrameList>> {
        self.inner.check_readers("audio")?;
        let (reader, feed) = frame_channel();
        self.inner.audio_feeds.lock().push(feed);
        Ok(reader)
    }

    fn open_body_reader(&self) -> DeviceResult<FrameReader<RawBodyFrame>> {
        self.inner.check_readers("body")?;
        let (reader, feed) = frame_channel();
        self.inner.body_feeds.lock().push(feed);
        Ok(reader)
    }
}

impl Inner {
    fn check_readers(&self, stream: &str) -> DeviceResult<()> {
        if self.fail_readers.load(Ordering::SeqCst) {
            return Err(DeviceError::AcquisitionFailure(format!(
                "{stream} source unavailable"
            )));
        }
        Ok(())
    }

    fn push_color(&self, frame: Option<RawColorFrame>) -> usize {
        self.broadcast(&self.color_feeds, frame)
    }

    fn push_audio(&self, frames: Option<AudioBeamFrameList>) -> usize {
        self.broadcast(&self.audio_feeds, frames)
    }

    fn push_body(&self, frame: Option<RawBodyFrame>) -> usize {
        self.broadcast(&self.body_feeds, frame)
    }

    /// Deliver outside the feed lock so handlers may open readers.
    fn broadcast<T: Clone>(&self, feeds: &Mutex<Vec<ReaderFeed<T>>>, frame: Option<T>) -> usize {
        if !self.open.load(Ordering::SeqCst) {
            return 0;
        }

        let targets: Vec<ReaderFeed<T>> = {
            let mut feeds = feeds.lock();
            feeds.retain(|feed| feed.is_connected());
            feeds.clone()
        };

        targets
            .iter()
            .filter(|feed| feed.deliver(frame.clone()))
            .count()
    }
}

fn spawn_worker<F>(
    name: &str,
    inner: &Arc<Inner>,
    stop_rx: &Receiver<()>,
    interval: Duration,
    mut produce: F,
) -> JoinHandle<()>
where
    F: FnMut(&Inner) + Send + 'static,
{
    let inner = Arc::clone(inner);
    let stop_rx = stop_rx.clone();
    let name = name.to_string();

    thread::spawn(move || {
        debug!(worker = %name, "Delivery thread starting");
        loop {
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => produce(&inner),
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!(worker = %name, "Delivery thread exiting");
    })
}

/// Moving vertical luma bars in YUY2.
fn color_test_pattern(description: FrameDescription, tick: u64) -> RawColorFrame {
    let width = description.width as usize;
    let height = description.height as usize;
    let shift = (tick as usize * 8) % width.max(1);

    let mut row = Vec::with_capacity(width * 2);
    for pair in 0..width / 2 {
        let x = (pair * 2 + shift) % width.max(1);
        let luma = 16 + ((x * 219) / width.max(1)) as u8;
        row.extend_from_slice(&[luma, 128, luma, 128]);
    }

    let mut data = Vec::with_capacity(row.len() * height);
    for _ in 0..height {
        data.extend_from_slice(&row);
    }

    RawColorFrame {
        description,
        format: ColorImageFormat::Yuy2,
        data: Bytes::from(data),
    }
}

/// One beam frame holding a 440 Hz tone.
fn sine_beam_frame(phase: &mut f32) -> AudioBeamFrame {
    let step = TAU * 440.0 / AUDIO_SAMPLE_RATE;
    let samples: Vec<f32> = (0..AUDIO_SUBFRAME_SAMPLES)
        .map(|_| {
            let sample = 0.25 * phase.sin();
            *phase = (*phase + step) % TAU;
            sample
        })
        .collect();

    AudioBeamFrame {
        sub_frames: vec![AudioSubFrame::from_f32(&samples)],
    }
}

/// Standing pose, meters relative to the spine, left side negative x.
fn template_position(joint: JointType) -> (f32, f32) {
    match joint {
        JointType::Head => (0.0, 0.65),
        JointType::Neck => (0.0, 0.50),
        JointType::SpineShoulder => (0.0, 0.45),
        JointType::SpineMid => (0.0, 0.20),
        JointType::SpineBase => (0.0, -0.05),
        JointType::ShoulderLeft => (-0.18, 0.42),
        JointType::ElbowLeft => (-0.28, 0.18),
        JointType::WristLeft => (-0.32, -0.02),
        JointType::HandLeft => (-0.33, -0.08),
        JointType::HandTipLeft => (-0.34, -0.15),
        JointType::ThumbLeft => (-0.30, -0.08),
        JointType::ShoulderRight => (0.18, 0.42),
        JointType::ElbowRight => (0.28, 0.18),
        JointType::WristRight => (0.32, -0.02),
        JointType::HandRight => (0.33, -0.08),
        JointType::HandTipRight => (0.34, -0.15),
        JointType::ThumbRight => (0.30, -0.08),
        JointType::HipLeft => (-0.09, -0.10),
        JointType::KneeLeft => (-0.10, -0.50),
        JointType::AnkleLeft => (-0.10, -0.88),
        JointType::FootLeft => (-0.10, -0.92),
        JointType::HipRight => (0.09, -0.10),
        JointType::KneeRight => (0.10, -0.50),
        JointType::AnkleRight => (0.10, -0.88),
        JointType::FootRight => (0.10, -0.92),
    }
}

/// One tracked body in slot 0 swaying side to side; the rest empty.
fn swaying_body_frame(body_count: usize, tick: u64) -> RawBodyFrame {
    let mut bodies = vec![Body::untracked(); body_count];

    if let Some(slot) = bodies.first_mut() {
        let t = tick as f32 / 30.0;
        let sway = 0.2 * (t * 0.8).sin();

        slot.is_tracked = true;
        slot.tracking_id = 72_057_594_037_928_000;
        for joint in slot.joints.iter_mut() {
            let (x, y) = template_position(joint.joint_type);
            joint.position = CameraSpacePoint::new(x + sway, y, 2.0);
            joint.tracking_state = match joint.joint_type {
                JointType::FootLeft | JointType::FootRight => TrackingState::Inferred,
                _ => TrackingState::Tracked,
            };
        }

        let hand = match (tick / 30) % 3 {
            0 => HandState::Open,
            1 => HandState::Closed,
            _ => HandState::Lasso,
        };
        slot.hand_left_state = hand;
        slot.hand_right_state = HandState::Unknown;
    }

    RawBodyFrame { bodies }
}

/// Provider that always reports the same sensor, or none.
pub struct SyntheticProvider {
    sensor: Option<Arc<SyntheticSensor>>,
}

impl SyntheticProvider {
    /// Provide `sensor` as the default device.
    pub fn new(sensor: Arc<SyntheticSensor>) -> Self {
        Self {
            sensor: Some(sensor),
        }
    }

    /// A provider with nothing plugged in.
    pub fn disconnected() -> Self {
        Self { sensor: None }
    }
}

impl SensorProvider for SyntheticProvider {
    fn default_sensor(&self) -> Option<Arc<dyn Sensor>> {
        self.sensor
            .as_ref()
            .map(|sensor| Arc::clone(sensor) as Arc<dyn Sensor>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn tiny() -> FrameDescription {
        FrameDescription {
            width: 4,
            height: 2,
        }
    }

    #[test]
    fn test_push_requires_open_sensor() {
        let sensor = SyntheticSensor::manual(tiny());
        let reader = sensor.open_color_reader().unwrap();
        reader.subscribe(|_| {});

        let frame = color_test_pattern(tiny(), 0);
        assert_eq!(sensor.push_color(Some(frame.clone())), 0);

        sensor.open().unwrap();
        assert_eq!(sensor.push_color(Some(frame)), 1);
    }

    #[test]
    fn test_disposed_readers_are_forgotten() {
        let sensor = SyntheticSensor::manual(tiny());
        sensor.open().unwrap();

        let first = sensor.open_body_reader().unwrap();
        let _second = sensor.open_body_reader().unwrap();
        first.dispose();

        assert_eq!(sensor.push_body(Some(swaying_body_frame(6, 0))), 1);
    }

    #[test]
    fn test_open_is_idempotent() {
        let sensor = SyntheticSensor::manual(tiny());
        sensor.open().unwrap();
        sensor.open().unwrap();
        assert_eq!(sensor.open_count(), 1);

        sensor.close().unwrap();
        sensor.close().unwrap();
        assert!(!sensor.is_open());
    }

    #[test]
    fn test_generator_delivers_until_closed() {
        let sensor = SyntheticSensor::new(SyntheticConfig {
            description: tiny(),
            generate: true,
            color_interval: Duration::from_millis(2),
            audio_interval: Duration::from_millis(2),
            body_interval: Duration::from_millis(2),
            ..SyntheticConfig::default()
        });

        let reader = sensor.open_audio_reader().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        reader.subscribe(move |args| {
            if args.acquire_frame().is_some() {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        });

        sensor.open().unwrap();
        thread::sleep(Duration::from_millis(50));
        sensor.close().unwrap();

        let delivered = count.load(Ordering::SeqCst);
        assert!(delivered > 0);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(count.load(Ordering::SeqCst), delivered);
    }

    #[test]
    fn test_swaying_body_has_one_tracked_slot() {
        let frame = swaying_body_frame(BODY_COUNT, 42);
        assert_eq!(frame.body_count(), BODY_COUNT);
        assert_eq!(frame.bodies.iter().filter(|b| b.is_tracked).count(), 1);
    }

    #[test]
    fn test_sine_subframe_is_float_pcm() {
        let mut phase = 0.0;
        let frame = sine_beam_frame(&mut phase);
        assert_eq!(frame.sub_frames.len(), 1);
        assert_eq!(
            frame.sub_frames[0].frame_length_in_bytes(),
            AUDIO_SUBFRAME_SAMPLES * 4
        );
    }
}
