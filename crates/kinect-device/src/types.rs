//! Sensor data model shared by the driver and the capture pipeline.

use bytes::Bytes;

use crate::error::DeviceError;
use crate::DeviceResult;

/// Maximum number of bodies the sensor tracks at once.
pub const BODY_COUNT: usize = 6;

/// Number of joints in a tracked body.
pub const JOINT_COUNT: usize = 25;

/// A point in camera space, in meters. `z` is the distance from the sensor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraSpacePoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl CameraSpacePoint {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// A point in color image space, in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ColorSpacePoint {
    pub x: f32,
    pub y: f32,
}

/// Skeleton joints, in the sensor's native order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointType {
    SpineBase,
    SpineMid,
    Neck,
    Head,
    ShoulderLeft,
    ElbowLeft,
    WristLeft,
    HandLeft,
    ShoulderRight,
    ElbowRight,
    WristRight,
    HandRight,
    HipLeft,
    KneeLeft,
    AnkleLeft,
    FootLeft,
    HipRight,
    KneeRight,
    AnkleRight,
    FootRight,
    SpineShoulder,
    HandTipLeft,
    ThumbLeft,
    HandTipRight,
    ThumbRight,
}

impl JointType {
    /// Every joint, indexed by [`JointType::index`].
    pub const ALL: [JointType; JOINT_COUNT] = [
        Self::SpineBase,
        Self::SpineMid,
        Self::Neck,
        Self::Head,
        Self::ShoulderLeft,
        Self::ElbowLeft,
        Self::WristLeft,
        Self::HandLeft,
        Self::ShoulderRight,
        Self::ElbowRight,
        Self::WristRight,
        Self::HandRight,
        Self::HipLeft,
        Self::KneeLeft,
        Self::AnkleLeft,
        Self::FootLeft,
        Self::HipRight,
        Self::KneeRight,
        Self::AnkleRight,
        Self::FootRight,
        Self::SpineShoulder,
        Self::HandTipLeft,
        Self::ThumbLeft,
        Self::HandTipRight,
        Self::ThumbRight,
    ];

    /// Position of this joint in a body's joint array.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Name used in file headers.
    pub fn name(self) -> &'static str {
        match self {
            Self::SpineBase => "SpineBase",
            Self::SpineMid => "SpineMid",
            Self::Neck => "Neck",
            Self::Head => "Head",
            Self::ShoulderLeft => "ShoulderLeft",
            Self::ElbowLeft => "ElbowLeft",
            Self::WristLeft => "WristLeft",
            Self::HandLeft => "HandLeft",
            Self::ShoulderRight => "ShoulderRight",
            Self::ElbowRight => "ElbowRight",
            Self::WristRight => "WristRight",
            Self::HandRight => "HandRight",
            Self::HipLeft => "HipLeft",
            Self::KneeLeft => "KneeLeft",
            Self::AnkleLeft => "AnkleLeft",
            Self::FootLeft => "FootLeft",
            Self::HipRight => "HipRight",
            Self::KneeRight => "KneeRight",
            Self::AnkleRight => "AnkleRight",
            Self::FootRight => "FootRight",
            Self::SpineShoulder => "SpineShoulder",
            Self::HandTipLeft => "HandTipLeft",
            Self::ThumbLeft => "ThumbLeft",
            Self::HandTipRight => "HandTipRight",
            Self::ThumbRight => "ThumbRight",
        }
    }
}

/// How confidently a joint position was determined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrackingState {
    #[default]
    NotTracked,
    Inferred,
    Tracked,
}

/// Discrete hand pose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HandState {
    #[default]
    Unknown,
    NotTracked,
    Open,
    Closed,
    Lasso,
}

/// One joint of a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Joint {
    pub joint_type: JointType,
    pub position: CameraSpacePoint,
    pub tracking_state: TrackingState,
}

/// One body slot. Joint data is only meaningful when `is_tracked` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub is_tracked: bool,
    pub tracking_id: u64,
    pub joints: [Joint; JOINT_COUNT],
    pub hand_left_state: HandState,
    pub hand_right_state: HandState,
}

impl Body {
    /// An empty slot.
    pub fn untracked() -> Self {
        Self {
            is_tracked: false,
            tracking_id: 0,
            joints: JointType::ALL.map(|joint_type| Joint {
                joint_type,
                position: CameraSpacePoint::default(),
                tracking_state: TrackingState::NotTracked,
            }),
            hand_left_state: HandState::Unknown,
            hand_right_state: HandState::Unknown,
        }
    }

    /// A tracked body with every joint at `position` and `state`.
    pub fn uniform(tracking_id: u64, position: CameraSpacePoint, state: TrackingState) -> Self {
        let mut body = Self::untracked();
        body.is_tracked = true;
        body.tracking_id = tracking_id;
        for joint in &mut body.joints {
            joint.position = position;
            joint.tracking_state = state;
        }
        body
    }

    /// Look up a joint.
    pub fn joint(&self, joint_type: JointType) -> &Joint {
        &self.joints[joint_type.index()]
    }

    /// Mutable joint lookup.
    pub fn joint_mut(&mut self, joint_type: JointType) -> &mut Joint {
        &mut self.joints[joint_type.index()]
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::untracked()
    }
}

/// Declared size of a color source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDescription {
    pub width: u32,
    pub height: u32,
}

impl FrameDescription {
    /// Byte length of a BGRA image of this size.
    pub fn bgra_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Pixel layouts a color frame can be delivered or converted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorImageFormat {
    Bgra,
    Rgba,
    /// Packed 4:2:2, `Y0 U Y1 V` per pixel pair.
    Yuy2,
}

impl ColorImageFormat {
    /// Bytes one frame of `description` occupies in this format.
    pub fn frame_len(self, description: FrameDescription) -> usize {
        let pixels = description.width as usize * description.height as usize;
        match self {
            Self::Bgra | Self::Rgba => pixels * 4,
            Self::Yuy2 => pixels * 2,
        }
    }
}

/// A color frame as delivered by the driver.
#[derive(Debug, Clone)]
pub struct RawColorFrame {
    pub description: FrameDescription,
    pub format: ColorImageFormat,
    pub data: Bytes,
}

impl RawColorFrame {
    /// Convert this frame into `dst` as BGRA.
    ///
    /// `dst` must be exactly `width * height * 4` bytes.
    pub fn copy_converted_frame_data(
        &self,
        dst: &mut [u8],
        format: ColorImageFormat,
    ) -> DeviceResult<()> {
        if format != ColorImageFormat::Bgra {
            return Err(DeviceError::FrameConversion(format!(
                "unsupported target format {format:?}"
            )));
        }

        let expected_src = self.format.frame_len(self.description);
        if self.data.len() < expected_src {
            return Err(DeviceError::FrameConversion(format!(
                "{:?} buffer too small: got {}, expected {}",
                self.format,
                self.data.len(),
                expected_src
            )));
        }

        let expected_dst = self.description.bgra_len();
        if dst.len() != expected_dst {
            return Err(DeviceError::FrameConversion(format!(
                "destination is {} bytes, expected {}",
                dst.len(),
                expected_dst
            )));
        }

        match self.format {
            ColorImageFormat::Bgra => dst.copy_from_slice(&self.data[..expected_src]),
            ColorImageFormat::Rgba => {
                for (out, px) in dst.chunks_exact_mut(4).zip(self.data.chunks_exact(4)) {
                    out.copy_from_slice(&[px[2], px[1], px[0], px[3]]);
                }
            }
            ColorImageFormat::Yuy2 => yuy2_to_bgra(&self.data[..expected_src], dst),
        }

        Ok(())
    }
}

/// BT.601 limited-range YUY2 to BGRA.
///
/// An odd pixel count leaves a trailing `Y U` half-pair, which borrows the
/// V sample of the pair before it.
fn yuy2_to_bgra(src: &[u8], dst: &mut [u8]) {
    let pairs = src.chunks_exact(4);
    let tail = pairs.remainder();
    let mut last_v = 128;

    for (out, pair) in dst.chunks_exact_mut(8).zip(pairs) {
        out[..4].copy_from_slice(&yuv_to_bgra(pair[0], pair[1], pair[3]));
        out[4..].copy_from_slice(&yuv_to_bgra(pair[2], pair[1], pair[3]));
        last_v = pair[3];
    }

    if let &[y, u] = tail {
        let start = dst.len() - 4;
        dst[start..].copy_from_slice(&yuv_to_bgra(y, u, last_v));
    }
}

fn yuv_to_bgra(y: u8, u: u8, v: u8) -> [u8; 4] {
    let c = 1.164 * (y as f32 - 16.0);
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;
    let r = (c + 1.596 * v).clamp(0.0, 255.0) as u8;
    let g = (c - 0.392 * u - 0.813 * v).clamp(0.0, 255.0) as u8;
    let b = (c + 2.017 * u).clamp(0.0, 255.0) as u8;
    [b, g, r, 255]
}

/// Sample encoding of an audio sub-frame payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioSampleFormat {
    Float32,
    Int16,
}

/// One sub-frame of a beam frame.
#[derive(Debug, Clone)]
pub struct AudioSubFrame {
    pub format: AudioSampleFormat,
    pub data: Bytes,
}

impl AudioSubFrame {
    /// Build a float sub-frame from samples.
    pub fn from_f32(samples: &[f32]) -> Self {
        let mut data = Vec::with_capacity(samples.len() * 4);
        for sample in samples {
            data.extend_from_slice(&sample.to_le_bytes());
        }
        Self {
            format: AudioSampleFormat::Float32,
            data: Bytes::from(data),
        }
    }

    /// Declared payload length.
    pub fn frame_length_in_bytes(&self) -> usize {
        self.data.len()
    }

    /// Copy the payload into `dst`, which must match the declared length.
    pub fn copy_frame_data_to(&self, dst: &mut [u8]) -> DeviceResult<()> {
        if dst.len() != self.data.len() {
            return Err(DeviceError::FrameConversion(format!(
                "audio destination is {} bytes, sub-frame is {}",
                dst.len(),
                self.data.len()
            )));
        }
        dst.copy_from_slice(&self.data);
        Ok(())
    }
}

/// One beam frame from the microphone array.
#[derive(Debug, Clone, Default)]
pub struct AudioBeamFrame {
    pub sub_frames: Vec<AudioSubFrame>,
}

/// Beam frames delivered together in one callback.
pub type AudioBeamFrameList = Vec<AudioBeamFrame>;

/// A skeletal frame as delivered by the driver.
#[derive(Debug, Clone)]
pub struct RawBodyFrame {
    pub bodies: Vec<Body>,
}

impl RawBodyFrame {
    /// Number of slots in this frame.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Overwrite `dst` with this frame's slots. Extra destination slots are
    /// reset to untracked.
    pub fn get_and_refresh_body_data(&self, dst: &mut [Body]) -> DeviceResult<()> {
        if dst.len() < self.bodies.len() {
            return Err(DeviceError::FrameConversion(format!(
                "body array holds {} slots, frame has {}",
                dst.len(),
                self.bodies.len()
            )));
        }

        for (slot, body) in dst.iter_mut().zip(self.bodies.iter()) {
            slot.clone_from(body);
        }
        for slot in dst.iter_mut().skip(self.bodies.len()) {
            *slot = Body::untracked();
        }
        Ok(())
    }
}
