//! Depth sensor model and driver boundary.
//!
//! This crate defines the data a depth sensor delivers, the traits a driver
//! backend implements ([`Sensor`], [`SensorProvider`], [`CoordinateMapper`]),
//! the [`FrameReader`] delivery channel, a [`SyntheticSensor`] backend, and
//! the [`DeviceSession`] lifecycle every capturer composes.

mod error;
mod mapper;
mod reader;
mod sensor;
mod session;
mod synthetic;
mod types;

pub use error::DeviceError;
pub use mapper::PinholeMapper;
pub use reader::{frame_channel, AcquiredFrame, FrameArrivedArgs, FrameReader, ReaderFeed};
pub use sensor::{CoordinateMapper, Sensor, SensorProvider};
pub use session::{DeviceSession, SessionState};
pub use synthetic::{SyntheticConfig, SyntheticProvider, SyntheticSensor};
pub use types::{
    AudioBeamFrame, AudioBeamFrameList, AudioSampleFormat, AudioSubFrame, Body,
    CameraSpacePoint, ColorImageFormat, ColorSpacePoint, FrameDescription, HandState, Joint,
    JointType, RawBodyFrame, RawColorFrame, TrackingState, BODY_COUNT, JOINT_COUNT,
};

/// Result type for device operations.
pub type DeviceResult<T> = Result<T, DeviceError>;
