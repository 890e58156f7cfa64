//! Driver boundary traits.

use std::sync::Arc;

use crate::reader::FrameReader;
use crate::types::{
    AudioBeamFrameList, CameraSpacePoint, ColorSpacePoint, FrameDescription, RawBodyFrame,
    RawColorFrame,
};
use crate::DeviceResult;

/// Translates camera-space points into color image coordinates.
pub trait CoordinateMapper: Send + Sync {
    /// Project a camera-space point onto the color image.
    fn map_camera_point_to_color_space(&self, point: CameraSpacePoint) -> ColorSpacePoint;
}

/// A physical (or simulated) depth sensor.
///
/// One sensor is shared by every capturer; `open` and `close` are
/// idempotent.
pub trait Sensor: Send + Sync {
    /// Whether the hardware channel is open.
    fn is_open(&self) -> bool;

    /// Open the hardware channel.
    fn open(&self) -> DeviceResult<()>;

    /// Close the hardware channel.
    fn close(&self) -> DeviceResult<()>;

    /// Camera-to-color projection for this sensor.
    fn coordinate_mapper(&self) -> Arc<dyn CoordinateMapper>;

    /// Size of the color stream.
    fn color_frame_description(&self) -> FrameDescription;

    /// Number of body slots per skeletal frame.
    fn body_count(&self) -> usize;

    /// Open a reader on the color stream.
    fn open_color_reader(&self) -> DeviceResult<FrameReader<RawColorFrame>>;

    /// Open a reader on the audio beam stream.
    fn open_audio_reader(&self) -> DeviceResult<FrameReader<AudioBeamFrameList>>;

    /// Open a reader on the skeletal stream.
    fn open_body_reader(&self) -> DeviceResult<FrameReader<RawBodyFrame>>;
}

/// Locates the default connected sensor.
pub trait SensorProvider: Send + Sync {
    /// Returns `None` when no sensor is connected.
    fn default_sensor(&self) -> Option<Arc<dyn Sensor>>;
}
