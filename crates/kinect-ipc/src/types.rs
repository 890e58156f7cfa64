//! Common types shared by the engine and its pipeline stages.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A sensor stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modality {
    /// Color camera.
    Video,

    /// Microphone array beam.
    Audio,

    /// Skeletal tracking.
    Body,
}

impl Modality {
    /// Every modality, in wiring order.
    pub const ALL: [Modality; 3] = [Modality::Video, Modality::Audio, Modality::Body];

    /// Returns the display name for this modality.
    pub fn name(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Body => "body",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Configuration for a capture session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Output directories per modality.
    pub output: OutputDirs,

    /// Video file parameters.
    pub video: VideoOutputConfig,

    /// Audio file parameters.
    pub audio: AudioOutputConfig,

    /// Body data file parameters.
    pub body: BodyOutputConfig,

    /// Skeleton preview canvas.
    pub render: RenderConfig,

    /// RFID companion command channel.
    pub companion: CompanionConfig,
}

/// Directories the savers write into. Created on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputDirs {
    pub video: PathBuf,
    pub audio: PathBuf,
    pub body: PathBuf,
}

impl Default for OutputDirs {
    fn default() -> Self {
        let dir = PathBuf::from("recordings");
        Self {
            video: dir.clone(),
            audio: dir.clone(),
            body: dir,
        }
    }
}

/// Video container parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoOutputConfig {
    /// Target width in pixels (frames are resized to it).
    pub width: u32,

    /// Target height in pixels.
    pub height: u32,

    /// Container frame rate.
    pub fps: f64,
}

impl Default for VideoOutputConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 30.0,
        }
    }
}

/// PCM container parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioOutputConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,

    /// Bits per sample.
    pub bits_per_sample: u16,

    /// Number of channels.
    pub channels: u16,
}

impl Default for AudioOutputConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            bits_per_sample: 16,
            channels: 1,
        }
    }
}

/// Body CSV parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyOutputConfig {
    /// Buffered bytes that force a flush to disk.
    pub flush_threshold_bytes: usize,
}

impl Default for BodyOutputConfig {
    fn default() -> Self {
        Self {
            flush_threshold_bytes: 1024 * 1024,
        }
    }
}

/// Skeleton preview canvas size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// RFID companion command channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanionConfig {
    /// Whether commands are sent at all.
    pub enabled: bool,

    /// Destination `host:port`.
    pub address: String,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: "127.0.0.1:9999".to_string(),
        }
    }
}
