//! Color video recorder.

use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgb};
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use kinect_capture::VideoFrame;
use kinect_ipc::{Modality, Notifier, VideoOutputConfig};

use crate::error::SaverError;
use crate::gate::{RecordingEvent, RecordingGate};
use crate::output::claim_output_file;
use crate::sink::{FfmpegSinkFactory, VideoSink, VideoSinkFactory};
use crate::{Saver, SaverResult};

/// Converts BGRA frames to BGR at the target size and appends them to a
/// fixed-rate video container.
pub struct VideoSaver {
    gate: RecordingGate,
    path: PathBuf,
    width: u32,
    height: u32,
    sink: Mutex<Option<Box<dyn VideoSink>>>,
}

impl VideoSaver {
    /// Open `video_<timestamp>.mp4` in `dir` with the ffmpeg sink.
    pub fn new(dir: &Path, config: &VideoOutputConfig) -> SaverResult<Self> {
        Self::with_factory(dir, config, &FfmpegSinkFactory)
    }

    /// Open a recording with a custom sink.
    #[instrument(name = "video_saver_new", skip(config, factory))]
    pub fn with_factory(
        dir: &Path,
        config: &VideoOutputConfig,
        factory: &dyn VideoSinkFactory,
    ) -> SaverResult<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(SaverError::UnsupportedFormat(format!(
                "video size {}x{}",
                config.width, config.height
            )));
        }

        let (path, file) = claim_output_file(dir, "video", "mp4")?;
        drop(file);
        let sink = match factory.create(&path, config) {
            Ok(sink) => sink,
            Err(e) => {
                if let Err(remove) = fs::remove_file(&path) {
                    debug!(path = %path.display(), "Could not remove unused video file: {}", remove);
                }
                return Err(e);
            }
        };
        info!(path = %path.display(), "Video recording file opened");

        Ok(Self {
            gate: RecordingGate::new(),
            path,
            width: config.width,
            height: config.height,
            sink: Mutex::new(Some(sink)),
        })
    }

    /// Output frame size.
    pub fn target_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn encode(&self, frame: &VideoFrame) -> SaverResult<()> {
        if !frame.is_valid() {
            return Err(SaverError::FrameConversion(format!(
                "{}x{} frame carries {} bytes",
                frame.width,
                frame.height,
                frame.data.len()
            )));
        }

        let bgr = bgra_to_bgr(&frame.data);
        let bgr = if (frame.width, frame.height) == (self.width, self.height) {
            bgr
        } else {
            resize_bgr(bgr, frame.width, frame.height, self.width, self.height)?
        };

        let mut sink = self.sink.lock();
        match sink.as_mut() {
            Some(sink) => sink.write_frame(&bgr),
            None => Ok(()),
        }
    }
}

/// Drop the alpha channel.
pub fn bgra_to_bgr(bgra: &[u8]) -> Vec<u8> {
    let mut bgr = Vec::with_capacity(bgra.len() / 4 * 3);
    for pixel in bgra.chunks_exact(4) {
        bgr.extend_from_slice(&pixel[..3]);
    }
    bgr
}

/// Bilinear resize of packed 3-channel data.
pub fn resize_bgr(
    bgr: Vec<u8>,
    width: u32,
    height: u32,
    target_width: u32,
    target_height: u32,
) -> SaverResult<Vec<u8>> {
    // Channel order is irrelevant to the filter.
    let image = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_raw(width, height, bgr).ok_or_else(|| {
        SaverError::FrameConversion(format!("buffer does not hold a {}x{} image", width, height))
    })?;
    let resized = imageops::resize(&image, target_width, target_height, FilterType::Triangle);
    Ok(resized.into_raw())
}

impl Saver for VideoSaver {
    type Frame = VideoFrame;

    fn modality(&self) -> Modality {
        Modality::Video
    }

    fn start(&self) -> bool {
        self.gate.start()
    }

    fn stop(&self) -> bool {
        self.gate.stop()
    }

    fn is_recording(&self) -> bool {
        self.gate.is_open()
    }

    fn write_frame(&self, frame: &VideoFrame) {
        if !self.gate.is_open() {
            return;
        }
        if let Err(e) = self.encode(frame) {
            warn!(sequence = frame.sequence, "Dropping video frame: {}", e);
        }
    }

    fn dispose(&self) {
        self.gate.stop();
        if let Some(mut sink) = self.sink.lock().take() {
            if let Err(e) = sink.finish() {
                warn!("Failed to finalize video recording: {}", e);
            }
            debug!(path = %self.path.display(), "Video recording closed");
        }
    }

    fn file_path(&self) -> &Path {
        &self.path
    }

    fn events(&self) -> &Notifier<RecordingEvent> {
        self.gate.events()
    }
}

impl Drop for VideoSaver {
    fn drop(&mut self) {
        self.dispose();
    }
}
