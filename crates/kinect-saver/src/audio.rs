//! Audio recorder writing 16-bit PCM WAV.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use kinect_capture::AudioFrame;
use kinect_ipc::{AudioOutputConfig, Modality, Notifier};

use crate::error::SaverError;
use crate::gate::{RecordingEvent, RecordingGate};
use crate::output::claim_output_file;
use crate::{Saver, SaverResult};

/// Interprets sub-frame bytes as 32-bit float samples and appends them as
/// 16-bit PCM.
pub struct AudioSaver {
    gate: RecordingGate,
    path: PathBuf,
    writer: Mutex<Option<WavWriter<BufWriter<File>>>>,
}

impl AudioSaver {
    /// Open `audio_<timestamp>.wav` in `dir`.
    #[instrument(name = "audio_saver_new", skip(config))]
    pub fn new(dir: &Path, config: &AudioOutputConfig) -> SaverResult<Self> {
        if config.bits_per_sample != 16 {
            return Err(SaverError::UnsupportedFormat(format!(
                "{}-bit PCM",
                config.bits_per_sample
            )));
        }

        let spec = WavSpec {
            channels: config.channels,
            sample_rate: config.sample_rate,
            bits_per_sample: config.bits_per_sample,
            sample_format: SampleFormat::Int,
        };

        let (path, file) = claim_output_file(dir, "audio", "wav")?;
        let writer = WavWriter::new(BufWriter::new(file), spec)?;
        info!(
            path = %path.display(),
            sample_rate = config.sample_rate,
            channels = config.channels,
            "Audio recording file opened"
        );

        Ok(Self {
            gate: RecordingGate::new(),
            path,
            writer: Mutex::new(Some(writer)),
        })
    }

    fn append(&self, frame: &AudioFrame) -> SaverResult<()> {
        let mut writer = self.writer.lock();
        let Some(writer) = writer.as_mut() else {
            return Ok(());
        };

        for sample in float_bytes_to_pcm16(frame.as_bytes()) {
            writer.write_sample(sample)?;
        }
        Ok(())
    }
}

/// Little-endian f32 samples to i16 by scaling with `i16::MAX`.
///
/// A trailing partial sample is ignored.
pub fn float_bytes_to_pcm16(bytes: &[u8]) -> impl Iterator<Item = i16> + '_ {
    bytes.chunks_exact(4).map(|chunk| {
        let sample = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        (sample * i16::MAX as f32) as i16
    })
}

impl Saver for AudioSaver {
    type Frame = AudioFrame;

    fn modality(&self) -> Modality {
        Modality::Audio
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

    fn write_frame(&self, frame: &AudioFrame) {
        if !self.gate.is_open() {
            return;
        }
        if let Err(e) = self.append(frame) {
            warn!(length = frame.length, "Dropping audio frame: {}", e);
        }
    }

    fn dispose(&self) {
        self.gate.stop();
        if let Some(writer) = self.writer.lock().take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize audio recording: {}", e);
            }
            debug!(path = %self.path.display(), "Audio recording closed");
        }
    }

    fn file_path(&self) -> &Path {
        &self.path
    }

    fn events(&self) -> &Notifier<RecordingEvent> {
        self.gate.events()
    }
}

impl Drop for AudioSaver {
    fn drop(&mut self) {
        self.dispose();
    }
}
