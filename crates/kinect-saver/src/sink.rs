//! Video container sinks.
//!
//! The default sink pipes raw BGR frames into an ffmpeg child process that
//! encodes MPEG-4 Part 2 with the XVID tag.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use ffmpeg_sidecar::command::FfmpegCommand;
use tracing::{debug, info, instrument, trace, warn};

use kinect_ipc::VideoOutputConfig;

use crate::error::SaverError;
use crate::SaverResult;

/// Destination for fixed-size BGR frames.
pub trait VideoSink: Send {
    /// Append one `width * height * 3` BGR frame.
    fn write_frame(&mut self, bgr: &[u8]) -> SaverResult<()>;

    /// Flush and close the container.
    fn finish(&mut self) -> SaverResult<()>;
}

/// Opens a [`VideoSink`] for a new recording.
pub trait VideoSinkFactory: Send + Sync {
    fn create(&self, path: &Path, config: &VideoOutputConfig) -> SaverResult<Box<dyn VideoSink>>;
}

/// Creates [`FfmpegSink`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegSinkFactory;

impl VideoSinkFactory for FfmpegSinkFactory {
    fn create(&self, path: &Path, config: &VideoOutputConfig) -> SaverResult<Box<dyn VideoSink>> {
        Ok(Box::new(FfmpegSink::spawn(path, config)?))
    }
}

/// How long a freshly spawned ffmpeg is watched for an early exit.
const STARTUP_GRACE: Duration = Duration::from_millis(150);

/// ffmpeg child process fed through stdin.
pub struct FfmpegSink {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_reader: Option<JoinHandle<()>>,
    frames_written: u64,
}

impl FfmpegSink {
    /// Start ffmpeg writing to `path`.
    ///
    /// Fails if `path` cannot be opened for writing or ffmpeg exits during
    /// startup.
    #[instrument(name = "ffmpeg_sink_spawn", skip(config))]
    pub fn spawn(path: &Path, config: &VideoOutputConfig) -> SaverResult<Self> {
        // ffmpeg only opens its output after the first frame arrives.
        OpenOptions::new().write(true).create(true).open(path)?;

        let mut command = FfmpegCommand::new();
        command
            .args(["-f", "rawvideo"])
            .args(["-pix_fmt", "bgr24"])
            .args(["-s", &format!("{}x{}", config.width, config.height)])
            .args(["-r", &config.fps.to_string()])
            .args(["-i", "-"])
            .args(["-c:v", "mpeg4"])
            .args(["-vtag", "xvid"])
            // The saver claims the file empty before the sink starts.
            .args(["-y"])
            .arg(path.to_string_lossy().to_string());

        let inner = command.as_inner_mut();
        inner.stdin(Stdio::piped());
        inner.stdout(Stdio::null());
        inner.stderr(Stdio::piped());

        let mut child = inner
            .spawn()
            .map_err(|e| SaverError::Encoder(format!("failed to start ffmpeg: {}", e)))?;

        let Some(stdin) = child.stdin.take() else {
            // Reap the process before bailing out.
            let _ = child.kill();
            let _ = child.wait();
            return Err(SaverError::Encoder("ffmpeg stdin unavailable".to_string()));
        };

        if let Err(e) = wait_for_startup(&mut child) {
            drop(stdin);
            let _ = child.kill();
            let _ = child.wait();
            return Err(e);
        }

        let stderr_reader = child.stderr.take().map(|stderr| {
            thread::spawn(move || {
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    trace!(target: "ffmpeg", "{}", line);
                }
            })
        });

        info!(
            width = config.width,
            height = config.height,
            fps = config.fps,
            "ffmpeg video sink started"
        );

        Ok(Self {
            child: Some(child),
            stdin: Some(stdin),
            stderr_reader,
            frames_written: 0,
        })
    }
}

/// Return an error if `child` exits within [`STARTUP_GRACE`].
fn wait_for_startup(child: &mut Child) -> SaverResult<()> {
    let deadline = Instant::now() + STARTUP_GRACE;
    while Instant::now() < deadline {
        if let Some(status) = child.try_wait()? {
            return Err(SaverError::Encoder(format!(
                "ffmpeg exited during startup with {:?}",
                status.code()
            )));
        }
        thread::sleep(Duration::from_millis(10));
    }
    Ok(())
}

impl VideoSink for FfmpegSink {
    fn write_frame(&mut self, bgr: &[u8]) -> SaverResult<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| SaverError::Encoder("sink already finished".to_string()))?;
        stdin.write_all(bgr)?;
        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> SaverResult<()> {
        // Closing stdin signals end of input.
        drop(self.stdin.take());

        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child.wait()?;

        if let Some(reader) = self.stderr_reader.take() {
            if reader.join().is_err() {
                warn!("ffmpeg stderr reader panicked");
            }
        }

        if !status.success() {
            return Err(SaverError::Encoder(format!(
                "ffmpeg exited with {:?}",
                status.code()
            )));
        }

        debug!(frames = self.frames_written, "ffmpeg video sink finished");
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if self.child.is_some() {
            if let Err(e) = self.finish() {
                warn!("ffmpeg sink close failed: {}", e);
            }
        }
    }
}
