//! Recorders for the three sensor streams.
//!
//! A saver owns one timestamped output file and a [`RecordingGate`]. Its
//! [`Saver::write_frame`] is attached to a capturer's frame notifier and
//! writes only while the gate is open. Per-frame failures are logged and the
//! frame is dropped; construction failures are returned.

mod audio;
mod body;
mod error;
mod gate;
mod output;
mod sink;
mod video;
mod writer;

pub use audio::{float_bytes_to_pcm16, AudioSaver};
pub use body::{format_row, header_line, BodySaver, CSV_JOINTS};
pub use error::SaverError;
pub use gate::{RecordingEvent, RecordingGate};
pub use output::claim_output_file;
pub use sink::{FfmpegSink, FfmpegSinkFactory, VideoSink, VideoSinkFactory};
pub use video::{bgra_to_bgr, resize_bgr, VideoSaver};
pub use writer::ThresholdWriter;

use std::path::Path;

use kinect_ipc::{Modality, Notifier};

/// Result type for saver operations.
pub type SaverResult<T> = Result<T, SaverError>;

/// Gated recorder for one stream.
pub trait Saver: Send + Sync {
    /// Frame type accepted by [`Saver::write_frame`].
    type Frame;

    /// Which stream this saver records.
    fn modality(&self) -> Modality;

    /// Open the gate. Returns true on a genuine transition.
    fn start(&self) -> bool;

    /// Close the gate. Returns true on a genuine transition.
    fn stop(&self) -> bool;

    fn is_recording(&self) -> bool;

    /// Convert and append a frame. No-op while the gate is closed.
    fn write_frame(&self, frame: &Self::Frame);

    /// Stop, flush and release the output file.
    fn dispose(&self);

    /// Path of the output file.
    fn file_path(&self) -> &Path;

    /// Recording started/stopped notifications.
    fn events(&self) -> &Notifier<RecordingEvent>;
}
