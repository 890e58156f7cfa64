//! Skeletal data recorder writing CSV.

use std::fmt::Write as _;
use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use kinect_capture::BodySet;
use kinect_device::{Body, JointType};
use kinect_ipc::{BodyOutputConfig, Modality, Notifier};

use crate::gate::{RecordingEvent, RecordingGate};
use crate::output::claim_output_file;
use crate::writer::ThresholdWriter;
use crate::{Saver, SaverResult};

/// Joints exported per row, in column order.
pub const CSV_JOINTS: [JointType; 12] = [
    JointType::SpineBase,
    JointType::Neck,
    JointType::HipLeft,
    JointType::KneeLeft,
    JointType::HipRight,
    JointType::KneeRight,
    JointType::ShoulderLeft,
    JointType::ElbowLeft,
    JointType::WristLeft,
    JointType::ShoulderRight,
    JointType::ElbowRight,
    JointType::WristRight,
];

/// `TrackingId,Timestamp,SpineBase_X,SpineBase_Y,SpineBase_Z,...`
pub fn header_line() -> String {
    let mut header = String::from("TrackingId,Timestamp");
    for joint in CSV_JOINTS {
        let name = joint.name();
        let _ = write!(header, ",{name}_X,{name}_Y,{name}_Z");
    }
    header
}

/// One CSV row for a tracked body.
pub fn format_row(body: &Body, timestamp: &DateTime<Local>) -> String {
    let mut row = format!(
        "{},{}",
        body.tracking_id,
        timestamp.format("%Y-%m-%dT%H:%M:%S%.7f%:z")
    );
    for joint in CSV_JOINTS {
        let p = body.joint(joint).position;
        let _ = write!(row, ",{:.6},{:.6},{:.6}", p.x, p.y, p.z);
    }
    row
}

/// Appends one row per tracked body, batching disk writes.
pub struct BodySaver {
    gate: RecordingGate,
    path: PathBuf,
    writer: Mutex<Option<ThresholdWriter<File>>>,
}

impl BodySaver {
    /// Create `body_<timestamp>.csv` in `dir` and write the header.
    #[instrument(name = "body_saver_new", skip(config))]
    pub fn new(dir: &Path, config: &BodyOutputConfig) -> SaverResult<Self> {
        let (path, file) = claim_output_file(dir, "body", "csv")?;

        let mut writer = ThresholdWriter::new(file, config.flush_threshold_bytes);
        writer.write_line(&header_line())?;
        writer.flush()?;
        info!(path = %path.display(), "Body recording file opened");

        Ok(Self {
            gate: RecordingGate::new(),
            path,
            writer: Mutex::new(Some(writer)),
        })
    }

    fn append(&self, set: &BodySet) -> SaverResult<()> {
        let mut writer = self.writer.lock();
        let Some(writer) = writer.as_mut() else {
            return Ok(());
        };

        let now = Local::now();
        for (_, body) in set.tracked() {
            writer.write_line(&format_row(body, &now))?;
        }
        Ok(())
    }
}

impl Saver for BodySaver {
    type Frame = BodySet;

    fn modality(&self) -> Modality {
        Modality::Body
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

    fn write_frame(&self, set: &BodySet) {
        if !self.gate.is_open() {
            return;
        }
        if let Err(e) = self.append(set) {
            warn!("Dropping body frame: {}", e);
        }
    }

    fn dispose(&self) {
        self.gate.stop();
        if let Some(writer) = self.writer.lock().take() {
            if let Err(e) = writer.into_inner() {
                warn!("Failed to flush body recording: {}", e);
            }
            debug!(path = %self.path.display(), "Body recording closed");
        }
    }

    fn file_path(&self) -> &Path {
        &self.path
    }

    fn events(&self) -> &Notifier<RecordingEvent> {
        self.gate.events()
    }
}

impl Drop for BodySaver {
    fn drop(&mut self) {
        self.dispose();
    }
}
