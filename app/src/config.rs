//! Session configuration loading.

use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing::{debug, info};

use kinect_ipc::SessionConfig;

/// Load the session configuration, falling back to defaults when no file is given.
///
/// Missing keys take their default values.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<SessionConfig> {
    let Some(path) = path else {
        debug!("No configuration file, using defaults");
        return Ok(SessionConfig::default());
    };

    let text = fs::read_to_string(path)
        .with_context(|| format!("reading configuration {}", path.display()))?;
    let config: SessionConfig = serde_json::from_str(&text)
        .with_context(|| format!("parsing configuration {}", path.display()))?;

    info!(path = %path.display(), "Configuration loaded");
    Ok(config)
}

/// Point all three modality outputs at one directory.
pub fn apply_output_dir(config: &mut SessionConfig, dir: &Path) {
    config.output.video = dir.to_path_buf();
    config.output.audio = dir.to_path_buf();
    config.output.body = dir.to_path_buf();
}
