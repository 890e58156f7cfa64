//! Output file naming.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::debug;

use crate::SaverResult;

/// Suffixes tried before giving up on a timestamp.
const MAX_SUFFIX: u32 = 10_000;

/// Create a new, empty `<dir>/<prefix>_YYYYMMDD_HHMMSS.<extension>` file,
/// creating `dir` if absent.
///
/// An existing file is never reused: when the name is taken, `_1`, `_2`, ...
/// is appended to the stem until `create_new` succeeds.
pub fn claim_output_file(dir: &Path, prefix: &str, extension: &str) -> SaverResult<(PathBuf, File)> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
        debug!(dir = %dir.display(), "Created output directory");
    }

    let stem = format!("{}_{}", prefix, Local::now().format("%Y%m%d_%H%M%S"));
    for suffix in 0..MAX_SUFFIX {
        let name = match suffix {
            0 => format!("{}.{}", stem, extension),
            n => format!("{}_{}.{}", stem, n, extension),
        };
        let path = dir.join(name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free file name for {} in {}", stem, dir.display()),
    )
    .into())
}
