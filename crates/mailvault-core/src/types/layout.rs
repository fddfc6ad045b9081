//! On-disk layout of persisted run state
//!
//! ```text
//! <base>/archives/<identifier>_<run_timestamp>.tar.gz
//! <base>/logs/run_<run_timestamp>.log
//! <base>/logs/<identifier>_<run_timestamp>.log
//! <base>/reports/report_<run_timestamp>.txt
//! <base>/tmp/<run_timestamp>/<identifier>/
//! ```

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::run::RunTimestamp;

/// File extension of every artifact
pub const ARCHIVE_EXTENSION: &str = "tar.gz";

/// Suffix of artifacts still being written
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Paths used by one run
#[derive(Debug, Clone)]
pub struct RunLayout {
    base_dir: PathBuf,
    run_timestamp: RunTimestamp,
}

impl RunLayout {
    pub fn new(base_dir: impl Into<PathBuf>, run_timestamp: RunTimestamp) -> Self {
        Self {
            base_dir: base_dir.into(),
            run_timestamp,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn run_timestamp(&self) -> &RunTimestamp {
        &self.run_timestamp
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.base_dir.join("archives")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    pub fn report_dir(&self) -> PathBuf {
        self.base_dir.join("reports")
    }

    /// Root under which all working directories live
    pub fn temp_root(&self) -> PathBuf {
        self.base_dir.join("tmp")
    }

    /// Working directories of this run
    pub fn run_temp_dir(&self) -> PathBuf {
        self.temp_root().join(self.run_timestamp.as_str())
    }

    pub fn entity_work_dir(&self, identifier: &str) -> PathBuf {
        self.run_temp_dir().join(identifier)
    }

    pub fn entity_log_path(&self, identifier: &str) -> PathBuf {
        self.log_dir()
            .join(format!("{}_{}.log", identifier, self.run_timestamp))
    }

    pub fn run_log_path(&self) -> PathBuf {
        self.log_dir()
            .join(format!("run_{}.log", self.run_timestamp))
    }

    pub fn report_path(&self) -> PathBuf {
        self.report_dir()
            .join(format!("report_{}.txt", self.run_timestamp))
    }

    /// Final artifact path for an entity in this run
    pub fn archive_path(&self, identifier: &str) -> PathBuf {
        self.archive_dir().join(format!(
            "{}_{}.{}",
            identifier, self.run_timestamp, ARCHIVE_EXTENSION
        ))
    }

    /// Create every directory of the layout.
    ///
    /// Directories are restricted to the owner on unix since artifacts and
    /// logs contain mailbox data.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [
            self.base_dir.clone(),
            self.archive_dir(),
            self.log_dir(),
            self.report_dir(),
            self.temp_root(),
        ] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&dir, fs::Permissions::from_mode(0o700)).with_context(
                    || format!("Failed to restrict permissions on {}", dir.display()),
                )?;
            }
        }
        Ok(())
    }

    /// Remove this run's working directories and any half-written artifacts.
    ///
    /// Returns the number of entries removed. Individual failures are logged
    /// and skipped.
    pub fn cleanup_run_temp(&self) -> usize {
        let mut removed = 0;

        let run_temp = self.run_temp_dir();
        if run_temp.exists() {
            match fs::remove_dir_all(&run_temp) {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!(
                    "Failed to remove temporary directory {}: {}",
                    run_temp.display(),
                    e
                ),
            }
        }

        let partial_marker = format!("_{}.{}{}", self.run_timestamp, ARCHIVE_EXTENSION, PARTIAL_SUFFIX);
        if let Ok(entries) = fs::read_dir(self.archive_dir()) {
            for entry in entries.flatten() {
                let name = entry.file_name().to_string_lossy().to_string();
                if name.ends_with(&partial_marker) {
                    match fs::remove_file(entry.path()) {
                        Ok(()) => removed += 1,
                        Err(e) => tracing::warn!("Failed to remove partial artifact {}: {}", name, e),
                    }
                }
            }
        }

        removed
    }
}
