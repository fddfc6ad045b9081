//! Per-account backup jobs for mailvault.
//!
//! This crate provides:
//! - The [`BackupTool`] seam and its command-backed implementation
//! - A log-polling progress monitor feeding events over a channel
//! - Failure classification (ineligible, rate limited) from tool logs
//! - The job runner with bounded rate-limit retries
//! - Artifact packaging (tar.gz with a JSON manifest) and lookup
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mailvault_backup::{BackupJobRunner, CommandBackupTool};
//! use mailvault_core::{EntityRecord, MailvaultConfig, RunLayout, RunTimestamp};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = MailvaultConfig::default();
//! let layout = RunLayout::new("/var/lib/mailvault", RunTimestamp::now());
//! let tool = Arc::new(CommandBackupTool::from_config(&config.backup));
//! let runner = BackupJobRunner::new(tool, layout, &config)?;
//!
//! let outcome = runner
//!     .run(&EntityRecord::new("a@example.com", "A"), &CancellationToken::new())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod classify;
pub mod compression;
pub mod error;
pub mod manifest;
pub mod monitor;
pub mod runner;
pub mod tool;

pub use archive::{count_files, remove_work_dir, ArchiveEntry, ArchiveIndex, ArchivePackager, ArchiveRecord};
pub use classify::{FailureKind, OutcomeClassifier};
pub use compression::{calculate_checksum, DEFAULT_COMPRESSION_LEVEL};
pub use error::{BackupError, PackagingError};
pub use manifest::{read_manifest, ArchiveManifest, MANIFEST_FILENAME};
pub use monitor::{
    MonitorHandle, MonitorSettings, MonitorSummary, ProgressEvent, ProgressMonitor, ProgressPatterns,
    ProgressSample, ProgressThrottle,
};
pub use runner::{BackupJobRunner, JobOutcome};
pub use tool::{BackupTool, CommandBackupTool, ToolExit};
