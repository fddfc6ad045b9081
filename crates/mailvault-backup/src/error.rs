//! Error types for backup jobs and packaging

use std::path::PathBuf;
use thiserror::Error;

/// Errors from one account's backup job
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Backup tool failed (exit code {}), see {}", display_code(.exit_code), .log_path.display())]
    ToolFailed {
        log_path: PathBuf,
        exit_code: Option<i32>,
    },

    /// Transient; retried by the job runner
    #[error("Backup tool was rate limited on attempt {attempt}")]
    RateLimited { attempt: u32 },

    #[error("Backup tool still rate limited after {attempts} attempts, see {}", .log_path.display())]
    RateLimitExhausted { attempts: u32, log_path: PathBuf },

    #[error("Failed to start backup tool '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Backup interrupted")]
    Interrupted,
}

impl BackupError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, BackupError::RateLimited { .. })
    }
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none".to_string(),
    }
}

/// Errors from packaging a finished backup into an artifact
#[derive(Error, Debug)]
pub enum PackagingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write archive {}: {message}", .path.display())]
    Archive { path: PathBuf, message: String },

    #[error("Refusing to remove {} outside {}", .path.display(), .root.display())]
    UnsafeCleanup { path: PathBuf, root: PathBuf },
}

impl PackagingError {
    pub fn archive(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Archive {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
