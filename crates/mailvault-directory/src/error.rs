//! Error types for account discovery

use thiserror::Error;

/// Errors raised while querying the directory
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Failed to start directory tool '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory tool exited with {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },

    #[error("No accounts found in group {group}")]
    Empty { group: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DiscoveryError {
    pub fn command_failed(status: impl ToString, stderr: impl AsRef<str>) -> Self {
        Self::CommandFailed {
            status: status.to_string(),
            stderr: stderr.as_ref().trim().to_string(),
        }
    }

    pub fn empty(group: impl Into<String>) -> Self {
        Self::Empty {
            group: group.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;
