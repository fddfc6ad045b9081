//! Error types for mailvault-core

use thiserror::Error;

/// Result type alias using mailvault-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Maximum accepted length of a group path, in characters
pub const MAX_GROUP_PATH_LEN: usize = 200;

/// Core error types for mailvault
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration format or value
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Input rejected by the validator
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Rejections produced by the group path and account identifier validators.
///
/// These are fatal to the operation that produced them, never to a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Group path does not start at the directory root
    #[error("Group path must start with '/': {path}")]
    GroupPathRoot { path: String },

    /// Group path contains a shell metacharacter
    #[error("Group path contains forbidden character {character:?}: {path}")]
    GroupPathCharacter { path: String, character: char },

    /// Group path exceeds the maximum length
    #[error("Group path is {length} characters long (maximum {MAX_GROUP_PATH_LEN})")]
    GroupPathTooLong { length: usize },

    /// Account identifier is not email-shaped
    #[error("Invalid account identifier: {identifier}")]
    InvalidIdentifier { identifier: String },
}

impl ValidationError {
    /// Create an invalid identifier error
    pub fn invalid_identifier(identifier: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            identifier: identifier.into(),
        }
    }
}
