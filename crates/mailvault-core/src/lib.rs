//! # mailvault-core
//!
//! Core library for mailvault providing:
//! - Configuration loading (embedded defaults, user file, environment)
//! - The batch data model (entities, run context, job states, run layout)
//! - Validation of group paths and account identifiers
//! - Retry execution engine with policy-based configuration

pub mod config;
pub mod error;
pub mod retry;
pub mod types;
pub mod utils;
pub mod validate;

pub use config::ConfigLoader;
pub use error::{Error, Result, ValidationError};
pub use types::{
    EntityRecord, EntityResult, JobState, MailvaultConfig, RunContext, RunCounters, RunLayout,
    RunStatus, RunTimestamp,
};
pub use utils::{format_bytes, get_home_dir};
pub use validate::{validate_account_identifier, validate_group_path};
