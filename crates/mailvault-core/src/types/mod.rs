//! Type definitions for the mailvault batch model and configuration

mod config_types;
mod entity;
mod job;
mod layout;
mod run;

pub use config_types::*;
pub use entity::EntityRecord;
pub use job::JobState;
pub use layout::{RunLayout, ARCHIVE_EXTENSION, PARTIAL_SUFFIX};
pub use run::{EntityResult, RunContext, RunCounters, RunStatus, RunTimestamp};
