//! Configuration types
//!
//! These types define the operational parameters of a run: which external
//! programs are invoked and how, how their output is interpreted, retry
//! policy, pacing and where run state is persisted.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete mailvault configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MailvaultConfig {
    /// Directory query tool
    #[serde(default)]
    pub directory: DirectoryConfig,

    /// Backup tool
    #[serde(default)]
    pub backup: BackupToolConfig,

    /// Progress monitor tuning
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Retry policy for rate-limited backups
    #[serde(default = "default_backup_retry")]
    pub retry: RetryPolicy,

    /// Pipeline pacing
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Artifact settings
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Persisted state locations
    #[serde(default)]
    pub paths: PathsConfig,
}

impl Default for MailvaultConfig {
    fn default() -> Self {
        Self {
            directory: DirectoryConfig::default(),
            backup: BackupToolConfig::default(),
            monitor: MonitorConfig::default(),
            retry: default_backup_retry(),
            pipeline: PipelineConfig::default(),
            archive: ArchiveConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

/// Directory query tool invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DirectoryConfig {
    /// Program to run
    #[serde(default = "default_directory_program")]
    pub program: String,

    /// Arguments; `{group}` is replaced by the validated group path
    #[serde(default = "default_directory_args")]
    pub args: Vec<String>,

    /// Header name of the identifier column
    #[serde(default = "default_identifier_column")]
    pub identifier_column: String,

    /// Header name of the display name column
    #[serde(default = "default_display_name_column")]
    pub display_name_column: String,

    /// Field delimiter of the tabular output
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            program: default_directory_program(),
            args: default_directory_args(),
            identifier_column: default_identifier_column(),
            display_name_column: default_display_name_column(),
            delimiter: default_delimiter(),
        }
    }
}

fn default_directory_program() -> String {
    "gam".to_string()
}
fn default_directory_args() -> Vec<String> {
    [
        "print",
        "users",
        "query",
        "orgUnitPath='{group}'",
        "fields",
        "primaryemail,name.fullname",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_identifier_column() -> String {
    "primaryEmail".to_string()
}
fn default_display_name_column() -> String {
    "name.fullName".to_string()
}
fn default_delimiter() -> char {
    ','
}

/// Backup tool invocation and output signatures
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BackupToolConfig {
    /// Program to run
    #[serde(default = "default_backup_program")]
    pub program: String,

    /// Arguments; `{account}` and `{output_dir}` are substituted
    #[serde(default = "default_backup_args")]
    pub args: Vec<String>,

    /// Case-insensitive substrings meaning the account has nothing to back up
    #[serde(default = "default_ineligible_patterns")]
    pub ineligible_patterns: Vec<String>,

    /// Case-insensitive substrings meaning the tool hit a rate limit or quota
    #[serde(default = "default_rate_limit_patterns")]
    pub rate_limit_patterns: Vec<String>,
}

impl Default for BackupToolConfig {
    fn default() -> Self {
        Self {
            program: default_backup_program(),
            args: default_backup_args(),
            ineligible_patterns: default_ineligible_patterns(),
            rate_limit_patterns: default_rate_limit_patterns(),
        }
    }
}

fn default_backup_program() -> String {
    "gyb".to_string()
}
fn default_backup_args() -> Vec<String> {
    [
        "--email",
        "{account}",
        "--action",
        "backup",
        "--local-folder",
        "{output_dir}",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_ineligible_patterns() -> Vec<String> {
    [
        "mail service not enabled",
        "service not enabled",
        "does not have a mailbox",
        "failedprecondition",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_rate_limit_patterns() -> Vec<String> {
    [
        "ratelimitexceeded",
        "userratelimitexceeded",
        "quotaexceeded",
        "too many requests",
        "error 429",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Progress monitor tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MonitorConfig {
    /// Poll interval in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// How long to wait for the log to appear, in milliseconds
    #[serde(default = "default_appear_timeout")]
    pub appear_timeout_ms: u64,

    /// Minimum unit delta between progress events
    #[serde(default = "default_report_delta")]
    pub report_delta: u64,

    /// Regex whose first capture group is the declared total
    #[serde(default = "default_total_pattern")]
    pub total_pattern: String,

    /// Regex whose two capture groups are "done" and "total"
    #[serde(default = "default_progress_pattern")]
    pub progress_pattern: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            appear_timeout_ms: default_appear_timeout(),
            report_delta: default_report_delta(),
            total_pattern: default_total_pattern(),
            progress_pattern: default_progress_pattern(),
        }
    }
}

fn default_poll_interval() -> u64 {
    2000
}
fn default_appear_timeout() -> u64 {
    30_000
}
fn default_report_delta() -> u64 {
    500
}
fn default_total_pattern() -> String {
    r"(?i)(?:backup|download|process)\w*\s+(\d+)\s+(?:messages|items|files)".to_string()
}
fn default_progress_pattern() -> String {
    r"(\d+)\s+of\s+(\d+)".to_string()
}

/// Retry policy for an operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Retry strategy
    #[serde(default)]
    pub strategy: RetryStrategy,

    /// Backoff multiplier for exponential strategies
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            strategy: RetryStrategy::default(),
            backoff_multiplier: default_backoff_multiplier(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

impl RetryPolicy {
    /// Fixed backoff between a bounded number of attempts
    pub fn fixed(max_attempts: u32, delay_ms: u64) -> Self {
        Self {
            max_attempts,
            strategy: RetryStrategy::FixedDelay,
            backoff_multiplier: 1.0,
            initial_delay_ms: delay_ms,
            max_delay_ms: delay_ms,
        }
    }
}

fn default_backup_retry() -> RetryPolicy {
    RetryPolicy::fixed(3, 60_000)
}
fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_multiplier() -> f64 {
    2.0
}
fn default_initial_delay() -> u64 {
    1000
}
fn default_max_delay() -> u64 {
    300_000
}

/// Retry strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RetryStrategy {
    /// Retry immediately
    None,

    /// Fixed delay between retries (default)
    #[default]
    FixedDelay,

    /// Exponential backoff
    ExponentialBackoff,

    /// Linear backoff
    LinearBackoff,
}

/// Pipeline pacing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PipelineConfig {
    /// Pause between entities in seconds (never after the last one)
    #[serde(default)]
    pub inter_entity_delay_secs: u64,
}

/// Artifact settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ArchiveConfig {
    /// gzip compression level (1-9)
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            compression_level: default_compression_level(),
        }
    }
}

fn default_compression_level() -> u32 {
    6
}

/// Persisted state locations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PathsConfig {
    /// Root of archives/, logs/, reports/ and tmp/ (default: ~/.mailvault)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,
}
