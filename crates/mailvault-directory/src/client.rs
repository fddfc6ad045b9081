//! Directory client trait and the command-backed implementation

use async_trait::async_trait;
use mailvault_core::types::DirectoryConfig;
use mailvault_core::EntityRecord;
use tokio::process::Command;

use crate::error::{DiscoveryError, Result};
use crate::parse::{parse_listing, ListingFormat};

/// Placeholder substituted by the group path in directory arguments
pub const GROUP_PLACEHOLDER: &str = "{group}";

/// Read-only source of the accounts belonging to a group
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Name of the backing tool, used in log lines
    fn name(&self) -> &str;

    /// List the accounts in `group_path`
    ///
    /// The caller validates `group_path` before calling. An empty result is
    /// an error.
    async fn discover(&self, group_path: &str) -> Result<Vec<EntityRecord>>;
}

/// Discovery through an external directory query program
#[derive(Debug, Clone)]
pub struct CommandDirectoryClient {
    program: String,
    args: Vec<String>,
    format: ListingFormat,
}

impl CommandDirectoryClient {
    pub fn new(program: impl Into<String>, args: Vec<String>, format: ListingFormat) -> Self {
        Self {
            program: program.into(),
            args,
            format,
        }
    }

    pub fn from_config(config: &DirectoryConfig) -> Self {
        Self::new(
            config.program.clone(),
            config.args.clone(),
            ListingFormat {
                identifier_column: config.identifier_column.clone(),
                display_name_column: config.display_name_column.clone(),
                delimiter: config.delimiter,
            },
        )
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments with the group placeholder substituted
    pub fn render_args(&self, group_path: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(GROUP_PLACEHOLDER, group_path))
            .collect()
    }
}

#[async_trait]
impl DirectoryClient for CommandDirectoryClient {
    fn name(&self) -> &str {
        &self.program
    }

    async fn discover(&self, group_path: &str) -> Result<Vec<EntityRecord>> {
        let args = self.render_args(group_path);
        tracing::debug!(program = %self.program, ?args, "Querying directory");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(std::process::Stdio::null())
            .output()
            .await
            .map_err(|source| DiscoveryError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(DiscoveryError::command_failed(
                output.status,
                String::from_utf8_lossy(&output.stderr),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let parsed = parse_listing(&stdout, &self.format);

        if !parsed.rejected.is_empty() {
            tracing::warn!(
                count = parsed.rejected.len(),
                "Skipped directory rows with malformed identifiers"
            );
        }

        if parsed.records.is_empty() {
            return Err(DiscoveryError::empty(group_path));
        }

        tracing::info!(
            group = group_path,
            count = parsed.records.len(),
            "Discovered accounts"
        );
        Ok(parsed.records)
    }
}
