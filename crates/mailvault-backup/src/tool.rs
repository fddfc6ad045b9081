//! Backup tool seam
//!
//! The job runner talks to the external backup program through the
//! [`BackupTool`] trait so tests can substitute a scripted tool.

use async_trait::async_trait;
use mailvault_core::types::BackupToolConfig;
use mailvault_core::EntityRecord;
use std::fs::OpenOptions;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::error::BackupError;

/// Placeholder substituted by the account identifier
pub const ACCOUNT_PLACEHOLDER: &str = "{account}";

/// Placeholder substituted by the working directory
pub const OUTPUT_DIR_PLACEHOLDER: &str = "{output_dir}";

/// How a tool invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolExit {
    pub success: bool,
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
}

impl ToolExit {
    pub fn success() -> Self {
        Self {
            success: true,
            code: Some(0),
        }
    }

    pub fn failure(code: i32) -> Self {
        Self {
            success: false,
            code: Some(code),
        }
    }
}

/// An external program that backs up one account into a directory
#[async_trait]
pub trait BackupTool: Send + Sync {
    fn name(&self) -> &str;

    /// Back up `entity` into `output_dir`, appending all output to `log_path`
    ///
    /// Returns [`BackupError::Interrupted`] when `cancel` fires before the
    /// tool exits; the tool must not outlive the call.
    async fn run(
        &self,
        entity: &EntityRecord,
        output_dir: &Path,
        log_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<ToolExit, BackupError>;
}

/// Backup through an external program
#[derive(Debug, Clone)]
pub struct CommandBackupTool {
    program: String,
    args: Vec<String>,
}

impl CommandBackupTool {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &BackupToolConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }

    /// Arguments with placeholders substituted
    pub fn render_args(&self, identifier: &str, output_dir: &Path) -> Vec<String> {
        let output_dir = output_dir.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace(ACCOUNT_PLACEHOLDER, identifier)
                    .replace(OUTPUT_DIR_PLACEHOLDER, &output_dir)
            })
            .collect()
    }
}

#[async_trait]
impl BackupTool for CommandBackupTool {
    fn name(&self) -> &str {
        &self.program
    }

    async fn run(
        &self,
        entity: &EntityRecord,
        output_dir: &Path,
        log_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<ToolExit, BackupError> {
        let stdout = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;
        let stderr = stdout.try_clone()?;

        let args = self.render_args(&entity.identifier, output_dir);
        tracing::debug!(program = %self.program, ?args, "Starting backup tool");

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BackupError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        tokio::select! {
            status = child.wait() => {
                let status = status?;
                Ok(ToolExit {
                    success: status.success(),
                    code: status.code(),
                })
            }
            _ = cancel.cancelled() => {
                tracing::warn!(account = %entity.identifier, "Stopping backup tool");
                if let Err(e) = child.kill().await {
                    tracing::warn!("Failed to kill backup tool: {}", e);
                }
                Err(BackupError::Interrupted)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_render_args() {
        let tool = CommandBackupTool::from_config(&BackupToolConfig::default());
        let args = tool.render_args("a@x.com", Path::new("/tmp/run/a@x.com"));

        assert_eq!(
            args,
            vec![
                "--email",
                "a@x.com",
                "--action",
                "backup",
                "--local-folder",
                "/tmp/run/a@x.com"
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_output_goes_to_log() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("a.log");
        let tool = CommandBackupTool::new(
            "sh",
            vec![
                "-c".to_string(),
                "echo \"backing up $1\"; echo oops >&2; exit 4".to_string(),
                "tool".to_string(),
                ACCOUNT_PLACEHOLDER.to_string(),
            ],
        );

        let exit = tool
            .run(
                &EntityRecord::new("a@x.com", "A"),
                dir.path(),
                &log,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(exit, ToolExit::failure(4));
        let text = std::fs::read_to_string(&log).unwrap();
        assert!(text.contains("backing up a@x.com"));
        assert!(text.contains("oops"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancel_kills_tool() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("a.log");
        let tool = CommandBackupTool::new("sleep", vec!["30".to_string()]);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let result = tool
            .run(&EntityRecord::new("a@x.com", ""), dir.path(), &log, &cancel)
            .await;

        assert!(matches!(result, Err(BackupError::Interrupted)));
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let dir = TempDir::new().unwrap();
        let tool = CommandBackupTool::new("mailvault-no-such-backup-tool", vec![]);

        let result = tool
            .run(
                &EntityRecord::new("a@x.com", ""),
                dir.path(),
                &dir.path().join("a.log"),
                &CancellationToken::new(),
            )
            .await;

        assert!(matches!(result, Err(BackupError::Spawn { .. })));
    }
}
