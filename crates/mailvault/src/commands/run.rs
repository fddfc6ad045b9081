//! The backup run: discover, confirm, back up, package, report

use anyhow::{Context, Result};
use mailvault_backup::{ArchiveIndex, ArchivePackager, BackupJobRunner, CommandBackupTool};
use mailvault_batch::{confirm, confirm_single, require_tools, PipelineController, RunReporter};
use mailvault_core::{
    format_bytes, validate_account_identifier, validate_group_path, ConfigLoader, EntityRecord,
    MailvaultConfig, RunContext, RunLayout, RunStatus, RunTimestamp,
};
use mailvault_directory::{CommandDirectoryClient, DirectoryClient};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::cli::{Cli, Target};
use crate::prompt::{self, TerminalPrompter};
use crate::{logging, output};

/// How a run ended, mapped to the process exit code by `main`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Aborted,
    Interrupted,
    /// Failed after the run log was opened; the cause is already logged
    Failed,
}

impl Outcome {
    pub fn exit_code(self) -> u8 {
        match self {
            Outcome::Completed | Outcome::Aborted => 0,
            Outcome::Failed => 1,
            Outcome::Interrupted => 130,
        }
    }
}

/// Validated backup target
enum Scope {
    Group(String),
    Single(String),
}

impl Scope {
    fn resolve(target: Target) -> Result<Self> {
        match target {
            Target::Single(identifier) => {
                validate_account_identifier(&identifier)?;
                Ok(Scope::Single(identifier))
            }
            Target::Group(path) => {
                validate_group_path(&path)?;
                Ok(Scope::Group(path))
            }
            Target::Prompt => {
                let path = prompt::ask_group_path().context("Failed to read group path")?;
                validate_group_path(&path)?;
                Ok(Scope::Group(path))
            }
        }
    }

    fn label(&self) -> &str {
        match self {
            Scope::Group(path) => path,
            Scope::Single(identifier) => identifier,
        }
    }
}

/// Entry point for a run.
///
/// Errors returned here happened before the run log existed.
pub async fn execute(cli: &Cli) -> Result<Outcome> {
    let loader = ConfigLoader::new()?;
    let config = loader.load(cli.config.as_deref())?;
    let scope = Scope::resolve(cli.target())?;

    let layout = RunLayout::new(loader.state_dir(&config), RunTimestamp::now());
    layout.ensure_dirs()?;
    logging::init(cli.verbose, cli.quiet, &layout.run_log_path())?;

    tracing::info!(
        run = %layout.run_timestamp(),
        target = scope.label(),
        dry_run = cli.dry_run,
        "Starting mailvault run"
    );

    let cancel = CancellationToken::new();
    spawn_interrupt_listener(cancel.clone());

    match run_batch(cli, &config, &scope, &layout, &cancel).await {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            tracing::error!("{:#}", e);
            Ok(Outcome::Failed)
        }
    }
}

async fn run_batch(
    cli: &Cli,
    config: &MailvaultConfig,
    scope: &Scope,
    layout: &RunLayout,
    cancel: &CancellationToken,
) -> Result<Outcome> {
    check_dependencies(config, scope, cli.dry_run)?;
    let mut ctx = RunContext::new(scope.label(), layout.run_timestamp().clone(), cli.dry_run);

    let entities = match scope {
        Scope::Group(path) => {
            let listed = tokio::select! {
                result = discover(config, path) => Some(result),
                _ = cancel.cancelled() => None,
            };
            match listed {
                Some(Ok(entities)) => entities,
                // the directory tool may die from the same Ctrl-C first
                Some(Err(e)) if !cancel.is_cancelled() => return Err(e),
                _ => {
                    tracing::warn!("Interrupted while listing accounts in {}", path);
                    return finish(&ctx, RunStatus::Interrupted, &ArchiveIndex::new(layout.archive_dir()), layout);
                }
            }
        }
        Scope::Single(identifier) => vec![EntityRecord::new(identifier.clone(), "")],
    };

    let prompter = TerminalPrompter;
    let decision = match scope {
        Scope::Group(path) => confirm(&entities, path, cli.dry_run, &prompter),
        Scope::Single(_) if cli.yes => mailvault_batch::GateDecision::Proceed,
        Scope::Single(identifier) => confirm_single(identifier, cli.dry_run, &prompter),
    };
    if cancel.is_cancelled() {
        tracing::warn!("Interrupted at confirmation, nothing was backed up");
        ctx.set_total(entities.len());
        return finish(&ctx, RunStatus::Interrupted, &ArchiveIndex::new(layout.archive_dir()), layout);
    }
    if !decision.is_proceed() {
        tracing::info!("Run aborted at confirmation, nothing was backed up");
        output::info("Aborted, nothing was backed up");
        return Ok(Outcome::Aborted);
    }

    let pipeline = build_pipeline(config, layout, cli.dry_run)?;
    let status = pipeline.run(&mut ctx, &entities, cancel).await;
    finish(&ctx, status, pipeline.index(), layout)
}

/// Clean up, write the report and print the summary
fn finish(ctx: &RunContext, status: RunStatus, index: &ArchiveIndex, layout: &RunLayout) -> Result<Outcome> {
    let removed = layout.cleanup_run_temp();
    tracing::debug!("Removed {} temporary entries", removed);

    let artifacts = index.created_in_run(layout.run_timestamp());
    let written = RunReporter::new().write_report(
        &layout.report_path(),
        ctx,
        status,
        &artifacts,
        &layout.run_log_path(),
    );

    print_summary(ctx, status, &artifacts);

    match (written, status) {
        (Ok(path), _) => output::success(&format!("Report written to {}", path.display())),
        (Err(e), RunStatus::Interrupted) => tracing::error!("Failed to write report: {:#}", e),
        (Err(e), RunStatus::Completed) => return Err(e),
    }

    match status {
        RunStatus::Completed => Ok(Outcome::Completed),
        RunStatus::Interrupted => {
            output::warning("Run interrupted, rerun to pick up the remaining accounts");
            Ok(Outcome::Interrupted)
        }
    }
}

/// Programs that must be on PATH for this run
fn required_tools<'a>(config: &'a MailvaultConfig, scope: &Scope, dry_run: bool) -> Vec<(&'static str, &'a str)> {
    let mut tools = Vec::new();
    if matches!(scope, Scope::Group(_)) {
        tools.push(("directory tool", config.directory.program.as_str()));
    }
    if !dry_run {
        tools.push(("backup tool", config.backup.program.as_str()));
    }
    tools
}

fn check_dependencies(config: &MailvaultConfig, scope: &Scope, dry_run: bool) -> Result<()> {
    let statuses = require_tools(&required_tools(config, scope, dry_run))?;
    for status in &statuses {
        if let Some(path) = &status.path {
            tracing::debug!("Using {} at {}", status.program, path.display());
        }
    }
    Ok(())
}

async fn discover(config: &MailvaultConfig, group_path: &str) -> Result<Vec<EntityRecord>> {
    let client = CommandDirectoryClient::from_config(&config.directory);
    let spinner = output::spinner(&format!("Listing accounts in {}...", group_path));
    let result = client.discover(group_path).await;
    spinner.finish_and_clear();

    let entities = result.with_context(|| format!("Failed to list accounts in {}", group_path))?;
    tracing::info!("Found {} account(s) in {}", entities.len(), group_path);
    Ok(entities)
}

fn build_pipeline(config: &MailvaultConfig, layout: &RunLayout, dry_run: bool) -> Result<PipelineController> {
    let tool = Arc::new(CommandBackupTool::from_config(&config.backup));
    let runner = BackupJobRunner::new(tool, layout.clone(), config)?.with_dry_run(dry_run);
    let packager = ArchivePackager::new(layout.clone(), config.backup.program.clone())
        .with_compression_level(config.archive.compression_level);
    let index = ArchiveIndex::new(layout.archive_dir());

    Ok(PipelineController::new(runner, packager, index)
        .with_inter_entity_delay(Duration::from_secs(config.pipeline.inter_entity_delay_secs)))
}

/// Cancel the run on the first Ctrl-C
fn spawn_interrupt_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("Interrupt received, stopping after cleanup");
                cancel.cancel();
            }
            Err(e) => tracing::error!("Failed to listen for interrupts: {}", e),
        }
    });
}

fn print_summary(ctx: &RunContext, status: RunStatus, artifacts: &[mailvault_backup::ArchiveEntry]) {
    output::header("Summary");
    output::kv("Status", &status.to_string());
    output::kv("Accounts", &ctx.counters.total.to_string());
    output::kv("Succeeded", &ctx.counters.succeeded.to_string());
    output::kv("Failed", &ctx.counters.failed.to_string());
    output::kv("Skipped", &ctx.counters.skipped.to_string());
    let total_bytes: u64 = artifacts.iter().map(|a| a.size_bytes).sum();
    output::kv(
        "Archives",
        &format!("{} ({})", artifacts.len(), format_bytes(total_bytes)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(Outcome::Completed.exit_code(), 0);
        assert_eq!(Outcome::Aborted.exit_code(), 0);
        assert_eq!(Outcome::Failed.exit_code(), 1);
        assert_eq!(Outcome::Interrupted.exit_code(), 130);
    }

    #[test]
    fn test_dry_run_skips_backup_tool_check() {
        let config = MailvaultConfig::default();
        let group = Scope::Group("/Sales".to_string());

        let tools = required_tools(&config, &group, true);
        assert_eq!(tools, vec![("directory tool", config.directory.program.as_str())]);

        let tools = required_tools(&config, &group, false);
        assert_eq!(tools.len(), 2);
    }

    #[test]
    fn test_single_account_skips_directory_check() {
        let config = MailvaultConfig::default();
        let single = Scope::Single("a@x.com".to_string());

        let tools = required_tools(&config, &single, false);
        assert_eq!(tools, vec![("backup tool", config.backup.program.as_str())]);
    }

    #[test]
    fn test_invalid_targets_rejected_before_any_work() {
        assert!(Scope::resolve(Target::Group("Sales".to_string())).is_err());
        assert!(Scope::resolve(Target::Single("not-an-address".to_string())).is_err());
        assert!(Scope::resolve(Target::Group("/Sales".to_string())).is_ok());
    }
}
