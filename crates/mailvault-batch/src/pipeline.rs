//! Pipeline controller
//!
//! Walks the discovered accounts in order, one at a time: skip accounts
//! that already have an artifact, back up the rest, package successful
//! backups, and record every outcome in the [`RunContext`].

use mailvault_backup::{ArchiveIndex, ArchivePackager, BackupError, BackupJobRunner, JobOutcome};
use mailvault_core::{EntityRecord, JobState, RunContext, RunStatus};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Sequential batch driver
pub struct PipelineController {
    runner: BackupJobRunner,
    packager: ArchivePackager,
    index: ArchiveIndex,
    inter_entity_delay: Duration,
}

impl PipelineController {
    pub fn new(runner: BackupJobRunner, packager: ArchivePackager, index: ArchiveIndex) -> Self {
        Self {
            runner,
            packager,
            index,
            inter_entity_delay: Duration::ZERO,
        }
    }

    /// Pause between accounts; never applied after the last one or in dry runs
    pub fn with_inter_entity_delay(mut self, delay: Duration) -> Self {
        self.inter_entity_delay = delay;
        self
    }

    pub fn index(&self) -> &ArchiveIndex {
        &self.index
    }

    /// Process `entities`, recording outcomes in `ctx`
    ///
    /// Per-account failures are counted and the batch continues. When
    /// `cancel` fires the account in flight is recorded as interrupted
    /// without being counted and the run ends as [`RunStatus::Interrupted`].
    pub async fn run(&self, ctx: &mut RunContext, entities: &[EntityRecord], cancel: &CancellationToken) -> RunStatus {
        ctx.set_total(entities.len());
        let count = entities.len();

        for (i, entity) in entities.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::warn!("Interrupted before {}", entity.identifier);
                return RunStatus::Interrupted;
            }

            tracing::info!("[{}/{}] {}", i + 1, count, entity);
            let (state, detail) = self.process(entity, ctx.dry_run, cancel).await;
            ctx.record(&entity.identifier, state, detail);

            if state == JobState::Interrupted {
                return RunStatus::Interrupted;
            }

            let is_last = i + 1 == count;
            if !is_last && !ctx.dry_run && !self.inter_entity_delay.is_zero() {
                tracing::debug!(delay_secs = self.inter_entity_delay.as_secs(), "Pausing before next account");
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::warn!("Interrupted during pause between accounts");
                        return RunStatus::Interrupted;
                    }
                    _ = tokio::time::sleep(self.inter_entity_delay) => {}
                }
            }
        }

        tracing::info!(
            total = ctx.counters.total,
            succeeded = ctx.counters.succeeded,
            failed = ctx.counters.failed,
            skipped = ctx.counters.skipped,
            "Batch complete"
        );
        RunStatus::Completed
    }

    async fn process(&self, entity: &EntityRecord, dry_run: bool, cancel: &CancellationToken) -> (JobState, Option<String>) {
        let id = &entity.identifier;

        if let Some(existing) = self.index.find_existing(id) {
            tracing::info!(account = %id, "Already archived at {}, skipping", existing.display());
            return (JobState::SkippedExisting, Some(existing.display().to_string()));
        }

        match self.runner.run(entity, cancel).await {
            Ok(JobOutcome::Ineligible) => (JobState::SkippedIneligible, None),
            Ok(JobOutcome::Succeeded { file_count, attempts }) => {
                if dry_run {
                    tracing::info!(account = %id, "[dry-run] Would package backup into an archive");
                    return (JobState::Succeeded, None);
                }

                tracing::debug!(account = %id, file_count, attempts, "Packaging backup");
                match self.packager.package(entity, &self.runner.work_dir(entity)) {
                    Ok(record) => (JobState::Succeeded, Some(record.path.display().to_string())),
                    Err(e) => {
                        tracing::error!(account = %id, "Packaging failed: {}", e);
                        (JobState::Failed, Some(e.to_string()))
                    }
                }
            }
            Err(BackupError::Interrupted) => {
                tracing::warn!(account = %id, "Backup interrupted");
                (JobState::Interrupted, None)
            }
            Err(e) => {
                tracing::error!(account = %id, "Backup failed: {}", e);
                (JobState::Failed, Some(e.to_string()))
            }
        }
    }
}
