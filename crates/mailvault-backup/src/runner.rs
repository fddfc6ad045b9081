//! Backup job runner
//!
//! Runs the backup tool for one account with a progress monitor alongside,
//! classifies failures from the tool's log and retries rate-limited runs
//! through the retry engine.

use mailvault_core::retry::{ClosurePredicate, RetryError, RetryExecutorBuilder, TracingObserver};
use mailvault_core::types::{MailvaultConfig, RetryPolicy};
use mailvault_core::{EntityRecord, RunLayout};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::archive::count_files;
use crate::classify::{FailureKind, OutcomeClassifier};
use crate::error::BackupError;
use crate::monitor::{
    MonitorSettings, ProgressEvent, ProgressMonitor, ProgressPatterns, EVENT_CHANNEL_CAPACITY,
};
use crate::tool::BackupTool;

/// How a job ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded { file_count: usize, attempts: u32 },
    /// The account has nothing that can be backed up
    Ineligible,
}

/// Runs backups for single accounts
pub struct BackupJobRunner {
    tool: Arc<dyn BackupTool>,
    layout: RunLayout,
    patterns: ProgressPatterns,
    monitor: MonitorSettings,
    classifier: OutcomeClassifier,
    retry: RetryPolicy,
    dry_run: bool,
}

impl BackupJobRunner {
    /// Create a runner from configuration
    ///
    /// Fails when the configured progress patterns do not compile.
    pub fn new(tool: Arc<dyn BackupTool>, layout: RunLayout, config: &MailvaultConfig) -> anyhow::Result<Self> {
        Ok(Self {
            tool,
            layout,
            patterns: ProgressPatterns::from_config(&config.monitor)?,
            monitor: MonitorSettings::from(&config.monitor),
            classifier: OutcomeClassifier::from_config(&config.backup),
            retry: config.retry.clone(),
            dry_run: false,
        })
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn tool_name(&self) -> &str {
        self.tool.name()
    }

    pub fn layout(&self) -> &RunLayout {
        &self.layout
    }

    /// Working directory the tool writes into for `entity`
    pub fn work_dir(&self, entity: &EntityRecord) -> PathBuf {
        self.layout.entity_work_dir(&entity.identifier)
    }

    /// Back up one account
    ///
    /// Rate-limited attempts are retried per the retry policy; cancelling
    /// `cancel` kills a running tool or ends a backoff wait and yields
    /// [`BackupError::Interrupted`].
    pub async fn run(&self, entity: &EntityRecord, cancel: &CancellationToken) -> Result<JobOutcome, BackupError> {
        if self.dry_run {
            tracing::info!(account = %entity.identifier, "[dry-run] Would back up account");
            return Ok(JobOutcome::Succeeded {
                file_count: 0,
                attempts: 0,
            });
        }

        let work_dir = self.work_dir(entity);
        let log_path = self.layout.entity_log_path(&entity.identifier);
        tokio::fs::create_dir_all(&work_dir).await?;
        if let Some(parent) = log_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let executor = RetryExecutorBuilder::new()
            .with_policy(self.retry.clone())
            .with_predicate(ClosurePredicate::new(|e: &BackupError| e.is_rate_limited()))
            .with_observer(TracingObserver::new(format!("backup {}", entity.identifier)))
            .with_cancellation(cancel.clone())
            .build();

        let result = executor
            .execute(|attempt| self.attempt(entity, &work_dir, &log_path, cancel, attempt))
            .await;

        let err = match result {
            Ok(outcome) => return Ok(outcome),
            Err(err) => err,
        };
        tracing::debug!(account = %entity.identifier, attempts = err.attempts(), "Backup job stopped: {}", err);

        match err {
            RetryError::Exhausted { attempts, .. } => Err(BackupError::RateLimitExhausted { attempts, log_path }),
            RetryError::Cancelled { .. } => Err(BackupError::Interrupted),
            RetryError::NonRetryable { source, .. } => Err(source),
        }
    }

    async fn attempt(
        &self,
        entity: &EntityRecord,
        work_dir: &Path,
        log_path: &Path,
        cancel: &CancellationToken,
        attempt: u32,
    ) -> Result<JobOutcome, BackupError> {
        if cancel.is_cancelled() {
            return Err(BackupError::Interrupted);
        }

        // each attempt starts from an empty log
        std::fs::File::create(log_path)?;
        tracing::info!(account = %entity.identifier, attempt, "Starting backup");

        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let monitor = ProgressMonitor::new(log_path, self.patterns.clone(), self.monitor)
            .spawn(tx, cancel.child_token());

        let tool_run = self.tool.run(entity, work_dir, log_path, cancel);
        tokio::pin!(tool_run);

        let exit = loop {
            tokio::select! {
                result = &mut tool_run => break result,
                Some(event) = rx.recv() => log_progress(&entity.identifier, &event),
            }
        };

        let summary = monitor.stop().await;
        while let Ok(event) = rx.try_recv() {
            log_progress(&entity.identifier, &event);
        }
        tracing::debug!(
            account = %entity.identifier,
            log_appeared = summary.log_appeared,
            events = summary.events_sent,
            "Progress monitor stopped"
        );

        let exit = exit?;
        // a terminal Ctrl-C also reaches the child, which may exit before the token is seen
        if !exit.success && cancel.is_cancelled() {
            tracing::info!(account = %entity.identifier, code = ?exit.code, "Backup tool stopped by interrupt");
            return Err(BackupError::Interrupted);
        }
        if exit.success {
            let file_count = count_files(work_dir);
            if file_count == 0 {
                tracing::warn!(account = %entity.identifier, "Backup finished but produced no files");
            }
            return Ok(JobOutcome::Succeeded {
                file_count,
                attempts: attempt,
            });
        }

        let text = match tokio::fs::read(log_path).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                tracing::warn!("Failed to read backup log {}: {}", log_path.display(), e);
                String::new()
            }
        };

        match self.classifier.classify(&text) {
            FailureKind::Ineligible => {
                tracing::info!(account = %entity.identifier, "Account is not eligible for backup");
                Ok(JobOutcome::Ineligible)
            }
            FailureKind::RateLimited => Err(BackupError::RateLimited { attempt }),
            FailureKind::Other => Err(BackupError::ToolFailed {
                log_path: log_path.to_path_buf(),
                exit_code: exit.code,
            }),
        }
    }
}

fn log_progress(account: &str, event: &ProgressEvent) {
    match event {
        ProgressEvent::TotalDiscovered { total } => {
            tracing::info!(account, total, "Backup found work");
        }
        ProgressEvent::Progress(sample) => {
            tracing::info!(
                account,
                done = sample.units_done,
                total = sample.units_total,
                "Backup progress {:.0}%",
                sample.percent()
            );
        }
    }
}
