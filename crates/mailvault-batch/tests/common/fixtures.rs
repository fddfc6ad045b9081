//! Run fixtures

use mailvault_backup::{ArchiveIndex, ArchivePackager, BackupJobRunner};
use mailvault_batch::PipelineController;
use mailvault_core::types::RetryPolicy;
use mailvault_core::{EntityRecord, MailvaultConfig, RunContext, RunLayout, RunTimestamp};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use super::mocks::FakeBackupTool;

pub const GROUP: &str = "/FormerEmployees";
pub const RUN_TS: &str = "20250601T090000";
pub const EARLIER_RUN_TS: &str = "20250501T090000";

/// A run rooted in its own temporary base directory
pub struct TestRun {
    pub base: TempDir,
    pub layout: RunLayout,
    pub config: MailvaultConfig,
}

impl TestRun {
    pub fn new() -> Self {
        Self::at(TempDir::new().unwrap(), RUN_TS)
    }

    /// A later run over the same base directory
    pub fn next_run(self, run_timestamp: &str) -> Self {
        Self::at(self.base, run_timestamp)
    }

    fn at(base: TempDir, run_timestamp: &str) -> Self {
        let layout = RunLayout::new(base.path(), RunTimestamp::parse(run_timestamp).unwrap());
        layout.ensure_dirs().unwrap();

        let mut config = MailvaultConfig::default();
        config.monitor.poll_interval_ms = 5;
        config.monitor.appear_timeout_ms = 50;
        config.retry = RetryPolicy::fixed(3, 1);

        Self {
            base,
            layout,
            config,
        }
    }

    pub fn context(&self, dry_run: bool) -> RunContext {
        RunContext::new(GROUP, self.layout.run_timestamp().clone(), dry_run)
    }

    pub fn pipeline(&self, tool: Arc<FakeBackupTool>, dry_run: bool) -> PipelineController {
        let runner = BackupJobRunner::new(tool.clone(), self.layout.clone(), &self.config)
            .unwrap()
            .with_dry_run(dry_run);
        let packager = ArchivePackager::new(self.layout.clone(), "fake-gyb");
        PipelineController::new(runner, packager, self.index())
    }

    pub fn pipeline_with_delay(&self, tool: Arc<FakeBackupTool>, delay: Duration) -> PipelineController {
        self.pipeline(tool, false).with_inter_entity_delay(delay)
    }

    pub fn index(&self) -> ArchiveIndex {
        ArchiveIndex::new(self.layout.archive_dir())
    }

    /// Place a finished artifact from an earlier run
    pub fn seed_artifact(&self, identifier: &str, run_timestamp: &str) -> PathBuf {
        let path = self
            .layout
            .archive_dir()
            .join(format!("{identifier}_{run_timestamp}.tar.gz"));
        std::fs::write(&path, b"previous run").unwrap();
        path
    }

    pub fn archives(&self) -> Vec<String> {
        self.index()
            .entries()
            .into_iter()
            .filter_map(|e| e.path.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect()
    }
}

pub fn entities(identifiers: &[&str]) -> Vec<EntityRecord> {
    identifiers
        .iter()
        .map(|id| EntityRecord::new(*id, format!("User {id}")))
        .collect()
}
