//! Plain-text run report

use anyhow::{Context, Result};
use chrono::Utc;
use mailvault_backup::ArchiveEntry;
use mailvault_core::{format_bytes, JobState, RunContext, RunStatus};
use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct ArtifactRow {
    #[tabled(rename = "Archive")]
    name: String,
    #[tabled(rename = "Size")]
    size: String,
}

/// Renders and saves run reports
#[derive(Debug, Clone, Default)]
pub struct RunReporter;

impl RunReporter {
    pub fn new() -> Self {
        Self
    }

    /// Render the report text
    ///
    /// `artifacts` are the archives created by this run.
    pub fn render(&self, ctx: &RunContext, status: RunStatus, artifacts: &[ArchiveEntry], run_log: &Path) -> String {
        let mut out = String::new();
        let counters = &ctx.counters;

        let _ = writeln!(out, "mailvault run report");
        let _ = writeln!(out, "====================");
        let _ = writeln!(out, "Group:          {}", ctx.group_identifier);
        let _ = writeln!(out, "Run:            {}", ctx.run_timestamp);
        let _ = writeln!(out, "Status:         {}", status);
        let _ = writeln!(out, "Mode:           {}", if ctx.dry_run { "dry run" } else { "live" });
        let _ = writeln!(out, "Started:        {}", ctx.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
        let _ = writeln!(out, "Duration:       {}", format_duration(Utc::now() - ctx.started_at));
        let _ = writeln!(out);

        let _ = writeln!(out, "Accounts");
        let _ = writeln!(out, "  Total:        {}", counters.total);
        let _ = writeln!(out, "  Succeeded:    {}", counters.succeeded);
        let _ = writeln!(out, "  Failed:       {}", counters.failed);
        let _ = writeln!(out, "  Skipped:      {}", counters.skipped);
        if status == RunStatus::Interrupted {
            let _ = writeln!(
                out,
                "  Not reached:  {}",
                counters.total.saturating_sub(counters.processed())
            );
        }

        write_list(&mut out, "Failed accounts", &ctx.identifiers_in(JobState::Failed));
        write_list(&mut out, "Ineligible accounts", &ctx.identifiers_in(JobState::SkippedIneligible));
        write_list(&mut out, "Interrupted accounts", &ctx.identifiers_in(JobState::Interrupted));

        let _ = writeln!(out);
        if artifacts.is_empty() {
            let _ = writeln!(out, "No archives created in this run.");
        } else {
            let rows: Vec<ArtifactRow> = artifacts
                .iter()
                .map(|a| ArtifactRow {
                    name: a
                        .path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    size: format_bytes(a.size_bytes),
                })
                .collect();
            let mut table = Table::new(rows);
            table.with(Style::sharp());
            let _ = writeln!(out, "Archives created in this run");
            let _ = writeln!(out, "{}", table);

            let total: u64 = artifacts.iter().map(|a| a.size_bytes).sum();
            let _ = writeln!(out, "Total archive size: {}", format_bytes(total));
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "Run log: {}", run_log.display());
        out
    }

    /// Save the report to `path` readable by the owner only
    pub fn write_report(
        &self,
        path: &Path,
        ctx: &RunContext,
        status: RunStatus,
        artifacts: &[ArchiveEntry],
        run_log: &Path,
    ) -> Result<PathBuf> {
        let text = self.render(ctx, status, artifacts, run_log);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options
            .open(path)
            .with_context(|| format!("Failed to create report: {}", path.display()))?;
        file.write_all(text.as_bytes())
            .with_context(|| format!("Failed to write report: {}", path.display()))?;

        Ok(path.to_path_buf())
    }
}

fn write_list(out: &mut String, title: &str, identifiers: &[&str]) {
    if identifiers.is_empty() {
        return;
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{} ({})", title, identifiers.len());
    for id in identifiers {
        let _ = writeln!(out, "  - {}", id);
    }
}

fn format_duration(duration: chrono::Duration) -> String {
    let secs = duration.num_seconds().max(0);
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}h {}m {}s", h, m, s)
    } else if m > 0 {
        format!("{}m {}s", m, s)
    } else {
        format!("{}s", s)
    }
}
