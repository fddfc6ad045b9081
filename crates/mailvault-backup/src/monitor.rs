//! Progress monitoring of a running backup tool through its log file
//!
//! The monitor is a task spawned per attempt. It polls the attempt's log,
//! extracts a declared total and the latest "K of N" progress line, and
//! sends throttled [`ProgressEvent`]s over a bounded channel. It never
//! touches job state; the supervising runner cancels it and awaits its
//! [`MonitorSummary`] before reading the log itself.

use mailvault_core::types::MonitorConfig;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Capacity of the event channel between monitor and runner
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Units done out of units total
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSample {
    pub units_done: u64,
    pub units_total: u64,
}

impl ProgressSample {
    pub fn new(units_done: u64, units_total: u64) -> Self {
        Self {
            units_done,
            units_total,
        }
    }

    /// `K of N` with `K >= N`; an empty mailbox reports `0 of 0`
    pub fn is_complete(&self) -> bool {
        self.units_done >= self.units_total
    }

    pub fn percent(&self) -> f64 {
        if self.units_total == 0 {
            return 100.0;
        }
        self.units_done as f64 * 100.0 / self.units_total as f64
    }
}

/// Event sent from the monitor to its supervisor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// The tool declared how much work it found
    TotalDiscovered { total: u64 },
    Progress(ProgressSample),
}

/// Compiled output patterns
#[derive(Debug, Clone)]
pub struct ProgressPatterns {
    total: Regex,
    progress: Regex,
}

impl ProgressPatterns {
    pub fn new(total_pattern: &str, progress_pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            total: Regex::new(total_pattern)?,
            progress: Regex::new(progress_pattern)?,
        })
    }

    pub fn from_config(config: &MonitorConfig) -> Result<Self, regex::Error> {
        Self::new(&config.total_pattern, &config.progress_pattern)
    }

    /// Declared total from the first match of the total pattern
    pub fn scan_total(&self, text: &str) -> Option<u64> {
        self.total
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    /// Latest progress line in the text
    ///
    /// Carriage returns count as line breaks, so progress rewritten in place
    /// yields its final value.
    pub fn scan_latest(&self, text: &str) -> Option<ProgressSample> {
        let normalized = text.replace('\r', "\n");
        self.progress
            .captures_iter(&normalized)
            .filter_map(|caps| {
                let done = caps.get(1)?.as_str().parse().ok()?;
                let total = caps.get(2)?.as_str().parse().ok()?;
                Some(ProgressSample::new(done, total))
            })
            .last()
    }
}

/// Decides which samples become events
///
/// Samples never go backwards. A sample is emitted when it advanced at
/// least `report_delta` units past the last emitted one, and the sample
/// reaching the total is emitted exactly once.
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    report_delta: u64,
    last_emitted: u64,
    current: Option<ProgressSample>,
    completion_emitted: bool,
}

impl ProgressThrottle {
    pub fn new(report_delta: u64) -> Self {
        Self {
            report_delta: report_delta.max(1),
            last_emitted: 0,
            current: None,
            completion_emitted: false,
        }
    }

    /// Latest accepted sample
    pub fn current(&self) -> Option<ProgressSample> {
        self.current
    }

    /// Offer a sample; returns it when it should be emitted
    pub fn observe(&mut self, sample: ProgressSample) -> Option<ProgressSample> {
        if let Some(current) = self.current {
            if sample.units_done < current.units_done {
                return None;
            }
        }
        self.current = Some(sample);

        if sample.is_complete() {
            if self.completion_emitted {
                return None;
            }
            self.completion_emitted = true;
            self.last_emitted = sample.units_done;
            return Some(sample);
        }

        if sample.units_done.saturating_sub(self.last_emitted) >= self.report_delta {
            self.last_emitted = sample.units_done;
            return Some(sample);
        }

        None
    }
}

/// Timing of the monitor loop
#[derive(Debug, Clone, Copy)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    pub appear_timeout: Duration,
    pub report_delta: u64,
}

impl From<&MonitorConfig> for MonitorSettings {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
            appear_timeout: Duration::from_millis(config.appear_timeout_ms),
            report_delta: config.report_delta,
        }
    }
}

/// What the monitor saw before it stopped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorSummary {
    pub log_appeared: bool,
    pub total: Option<u64>,
    pub last_sample: Option<ProgressSample>,
    pub events_sent: usize,
}

/// Running monitor task
pub struct MonitorHandle {
    cancel: CancellationToken,
    join: JoinHandle<MonitorSummary>,
}

impl MonitorHandle {
    /// Cancel the monitor and wait for it to exit
    pub async fn stop(self) -> MonitorSummary {
        self.cancel.cancel();
        match self.join.await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!("Progress monitor task failed: {}", e);
                MonitorSummary::default()
            }
        }
    }
}

/// Log-polling progress monitor for one backup attempt
#[derive(Debug, Clone)]
pub struct ProgressMonitor {
    log_path: PathBuf,
    patterns: ProgressPatterns,
    settings: MonitorSettings,
}

impl ProgressMonitor {
    pub fn new(log_path: impl Into<PathBuf>, patterns: ProgressPatterns, settings: MonitorSettings) -> Self {
        Self {
            log_path: log_path.into(),
            patterns,
            settings,
        }
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Start polling on a new task
    ///
    /// `cancel` should be a child of the job's token so that both the
    /// supervisor and a run-wide interrupt stop the monitor.
    pub fn spawn(self, events: mpsc::Sender<ProgressEvent>, cancel: CancellationToken) -> MonitorHandle {
        let token = cancel.clone();
        let join = tokio::spawn(async move { self.run(events, token).await });
        MonitorHandle { cancel, join }
    }

    /// Poll until cancelled or until the log disappears
    pub async fn run(self, events: mpsc::Sender<ProgressEvent>, cancel: CancellationToken) -> MonitorSummary {
        let mut summary = MonitorSummary::default();

        if !self.wait_for_log(&cancel).await {
            tracing::debug!(log = %self.log_path.display(), "Log never appeared, monitor exiting");
            return summary;
        }
        summary.log_appeared = true;

        let mut throttle = ProgressThrottle::new(self.settings.report_delta);

        loop {
            let text = match tokio::fs::read(&self.log_path).await {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(log = %self.log_path.display(), "Log removed, monitor exiting");
                    break;
                }
                Err(e) => {
                    tracing::debug!("Failed to read log: {}", e);
                    String::new()
                }
            };

            for event in self.scan(&text, &mut summary, &mut throttle) {
                tokio::select! {
                    _ = cancel.cancelled() => return self.finish(summary, &events, &mut throttle).await,
                    sent = events.send(event) => {
                        if sent.is_err() {
                            return summary;
                        }
                        summary.events_sent += 1;
                    }
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return self.finish(summary, &events, &mut throttle).await,
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        }

        summary
    }

    async fn wait_for_log(&self, cancel: &CancellationToken) -> bool {
        let started = Instant::now();
        loop {
            if tokio::fs::try_exists(&self.log_path).await.unwrap_or(false) {
                return true;
            }
            if started.elapsed() >= self.settings.appear_timeout {
                return false;
            }
            tokio::select! {
                _ = cancel.cancelled() => return false,
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        }
    }

    fn scan(&self, text: &str, summary: &mut MonitorSummary, throttle: &mut ProgressThrottle) -> Vec<ProgressEvent> {
        let mut events = Vec::new();

        if summary.total.is_none() {
            if let Some(total) = self.patterns.scan_total(text) {
                summary.total = Some(total);
                events.push(ProgressEvent::TotalDiscovered { total });
            }
        }

        if let Some(sample) = self.patterns.scan_latest(text) {
            if let Some(emitted) = throttle.observe(sample) {
                events.push(ProgressEvent::Progress(emitted));
            }
            summary.last_sample = throttle.current();
        }

        events
    }

    /// Final read after cancellation so a completion line written just
    /// before the tool exited is still reported. Never blocks on the channel.
    async fn finish(
        &self,
        mut summary: MonitorSummary,
        events: &mpsc::Sender<ProgressEvent>,
        throttle: &mut ProgressThrottle,
    ) -> MonitorSummary {
        if let Ok(bytes) = tokio::fs::read(&self.log_path).await {
            let text = String::from_utf8_lossy(&bytes);
            for event in self.scan(&text, &mut summary, throttle) {
                if events.try_send(event).is_ok() {
                    summary.events_sent += 1;
                }
            }
        }
        summary
    }
}
