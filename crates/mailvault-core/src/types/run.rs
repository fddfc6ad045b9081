//! Run-level state: timestamp token, counters and per-entity results

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::job::JobState;

/// Format of the run timestamp token (no underscore, so it can be split
/// off the end of an artifact name)
const RUN_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Opaque token identifying one run; sorts chronologically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunTimestamp(String);

impl RunTimestamp {
    /// Token for the current UTC time, so clock changes never repeat a token
    pub fn now() -> Self {
        Self(Utc::now().format(RUN_TIMESTAMP_FORMAT).to_string())
    }

    /// Parse a token, returning `None` when it is not a well formed timestamp
    pub fn parse(value: &str) -> Option<Self> {
        NaiveDateTime::parse_from_str(value, RUN_TIMESTAMP_FORMAT)
            .ok()
            .map(|_| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Final status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Interrupted,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Completed => f.write_str("completed"),
            RunStatus::Interrupted => f.write_str("interrupted"),
        }
    }
}

/// Run statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RunCounters {
    /// Number of entities that reached a counted terminal state
    pub fn processed(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }

    /// Whether every entity has been accounted for
    pub fn is_balanced(&self) -> bool {
        self.processed() == self.total
    }
}

/// Terminal outcome recorded for one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityResult {
    pub identifier: String,
    pub state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// State owned by one run of the batch
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Group path the entities were discovered from (or the single identifier)
    pub group_identifier: String,

    pub run_timestamp: RunTimestamp,

    /// Wall clock start of the run
    pub started_at: DateTime<Utc>,

    pub dry_run: bool,

    pub counters: RunCounters,

    /// Outcomes in processing order
    pub results: Vec<EntityResult>,
}

impl RunContext {
    pub fn new(group_identifier: impl Into<String>, run_timestamp: RunTimestamp, dry_run: bool) -> Self {
        Self {
            group_identifier: group_identifier.into(),
            run_timestamp,
            started_at: Utc::now(),
            dry_run,
            counters: RunCounters::default(),
            results: Vec::new(),
        }
    }

    /// Set the number of entities this run will process
    pub fn set_total(&mut self, total: usize) {
        self.counters.total = total;
    }

    /// Record the terminal state of an entity and bump the matching counter.
    ///
    /// Non-terminal states are ignored. `Interrupted` is kept in the result
    /// list but counted nowhere.
    pub fn record(&mut self, identifier: &str, state: JobState, detail: Option<String>) {
        if !state.is_terminal() {
            tracing::debug!(account = %identifier, state = %state, "ignoring non-terminal state");
            return;
        }

        match state {
            JobState::Succeeded => self.counters.succeeded += 1,
            JobState::Failed => self.counters.failed += 1,
            s if s.is_skip() => self.counters.skipped += 1,
            _ => {}
        }

        self.results.push(EntityResult {
            identifier: identifier.to_string(),
            state,
            detail,
        });
    }

    /// Identifiers whose recorded state matches `state`
    pub fn identifiers_in(&self, state: JobState) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| r.state == state)
            .map(|r| r.identifier.as_str())
            .collect()
    }
}
