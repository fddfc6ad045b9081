use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one entity within a run.
///
/// `Pending -> SkippedExisting | SkippedIneligible | Running`,
/// `Running -> RetryWait -> Running`, and `Running -> Succeeded | Failed`.
/// `Interrupted` marks the entity that was in flight when the run was
/// cancelled; it is never counted and is picked up again by the next run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    SkippedExisting,
    SkippedIneligible,
    Running,
    RetryWait,
    Succeeded,
    Failed,
    Interrupted,
}

impl JobState {
    /// Whether the state ends the entity's processing for this run
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::SkippedExisting
                | JobState::SkippedIneligible
                | JobState::Succeeded
                | JobState::Failed
                | JobState::Interrupted
        )
    }

    /// Whether the state counts towards the skipped counter
    pub fn is_skip(self) -> bool {
        matches!(self, JobState::SkippedExisting | JobState::SkippedIneligible)
    }

    /// Whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Pending, SkippedExisting)
                | (Pending, SkippedIneligible)
                | (Pending, Running)
                | (Running, RetryWait)
                | (RetryWait, Running)
                | (Running, SkippedIneligible)
                | (Running, Succeeded)
                | (Running, Failed)
                | (Running, Interrupted)
                | (RetryWait, Interrupted)
                | (Pending, Interrupted)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::SkippedExisting => "skipped (already archived)",
            JobState::SkippedIneligible => "skipped (ineligible)",
            JobState::Running => "running",
            JobState::RetryWait => "waiting to retry",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
            JobState::Interrupted => "interrupted",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!JobState::Pending.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(!JobState::RetryWait.is_terminal());
        assert!(JobState::Succeeded.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::SkippedExisting.is_terminal());
        assert!(JobState::SkippedIneligible.is_terminal());
        assert!(JobState::Interrupted.is_terminal());
    }

    #[test]
    fn test_transitions() {
        assert!(JobState::Pending.can_transition_to(JobState::Running));
        assert!(JobState::Running.can_transition_to(JobState::RetryWait));
        assert!(JobState::RetryWait.can_transition_to(JobState::Running));
        assert!(JobState::Running.can_transition_to(JobState::Succeeded));

        assert!(!JobState::Succeeded.can_transition_to(JobState::Running));
        assert!(!JobState::SkippedExisting.can_transition_to(JobState::Running));
        assert!(!JobState::Pending.can_transition_to(JobState::Succeeded));
    }
}
