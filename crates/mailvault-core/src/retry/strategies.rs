//! Retry delay strategies and predicates

use crate::types::{RetryPolicy, RetryStrategy};
use std::time::Duration;

/// Calculate the delay before the next retry attempt
///
/// `attempt` is the 1-indexed attempt that just failed.
///
/// # Example
///
/// ```rust
/// use mailvault_core::retry::calculate_delay;
/// use mailvault_core::types::{RetryPolicy, RetryStrategy};
///
/// let policy = RetryPolicy {
///     max_attempts: 3,
///     strategy: RetryStrategy::ExponentialBackoff,
///     backoff_multiplier: 2.0,
///     initial_delay_ms: 1000,
///     max_delay_ms: 30000,
/// };
///
/// assert_eq!(calculate_delay(&policy, 1).as_millis(), 1000);
/// assert_eq!(calculate_delay(&policy, 2).as_millis(), 2000);
/// ```
pub fn calculate_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let attempt_index = attempt.saturating_sub(1);

    let base_delay_ms = match policy.strategy {
        RetryStrategy::None => 0,

        RetryStrategy::FixedDelay => policy.initial_delay_ms,

        RetryStrategy::ExponentialBackoff => {
            let multiplier = policy.backoff_multiplier.powf(attempt_index as f64);
            (policy.initial_delay_ms as f64 * multiplier) as u64
        }

        RetryStrategy::LinearBackoff => policy.initial_delay_ms * (attempt_index as u64 + 1),
    };

    Duration::from_millis(base_delay_ms.min(policy.max_delay_ms))
}

/// A predicate that determines whether an error should be retried
///
/// Errors for which this returns `false` end the retry loop immediately
/// with [`RetryError::NonRetryable`](super::RetryError::NonRetryable).
pub trait RetryPredicate<E: ?Sized>: Send + Sync {
    /// Determine whether the given error should be retried
    fn should_retry(&self, error: &E) -> bool;
}

/// A predicate that always returns true (all errors are retryable)
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRetry;

impl<E: ?Sized> RetryPredicate<E> for AlwaysRetry {
    fn should_retry(&self, _error: &E) -> bool {
        true
    }
}

/// A predicate that uses a closure to determine retryability
pub struct ClosurePredicate<F> {
    predicate: F,
}

impl<F> ClosurePredicate<F> {
    /// Create a new closure-based predicate
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<E, F> RetryPredicate<E> for ClosurePredicate<F>
where
    F: Fn(&E) -> bool + Send + Sync,
{
    fn should_retry(&self, error: &E) -> bool {
        (self.predicate)(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn policy(strategy: RetryStrategy) -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            strategy,
            backoff_multiplier: 2.0,
            initial_delay_ms: 1000,
            max_delay_ms: 30000,
        }
    }

    #[test]
    fn test_none_strategy() {
        let policy = policy(RetryStrategy::None);
        assert_eq!(calculate_delay(&policy, 1), Duration::ZERO);
        assert_eq!(calculate_delay(&policy, 3), Duration::ZERO);
    }

    #[test]
    fn test_fixed_strategy() {
        let policy = RetryPolicy::fixed(3, 60_000);
        for attempt in 1..=3 {
            assert_eq!(calculate_delay(&policy, attempt), Duration::from_secs(60));
        }
    }

    #[test]
    fn test_exponential_strategy() {
        let policy = policy(RetryStrategy::ExponentialBackoff);
        assert_eq!(calculate_delay(&policy, 1), Duration::from_millis(1000));
        assert_eq!(calculate_delay(&policy, 2), Duration::from_millis(2000));
        assert_eq!(calculate_delay(&policy, 4), Duration::from_millis(8000));
    }

    #[test]
    fn test_linear_strategy() {
        let policy = policy(RetryStrategy::LinearBackoff);
        assert_eq!(calculate_delay(&policy, 1), Duration::from_millis(1000));
        assert_eq!(calculate_delay(&policy, 3), Duration::from_millis(3000));
    }

    #[test]
    fn test_max_delay_cap() {
        let mut policy = policy(RetryStrategy::ExponentialBackoff);
        policy.max_delay_ms = 5000;
        // 1000 * 2^4 = 16000, capped
        assert_eq!(calculate_delay(&policy, 5), Duration::from_millis(5000));
    }

    #[test]
    fn test_predicates() {
        let error = io::Error::new(io::ErrorKind::NotFound, "not found");
        assert!(AlwaysRetry.should_retry(&error));

        let predicate = ClosurePredicate::new(|err: &io::Error| {
            matches!(err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::Interrupted)
        });
        assert!(predicate.should_retry(&io::Error::new(io::ErrorKind::TimedOut, "t")));
        assert!(!predicate.should_retry(&error));
    }
}
