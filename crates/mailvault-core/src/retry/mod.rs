//! Retry execution engine with policy-based configuration
//!
//! Retries are an explicit bounded loop driven by a [`RetryPolicy`]
//! (attempt limit and backoff as data), a [`RetryPredicate`] deciding which
//! errors are transient, and a [`RetryObserver`] receiving attempt events.
//! Waiting between attempts observes a [`CancellationToken`] so an operator
//! interrupt never has to sit out a backoff.
//!
//! # Example
//!
//! ```rust,no_run
//! use mailvault_core::retry::{ClosurePredicate, RetryExecutorBuilder, TracingObserver};
//! use mailvault_core::types::RetryPolicy;
//!
//! async fn example() {
//!     let executor = RetryExecutorBuilder::new()
//!         .with_policy(RetryPolicy::fixed(3, 60_000))
//!         .with_predicate(ClosurePredicate::new(|e: &std::io::Error| {
//!             e.kind() == std::io::ErrorKind::WouldBlock
//!         }))
//!         .with_observer(TracingObserver::new("backup"))
//!         .build();
//!
//!     let result = executor
//!         .execute(|_attempt| async { Ok::<_, std::io::Error>("done") })
//!         .await;
//! }
//! ```
//!
//! [`RetryPolicy`]: crate::types::RetryPolicy
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

mod error;
mod executor;
mod observer;
mod strategies;

pub use error::RetryError;
pub use executor::{RetryExecutor, RetryExecutorBuilder};
pub use observer::{NoOpObserver, RetryObserver, TracingObserver};
pub use strategies::{calculate_delay, AlwaysRetry, ClosurePredicate, RetryPredicate};
