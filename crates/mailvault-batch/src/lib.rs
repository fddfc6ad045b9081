//! # mailvault-batch
//!
//! Batch orchestration: the operator confirmation gate, the sequential
//! pipeline that backs up and packages each account, run reports and the
//! external tool checks done before a run starts.

pub mod deps;
pub mod gate;
pub mod pipeline;
pub mod report;

pub use deps::{check_tools, require_tools, ToolStatus};
pub use gate::{acknowledgement_matches, confirm, confirm_single, GateDecision, Prompter};
pub use pipeline::PipelineController;
pub use report::RunReporter;
