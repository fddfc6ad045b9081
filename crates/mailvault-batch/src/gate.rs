//! Confirmation gate
//!
//! Nothing is backed up until the operator has seen the full account list
//! and typed the group path back exactly. Dry runs pass without prompting.

use mailvault_core::EntityRecord;
use std::io;

/// Operator interaction used by the gate
pub trait Prompter {
    /// Show the accounts that are about to be processed
    fn show_entities(&self, group_path: &str, entities: &[EntityRecord]);

    /// Ask for a line of text
    fn input(&self, prompt: &str) -> io::Result<String>;

    /// Ask a yes/no question
    fn confirm(&self, prompt: &str) -> io::Result<bool>;
}

/// Whether the run may start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    Abort,
}

impl GateDecision {
    pub fn is_proceed(self) -> bool {
        self == GateDecision::Proceed
    }
}

/// Gate a bulk run over `entities` discovered from `group_path`
pub fn confirm(entities: &[EntityRecord], group_path: &str, dry_run: bool, prompter: &dyn Prompter) -> GateDecision {
    prompter.show_entities(group_path, entities);

    if dry_run {
        tracing::info!("Dry run, skipping confirmation");
        return GateDecision::Proceed;
    }

    let prompt = format!(
        "Type the group path ({}) to back up {} account(s)",
        group_path,
        entities.len()
    );
    match prompter.input(&prompt) {
        Ok(typed) if acknowledgement_matches(&typed, group_path) => GateDecision::Proceed,
        Ok(_) => {
            tracing::warn!("Confirmation did not match {}, aborting", group_path);
            GateDecision::Abort
        }
        Err(e) => {
            tracing::warn!("Confirmation prompt failed: {}", e);
            GateDecision::Abort
        }
    }
}

/// Gate a single-account run
pub fn confirm_single(identifier: &str, dry_run: bool, prompter: &dyn Prompter) -> GateDecision {
    if dry_run {
        return GateDecision::Proceed;
    }

    match prompter.confirm(&format!("Back up {}?", identifier)) {
        Ok(true) => GateDecision::Proceed,
        Ok(false) => GateDecision::Abort,
        Err(e) => {
            tracing::warn!("Confirmation prompt failed: {}", e);
            GateDecision::Abort
        }
    }
}

/// Exact comparison after dropping one trailing line ending
pub fn acknowledgement_matches(typed: &str, group_path: &str) -> bool {
    let typed = typed
        .strip_suffix('\n')
        .map(|s| s.strip_suffix('\r').unwrap_or(s))
        .unwrap_or(typed);
    typed == group_path
}
