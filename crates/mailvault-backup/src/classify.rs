//! Classification of failed backup runs from their log text

use mailvault_core::types::BackupToolConfig;

/// Why a backup tool run failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The account has nothing that can be backed up
    Ineligible,
    /// The remote service throttled the tool
    RateLimited,
    Other,
}

/// Matches log text against the configured failure signatures
///
/// Signatures are case-insensitive substrings. Ineligibility wins when a log
/// carries both kinds.
#[derive(Debug, Clone)]
pub struct OutcomeClassifier {
    ineligible: Vec<String>,
    rate_limit: Vec<String>,
}

impl OutcomeClassifier {
    pub fn new(ineligible: &[String], rate_limit: &[String]) -> Self {
        let lower = |patterns: &[String]| {
            patterns
                .iter()
                .filter(|p| !p.trim().is_empty())
                .map(|p| p.to_lowercase())
                .collect()
        };
        Self {
            ineligible: lower(ineligible),
            rate_limit: lower(rate_limit),
        }
    }

    pub fn from_config(config: &BackupToolConfig) -> Self {
        Self::new(&config.ineligible_patterns, &config.rate_limit_patterns)
    }

    pub fn classify(&self, log_text: &str) -> FailureKind {
        let text = log_text.to_lowercase();

        if self.ineligible.iter().any(|p| text.contains(p.as_str())) {
            FailureKind::Ineligible
        } else if self.rate_limit.iter().any(|p| text.contains(p.as_str())) {
            FailureKind::RateLimited
        } else {
            FailureKind::Other
        }
    }
}
