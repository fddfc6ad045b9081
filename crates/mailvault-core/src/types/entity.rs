use serde::{Deserialize, Serialize};
use std::fmt;

/// An account returned by directory discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Validated account identifier (email-shaped)
    pub identifier: String,

    /// Human readable name, may be empty
    pub display_name: String,
}

impl EntityRecord {
    pub fn new(identifier: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            display_name: display_name.into(),
        }
    }
}

impl fmt::Display for EntityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.display_name.is_empty() {
            write!(f, "{}", self.identifier)
        } else {
            write!(f, "{} ({})", self.identifier, self.display_name)
        }
    }
}
