//! Input validation for values interpolated into external commands
//!
//! Group paths end up as arguments to the directory query tool and account
//! identifiers as arguments to the backup tool, so both are checked before
//! any command line is built from them.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ValidationError, MAX_GROUP_PATH_LEN};

/// Characters that are never accepted inside a group path
pub const FORBIDDEN_GROUP_PATH_CHARS: &[char] = &[
    '\'', '"', '`', ';', '|', '&', '$', '(', ')', '<', '>', '\n', '\r', '\0',
];

static ACCOUNT_IDENTIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
        .expect("account identifier regex is valid")
});

/// Validate a hierarchical group path such as `/Sales/EMEA`.
pub fn validate_group_path(path: &str) -> Result<(), ValidationError> {
    let length = path.chars().count();
    if length > MAX_GROUP_PATH_LEN {
        return Err(ValidationError::GroupPathTooLong { length });
    }

    if !path.starts_with('/') {
        return Err(ValidationError::GroupPathRoot {
            path: path.to_string(),
        });
    }

    if let Some(character) = path.chars().find(|c| FORBIDDEN_GROUP_PATH_CHARS.contains(c)) {
        return Err(ValidationError::GroupPathCharacter {
            path: path.to_string(),
            character,
        });
    }

    Ok(())
}

/// Validate an email-shaped account identifier.
pub fn validate_account_identifier(identifier: &str) -> Result<(), ValidationError> {
    if ACCOUNT_IDENTIFIER_RE.is_match(identifier) {
        Ok(())
    } else {
        Err(ValidationError::invalid_identifier(identifier))
    }
}
