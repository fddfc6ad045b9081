//! External tool availability checks

use std::path::PathBuf;

/// Result of looking up one required program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolStatus {
    /// What the program is used for
    pub role: &'static str,
    pub program: String,
    /// Resolved location, `None` when missing
    pub path: Option<PathBuf>,
}

impl ToolStatus {
    pub fn is_available(&self) -> bool {
        self.path.is_some()
    }
}

/// Look up each `(role, program)` on `PATH`
pub fn check_tools(tools: &[(&'static str, &str)]) -> Vec<ToolStatus> {
    tools
        .iter()
        .map(|&(role, program)| {
            let path = which::which(program).ok();
            match &path {
                Some(p) => tracing::debug!(program, path = %p.display(), "Found {}", role),
                None => tracing::debug!(program, "Missing {}", role),
            }
            ToolStatus {
                role,
                program: program.to_string(),
                path,
            }
        })
        .collect()
}

/// Fail listing every missing program at once
pub fn require_tools(tools: &[(&'static str, &str)]) -> anyhow::Result<Vec<ToolStatus>> {
    let statuses = check_tools(tools);
    let missing: Vec<String> = statuses
        .iter()
        .filter(|s| !s.is_available())
        .map(|s| format!("{} ({})", s.program, s.role))
        .collect();

    if !missing.is_empty() {
        anyhow::bail!("Required tools not found on PATH: {}", missing.join(", "));
    }
    Ok(statuses)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_present_tool_resolves() {
        let statuses = check_tools(&[("shell", "sh")]);
        assert!(statuses[0].is_available());
        assert!(require_tools(&[("shell", "sh")]).is_ok());
    }

    #[test]
    fn test_missing_tools_reported_together() {
        let err = require_tools(&[
            ("directory tool", "mailvault-missing-one"),
            ("backup tool", "mailvault-missing-two"),
        ])
        .unwrap_err()
        .to_string();

        assert!(err.contains("mailvault-missing-one (directory tool)"));
        assert!(err.contains("mailvault-missing-two (backup tool)"));
    }
}
