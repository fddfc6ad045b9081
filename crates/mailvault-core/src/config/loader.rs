//! Layered configuration loader
//!
//! Loads configuration from multiple sources with the following precedence (low to high):
//! 1. Embedded defaults (built into binary)
//! 2. User config (`~/.mailvault/config.yaml`, or an explicit `--config` path)
//! 3. Environment variables (`MAILVAULT_*` prefix)
//! 4. CLI flags (handled by caller)

use crate::error::{Error, Result};
use crate::types::MailvaultConfig;
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use rust_embed::RustEmbed;
use serde_yaml_ng::Value;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Embedded configuration files
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../embedded/config/"]
#[prefix = ""]
struct EmbeddedConfigs;

/// Name of the user configuration file inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Name of the embedded defaults file
const DEFAULTS_FILE_NAME: &str = "defaults.yaml";

/// Overrides the config directory and the default state directory
pub const HOME_ENV: &str = "MAILVAULT_HOME";

/// Configuration loader
pub struct ConfigLoader {
    /// Directory holding config.yaml (also the default state directory)
    config_dir: Utf8PathBuf,
}

impl ConfigLoader {
    /// Create a loader rooted at `$MAILVAULT_HOME` or `~/.mailvault`
    pub fn new() -> Result<Self> {
        let config_dir = Self::default_config_dir()?;
        Ok(Self { config_dir })
    }

    /// Create a loader with a custom config directory
    pub fn with_dir(config_dir: Utf8PathBuf) -> Self {
        Self { config_dir }
    }

    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    fn default_config_dir() -> Result<Utf8PathBuf> {
        if let Ok(dir) = env::var(HOME_ENV) {
            return Ok(Utf8PathBuf::from(dir));
        }

        let home = crate::utils::get_home_dir()
            .map_err(|e| Error::invalid_config(e.to_string()))?;
        let home = Utf8PathBuf::try_from(home)
            .map_err(|_| Error::invalid_config("Home directory path is not valid UTF-8"))?;

        Ok(home.join(".mailvault"))
    }

    /// Load configuration with layered precedence.
    ///
    /// An explicit path must exist; the implicit `config.yaml` is optional.
    pub fn load(&self, explicit: Option<&Utf8Path>) -> Result<MailvaultConfig> {
        let mut merged = Self::load_embedded_defaults()?;

        let user_file = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::config_not_found(path.as_str()));
                }
                Some(path.to_owned())
            }
            None => {
                let implicit = self.config_dir.join(CONFIG_FILE_NAME);
                implicit.exists().then_some(implicit)
            }
        };

        if let Some(path) = user_file {
            tracing::debug!("Loading configuration from {}", path);
            let overlay = Self::load_yaml_file(&path)?;
            merge_values(&mut merged, overlay);
        }

        let mut config: MailvaultConfig = serde_yaml_ng::from_value(merged)
            .map_err(|e| Error::invalid_config(format!("Failed to parse configuration: {}", e)))?;

        config = Self::apply_env_overrides(config)?;
        Self::validate(&config)?;

        Ok(config)
    }

    /// Directory that holds archives, logs, reports and temporary files
    pub fn state_dir(&self, config: &MailvaultConfig) -> PathBuf {
        config
            .paths
            .base_dir
            .clone()
            .unwrap_or_else(|| self.config_dir.clone().into_std_path_buf())
    }

    fn load_embedded_defaults() -> Result<Value> {
        let embedded_file = EmbeddedConfigs::get(DEFAULTS_FILE_NAME).ok_or_else(|| {
            Error::config_not_found(format!("Embedded config not found: {}", DEFAULTS_FILE_NAME))
        })?;

        let content = std::str::from_utf8(&embedded_file.data).map_err(|_| {
            Error::invalid_config(format!(
                "Invalid UTF-8 in embedded config: {}",
                DEFAULTS_FILE_NAME
            ))
        })?;

        serde_yaml_ng::from_str(content).map_err(|e| {
            Error::invalid_config(format!(
                "Failed to parse embedded config {}: {}",
                DEFAULTS_FILE_NAME, e
            ))
        })
    }

    fn load_yaml_file(path: &Utf8Path) -> Result<Value> {
        let content = fs::read_to_string(path)?;
        let value: Value = serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::invalid_config(format!("Failed to parse {}: {}", path, e)))?;

        // An empty file parses as null; treat it as "no overrides"
        Ok(match value {
            Value::Null => Value::Mapping(Default::default()),
            other => other,
        })
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(mut config: MailvaultConfig) -> Result<MailvaultConfig> {
        if let Ok(val) = env::var(HOME_ENV) {
            if config.paths.base_dir.is_none() {
                config.paths.base_dir = Some(PathBuf::from(val));
            }
        }

        if let Ok(val) = env::var("MAILVAULT_DIRECTORY_PROGRAM") {
            config.directory.program = val;
        }

        if let Ok(val) = env::var("MAILVAULT_BACKUP_PROGRAM") {
            config.backup.program = val;
        }

        if let Ok(val) = env::var("MAILVAULT_INTER_ENTITY_DELAY_SECS") {
            config.pipeline.inter_entity_delay_secs = val.parse().map_err(|_| {
                Error::invalid_config("MAILVAULT_INTER_ENTITY_DELAY_SECS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("MAILVAULT_RETRY_MAX_ATTEMPTS") {
            config.retry.max_attempts = val.parse().map_err(|_| {
                Error::invalid_config("MAILVAULT_RETRY_MAX_ATTEMPTS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("MAILVAULT_RETRY_BACKOFF_SECS") {
            let secs: u64 = val.parse().map_err(|_| {
                Error::invalid_config("MAILVAULT_RETRY_BACKOFF_SECS must be a valid number")
            })?;
            config.retry.initial_delay_ms = secs * 1000;
            config.retry.max_delay_ms = config.retry.max_delay_ms.max(secs * 1000);
        }

        Ok(config)
    }

    /// Check values that serde cannot check on its own
    pub fn validate(config: &MailvaultConfig) -> Result<()> {
        if config.retry.max_attempts == 0 {
            return Err(Error::invalid_config("retry.max-attempts must be at least 1"));
        }

        if config.monitor.poll_interval_ms == 0 {
            return Err(Error::invalid_config(
                "monitor.poll-interval-ms must be greater than zero",
            ));
        }

        if !(1..=9).contains(&config.archive.compression_level) {
            return Err(Error::invalid_config(format!(
                "archive.compression-level must be 1-9, got {}",
                config.archive.compression_level
            )));
        }

        for (name, pattern) in [
            ("monitor.total-pattern", &config.monitor.total_pattern),
            ("monitor.progress-pattern", &config.monitor.progress_pattern),
        ] {
            let re = Regex::new(pattern)
                .map_err(|e| Error::invalid_config(format!("{} is not a valid regex: {}", name, e)))?;
            let expected = if name == "monitor.progress-pattern" { 2 } else { 1 };
            if re.captures_len() - 1 < expected {
                return Err(Error::invalid_config(format!(
                    "{} needs at least {} capture group(s)",
                    name, expected
                )));
            }
        }

        if !config.backup.args.iter().any(|a| a.contains("{account}")) {
            return Err(Error::invalid_config(
                "backup.args must contain the {account} placeholder",
            ));
        }

        if !config.directory.args.iter().any(|a| a.contains("{group}")) {
            return Err(Error::invalid_config(
                "directory.args must contain the {group} placeholder",
            ));
        }

        Ok(())
    }
}

/// Recursively overlay `overlay` onto `base`; mappings merge, everything else replaces.
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RetryStrategy;
    use serial_test::serial;
    use tempfile::TempDir;

    fn clear_env() {
        for key in [
            HOME_ENV,
            "MAILVAULT_DIRECTORY_PROGRAM",
            "MAILVAULT_BACKUP_PROGRAM",
            "MAILVAULT_INTER_ENTITY_DELAY_SECS",
            "MAILVAULT_RETRY_MAX_ATTEMPTS",
            "MAILVAULT_RETRY_BACKOFF_SECS",
        ] {
            env::remove_var(key);
        }
    }

    fn loader(temp: &TempDir) -> ConfigLoader {
        ConfigLoader::with_dir(Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap())
    }

    #[test]
    #[serial]
    fn test_embedded_defaults_match_struct_defaults() {
        clear_env();
        let temp = TempDir::new().unwrap();
        let config = loader(&temp).load(None).unwrap();
        let defaults = MailvaultConfig::default();

        assert_eq!(config.directory.program, defaults.directory.program);
        assert_eq!(config.directory.args, defaults.directory.args);
        assert_eq!(config.backup.args, defaults.backup.args);
        assert_eq!(config.backup.rate_limit_patterns, defaults.backup.rate_limit_patterns);
        assert_eq!(config.monitor.total_pattern, defaults.monitor.total_pattern);
        assert_eq!(config.monitor.progress_pattern, defaults.monitor.progress_pattern);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.initial_delay_ms, 60_000);
        assert_eq!(config.retry.strategy, RetryStrategy::FixedDelay);
        assert_eq!(config.pipeline.inter_entity_delay_secs, 0);
    }

    #[test]
    #[serial]
    fn test_user_file_overrides_nested_keys_only() {
        clear_env();
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            "backup:\n  program: /opt/gyb/gyb\nretry:\n  max-attempts: 5\n",
        )
        .unwrap();

        let config = loader(&temp).load(None).unwrap();
        assert_eq!(config.backup.program, "/opt/gyb/gyb");
        assert_eq!(config.backup.args, MailvaultConfig::default().backup.args);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_delay_ms, 60_000);
    }

    #[test]
    #[serial]
    fn test_explicit_path_must_exist() {
        clear_env();
        let temp = TempDir::new().unwrap();
        let missing = Utf8PathBuf::from("/nonexistent/mailvault.yaml");
        let err = loader(&temp).load(Some(&missing)).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    #[serial]
    fn test_empty_user_file_is_accepted() {
        clear_env();
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE_NAME), "").unwrap();
        assert!(loader(&temp).load(None).is_ok());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        let temp = TempDir::new().unwrap();
        env::set_var("MAILVAULT_BACKUP_PROGRAM", "/usr/local/bin/gyb");
        env::set_var("MAILVAULT_INTER_ENTITY_DELAY_SECS", "7");
        env::set_var("MAILVAULT_RETRY_BACKOFF_SECS", "90");

        let config = loader(&temp).load(None).unwrap();
        clear_env();

        assert_eq!(config.backup.program, "/usr/local/bin/gyb");
        assert_eq!(config.pipeline.inter_entity_delay_secs, 7);
        assert_eq!(config.retry.initial_delay_ms, 90_000);
        assert_eq!(config.retry.max_delay_ms, 90_000);
    }

    #[test]
    #[serial]
    fn test_invalid_env_number_is_rejected() {
        clear_env();
        let temp = TempDir::new().unwrap();
        env::set_var("MAILVAULT_RETRY_MAX_ATTEMPTS", "many");
        let result = loader(&temp).load(None);
        clear_env();

        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    #[serial]
    fn test_validation_rejects_bad_values() {
        clear_env();
        let mut config = MailvaultConfig::default();
        config.retry.max_attempts = 0;
        assert!(ConfigLoader::validate(&config).is_err());

        let mut config = MailvaultConfig::default();
        config.monitor.progress_pattern = r"(\d+) done".to_string();
        assert!(ConfigLoader::validate(&config).is_err());

        let mut config = MailvaultConfig::default();
        config.archive.compression_level = 12;
        assert!(ConfigLoader::validate(&config).is_err());

        let mut config = MailvaultConfig::default();
        config.backup.args = vec!["--all".to_string()];
        assert!(ConfigLoader::validate(&config).is_err());

        assert!(ConfigLoader::validate(&MailvaultConfig::default()).is_ok());
    }

    #[test]
    fn test_merge_values() {
        let mut base: Value = serde_yaml_ng::from_str("a:\n  b: 1\n  c: 2\nd: [1, 2]\n").unwrap();
        let overlay: Value = serde_yaml_ng::from_str("a:\n  c: 3\nd: [9]\n").unwrap();
        merge_values(&mut base, overlay);

        let expected: Value = serde_yaml_ng::from_str("a:\n  b: 1\n  c: 3\nd: [9]\n").unwrap();
        assert_eq!(base, expected);
    }
}
