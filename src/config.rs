//! TOML configuration.
//!
//! Every field is optional; a missing file means defaults.
//!
//! ```toml
//! work_dir = "~/infra/.stackform"
//! timeout_secs = 1800
//! fail_on_overflow = true
//!
//! [retry]
//! max_attempts = 5
//! base_delay_secs = 10
//! ```

use crate::paths;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tfexec::RetryConfig;

/// Default working directory, relative to where the binary runs.
pub const DEFAULT_WORK_DIR: &str = ".stackform";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Terraform binary; looked up on PATH when unset
    pub terraform_bin: Option<String>,
    /// Root of the per-stack working directories
    pub work_dir: String,
    /// Deadline for each terraform invocation
    pub timeout_secs: Option<u64>,
    pub upgrade: bool,
    pub fail_on_overflow: bool,
    pub split_files: bool,
    pub echo_output: bool,
    pub retry: RetrySettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            terraform_bin: None,
            work_dir: DEFAULT_WORK_DIR.to_string(),
            timeout_secs: None,
            upgrade: false,
            fail_on_overflow: false,
            split_files: false,
            echo_output: false,
            retry: RetrySettings::default(),
        }
    }
}

/// Retry behavior for transient terraform failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_secs: u64,
    pub backoff_factor: f64,
    pub max_delay_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let defaults = RetryConfig::default();
        Self {
            max_attempts: defaults.max_attempts,
            base_delay_secs: defaults.base_delay.as_secs(),
            backoff_factor: defaults.backoff_factor,
            max_delay_secs: defaults.max_delay.as_secs(),
        }
    }
}

impl RetrySettings {
    /// Reject settings that would make backoff meaningless.
    pub fn validate(&self) -> Result<()> {
        if !self.backoff_factor.is_finite() || self.backoff_factor <= 0.0 {
            anyhow::bail!(
                "retry.backoff_factor must be a positive number, got {}",
                self.backoff_factor
            );
        }
        Ok(())
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: Duration::from_secs(settings.base_delay_secs),
            backoff_factor: settings.backoff_factor,
            max_delay: Duration::from_secs(settings.max_delay_secs),
        }
    }
}

impl Config {
    /// Load the config from `explicit`, `STACKFORM_CONFIG` or the default
    /// location.
    ///
    /// A missing file at the default location yields defaults; a missing
    /// explicit file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = paths::config_file(explicit)?;
        if !path.exists() {
            if explicit.is_some() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse config")?;
        config.retry.validate()?;
        Ok(config)
    }

    /// Working directory root with `~` and variables expanded.
    pub fn work_dir(&self) -> PathBuf {
        paths::expand(&self.work_dir)
    }

    /// Configured terraform binary, or the one on PATH.
    pub fn terraform_bin(&self) -> Result<PathBuf> {
        match &self.terraform_bin {
            Some(bin) => Ok(paths::expand(bin)),
            None => tfexec::find_terraform().context(
                "terraform not found on PATH; install it or set terraform_bin in the config",
            ),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::from(&self.retry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn test_parse_full_config() {
        let config = Config::from_toml(
            r#"
            terraform_bin = "/opt/terraform/bin/terraform"
            work_dir = "/srv/stacks"
            timeout_secs = 600
            upgrade = true
            fail_on_overflow = true
            split_files = true
            echo_output = true

            [retry]
            max_attempts = 5
            base_delay_secs = 1
            backoff_factor = 3.0
            max_delay_secs = 30
            "#,
        )
        .unwrap();

        assert_eq!(
            config.terraform_bin().unwrap(),
            PathBuf::from("/opt/terraform/bin/terraform")
        );
        assert_eq!(config.work_dir(), PathBuf::from("/srv/stacks"));
        assert_eq!(config.timeout(), Some(Duration::from_secs(600)));
        assert!(config.upgrade && config.fail_on_overflow && config.split_files);

        let retry = config.retry_config();
        assert_eq!(retry.max_attempts, 5);
        assert_eq!(retry.delay_for_attempt(1), Duration::from_secs(3));
        assert_eq!(retry.max_delay, Duration::from_secs(30));
    }

    #[test]
    fn test_partial_retry_section_keeps_defaults() {
        let config = Config::from_toml("[retry]\nmax_attempts = 1\n").unwrap();
        assert_eq!(config.retry.max_attempts, 1);
        assert_eq!(config.retry.backoff_factor, RetrySettings::default().backoff_factor);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(Config::from_toml("workdir = \"typo\"").is_err());
    }

    #[test]
    fn test_invalid_backoff_factor_is_rejected() {
        for factor in ["-2.0", "0.0", "nan", "inf"] {
            let toml = format!("[retry]\nbackoff_factor = {factor}\n");
            let err = Config::from_toml(&toml).unwrap_err();
            assert!(err.to_string().contains("backoff_factor"), "{factor}: {err}");
        }
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        let config = Config::from_toml("[retry]\nmax_attempts = 0\n").unwrap();
        assert_eq!(config.retry_config().max_attempts, 1);
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "split_files = true\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert!(config.split_files);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        assert!(Config::load(Some(&temp.path().join("absent.toml"))).is_err());
    }
}
