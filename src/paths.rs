//! Centralized path resolution for stackform
//!
//! # Environment Variables
//!
//! - `STACKFORM_CONFIG` - Path of the config file
//!
//! # Config File Resolution Priority
//!
//! 1. Explicit path (e.g. `--config`)
//! 2. `STACKFORM_CONFIG` environment variable
//! 3. `XDG_CONFIG_HOME/stackform/config.toml` (if set)
//! 4. Platform default:
//!    - Windows: `%APPDATA%\stackform\config.toml`
//!    - macOS/Linux: `~/.config/stackform/config.toml`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable for the config file path
pub const ENV_CONFIG: &str = "STACKFORM_CONFIG";

/// File name of the config inside the config directory
pub const CONFIG_FILE: &str = "config.toml";

/// Get the stackform config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("stackform");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            return Ok(app_data.join("stackform"));
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("stackform"))
}

/// Resolve the config file path.
pub fn config_file(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(expand(&path.to_string_lossy()));
    }

    if let Ok(path) = std::env::var(ENV_CONFIG) {
        let path = expand(&path);
        log::debug!("Using config file from {}: {}", ENV_CONFIG, path.display());
        return Ok(path);
    }

    Ok(config_dir()?.join(CONFIG_FILE))
}

/// Expand ~ and environment variables in a path string.
///
/// # Examples
///
/// ```
/// use stackform::paths;
///
/// let work_dir = paths::expand("~/infra/.stackform");
/// assert!(!work_dir.to_string_lossy().starts_with('~'));
/// ```
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    /// Helper to run a test with temporary env var
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: Tests run in isolation and don't read env vars concurrently
        unsafe { env::set_var(key, value) };
        let result = f();
        match original {
            // SAFETY: Tests run in isolation
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    #[test]
    fn test_explicit_config_wins() {
        with_env_var(ENV_CONFIG, "/from/env.toml", || {
            let path = config_file(Some(Path::new("/explicit.toml"))).unwrap();
            assert_eq!(path, PathBuf::from("/explicit.toml"));
        });
    }

    #[test]
    fn test_config_env_override() {
        with_env_var(ENV_CONFIG, "/custom/stackform.toml", || {
            assert_eq!(
                config_file(None).unwrap(),
                PathBuf::from("/custom/stackform.toml")
            );
        });
    }

    #[test]
    fn test_expand_tilde() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand("~/infra"), home.join("infra"));
    }

    #[test]
    fn test_expand_plain_path() {
        assert_eq!(expand("/tmp/work"), PathBuf::from("/tmp/work"));
    }
}
