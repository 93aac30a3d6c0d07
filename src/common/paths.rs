//! Configuration file locations

use std::path::PathBuf;

/// Name of the project directory under the platform config root
const APP_NAME: &str = "stepwise";

/// Environment variable that points at an explicit config file
pub const CONFIG_ENV: &str = "STEPWISE_CONFIG";

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/stepwise/`
/// - macOS: `~/Library/Application Support/stepwise/`
/// - Windows: `%APPDATA%\stepwise\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
///
/// `STEPWISE_CONFIG` wins over the platform location.
pub fn config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    config_dir().map(|dir| dir.join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_ends_with_toml() {
        if std::env::var(CONFIG_ENV).is_ok() {
            return;
        }
        if let Some(path) = config_path() {
            assert!(path.ends_with("config.toml"));
        }
    }
}
