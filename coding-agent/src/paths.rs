//! Path resolution for the settings file and log directory.
//!
//! | Purpose | Linux | macOS | Windows |
//! |---------|-------|-------|---------|
//! | Config | `~/.config/coding-agent/` | `~/Library/Application Support/coding-agent/` | `%APPDATA%\coding-agent\` |
//! | Logs | `./logs/` | `./logs/` | `.\logs\` |

use std::path::PathBuf;

/// Application name used in directory paths
const APP_NAME: &str = "coding-agent";

pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const LOG_FILE_NAME: &str = "coding-agent.log";

/// Get the configuration directory.
pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|p| p.join(APP_NAME))
        .unwrap_or_else(|| fallback_base_dir().join("config"))
}

/// Default settings file location, used when `--config` is not given.
pub fn get_config_path() -> PathBuf {
    get_config_dir().join(SETTINGS_FILE_NAME)
}

/// Default log directory, relative to the working directory.
pub fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

/// Fallback base directory when platform dirs are unavailable.
///
/// Tries in order:
/// 1. `~/.coding-agent/` (home directory)
/// 2. `./.coding-agent/` (current working directory)
fn fallback_base_dir() -> PathBuf {
    dirs::home_dir()
        .map(|p| p.join(".coding-agent"))
        .unwrap_or_else(|| {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(".coding-agent")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_config_dir_not_empty() {
        let config_dir = get_config_dir();
        assert!(!config_dir.as_os_str().is_empty());
        assert!(config_dir.to_string_lossy().contains("coding-agent"));
    }

    #[test]
    fn test_config_path_is_settings_json() {
        let path = get_config_path();
        assert_eq!(path.file_name().unwrap(), SETTINGS_FILE_NAME);
        assert_eq!(path.parent().unwrap(), get_config_dir());
    }

    #[test]
    fn test_default_log_dir_is_relative() {
        assert!(default_log_dir().is_relative());
    }
}
