use crate::error::{HotstringError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

pub const HOME_ENV: &str = "HOTSTRING_HOME";
pub const PID_FILENAME: &str = "hotstring-daemon.pid";
pub const DB_FILENAME: &str = "triggers.json";
pub const SETTINGS_FILENAME: &str = "settings.json";

pub const MIN_TRIGGER_SPEED: u8 = 1;
pub const MAX_TRIGGER_SPEED: u8 = 10;
pub const DEFAULT_TRIGGER_SPEED: u8 = 5;

/// Get the hotstring configuration directory
pub fn get_config_dir() -> PathBuf {
    if let Ok(dir) = env::var(HOME_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }

    env::var("HOME")
        .map(|home| PathBuf::from(home).join(".hotstring"))
        .unwrap_or_else(|_| PathBuf::from(".hotstring"))
}

/// Ensure the configuration directory exists
pub fn ensure_config_dir() -> Result<PathBuf> {
    let config_dir = get_config_dir();
    if !config_dir.exists() {
        debug!(path = %config_dir.display(), "Creating config directory");
        fs::create_dir_all(&config_dir)?;
    }
    Ok(config_dir)
}

/// Get the path to the PID file
pub fn get_pid_file_path() -> PathBuf {
    get_config_dir().join(PID_FILENAME)
}

/// Get the path to the settings file
pub fn get_settings_file_path() -> PathBuf {
    get_config_dir().join(SETTINGS_FILENAME)
}

/// Get the path to the trigger database, honoring a custom location from settings
pub fn get_db_file_path() -> PathBuf {
    Settings::load()
        .custom_database_path
        .unwrap_or_else(|| get_config_dir().join(DB_FILENAME))
}

/// Check if daemon is running
pub fn is_daemon_running() -> Result<Option<u32>> {
    let pid_file = get_pid_file_path();

    if !pid_file.exists() {
        return Ok(None);
    }

    match fs::read_to_string(&pid_file) {
        Ok(contents) => match contents.trim().parse::<u32>() {
            Ok(pid) => Ok(Some(pid)),
            Err(_) => {
                // Invalid PID, treat as not running and clean up
                warn!(path = %pid_file.display(), "Removing PID file with invalid contents");
                let _ = fs::remove_file(&pid_file);
                Ok(None)
            }
        },
        Err(_) => {
            let _ = fs::remove_file(&pid_file);
            Ok(None)
        }
    }
}

/// User-adjustable settings persisted next to the trigger database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Master switch for the keyboard hook
    pub enabled: bool,
    /// 1 (slowest) to 10 (fastest)
    pub trigger_speed: u8,
    /// Alternate location of the trigger database
    pub custom_database_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            trigger_speed: DEFAULT_TRIGGER_SPEED,
            custom_database_path: None,
        }
    }
}

impl Settings {
    /// Load settings from the default location, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&get_settings_file_path())
    }

    /// Load settings from `path`. Missing or unreadable files yield defaults.
    pub fn load_from(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return Self::default(),
        };

        if content.trim().is_empty() {
            return Self::default();
        }

        match serde_json::from_str::<Settings>(&content) {
            Ok(settings) => settings.normalized(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable settings file");
                Self::default()
            }
        }
    }

    /// Save settings to the default location
    pub fn save(&self) -> Result<()> {
        ensure_config_dir()?;
        self.save_to(&get_settings_file_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)?;
        Ok(())
    }

    /// Set the trigger speed, rejecting values outside 1..=10
    pub fn set_trigger_speed(&mut self, speed: u8) -> Result<()> {
        if !(MIN_TRIGGER_SPEED..=MAX_TRIGGER_SPEED).contains(&speed) {
            return Err(HotstringError::InvalidConfig(format!(
                "trigger speed must be between {} and {}, got {}",
                MIN_TRIGGER_SPEED, MAX_TRIGGER_SPEED, speed
            )));
        }
        self.trigger_speed = speed;
        Ok(())
    }

    /// Delay between synthesized keystrokes derived from the trigger speed
    pub fn key_delay(&self) -> Duration {
        let ms = 33i64 - i64::from(self.trigger_speed) * 3;
        Duration::from_millis(ms.max(3) as u64)
    }

    fn normalized(mut self) -> Self {
        self.trigger_speed = self
            .trigger_speed
            .clamp(MIN_TRIGGER_SPEED, MAX_TRIGGER_SPEED);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn key_delay_follows_speed() {
        let mut settings = Settings::default();
        assert_eq!(settings.key_delay(), Duration::from_millis(18));

        settings.set_trigger_speed(1).unwrap();
        assert_eq!(settings.key_delay(), Duration::from_millis(30));

        settings.set_trigger_speed(10).unwrap();
        assert_eq!(settings.key_delay(), Duration::from_millis(3));
    }

    #[test]
    fn rejects_out_of_range_speed() {
        let mut settings = Settings::default();
        assert!(settings.set_trigger_speed(0).is_err());
        assert!(settings.set_trigger_speed(11).is_err());
        assert_eq!(settings.trigger_speed, DEFAULT_TRIGGER_SPEED);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("nope.json"));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        fs::write(&path, r#"{ "enabled": false, "trigger_speed": 42 }"#).unwrap();

        let settings = Settings::load_from(&path);
        assert!(!settings.enabled);
        assert_eq!(settings.trigger_speed, MAX_TRIGGER_SPEED);
        assert_eq!(settings.custom_database_path, None);
    }

    #[test]
    fn save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILENAME);
        let settings = Settings {
            enabled: false,
            trigger_speed: 7,
            custom_database_path: Some(dir.path().join("mine.json")),
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), settings);
    }
}
