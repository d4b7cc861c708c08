//! Player settings and where they live on disk.
//!
//! Settings are plain JSON (`mediaframe.json`). Every field has a default, so
//! a missing file or a partial file both load cleanly.

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings file name inside the config directory
pub const SETTINGS_FILE: &str = "mediaframe.json";

/// Environment variable overriding the config directory
pub const CONFIG_DIR_ENV: &str = "MEDIAFRAME_CONFIG_DIR";

/// Tunables for the controls overlay and session start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    pub auto_hide_enabled: bool,
    pub auto_hide_delay_ms: u64, // Idle time before controls hide during playback (default 3000ms)
    pub animation_ms: u64,       // Show/hide fade duration (default 200ms)
    pub autoplay: bool,          // Start playback as soon as content (or pre-roll) allows
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            auto_hide_enabled: true,
            auto_hide_delay_ms: 3000,
            animation_ms: 200,
            autoplay: true,
        }
    }
}

impl PlayerSettings {
    pub fn auto_hide_delay(&self) -> Duration {
        Duration::from_millis(self.auto_hide_delay_ms)
    }

    pub fn animation_duration(&self) -> Duration {
        Duration::from_millis(self.animation_ms)
    }

    /// Load from a JSON file. A missing file yields defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;
        let settings = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse settings: {}", path.display()))?;
        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Write as pretty JSON, creating parent directories as needed.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create settings directory: {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, raw)
            .with_context(|| format!("Failed to write settings: {}", path.display()))?;
        Ok(())
    }

    /// Load from the resolved config directory.
    pub fn load(config: &PathConfig) -> Result<Self> {
        Self::load_from_path(&config_file(SETTINGS_FILE, config))
    }

    pub fn save(&self, config: &PathConfig) -> Result<()> {
        self.save_to_path(&config_file(SETTINGS_FILE, config))
    }
}

/// Configuration for overriding default application paths
#[derive(Debug, Clone, Default)]
pub struct PathConfig {
    /// Custom config directory (from CLI or ENV)
    pub config_dir: Option<PathBuf>,
}

impl PathConfig {
    /// Create PathConfig from CLI arguments and environment variables
    ///
    /// Priority: CLI args → ENV var (MEDIAFRAME_CONFIG_DIR) → None (use defaults)
    pub fn from_env_and_cli(cli_dir: Option<PathBuf>) -> Self {
        let config_dir = cli_dir.or_else(|| std::env::var(CONFIG_DIR_ENV).ok().map(PathBuf::from));

        Self { config_dir }
    }
}

/// Get path to a configuration file
///
/// Priority:
/// 1. CLI --config-dir argument
/// 2. MEDIAFRAME_CONFIG_DIR environment variable
/// 3. Local folder IF any config files exist (mediaframe.json, mediaframe.log)
/// 4. Platform-specific config directory from dirs-next (default)
pub fn config_file(name: &str, config: &PathConfig) -> PathBuf {
    get_config_dir(config).join(name)
}

/// Get path to a data file (logs)
///
/// Same priority as `config_file`, falling back to the platform data directory.
pub fn data_file(name: &str, config: &PathConfig) -> PathBuf {
    get_data_dir(config).join(name)
}

/// Ensure that configuration and data directories exist
pub fn ensure_dirs(config: &PathConfig) -> Result<()> {
    let config_dir = get_config_dir(config);
    let data_dir = get_data_dir(config);

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;
    }

    // Only create data_dir if it's different from config_dir
    if data_dir != config_dir && !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
    }

    Ok(())
}

/// Check if any config files exist in the given directory
fn has_local_config_files(dir: &Path) -> bool {
    let files = [SETTINGS_FILE, "mediaframe.log"];
    files.iter().any(|f| dir.join(f).exists())
}

fn local_dir_with_config() -> Option<PathBuf> {
    std::env::current_dir().ok().filter(|dir| has_local_config_files(dir))
}

/// Get the configuration directory
fn get_config_dir(config: &PathConfig) -> PathBuf {
    if let Some(dir) = &config.config_dir {
        return dir.clone();
    }
    if let Some(dir) = local_dir_with_config() {
        return dir;
    }
    if let Some(dir) = dirs_next::config_dir() {
        return dir.join("mediaframe");
    }
    PathBuf::from(".")
}

/// Get the data directory
fn get_data_dir(config: &PathConfig) -> PathBuf {
    if let Some(dir) = &config.config_dir {
        return dir.clone();
    }
    if let Some(dir) = local_dir_with_config() {
        return dir;
    }
    if let Some(dir) = dirs_next::data_dir() {
        return dir.join("mediaframe");
    }
    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("mediaframe_test_{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_config_file_with_custom_dir() {
        let config = PathConfig {
            config_dir: Some(PathBuf::from("/custom")),
        };

        assert_eq!(config_file("test.json", &config), PathBuf::from("/custom/test.json"));
        assert_eq!(data_file("mediaframe.log", &config), PathBuf::from("/custom/mediaframe.log"));
    }

    #[test]
    fn test_cli_dir_wins_over_env() {
        let config = PathConfig::from_env_and_cli(Some(PathBuf::from("/from-cli")));
        assert_eq!(config.config_dir, Some(PathBuf::from("/from-cli")));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = temp_dir();
        let settings = PlayerSettings::load_from_path(&dir.join(SETTINGS_FILE)).unwrap();
        assert_eq!(settings, PlayerSettings::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = temp_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(SETTINGS_FILE);
        std::fs::write(&path, r#"{ "auto_hide_delay_ms": 5000 }"#).unwrap();

        let settings = PlayerSettings::load_from_path(&path).unwrap();
        assert_eq!(settings.auto_hide_delay(), Duration::from_secs(5));
        assert!(settings.auto_hide_enabled);
        assert!(settings.autoplay);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_save_then_load() {
        let dir = temp_dir();
        let config = PathConfig {
            config_dir: Some(dir.clone()),
        };
        let settings = PlayerSettings {
            auto_hide_enabled: false,
            autoplay: false,
            ..PlayerSettings::default()
        };

        settings.save(&config).unwrap();
        assert_eq!(PlayerSettings::load(&config).unwrap(), settings);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = temp_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(SETTINGS_FILE);
        std::fs::write(&path, "{ not json").unwrap();

        let err = PlayerSettings::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse settings"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_ensure_dirs_creates_custom_dir() {
        let dir = temp_dir();
        let config = PathConfig {
            config_dir: Some(dir.clone()),
        };
        ensure_dirs(&config).unwrap();
        assert!(dir.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
