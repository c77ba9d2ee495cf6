//! Settings file for surround-play
//!
//! The file holds an [`AudioConfig`](surround_core::audio::AudioConfig) as
//! YAML. A missing or unreadable file is not an error: the player falls back
//! to defaults and writes the file back only when asked to.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Config file name inside the config directory
const CONFIG_FILENAME: &str = "config.yaml";

/// Default settings file
///
/// Returns: `~/.config/surround/config.yaml` (platform config dir)
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("surround")
        .join(CONFIG_FILENAME)
}

/// Load configuration from a YAML file
///
/// If the file doesn't exist, returns default config.
/// If the file exists but is invalid, logs a warning and returns default config.
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    log::info!("load_config: Loading from {:?}", path);

    if !path.exists() {
        log::info!("load_config: Config file doesn't exist, using defaults");
        return T::default();
    }

    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            log::warn!("load_config: Failed to read config file: {}, using defaults", e);
            return T::default();
        }
    };

    match serde_yaml::from_str::<T>(&contents) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("load_config: Failed to parse config: {}, using defaults", e);
            T::default()
        }
    }
}

/// Save configuration to a YAML file, creating parent directories
pub fn save_config<T>(config: &T, path: &Path) -> Result<()>
where
    T: Serialize,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;
    std::fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    log::info!("save_config: Saved to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use surround_core::audio::AudioConfig;
    use surround_core::SpeakerLayout;

    #[test]
    fn test_default_path_ends_with_filename() {
        let path = default_config_path();
        assert!(path.ends_with("surround/config.yaml"));
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let config: AudioConfig = load_config(Path::new("/nonexistent/path/config.yaml"));
        assert_eq!(config, AudioConfig::default());
    }

    #[test]
    fn test_invalid_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "sample_rate: [not a number").unwrap();

        let config: AudioConfig = load_config(&path);
        assert_eq!(config, AudioConfig::default());
    }

    #[test]
    fn test_roundtrip_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let mut config = AudioConfig::default()
            .with_sample_rate(48000)
            .with_layout(SpeakerLayout::Surround51)
            .with_buffer_frames(256)
            .with_device("Speakers");
        config.settings.reverb_decay = 0.4;

        save_config(&config, &path).unwrap();
        let loaded: AudioConfig = load_config(&path);
        assert_eq!(loaded, config);
    }
}
