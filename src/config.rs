use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::midi::TieBreak;

const CONFIG_FILE: &str = "config.toml";

/// Top-level configuration, read from config.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub playback: PlaybackConfig,
    pub presets: PresetConfig,
}

/// Serial link settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Device node the synth's serial port is bound to
    pub path: PathBuf,
}

/// Playback scheduler settings
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Send PANIC:1 after the all-notes-off sweep
    pub send_panic: bool,
    /// Ordering of commands that share a millisecond
    pub tie_break: TieBreak,
}

/// Preset storage settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PresetConfig {
    pub path: PathBuf,
}

/// Errors that can occur while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            path: PathBuf::from("/dev/rfcomm0"),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            send_panic: true,
            tie_break: TieBreak::SourceOrder,
        }
    }
}

impl Default for PresetConfig {
    fn default() -> Self {
        PresetConfig {
            path: PathBuf::from("presets.json"),
        }
    }
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Load configuration from a file, falling back to defaults if it doesn't exist
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_toml(&contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Config::default()),
            Err(e) => Err(ConfigError::Io(e)),
        }
    }
}

/// Load configuration from config.toml in the working directory
pub fn load_config() -> Result<Config, ConfigError> {
    Config::load_from(CONFIG_FILE)
}
