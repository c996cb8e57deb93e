//! Configuration for the tonearm daemon
//!
//! A minimal TOML bootstrap file: paths and port only. Everything that can
//! change at runtime (queue, volume, repeat, ...) lives in the session
//! snapshot, not here.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Bootstrap configuration loaded from a TOML file
///
/// These settings cannot change during runtime; the daemon must restart to
/// pick up changes.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Folder containing the audio files to index
    pub music_folder: PathBuf,

    /// Folder holding one JSON file per playlist
    #[serde(default = "default_playlist_folder")]
    pub playlist_folder: PathBuf,

    /// Path to the SQLite song library
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Path of the session snapshot written at shutdown
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_port() -> u16 {
    5750
}

fn default_playlist_folder() -> PathBuf {
    PathBuf::from("playlists")
}

fn default_database_path() -> PathBuf {
    PathBuf::from("music.db")
}

fn default_state_path() -> PathBuf {
    PathBuf::from("session.json")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }
}
