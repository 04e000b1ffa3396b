//! Settings loading
//!
//! Settings are read from a TOML file in the platform configuration
//! directory. The `DRDL_CONFIG` environment variable (or an explicit path)
//! points somewhere else. A missing file yields the defaults.

use chrono::Duration;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming an alternative settings file
pub const CONFIG_ENV_VAR: &str = "DRDL_CONFIG";

/// Errors that can occur while loading settings
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to determine the configuration directory location
    #[error("Failed to determine configuration directory location")]
    ConfigDirectoryNotFound,

    /// Failed to read the settings file
    #[error("Failed to read settings file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse the settings file
    #[error("Failed to parse settings file {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A setting is outside its valid range
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Base URLs of the DR endpoints
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiEndpoints {
    /// Program cards, keyed by slug
    pub program_card_url: String,
    /// Legacy program cards, keyed by URN
    pub legacy_program_card_url: String,
    /// Series bundles, keyed by series URN
    pub bundle_url: String,
    /// Seasons list view, queried with `id=<series urn>`
    pub seasons_url: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            program_card_url: "https://www.dr.dk/mu-online/api/1.4/programcard/".to_string(),
            legacy_program_card_url: "https://www.dr.dk/mu/programcard/".to_string(),
            bundle_url: "https://www.dr.dk/mu/bundle/".to_string(),
            seasons_url: "https://www.dr.dk/mu-online/api/1.4/list/view/seasons".to_string(),
        }
    }
}

/// Runtime settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Default output directory (current directory when unset)
    pub output_dir: Option<PathBuf>,
    /// Default subscription re-check interval in hours
    pub rate_hours: u32,
    /// External downloader executable
    pub downloader: String,
    /// Download archive, relative to the working directory
    pub archive_file: PathBuf,
    /// Log file scheduled runs append to (platform data directory when unset)
    pub log_file: Option<PathBuf>,
    /// Minutes to wait after an announced release before re-checking
    pub upcoming_delay_minutes: i64,
    pub api: ApiEndpoints,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: None,
            rate_hours: 2,
            downloader: "yt-dlp".to_string(),
            archive_file: PathBuf::from("youtube-dl-archive.txt"),
            log_file: None,
            upcoming_delay_minutes: 15,
            api: ApiEndpoints::default(),
        }
    }
}

impl Settings {
    /// Loads settings from an explicit path, `DRDL_CONFIG`, or the default
    /// location, in that order.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match env::var_os(CONFIG_ENV_VAR) {
                Some(path) => PathBuf::from(path),
                None => default_config_path()?,
            },
        };

        Self::load_from(&path)
    }

    /// Loads settings from a file, falling back to defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Resolves the log file path, using the platform data directory by default.
    pub fn resolved_log_file(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.log_file {
            return Ok(expand_home(path));
        }

        let proj_dirs = project_dirs()?;
        Ok(proj_dirs.data_local_dir().join("drdl.log"))
    }

    /// Delay between an announced release and its re-check
    pub fn upcoming_delay(&self) -> Result<Duration, ConfigError> {
        Duration::try_minutes(self.upcoming_delay_minutes)
            .filter(|delay| *delay >= Duration::zero())
            .ok_or_else(|| ConfigError::InvalidValue {
                key: "upcoming_delay_minutes",
                value: self.upcoming_delay_minutes.to_string(),
            })
    }
}

fn project_dirs() -> Result<directories::ProjectDirs, ConfigError> {
    directories::ProjectDirs::from("dk", "drdl", "drdl").ok_or(ConfigError::ConfigDirectoryNotFound)
}

/// Returns the default settings file location
///
/// - Linux: ~/.config/drdl/config.toml
/// - macOS: ~/Library/Application Support/dk.drdl.drdl/config.toml
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    Ok(project_dirs()?.config_dir().join("config.toml"))
}

/// Expands a leading `~` to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };

    match directories::BaseDirs::new() {
        Some(dirs) => dirs.home_dir().join(rest),
        None => path.to_path_buf(),
    }
}
