//! Application settings and configuration types.
//!
//! Settings are persisted to `~/.config/forgot-to-reply/settings.json` (or the
//! platform equivalent) and loaded at startup. A missing file means defaults;
//! command-line flags override individual values.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::{ScanOptions, ScanParams};

/// File name of the persisted settings.
pub const SETTINGS_FILE: &str = "settings.json";

/// Errors that can occur while loading or saving settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No home directory could be determined for the config location.
    #[error("could not determine a configuration directory for this user")]
    NoConfigDir,

    /// Reading or writing the settings file failed.
    #[error("settings file {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The settings file is not valid JSON for [`Settings`].
    #[error("invalid settings in {path}: {source}")]
    Parse {
        /// File involved.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Top-level application settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Thread listing and scoring thresholds.
    pub scan: ScanSettings,
    /// Console report and export output.
    pub report: ReportSettings,
    /// Directory searched for the OAuth client secrets file.
    /// Defaults to the configuration directory.
    pub credentials_dir: Option<PathBuf>,
}

/// Scan configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// How many days back to list inbox threads.
    pub days_back: u32,
    /// Maximum number of threads to list.
    pub max_results: u32,
    /// Minimum score for a thread to be reported.
    pub min_score: u8,
    /// Concurrent thread fetches.
    pub concurrency: usize,
    /// Overall scan time budget in seconds.
    pub timeout_secs: Option<u64>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            days_back: 60,
            max_results: 150,
            min_score: 20,
            concurrency: 1,
            timeout_secs: None,
        }
    }
}

impl ScanSettings {
    /// Converts these settings into scan parameters.
    pub fn to_params(&self) -> ScanParams {
        let mut options = ScanOptions::default()
            .min_score(self.min_score)
            .concurrency(self.concurrency);
        if let Some(secs) = self.timeout_secs {
            options = options.timeout(Duration::from_secs(secs));
        }
        ScanParams {
            days_back: self.days_back,
            max_results: self.max_results,
            options,
        }
    }
}

/// Report and export configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Entries shown in the console report.
    pub display_count: usize,
    /// Reasons shown per entry.
    pub reasons_shown: usize,
    /// Preview characters shown per entry.
    pub preview_chars: usize,
    /// Where the JSON export is written.
    pub output_path: PathBuf,
    /// Whether the JSON export is written at all.
    pub export: bool,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            display_count: 20,
            reasons_shown: 3,
            preview_chars: 100,
            output_path: PathBuf::from("forgotten_replies.json"),
            export: true,
        }
    }
}

impl Settings {
    /// Returns the platform configuration directory for this application.
    pub fn config_dir() -> Result<PathBuf> {
        ProjectDirs::from("io", "forgot-to-reply", "forgot-to-reply")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Returns the default settings file path.
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(SETTINGS_FILE))
    }

    /// Loads settings from `path`, returning defaults if the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Returns the directory searched for client secrets.
    pub fn credentials_dir(&self) -> Result<PathBuf> {
        match &self.credentials_dir {
            Some(dir) => Ok(dir.clone()),
            None => Self::config_dir(),
        }
    }
}
