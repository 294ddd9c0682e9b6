//! Monitor configuration — defaults, optional YAML file, CLI overrides.
//!
//! Layering, lowest to highest precedence:
//!   built-in defaults
//!        ↓
//!   YAML file (`--config`, or `<config_dir>/newsroom-monitor/config.yaml`)
//!        ↓
//!   command-line flags

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::poller::PollerSettings;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const MAX_ACTIVITY_LIMIT: usize = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Which screen the poller feeds. Only changes the activity limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Dashboard,
    Monitor,
}

impl View {
    pub fn activity_limit(self) -> usize {
        match self {
            View::Dashboard => 5,
            View::Monitor => 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub base_url: String,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub view: View,
    /// Overrides the view's activity limit when set.
    pub activity_limit: Option<usize>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval_secs: 30,
            request_timeout_secs: 5,
            view: View::Dashboard,
            activity_limit: None,
        }
    }
}

/// Values given on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub view: Option<View>,
    pub activity_limit: Option<usize>,
}

impl MonitorConfig {
    /// Load from `path`, or from the default location if it exists, or fall
    /// back to defaults. An explicit path that cannot be read is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::from_file(&p),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("newsroom-monitor").join("config.yaml"))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply_overrides(&mut self, o: Overrides) {
        if let Some(url) = o.base_url {
            self.base_url = url;
        }
        if let Some(secs) = o.poll_interval_secs {
            self.poll_interval_secs = secs;
        }
        if let Some(secs) = o.request_timeout_secs {
            self.request_timeout_secs = secs;
        }
        if let Some(view) = o.view {
            self.view = view;
        }
        if o.activity_limit.is_some() {
            self.activity_limit = o.activity_limit;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "base_url must start with http:// or https://, got {:?}",
                self.base_url
            )));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid("poll_interval_secs must be > 0".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be > 0".into()));
        }
        // The file-transfer check makes two sequential requests, so a cycle
        // can take up to twice the timeout and must settle before the next tick.
        if self.request_timeout_secs.saturating_mul(2) >= self.poll_interval_secs {
            return Err(ConfigError::Invalid(format!(
                "request_timeout_secs ({}) must be less than half of poll_interval_secs ({})",
                self.request_timeout_secs, self.poll_interval_secs
            )));
        }
        let limit = self.activity_limit();
        if limit == 0 || limit > MAX_ACTIVITY_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "activity_limit must be between 1 and {}, got {}",
                MAX_ACTIVITY_LIMIT, limit
            )));
        }
        Ok(())
    }

    pub fn activity_limit(&self) -> usize {
        self.activity_limit.unwrap_or_else(|| self.view.activity_limit())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poller_settings(&self) -> PollerSettings {
        PollerSettings {
            interval: self.poll_interval(),
            activity_limit: self.activity_limit(),
        }
    }
}
