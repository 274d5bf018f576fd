//! Client configuration and on-disk layout.
//!
//! All client state lives in `~/.remote/` (or `$REMOTE_HOME`):
//!
//! ```text
//! ~/.remote/
//!   session.json      # { authToken, serviceUrl }
//!   config.json       # optional overrides, see [`Config`]
//! ```

use crate::audio::queue::OverflowPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Device name offered on the connect form when nothing better is known.
pub const FALLBACK_DEVICE_NAME: &str = "My Mac";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Could not determine home directory")]
    Home,
}

/// Return the client storage root.
///
/// Uses `$REMOTE_HOME` if set, otherwise `~/.remote/`.
pub fn get_home() -> Result<PathBuf, ConfigError> {
    if let Ok(remote_home) = std::env::var("REMOTE_HOME") {
        return Ok(PathBuf::from(remote_home));
    }
    let home = dirs::home_dir().ok_or(ConfigError::Home)?;
    Ok(home.join(".remote"))
}

/// User-tunable settings loaded from `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default device name for the connect form.
    pub device_name: Option<String>,
    /// Per-request timeout for relay and connect calls.
    pub request_timeout_secs: u64,
    /// Maximum number of audio frames waiting to be sent while streaming.
    pub stream_queue_capacity: usize,
    /// What to do with new frames when the stream queue is full.
    pub stream_overflow: OverflowPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_name: None,
            request_timeout_secs: 10,
            stream_queue_capacity: 32,
            stream_overflow: OverflowPolicy::DropOldest,
        }
    }
}

impl Config {
    /// Load `config.json` from the storage root, then apply env overrides.
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = get_home()?.join("config.json");
        let mut config = Self::load_from(&path)?;
        config.apply_env();
        Ok(config)
    }

    /// Load a config file without env overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Apply `REMOTE_DEVICE_NAME` and `REMOTE_TIMEOUT_SECS` on top of the file values.
    pub fn apply_env(&mut self) {
        if let Ok(name) = std::env::var("REMOTE_DEVICE_NAME") {
            if !name.trim().is_empty() {
                self.device_name = Some(name);
            }
        }
        if let Ok(secs) = std::env::var("REMOTE_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(secs) if secs > 0 => self.request_timeout_secs = secs,
                _ => log::warn!("Ignoring invalid REMOTE_TIMEOUT_SECS={secs}"),
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// The name pre-filled on the connect form: configured name, else the
    /// host name, else [`FALLBACK_DEVICE_NAME`].
    pub fn default_device_name(&self) -> String {
        if let Some(name) = &self.device_name {
            return name.clone();
        }
        hostname().unwrap_or_else(|| FALLBACK_DEVICE_NAME.to_owned())
    }
}

fn hostname() -> Option<String> {
    let name = gethostname::gethostname().to_string_lossy().trim().to_owned();
    (!name.is_empty()).then_some(name)
}
