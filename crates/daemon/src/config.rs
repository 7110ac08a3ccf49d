// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration file
//!
//! A TOML file naming the data directory and the world to load:
//!
//! ```toml
//! data_dir = "/var/lib/twd"
//! snapshot_interval = "10m"
//!
//! [world]
//! zones = ["5b1d..."]
//!
//! [world.front_door]
//! zone = "5b1d..."
//! location = "9e04..."
//! ```
//!
//! Everything the daemon writes lives under `data_dir`. A relative
//! `data_dir` is resolved against the directory holding the config file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tw_core::WorldConfig;

const EVENTS_FILE: &str = "events.dat";
const SNAPSHOT_DIR: &str = "snapshots";
const INTENT_FILE: &str = "intent.log";
const LOCK_FILE: &str = "twd.lock";
const LOG_FILE: &str = "twd.log";

/// Name `twd init` gives the config file inside the data directory
pub const DEFAULT_CONFIG_FILE: &str = "twd.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to encode config: {0}")]
    Encode(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the event log, snapshots, intent log and lock
    pub data_dir: PathBuf,
    /// Daemon log file; `<data_dir>/twd.log` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
    /// Deflate event bodies in the event log
    #[serde(default = "default_compress_events")]
    pub compress_events: bool,
    /// Snapshot every zone this often while running
    #[serde(
        default,
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub snapshot_interval: Option<Duration>,
    pub world: WorldConfig,
}

fn default_compress_events() -> bool {
    true
}

impl Config {
    pub fn new(data_dir: impl Into<PathBuf>, world: WorldConfig) -> Self {
        Self {
            data_dir: data_dir.into(),
            log_path: None,
            compress_events: default_compress_events(),
            snapshot_interval: None,
            world,
        }
    }

    /// Read and parse a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(base) = path.parent() {
            config.data_dir = base.join(&config.data_dir);
            config.log_path = config.log_path.map(|log| base.join(log));
        }
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn events_path(&self) -> PathBuf {
        self.data_dir.join(EVENTS_FILE)
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_DIR)
    }

    pub fn intent_path(&self) -> PathBuf {
        self.data_dir.join(INTENT_FILE)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.data_dir.join(LOCK_FILE)
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(LOG_FILE))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
