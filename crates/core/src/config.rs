// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Driver configuration (`loam.toml`).

use crate::vpath::VirtualPath;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

fn default_mudlib_path() -> PathBuf {
    PathBuf::from("mudlib")
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data")
}

fn default_master_object() -> VirtualPath {
    well_known("/secure/master")
}

fn default_void_object() -> VirtualPath {
    well_known("/std/void")
}

fn default_player_object() -> VirtualPath {
    well_known("/std/player")
}

// Constant paths; the unwrap-free construction keeps the lint policy intact.
fn well_known(path: &str) -> VirtualPath {
    match VirtualPath::new(path) {
        Ok(p) => p,
        Err(_) => unreachable!("well-known path is valid"),
    }
}

fn default_port() -> u16 {
    4000
}

fn default_heartbeat_interval_ms() -> u64 {
    2000
}

fn default_reset_interval_minutes() -> u64 {
    30
}

/// Disconnect-to-void grace window
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DisconnectConfig {
    /// Minutes a disconnected player lingers in the void before being
    /// saved and destroyed.
    pub timeout_minutes: u64,
    /// Millisecond override for the grace window; takes precedence over
    /// `timeout_minutes` when set.
    pub timeout_ms: Option<u64>,
}

impl Default for DisconnectConfig {
    fn default() -> Self {
        Self {
            timeout_minutes: 15,
            timeout_ms: None,
        }
    }
}

impl DisconnectConfig {
    /// Effective grace window in milliseconds.
    pub fn window_ms(&self) -> u64 {
        self.timeout_ms
            .unwrap_or(self.timeout_minutes * 60 * 1000)
    }
}

/// Session resume tokens
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Token lifetime. Clamped up to at least the disconnect grace
    /// window so a token stays valid for the whole LIMBO period.
    pub token_ttl_ms: u64,
    /// Require the resuming connection to present the same remote
    /// address the token was issued to. Disable behind NAT.
    pub validate_ip: bool,
    /// Signing secret. Generated at boot when empty.
    pub secret: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_ttl_ms: 30 * 60 * 1000,
            validate_ip: true,
            secret: String::new(),
        }
    }
}

/// Resume replay buffers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ReplayConfig {
    /// Outgoing lines retained per connection.
    pub buffer: usize,
    /// Lines replayed after a successful resume.
    pub cap: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            buffer: 200,
            cap: 20,
        }
    }
}

/// Logging
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Filter directive (`info`, `loam_engine=debug`, ...).
    pub level: String,
    /// Human-oriented multi-line output instead of compact.
    pub pretty: bool,
    /// Log file path; empty logs to stderr only.
    pub file: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            pretty: false,
            file: String::new(),
        }
    }
}

/// Complete driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MudConfig {
    /// Root of the mudlib source tree.
    pub mudlib_path: PathBuf,
    /// Root of the persistence tree (`/data/...` blobs).
    pub data_path: PathBuf,
    /// The master policy object.
    pub master_object: VirtualPath,
    /// Holding area for disconnected players.
    pub void_object: VirtualPath,
    /// Blueprint cloned for each authenticated player.
    pub player_object: VirtualPath,
    /// TCP listen port.
    pub port: u16,
    /// Heartbeat cadence.
    pub heartbeat_interval_ms: u64,
    /// Area reset cadence.
    pub reset_interval_minutes: u64,
    /// Watch the mudlib root for source changes.
    pub hot_reload: bool,
    /// Grant the first account ever registered administrator rights.
    /// Meant for standing up a fresh world; leave off once staffed.
    pub bootstrap_admin: bool,
    pub disconnect: DisconnectConfig,
    pub session: SessionConfig,
    pub replay: ReplayConfig,
    pub log: LogConfig,
}

impl Default for MudConfig {
    fn default() -> Self {
        Self {
            mudlib_path: default_mudlib_path(),
            data_path: default_data_path(),
            master_object: default_master_object(),
            void_object: default_void_object(),
            player_object: default_player_object(),
            port: default_port(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            reset_interval_minutes: default_reset_interval_minutes(),
            hot_reload: false,
            bootstrap_admin: false,
            disconnect: DisconnectConfig::default(),
            session: SessionConfig::default(),
            replay: ReplayConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl MudConfig {
    /// Load and normalize a config file. Returns the config together
    /// with human-readable warnings about adjusted values.
    pub fn load(path: &Path) -> Result<(Self, Vec<String>), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: MudConfig =
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let warnings = config.normalize();
        Ok((config, warnings))
    }

    /// Apply cross-field constraints. Returns warnings for values that
    /// had to be adjusted.
    pub fn normalize(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        // A resume token must outlive the disconnect grace window.
        let window = self.disconnect.window_ms();
        if self.session.token_ttl_ms < window {
            warnings.push(format!(
                "session.token_ttl_ms ({}) raised to the disconnect grace window ({})",
                self.session.token_ttl_ms, window
            ));
            self.session.token_ttl_ms = window;
        }

        if self.heartbeat_interval_ms == 0 {
            warnings.push("heartbeat_interval_ms must be positive; using 2000".to_string());
            self.heartbeat_interval_ms = default_heartbeat_interval_ms();
        }

        if self.replay.cap > self.replay.buffer {
            warnings.push(format!(
                "replay.cap ({}) capped to replay.buffer ({})",
                self.replay.cap, self.replay.buffer
            ));
            self.replay.cap = self.replay.buffer;
        }

        warnings
    }

    /// Typed settings lookup over dotted keys
    /// (`disconnect.timeout_minutes`, `session.validate_ip`).
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let tree = serde_json::to_value(self).ok()?;
        let mut node = &tree;
        for part in key.split('.') {
            node = node.get(part)?;
        }
        Some(node.clone())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
