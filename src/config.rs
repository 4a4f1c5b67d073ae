//! Layered configuration for the inksync binary.
//!
//! Built-in defaults, then `$XDG_CONFIG_HOME/inksync/config.json`, then
//! command-line flags and their environment variables.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use inksync_core::Style;
use inksync_sync::{RelayConfig, SyncConfig, WsChannelConfig};
use serde::{Deserialize, Serialize};

/// Contents of the config file. Every field is optional; missing fields
/// keep their built-in default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub relay_url: Option<String>,
    pub bind_addr: Option<String>,
    pub echo: Option<bool>,
    pub broadcast_capacity: Option<usize>,
    /// 0 disables reconnecting
    pub reconnect_delay_ms: Option<u64>,
    pub move_interval_ms: Option<u64>,
    pub history_depth: Option<usize>,
    pub broadcast_history: Option<bool>,
    pub full_sync_on_reconnect: Option<bool>,
    pub color: Option<String>,
    pub line_width: Option<f64>,
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
}

impl FileConfig {
    /// Default config file location
    pub fn default_path() -> PathBuf {
        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".config")
            });
        config_dir.join("inksync").join("config.json")
    }

    /// Load `path`, or the default location. A missing file yields the
    /// defaults; an unreadable or invalid one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn sync_config(&self) -> SyncConfig {
        let defaults = SyncConfig::default();
        SyncConfig {
            move_interval: self
                .move_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.move_interval),
            history_depth: self.history_depth.unwrap_or(defaults.history_depth),
            broadcast_history: self.broadcast_history.unwrap_or(defaults.broadcast_history),
            full_sync_on_reconnect: self
                .full_sync_on_reconnect
                .unwrap_or(defaults.full_sync_on_reconnect),
        }
    }

    pub fn ws_config(&self, url: Option<String>) -> WsChannelConfig {
        let defaults = WsChannelConfig::default();
        let reconnect_delay = match self.reconnect_delay_ms {
            Some(0) => None,
            Some(ms) => Some(Duration::from_millis(ms)),
            None => defaults.reconnect_delay,
        };
        WsChannelConfig {
            url: url.or_else(|| self.relay_url.clone()).unwrap_or(defaults.url),
            reconnect_delay,
        }
    }

    pub fn relay_config(&self, bind_addr: Option<String>, echo: bool) -> RelayConfig {
        let defaults = RelayConfig::default();
        RelayConfig {
            bind_addr: bind_addr
                .or_else(|| self.bind_addr.clone())
                .unwrap_or(defaults.bind_addr),
            echo: echo || self.echo.unwrap_or(defaults.echo),
            capacity: self.broadcast_capacity.unwrap_or(defaults.capacity),
        }
    }

    pub fn style(&self) -> Style {
        let mut style = Style::default();
        if let Some(color) = &self.color {
            style.color = color.clone();
        }
        if let Some(line_width) = self.line_width {
            style.line_width = line_width;
        }
        if let Some(font_family) = &self.font_family {
            style.font_family = font_family.clone();
        }
        if let Some(font_size) = self.font_size {
            style.font_size = font_size;
        }
        style
    }
}
