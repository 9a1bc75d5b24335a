//! Configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use ergcast_broadcaster::ServerConfig;
use ergcast_device::DEFAULT_POLL_INTERVAL_MS;

/// Where broadcast events go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryBackend {
    /// WebSocket server, one channel subscriber per client
    Websocket,
    /// Newline-delimited JSON on stdout
    Stdout,
}

impl std::fmt::Display for DeliveryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryBackend::Websocket => write!(f, "websocket"),
            DeliveryBackend::Stdout => write!(f, "stdout"),
        }
    }
}

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Path to configuration file
    #[serde(skip)]
    pub config_path: PathBuf,

    /// WebSocket listen host
    pub host: String,

    /// WebSocket listen port
    pub port: u16,

    /// Sampler poll interval (milliseconds)
    pub poll_interval_ms: u64,

    /// Messages buffered per subscriber before it is dropped as lagging
    pub subscriber_queue_capacity: usize,

    /// Per-message WebSocket send deadline (milliseconds)
    pub send_timeout_ms: u64,

    pub delivery: DeliveryBackend,

    /// Write a CSV log of every finished workout
    pub export_csv: bool,

    /// Export directory (None = data dir / workouts)
    pub export_dir: Option<PathBuf>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            host: "127.0.0.1".to_string(),
            port: 8000,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            subscriber_queue_capacity: 1024,
            send_timeout_ms: 500,
            delivery: DeliveryBackend::Websocket,
            export_csv: false,
            export_dir: None,
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the platform config file, or create it
    pub fn load() -> Result<Self> {
        let config_path = ergcast_paths::get_config_path()
            .context("Failed to determine config path")?;
        Self::load_from(&config_path)
    }

    /// Load configuration from `path`, writing defaults there if missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;

            let mut config: DaemonConfig = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;

            config.config_path = path.to_path_buf();
            Ok(config)
        } else {
            let config = Self {
                config_path: path.to_path_buf(),
                ..Self::default()
            };
            config.save()
                .context("Failed to save default config")?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(&self.config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            queue_capacity: self.subscriber_queue_capacity,
            send_timeout: Duration::from_millis(self.send_timeout_ms),
        }
    }

    /// Resolved export directory, created if needed
    pub fn workouts_dir(&self) -> Result<PathBuf> {
        match &self.export_dir {
            Some(dir) => {
                ergcast_paths::ensure_dir(dir)?;
                Ok(dir.clone())
            }
            None => ergcast_paths::get_workouts_dir(),
        }
    }
}
