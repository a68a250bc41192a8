//! Configuration file management.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use swapsync_orchestrator::CoalesceConfig;
use swapsync_types::settings::Settings;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "SWAPSYNC_DATA_DIR";

/// Complete client configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Where the swap daemon listens.
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// Coalescing and buffering.
    #[serde(default)]
    pub sync: SyncConfig,
    /// User settings applied at startup.
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Daemon connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// JSON-RPC socket of the daemon. Empty = `$data_dir/daemon.sock`.
    #[serde(default)]
    pub rpc_socket: String,
    /// Event feed socket of the daemon. Empty = `$data_dir/events.sock`.
    #[serde(default)]
    pub event_socket: String,
    /// Socket this client serves the view on. Empty = `$data_dir/client.sock`.
    #[serde(default)]
    pub view_socket: String,
    /// Upper bound on a single daemon request.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Pause before reconnecting to a dropped event feed.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,
}

/// Synchronization settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Minimum spacing between refreshes of one swap.
    #[serde(default = "default_throttle")]
    pub throttle_ms: u64,
    /// Quiet period before a trailing refresh.
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,
    /// Log entries kept before eviction starts.
    #[serde(default = "default_log_high_water_mark")]
    pub log_high_water_mark: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions

fn default_request_timeout() -> u64 {
    30
}

fn default_reconnect_delay() -> u64 {
    1_000
}

fn default_throttle() -> u64 {
    2_000
}

fn default_debounce() -> u64 {
    500
}

fn default_log_high_water_mark() -> usize {
    swapsync_logs::DEFAULT_HIGH_WATER_MARK
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            rpc_socket: String::new(),
            event_socket: String::new(),
            view_socket: String::new(),
            request_timeout_secs: default_request_timeout(),
            reconnect_delay_ms: default_reconnect_delay(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            throttle_ms: default_throttle(),
            debounce_ms: default_debounce(),
            log_high_water_mark: default_log_high_water_mark(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if the file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Self = toml::from_str(&content)?;
            config.settings.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            return PathBuf::from(dir);
        }
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".swapsync"))
            .unwrap_or_else(|_| PathBuf::from("/tmp/swapsync"))
    }

    pub fn rpc_socket(&self) -> PathBuf {
        self.socket_or(&self.daemon.rpc_socket, "daemon.sock")
    }

    pub fn event_socket(&self) -> PathBuf {
        self.socket_or(&self.daemon.event_socket, "events.sock")
    }

    pub fn view_socket(&self) -> PathBuf {
        self.socket_or(&self.daemon.view_socket, "client.sock")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.daemon.request_timeout_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.daemon.reconnect_delay_ms)
    }

    pub fn coalesce(&self) -> CoalesceConfig {
        CoalesceConfig {
            throttle: Duration::from_millis(self.sync.throttle_ms),
            debounce: Duration::from_millis(self.sync.debounce_ms),
        }
    }

    /// Default filter directive for the tracing subscriber.
    pub fn log_directive(&self) -> String {
        format!("swapsync={}", self.logging.level)
    }

    fn socket_or(&self, configured: &str, file_name: &str) -> PathBuf {
        if configured.is_empty() {
            self.data_dir().join(file_name)
        } else {
            PathBuf::from(configured)
        }
    }

    fn config_path() -> PathBuf {
        Self::default().data_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.sync.throttle_ms, 2_000);
        assert_eq!(config.sync.debounce_ms, 500);
        assert_eq!(config.sync.log_high_water_mark, 5_000);
        assert_eq!(config.daemon.request_timeout_secs, 30);
        assert_eq!(config.log_directive(), "swapsync=info");
        assert!(!config.settings.fetch_fiat_prices);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
            [daemon]
            rpc_socket = "/run/swap/daemon.sock"

            [sync]
            debounce_ms = 250

            [settings]
            fetch_fiat_prices = true
            fiat_currency = "EUR"
            "#,
        )
        .expect("parse");
        assert_eq!(config.rpc_socket(), PathBuf::from("/run/swap/daemon.sock"));
        assert_eq!(config.sync.throttle_ms, 2_000);
        assert_eq!(
            config.coalesce(),
            CoalesceConfig {
                throttle: Duration::from_secs(2),
                debounce: Duration::from_millis(250),
            }
        );
        assert_eq!(config.settings.fiat_currency, "EUR");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_serialization() {
        let config = ClientConfig::default();
        let toml_str = toml::to_string(&config).expect("serialize");
        let parsed: ClientConfig = toml::from_str(&toml_str).expect("parse");
        assert_eq!(parsed, config);
    }
}
