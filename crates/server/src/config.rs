//! Bridge configuration management

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BridgeConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub device: DeviceSettings,
    #[serde(default)]
    pub sessions: SessionSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Address the HTTP/websocket server binds to
    #[serde(default = "ServerSettings::default_bind_addr")]
    pub bind_addr: String,
    /// Default log level when RUST_LOG is not set
    #[serde(default = "ServerSettings::default_log_level")]
    pub log_level: String,
    /// Directory of static control-UI assets; disabled when unset
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: Self::default_bind_addr(),
            log_level: Self::default_log_level(),
            static_dir: None,
        }
    }
}

impl ServerSettings {
    fn default_bind_addr() -> String {
        "0.0.0.0:8000".to_string()
    }

    fn default_log_level() -> String {
        "info".to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// Path of the sensor control SEQPACKET socket
    #[serde(default = "DeviceSettings::default_socket_path")]
    pub socket_path: PathBuf,
    /// How many times to poll for the socket before giving up
    #[serde(default = "DeviceSettings::default_connect_attempts")]
    pub connect_attempts: u32,
    /// Sleep between connect attempts, in milliseconds
    #[serde(default = "DeviceSettings::default_connect_retry_ms")]
    pub connect_retry_ms: u64,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            socket_path: Self::default_socket_path(),
            connect_attempts: Self::default_connect_attempts(),
            connect_retry_ms: Self::default_connect_retry_ms(),
        }
    }
}

impl DeviceSettings {
    fn default_socket_path() -> PathBuf {
        PathBuf::from("/tmp/sensor-control")
    }

    fn default_connect_attempts() -> u32 {
        60
    }

    fn default_connect_retry_ms() -> u64 {
        1000
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Outbound queue depth per websocket session; overflow evicts the session
    #[serde(default = "SessionSettings::default_queue_depth")]
    pub queue_depth: usize,
    /// Write deadline per outbound message, in seconds
    #[serde(default = "SessionSettings::default_write_timeout_secs")]
    pub write_timeout_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            queue_depth: Self::default_queue_depth(),
            write_timeout_secs: Self::default_write_timeout_secs(),
        }
    }
}

impl SessionSettings {
    fn default_queue_depth() -> usize {
        256
    }

    fn default_write_timeout_secs() -> u64 {
        10
    }
}

impl BridgeConfig {
    /// Load configuration from a file, or discover one in the default locations
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(path) = path {
            path
        } else {
            let mut candidates = vec![Self::default_path()];
            candidates.push(PathBuf::from("/etc/camera-bridge/bridge.toml"));

            candidates
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found, using defaults"))?
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: BridgeConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config.validate()?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("camera-bridge").join("bridge.toml")
        } else {
            PathBuf::from(".config/camera-bridge/bridge.toml")
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.server.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.server.log_level,
                valid_levels.join(", ")
            ));
        }

        self.server
            .bind_addr
            .parse::<std::net::SocketAddr>()
            .with_context(|| format!("Invalid bind address '{}'", self.server.bind_addr))?;

        if self.device.connect_attempts == 0 {
            return Err(anyhow!("device.connect_attempts must be at least 1"));
        }

        if self.sessions.queue_depth == 0 {
            return Err(anyhow!("sessions.queue_depth must be at least 1"));
        }

        if self.sessions.write_timeout_secs == 0 {
            return Err(anyhow!("sessions.write_timeout_secs must be at least 1"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = BridgeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.device.socket_path, PathBuf::from("/tmp/sensor-control"));
        assert_eq!(config.device.connect_attempts, 60);
        assert_eq!(config.sessions.queue_depth, 256);
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let mut config = BridgeConfig::default();
        config.server.log_level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_bind_addr_rejected() {
        let mut config = BridgeConfig::default();
        config.server.bind_addr = "not-an-addr".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_queue_depth_rejected() {
        let mut config = BridgeConfig::default();
        config.sessions.queue_depth = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.toml");

        let mut config = BridgeConfig::default();
        config.server.bind_addr = "127.0.0.1:9000".to_string();
        config.device.socket_path = PathBuf::from("/run/sensor-control");
        config.save(&path).unwrap();

        let loaded = BridgeConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.server.bind_addr, "127.0.0.1:9000");
        assert_eq!(loaded.device.socket_path, PathBuf::from("/run/sensor-control"));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: BridgeConfig = toml::from_str(
            r#"
            [server]
            bind_addr = "0.0.0.0:8080"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.sessions.queue_depth, 256);
    }
}
