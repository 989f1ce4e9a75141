//! Configuration data structures

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Logging level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum LogLevel {
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "warn")]
    Warn,
    #[serde(rename = "info")]
    #[default]
    Info,
    #[serde(rename = "debug")]
    Debug,
    #[serde(rename = "trace")]
    Trace,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// WebSocket URL of the bot process channel
    pub channel_url: String,
    /// Delay between reconnect attempts to the bot channel
    pub reconnect_interval_ms: u64,
    /// Base URL of the workflow engine receiving trigger webhooks
    pub webhook_host: String,
    /// Route triggers to the test webhook and never deactivate on failure
    pub test_mode: bool,
    /// Logging verbosity level
    pub log_level: LogLevel,
    /// Deadline for the credentials handshake
    pub credentials_timeout_secs: u64,
    /// Deadline for dropdown list queries
    pub list_timeout_secs: u64,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            channel_url: "ws://127.0.0.1:5050".to_string(),
            reconnect_interval_ms: 1500,
            webhook_host: "http://localhost:5678".to_string(),
            test_mode: false,
            log_level: LogLevel::Info,
            credentials_timeout_secs: 15,
            list_timeout_secs: 5,
        }
    }
}

impl Configuration {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Configuration = toml::from_str(&content)?;
            Ok(config)
        } else {
            // Return default configuration if file doesn't exist
            Ok(Configuration::default())
        }
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the XDG config directory path
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("botlink").join("config.toml"))
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    pub fn credentials_timeout(&self) -> Duration {
        Duration::from_secs(self.credentials_timeout_secs)
    }

    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_secs)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !has_scheme(&self.channel_url, &["ws", "wss"]) {
            errors.push("channel_url must be a ws:// or wss:// URL".to_string());
        }

        if !has_scheme(&self.webhook_host, &["http", "https"]) {
            errors.push("webhook_host must be an http:// or https:// URL".to_string());
        }

        if !(100..=60_000).contains(&self.reconnect_interval_ms) {
            errors.push("reconnect_interval_ms must be between 100 and 60000".to_string());
        }

        if !(1..=300).contains(&self.credentials_timeout_secs) {
            errors.push("credentials_timeout_secs must be between 1 and 300".to_string());
        }

        if !(1..=300).contains(&self.list_timeout_secs) {
            errors.push("list_timeout_secs must be between 1 and 300".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn has_scheme(raw: &str, schemes: &[&str]) -> bool {
    Url::parse(raw.trim())
        .map(|url| schemes.contains(&url.scheme()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_configuration() {
        let config = Configuration::default();
        assert_eq!(config.reconnect_interval(), Duration::from_millis(1500));
        assert_eq!(config.credentials_timeout(), Duration::from_secs(15));
        assert_eq!(config.list_timeout(), Duration::from_secs(5));
        assert!(!config.test_mode);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_configuration_validation() {
        let config = Configuration {
            channel_url: "http://not-a-socket".to_string(),
            webhook_host: "localhost:5678".to_string(),
            reconnect_interval_ms: 10,
            credentials_timeout_secs: 0,
            ..Configuration::default()
        };

        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("channel_url")));
        assert!(errors.iter().any(|e| e.contains("webhook_host")));
        assert!(errors.iter().any(|e| e.contains("reconnect_interval_ms")));
        assert!(errors.iter().any(|e| e.contains("credentials_timeout_secs")));
        assert!(!errors.iter().any(|e| e.contains("list_timeout_secs")));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Configuration = toml::from_str("test_mode = true\n").unwrap();
        assert!(config.test_mode);
        assert_eq!(config.channel_url, "ws://127.0.0.1:5050");
    }

    #[test]
    fn test_config_file_operations() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let config = Configuration {
            webhook_host: "https://flows.example.com".to_string(),
            test_mode: true,
            ..Configuration::default()
        };

        config.save_to_file(&config_path).unwrap();
        assert!(config_path.exists());

        let loaded_config = Configuration::load_from_file(&config_path).unwrap();
        assert_eq!(loaded_config.webhook_host, "https://flows.example.com");
        assert!(loaded_config.test_mode);
    }

    #[test]
    fn test_missing_file_returns_default() {
        let temp_dir = tempdir().unwrap();
        let loaded = Configuration::load_from_file(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded.reconnect_interval_ms, 1500);
    }
}
