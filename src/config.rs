//! Persisted user configuration (contact email and search API key).
//!
//! Stored as JSON at `~/.openalex-tool/config.json`.

use crate::error::{OpenAlexError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable consulted for the web search API key
pub const TAVILY_KEY_ENV: &str = "TAVILY_API_KEY";

/// Default config file path: `~/.openalex-tool/config.json`
fn default_config_path() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(".openalex-tool").join("config.json"))
        .ok_or_else(|| OpenAlexError::Config("Cannot determine home directory".to_string()))
}

/// On-disk configuration values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tavily_api_key: Option<String>,
}

/// Loads and saves [`Config`]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with default path
    pub fn new() -> Result<Self> {
        Ok(Self {
            path: default_config_path()?,
        })
    }

    /// Create a new ConfigManager with custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load configuration
    ///
    /// Returns defaults if the file doesn't exist or is invalid
    pub fn load(&self) -> Config {
        if !self.path.exists() {
            debug!("Config file not found: {:?}", self.path);
            return Config::default();
        }

        match std::fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Failed to parse config: {}", e);
                Config::default()
            }),
            Err(e) => {
                warn!("Failed to read config file: {}", e);
                Config::default()
            }
        }
    }

    /// Save configuration, creating the directory if needed
    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(config)?)?;
        debug!("Saved config to {:?}", self.path);
        Ok(())
    }

    pub fn email(&self) -> Option<String> {
        self.load().email.filter(|e| !e.is_empty())
    }

    pub fn set_email(&self, email: &str) -> Result<()> {
        let mut config = self.load();
        config.email = Some(email.to_string());
        self.save(&config)
    }

    pub fn tavily_api_key(&self) -> Option<String> {
        self.load().tavily_api_key.filter(|k| !k.is_empty())
    }

    pub fn set_tavily_api_key(&self, key: &str) -> Result<()> {
        let mut config = self.load();
        config.tavily_api_key = Some(key.to_string());
        self.save(&config)
    }

    /// Search API key from, in order: the CLI flag, `TAVILY_API_KEY`, the config file
    pub fn resolve_tavily_api_key(&self, cli_key: Option<&str>) -> Option<String> {
        if let Some(key) = cli_key.filter(|k| !k.is_empty()) {
            return Some(key.to_string());
        }
        if let Some(key) = std::env::var(TAVILY_KEY_ENV).ok().filter(|k| !k.is_empty()) {
            return Some(key);
        }
        self.tavily_api_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing() {
        let manager = ConfigManager::with_path(PathBuf::from("/nonexistent/path/config.json"));
        assert_eq!(manager.load(), Config::default());
        assert!(manager.email().is_none());
    }

    #[test]
    fn test_set_and_get() -> Result<()> {
        let dir = TempDir::new()?;
        let manager = ConfigManager::with_path(dir.path().join("nested").join("config.json"));

        manager.set_email("me@example.com")?;
        manager.set_tavily_api_key("tvly-123")?;

        assert_eq!(manager.email().as_deref(), Some("me@example.com"));
        assert_eq!(manager.tavily_api_key().as_deref(), Some("tvly-123"));
        Ok(())
    }

    #[test]
    fn test_invalid_json_yields_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json")?;
        assert_eq!(ConfigManager::with_path(path).load(), Config::default());
        Ok(())
    }

    #[test]
    fn test_cli_key_wins() {
        let manager = ConfigManager::with_path(PathBuf::from("/nonexistent/config.json"));
        assert_eq!(manager.resolve_tavily_api_key(Some("cli")).as_deref(), Some("cli"));
    }
}
