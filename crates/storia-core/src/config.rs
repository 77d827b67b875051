//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the API base URL, request timeout, offline notice, worker cache names,
//! precache list and the last email used to log in.
//!
//! Configuration is stored at `~/.config/storia/config.json`. The
//! `STORIA_API_BASE_URL` and `STORIA_CACHE_DIR` environment variables
//! override the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::{DEFAULT_API_BASE_URL, DEFAULT_OFFLINE_NOTICE, DEFAULT_TIMEOUT_SECS};
use crate::worker::{
    WorkerConfig, DEFAULT_API_CACHE_NAME, DEFAULT_APP_SHELL_URL, DEFAULT_NOTIFICATION_ICON,
    DEFAULT_STATIC_CACHE_NAME,
};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "storia";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const ENV_API_BASE_URL: &str = "STORIA_API_BASE_URL";
pub const ENV_CACHE_DIR: &str = "STORIA_CACHE_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub offline_notice: String,
    pub static_cache_name: String,
    pub api_cache_name: String,
    pub precache_urls: Vec<String>,
    pub app_shell_url: String,
    pub notification_icon: String,
    pub last_email: Option<String>,
    /// Overrides the platform cache directory
    pub cache_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            offline_notice: DEFAULT_OFFLINE_NOTICE.to_string(),
            static_cache_name: DEFAULT_STATIC_CACHE_NAME.to_string(),
            api_cache_name: DEFAULT_API_CACHE_NAME.to_string(),
            precache_urls: Vec::new(),
            app_shell_url: DEFAULT_APP_SHELL_URL.to_string(),
            notification_icon: DEFAULT_NOTIFICATION_ICON.to_string(),
            last_email: None,
            cache_dir: None,
        }
    }
}

impl Config {
    /// Load from the default location, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Persist the last used email without writing environment overrides
    /// into the config file
    pub fn remember_email(&mut self, email: &str) -> Result<()> {
        self.last_email = Some(email.to_string());
        let path = Self::config_path()?;
        let mut stored = Self::load_from(&path)?;
        stored.last_email = self.last_email.clone();
        stored.save_to(&path)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var(ENV_API_BASE_URL).ok(),
            std::env::var(ENV_CACHE_DIR).ok(),
        );
    }

    fn apply_overrides(&mut self, api_base_url: Option<String>, cache_dir: Option<String>) {
        if let Some(url) = api_base_url.filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(dir) = cache_dir.filter(|d| !d.trim().is_empty()) {
            self.cache_dir = Some(PathBuf::from(dir));
        }
    }

    /// Directory holding `config.json` and `session.json`
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME))
    }

    fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            api_base_url: self.api_base_url.clone(),
            static_cache_name: self.static_cache_name.clone(),
            api_cache_name: self.api_cache_name.clone(),
            precache_urls: self.precache_urls.clone(),
            app_shell_url: self.app_shell_url.clone(),
            offline_notice: self.offline_notice.clone(),
            notification_icon: self.notification_icon.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.api_base_url, "https://story-api.dicoding.dev/v1");
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.static_cache_name, "story-app-cache-v2");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{"request_timeout_secs": 5, "last_email": "d@example.test"}"#)
            .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.last_email.as_deref(), Some("d@example.test"));
        assert_eq!(config.offline_notice, DEFAULT_OFFLINE_NOTICE);
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let config = Config {
            precache_urls: vec!["https://app.example.test/index.html".to_string()],
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        config.apply_overrides(
            Some("http://localhost:8080/v1/".to_string()),
            Some("/tmp/storia-cache".to_string()),
        );
        assert_eq!(config.api_base_url, "http://localhost:8080/v1");
        assert_eq!(config.cache_dir().unwrap(), PathBuf::from("/tmp/storia-cache"));

        // Blank values are ignored
        config.apply_overrides(Some("  ".to_string()), None);
        assert_eq!(config.api_base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_worker_config_follows_config() {
        let config = Config {
            api_base_url: "http://localhost:8080/v1".to_string(),
            static_cache_name: "story-app-cache-v3".to_string(),
            ..Config::default()
        };
        let worker = config.worker_config();
        assert_eq!(worker.api_base_url, "http://localhost:8080/v1");
        assert_eq!(worker.static_cache_name, "story-app-cache-v3");
        assert_eq!(worker.api_cache_name, DEFAULT_API_CACHE_NAME);
    }
}
