//! Configuration parsing and management.

use crate::markup::MarkupKind;
use crate::models::{default_lock_timeout, DEFAULT_LOCK_TIMEOUT_MINUTES};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

/// Main configuration struct matching the wikiweb.yml schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_home_page")]
    pub home_page: String,

    /// Author name used when an edit names nobody
    #[serde(default = "default_author")]
    pub default_author: String,

    /// System password accepted while none has been set
    #[serde(default = "default_password")]
    pub default_password: String,

    #[serde(default)]
    pub default_markup: MarkupKind,

    #[serde(default = "default_lock_timeout_minutes")]
    pub lock_timeout_minutes: i64,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub search: SearchConfig,

    // Internal: path to config file (for relative path resolution)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

fn default_home_page() -> String {
    String::from("HomePage")
}

fn default_author() -> String {
    String::from("AnonymousCoward")
}

fn default_password() -> String {
    String::from("wikiweb")
}

fn default_lock_timeout_minutes() -> i64 {
    DEFAULT_LOCK_TIMEOUT_MINUTES
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the stored webs; no persistence when absent
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_max_query_len")]
    pub max_query_len: usize,

    #[serde(default = "default_snippet_len")]
    pub snippet_len: usize,
}

fn default_max_query_len() -> usize {
    1000
}

fn default_snippet_len() -> usize {
    160
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_query_len: default_max_query_len(),
            snippet_len: default_snippet_len(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&contents)?;

        // Store config file path for relative path resolution
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Storage directory, resolved relative to config file
    pub fn storage_dir(&self) -> Option<PathBuf> {
        self.storage.path.as_ref().map(|p| self.resolve_path(p))
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::try_minutes(self.lock_timeout_minutes.max(0)).unwrap_or_else(default_lock_timeout)
    }

    /// Resolve a path relative to the config file location
    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else if let Some(config_path) = &self.config_path {
            if let Some(parent) = config_path.parent() {
                parent.join(path)
            } else {
                path.to_path_buf()
            }
        } else {
            path.to_path_buf()
        }
    }

    /// Get a nested config value using dotted path (e.g., "search.snippet_len")
    pub fn get(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();
        match parts.as_slice() {
            ["home_page"] => Some(self.home_page.clone()),
            ["default_author"] => Some(self.default_author.clone()),
            ["default_markup"] => Some(self.default_markup.as_str().to_string()),
            ["lock_timeout_minutes"] => Some(self.lock_timeout_minutes.to_string()),
            ["storage", "path"] => self.storage_dir().map(|p| p.display().to_string()),
            ["search", "max_query_len"] => Some(self.search.max_query_len.to_string()),
            ["search", "snippet_len"] => Some(self.search.snippet_len.to_string()),
            _ => None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            home_page: default_home_page(),
            default_author: default_author(),
            default_password: default_password(),
            default_markup: MarkupKind::default(),
            lock_timeout_minutes: default_lock_timeout_minutes(),
            storage: StorageConfig::default(),
            search: SearchConfig::default(),
            config_path: None,
        }
    }
}
