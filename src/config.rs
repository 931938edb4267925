//! Configuration for the market-data client
//!
//! Values are layered from lowest to highest precedence: built-in defaults,
//! an optional JSON file in the platform config directory, environment
//! variables, then command-line flags. The API key has no built-in default.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

use crate::batch::DEFAULT_STAGGER;
use crate::cache::DEFAULT_FRESHNESS;
use crate::data::DEFAULT_BASE_URL;

/// Environment variable holding the provider API key
pub const API_KEY_ENV: &str = "ALPHA_VANTAGE_API_KEY";

/// Environment variable overriding the provider base URL
pub const BASE_URL_ENV: &str = "ALPHA_VANTAGE_BASE_URL";

/// Errors that can occur while resolving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No API key in any source
    #[error("No API key configured. Set ALPHA_VANTAGE_API_KEY, pass --api-key, or add \"api_key\" to the config file")]
    MissingApiKey,

    /// Config file exists but could not be read
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON for [`ConfigFile`]
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Base URL is not an absolute URL
    #[error("Invalid base URL '{0}'")]
    InvalidBaseUrl(String),
}

/// Resolved configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Provider API key
    pub api_key: String,
    /// Provider query endpoint
    pub base_url: String,
    /// Freshness window for both caches
    pub cache_ttl: Duration,
    /// Delay between successive starts in a batch fetch
    pub stagger: Duration,
    /// Per-request timeout; `None` waits indefinitely
    pub request_timeout: Option<Duration>,
    /// Shared token-bucket budget for outbound calls; `None` disables it
    pub requests_per_minute: Option<u32>,
}

impl Config {
    /// Configuration with defaults for everything except the key
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_ttl: DEFAULT_FRESHNESS,
            stagger: DEFAULT_STAGGER,
            request_timeout: None,
            requests_per_minute: None,
        }
    }

    /// Loads configuration from the default file location, the process
    /// environment and the given overrides
    pub fn load(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let file = match ConfigFile::default_path() {
            Some(path) => ConfigFile::load(&path)?,
            None => None,
        };
        Self::resolve(file, EnvConfig::from_env(), overrides)
    }

    /// Merges the individual sources; later sources win
    pub fn resolve(
        file: Option<ConfigFile>,
        env: EnvConfig,
        overrides: ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let file = file.unwrap_or_default();

        let api_key = overrides
            .api_key
            .or(env.api_key)
            .or(file.api_key)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let base_url = overrides
            .base_url
            .or(env.base_url)
            .or(file.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if Url::parse(&base_url).is_err() {
            return Err(ConfigError::InvalidBaseUrl(base_url));
        }

        let stagger = overrides
            .stagger_ms
            .or(file.stagger_ms)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_STAGGER);

        Ok(Self {
            api_key,
            base_url,
            cache_ttl: file
                .cache_ttl_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_FRESHNESS),
            stagger,
            request_timeout: file.request_timeout_secs.map(Duration::from_secs),
            requests_per_minute: file.requests_per_minute,
        })
    }
}

/// On-disk configuration, every field optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub cache_ttl_secs: Option<u64>,
    pub stagger_ms: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub requests_per_minute: Option<u32>,
}

impl ConfigFile {
    /// Path of the config file in the platform config directory
    ///
    /// Uses `~/.config/stockdash/config.json` on Linux.
    pub fn default_path() -> Option<PathBuf> {
        let project_dirs = ProjectDirs::from("", "", "stockdash")?;
        Some(project_dirs.config_dir().join("config.json"))
    }

    /// Reads the file at `path`; a missing file is not an error
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }
}

/// Values taken from environment variables
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var(API_KEY_ENV).ok(),
            base_url: std::env::var(BASE_URL_ENV).ok(),
        }
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub stagger_ms: Option<u64>,
}
