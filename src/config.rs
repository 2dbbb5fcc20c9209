//! Configuration for the session notes service.
//!
//! Values come from the environment with defaults for local development.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Default bind host.
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default server port.
pub const DEFAULT_PORT: u16 = 8000;
/// Default allowed CORS origin (the web frontend).
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
/// Default document database path.
pub const DEFAULT_DB_PATH: &str = "db.json";
/// Default completion API base URL.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
/// Default completion model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const HOST_ENV: &str = "SESSION_NOTES_HOST";
const PORT_ENV: &str = "SESSION_NOTES_PORT";
const CORS_ORIGIN_ENV: &str = "SESSION_NOTES_CORS_ORIGIN";
const STORE_ENV: &str = "SESSION_NOTES_STORE";
const DB_PATH_ENV: &str = "SESSION_NOTES_DB_PATH";
const API_KEY_ENV: &str = "OPENAI_API_KEY";
const BASE_URL_ENV: &str = "OPENAI_BASE_URL";
const MODEL_ENV: &str = "SESSION_NOTES_MODEL";
const TIMEOUT_ENV: &str = "SESSION_NOTES_LLM_TIMEOUT_SECS";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable holds a value that cannot be parsed.
    #[error("invalid value for {name}: {value:?}")]
    InvalidEnv {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
    },
    /// A configured value is out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// URL parse error.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// Top-level service configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Session store settings.
    pub store: StoreConfig,
    /// Summary generation settings.
    pub llm: LlmConfig,
}

impl ServiceConfig {
    /// Create a config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the configuration from environment variables, falling back to
    /// defaults for anything unset.
    ///
    /// # Errors
    /// Returns an error if a set variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns an error if a present value cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup(HOST_ENV) {
            config.server.host = host;
        }
        if let Some(port) = lookup(PORT_ENV) {
            config.server.port = parse_env(PORT_ENV, &port)?;
        }
        if let Some(origin) = lookup(CORS_ORIGIN_ENV) {
            config.server.cors_origin = origin;
        }
        if let Some(backend) = lookup(STORE_ENV) {
            config.store.backend = parse_env(STORE_ENV, &backend)?;
        }
        if let Some(path) = lookup(DB_PATH_ENV) {
            config.store.path = PathBuf::from(path);
        }
        config.llm.api_key = lookup(API_KEY_ENV).filter(|key| !key.trim().is_empty());
        if let Some(base_url) = lookup(BASE_URL_ENV) {
            config.llm.base_url = base_url;
        }
        if let Some(model) = lookup(MODEL_ENV) {
            config.llm.model = model;
        }
        if let Some(secs) = lookup(TIMEOUT_ENV) {
            config.llm.timeout_seconds = Some(parse_env(TIMEOUT_ENV, &secs)?);
        }

        Ok(config)
    }

    /// Set the server port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.server.port = port;
        self
    }

    /// Set the store backend and path.
    #[must_use]
    pub fn with_store(mut self, backend: StoreBackend, path: impl Into<PathBuf>) -> Self {
        self.store.backend = backend;
        self.store.path = path.into();
        self
    }

    /// Set the completion API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.llm.api_key = Some(key.into());
        self
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.server.cors_origin)?;
        Url::parse(&self.llm.base_url)?;

        if self.store.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("store.path must not be empty".to_string()));
        }

        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::Invalid("llm.model must not be empty".to_string()));
        }

        if self.llm.timeout_seconds == Some(0) {
            return Err(ConfigError::Invalid(
                "llm.timeout_seconds must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_env<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        name,
        value: value.to_string(),
    })
}

/// HTTP server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// The single origin allowed by CORS.
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_origin: DEFAULT_CORS_ORIGIN.to_string(),
        }
    }
}

/// Storage backend selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Single JSON document file.
    #[default]
    Json,
    /// `SQLite` database file.
    Sqlite,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(ConfigError::Invalid(format!("unknown store backend: {other}"))),
        }
    }
}

/// Session store settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend to open.
    pub backend: StoreBackend,
    /// Database file path.
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Json,
            path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

/// Summary generation settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Bearer credential for the completion API.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,
    /// Completion model name.
    pub model: String,
    /// Request timeout; `None` waits indefinitely.
    pub timeout_seconds: Option<u64>,
}

impl LlmConfig {
    /// Request timeout as a duration.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_seconds: None,
        }
    }
}
