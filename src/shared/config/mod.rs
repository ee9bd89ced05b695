//! Application configuration module
//!
//! Provides the endpoint and timing configuration of the chat client. Values
//! come from an optional TOML file and may be overridden by environment
//! variables (see [`AppConfig::from_env`]).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default backend URL
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

/// Default Socket.IO endpoint path
pub const DEFAULT_SOCKET_PATH: &str = "/socket.io/";

/// Default quiescence window before `stopTyping` is sent
pub const DEFAULT_TYPING_QUIESCENCE: Duration = Duration::from_millis(2000);

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Backend base URL (REST and Socket.IO share it)
    pub server_url: String,
    /// Socket.IO endpoint path on the backend
    pub socket_path: String,
    /// Quiescence window of the typing debouncer
    pub typing_quiescence: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            socket_path: DEFAULT_SOCKET_PATH.to_string(),
            typing_quiescence: DEFAULT_TYPING_QUIESCENCE,
        }
    }
}

/// On-disk layout of the configuration file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    server_url: Option<String>,
    socket_path: Option<String>,
    typing_quiescence_ms: Option<u64>,
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_url.trim().is_empty() {
            return Err(ConfigError::MissingValue("server_url"));
        }
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(self.server_url.clone()));
        }
        if !self.socket_path.starts_with('/') {
            return Err(ConfigError::InvalidUrl(self.socket_path.clone()));
        }
        if self.typing_quiescence.is_zero() {
            return Err(ConfigError::Parse(
                "typing_quiescence_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Default location of the configuration file
    /// (`<config dir>/sustainafood/chat.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push("sustainafood");
            path.push("chat.toml");
            path
        })
    }

    /// Parse a builder from TOML text
    pub fn builder_from_toml(text: &str) -> Result<AppConfigBuilder, ConfigError> {
        let file: FileConfig =
            toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mut builder = AppConfigBuilder::default();
        if let Some(url) = file.server_url {
            builder = builder.server_url(url);
        }
        if let Some(path) = file.socket_path {
            builder = builder.socket_path(path);
        }
        if let Some(ms) = file.typing_quiescence_ms {
            builder = builder.typing_quiescence(Duration::from_millis(ms));
        }
        Ok(builder)
    }

    /// Load a builder from a TOML file; a missing file yields the defaults
    pub fn builder_from_file(path: &Path) -> Result<AppConfigBuilder, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::builder_from_toml(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfigBuilder::default()),
            Err(e) => Err(ConfigError::Parse(format!("{}: {}", path.display(), e))),
        }
    }

    /// Load the configuration: file at `path` (or the default location), then
    /// `SUSTAINAFOOD_API_URL` and `SUSTAINAFOOD_TYPING_MS` overrides.
    pub fn from_env(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(path) => Self::builder_from_file(&path)?,
            None => AppConfigBuilder::default(),
        };

        if let Ok(url) = std::env::var("SUSTAINAFOOD_API_URL") {
            builder = builder.server_url(url);
        }
        if let Ok(ms) = std::env::var("SUSTAINAFOOD_TYPING_MS") {
            let ms = ms
                .parse::<u64>()
                .map_err(|_| ConfigError::Parse(format!("SUSTAINAFOOD_TYPING_MS={}", ms)))?;
            builder = builder.typing_quiescence(Duration::from_millis(ms));
        }

        builder.build()
    }
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    server_url: Option<String>,
    socket_path: Option<String>,
    typing_quiescence: Option<Duration>,
}

impl AppConfigBuilder {
    /// Set the server URL
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    /// Set the Socket.IO path
    pub fn socket_path(mut self, path: impl Into<String>) -> Self {
        self.socket_path = Some(path.into());
        self
    }

    /// Set the typing quiescence window
    pub fn typing_quiescence(mut self, window: Duration) -> Self {
        self.typing_quiescence = Some(window);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        let defaults = AppConfig::default();
        let config = AppConfig {
            server_url: self
                .server_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.server_url),
            socket_path: self.socket_path.unwrap_or(defaults.socket_path),
            typing_quiescence: self.typing_quiescence.unwrap_or(defaults.typing_quiescence),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("parse error: {0}")]
    Parse(String),
}
