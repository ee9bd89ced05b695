use crate::shared::config::{AppConfig, AppConfigBuilder, ConfigError};
use crate::shared::messaging::UserId;
use std::path::Path;

/// Identity the client acts as.
///
/// Supplied by configuration; the client never issues or validates tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Current logged-in user
    pub user_id: Option<UserId>,
    /// Bearer token sent with REST requests and the socket handshake
    pub token: Option<String>,
}

impl Credentials {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Read `SUSTAINAFOOD_USER_ID` and `SUSTAINAFOOD_TOKEN`; blank values count as unset
    pub fn from_env() -> Self {
        let non_blank = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            user_id: non_blank("SUSTAINAFOOD_USER_ID").map(UserId::from),
            token: non_blank("SUSTAINAFOOD_TOKEN"),
        }
    }
}

/// Client configuration wrapper.
#[derive(Debug, Clone)]
pub struct Config {
    app: AppConfig,
    credentials: Credentials,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            credentials: Credentials::default(),
        }
    }
}

impl Config {
    pub fn new(app: AppConfig, credentials: Credentials) -> Self {
        Self { app, credentials }
    }

    pub fn with_builder(
        builder: AppConfigBuilder,
        credentials: Credentials,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            app: builder.build()?,
            credentials,
        })
    }

    /// Load the app configuration (file + env overrides) and the credentials from env
    pub fn from_env(path: Option<&Path>) -> Result<Self, ConfigError> {
        Ok(Self {
            app: AppConfig::from_env(path)?,
            credentials: Credentials::from_env(),
        })
    }

    pub fn app(&self) -> &AppConfig {
        &self.app
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.credentials.user_id.as_ref()
    }

    /// Get the bearer token
    pub fn token(&self) -> Option<&str> {
        self.credentials.token.as_deref()
    }

    /// Get the full URL for an API endpoint
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url(), path)
    }

    /// Socket.IO endpoint URL, without the Engine.IO query
    pub fn socket_url(&self) -> String {
        self.api_url(&self.app.socket_path)
    }

    pub fn server_url(&self) -> &str {
        &self.app.server_url
    }
}
