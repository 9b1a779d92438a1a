//! Configuration management for the smart-home client
//!
//! Configuration is layered: built-in defaults, then an optional TOML file,
//! then environment variables.

use crate::error::{HomeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, time::Duration};
use url::Url;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DashboardConfig {
    /// Realtime key/value store
    pub store: StoreConfig,

    /// Conversational assistant endpoint
    pub assistant: AssistantConfig,

    /// Admin RPC endpoint
    pub admin: AdminConfig,

    /// Session resolution
    pub session: SessionConfig,

    /// Dashboard presentation
    pub dashboard: DashboardDisplayConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Realtime store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database root URL (e.g., "https://home-default-rtdb.firebaseio.com")
    pub url: Url,

    /// Database auth token, appended as `?auth=`
    pub auth_token: Option<String>,

    /// Timeout for single reads and writes (not applied to the live feed)
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Connect timeout
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
}

/// Assistant endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Chat endpoint URL
    pub chat_url: Option<Url>,

    /// Bearer key sent with chat requests
    pub api_key: Option<String>,

    /// How many times a `data:` line that fails to parse is retried on
    /// later reads before it is dropped
    pub max_line_retries: u32,

    /// Speak assistant replies
    pub voice: bool,
}

/// Admin endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AdminConfig {
    /// Admin RPC endpoint URL
    pub url: Option<Url>,

    /// Caller's access token for the admin endpoint
    pub access_token: Option<String>,
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Signed-in user id; no id means no session
    pub user_id: Option<String>,

    /// Signed-in user email, for display
    pub email: Option<String>,

    /// Fallback timer for role resolution
    #[serde(with = "humantime_serde")]
    pub role_timeout: Duration,
}

/// Dashboard presentation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardDisplayConfig {
    /// Number of parking slots shown on the parking card
    pub parking_capacity: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable structured JSON logging
    pub json_format: bool,

    /// Log to file (path)
    pub file: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: Url::parse("http://127.0.0.1:9000").expect("static URL"),
            auth_token: None,
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            chat_url: None,
            api_key: None,
            max_line_retries: 1,
            voice: false,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_id: None,
            email: None,
            role_timeout: Duration::from_secs(5),
        }
    }
}

impl Default for DashboardDisplayConfig {
    fn default() -> Self {
        Self {
            parking_capacity: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            file: None,
        }
    }
}

fn parse_url(var: &str, value: &str) -> Result<Url> {
    value
        .parse()
        .map_err(|e| HomeError::config(format!("Invalid {var}: {e}")))
}

impl DashboardConfig {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ewange").join("config.toml"))
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            HomeError::config(format!("Cannot read {}: {e}", path.display()))
        })?;
        toml::from_str(&content)
            .map_err(|e| HomeError::config(format!("Invalid config {}: {e}", path.display())))
    }

    /// Load configuration: file (explicit path, else default path if present),
    /// then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(default) if default.exists() => Self::from_file(&default)?,
                _ => Self::default(),
            },
        };
        base.with_env_overrides()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Apply environment variables on top of this configuration
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(url) = env::var("EWANGE_DB_URL") {
            self.store.url = parse_url("EWANGE_DB_URL", &url)?;
        }

        if let Ok(token) = env::var("EWANGE_DB_AUTH") {
            self.store.auth_token = Some(token);
        }

        if let Ok(timeout) = env::var("EWANGE_TIMEOUT") {
            self.store.timeout = Duration::from_secs(
                timeout
                    .parse()
                    .map_err(|e| HomeError::config(format!("Invalid EWANGE_TIMEOUT: {e}")))?,
            );
        }

        if let Ok(url) = env::var("EWANGE_CHAT_URL") {
            self.assistant.chat_url = Some(parse_url("EWANGE_CHAT_URL", &url)?);
        }

        if let Ok(key) = env::var("EWANGE_CHAT_KEY") {
            self.assistant.api_key = Some(key);
        }

        if let Ok(url) = env::var("EWANGE_ADMIN_URL") {
            self.admin.url = Some(parse_url("EWANGE_ADMIN_URL", &url)?);
        }

        if let Ok(token) = env::var("EWANGE_ACCESS_TOKEN") {
            self.admin.access_token = Some(token);
        }

        if let Ok(user_id) = env::var("EWANGE_USER_ID") {
            self.session.user_id = Some(user_id);
        }

        if let Ok(email) = env::var("EWANGE_USER_EMAIL") {
            self.session.email = Some(email);
        }

        // Load logging configuration
        if let Ok(level) = env::var("RUST_LOG") {
            self.logging.level = level;
        }

        if let Ok(file) = env::var("EWANGE_LOG_FILE") {
            self.logging.file = Some(file);
        }

        Ok(self)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let http = |url: &Url| url.scheme() == "http" || url.scheme() == "https";

        if !http(&self.store.url) {
            return Err(HomeError::config("Store URL must use http or https scheme"));
        }

        if let Some(url) = &self.assistant.chat_url {
            if !http(url) {
                return Err(HomeError::config("Chat URL must use http or https scheme"));
            }
        }

        if let Some(url) = &self.admin.url {
            if !http(url) {
                return Err(HomeError::config("Admin URL must use http or https scheme"));
            }
        }

        if self.store.timeout.is_zero() {
            return Err(HomeError::config("Timeout must be greater than zero"));
        }

        if self.dashboard.parking_capacity == 0 {
            return Err(HomeError::config("Parking capacity must be at least 1"));
        }

        Ok(())
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| HomeError::config(format!("Cannot serialize config: {e}")))
    }
}
