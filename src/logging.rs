//! Logging setup
//!
//! Stderr logging (compact or JSON) plus an optional daily-rotated log file,
//! filtered through `RUST_LOG`-style directives.

use crate::config::LoggingConfig;
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter directive (e.g. "info", "ewange_home=debug")
    pub filter: String,

    /// Log to file
    pub file_path: Option<PathBuf>,

    /// Log to stderr
    pub stderr: bool,

    /// Emit JSON lines instead of compact text
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            file_path: None,
            stderr: true,
            json: false,
        }
    }
}

impl From<&LoggingConfig> for LogConfig {
    fn from(config: &LoggingConfig) -> Self {
        Self {
            filter: config.level.clone(),
            file_path: config.file.as_ref().map(PathBuf::from),
            stderr: true,
            json: config.json_format,
        }
    }
}

impl LogConfig {
    /// Force debug level
    pub fn debug(mut self) -> Self {
        self.filter = "debug".to_string();
        self
    }
}

/// Initialize logging with the given configuration
pub fn init_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_json = (config.stderr && config.json).then(|| {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
    });

    let stderr_plain = (config.stderr && !config.json).then(|| {
        fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
    });

    let file_layer = match config.file_path {
        Some(file_path) => {
            if let Some(parent) = file_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let file_appender = tracing_appender::rolling::daily(
                file_path
                    .parent()
                    .unwrap_or_else(|| std::path::Path::new(".")),
                file_path
                    .file_name()
                    .unwrap_or_else(|| std::ffi::OsStr::new("ewange.log")),
            );

            Some(
                fmt::layer()
                    .with_writer(file_appender)
                    .with_ansi(false)
                    .with_target(true),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_json)
        .with(stderr_plain)
        .with(file_layer)
        .try_init()?;

    Ok(())
}

/// Mask sensitive fields before a payload is logged
pub fn sanitize_payload(payload: &serde_json::Value) -> serde_json::Value {
    match payload {
        serde_json::Value::Object(map) => {
            let mut sanitized = serde_json::Map::new();
            for (key, value) in map {
                if is_sensitive_field(key) {
                    sanitized.insert(key.clone(), serde_json::Value::String("***".to_string()));
                } else {
                    sanitized.insert(key.clone(), sanitize_payload(value));
                }
            }
            serde_json::Value::Object(sanitized)
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(sanitize_payload).collect())
        }
        other => other.clone(),
    }
}

fn is_sensitive_field(key: &str) -> bool {
    let key = key.to_lowercase();
    ["password", "token", "secret", "api_key", "apikey", "authorization"]
        .iter()
        .any(|s| key.contains(s))
}
