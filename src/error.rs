//! Error types for the smart-home client
//!
//! Every failure is scoped to the interaction that triggered it. The
//! taxonomy follows the four classes the dashboard distinguishes:
//! authorization failures, transient network/service failures, malformed
//! payloads and unsupported capabilities.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for home operations
pub type Result<T> = std::result::Result<T, HomeError>;

/// Error types for store, assistant and admin operations
#[derive(Error, Debug)]
pub enum HomeError {
    /// Connection errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// Authentication errors (no session, bad token)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Caller lacks the role required for the operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing errors
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Realtime store errors
    #[error("Store error: {0}")]
    Store(String),

    /// Assistant endpoint errors; the message is shown to the user as-is
    #[error("Assistant error: {0}")]
    Assistant(String),

    /// Admin endpoint errors
    #[error("Admin API error: {0}")]
    Admin(String),

    /// Device control errors
    #[error("Device control error: {0}")]
    DeviceControl(String),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Timeout errors
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// A request is already in flight
    #[error("Busy: {0}")]
    Busy(String),

    /// Capability missing on this platform (speech, etc.)
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Parsing errors
    #[error("Parsing error: {0}")]
    Parsing(String),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors
    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

/// Structured error code for machine-readable error handling
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Connection errors (1000-1099)
    ConnectionTimeout,
    ConnectionLost,
    NetworkUnreachable,

    // Authentication errors (1100-1199)
    InvalidCredentials,
    PermissionDenied,

    // Configuration errors (1200-1299)
    ConfigurationInvalid,

    // Device errors (1300-1399)
    DeviceNotFound,
    DeviceControlFailed,

    // Data errors (1400-1499)
    ParsingFailed,
    InvalidInput,

    // Service errors (1600-1699)
    ServiceUnavailable,
    ServiceBusy,
    ExternalServiceError,

    // Capability errors (1700-1799)
    UnsupportedOperation,

    // Internal errors (1900-1999)
    InternalError,
}

impl ErrorCode {
    /// Get numeric error code
    pub fn as_number(&self) -> u32 {
        match self {
            ErrorCode::ConnectionTimeout => 1001,
            ErrorCode::ConnectionLost => 1003,
            ErrorCode::NetworkUnreachable => 1004,

            ErrorCode::InvalidCredentials => 1101,
            ErrorCode::PermissionDenied => 1103,

            ErrorCode::ConfigurationInvalid => 1202,

            ErrorCode::DeviceNotFound => 1301,
            ErrorCode::DeviceControlFailed => 1303,

            ErrorCode::ParsingFailed => 1401,
            ErrorCode::InvalidInput => 1402,

            ErrorCode::ServiceUnavailable => 1601,
            ErrorCode::ServiceBusy => 1605,
            ErrorCode::ExternalServiceError => 1603,

            ErrorCode::UnsupportedOperation => 1702,

            ErrorCode::InternalError => 1901,
        }
    }

    /// Get error category
    pub fn category(&self) -> &'static str {
        match self.as_number() {
            1000..=1099 => "connection",
            1100..=1199 => "authentication",
            1200..=1299 => "configuration",
            1300..=1399 => "device",
            1400..=1499 => "data",
            1600..=1699 => "service",
            1700..=1799 => "capability",
            1900..=1999 => "internal",
            _ => "unknown",
        }
    }
}

impl HomeError {
    /// Create a connection error
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        Self::Connection(msg.into())
    }

    /// Create an authentication error
    pub fn authentication<S: Into<String>>(msg: S) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a permission denied error
    pub fn permission_denied<S: Into<String>>(msg: S) -> Self {
        Self::PermissionDenied(msg.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a store error
    pub fn store<S: Into<String>>(msg: S) -> Self {
        Self::Store(msg.into())
    }

    /// Create an assistant error
    pub fn assistant<S: Into<String>>(msg: S) -> Self {
        Self::Assistant(msg.into())
    }

    /// Create an admin API error
    pub fn admin<S: Into<String>>(msg: S) -> Self {
        Self::Admin(msg.into())
    }

    /// Create a device control error
    pub fn device_control<S: Into<String>>(msg: S) -> Self {
        Self::DeviceControl(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a busy error
    pub fn busy<S: Into<String>>(msg: S) -> Self {
        Self::Busy(msg.into())
    }

    /// Create an unsupported capability error
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Create a parsing error
    pub fn parsing_error<S: Into<String>>(msg: S) -> Self {
        Self::Parsing(msg.into())
    }

    /// Map HomeError to structured error code
    pub fn to_error_code(&self) -> ErrorCode {
        match self {
            HomeError::Connection(_) => ErrorCode::ConnectionLost,
            HomeError::Authentication(_) => ErrorCode::InvalidCredentials,
            HomeError::PermissionDenied(_) => ErrorCode::PermissionDenied,
            HomeError::Config(_) => ErrorCode::ConfigurationInvalid,
            HomeError::Store(_) => ErrorCode::ServiceUnavailable,
            HomeError::Assistant(_) => ErrorCode::ExternalServiceError,
            HomeError::Admin(_) => ErrorCode::ExternalServiceError,
            HomeError::DeviceControl(_) => ErrorCode::DeviceControlFailed,
            HomeError::InvalidInput(_) => ErrorCode::InvalidInput,
            HomeError::NotFound(_) => ErrorCode::DeviceNotFound,
            HomeError::Timeout(_) => ErrorCode::ConnectionTimeout,
            HomeError::Busy(_) => ErrorCode::ServiceBusy,
            HomeError::Unsupported(_) => ErrorCode::UnsupportedOperation,
            HomeError::Parsing(_) => ErrorCode::ParsingFailed,
            HomeError::Json(_) => ErrorCode::ParsingFailed,
            HomeError::Http(_) => ErrorCode::ExternalServiceError,
            HomeError::Io(_) => ErrorCode::InternalError,
            HomeError::Generic(_) => ErrorCode::InternalError,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HomeError::Connection(_)
                | HomeError::Timeout(_)
                | HomeError::Store(_)
                | HomeError::Busy(_)
                | HomeError::Http(_)
        )
    }

    /// Check if error indicates an authorization issue
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            HomeError::Authentication(_) | HomeError::PermissionDenied(_)
        )
    }

    /// Short message suitable for a toast or banner.
    ///
    /// Assistant and admin errors carry the endpoint's own message; transport
    /// failures collapse into a generic notice.
    pub fn user_message(&self) -> String {
        match self {
            HomeError::Assistant(msg) | HomeError::Admin(msg) => msg.clone(),
            HomeError::Authentication(_) => {
                "You need to be authenticated to do that.".to_string()
            }
            HomeError::PermissionDenied(_) => "Only admins can control devices.".to_string(),
            HomeError::Busy(_) => "Please wait for the current request to finish.".to_string(),
            HomeError::Unsupported(msg) | HomeError::InvalidInput(msg) => msg.clone(),
            HomeError::Http(_)
            | HomeError::Connection(_)
            | HomeError::Timeout(_)
            | HomeError::Io(_) => "Failed to get response.".to_string(),
            _ => "Something went wrong.".to_string(),
        }
    }
}
