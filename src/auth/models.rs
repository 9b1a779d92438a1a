//! Role and session types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dashboard roles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access, including device control and user management
    Admin,
    /// Read-only monitoring
    #[default]
    Viewer,
}

impl Role {
    /// Parse a stored role string; anything unrecognized is a viewer
    pub fn from_lossy(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Role::Admin,
            _ => Role::Viewer,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Viewer => "viewer",
        }
    }

    /// Get a human-readable description of this role
    pub fn description(&self) -> &'static str {
        match self {
            Role::Admin => "Full control of devices and users",
            Role::Viewer => "Read-only monitoring",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signed-in user context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub email: Option<String>,
    pub role: Role,
}

impl Session {
    pub fn new(user_id: impl Into<String>, email: Option<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            email,
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
