//! Administration
//!
//! [`AdminClient`] talks to the admin RPC endpoint (user management and
//! history logging). Device and settings management go straight to the
//! realtime store through [`devices`] and [`settings`].

pub mod devices;
pub mod settings;
pub mod users;

pub use devices::{
    search_devices, ControlPermission, DeviceForm, DeviceRecord, DeviceRegistry, DeviceType,
};
pub use settings::{SettingsStore, SystemSettings};
pub use users::{search_users, DashboardUser, NewUser, UserStatus};

use crate::auth::{require_admin, Role, Session};
use crate::config::AdminConfig;
use crate::error::{HomeError, Result};
use crate::history::HistoryKind;
use crate::logging::sanitize_payload;
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// One admin RPC call; serialized as `{"action": ..., ...payload}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AdminRequest {
    CreateUser {
        email: String,
        password: String,
        name: String,
        role: Role,
    },
    UpdateUser {
        user_id: String,
        name: String,
        email: String,
        role: Role,
        status: UserStatus,
    },
    DeleteUser {
        user_id: String,
    },
    ListUsers,
    LogHistory {
        #[serde(rename = "type")]
        kind: HistoryKind,
        value: f64,
    },
}

impl AdminRequest {
    pub fn action(&self) -> &'static str {
        match self {
            AdminRequest::CreateUser { .. } => "create_user",
            AdminRequest::UpdateUser { .. } => "update_user",
            AdminRequest::DeleteUser { .. } => "delete_user",
            AdminRequest::ListUsers => "list_users",
            AdminRequest::LogHistory { .. } => "log_history",
        }
    }
}

#[derive(Deserialize)]
struct CreatedUser {
    user_id: Option<String>,
}

#[derive(Deserialize)]
struct UserList {
    #[serde(default)]
    users: Vec<DashboardUser>,
}

/// Client for the admin RPC endpoint
#[derive(Clone)]
pub struct AdminClient {
    client: Client,
    url: Url,
    access_token: Option<String>,
}

impl AdminClient {
    /// Create a client; fails when no admin URL is configured
    pub fn new(config: &AdminConfig, timeout: Duration) -> Result<Self> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| HomeError::config("No admin endpoint configured"))?;

        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(format!("ewange-home/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HomeError::connection(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url,
            access_token: config.access_token.clone(),
        })
    }

    /// Send one request. Non-admin sessions are refused before anything is
    /// sent; the endpoint checks again on its side.
    pub async fn call(&self, session: &Session, request: &AdminRequest) -> Result<Value> {
        require_admin(session)?;

        let body = serde_json::to_value(request)?;
        debug!(
            action = request.action(),
            payload = %sanitize_payload(&body),
            "Admin request"
        );

        let mut http = self.client.post(self.url.clone()).json(&body);
        if let Some(token) = &self.access_token {
            http = http.bearer_auth(token);
        }

        let response = http.send().await.map_err(|e| {
            if e.is_timeout() {
                HomeError::timeout(format!("Admin request timed out: {e}"))
            } else if e.is_connect() {
                HomeError::connection(format!("Admin endpoint unreachable: {e}"))
            } else {
                HomeError::Http(e)
            }
        })?;

        let status = response.status();
        let text = response.text().await?;
        let value: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
        let error = value
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_string);

        if !status.is_success() {
            let message = error.unwrap_or_else(|| format!("Admin request failed ({status})"));
            warn!(action = request.action(), %status, "Admin request rejected: {message}");
            return Err(match status.as_u16() {
                401 => HomeError::authentication(message),
                403 => HomeError::permission_denied(message),
                _ => HomeError::admin(message),
            });
        }

        if let Some(message) = error {
            return Err(HomeError::admin(message));
        }

        info!(action = request.action(), "Admin request succeeded");
        Ok(value)
    }

    /// All dashboard users; a user without a role is a viewer
    pub async fn list_users(&self, session: &Session) -> Result<Vec<DashboardUser>> {
        let value = self.call(session, &AdminRequest::ListUsers).await?;
        let list: UserList = serde_json::from_value(value)?;
        Ok(list.users)
    }

    /// Create a user, returning the new user id
    pub async fn create_user(&self, session: &Session, user: &NewUser) -> Result<String> {
        user.validate()?;
        let request = AdminRequest::CreateUser {
            email: user.email.trim().to_string(),
            password: user.password.clone(),
            name: user.name.trim().to_string(),
            role: user.role,
        };
        let value = self.call(session, &request).await?;
        let created: CreatedUser = serde_json::from_value(value)?;
        created
            .user_id
            .ok_or_else(|| HomeError::admin("Admin endpoint did not return a user id"))
    }

    /// Overwrite a user's profile, role and status
    pub async fn update_user(&self, session: &Session, user: &DashboardUser) -> Result<()> {
        user.validate()?;
        let request = AdminRequest::UpdateUser {
            user_id: user.user_id.clone(),
            name: user.name.trim().to_string(),
            email: user.email.trim().to_string(),
            role: user.role,
            status: user.status,
        };
        self.call(session, &request).await?;
        Ok(())
    }

    pub async fn delete_user(&self, session: &Session, user_id: &str) -> Result<()> {
        if user_id.trim().is_empty() {
            return Err(HomeError::invalid_input("User id is required"));
        }
        let request = AdminRequest::DeleteUser {
            user_id: user_id.to_string(),
        };
        self.call(session, &request).await?;
        Ok(())
    }

    /// Flip a user between active and disabled, returning the new status
    pub async fn toggle_status(
        &self,
        session: &Session,
        user: &DashboardUser,
    ) -> Result<UserStatus> {
        let mut updated = user.clone();
        updated.status = user.status.toggled();
        self.update_user(session, &updated).await?;
        Ok(updated.status)
    }

    /// Forward one reading to the endpoint's history tables
    pub async fn log_history(
        &self,
        session: &Session,
        kind: HistoryKind,
        value: f64,
    ) -> Result<()> {
        self.call(session, &AdminRequest::LogHistory { kind, value })
            .await?;
        Ok(())
    }
}
