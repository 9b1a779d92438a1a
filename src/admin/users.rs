//! Dashboard user records

use crate::auth::Role;
use crate::error::{HomeError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Account status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Disabled,
}

impl UserStatus {
    pub fn toggled(self) -> Self {
        match self {
            UserStatus::Active => UserStatus::Disabled,
            UserStatus::Disabled => UserStatus::Active,
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UserStatus::Active => "active",
            UserStatus::Disabled => "disabled",
        })
    }
}

impl<'de> Deserialize<'de> for UserStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(match value.as_deref() {
            Some("disabled") => UserStatus::Disabled,
            _ => UserStatus::Active,
        })
    }
}

fn lossy_role<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Role, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.as_deref().map(Role::from_lossy).unwrap_or_default())
}

fn null_as_empty<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A user as reported by the admin endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardUser {
    pub user_id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, deserialize_with = "lossy_role")]
    pub role: Role,
    #[serde(default)]
    pub status: UserStatus,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub created_at: String,
}

impl DashboardUser {
    /// Name and a well-formed email are required
    pub fn validate(&self) -> Result<()> {
        validate_profile(&self.name, &self.email)
    }
}

/// Input for creating a user
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl NewUser {
    pub fn validate(&self) -> Result<()> {
        validate_profile(&self.name, &self.email)?;
        if self.password.is_empty() {
            return Err(HomeError::invalid_input("Password required"));
        }
        Ok(())
    }
}

fn validate_profile(name: &str, email: &str) -> Result<()> {
    if name.trim().is_empty() || email.trim().is_empty() {
        return Err(HomeError::invalid_input("Please fill in all fields"));
    }
    if !is_valid_email(email.trim()) {
        return Err(HomeError::invalid_input(format!("Invalid email address: {email}")));
    }
    Ok(())
}

/// Check if a string looks like an email address
pub fn is_valid_email(value: &str) -> bool {
    static EMAIL_REGEX: OnceLock<regex::Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        regex::Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("email pattern is valid")
    });
    regex.is_match(value)
}

/// Users whose name or email contains `query`, ignoring case
pub fn search_users<'a>(users: &'a [DashboardUser], query: &str) -> Vec<&'a DashboardUser> {
    let query = query.trim().to_lowercase();
    users
        .iter()
        .filter(|u| {
            u.name.to_lowercase().contains(&query) || u.email.to_lowercase().contains(&query)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_defaults_from_endpoint() {
        let user: DashboardUser = serde_json::from_value(json!({
            "user_id": "u1",
            "name": null,
            "email": "a@b.io",
            "status": "disabled"
        }))
        .unwrap();
        assert_eq!(user.role, Role::Viewer);
        assert_eq!(user.name, "");
        assert_eq!(user.status, UserStatus::Disabled);
        assert_eq!(user.status.toggled(), UserStatus::Active);
    }

    #[test]
    fn test_validation_messages() {
        let mut user = NewUser {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            ..NewUser::default()
        };
        assert_eq!(user.validate().unwrap_err().user_message(), "Password required");

        user.password = "hunter2".to_string();
        assert!(user.validate().is_ok());

        user.email = "  ".to_string();
        assert_eq!(user.validate().unwrap_err().user_message(), "Please fill in all fields");

        user.email = "not-an-email".to_string();
        assert!(user.validate().is_err());
    }

    #[test]
    fn test_search_users() {
        let users: Vec<DashboardUser> = serde_json::from_value(json!([
            {"user_id": "1", "name": "Amina", "email": "amina@home.io", "role": "admin"},
            {"user_id": "2", "name": "Brian", "email": "b@HOME.io"},
        ]))
        .unwrap();
        assert_eq!(search_users(&users, "home").len(), 2);
        assert_eq!(search_users(&users, "AMI")[0].user_id, "1");
        assert!(search_users(&users, "zed").is_empty());
    }
}
