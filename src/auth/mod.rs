//! Session context and role resolution
//!
//! Authentication itself happens elsewhere; this crate only carries the
//! signed-in user and their role, and every operation that needs
//! authorization takes a [`Session`] explicitly.

pub mod models;

pub use models::{Role, Session};

use crate::error::{HomeError, Result};
use crate::store::HomeStore;
use std::time::Duration;
use tracing::{debug, warn};

/// Fail with a permission error unless the session belongs to an admin
pub fn require_admin(session: &Session) -> Result<()> {
    if session.is_admin() {
        Ok(())
    } else {
        Err(HomeError::permission_denied(format!(
            "User {} has role {}, admin required",
            session.user_id, session.role
        )))
    }
}

/// Like [`require_admin`], for callers that may have no session at all
pub fn require_admin_session(session: Option<&Session>) -> Result<&Session> {
    let session =
        session.ok_or_else(|| HomeError::authentication("No signed-in session"))?;
    require_admin(session)?;
    Ok(session)
}

/// Look up the role stored at `users/{user_id}/role`.
///
/// A missing or unknown role, a failed read, or no answer within `timeout`
/// all resolve to [`Role::Viewer`]. A user with no stored role is never
/// treated as admin; admin access needs an explicit `"admin"` entry.
pub async fn resolve_role(store: &dyn HomeStore, user_id: &str, timeout: Duration) -> Role {
    let path = format!("users/{}/role", crate::store::sanitize_key(user_id));

    match tokio::time::timeout(timeout, store.read(&path)).await {
        Ok(Ok(value)) => {
            let role = value.as_str().map(Role::from_lossy).unwrap_or_default();
            debug!(user_id, %role, "Resolved role");
            role
        }
        Ok(Err(e)) => {
            warn!(user_id, "Role lookup failed, using viewer: {e}");
            Role::Viewer
        }
        Err(_) => {
            warn!(user_id, "Role lookup timed out after {:?}, using viewer", timeout);
            Role::Viewer
        }
    }
}

/// Build a session for `user_id`, resolving the role from the store
pub async fn open_session(
    store: &dyn HomeStore,
    user_id: impl Into<String>,
    email: Option<String>,
    timeout: Duration,
) -> Session {
    let user_id = user_id.into();
    let role = resolve_role(store, &user_id, timeout).await;
    Session::new(user_id, email, role)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_resolve_role_from_store() {
        let store = MemoryStore::with_document(json!({
            "users": {"u1": {"role": "admin"}, "u2": {"role": "superuser"}}
        }));
        let timeout = Duration::from_secs(1);
        assert_eq!(resolve_role(&store, "u1", timeout).await, Role::Admin);
        assert_eq!(resolve_role(&store, "u2", timeout).await, Role::Viewer);
        assert_eq!(resolve_role(&store, "nobody", timeout).await, Role::Viewer);
    }

    #[tokio::test]
    async fn test_user_without_role_is_viewer() {
        let store = MemoryStore::with_document(json!({
            "users": {"fresh": {"email": "fresh@example.com"}}
        }));
        let role = resolve_role(&store, "fresh", Duration::from_secs(1)).await;
        assert_eq!(role, Role::Viewer);
    }

    #[test]
    fn test_require_admin() {
        let admin = Session::new("a", None, Role::Admin);
        let viewer = Session::new("v", None, Role::Viewer);
        assert!(require_admin(&admin).is_ok());
        assert!(matches!(
            require_admin(&viewer),
            Err(HomeError::PermissionDenied(_))
        ));
        assert!(matches!(
            require_admin_session(None),
            Err(HomeError::Authentication(_))
        ));
    }
}
