//! Actuator writes from the dashboard

use crate::auth::{require_admin, Session};
use crate::error::{HomeError, Result};
use crate::home::{Actuator, DeviceAction};
use crate::store::HomeStore;
use std::sync::Arc;
use tracing::info;

/// Writes actuator values on behalf of a session
#[derive(Clone)]
pub struct DeviceController {
    store: Arc<dyn HomeStore>,
}

impl DeviceController {
    pub fn new(store: Arc<dyn HomeStore>) -> Self {
        Self { store }
    }

    /// Write `value` to `actuator`. Admins only; the value must be one the
    /// actuator understands (matched case-insensitively).
    pub async fn set(
        &self,
        session: &Session,
        actuator: Actuator,
        value: &str,
    ) -> Result<DeviceAction> {
        require_admin(session)?;
        let canonical = actuator.canonical_value(value).ok_or_else(|| {
            HomeError::invalid_input(format!(
                "{actuator} accepts {}, not '{value}'",
                actuator.values().join(", ")
            ))
        })?;

        let action = actuator.action(canonical);
        self.store
            .write_action(&action)
            .await
            .map_err(|e| HomeError::device_control(format!("Failed to set {actuator}: {e}")))?;
        info!(user_id = %session.user_id, %action, "Actuator set");
        Ok(action)
    }

    /// Switch to the actuator's on or off label
    pub async fn toggle(
        &self,
        session: &Session,
        actuator: Actuator,
        on: bool,
    ) -> Result<DeviceAction> {
        let value = if on {
            actuator.on_label()
        } else {
            actuator.off_label()
        };
        self.set(session, actuator, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_and_toggle() {
        let store = MemoryStore::new();
        let controller = DeviceController::new(Arc::new(store.clone()));
        let admin = Session::new("a", None, Role::Admin);

        controller.set(&admin, Actuator::Curtains, "partial").await.unwrap();
        assert_eq!(store.read("curtains").await.unwrap(), json!("Partial"));

        controller.toggle(&admin, Actuator::ParkingGate, true).await.unwrap();
        assert_eq!(store.read("parking_gate").await.unwrap(), json!("Open"));

        assert!(matches!(
            controller.set(&admin, Actuator::Lamp, "Partial").await,
            Err(HomeError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_viewer_cannot_control() {
        let store = MemoryStore::new();
        let controller = DeviceController::new(Arc::new(store.clone()));
        let viewer = Session::new("v", None, Role::Viewer);

        let err = controller.toggle(&viewer, Actuator::Lamp, true).await.unwrap_err();
        assert_eq!(err.user_message(), "Only admins can control devices.");
        assert_eq!(store.read("lamp").await.unwrap(), serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_store_failure_is_device_control_error() {
        let store = MemoryStore::new().with_failing_key("fan");
        let controller = DeviceController::new(Arc::new(store));
        let admin = Session::new("a", None, Role::Admin);
        assert!(matches!(
            controller.toggle(&admin, Actuator::Fan, false).await,
            Err(HomeError::DeviceControl(_))
        ));
    }
}
