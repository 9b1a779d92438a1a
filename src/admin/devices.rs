//! Device registry under `/devices/<id>`

use crate::auth::{require_admin, Session};
use crate::error::{HomeError, Result};
use crate::home::PLACEHOLDER;
use crate::store::{sanitize_key, HomeStore};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

const DEVICES_PATH: &str = "devices";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    #[default]
    Relay,
    Sensor,
}

/// Who may operate a device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlPermission {
    Admin,
    #[default]
    All,
}

/// A registered device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    #[serde(skip)]
    pub id: String,
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub firebase_key: String,
    pub enabled: bool,
    pub control_permission: ControlPermission,
    pub state: String,
}

fn text_or(value: &Value, field: &str, fallback: &str) -> String {
    match value.get(field).and_then(Value::as_str) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => fallback.to_string(),
    }
}

impl DeviceRecord {
    /// Build a record from its stored entry, filling gaps with defaults
    pub fn from_entry(id: &str, value: &Value) -> Self {
        let device_type = value
            .get("type")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();
        let control_permission = value
            .get("controlPermission")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        Self {
            id: id.to_string(),
            name: text_or(value, "name", id),
            label: text_or(value, "label", id),
            device_type,
            firebase_key: text_or(value, "firebaseKey", id),
            enabled: value.get("enabled").and_then(Value::as_bool) != Some(false),
            control_permission,
            state: text_or(value, "state", "OFF"),
        }
    }
}

/// Input for adding or editing a device
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceForm {
    pub name: String,
    pub label: String,
    pub device_type: DeviceType,
    pub firebase_key: String,
    pub control_permission: ControlPermission,
}

impl DeviceForm {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() || self.firebase_key.trim().is_empty() {
            return Err(HomeError::invalid_input("Name and Firebase key are required"));
        }
        Ok(())
    }
}

/// Devices whose name or label contains `query`, ignoring case
pub fn search_devices<'a>(devices: &'a [DeviceRecord], query: &str) -> Vec<&'a DeviceRecord> {
    let query = query.trim().to_lowercase();
    devices
        .iter()
        .filter(|d| {
            d.name.to_lowercase().contains(&query) || d.label.to_lowercase().contains(&query)
        })
        .collect()
}

/// Store path of one device entry. The id must be a single, already
/// sanitized key so a write can never reach the registry root.
fn device_path(id: &str) -> Result<String> {
    if id.trim().is_empty() || id.contains('/') || sanitize_key(id) != id {
        return Err(HomeError::invalid_input(format!("Invalid device id '{id}'")));
    }
    Ok(format!("{DEVICES_PATH}/{id}"))
}

/// Reads and edits the device registry
#[derive(Clone)]
pub struct DeviceRegistry {
    store: Arc<dyn HomeStore>,
}

impl DeviceRegistry {
    pub fn new(store: Arc<dyn HomeStore>) -> Self {
        Self { store }
    }

    /// All registered devices, ordered by id
    pub async fn list(&self) -> Result<Vec<DeviceRecord>> {
        let value = self.store.read(DEVICES_PATH).await?;
        let Some(map) = value.as_object() else {
            return Ok(Vec::new());
        };
        let mut devices: Vec<DeviceRecord> = map
            .iter()
            .map(|(id, entry)| DeviceRecord::from_entry(id, entry))
            .collect();
        devices.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(devices)
    }

    /// Add a device, or update `existing` in place.
    ///
    /// A new device's id is its store key with forbidden characters
    /// replaced; relays start `OFF` and sensors with the placeholder.
    /// Editing keeps the id, enabled flag and state.
    pub async fn save(
        &self,
        session: &Session,
        form: &DeviceForm,
        existing: Option<&DeviceRecord>,
    ) -> Result<DeviceRecord> {
        require_admin(session)?;
        form.validate()?;

        let name = form.name.trim().to_string();
        let label = if form.label.trim().is_empty() {
            name.clone()
        } else {
            form.label.trim().to_string()
        };

        let record = match existing {
            Some(current) => DeviceRecord {
                id: current.id.clone(),
                name,
                label,
                device_type: form.device_type,
                firebase_key: form.firebase_key.trim().to_string(),
                enabled: current.enabled,
                control_permission: form.control_permission,
                state: current.state.clone(),
            },
            None => DeviceRecord {
                id: sanitize_key(form.firebase_key.trim()),
                name,
                label,
                device_type: form.device_type,
                firebase_key: form.firebase_key.trim().to_string(),
                enabled: true,
                control_permission: form.control_permission,
                state: match form.device_type {
                    DeviceType::Relay => "OFF".to_string(),
                    DeviceType::Sensor => PLACEHOLDER.to_string(),
                },
            },
        };

        self.store
            .set(&device_path(&record.id)?, serde_json::to_value(&record)?)
            .await?;
        info!(device = %record.id, updated = existing.is_some(), "Saved device");
        Ok(record)
    }

    pub async fn delete(&self, session: &Session, id: &str) -> Result<()> {
        require_admin(session)?;
        self.store.remove(&device_path(id)?).await?;
        info!(device = id, "Deleted device");
        Ok(())
    }

    /// Flip the enabled flag, returning the new value
    pub async fn toggle_enabled(&self, session: &Session, device: &DeviceRecord) -> Result<bool> {
        require_admin(session)?;
        let path = format!("{}/enabled", device_path(&device.id)?);
        let enabled = !device.enabled;
        self.store.set(&path, json!(enabled)).await?;
        info!(device = %device.id, enabled, "Toggled device");
        Ok(enabled)
    }
}
