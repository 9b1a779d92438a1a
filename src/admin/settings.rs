//! System settings under `/system_config`

use crate::auth::{require_admin, Session};
use crate::error::{HomeError, Result};
use crate::store::HomeStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

const SETTINGS_PATH: &str = "system_config";

/// Accepted gas alarm thresholds
pub const GAS_THRESHOLDS: [&str; 3] = ["LOW", "MEDIUM", "HIGH"];

/// Dashboard-wide settings; fields missing from the store keep their defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemSettings {
    /// Temperature alert threshold in °C
    pub temp_threshold: f64,
    pub gas_threshold: String,
    pub parking_capacity: u32,
    pub alert_sound: bool,
    pub manual_override: bool,
    pub theme: String,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            temp_threshold: 35.0,
            gas_threshold: "HIGH".to_string(),
            parking_capacity: 2,
            alert_sound: true,
            manual_override: false,
            theme: "dark".to_string(),
        }
    }
}

impl SystemSettings {
    /// Settings from a stored document, merged over the defaults
    pub fn from_document(value: &Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(Self::deserialize(value)?)
    }

    pub fn validate(&self) -> Result<()> {
        if !(20.0..=50.0).contains(&self.temp_threshold) {
            return Err(HomeError::invalid_input(
                "Temperature threshold must be between 20 and 50 °C",
            ));
        }
        if !GAS_THRESHOLDS.contains(&self.gas_threshold.as_str()) {
            return Err(HomeError::invalid_input(format!(
                "Gas threshold must be one of {}",
                GAS_THRESHOLDS.join(", ")
            )));
        }
        if !(1..=10).contains(&self.parking_capacity) {
            return Err(HomeError::invalid_input(
                "Parking capacity must be between 1 and 10",
            ));
        }
        Ok(())
    }
}

/// Loads and saves [`SystemSettings`]
#[derive(Clone)]
pub struct SettingsStore {
    store: Arc<dyn HomeStore>,
}

impl SettingsStore {
    pub fn new(store: Arc<dyn HomeStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> Result<SystemSettings> {
        SystemSettings::from_document(&self.store.read(SETTINGS_PATH).await?)
    }

    /// Write the whole settings object
    pub async fn save(&self, session: &Session, settings: &SystemSettings) -> Result<()> {
        require_admin(session)?;
        settings.validate()?;
        self.store
            .set(SETTINGS_PATH, serde_json::to_value(settings)?)
            .await?;
        info!(user_id = %session.user_id, "Saved system settings");
        Ok(())
    }

    /// Overwrite the stored settings with the defaults
    pub async fn reset(&self, session: &Session) -> Result<SystemSettings> {
        let defaults = SystemSettings::default();
        self.save(session, &defaults).await?;
        Ok(defaults)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[test]
    fn test_merge_over_defaults() {
        let document = json!({"temp_threshold": 40, "theme": "light"});
        let settings = SystemSettings::from_document(&document).unwrap();
        assert_eq!(settings.temp_threshold, 40.0);
        assert_eq!(settings.theme, "light");
        assert_eq!(settings.gas_threshold, "HIGH");
        assert_eq!(settings.parking_capacity, 2);
        assert!(settings.alert_sound);
        assert_eq!(SystemSettings::from_document(&Value::Null).unwrap(), SystemSettings::default());
    }

    #[test]
    fn test_validate_ranges() {
        let mut settings = SystemSettings::default();
        assert!(settings.validate().is_ok());
        settings.parking_capacity = 11;
        assert!(settings.validate().is_err());
        settings.parking_capacity = 3;
        settings.gas_threshold = "EXTREME".to_string();
        assert!(settings.validate().is_err());
    }

    #[tokio::test]
    async fn test_save_requires_admin() {
        let store = MemoryStore::new();
        let settings = SettingsStore::new(Arc::new(store.clone()));
        let viewer = Session::new("v", None, Role::Viewer);
        let admin = Session::new("a", None, Role::Admin);

        let mut custom = SystemSettings::default();
        custom.alert_sound = false;
        assert!(settings.save(&viewer, &custom).await.is_err());
        settings.save(&admin, &custom).await.unwrap();
        assert!(!settings.load().await.unwrap().alert_sound);

        settings.reset(&admin).await.unwrap();
        assert!(settings.load().await.unwrap().alert_sound);
    }
}
