//! Home state model
//!
//! A [`HomeState`] is an immutable snapshot of every sensor and actuator
//! value mirrored in the realtime store. Fields the store does not carry
//! fall back to placeholder values, so a partial document still produces a
//! complete snapshot.

pub mod device;

pub use device::{Actuator, DeviceAction};

use serde::{Deserialize, Deserializer, Serialize};

/// Placeholder shown for string fields the store has not reported yet
pub const PLACEHOLDER: &str = "—";

fn placeholder() -> String {
    PLACEHOLDER.to_string()
}

/// Access and open/closed state of one door
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoorStatus {
    #[serde(default = "placeholder", deserialize_with = "lenient_string")]
    pub access: String,
    #[serde(default = "placeholder", deserialize_with = "lenient_string")]
    pub door_state: String,
}

impl Default for DoorStatus {
    fn default() -> Self {
        Self {
            access: placeholder(),
            door_state: placeholder(),
        }
    }
}

/// Full snapshot of the home
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeState {
    #[serde(default, deserialize_with = "lenient_door")]
    pub main_door: DoorStatus,
    #[serde(default, deserialize_with = "lenient_door")]
    pub side_door: DoorStatus,
    #[serde(default = "placeholder", deserialize_with = "lenient_string")]
    pub buzzer: String,
    #[serde(default = "placeholder", deserialize_with = "lenient_string")]
    pub lamp: String,
    #[serde(default = "placeholder", deserialize_with = "lenient_string")]
    pub fan: String,
    #[serde(default = "placeholder", deserialize_with = "lenient_string")]
    pub curtains: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub temperature: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub humidity: f64,
    #[serde(default = "placeholder", deserialize_with = "lenient_string")]
    pub gas: String,
    /// Free parking slots
    #[serde(default, deserialize_with = "lenient_number")]
    pub parking_slots: f64,
    #[serde(default = "placeholder", deserialize_with = "lenient_string")]
    pub parking_gate: String,
    #[serde(default = "placeholder", deserialize_with = "lenient_string")]
    pub water_pump: String,
    #[serde(default = "placeholder", deserialize_with = "lenient_string")]
    pub gsm_last_command: String,
}

impl Default for HomeState {
    fn default() -> Self {
        Self {
            main_door: DoorStatus::default(),
            side_door: DoorStatus::default(),
            buzzer: placeholder(),
            lamp: placeholder(),
            fan: placeholder(),
            curtains: placeholder(),
            temperature: 0.0,
            humidity: 0.0,
            gas: placeholder(),
            parking_slots: 0.0,
            parking_gate: placeholder(),
            water_pump: placeholder(),
            gsm_last_command: placeholder(),
        }
    }
}

impl HomeState {
    /// Build a snapshot from a raw store document.
    ///
    /// `null` (an empty database) or any other non-object root yields the
    /// placeholder snapshot. Unknown keys such as `devices` or history nodes
    /// are ignored, and a malformed field falls back to its placeholder.
    pub fn from_document(value: &serde_json::Value) -> crate::error::Result<Self> {
        if !value.is_object() {
            return Ok(Self::default());
        }
        Ok(Self::deserialize(value)?)
    }

    /// Current value of an actuator as a string
    pub fn actuator_value(&self, actuator: Actuator) -> &str {
        match actuator {
            Actuator::Lamp => &self.lamp,
            Actuator::Fan => &self.fan,
            Actuator::Curtains => &self.curtains,
            Actuator::WaterPump => &self.water_pump,
            Actuator::ParkingGate => &self.parking_gate,
            Actuator::Buzzer => &self.buzzer,
        }
    }

    /// Gas sensor reports something other than `NO` or the placeholder
    pub fn gas_detected(&self) -> bool {
        self.gas != "NO" && self.gas != PLACEHOLDER
    }

    /// Buzzer is sounding
    pub fn alarm_active(&self) -> bool {
        self.buzzer == "ON"
    }

    /// Temperature and humidity are both still at their zero placeholder
    pub fn has_no_climate_reading(&self) -> bool {
        self.temperature == 0.0 && self.humidity == 0.0
    }
}

/// Format a reading without a trailing `.0` for whole numbers
pub fn format_reading(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Accepts strings, numbers and booleans; `null` becomes the placeholder
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => placeholder(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    })
}

/// Accepts a door object; anything else becomes the placeholder door
fn lenient_door<'de, D>(deserializer: D) -> Result<DoorStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if !value.is_object() {
        return Ok(DoorStatus::default());
    }
    Ok(DoorStatus::deserialize(&value).unwrap_or_default())
}

/// Accepts numbers and numeric strings; anything else becomes 0
fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_partial_document_merges_over_defaults() {
        let state = HomeState::from_document(&json!({
            "lamp": "ON",
            "temperature": 28,
            "main_door": {"access": "GRANTED"},
            "devices": {"lamp": {"name": "Lamp"}}
        }))
        .unwrap();

        assert_eq!(state.lamp, "ON");
        assert_eq!(state.temperature, 28.0);
        assert_eq!(state.main_door.access, "GRANTED");
        assert_eq!(state.main_door.door_state, PLACEHOLDER);
        assert_eq!(state.fan, PLACEHOLDER);
        assert_eq!(state.humidity, 0.0);
    }

    #[test]
    fn test_null_document_is_placeholder_snapshot() {
        let state = HomeState::from_document(&serde_json::Value::Null).unwrap();
        assert_eq!(state, HomeState::default());
        assert!(state.has_no_climate_reading());
    }

    #[test]
    fn test_lenient_field_types() {
        let state = HomeState::from_document(&json!({
            "humidity": "65.5",
            "parking_slots": 3,
            "gas": null,
            "buzzer": true
        }))
        .unwrap();

        assert_eq!(state.humidity, 65.5);
        assert_eq!(state.parking_slots, 3.0);
        assert_eq!(state.gas, PLACEHOLDER);
        assert_eq!(state.buzzer, "true");
    }

    #[test]
    fn test_malformed_door_keeps_snapshot() {
        let state = HomeState::from_document(&json!({
            "lamp": "ON",
            "main_door": "OPEN",
            "side_door": {"access": "Denied", "door_state": "Open"}
        }))
        .unwrap();

        assert_eq!(state.lamp, "ON");
        assert_eq!(state.main_door, DoorStatus::default());
        assert_eq!(state.side_door.door_state, "Open");
    }

    #[test]
    fn test_non_object_root_is_placeholder_snapshot() {
        assert_eq!(HomeState::from_document(&json!("ON")).unwrap(), HomeState::default());
        assert_eq!(HomeState::from_document(&json!([1, 2])).unwrap(), HomeState::default());
    }

    #[test]
    fn test_indicators() {
        let mut state = HomeState::default();
        assert!(!state.gas_detected());
        state.gas = "NO".to_string();
        assert!(!state.gas_detected());
        state.gas = "HIGH".to_string();
        assert!(state.gas_detected());
        state.buzzer = "ON".to_string();
        assert!(state.alarm_active());
    }

    #[test]
    fn test_format_reading() {
        assert_eq!(format_reading(28.0), "28");
        assert_eq!(format_reading(27.5), "27.5");
    }
}
