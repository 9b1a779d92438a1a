//! Actuators and the key/value writes that drive them

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single key/value write destined for the realtime store.
///
/// Only presence is checked; the store accepts arbitrary keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceAction {
    pub key: String,
    pub value: String,
}

impl DeviceAction {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Both key and value are non-empty
    pub fn is_complete(&self) -> bool {
        !self.key.trim().is_empty() && !self.value.trim().is_empty()
    }
}

impl fmt::Display for DeviceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Controllable devices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actuator {
    Lamp,
    Fan,
    Curtains,
    WaterPump,
    ParkingGate,
    Buzzer,
}

impl Actuator {
    pub fn all() -> [Actuator; 6] {
        [
            Actuator::Lamp,
            Actuator::Fan,
            Actuator::Curtains,
            Actuator::WaterPump,
            Actuator::ParkingGate,
            Actuator::Buzzer,
        ]
    }

    /// Store key written when the actuator changes
    pub fn key(&self) -> &'static str {
        match self {
            Actuator::Lamp => "lamp",
            Actuator::Fan => "fan",
            Actuator::Curtains => "curtains",
            Actuator::WaterPump => "water_pump",
            Actuator::ParkingGate => "parking_gate",
            Actuator::Buzzer => "buzzer",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Actuator::Lamp => "Lamp",
            Actuator::Fan => "Fan",
            Actuator::Curtains => "Curtains",
            Actuator::WaterPump => "Water Pump",
            Actuator::ParkingGate => "Parking Gate",
            Actuator::Buzzer => "Buzzer",
        }
    }

    /// Values the device understands
    pub fn values(&self) -> &'static [&'static str] {
        match self {
            Actuator::Curtains => &["Open", "Closed", "Partial"],
            Actuator::ParkingGate => &["Open", "Closed"],
            _ => &["ON", "OFF"],
        }
    }

    /// Label written for the "on" side of a toggle
    pub fn on_label(&self) -> &'static str {
        match self {
            Actuator::Curtains | Actuator::ParkingGate => "Open",
            _ => "ON",
        }
    }

    /// Label written for the "off" side of a toggle
    pub fn off_label(&self) -> &'static str {
        match self {
            Actuator::Curtains | Actuator::ParkingGate => "Closed",
            _ => "OFF",
        }
    }

    /// Case-insensitive match against the known values, returning the
    /// canonical spelling
    pub fn canonical_value(&self, value: &str) -> Option<&'static str> {
        self.values()
            .iter()
            .copied()
            .find(|v| v.eq_ignore_ascii_case(value.trim()))
    }

    pub fn action(&self, value: &str) -> DeviceAction {
        DeviceAction::new(self.key(), value)
    }
}

impl FromStr for Actuator {
    type Err = crate::error::HomeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "lamp" | "light" => Ok(Actuator::Lamp),
            "fan" => Ok(Actuator::Fan),
            "curtains" | "curtain" => Ok(Actuator::Curtains),
            "water_pump" | "pump" => Ok(Actuator::WaterPump),
            "parking_gate" | "gate" => Ok(Actuator::ParkingGate),
            "buzzer" | "alarm" => Ok(Actuator::Buzzer),
            _ => Err(crate::error::HomeError::not_found(format!(
                "Unknown actuator '{s}'"
            ))),
        }
    }
}

impl fmt::Display for Actuator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("Water Pump".parse::<Actuator>().unwrap(), Actuator::WaterPump);
        assert_eq!("gate".parse::<Actuator>().unwrap(), Actuator::ParkingGate);
        assert!("toaster".parse::<Actuator>().is_err());
    }

    #[test]
    fn test_canonical_value() {
        assert_eq!(Actuator::Curtains.canonical_value("partial"), Some("Partial"));
        assert_eq!(Actuator::Lamp.canonical_value(" on "), Some("ON"));
        assert_eq!(Actuator::ParkingGate.canonical_value("Partial"), None);
    }

    #[test]
    fn test_action_completeness() {
        assert!(Actuator::Fan.action("OFF").is_complete());
        assert!(!DeviceAction::new("", "ON").is_complete());
        assert_eq!(Actuator::WaterPump.action("ON").to_string(), "water_pump=ON");
    }
}
