//! Dashboard view model
//!
//! Turns a [`HomeState`] snapshot into the status tiles the dashboard shows.
//! Everything here is a pure function of the snapshot; writes go through
//! [`DeviceController`].

pub mod control;

pub use control::DeviceController;

use crate::home::{format_reading, HomeState, PLACEHOLDER};
use serde::Serialize;
use std::fmt::{self, Write as _};

/// Visual state of a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TileStatus {
    Active,
    Inactive,
    Alert,
}

/// One status card
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusTile {
    pub title: String,
    pub value: String,
    pub status: TileStatus,
    pub subtitle: Option<String>,
}

impl StatusTile {
    fn new(title: &str, value: &str, status: TileStatus) -> Self {
        Self {
            title: title.to_string(),
            value: value.to_string(),
            status,
            subtitle: None,
        }
    }

    fn with_subtitle(mut self, subtitle: &str) -> Self {
        self.subtitle = Some(subtitle.to_string());
        self
    }
}

/// Door card
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoorTile {
    pub label: String,
    pub access: String,
    pub door_state: String,
    pub authorized: bool,
    pub open: bool,
}

/// How warm the temperature reading is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureLevel {
    Normal,
    /// Above 30 °C
    Warm,
    /// Above 40 °C
    Hot,
}

/// Temperature and humidity gauge
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClimateGauge {
    pub temperature: f64,
    pub humidity: f64,
    /// Temperature on a 0-50 °C scale, clamped to 0-100
    pub temperature_percent: f64,
    pub humidity_percent: f64,
    pub level: TemperatureLevel,
}

impl ClimateGauge {
    pub fn new(temperature: f64, humidity: f64) -> Self {
        let level = if temperature > 40.0 {
            TemperatureLevel::Hot
        } else if temperature > 30.0 {
            TemperatureLevel::Warm
        } else {
            TemperatureLevel::Normal
        };
        Self {
            temperature,
            humidity,
            temperature_percent: (temperature / 50.0 * 100.0).clamp(0.0, 100.0),
            humidity_percent: humidity.clamp(0.0, 100.0),
            level,
        }
    }
}

/// Gate movement as shown on the parking card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GateDirection {
    Up,
    Down,
    Idle,
}

impl GateDirection {
    pub fn from_state(gate_state: &str) -> Self {
        if gate_state.contains("Open") {
            GateDirection::Up
        } else if gate_state.contains("Closed") {
            GateDirection::Down
        } else {
            GateDirection::Idle
        }
    }
}

/// Parking card
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParkingView {
    pub capacity: u32,
    pub free: f64,
    /// `capacity - free`, never below zero
    pub occupied: u32,
    pub gate_state: String,
    pub gate: GateDirection,
}

impl ParkingView {
    pub fn new(free: f64, gate_state: &str, capacity: u32) -> Self {
        let occupied = (f64::from(capacity) - free).clamp(0.0, f64::from(capacity));
        Self {
            capacity,
            free,
            occupied: occupied as u32,
            gate_state: gate_state.to_string(),
            gate: GateDirection::from_state(gate_state),
        }
    }

    /// One flag per slot, `true` when occupied
    pub fn slots(&self) -> Vec<bool> {
        (0..self.capacity).map(|i| i < self.occupied).collect()
    }
}

/// Everything the dashboard shows for one snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub connected: bool,
    pub last_command: String,
    pub doors: Vec<DoorTile>,
    pub buzzer: StatusTile,
    pub climate: ClimateGauge,
    pub lamp: StatusTile,
    pub fan: StatusTile,
    pub curtains: StatusTile,
    pub water_pump: StatusTile,
    pub gas: StatusTile,
    pub parking: ParkingView,
}

fn on_off(value: &str) -> TileStatus {
    if value == "ON" {
        TileStatus::Active
    } else {
        TileStatus::Inactive
    }
}

fn door(label: &str, access: &str, door_state: &str) -> DoorTile {
    DoorTile {
        label: label.to_string(),
        access: access.to_string(),
        door_state: door_state.to_string(),
        authorized: access == "Authorized",
        open: door_state == "Open",
    }
}

fn gas_tile(gas: &str) -> StatusTile {
    if gas != "NO" && gas != PLACEHOLDER {
        StatusTile::new("Gas Sensor", gas, TileStatus::Alert).with_subtitle("Gas detected!")
    } else {
        let value = if gas == "NO" { "Safe" } else { gas };
        StatusTile::new("Gas Sensor", value, TileStatus::Active).with_subtitle("No gas detected")
    }
}

impl DashboardView {
    pub fn from_snapshot(state: &HomeState, connected: bool, parking_capacity: u32) -> Self {
        let buzzer = if state.alarm_active() {
            StatusTile::new("Buzzer", &state.buzzer, TileStatus::Alert)
                .with_subtitle("Alarm triggered")
        } else {
            StatusTile::new("Buzzer", &state.buzzer, TileStatus::Inactive).with_subtitle("Silent")
        };

        let curtains_status = if state.curtains != "Closed" {
            TileStatus::Active
        } else {
            TileStatus::Inactive
        };

        Self {
            connected,
            last_command: state.gsm_last_command.clone(),
            doors: vec![
                door("Main Door", &state.main_door.access, &state.main_door.door_state),
                door("Side Door", &state.side_door.access, &state.side_door.door_state),
            ],
            buzzer,
            climate: ClimateGauge::new(state.temperature, state.humidity),
            lamp: StatusTile::new("Lamp", &state.lamp, on_off(&state.lamp)),
            fan: StatusTile::new("Fan", &state.fan, on_off(&state.fan)),
            curtains: StatusTile::new("Curtains", &state.curtains, curtains_status),
            water_pump: StatusTile::new("Water Pump", &state.water_pump, on_off(&state.water_pump)),
            gas: gas_tile(&state.gas),
            parking: ParkingView::new(state.parking_slots, &state.parking_gate, parking_capacity),
        }
    }

    /// Status tiles in display order
    pub fn tiles(&self) -> [&StatusTile; 6] {
        [
            &self.buzzer,
            &self.lamp,
            &self.fan,
            &self.curtains,
            &self.water_pump,
            &self.gas,
        ]
    }

    /// Tiles currently in alert
    pub fn alerts(&self) -> Vec<&StatusTile> {
        self.tiles()
            .into_iter()
            .filter(|tile| tile.status == TileStatus::Alert)
            .collect()
    }
}

impl fmt::Display for TileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TileStatus::Active => "active",
            TileStatus::Inactive => "inactive",
            TileStatus::Alert => "ALERT",
        })
    }
}

impl fmt::Display for DashboardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        let link = if self.connected { "Live" } else { "Offline" };
        let _ = writeln!(out, "E-wange Home [{link}]  last command: {}", self.last_command);

        for door in &self.doors {
            let _ = writeln!(
                out,
                "  {:<12} {:<10} access: {}",
                door.label, door.door_state, door.access
            );
        }
        let _ = writeln!(
            out,
            "  {:<12} {}°C  {}% humidity",
            "Climate",
            format_reading(self.climate.temperature),
            format_reading(self.climate.humidity)
        );
        for tile in self.tiles() {
            let _ = write!(out, "  {:<12} {:<10} [{}]", tile.title, tile.value, tile.status);
            if let Some(subtitle) = &tile.subtitle {
                let _ = write!(out, " {subtitle}");
            }
            out.push('\n');
        }
        let slots: String = self
            .parking
            .slots()
            .iter()
            .map(|occupied| if *occupied { '■' } else { '□' })
            .collect();
        let gate = match self.parking.gate {
            GateDirection::Up => "▲",
            GateDirection::Down => "▼",
            GateDirection::Idle => "–",
        };
        let _ = write!(
            out,
            "  {:<12} {slots} {} of {} free, gate {} {gate}",
            "Parking",
            format_reading(self.parking.free),
            self.parking.capacity,
            self.parking.gate_state
        );
        f.write_str(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn snapshot() -> HomeState {
        let mut state = HomeState::default();
        state.buzzer = "ON".to_string();
        state.lamp = "OFF".to_string();
        state.fan = "ON".to_string();
        state.curtains = "Partial".to_string();
        state.gas = "NO".to_string();
        state.parking_slots = 3.0;
        state.parking_gate = "Being Closed".to_string();
        state.main_door.access = "Authorized".to_string();
        state.main_door.door_state = "Open".to_string();
        state
    }

    #[test]
    fn test_tiles_follow_snapshot() {
        let view = DashboardView::from_snapshot(&snapshot(), true, 5);
        assert_eq!(view.buzzer.status, TileStatus::Alert);
        assert_eq!(view.buzzer.subtitle.as_deref(), Some("Alarm triggered"));
        assert_eq!(view.lamp.status, TileStatus::Inactive);
        assert_eq!(view.fan.status, TileStatus::Active);
        assert_eq!(view.curtains.status, TileStatus::Active);
        assert_eq!(view.gas.value, "Safe");
        assert_eq!(view.gas.status, TileStatus::Active);
        assert!(view.doors[0].authorized && view.doors[0].open);
        assert_eq!(view.alerts().len(), 1);
    }

    #[test]
    fn test_gas_tile() {
        assert_eq!(gas_tile(PLACEHOLDER).status, TileStatus::Active);
        assert_eq!(gas_tile(PLACEHOLDER).value, PLACEHOLDER);
        let alert = gas_tile("HIGH");
        assert_eq!(alert.status, TileStatus::Alert);
        assert_eq!(alert.subtitle.as_deref(), Some("Gas detected!"));
    }

    #[test]
    fn test_parking_view() {
        let parking = ParkingView::new(3.0, "Being Closed", 5);
        assert_eq!(parking.occupied, 2);
        assert_eq!(parking.gate, GateDirection::Down);
        assert_eq!(parking.slots(), vec![true, true, false, false, false]);

        assert_eq!(ParkingView::new(7.0, "Open", 5).occupied, 0);
        assert_eq!(GateDirection::from_state(PLACEHOLDER), GateDirection::Idle);
    }

    #[test]
    fn test_climate_gauge() {
        let gauge = ClimateGauge::new(60.0, 120.0);
        assert_eq!(gauge.temperature_percent, 100.0);
        assert_eq!(gauge.humidity_percent, 100.0);
        assert_eq!(gauge.level, TemperatureLevel::Hot);
        assert_eq!(ClimateGauge::new(31.0, 0.0).level, TemperatureLevel::Warm);
    }

    #[test]
    fn test_text_rendering() {
        let text = DashboardView::from_snapshot(&snapshot(), false, 5).to_string();
        assert!(text.starts_with("E-wange Home [Offline]"));
        assert!(text.contains("■■□□□ 3 of 5 free"));
    }
}
