//! Temperature and humidity history
//!
//! [`HistoryLogger`] watches snapshots and appends a `{value, timestamp}`
//! entry whenever a reading changes. The query side filters entries by
//! [`TimeRange`], merges both series into rows and exports them as CSV.

use crate::error::Result;
use crate::home::{format_reading, HomeState};
use crate::store::HomeStore;
use chrono::{SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// Which series an entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    Temperature,
    Humidity,
}

impl HistoryKind {
    /// Store path of the series
    pub fn path(&self) -> &'static str {
        match self {
            HistoryKind::Temperature => "temperature_history",
            HistoryKind::Humidity => "humidity_history",
        }
    }
}

impl fmt::Display for HistoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HistoryKind::Temperature => "temperature",
            HistoryKind::Humidity => "humidity",
        })
    }
}

/// One recorded reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub value: f64,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

/// Records readings that differ from the previous one.
///
/// The first reading after start-up only primes the logger, and the
/// all-zero placeholder snapshot is ignored entirely.
#[derive(Debug, Default)]
pub struct HistoryLogger {
    last_temperature: Option<f64>,
    last_humidity: Option<f64>,
}

impl HistoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries `state` produces at time `now_ms`, updating the last-seen
    /// readings. Does not touch the store.
    pub fn observe(&mut self, state: &HomeState, now_ms: i64) -> Vec<(HistoryKind, HistoryEntry)> {
        if state.has_no_climate_reading() {
            return Vec::new();
        }

        let mut entries = Vec::new();
        let readings = [
            (HistoryKind::Temperature, state.temperature, &mut self.last_temperature),
            (HistoryKind::Humidity, state.humidity, &mut self.last_humidity),
        ];
        for (kind, value, last) in readings {
            if matches!(*last, Some(previous) if previous != value) {
                entries.push((
                    kind,
                    HistoryEntry {
                        value,
                        timestamp: now_ms,
                    },
                ));
            }
            *last = Some(value);
        }
        entries
    }

    /// Observe a snapshot and push any new entries to the store.
    ///
    /// Push failures are logged; the logger still advances.
    pub async fn record(&mut self, store: &dyn HomeStore, state: &HomeState) -> usize {
        let now = Utc::now().timestamp_millis();
        let mut written = 0;
        for (kind, entry) in self.observe(state, now) {
            match store.push(kind.path(), json!(entry)).await {
                Ok(key) => {
                    debug!(%kind, value = entry.value, key, "Logged reading");
                    written += 1;
                }
                Err(e) => warn!(%kind, "Failed to log reading: {e}"),
            }
        }
        written
    }
}

/// Preset query windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeRange {
    OneHour,
    #[default]
    Day,
    Week,
}

impl TimeRange {
    pub fn all() -> [TimeRange; 3] {
        [TimeRange::OneHour, TimeRange::Day, TimeRange::Week]
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeRange::OneHour => "1 Hour",
            TimeRange::Day => "24 Hours",
            TimeRange::Week => "7 Days",
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            TimeRange::OneHour => Duration::from_secs(60 * 60),
            TimeRange::Day => Duration::from_secs(24 * 60 * 60),
            TimeRange::Week => Duration::from_secs(7 * 24 * 60 * 60),
        }
    }

    /// Oldest timestamp (ms) still inside the window ending at `now_ms`
    pub fn cutoff(&self, now_ms: i64) -> i64 {
        now_ms - self.duration().as_millis() as i64
    }

    /// Default export file name, e.g. `ewange-history-24-Hours.csv`
    pub fn file_name(&self) -> String {
        format!("ewange-history-{}.csv", self.label().replacen(' ', "-", 1))
    }
}

impl FromStr for TimeRange {
    type Err = crate::error::HomeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1h" | "hour" | "1 hour" => Ok(TimeRange::OneHour),
            "24h" | "day" | "24 hours" => Ok(TimeRange::Day),
            "7d" | "week" | "7 days" => Ok(TimeRange::Week),
            other => Err(crate::error::HomeError::invalid_input(format!(
                "Unknown time range '{other}' (expected 1h, 24h or 7d)"
            ))),
        }
    }
}

/// One merged row; a series without an entry at this timestamp is `None`
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    pub timestamp: i64,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

/// Entries of a stored push-keyed map; malformed children are skipped
pub fn parse_series(value: &Value) -> Vec<HistoryEntry> {
    let Some(map) = value.as_object() else {
        return Vec::new();
    };
    map.values()
        .filter_map(|child| serde_json::from_value(child.clone()).ok())
        .collect()
}

/// Read one series from the store
pub async fn load_series(store: &dyn HomeStore, kind: HistoryKind) -> Result<Vec<HistoryEntry>> {
    Ok(parse_series(&store.read(kind.path()).await?))
}

/// Merge both series into rows keyed by sorted unique timestamps, keeping
/// only entries at or after `cutoff`
pub fn merge_series(
    temperature: &[HistoryEntry],
    humidity: &[HistoryEntry],
    cutoff: i64,
) -> Vec<HistoryRow> {
    // First entry at a timestamp wins within each series
    let mut temps: BTreeMap<i64, f64> = BTreeMap::new();
    let mut humids: BTreeMap<i64, f64> = BTreeMap::new();
    for entry in temperature.iter().filter(|e| e.timestamp >= cutoff) {
        temps.entry(entry.timestamp).or_insert(entry.value);
    }
    for entry in humidity.iter().filter(|e| e.timestamp >= cutoff) {
        humids.entry(entry.timestamp).or_insert(entry.value);
    }

    let mut rows: BTreeMap<i64, HistoryRow> = BTreeMap::new();
    for (&timestamp, &value) in &temps {
        rows.entry(timestamp)
            .or_insert_with(|| empty_row(timestamp))
            .temperature = Some(value);
    }
    for (&timestamp, &value) in &humids {
        rows.entry(timestamp)
            .or_insert_with(|| empty_row(timestamp))
            .humidity = Some(value);
    }
    rows.into_values().collect()
}

fn empty_row(timestamp: i64) -> HistoryRow {
    HistoryRow {
        timestamp,
        temperature: None,
        humidity: None,
    }
}

fn format_timestamp(timestamp: i64) -> String {
    match Utc.timestamp_millis_opt(timestamp).single() {
        Some(time) => time.to_rfc3339_opts(SecondsFormat::Secs, true),
        None => timestamp.to_string(),
    }
}

/// CSV with a `Timestamp,Temperature,Humidity` header; missing values are
/// empty cells
pub fn to_csv(rows: &[HistoryRow]) -> String {
    let mut lines = vec!["Timestamp,Temperature,Humidity".to_string()];
    for row in rows {
        lines.push(format!(
            "{},{},{}",
            format_timestamp(row.timestamp),
            row.temperature.map(format_reading).unwrap_or_default(),
            row.humidity.map(format_reading).unwrap_or_default()
        ));
    }
    lines.join("\n")
}

/// Load both series and merge them for `range`, ending now
pub async fn query(store: &dyn HomeStore, range: TimeRange) -> Result<Vec<HistoryRow>> {
    let temperature = load_series(store, HistoryKind::Temperature).await?;
    let humidity = load_series(store, HistoryKind::Humidity).await?;
    let cutoff = range.cutoff(Utc::now().timestamp_millis());
    Ok(merge_series(&temperature, &humidity, cutoff))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;

    fn climate(temperature: f64, humidity: f64) -> HomeState {
        HomeState {
            temperature,
            humidity,
            ..HomeState::default()
        }
    }

    #[test]
    fn test_logger_skips_first_and_placeholder() {
        let mut logger = HistoryLogger::new();
        assert!(logger.observe(&climate(0.0, 0.0), 1).is_empty());
        assert!(logger.observe(&climate(25.0, 60.0), 2).is_empty());
        assert!(logger.observe(&climate(0.0, 0.0), 3).is_empty());
        assert!(logger.observe(&climate(25.0, 60.0), 4).is_empty());

        let entries = logger.observe(&climate(26.0, 60.0), 5);
        assert_eq!(
            entries,
            vec![(
                HistoryKind::Temperature,
                HistoryEntry {
                    value: 26.0,
                    timestamp: 5
                }
            )]
        );
    }

    #[tokio::test]
    async fn test_record_pushes_to_store() {
        let store = MemoryStore::new();
        let mut logger = HistoryLogger::new();
        logger.record(&store, &climate(20.0, 50.0)).await;
        assert_eq!(logger.record(&store, &climate(21.0, 55.0)).await, 2);

        let temps = load_series(&store, HistoryKind::Temperature).await.unwrap();
        assert_eq!(temps.len(), 1);
        assert_eq!(temps[0].value, 21.0);
    }

    #[test]
    fn test_merge_and_csv() {
        let temps = [
            HistoryEntry { value: 21.5, timestamp: 2_000 },
            HistoryEntry { value: 20.0, timestamp: 1_000 },
            HistoryEntry { value: 19.0, timestamp: 10 },
        ];
        let humid = [
            HistoryEntry { value: 40.0, timestamp: 2_000 },
            HistoryEntry { value: 45.0, timestamp: 3_000 },
        ];

        let rows = merge_series(&temps, &humid, 500);
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0],
            HistoryRow { timestamp: 1_000, temperature: Some(20.0), humidity: None }
        );

        let csv = to_csv(&rows);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Timestamp,Temperature,Humidity");
        assert_eq!(lines[1], "1970-01-01T00:00:01Z,20,");
        assert_eq!(lines[2], "1970-01-01T00:00:02Z,21.5,40");
        assert_eq!(lines[3], "1970-01-01T00:00:03Z,,45");
    }

    #[test]
    fn test_time_range() {
        assert_eq!(TimeRange::Day.file_name(), "ewange-history-24-Hours.csv");
        assert_eq!(TimeRange::OneHour.file_name(), "ewange-history-1-Hour.csv");
        assert_eq!(TimeRange::Week.cutoff(TimeRange::Week.duration().as_millis() as i64), 0);
        assert_eq!("7d".parse::<TimeRange>().unwrap(), TimeRange::Week);
        assert!("month".parse::<TimeRange>().is_err());
    }

    #[test]
    fn test_parse_series_skips_malformed() {
        let value = serde_json::json!({
            "-a": {"value": 20, "timestamp": 1},
            "-b": {"value": "hot"},
        });
        assert_eq!(parse_series(&value), vec![HistoryEntry { value: 20.0, timestamp: 1 }]);
    }
}
