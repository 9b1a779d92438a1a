//! History logging, querying and CSV export through the store

use chrono::Utc;
use ewange_home::history::{self, HistoryKind, HistoryLogger, TimeRange};
use ewange_home::store::{HomeStore, MemoryStore};
use ewange_home::HomeState;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;

fn climate(temperature: f64, humidity: f64) -> HomeState {
    HomeState {
        temperature,
        humidity,
        ..HomeState::default()
    }
}

#[tokio::test]
async fn test_logger_feeds_query() {
    let store = MemoryStore::new();
    let mut logger = HistoryLogger::new();

    assert_eq!(logger.record(&store, &climate(22.0, 50.0)).await, 0);
    assert_eq!(logger.record(&store, &climate(22.0, 50.0)).await, 0);
    assert_eq!(logger.record(&store, &climate(23.0, 50.0)).await, 1);
    assert_eq!(logger.record(&store, &climate(23.0, 52.5)).await, 1);

    let rows = history::query(&store, TimeRange::OneHour).await.unwrap();
    let temperatures: Vec<f64> = rows.iter().filter_map(|r| r.temperature).collect();
    let humidities: Vec<f64> = rows.iter().filter_map(|r| r.humidity).collect();
    assert_eq!(temperatures, vec![23.0]);
    assert_eq!(humidities, vec![52.5]);
}

#[tokio::test]
async fn test_query_filters_by_range() {
    let now = Utc::now().timestamp_millis();
    let two_hours_ago = now - 2 * 60 * 60 * 1000;
    let store = MemoryStore::with_document(json!({
        "temperature_history": {
            "-a": {"value": 30, "timestamp": two_hours_ago},
            "-b": {"value": 31, "timestamp": now - 1000}
        },
        "humidity_history": {
            "-c": {"value": 70, "timestamp": now - 1000}
        }
    }));

    let hour = history::query(&store, TimeRange::OneHour).await.unwrap();
    assert_eq!(hour.len(), 1);
    assert_eq!(hour[0].temperature, Some(31.0));
    assert_eq!(hour[0].humidity, Some(70.0));

    let day = history::query(&store, TimeRange::Day).await.unwrap();
    assert_eq!(day.len(), 2);
    assert_eq!(day[0].humidity, None);
}

#[tokio::test]
async fn test_empty_store_exports_header_only() {
    let store = MemoryStore::new();
    let rows = history::query(&store, TimeRange::Week).await.unwrap();
    assert_eq!(history::to_csv(&rows), "Timestamp,Temperature,Humidity");
}

#[tokio::test]
async fn test_entries_land_under_series_paths() {
    let store = MemoryStore::new();
    let mut logger = HistoryLogger::new();
    logger.record(&store, &climate(20.0, 40.0)).await;
    logger.record(&store, &climate(21.0, 40.0)).await;

    let series = store.read(HistoryKind::Temperature.path()).await.unwrap();
    assert_eq!(series.as_object().unwrap().len(), 1);
    assert!(store.read(HistoryKind::Humidity.path()).await.unwrap().is_null());
}

#[rstest]
#[case("1h", TimeRange::OneHour, "ewange-history-1-Hour.csv")]
#[case("24h", TimeRange::Day, "ewange-history-24-Hours.csv")]
#[case("7d", TimeRange::Week, "ewange-history-7-Days.csv")]
fn test_range_names(#[case] input: &str, #[case] range: TimeRange, #[case] file_name: &str) {
    assert_eq!(input.parse::<TimeRange>().unwrap(), range);
    assert_eq!(range.file_name(), file_name);
}
