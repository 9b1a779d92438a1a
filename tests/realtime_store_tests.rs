//! Realtime store client against a mocked database

mod common;

use common::{home_document, sse_body, store_config};
use ewange_home::store::{HomeStore, RealtimeDbClient};
use ewange_home::{DeviceAction, HomeError};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn setup() -> (MockServer, RealtimeDbClient) {
    let server = MockServer::start().await;
    let client = RealtimeDbClient::new(&store_config(&server.uri())).unwrap();
    (server, client)
}

#[tokio::test]
async fn test_snapshot_reads_root_with_auth() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/.json"))
        .and(query_param("auth", "db-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(home_document()))
        .expect(1)
        .mount(&server)
        .await;

    let state = client.snapshot().await.unwrap();
    assert_eq!(state.lamp, "ON");
    assert_eq!(state.temperature, 27.5);
    assert_eq!(state.side_door.door_state, "Open");
}

#[tokio::test]
async fn test_write_action_puts_string_value() {
    let (server, client) = setup().await;
    Mock::given(method("PUT"))
        .and(path("/fan.json"))
        .and(body_json(json!("ON")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("ON")))
        .expect(1)
        .mount(&server)
        .await;

    client
        .write_action(&DeviceAction::new("fan", "ON"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_incomplete_action_is_rejected_locally() {
    let (_server, client) = setup().await;
    let result = client.write_action(&DeviceAction::new("fan", " ")).await;
    assert!(matches!(result, Err(HomeError::InvalidInput(_))));
}

#[tokio::test]
async fn test_remove_sends_delete() {
    let (server, client) = setup().await;
    Mock::given(method("DELETE"))
        .and(path("/devices/relay_1.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    client.remove("devices/relay_1").await.unwrap();
}

#[tokio::test]
async fn test_push_returns_generated_key() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/temperature_history.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "-Nabc123"})))
        .mount(&server)
        .await;

    let key = client
        .push("temperature_history", json!({"value": 26, "timestamp": 1}))
        .await
        .unwrap();
    assert_eq!(key, "-Nabc123");
}

#[tokio::test]
async fn test_status_mapping() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/settings.json"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "Permission denied"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/lamp.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(matches!(
        client.read("settings").await,
        Err(HomeError::Authentication(_))
    ));
    assert!(matches!(
        client.set("lamp", json!("ON")).await,
        Err(HomeError::Store(_))
    ));
}

#[tokio::test]
async fn test_forbidden_path_characters() {
    let (_server, client) = setup().await;
    assert!(matches!(
        client.read("devices/relay.1").await,
        Err(HomeError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_live_feed_publishes_root_put() {
    let (server, client) = setup().await;
    let body = sse_body(&[
        ("keep-alive", json!(null)),
        ("put", json!({"path": "/", "data": home_document()})),
    ]);
    Mock::given(method("GET"))
        .and(path("/.json"))
        .and(header("accept", "text/event-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let mut feed = client.subscribe().await.unwrap();
    let update = tokio::time::timeout(Duration::from_secs(5), feed.changed())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(update.state.lamp, "ON");
    assert_eq!(update.state.parking_slots, 2.0);
}

#[tokio::test]
async fn test_live_feed_refetches_on_partial_change() {
    let (server, client) = setup().await;
    let body = sse_body(&[("patch", json!({"path": "/", "data": {"fan": "ON"}}))]);
    Mock::given(method("GET"))
        .and(path("/.json"))
        .and(header("accept", "text/event-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let mut document = home_document();
    document["fan"] = json!("ON");
    Mock::given(method("GET"))
        .and(path("/.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(document))
        .mount(&server)
        .await;

    let mut feed = client.subscribe().await.unwrap();
    let update = tokio::time::timeout(Duration::from_secs(5), feed.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(update.state.fan, "ON");
}

#[tokio::test]
async fn test_hostile_action_key_never_leaves_database() {
    let (server, client) = setup().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("ON")))
        .expect(0)
        .mount(&server)
        .await;

    let port = server.address().port();
    let key = format!("http:/127%2E0%2E0%2E1:{port}?");
    let result = client.write_action(&DeviceAction::new(key, "ON")).await;
    assert!(matches!(result, Err(HomeError::InvalidInput(_))));
}

#[tokio::test]
async fn test_key_with_spaces_is_encoded() {
    let (server, client) = setup().await;
    Mock::given(method("PUT"))
        .and(path("/living%20room/lamp.json"))
        .and(query_param("auth", "db-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("ON")))
        .expect(1)
        .mount(&server)
        .await;

    client
        .write_action(&DeviceAction::new("living room/lamp", "ON"))
        .await
        .unwrap();
}
