//! Shared fixtures for integration tests

#![allow(dead_code)]

use ewange_home::config::{AdminConfig, AssistantConfig, StoreConfig};
use ewange_home::{Role, Session};
use serde_json::{json, Value};
use std::time::Duration;

pub fn admin() -> Session {
    Session::new("admin-1", Some("admin@example.com".to_string()), Role::Admin)
}

pub fn viewer() -> Session {
    Session::new("viewer-1", Some("viewer@example.com".to_string()), Role::Viewer)
}

pub fn store_config(uri: &str) -> StoreConfig {
    StoreConfig {
        url: uri.parse().unwrap(),
        auth_token: Some("db-token".to_string()),
        timeout: Duration::from_secs(2),
        connect_timeout: Duration::from_secs(2),
    }
}

pub fn assistant_config(uri: &str) -> AssistantConfig {
    AssistantConfig {
        chat_url: Some(format!("{uri}/chat").parse().unwrap()),
        api_key: Some("chat-key".to_string()),
        ..AssistantConfig::default()
    }
}

pub fn admin_config(uri: &str) -> AdminConfig {
    AdminConfig {
        url: Some(format!("{uri}/admin").parse().unwrap()),
        access_token: Some("access-token".to_string()),
    }
}

/// A populated home document as the realtime database stores it
pub fn home_document() -> Value {
    json!({
        "main_door": {"access": "Authorized", "door_state": "Closed"},
        "side_door": {"access": "Denied", "door_state": "Open"},
        "buzzer": "OFF",
        "lamp": "ON",
        "fan": "OFF",
        "curtains": "Partial",
        "temperature": "27.5",
        "humidity": 61,
        "gas": "NO",
        "parking_slots": 2,
        "parking_gate": "Closed",
        "water_pump": "OFF",
        "gsm_last_command": "LAMP ON",
        "users": {
            "admin-1": {"role": "admin"},
            "viewer-1": {"role": "viewer"}
        }
    })
}

/// `text/event-stream` body from `(event, data)` pairs
pub fn sse_body(events: &[(&str, Value)]) -> String {
    events
        .iter()
        .map(|(event, data)| format!("event: {event}\ndata: {data}\n\n"))
        .collect()
}

/// Chat-completions delta stream from content fragments, optionally ending
/// with `[DONE]`
pub fn chat_stream(fragments: &[&str], done: bool) -> String {
    let mut body: String = fragments
        .iter()
        .map(|fragment| {
            format!(
                "data: {}\n\n",
                json!({"choices": [{"delta": {"content": fragment}}]})
            )
        })
        .collect();
    if done {
        body.push_str("data: [DONE]\n\n");
    }
    body
}
