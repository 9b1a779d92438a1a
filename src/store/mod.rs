//! Realtime key/value store access
//!
//! The home is mirrored in a tree-shaped store. Every change notification is
//! treated as the authoritative full state; there is no delta protocol on
//! top of it.

pub mod feed;
pub mod http;
pub mod memory;

pub use feed::{FeedUpdate, HomeFeed};
pub use http::RealtimeDbClient;
pub use memory::MemoryStore;

use crate::error::{HomeError, Result};
use crate::home::{DeviceAction, HomeState};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// Characters the store does not allow inside a key
pub const FORBIDDEN_KEY_CHARS: [char; 5] = ['.', '#', '$', '[', ']'];

/// Characters that would change how a key resolves inside a request URL
pub const RESERVED_PATH_CHARS: [char; 4] = [':', '?', '%', '\\'];

fn is_disallowed(c: char) -> bool {
    FORBIDDEN_KEY_CHARS.contains(&c) || RESERVED_PATH_CHARS.contains(&c)
}

/// Trait for realtime store implementations
#[async_trait]
pub trait HomeStore: Send + Sync {
    /// Read the value at `path` (`""` is the root); missing paths are `null`
    async fn read(&self, path: &str) -> Result<Value>;

    /// Overwrite the value at `path`; writing `null` deletes it
    async fn set(&self, path: &str, value: Value) -> Result<()>;

    /// Append under `path` with a generated, time-ordered key
    async fn push(&self, path: &str, value: Value) -> Result<String>;

    /// Subscribe to whole-document snapshots
    async fn subscribe(&self) -> Result<HomeFeed>;

    /// Delete the value at `path`
    async fn remove(&self, path: &str) -> Result<()> {
        self.set(path, Value::Null).await
    }

    /// Read the whole document as a snapshot
    async fn snapshot(&self) -> Result<HomeState> {
        let document = self.read("").await?;
        HomeState::from_document(&document)
    }

    /// Write a single device action as a plain string value
    async fn write_action(&self, action: &DeviceAction) -> Result<()> {
        if !action.is_complete() {
            return Err(HomeError::invalid_input(format!(
                "Device action needs a key and a value, got '{action}'"
            )));
        }
        debug!(key = %action.key, value = %action.value, "Writing device action");
        self.set(&action.key, Value::String(action.value.clone()))
            .await
    }
}

/// Normalize a store path into its segments, rejecting forbidden characters
pub fn path_segments(path: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    for segment in &segments {
        if segment.contains(is_disallowed) {
            return Err(HomeError::invalid_input(format!(
                "Invalid store path '{path}': segment '{segment}' has a reserved character \
                 (. # $ [ ] : ? % \\)"
            )));
        }
    }
    Ok(segments)
}

/// Replace characters the store forbids in keys with `_`
pub fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if is_disallowed(c) || c == '/' {
                '_'
            } else {
                c
            }
        })
        .collect()
}
