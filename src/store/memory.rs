//! In-process store
//!
//! Holds the whole document as a JSON tree and publishes a fresh snapshot
//! after every write. Used by tests and the CLI `--offline` mode.

use crate::error::{HomeError, Result};
use crate::home::HomeState;
use crate::store::feed::{FeedUpdate, HomeFeed};
use crate::store::{path_segments, HomeStore};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::debug;

/// In-memory realtime store
#[derive(Clone)]
pub struct MemoryStore {
    document: Arc<RwLock<Value>>,
    updates: Arc<watch::Sender<FeedUpdate>>,
    push_counter: Arc<AtomicU64>,
    failing_keys: Arc<HashSet<String>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::with_document(Value::Null)
    }

    /// Create a store seeded with a document
    pub fn with_document(document: Value) -> Self {
        let initial = FeedUpdate {
            state: HomeState::from_document(&document).unwrap_or_default(),
            connected: true,
        };
        let (tx, _rx) = watch::channel(initial);
        Self {
            document: Arc::new(RwLock::new(document)),
            updates: Arc::new(tx),
            push_counter: Arc::new(AtomicU64::new(0)),
            failing_keys: Arc::new(HashSet::new()),
        }
    }

    /// Make every write whose first path segment is `key` fail
    pub fn with_failing_key(mut self, key: impl Into<String>) -> Self {
        let mut keys = (*self.failing_keys).clone();
        keys.insert(key.into());
        self.failing_keys = Arc::new(keys);
        self
    }

    /// Copy of the whole document
    pub async fn document(&self) -> Value {
        self.document.read().await.clone()
    }

    fn check_writable(&self, segments: &[&str]) -> Result<()> {
        match segments.first() {
            Some(first) if self.failing_keys.contains(*first) => Err(HomeError::store(format!(
                "Write to '{first}' rejected"
            ))),
            _ => Ok(()),
        }
    }

    fn publish(&self, document: &Value) {
        match HomeState::from_document(document) {
            Ok(state) => {
                self.updates.send_replace(FeedUpdate {
                    state,
                    connected: true,
                });
            }
            Err(e) => debug!("Snapshot not published: {e}"),
        }
    }

    /// Time-ordered push key: millisecond timestamp plus a sequence number
    fn next_push_key(&self) -> String {
        let seq = self.push_counter.fetch_add(1, Ordering::Relaxed);
        format!("-{:013}{:06}", chrono::Utc::now().timestamp_millis(), seq)
    }
}

fn lookup<'a>(document: &'a Value, segments: &[&str]) -> &'a Value {
    let mut current = document;
    for segment in segments {
        match current.get(*segment) {
            Some(next) => current = next,
            None => return &Value::Null,
        }
    }
    current
}

fn assign(document: &mut Value, segments: &[&str], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        *document = value;
        return;
    };

    let mut current = document;
    for segment in parents {
        if !current.is_object() {
            if value.is_null() {
                return;
            }
            *current = Value::Object(Map::new());
        }
        current = match current {
            Value::Object(map) => map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
            _ => return,
        };
    }

    if value.is_null() {
        if let Value::Object(map) = current {
            map.remove(*last);
        }
        return;
    }
    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    if let Value::Object(map) = current {
        map.insert(last.to_string(), value);
    }
}

#[async_trait]
impl HomeStore for MemoryStore {
    async fn read(&self, path: &str) -> Result<Value> {
        let segments = path_segments(path)?;
        let document = self.document.read().await;
        Ok(lookup(&document, &segments).clone())
    }

    async fn set(&self, path: &str, value: Value) -> Result<()> {
        let segments = path_segments(path)?;
        self.check_writable(&segments)?;
        let mut document = self.document.write().await;
        assign(&mut document, &segments, value);
        self.publish(&document);
        Ok(())
    }

    async fn push(&self, path: &str, value: Value) -> Result<String> {
        let segments = path_segments(path)?;
        self.check_writable(&segments)?;
        let key = self.next_push_key();
        let mut full: Vec<&str> = segments;
        full.push(&key);
        let mut document = self.document.write().await;
        assign(&mut document, &full, value);
        self.publish(&document);
        Ok(key)
    }

    async fn subscribe(&self) -> Result<HomeFeed> {
        Ok(HomeFeed::new(self.updates.subscribe(), None))
    }
}
