//! Live snapshot feed
//!
//! A subscription publishes whole-home snapshots through a `watch` channel.
//! Receivers always see the most recent snapshot; intermediate ones may be
//! skipped.

use crate::home::HomeState;
use crate::utils::{LineBuffer, Utf8ChunkDecoder};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Snapshot plus connection flag
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedUpdate {
    pub state: HomeState,
    pub connected: bool,
}

/// Handle to a running subscription; dropping it stops the background task
#[derive(Debug)]
pub struct HomeFeed {
    receiver: watch::Receiver<FeedUpdate>,
    task: Option<JoinHandle<()>>,
}

impl HomeFeed {
    pub fn new(receiver: watch::Receiver<FeedUpdate>, task: Option<JoinHandle<()>>) -> Self {
        Self { receiver, task }
    }

    /// Latest snapshot
    pub fn current(&self) -> FeedUpdate {
        self.receiver.borrow().clone()
    }

    /// Wait for the next update; `None` once the publisher is gone
    pub async fn changed(&mut self) -> Option<FeedUpdate> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Clone of the underlying receiver for additional consumers
    pub fn receiver(&self) -> watch::Receiver<FeedUpdate> {
        self.receiver.clone()
    }
}

impl Drop for HomeFeed {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// One server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEvent {
    pub event: String,
    pub data: String,
}

/// Decoder for `text/event-stream` bodies (`event:` / `data:` fields,
/// dispatched on a blank line)
#[derive(Debug, Default)]
pub struct EventStreamDecoder {
    text: Utf8ChunkDecoder,
    lines: LineBuffer,
    event: Option<String>,
    data: Vec<String>,
}

impl EventStreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes, returning every event completed by them
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<ServerEvent> {
        let decoded = self.text.decode(chunk);
        self.lines.push_str(&decoded);

        let mut events = Vec::new();
        while let Some(line) = self.lines.next_line() {
            if line.is_empty() {
                if let Some(event) = self.dispatch() {
                    events.push(event);
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line.as_str(), ""),
            };

            match field {
                "event" => self.event = Some(value.to_string()),
                "data" => self.data.push(value.to_string()),
                _ => {}
            }
        }
        events
    }

    fn dispatch(&mut self) -> Option<ServerEvent> {
        let event = self.event.take();
        if self.data.is_empty() && event.is_none() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(ServerEvent {
            event: event.unwrap_or_else(|| "message".to_string()),
            data,
        })
    }
}
