//! REST client for a Firebase-style realtime database
//!
//! Reads are `GET {path}.json`, writes `PUT`, pushes `POST`, and the live
//! feed is the same root URL requested as `text/event-stream`.

use crate::config::StoreConfig;
use crate::error::{HomeError, Result};
use crate::home::HomeState;
use crate::store::feed::{EventStreamDecoder, FeedUpdate, HomeFeed, ServerEvent};
use crate::store::{path_segments, HomeStore};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, ClientBuilder, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

/// Delay before the live feed reconnects after the stream ends
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// HTTP client for the realtime store
#[derive(Clone)]
pub struct RealtimeDbClient {
    /// HTTP client instance
    client: Client,

    /// Database root, always ending in `/`
    base_url: Url,

    /// Optional auth token, appended as `?auth=`
    auth_token: Option<String>,

    /// Per-request timeout for reads and writes
    timeout: Duration,
}

#[derive(Deserialize)]
struct PushResponse {
    name: String,
}

#[derive(Deserialize)]
struct PutEvent {
    path: String,
    #[serde(default)]
    data: Value,
}

/// What a feed event means for the subscriber
#[derive(Debug, PartialEq)]
enum FeedAction {
    Publish(HomeState),
    Refetch,
    Ignore,
    Stop,
}

impl RealtimeDbClient {
    /// Create a new store client
    pub fn new(config: &StoreConfig) -> Result<Self> {
        // No overall timeout here: the live feed is a never-ending body
        let client = ClientBuilder::new()
            .connect_timeout(config.connect_timeout)
            .user_agent(format!("ewange-home/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HomeError::connection(format!("Failed to build HTTP client: {e}")))?;

        let mut base_url = config.url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client,
            base_url,
            auth_token: config.auth_token.clone(),
            timeout: config.timeout,
        })
    }

    /// Build the REST URL for a store path.
    ///
    /// Segments are percent-encoded onto the database root, so a key can
    /// never change the host or add query parameters.
    fn build_url(&self, path: &str) -> Result<Url> {
        let segments = path_segments(path)?;
        let mut url = self.base_url.clone();
        {
            let mut parts = url.path_segments_mut().map_err(|_| {
                HomeError::config(format!("Store URL {} cannot hold a path", self.base_url))
            })?;
            parts.pop_if_empty();
            match segments.split_last() {
                Some((last, parents)) => {
                    parts.extend(parents);
                    parts.push(&format!("{last}.json"));
                }
                None => {
                    parts.push(".json");
                }
            }
        }

        if let Some(token) = &self.auth_token {
            url.query_pairs_mut().append_pair("auth", token);
        }
        Ok(url)
    }

    /// Send a request and map non-2xx statuses onto the error taxonomy
    async fn execute(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        let response = request.timeout(self.timeout).send().await.map_err(|e| {
            if e.is_timeout() {
                HomeError::timeout(format!("Store request timed out: {e}"))
            } else if e.is_connect() {
                HomeError::connection(format!("Store unreachable: {e}"))
            } else {
                HomeError::Http(e)
            }
        })?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }

    /// Spawn the live feed loop, reconnecting until every receiver is gone
    fn spawn_feed(&self, tx: watch::Sender<FeedUpdate>) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            loop {
                match store.stream_once(&tx).await {
                    Ok(true) => {
                        info!("Live feed closed by the store");
                        break;
                    }
                    Ok(false) => debug!("Live feed ended, reconnecting"),
                    Err(e) => warn!("Live feed error: {e}"),
                }

                tx.send_modify(|update| update.connected = false);
                if tx.is_closed() {
                    break;
                }
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        })
    }

    /// Consume one event-stream connection. `Ok(true)` means the store
    /// cancelled the subscription and it must not be retried.
    async fn stream_once(&self, tx: &watch::Sender<FeedUpdate>) -> Result<bool> {
        let url = self.build_url("")?;
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        info!("Subscribed to live home feed");
        let mut decoder = EventStreamDecoder::new();
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for event in decoder.feed(&chunk) {
                match interpret_event(&event) {
                    FeedAction::Publish(state) => publish(tx, state),
                    FeedAction::Refetch => match self.snapshot().await {
                        Ok(state) => publish(tx, state),
                        Err(e) => warn!("Failed to refresh snapshot: {e}"),
                    },
                    FeedAction::Ignore => {}
                    FeedAction::Stop => return Ok(true),
                }
            }
            if tx.is_closed() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn publish(tx: &watch::Sender<FeedUpdate>, state: HomeState) {
    debug!("Publishing home snapshot");
    tx.send_replace(FeedUpdate {
        state,
        connected: true,
    });
}

/// A root `put` carries the whole document; any other change triggers a
/// re-read so subscribers always get a full snapshot.
fn interpret_event(event: &ServerEvent) -> FeedAction {
    match event.event.as_str() {
        "put" | "patch" => {
            let parsed: PutEvent = match serde_json::from_str(&event.data) {
                Ok(parsed) => parsed,
                Err(e) => {
                    debug!("Dropping malformed feed event: {e}");
                    return FeedAction::Ignore;
                }
            };
            if event.event == "put" && parsed.path == "/" {
                match HomeState::from_document(&parsed.data) {
                    Ok(state) => FeedAction::Publish(state),
                    Err(e) => {
                        debug!("Dropping undecodable snapshot: {e}");
                        FeedAction::Ignore
                    }
                }
            } else {
                FeedAction::Refetch
            }
        }
        "cancel" | "auth_revoked" => {
            warn!("Live feed {}: {}", event.event, event.data);
            FeedAction::Stop
        }
        _ => FeedAction::Ignore,
    }
}

fn status_error(status: StatusCode, body: &str) -> HomeError {
    let message = format!("Store returned {status}: {body}");
    match status.as_u16() {
        401 => HomeError::authentication(message),
        403 => HomeError::permission_denied(message),
        404 => HomeError::not_found(message),
        _ => HomeError::store(message),
    }
}

#[async_trait]
impl HomeStore for RealtimeDbClient {
    async fn read(&self, path: &str) -> Result<Value> {
        let url = self.build_url(path)?;
        debug!("GET {}", path);
        let response = self.execute(self.client.get(url)).await?;
        Ok(response.json().await?)
    }

    async fn set(&self, path: &str, value: Value) -> Result<()> {
        let url = self.build_url(path)?;
        debug!("PUT {}", path);
        let request = if value.is_null() {
            self.client.delete(url)
        } else {
            self.client.put(url).json(&value)
        };
        self.execute(request).await?;
        Ok(())
    }

    async fn push(&self, path: &str, value: Value) -> Result<String> {
        let url = self.build_url(path)?;
        debug!("POST {}", path);
        let response = self.execute(self.client.post(url).json(&value)).await?;
        let pushed: PushResponse = response.json().await?;
        Ok(pushed.name)
    }

    async fn subscribe(&self) -> Result<HomeFeed> {
        let (tx, rx) = watch::channel(FeedUpdate::default());
        let task = self.spawn_feed(tx);
        Ok(HomeFeed::new(rx, Some(task)))
    }
}
