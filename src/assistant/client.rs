//! Streaming chat endpoint client

use crate::assistant::stream::{ReplyStreamParser, StreamEvent};
use crate::assistant::ChatMessage;
use crate::auth::Role;
use crate::config::AssistantConfig;
use crate::error::{HomeError, Result};
use crate::home::HomeState;
use futures_util::StreamExt;
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Shown when a non-2xx reply carries no readable error
pub const DEFAULT_FAILURE_MESSAGE: &str = "Request failed";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest<'a> {
    messages: &'a [ChatMessage],
    home_data: &'a HomeState,
    user_role: Role,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Client for the streaming assistant endpoint
#[derive(Clone)]
pub struct AssistantClient {
    client: Client,
    chat_url: Url,
    api_key: Option<String>,
    max_line_retries: u32,
}

impl AssistantClient {
    /// Create a client; fails when no chat URL is configured
    pub fn new(config: &AssistantConfig, connect_timeout: Duration) -> Result<Self> {
        let chat_url = config
            .chat_url
            .clone()
            .ok_or_else(|| HomeError::config("No chat endpoint configured"))?;

        // Streaming replies have no overall deadline
        let client = ClientBuilder::new()
            .connect_timeout(connect_timeout)
            .user_agent(format!("ewange-home/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HomeError::connection(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            chat_url,
            api_key: config.api_key.clone(),
            max_line_retries: config.max_line_retries,
        })
    }

    pub fn chat_url(&self) -> &Url {
        &self.chat_url
    }

    /// Send the conversation and stream the reply.
    ///
    /// `on_update` receives the whole reply text each time a chunk adds to
    /// it, so a caller that records it keeps the partial reply if the stream
    /// breaks.
    /// Returns the final text.
    pub async fn stream_reply<F>(
        &self,
        messages: &[ChatMessage],
        home: &HomeState,
        role: Role,
        mut on_update: F,
    ) -> Result<String>
    where
        F: FnMut(&str),
    {
        let body = ChatRequest {
            messages,
            home_data: home,
            user_role: role,
        };

        let mut request = self.client.post(self.chat_url.clone()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        debug!(messages = messages.len(), %role, "Sending chat request");
        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                HomeError::connection(format!("Chat endpoint unreachable: {e}"))
            } else {
                HomeError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());
            warn!("Chat endpoint returned {status}: {message}");
            return Err(HomeError::assistant(message));
        }

        let mut parser = ReplyStreamParser::new(self.max_line_retries);
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| {
                warn!("Chat stream interrupted: {e}");
                HomeError::Http(e)
            })?;
            if apply_events(parser.feed(&chunk), parser.text(), &mut on_update) {
                break;
            }
        }
        if !parser.is_done() {
            apply_events(parser.finish(), parser.text(), &mut on_update);
        }

        info!(chars = parser.text().len(), "Chat reply complete");
        Ok(parser.into_text())
    }
}

/// Notify the callback if text grew; `true` once the stream is done
fn apply_events<F: FnMut(&str)>(events: Vec<StreamEvent>, text: &str, on_update: &mut F) -> bool {
    let mut grew = false;
    let mut done = false;
    for event in events {
        match event {
            StreamEvent::Delta(_) => grew = true,
            StreamEvent::Done => done = true,
        }
    }
    if grew {
        on_update(text);
    }
    done
}
