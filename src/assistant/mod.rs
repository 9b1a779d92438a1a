//! Conversational assistant
//!
//! - [`quick_command`]: local regex tables for status questions and commands
//! - [`stream`]: incremental parser for the streamed reply
//! - [`actions`]: `:::ACTION:::` blocks embedded in replies
//! - [`client`]: HTTP client for the chat endpoint
//! - [`conversation`]: message history and the exchange flow
//! - [`voice`]: speech input/output seams

pub mod actions;
pub mod client;
pub mod conversation;
pub mod quick_command;
pub mod stream;
pub mod voice;

pub use actions::{extract_actions, strip_actions};
pub use client::AssistantClient;
pub use conversation::{ChatReply, ChatSession, ReplySource};
pub use quick_command::{DeviceCommand, QuickCommandMatcher, QuickReply, StatusQuery};
pub use stream::{ReplyStreamParser, StreamEvent};
pub use voice::{Listener, NoVoice, Speaker};

use serde::{Deserialize, Serialize};

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// One entry of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}
