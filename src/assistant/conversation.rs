//! A chat conversation with the home assistant
//!
//! Each exchange first tries the local quick-command tables and falls back
//! to the streaming assistant. Device actions from either source are
//! written to the store one by one; a failed write is logged and the rest
//! still run.

use crate::assistant::actions::{extract_actions, strip_actions};
use crate::assistant::client::AssistantClient;
use crate::assistant::quick_command::QuickCommandMatcher;
use crate::assistant::voice::{speak_reply, Speaker};
use crate::assistant::{ChatMessage, MessageRole};
use crate::auth::Session;
use crate::error::{HomeError, Result};
use crate::home::{DeviceAction, HomeState};
use crate::store::HomeStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Where a reply came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    QuickCommand,
    Assistant,
}

/// Result of one exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    /// Reply with action blocks removed
    pub display_text: String,
    /// Actions requested by the reply, in order
    pub actions: Vec<DeviceAction>,
    /// Actions whose write failed
    pub failed_actions: Vec<DeviceAction>,
    pub source: ReplySource,
}

/// Clears the busy flag when an exchange ends, however it ends
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Conversation state shared by every exchange
pub struct ChatSession {
    store: Arc<dyn HomeStore>,
    assistant: Option<AssistantClient>,
    matcher: QuickCommandMatcher,
    messages: Mutex<Vec<ChatMessage>>,
    busy: AtomicBool,
    speaker: Option<Box<dyn Speaker>>,
    voice: AtomicBool,
}

impl ChatSession {
    pub fn new(
        store: Arc<dyn HomeStore>,
        assistant: Option<AssistantClient>,
        matcher: QuickCommandMatcher,
    ) -> Self {
        Self {
            store,
            assistant,
            matcher,
            messages: Mutex::new(Vec::new()),
            busy: AtomicBool::new(false),
            speaker: None,
            voice: AtomicBool::new(false),
        }
    }

    /// Attach a speech engine and turn voice replies on
    pub fn with_speaker(mut self, speaker: Box<dyn Speaker>) -> Self {
        self.speaker = Some(speaker);
        self.voice.store(true, Ordering::Relaxed);
        self
    }

    pub fn set_voice(&self, enabled: bool) {
        self.voice.store(enabled && self.speaker.is_some(), Ordering::Relaxed);
    }

    pub fn voice_enabled(&self) -> bool {
        self.voice.load(Ordering::Relaxed)
    }

    /// An exchange is in flight
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Copy of the conversation so far
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.lock_messages().clone()
    }

    pub fn clear(&self) {
        self.lock_messages().clear();
    }

    fn lock_messages(&self) -> MutexGuard<'_, Vec<ChatMessage>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one exchange.
    ///
    /// Blank input is ignored (`Ok(None)`). A second call while one is in
    /// flight fails with [`HomeError::Busy`]; without a session it fails with
    /// [`HomeError::Authentication`]. Both checks happen before anything is
    /// recorded.
    pub async fn send(
        &self,
        session: Option<&Session>,
        text: &str,
        home: &HomeState,
    ) -> Result<Option<ChatReply>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(HomeError::busy("A chat request is already in progress"));
        }
        let _guard = BusyGuard(&self.busy);

        let session =
            session.ok_or_else(|| HomeError::authentication("Sign in to use the assistant"))?;

        self.lock_messages().push(ChatMessage::user(text));

        if let Some(quick) = self.matcher.match_utterance(text, session.role, home) {
            debug!("Answered locally: {}", quick.response_text);
            self.lock_messages()
                .push(ChatMessage::assistant(quick.response_text.clone()));

            let actions: Vec<DeviceAction> = quick.action.into_iter().collect();
            let failed_actions = self.apply_actions(session, &actions).await;
            self.speak(&quick.response_text);

            return Ok(Some(ChatReply {
                display_text: quick.response_text,
                actions,
                failed_actions,
                source: ReplySource::QuickCommand,
            }));
        }

        let assistant = self
            .assistant
            .as_ref()
            .ok_or_else(|| HomeError::config("No chat endpoint configured"))?;

        let history = self.messages();
        let reply = assistant
            .stream_reply(&history, home, session.role, |partial| {
                upsert_assistant(&mut self.lock_messages(), partial)
            })
            .await?;

        let actions = extract_actions(&reply);
        let failed_actions = if actions.is_empty() {
            Vec::new()
        } else if session.is_admin() {
            self.apply_actions(session, &actions).await
        } else {
            warn!(
                user_id = %session.user_id,
                "Ignoring {} device action(s) in reply to a viewer",
                actions.len()
            );
            Vec::new()
        };

        self.speak(&reply);

        Ok(Some(ChatReply {
            display_text: strip_actions(&reply),
            actions,
            failed_actions,
            source: ReplySource::Assistant,
        }))
    }

    /// Write each action in order; failures are logged and returned
    async fn apply_actions(
        &self,
        session: &Session,
        actions: &[DeviceAction],
    ) -> Vec<DeviceAction> {
        let mut failed = Vec::new();
        for action in actions {
            match self.store.write_action(action).await {
                Ok(()) => info!(user_id = %session.user_id, %action, "Applied device action"),
                Err(e) => {
                    warn!(%action, "Device action failed: {e}");
                    failed.push(action.clone());
                }
            }
        }
        failed
    }

    fn speak(&self, reply: &str) {
        if !self.voice_enabled() {
            return;
        }
        let Some(speaker) = &self.speaker else {
            return;
        };
        match speak_reply(speaker.as_ref(), reply) {
            Ok(()) => {}
            Err(HomeError::Unsupported(reason)) => {
                warn!("Voice output disabled: {reason}");
                self.voice.store(false, Ordering::Relaxed);
            }
            Err(e) => warn!("Voice output failed: {e}"),
        }
    }
}

/// Replace the trailing assistant message with `text`, or append one
fn upsert_assistant(messages: &mut Vec<ChatMessage>, text: &str) {
    match messages.last_mut() {
        Some(last) if last.role == MessageRole::Assistant => {
            last.content.clear();
            last.content.push_str(text);
        }
        _ => messages.push(ChatMessage::assistant(text)),
    }
}
