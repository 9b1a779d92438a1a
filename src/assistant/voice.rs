//! Voice input and output
//!
//! Speech engines live outside this crate. Without one, voice features
//! report [`HomeError::Unsupported`] and the caller turns voice mode off.

use crate::assistant::actions::strip_actions;
use crate::error::{HomeError, Result};
use async_trait::async_trait;

/// Speech synthesis
pub trait Speaker: Send + Sync {
    /// Speak `text` as-is
    fn speak(&self, text: &str) -> Result<()>;

    /// Interrupt any speech in progress
    fn stop(&self) -> Result<()> {
        Ok(())
    }
}

/// Speech recognition
#[async_trait]
pub trait Listener: Send + Sync {
    /// Capture one utterance and return its transcript
    async fn listen(&self) -> Result<String>;
}

/// Stand-in used when the platform has no speech support
#[derive(Debug, Default, Clone, Copy)]
pub struct NoVoice;

impl Speaker for NoVoice {
    fn speak(&self, _text: &str) -> Result<()> {
        Err(HomeError::unsupported("Speech synthesis is not supported here"))
    }
}

#[async_trait]
impl Listener for NoVoice {
    async fn listen(&self) -> Result<String> {
        Err(HomeError::unsupported("Speech recognition is not supported here"))
    }
}

/// Speak a reply with its action blocks removed. Empty text is skipped.
pub fn speak_reply(speaker: &dyn Speaker, reply: &str) -> Result<()> {
    let text = strip_actions(reply);
    if text.is_empty() {
        return Ok(());
    }
    speaker.speak(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl Speaker for Recorder {
        fn speak(&self, text: &str) -> Result<()> {
            self.0.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_speaks_clean_text_only() {
        let recorder = Recorder::default();
        speak_reply(
            &recorder,
            "💡 Lamp ON. :::ACTION:::{\"key\":\"lamp\",\"value\":\"ON\"}:::END:::",
        )
        .unwrap();
        speak_reply(&recorder, ":::ACTION:::{}:::END:::").unwrap();
        assert_eq!(*recorder.0.lock().unwrap(), vec!["💡 Lamp ON.".to_string()]);
    }

    #[tokio::test]
    async fn test_no_voice_is_unsupported() {
        assert!(matches!(NoVoice.speak("hi"), Err(HomeError::Unsupported(_))));
        assert!(matches!(NoVoice.listen().await, Err(HomeError::Unsupported(_))));
    }
}
