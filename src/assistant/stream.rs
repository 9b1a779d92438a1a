//! Incremental parser for streamed assistant replies
//!
//! The chat endpoint answers with newline-delimited `data: <json>` lines in
//! the chat-completions delta format, ending with `data: [DONE]`.

use crate::utils::{LineBuffer, Utf8ChunkDecoder};
use serde_json::Value;
use tracing::debug;

const DATA_PREFIX: &str = "data: ";
const DONE_MARKER: &str = "[DONE]";

/// Output of one feed step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A content fragment appended to the reply
    Delta(String),
    /// The terminating `[DONE]` line was seen
    Done,
}

/// Line that failed to parse and was pushed back for another attempt
#[derive(Debug)]
struct PendingRetry {
    line: String,
    attempts: u32,
}

/// Parses a reply stream chunk by chunk, accumulating the reply text.
///
/// A line that is not valid JSON is put back at the front of the buffer and
/// processing pauses until more bytes arrive. After `max_line_retries`
/// further failures the line is dropped so the rest of the stream still
/// parses.
#[derive(Debug)]
pub struct ReplyStreamParser {
    decoder: Utf8ChunkDecoder,
    lines: LineBuffer,
    text: String,
    done: bool,
    max_line_retries: u32,
    retry: Option<PendingRetry>,
}

impl Default for ReplyStreamParser {
    fn default() -> Self {
        Self::new(1)
    }
}

enum LineOutcome {
    Continue,
    Pause,
}

impl ReplyStreamParser {
    pub fn new(max_line_retries: u32) -> Self {
        Self {
            decoder: Utf8ChunkDecoder::new(),
            lines: LineBuffer::new(),
            text: String::new(),
            done: false,
            max_line_retries,
            retry: None,
        }
    }

    /// Reply text accumulated so far
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// `[DONE]` has been seen
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed raw bytes, returning the events they completed
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        if self.done {
            return Vec::new();
        }
        let decoded = self.decoder.decode(chunk);
        self.lines.push_str(&decoded);
        self.drain_lines(true)
    }

    /// End of stream: process what is left, including an unterminated last
    /// line. Lines that still fail to parse are dropped.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        if self.done {
            return Vec::new();
        }
        let tail = self.decoder.finish();
        self.lines.push_str(&tail);

        let mut events = self.drain_lines(false);
        if !self.done && !self.lines.is_empty() {
            let last = self.lines.take_remainder();
            self.handle_line(last, false, &mut events);
        }
        events
    }

    fn drain_lines(&mut self, allow_retry: bool) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while !self.done {
            let Some(line) = self.lines.next_line() else {
                break;
            };
            if let LineOutcome::Pause = self.handle_line(line, allow_retry, &mut events) {
                break;
            }
        }
        events
    }

    fn handle_line(
        &mut self,
        line: String,
        allow_retry: bool,
        events: &mut Vec<StreamEvent>,
    ) -> LineOutcome {
        let line = line.strip_suffix('\r').map(str::to_string).unwrap_or(line);
        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            return LineOutcome::Continue;
        };
        let payload = payload.trim();

        if payload == DONE_MARKER {
            self.done = true;
            self.retry = None;
            events.push(StreamEvent::Done);
            return LineOutcome::Continue;
        }

        match serde_json::from_str::<Value>(payload) {
            Ok(json) => {
                self.retry = None;
                if let Some(content) = delta_content(&json) {
                    if !content.is_empty() {
                        self.text.push_str(content);
                        events.push(StreamEvent::Delta(content.to_string()));
                    }
                }
                LineOutcome::Continue
            }
            Err(e) => {
                let attempts = match &self.retry {
                    Some(pending) if pending.line == line => pending.attempts,
                    _ => 0,
                };
                if allow_retry && attempts < self.max_line_retries {
                    self.lines.push_front_line(&line);
                    self.retry = Some(PendingRetry {
                        line,
                        attempts: attempts + 1,
                    });
                    LineOutcome::Pause
                } else {
                    debug!("Dropping unparseable stream line after {attempts} retries: {e}");
                    self.retry = None;
                    LineOutcome::Continue
                }
            }
        }
    }
}

fn delta_content(json: &Value) -> Option<&str> {
    json.get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()
}
