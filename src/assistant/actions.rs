//! Action blocks embedded in assistant replies
//!
//! The assistant requests device writes by embedding
//! `:::ACTION:::{"key":"lamp","value":"ON"}:::END:::` in its reply text.

use crate::home::DeviceAction;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static ACTION_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s):::ACTION:::(.*?):::END:::").expect("action block pattern is valid")
});

/// Every well-formed action block in `text`, in order of appearance.
///
/// Each block is parsed on its own; a malformed one is skipped.
pub fn extract_actions(text: &str) -> Vec<DeviceAction> {
    ACTION_BLOCK
        .captures_iter(text)
        .filter_map(|captures| {
            let body = captures.get(1)?.as_str();
            match serde_json::from_str::<DeviceAction>(body) {
                Ok(action) => Some(action),
                Err(e) => {
                    debug!("Skipping malformed action block {body:?}: {e}");
                    None
                }
            }
        })
        .collect()
}

/// Reply text with every action block removed, trimmed
pub fn strip_actions(text: &str) -> String {
    ACTION_BLOCK.replace_all(text, "").trim().to_string()
}

/// Does the text contain at least one action block
pub fn has_actions(text: &str) -> bool {
    ACTION_BLOCK.is_match(text)
}
