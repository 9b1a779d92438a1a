//! Local intent matching for common status questions and device commands
//!
//! Utterances such as "what's the temperature?" or "turn on the lamp" are
//! answered without a round-trip to the assistant endpoint. Both tables are
//! ordered: status queries are tried first, then (for admins only) device
//! commands, and the first group with a matching pattern wins.

use crate::auth::Role;
use crate::error::{HomeError, Result};
use crate::home::{format_reading, DeviceAction, HomeState, PLACEHOLDER};
use regex::{Regex, RegexBuilder};
use std::fmt;

/// Builds a status answer from the current snapshot
pub type StatusResponder = Box<dyn Fn(&HomeState) -> String + Send + Sync>;

/// Locally produced answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickReply {
    pub response_text: String,
    pub action: Option<DeviceAction>,
}

/// A status question and how to answer it
pub struct StatusQuery {
    pub name: String,
    patterns: Vec<Regex>,
    respond: StatusResponder,
}

impl fmt::Debug for StatusQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusQuery")
            .field("name", &self.name)
            .field("patterns", &self.patterns.len())
            .finish()
    }
}

/// A device command with its target write and confirmation
#[derive(Debug)]
pub struct DeviceCommand {
    pub name: String,
    patterns: Vec<Regex>,
    pub action: DeviceAction,
    pub confirmation: String,
}

fn compile(patterns: &[&str]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| HomeError::config(format!("Invalid command pattern {pattern:?}: {e}")))
        })
        .collect()
}

impl StatusQuery {
    pub fn new<F>(name: impl Into<String>, patterns: &[&str], respond: F) -> Result<Self>
    where
        F: Fn(&HomeState) -> String + Send + Sync + 'static,
    {
        Ok(Self {
            name: name.into(),
            patterns: compile(patterns)?,
            respond: Box::new(respond),
        })
    }

    pub fn matches(&self, utterance: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(utterance))
    }

    pub fn respond(&self, state: &HomeState) -> String {
        (self.respond)(state)
    }
}

impl DeviceCommand {
    pub fn new(
        name: impl Into<String>,
        patterns: &[&str],
        action: DeviceAction,
        confirmation: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            patterns: compile(patterns)?,
            action,
            confirmation: confirmation.into(),
        })
    }

    pub fn matches(&self, utterance: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(utterance))
    }
}

/// Ordered status and command tables
#[derive(Debug, Default)]
pub struct QuickCommandMatcher {
    status_queries: Vec<StatusQuery>,
    commands: Vec<DeviceCommand>,
}

impl QuickCommandMatcher {
    /// Matcher with no groups
    pub fn empty() -> Self {
        Self::default()
    }

    /// Matcher with the built-in status and command tables
    pub fn with_builtin_tables() -> Result<Self> {
        Ok(Self {
            status_queries: builtin_status_queries()?,
            commands: builtin_commands()?,
        })
    }

    /// Append a status group after the existing ones
    pub fn add_status_query(&mut self, query: StatusQuery) {
        self.status_queries.push(query);
    }

    /// Append a command group after the existing ones
    pub fn add_command(&mut self, command: DeviceCommand) {
        self.commands.push(command);
    }

    pub fn status_queries(&self) -> &[StatusQuery] {
        &self.status_queries
    }

    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    /// Decide whether `utterance` can be answered locally.
    ///
    /// Status queries are answered for every role. Device commands only
    /// match for admins; a viewer's command falls through to `None`.
    pub fn match_utterance(
        &self,
        utterance: &str,
        role: Role,
        state: &HomeState,
    ) -> Option<QuickReply> {
        let utterance = utterance.trim();
        if utterance.is_empty() {
            return None;
        }

        if let Some(query) = self.status_queries.iter().find(|q| q.matches(utterance)) {
            return Some(QuickReply {
                response_text: query.respond(state),
                action: None,
            });
        }

        if role != Role::Admin {
            return None;
        }

        self.commands
            .iter()
            .find(|c| c.matches(utterance))
            .map(|command| QuickReply {
                response_text: command.confirmation.clone(),
                action: Some(command.action.clone()),
            })
    }
}

fn show(value: &str) -> &str {
    if value.is_empty() {
        PLACEHOLDER
    } else {
        value
    }
}

fn climate_reply(state: &HomeState) -> String {
    format!(
        "🌡️ {}°C, {}% humidity.",
        format_reading(state.temperature),
        format_reading(state.humidity)
    )
}

fn gas_reply(state: &HomeState) -> String {
    if state.gas == "NO" {
        "✅ No gas detected.".to_string()
    } else if state.gas == PLACEHOLDER {
        "❔ Gas sensor has no reading yet.".to_string()
    } else {
        format!("⚠️ Gas detected ({})!", state.gas)
    }
}

fn doors_reply(state: &HomeState) -> String {
    format!(
        "🚪 Main door {} (access {}), side door {} (access {}).",
        show(&state.main_door.door_state),
        show(&state.main_door.access),
        show(&state.side_door.door_state),
        show(&state.side_door.access)
    )
}

fn parking_reply(state: &HomeState) -> String {
    let free = format_reading(state.parking_slots);
    let noun = if state.parking_slots == 1.0 { "slot" } else { "slots" };
    format!(
        "🚗 {free} parking {noun} free, gate {}.",
        show(&state.parking_gate)
    )
}

fn summary_reply(state: &HomeState) -> String {
    format!(
        "🏠 {}°C, {}% humidity. Lamp {}, fan {}, curtains {}, pump {}. \
         Gas {}. Gate {}, {} free slots.",
        format_reading(state.temperature),
        format_reading(state.humidity),
        show(&state.lamp),
        show(&state.fan),
        show(&state.curtains),
        show(&state.water_pump),
        show(&state.gas),
        show(&state.parking_gate),
        format_reading(state.parking_slots)
    )
}

fn builtin_status_queries() -> Result<Vec<StatusQuery>> {
    Ok(vec![
        StatusQuery::new(
            "climate",
            &[
                r"\btemp(erature)?\b.*\bhumid(ity)?\b",
                r"\bhumid(ity)?\b.*\btemp(erature)?\b",
                r"\bclimate\b",
            ],
            climate_reply,
        )?,
        StatusQuery::new(
            "temperature",
            &[r"\btemp(erature)?\b", r"\bhow\s+(hot|cold|warm)\b"],
            |state| {
                format!(
                    "🌡️ Temperature is {}°C.",
                    format_reading(state.temperature)
                )
            },
        )?,
        StatusQuery::new("humidity", &[r"\bhumid(ity)?\b"], |state| {
            format!("💧 Humidity is {}%.", format_reading(state.humidity))
        })?,
        StatusQuery::new("gas", &[r"\bgas\b", r"\b(smoke|leak)\b"], gas_reply)?,
        StatusQuery::new("doors", &[r"\bdoors?\b"], doors_reply)?,
        StatusQuery::new(
            "parking",
            &[
                r"\bparking\s+(slots?|spaces?|spots?|status)\b",
                r"\bhow\s+many\s+(free\s+)?(slots?|spaces?|spots?)\b",
                r"\b(is|are)\s+(the\s+)?(parking\s+)?gate\s+(open|closed)\b",
                r"\bgate\s+status\b",
            ],
            parking_reply,
        )?,
        StatusQuery::new(
            "summary",
            &[
                r"\bstatus\b",
                r"\boverview\b",
                r"\bsummary\b",
                r"\bhow\s+is\s+(my\s+|the\s+)?(home|house)\b",
            ],
            summary_reply,
        )?,
    ])
}

fn switch_patterns(nouns: &str, on: bool) -> Vec<String> {
    let (state, verbs) = if on {
        ("on", "start|activate|enable")
    } else {
        ("off", "stop|deactivate|disable")
    };
    vec![
        format!(r"\b(turn|switch|put)\s+{state}\s+(the\s+)?({nouns})\b"),
        format!(r"\b(turn|switch|put)\s+(the\s+)?({nouns})\s+{state}\b"),
        format!(r"\b({nouns})\s+{state}\b"),
        format!(r"\b({verbs})\s+(the\s+)?({nouns})\b"),
    ]
}

fn switch_command(
    name: &str,
    key: &str,
    nouns: &str,
    extra: &[&str],
    on: bool,
    confirmation: &str,
) -> Result<DeviceCommand> {
    let mut patterns = switch_patterns(nouns, on);
    patterns.extend(extra.iter().map(|p| p.to_string()));
    let refs: Vec<&str> = patterns.iter().map(String::as_str).collect();
    let value = if on { "ON" } else { "OFF" };
    DeviceCommand::new(name, &refs, DeviceAction::new(key, value), confirmation)
}

fn builtin_commands() -> Result<Vec<DeviceCommand>> {
    const CURTAINS: &str = r"curtains?|blinds?";
    const GATE: &str = r"(parking\s+)?gate";

    Ok(vec![
        switch_command("lamp on", "lamp", r"lamp|lights?", &[], true, "💡 Lamp ON.")?,
        switch_command("lamp off", "lamp", r"lamp|lights?", &[], false, "💡 Lamp OFF.")?,
        switch_command("fan on", "fan", "fan", &[], true, "🌀 Fan ON.")?,
        switch_command("fan off", "fan", "fan", &[], false, "🌀 Fan OFF.")?,
        switch_command(
            "pump on",
            "water_pump",
            r"(water\s+)?pump",
            &[],
            true,
            "💧 Water pump ON.",
        )?,
        switch_command(
            "pump off",
            "water_pump",
            r"(water\s+)?pump",
            &[],
            false,
            "💧 Water pump OFF.",
        )?,
        switch_command(
            "buzzer on",
            "buzzer",
            r"buzzer|alarm|siren",
            &[r"\b(sound|trigger|ring)\s+(the\s+)?(buzzer|alarm|siren)\b"],
            true,
            "🚨 Buzzer ON.",
        )?,
        switch_command(
            "buzzer off",
            "buzzer",
            r"buzzer|alarm|siren",
            &[r"\b(silence|mute)\s+(the\s+)?(buzzer|alarm|siren)\b"],
            false,
            "🔕 Buzzer OFF.",
        )?,
        DeviceCommand::new(
            "curtains partial",
            &[
                &format!(r"\b(partially|half)[\s-]*(open|close)\s+(the\s+)?({CURTAINS})\b"),
                &format!(r"\b({CURTAINS})\s+(half|partial(ly)?)\b"),
            ],
            DeviceAction::new("curtains", "Partial"),
            "🪟 Curtains half open.",
        )?,
        DeviceCommand::new(
            "curtains open",
            &[
                &format!(r"\bopen\s+(the\s+)?({CURTAINS})\b"),
                &format!(r"\b({CURTAINS})\s+open\b"),
                &format!(r"\bdraw\s+back\s+(the\s+)?({CURTAINS})\b"),
            ],
            DeviceAction::new("curtains", "Open"),
            "🪟 Curtains opened.",
        )?,
        DeviceCommand::new(
            "curtains closed",
            &[
                &format!(r"\b(close|shut|draw)\s+(the\s+)?({CURTAINS})\b"),
                &format!(r"\b({CURTAINS})\s+(closed?|shut)\b"),
            ],
            DeviceAction::new("curtains", "Closed"),
            "🪟 Curtains closed.",
        )?,
        DeviceCommand::new(
            "gate open",
            &[
                &format!(r"\b(open|raise|lift)\s+(the\s+)?{GATE}\b"),
                r"\bgate\s+open\b",
            ],
            DeviceAction::new("parking_gate", "Open"),
            "🚗 Gate opened.",
        )?,
        DeviceCommand::new(
            "gate closed",
            &[
                &format!(r"\b(close|shut|lower)\s+(the\s+)?{GATE}\b"),
                r"\bgate\s+(closed?|shut)\b",
            ],
            DeviceAction::new("parking_gate", "Closed"),
            "🚗 Gate closed.",
        )?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn state() -> HomeState {
        HomeState {
            temperature: 28.0,
            humidity: 65.0,
            gas: "NO".to_string(),
            parking_slots: 1.0,
            parking_gate: "Closed".to_string(),
            ..HomeState::default()
        }
    }

    #[test]
    fn test_status_query_any_role() {
        let matcher = QuickCommandMatcher::with_builtin_tables().unwrap();
        for role in [Role::Admin, Role::Viewer] {
            let reply = matcher
                .match_utterance("What's the temperature?", role, &state())
                .unwrap();
            assert_eq!(reply.response_text, "🌡️ Temperature is 28°C.");
            assert_eq!(reply.action, None);
        }
    }

    #[test]
    fn test_climate_group_wins_over_temperature() {
        let matcher = QuickCommandMatcher::with_builtin_tables().unwrap();
        let reply = matcher
            .match_utterance("temperature and humidity please", Role::Viewer, &state())
            .unwrap();
        assert_eq!(reply.response_text, "🌡️ 28°C, 65% humidity.");
    }

    #[test]
    fn test_command_requires_admin() {
        let matcher = QuickCommandMatcher::with_builtin_tables().unwrap();
        assert_eq!(
            matcher.match_utterance("Turn on the lamp", Role::Viewer, &state()),
            None
        );

        let reply = matcher
            .match_utterance("Turn on the lamp", Role::Admin, &state())
            .unwrap();
        assert_eq!(reply.action, Some(DeviceAction::new("lamp", "ON")));
        assert_eq!(reply.response_text, "💡 Lamp ON.");
    }

    #[test]
    fn test_partial_before_open() {
        let matcher = QuickCommandMatcher::with_builtin_tables().unwrap();
        let reply = matcher
            .match_utterance("half open the curtains", Role::Admin, &state())
            .unwrap();
        assert_eq!(reply.action, Some(DeviceAction::new("curtains", "Partial")));
    }

    #[test]
    fn test_custom_groups_append() {
        let mut matcher = QuickCommandMatcher::empty();
        matcher.add_status_query(
            StatusQuery::new("gsm", &[r"\bgsm\b"], |s| s.gsm_last_command.clone()).unwrap(),
        );
        let reply = matcher
            .match_utterance("last GSM command?", Role::Viewer, &state())
            .unwrap();
        assert_eq!(reply.response_text, PLACEHOLDER);
        assert!(StatusQuery::new("bad", &["("], |_| String::new()).is_err());
    }
}
