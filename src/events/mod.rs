//! Assistant lifecycle events and the status they drive
//!
//! Events arrive from the assistant engine in emission order and are consumed
//! exactly once by the [`Dispatcher`](crate::dispatcher::Dispatcher).
//! Engines that talk JSON send one [`WireEvent`] per line; [`AssistantEvent::from_wire`]
//! turns those into the closed enum the dispatcher matches on.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Result;

/// A lifecycle event emitted by the assistant engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistantEvent {
    /// The session is up and waiting for the hot word
    SessionStarted,
    /// A conversational turn began (hot word heard)
    TurnStarted,
    /// Speech recognition finished with the given transcript
    UtteranceRecognized {
        /// Recognized text, as delivered by the engine
        text: String,
    },
    /// The user stopped speaking
    UtteranceEnded,
    /// The conversational turn is over
    TurnFinished,
    /// The engine reported an error
    AssistantError {
        /// Whether the engine cannot continue
        fatal: bool,
    },
    /// The engine finished speaking text it was asked to say
    SayFinished,
    /// Any event type the dispatcher has no use for
    Other(String),
}

/// Raw event as written by an engine bridge: `{"type": "...", "args": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireEvent {
    /// Event type name
    #[serde(rename = "type")]
    pub kind: String,

    /// Event arguments, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<serde_json::Value>,
}

impl AssistantEvent {
    /// Convert a wire event into an [`AssistantEvent`]
    ///
    /// Type names are matched case-insensitively and an `on_` prefix is
    /// optional, so both `ON_START_FINISHED` and `session_started` work.
    #[must_use]
    pub fn from_wire(wire: WireEvent) -> Self {
        let name = wire.kind.trim().to_lowercase();
        let name = name.strip_prefix("on_").unwrap_or(&name);

        match name {
            "start_finished" | "session_started" => Self::SessionStarted,
            "conversation_turn_started" | "turn_started" => Self::TurnStarted,
            "recognizing_speech_finished" | "utterance_recognized" => {
                let text = wire
                    .args
                    .as_ref()
                    .and_then(|a| a.get("text"))
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Self::UtteranceRecognized { text }
            }
            "end_of_utterance" | "utterance_ended" => Self::UtteranceEnded,
            "conversation_turn_finished" | "turn_finished" => Self::TurnFinished,
            "assistant_error" | "error" => {
                let fatal = wire
                    .args
                    .as_ref()
                    .and_then(|a| a.get("is_fatal"))
                    .and_then(serde_json::Value::as_bool)
                    .unwrap_or(false);
                Self::AssistantError { fatal }
            }
            "say_finished" => Self::SayFinished,
            _ => Self::Other(wire.kind),
        }
    }

    /// Parse one JSON line written by an engine bridge
    ///
    /// # Errors
    ///
    /// Returns error if the line is not a JSON object with a `type` field
    pub fn parse_line(line: &str) -> Result<Self> {
        let wire: WireEvent = serde_json::from_str(line)?;
        Ok(Self::from_wire(wire))
    }

    /// Short name used in logs
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::SessionStarted => "session_started",
            Self::TurnStarted => "turn_started",
            Self::UtteranceRecognized { .. } => "utterance_recognized",
            Self::UtteranceEnded => "utterance_ended",
            Self::TurnFinished => "turn_finished",
            Self::AssistantError { .. } => "assistant_error",
            Self::SayFinished => "say_finished",
            Self::Other(kind) => kind,
        }
    }
}

/// Assistant status shown on the indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Idle, waiting for the hot word
    Ready,
    /// Capturing the user's speech
    Listening,
    /// Speech captured, waiting on the engine
    Thinking,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::Listening => write!(f, "listening"),
            Self::Thinking => write!(f, "thinking"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_names_decode() {
        let ev = AssistantEvent::parse_line(r#"{"type": "ON_START_FINISHED"}"#).unwrap();
        assert_eq!(ev, AssistantEvent::SessionStarted);

        let ev = AssistantEvent::parse_line(
            r#"{"type": "ON_RECOGNIZING_SPEECH_FINISHED", "args": {"text": "Power Off"}}"#,
        )
        .unwrap();
        assert_eq!(
            ev,
            AssistantEvent::UtteranceRecognized {
                text: "Power Off".to_string()
            }
        );

        let ev = AssistantEvent::parse_line(r#"{"type": "on_end_of_utterance"}"#).unwrap();
        assert_eq!(ev, AssistantEvent::UtteranceEnded);
    }

    #[test]
    fn short_names_decode() {
        let ev = AssistantEvent::parse_line(r#"{"type": "turn_started"}"#).unwrap();
        assert_eq!(ev, AssistantEvent::TurnStarted);

        let ev = AssistantEvent::parse_line(r#"{"type": "turn_finished"}"#).unwrap();
        assert_eq!(ev, AssistantEvent::TurnFinished);
    }

    #[test]
    fn error_fatal_flag() {
        let ev = AssistantEvent::parse_line(
            r#"{"type": "ON_ASSISTANT_ERROR", "args": {"is_fatal": true}}"#,
        )
        .unwrap();
        assert_eq!(ev, AssistantEvent::AssistantError { fatal: true });

        // Missing args means not fatal
        let ev = AssistantEvent::parse_line(r#"{"type": "ON_ASSISTANT_ERROR"}"#).unwrap();
        assert_eq!(ev, AssistantEvent::AssistantError { fatal: false });
    }

    #[test]
    fn say_finished_decodes() {
        let ev = AssistantEvent::parse_line(r#"{"type": "ON_SAY_FINISHED"}"#).unwrap();
        assert_eq!(ev, AssistantEvent::SayFinished);
        assert_eq!(ev.name(), "say_finished");
    }

    #[test]
    fn recognized_without_args_has_empty_text() {
        let ev = AssistantEvent::parse_line(r#"{"type": "utterance_recognized"}"#).unwrap();
        assert_eq!(
            ev,
            AssistantEvent::UtteranceRecognized {
                text: String::new()
            }
        );
    }

    #[test]
    fn unknown_type_is_other() {
        let ev = AssistantEvent::parse_line(r#"{"type": "ON_ALERT_STARTED", "args": {}}"#).unwrap();
        assert_eq!(ev, AssistantEvent::Other("ON_ALERT_STARTED".to_string()));
        assert_eq!(ev.name(), "ON_ALERT_STARTED");
    }

    #[test]
    fn malformed_line_is_error() {
        assert!(AssistantEvent::parse_line("not json").is_err());
        assert!(AssistantEvent::parse_line(r#"{"args": {}}"#).is_err());
    }

    #[test]
    fn status_display() {
        assert_eq!(Status::Ready.to_string(), "ready");
        assert_eq!(Status::Listening.to_string(), "listening");
        assert_eq!(Status::Thinking.to_string(), "thinking");
    }
}
