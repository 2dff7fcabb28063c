//! Stream-json wire messages
//!
//! The CLI reads one [`UserInput`] per line on stdin and writes a stream of
//! tagged events on stdout. Every event carries a top-level `"type"`; only a
//! `result` event with subtype `success` and a structured payload ends an
//! exchange. Everything else is accepted and ignored.
//!
//! ```text
//! -> {"type":"user","message":{"role":"user","content":"..."}}
//! <- {"type":"system","subtype":"init",...}
//! <- {"type":"assistant","message":{...}}
//! <- {"type":"result","subtype":"success","structured_output":{...},...}
//! ```

use crate::error::{ProtocolError, Result};
use crate::value::JsonValue;
use serde::{Deserialize, Serialize};

/// Role of an outbound message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// The human side of the conversation
    User,
}

/// Body of an outbound user message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputContent {
    /// Always [`MessageRole::User`]
    pub role: MessageRole,

    /// Prompt text
    pub content: String,
}

/// One line written to the CLI's stdin
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserInput {
    /// Always `"user"`
    #[serde(rename = "type")]
    pub message_type: String,

    /// The wrapped prompt
    pub message: InputContent,
}

impl UserInput {
    /// Wrap a prompt as a user message
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            message_type: "user".to_string(),
            message: InputContent {
                role: MessageRole::User,
                content: prompt.into(),
            },
        }
    }

    /// The prompt text
    pub fn prompt(&self) -> &str {
        &self.message.content
    }

    /// Encode as a single JSON line without the trailing newline
    pub fn to_json_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(ProtocolError::from)
    }
}

/// The final event of an exchange
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultMessage {
    /// `"success"`, `"error_max_turns"`, `"error_during_execution"`, ...
    pub subtype: String,

    /// Whether the CLI flagged the run as failed
    pub is_error: bool,

    /// Free-text answer, if any
    pub result: Option<String>,

    /// CLI session identifier
    pub session_id: Option<String>,

    /// Number of turns taken
    pub num_turns: Option<u64>,

    /// Wall-clock duration in milliseconds
    pub duration_ms: Option<u64>,

    /// Total cost in USD (if reported)
    pub total_cost_usd: Option<f64>,

    /// Caller-defined payload; a JSON `null` counts as absent
    pub structured_output: Option<JsonValue>,
}

impl ResultMessage {
    /// Subtype of a successful run
    pub const SUCCESS: &'static str = "success";

    /// Whether the run finished successfully
    pub fn is_success(&self) -> bool {
        self.subtype == Self::SUCCESS
    }

    /// Whether this message ends an exchange: success with a payload
    pub fn is_terminal(&self) -> bool {
        self.is_success() && self.structured_output.is_some()
    }
}

/// A decoded stdout event, discriminated by its `"type"` field
#[derive(Debug, Clone, PartialEq)]
pub enum AgentMessage {
    /// `system` events (`init`, status updates)
    System {
        /// Event subtype, e.g. `"init"`
        subtype: Option<String>,
        /// CLI session identifier, when announced
        session_id: Option<String>,
    },

    /// `user` events (echoes, tool results)
    User,

    /// `assistant` events (model output)
    Assistant,

    /// `result` events
    Result(ResultMessage),

    /// Any other event type
    Other {
        /// The unrecognized `"type"` value
        message_type: String,
    },
}

// Only the discriminators and the payload are typed strictly; diagnostic
// fields are read leniently so an odd field can never hide a payload.
#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    message_type: Option<String>,
    #[serde(default)]
    subtype: Option<JsonValue>,
    #[serde(default)]
    is_error: Option<JsonValue>,
    #[serde(default)]
    result: Option<JsonValue>,
    #[serde(default)]
    session_id: Option<JsonValue>,
    #[serde(default)]
    num_turns: Option<JsonValue>,
    #[serde(default)]
    duration_ms: Option<JsonValue>,
    #[serde(default)]
    total_cost_usd: Option<JsonValue>,
    #[serde(default)]
    structured_output: Option<JsonValue>,
}

fn string_field(value: Option<JsonValue>) -> Option<String> {
    match value {
        Some(JsonValue::String(s)) => Some(s),
        _ => None,
    }
}

impl AgentMessage {
    /// Decode one trimmed stdout line
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Json`] if the line is not a JSON object and
    /// [`ProtocolError::MissingField`] if it has no `"type"`.
    pub fn from_line(line: &str) -> Result<Self> {
        let envelope: Envelope = serde_json::from_str(line)?;
        let message_type = envelope
            .message_type
            .ok_or(ProtocolError::MissingField("type"))?;

        let message = match message_type.as_str() {
            "system" => Self::System {
                subtype: string_field(envelope.subtype),
                session_id: string_field(envelope.session_id),
            },
            "user" => Self::User,
            "assistant" => Self::Assistant,
            "result" => Self::Result(ResultMessage {
                subtype: string_field(envelope.subtype).unwrap_or_default(),
                is_error: envelope
                    .is_error
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false),
                result: string_field(envelope.result),
                session_id: string_field(envelope.session_id),
                num_turns: envelope.num_turns.and_then(|v| v.as_u64()),
                duration_ms: envelope.duration_ms.and_then(|v| v.as_u64()),
                total_cost_usd: envelope.total_cost_usd.and_then(|v| v.as_f64()),
                structured_output: envelope.structured_output.filter(|v| !v.is_null()),
            }),
            _ => Self::Other { message_type },
        };
        Ok(message)
    }

    /// The `"type"` discriminator
    pub fn message_type(&self) -> &str {
        match self {
            Self::System { .. } => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Result(_) => "result",
            Self::Other { message_type } => message_type,
        }
    }

    /// The CLI session identifier, if this event announces one
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::System { session_id, .. } => session_id.as_deref(),
            Self::Result(result) => result.session_id.as_deref(),
            _ => None,
        }
    }

    /// The payload, if this message ends an exchange
    pub fn terminal_payload(&self) -> Option<&JsonValue> {
        match self {
            Self::Result(result) if result.is_success() => result.structured_output.as_ref(),
            _ => None,
        }
    }

    /// Whether this is a successful result that carries no payload
    pub fn is_payloadless_success(&self) -> bool {
        matches!(self, Self::Result(result) if result.is_success() && result.structured_output.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_user_input_wire_format() {
        let input = UserInput::new("Summarize \"this\"\nplease");
        assert_eq!(
            input.to_json_line().unwrap(),
            r#"{"type":"user","message":{"role":"user","content":"Summarize \"this\"\nplease"}}"#
        );
        assert_eq!(input.prompt(), "Summarize \"this\"\nplease");
    }

    #[test]
    fn test_terminal_result_message() {
        let line = r#"{"type":"result","subtype":"success","is_error":false,"num_turns":2,"session_id":"abc","structured_output":{"done":true}}"#;
        let message = AgentMessage::from_line(line).unwrap();

        let AgentMessage::Result(result) = &message else {
            panic!("expected result message, got {message:?}");
        };
        assert!(result.is_terminal());
        assert_eq!(result.num_turns, Some(2));
        assert_eq!(result.session_id.as_deref(), Some("abc"));
        assert_eq!(message.session_id(), Some("abc"));
        assert_eq!(
            message.terminal_payload().and_then(|p| p.get("done")).and_then(JsonValue::as_bool),
            Some(true)
        );
    }

    #[rstest]
    #[case(r#"{"type":"system","subtype":"init","session_id":"s1"}"#, "system")]
    #[case(r#"{"type":"assistant","message":{"content":[]}}"#, "assistant")]
    #[case(r#"{"type":"user","message":{"role":"user","content":"hi"}}"#, "user")]
    #[case(r#"{"type":"stream_event","event":{}}"#, "stream_event")]
    #[case(r#"{"type":"result","subtype":"error_max_turns","structured_output":{"x":1}}"#, "result")]
    #[case(r#"{"type":"result","subtype":"success"}"#, "result")]
    #[case(r#"{"type":"result","subtype":"success","structured_output":null}"#, "result")]
    fn test_non_terminal_messages(#[case] line: &str, #[case] message_type: &str) {
        let message = AgentMessage::from_line(line).unwrap();
        assert_eq!(message.message_type(), message_type);
        assert!(message.terminal_payload().is_none());
    }

    #[test]
    fn test_session_id_from_system_init() {
        let message = AgentMessage::from_line(r#"{"type":"system","subtype":"init","session_id":"s1"}"#).unwrap();
        assert_eq!(message.session_id(), Some("s1"));
        assert_eq!(AgentMessage::from_line(r#"{"type":"assistant"}"#).unwrap().session_id(), None);
    }

    #[test]
    fn test_payloadless_success_detected() {
        let message = AgentMessage::from_line(r#"{"type":"result","subtype":"success","result":"ok"}"#).unwrap();
        assert!(message.is_payloadless_success());

        let message = AgentMessage::from_line(r#"{"type":"result","subtype":"success","structured_output":[]}"#).unwrap();
        assert!(!message.is_payloadless_success());
        assert_eq!(message.terminal_payload(), Some(&JsonValue::Array(vec![])));
    }

    #[test]
    fn test_lenient_diagnostic_fields() {
        let line = r#"{"type":"result","subtype":"success","num_turns":"two","result":{"odd":1},"structured_output":{"v":1}}"#;
        let message = AgentMessage::from_line(line).unwrap();
        let AgentMessage::Result(result) = message else {
            panic!("expected result message");
        };
        assert_eq!(result.num_turns, None);
        assert_eq!(result.result, None);
        assert!(result.is_terminal());
    }

    #[rstest]
    #[case("not json")]
    #[case("[1,2,3]")]
    #[case(r#"{"subtype":"success"}"#)]
    #[case(r#"{"type":7}"#)]
    fn test_malformed_lines_are_errors(#[case] line: &str) {
        assert!(AgentMessage::from_line(line).is_err());
    }
}
