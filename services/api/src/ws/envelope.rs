//! Extracts the `type` discriminator from a raw text frame.
//!
//! Only the discriminator is looked at here. The full payload is parsed later
//! by the handler for that message kind.

use serde_json::{Map, Value};
use std::fmt;

/// The closed set of message kinds a client may send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Setup,
    InputText,
    InputAudio,
    ToolResult,
    EndSession,
    /// Any discriminator the gateway does not recognise.
    Unknown(String),
}

impl MessageKind {
    pub fn from_discriminator(discriminator: &str) -> Self {
        match discriminator {
            "setup" => MessageKind::Setup,
            "input_text" => MessageKind::InputText,
            "input_audio" => MessageKind::InputAudio,
            "tool_result" => MessageKind::ToolResult,
            "end_session" => MessageKind::EndSession,
            other => MessageKind::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MessageKind::Setup => "setup",
            MessageKind::InputText => "input_text",
            MessageKind::InputAudio => "input_audio",
            MessageKind::ToolResult => "tool_result",
            MessageKind::EndSession => "end_session",
            MessageKind::Unknown(other) => other,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The frame could not be routed.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("Frame is not a JSON object: {0}")]
    NotAnObject(#[from] serde_json::Error),
    #[error("Frame has no string `type` field")]
    MissingType,
}

/// Decodes the envelope of `frame` and classifies its discriminator.
pub fn decode(frame: &str) -> Result<MessageKind, EnvelopeError> {
    let object: Map<String, Value> = serde_json::from_str(frame)?;
    object
        .get("type")
        .and_then(Value::as_str)
        .map(MessageKind::from_discriminator)
        .ok_or(EnvelopeError::MissingType)
}
