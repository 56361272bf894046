//! Defines the WebSocket message protocol between clients and the gateway.
//!
//! Every frame is a flat JSON object carrying a `type` discriminator. Client
//! payloads are parsed per type after routing; server messages are tagged
//! enum variants serialized with the same discriminator field.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Configures a new session. This must be the first message on a connection.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SetupRequest {
    /// The conversational model the client wants to talk to.
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_config: Option<Map<String, Value>>,
}

/// A text turn from the user.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct InputText {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_id: Option<String>,
}

/// Supported encodings for inbound audio chunks.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Wav,
    Pcm16,
    Opus,
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioFormat::Wav => write!(f, "wav"),
            AudioFormat::Pcm16 => write!(f, "pcm16"),
            AudioFormat::Opus => write!(f, "opus"),
        }
    }
}

/// A chunk of user audio.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct InputAudio {
    pub format: AudioFormat,
    /// Base64-encoded audio bytes, passed through untouched.
    pub chunk: String,
    #[serde(rename = "final")]
    pub is_final: bool,
}

/// The outcome of a tool call the model asked the client to perform.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub name: String,
    pub call_id: String,
    pub result: Value,
}

/// Asks the gateway to end the session and close the connection.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct EndSession {
    pub reason: String,
}

/// Machine-readable error codes carried by `ServerMessage::Error`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The frame, its envelope, or its typed payload could not be decoded.
    BadJson,
    /// The setup payload is missing required fields.
    BadSetup,
    AlreadySetup,
    NoSession,
    UnknownType,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            ErrorCode::BadJson => "bad_json",
            ErrorCode::BadSetup => "bad_setup",
            ErrorCode::AlreadySetup => "already_setup",
            ErrorCode::NoSession => "no_session",
            ErrorCode::UnknownType => "unknown_type",
        };
        f.write_str(code)
    }
}

/// Messages sent from the gateway to the client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Issued once after a successful setup.
    SessionResumptionUpdate { handle: String },
    /// A text response from the assistant.
    OutputText {
        text: String,
        #[serde(rename = "final")]
        is_final: bool,
    },
    /// A recoverable protocol error. The connection stays open.
    Error { code: ErrorCode, message: String },
}

impl ServerMessage {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            code,
            message: message.into(),
        }
    }

    /// A complete (non-streamed) text response.
    pub fn final_text(text: impl Into<String>) -> Self {
        ServerMessage::OutputText {
            text: text.into(),
            is_final: true,
        }
    }
}
