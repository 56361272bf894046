//! The per-connection protocol loop.
//!
//! Frames are read one at a time, routed by their `type` discriminator and
//! answered before the next frame is read, so the Nth response always belongs
//! to the Nth dispatched request. Protocol errors are answered with an
//! `error` frame and never end the connection; only a completed
//! `end_session`, a transport failure or cancellation does.

use super::{
    envelope::{self, MessageKind},
    protocol::{
        EndSession, ErrorCode, InputAudio, InputText, ServerMessage, SetupRequest, ToolResult,
    },
    transport::{Frame, FrameChannel, TransportError},
};
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use twinspeak_core::{Session, SessionError, SessionId, SessionRegistry, SessionState};

const GOODBYE: &str = "Goodbye! Session ended.";

/// Why a connection's dispatch loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The client closed the connection.
    PeerClosed,
    /// The client ended its session with `end_session`.
    SessionEnded,
    /// The connection's lifetime scope was cancelled.
    Cancelled,
}

/// Failures that end a connection. None of them are reported to the peer.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Failed to serialize message: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    InvalidState(#[from] SessionError),
}

/// State owned by a single connection's loop.
#[derive(Debug, Default)]
pub struct ConnectionState {
    session_id: Option<SessionId>,
}

impl ConnectionState {
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// Borrows this connection's session from the registry for one message.
    ///
    /// Clears the slot if the registry no longer holds the session.
    fn session(&mut self, registry: &SessionRegistry) -> Option<Arc<Session>> {
        let id = self.session_id.as_ref()?;
        let session = registry.get(id);
        if session.is_none() {
            self.session_id = None;
        }
        session
    }

    /// Like `session`, but only yields a session that can still take input.
    /// One that has started closing reads as absent.
    fn open_session(&mut self, registry: &SessionRegistry) -> Option<Arc<Session>> {
        self.session(registry)
            .filter(|session| session.state().is_configured())
    }
}

enum Flow {
    Continue,
    Terminate,
}

/// The result of handling one frame: an optional reply and whether to go on.
struct Outcome {
    reply: Option<ServerMessage>,
    flow: Flow,
}

impl Outcome {
    fn reply(message: ServerMessage) -> Self {
        Self {
            reply: Some(message),
            flow: Flow::Continue,
        }
    }

    fn silent() -> Self {
        Self {
            reply: None,
            flow: Flow::Continue,
        }
    }

    fn finish(message: ServerMessage) -> Self {
        Self {
            reply: Some(message),
            flow: Flow::Terminate,
        }
    }

    fn reject(code: ErrorCode, message: impl Into<String>) -> Self {
        let message = message.into();
        debug!(%code, %message, "Rejecting client message");
        Self::reply(ServerMessage::error(code, message))
    }
}

/// Routes client messages for one connection against the shared registry.
pub struct Dispatcher {
    registry: Arc<SessionRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Runs the receive loop until the peer leaves, the session ends, or
    /// `cancel` fires.
    ///
    /// Cancellation is observed before each read and again before a freshly
    /// received frame is handled. A write already in progress is allowed to
    /// finish.
    pub async fn run<C: FrameChannel + ?Sized>(
        &self,
        channel: &mut C,
        cancel: &CancellationToken,
    ) -> Result<Termination, DispatchError> {
        let mut connection = ConnectionState::default();

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Connection scope cancelled. Leaving dispatch loop.");
                    return Ok(Termination::Cancelled);
                }
                next = channel.recv_frame() => next,
            };

            let frame = match next {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => return Err(e.into()),
                None => {
                    info!("Client closed the connection.");
                    return Ok(Termination::PeerClosed);
                }
            };

            if cancel.is_cancelled() {
                info!("Connection scope cancelled. Dropping received frame.");
                return Ok(Termination::Cancelled);
            }

            let outcome = self.dispatch(&mut connection, frame)?;
            if let Some(reply) = &outcome.reply {
                send_msg(channel, reply).await?;
            }
            if let Flow::Terminate = outcome.flow {
                return Ok(Termination::SessionEnded);
            }
        }
    }

    fn dispatch(
        &self,
        connection: &mut ConnectionState,
        frame: Frame,
    ) -> Result<Outcome, DispatchError> {
        let raw = match frame {
            Frame::Text(text) => text,
            Frame::Binary(_) => {
                return Ok(Outcome::reject(
                    ErrorCode::BadJson,
                    "Only text messages are supported",
                ));
            }
        };

        let kind = match envelope::decode(&raw) {
            Ok(kind) => kind,
            Err(e) => {
                debug!(error = %e, "Envelope decode failed");
                return Ok(Outcome::reject(ErrorCode::BadJson, "Invalid JSON format"));
            }
        };
        debug!(%kind, "Dispatching client message");

        match kind {
            MessageKind::Setup => self.handle_setup(connection, &raw),
            MessageKind::InputText => self.handle_input_text(connection, &raw),
            MessageKind::InputAudio => self.handle_input_audio(connection, &raw),
            MessageKind::ToolResult => self.handle_tool_result(connection, &raw),
            MessageKind::EndSession => self.handle_end_session(connection, &raw),
            MessageKind::Unknown(other) => Ok(Outcome::reject(
                ErrorCode::UnknownType,
                format!("Unknown message type: {}", other),
            )),
        }
    }

    fn handle_setup(
        &self,
        connection: &mut ConnectionState,
        raw: &str,
    ) -> Result<Outcome, DispatchError> {
        if connection.session(&self.registry).is_some() {
            return Ok(Outcome::reject(
                ErrorCode::AlreadySetup,
                "Session already configured",
            ));
        }
        let Some(request) = parse::<SetupRequest>(raw) else {
            return Ok(Outcome::reject(
                ErrorCode::BadSetup,
                "Invalid setup request format",
            ));
        };

        let session = Arc::new(Session::new(request.model.clone()));
        session.advance(SessionState::Configured)?;
        let entry = serde_json::to_value(&request)?;

        self.registry.put(session.clone());
        session.append(MessageKind::Setup.as_str(), entry);
        connection.session_id = Some(session.id().clone());

        tracing::Span::current().record("session_id", session.id().as_str());
        info!(model = %session.model(), "Session configured");

        Ok(Outcome::reply(ServerMessage::SessionResumptionUpdate {
            handle: session.resumption_handle().to_string(),
        }))
    }

    fn handle_input_text(
        &self,
        connection: &mut ConnectionState,
        raw: &str,
    ) -> Result<Outcome, DispatchError> {
        let Some(session) = connection.open_session(&self.registry) else {
            return Ok(no_session());
        };
        let Some(input) = parse::<InputText>(raw) else {
            return Ok(Outcome::reject(
                ErrorCode::BadJson,
                "Invalid text input format",
            ));
        };

        record(&session, MessageKind::InputText, &input, Some(SessionState::Active))?;

        Ok(Outcome::reply(ServerMessage::final_text(format!(
            "[echo] {}",
            input.text
        ))))
    }

    fn handle_input_audio(
        &self,
        connection: &mut ConnectionState,
        raw: &str,
    ) -> Result<Outcome, DispatchError> {
        let Some(session) = connection.open_session(&self.registry) else {
            return Ok(no_session());
        };
        let Some(input) = parse::<InputAudio>(raw) else {
            return Ok(Outcome::reject(
                ErrorCode::BadJson,
                "Invalid audio input format",
            ));
        };

        record(&session, MessageKind::InputAudio, &input, Some(SessionState::Active))?;

        Ok(Outcome::reply(ServerMessage::final_text(format!(
            "Received audio chunk in {} format (final: {})",
            input.format, input.is_final
        ))))
    }

    fn handle_tool_result(
        &self,
        connection: &mut ConnectionState,
        raw: &str,
    ) -> Result<Outcome, DispatchError> {
        let Some(session) = connection.open_session(&self.registry) else {
            return Ok(no_session());
        };
        let Some(result) = parse::<ToolResult>(raw) else {
            return Ok(Outcome::reject(
                ErrorCode::BadJson,
                "Invalid tool result format",
            ));
        };

        debug!(tool = %result.name, call_id = %result.call_id, "Tool result recorded");
        record(&session, MessageKind::ToolResult, &result, None)?;
        Ok(Outcome::silent())
    }

    /// Ends the session. The registry entry is removed before the goodbye is
    /// written, so it is already gone by the time the client can observe it.
    fn handle_end_session(
        &self,
        connection: &mut ConnectionState,
        raw: &str,
    ) -> Result<Outcome, DispatchError> {
        let Some(session) = connection.open_session(&self.registry) else {
            return Ok(no_session());
        };
        let Some(end) = parse::<EndSession>(raw) else {
            return Ok(Outcome::reject(
                ErrorCode::BadJson,
                "Invalid session end format",
            ));
        };

        record(&session, MessageKind::EndSession, &end, Some(SessionState::Closing))?;
        session.advance(SessionState::Closed)?;
        self.registry.delete(session.id());
        connection.session_id = None;
        info!(reason = %end.reason, log_len = session.log_len(), "Session ended by client");

        Ok(Outcome::finish(ServerMessage::final_text(GOODBYE)))
    }
}

/// Advances `session` (when `to` is given) and appends `message` to its log.
fn record<T: Serialize>(
    session: &Session,
    kind: MessageKind,
    message: &T,
    to: Option<SessionState>,
) -> Result<(), DispatchError> {
    let entry = serde_json::to_value(message)?;
    if let Some(to) = to {
        session.advance(to)?;
    }
    session.append(kind.as_str(), entry);
    Ok(())
}

fn parse<T: DeserializeOwned>(raw: &str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(payload) => Some(payload),
        Err(e) => {
            debug!(error = %e, "Payload decode failed");
            None
        }
    }
}

fn no_session() -> Outcome {
    Outcome::reject(ErrorCode::NoSession, "No active session")
}

/// Serializes a `ServerMessage` and writes it as one text frame.
pub(crate) async fn send_msg<C: FrameChannel + ?Sized>(
    channel: &mut C,
    msg: &ServerMessage,
) -> Result<(), DispatchError> {
    let serialized = serde_json::to_string(msg)?;
    channel.send_text(serialized).await?;
    Ok(())
}
