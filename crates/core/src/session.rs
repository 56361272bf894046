//! Session Entity
//!
//! A `Session` records one conversation: its identity, the model requested at
//! setup, its lifecycle state and an append-only log of every message seen.
//! Identity fields are immutable; the state and the log live behind a mutex
//! so that appends stay consistent even if several tasks touch one session.

use crate::{error::SessionError, state::SessionState};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use uuid::Uuid;

/// Opaque, process-wide unique session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One message recorded in a session log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    /// The wire discriminator of the recorded message (e.g. `input_text`).
    pub kind: String,
    pub payload: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

/// A point-in-time, serializable view of a session without its log body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub model: String,
    pub state: SessionState,
    pub resumption_handle: String,
    pub log_len: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Inner {
    state: SessionState,
    updated_at: DateTime<Utc>,
    log: Vec<LogEntry>,
}

/// A single conversation tracked by the gateway.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    model: String,
    resumption_handle: String,
    created_at: DateTime<Utc>,
    inner: Mutex<Inner>,
}

impl Session {
    /// Creates a session for `model` in the `Connecting` state.
    pub fn new(model: impl Into<String>) -> Self {
        let id = SessionId::generate();
        let resumption_handle = resumption_handle_for(&id);
        let now = Utc::now();
        Self {
            id,
            model: model.into(),
            resumption_handle,
            created_at: now,
            inner: Mutex::new(Inner {
                state: SessionState::Connecting,
                updated_at: now,
                log: Vec::new(),
            }),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// The token a client may later present to resume this session.
    pub fn resumption_handle(&self) -> &str {
        &self.resumption_handle
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.inner.lock().updated_at
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    /// Moves the session to `to`, returning the state it left.
    ///
    /// Fails without side effects if `to` would move the session backwards
    /// or out of `Closed`.
    pub fn advance(&self, to: SessionState) -> Result<SessionState, SessionError> {
        let mut inner = self.inner.lock();
        let from = inner.state;
        if !from.can_advance_to(to) {
            return Err(SessionError::InvalidTransition { from, to });
        }
        inner.state = to;
        if from != to {
            debug!(session_id = %self.id, %from, %to, "Session state advanced");
        }
        Ok(from)
    }

    /// Appends a message to the log and returns the new log length.
    pub fn append(&self, kind: impl Into<String>, payload: serde_json::Value) -> usize {
        let now = Utc::now();
        let mut inner = self.inner.lock();
        inner.log.push(LogEntry {
            kind: kind.into(),
            payload,
            recorded_at: now,
        });
        inner.updated_at = now;
        inner.log.len()
    }

    pub fn log_len(&self) -> usize {
        self.inner.lock().log.len()
    }

    /// Returns a copy of the log in insertion order.
    pub fn log(&self) -> Vec<LogEntry> {
        self.inner.lock().log.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock();
        SessionSnapshot {
            id: self.id.clone(),
            model: self.model.clone(),
            state: inner.state,
            resumption_handle: self.resumption_handle.clone(),
            log_len: inner.log.len(),
            created_at: self.created_at,
            updated_at: inner.updated_at,
        }
    }
}

fn resumption_handle_for(id: &SessionId) -> String {
    format!("session_{}", id)
}
