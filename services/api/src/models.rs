//! API Models
//!
//! This module defines the JSON bodies served by the HTTP routes and their
//! OpenAPI schemas, generated with `utoipa`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use twinspeak_core::{SessionId, SessionSnapshot, SessionState};
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// An introspection view of one live session.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct SessionView {
    #[schema(value_type = String, format = Uuid)]
    pub id: SessionId,
    #[schema(example = "gemini-1.5-flash")]
    pub model: String,
    #[schema(value_type = String, example = "active")]
    pub state: SessionState,
    #[schema(example = "session_5f0c...")]
    pub resumption_handle: String,
    /// Number of messages recorded in the session log.
    pub log_len: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SessionSnapshot> for SessionView {
    fn from(snapshot: SessionSnapshot) -> Self {
        Self {
            id: snapshot.id,
            model: snapshot.model,
            state: snapshot.state,
            resumption_handle: snapshot.resumption_handle,
            log_len: snapshot.log_len,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct SessionList {
    pub count: usize,
    pub sessions: Vec<SessionView>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub message: String,
}
