//! Axum Handlers for the HTTP API
//!
//! Health checking and read-only introspection of the session registry. The
//! `utoipa` annotations feed the generated OpenAPI document.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use twinspeak_core::SessionId;

use crate::{
    models::{ErrorResponse, HealthResponse, SessionList, SessionView},
    state::AppState,
};

pub enum ApiError {
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { message })).into_response()
            }
        }
    }
}

/// Report service liveness.
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// List all live sessions.
#[utoipa::path(
    get,
    path = "/v1/sessions",
    responses(
        (status = 200, description = "Live sessions, oldest first", body = SessionList)
    )
)]
pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<SessionList> {
    let sessions: Vec<SessionView> = state
        .registry
        .snapshots()
        .into_iter()
        .map(SessionView::from)
        .collect();
    Json(SessionList {
        count: sessions.len(),
        sessions,
    })
}

/// Get a live session by its ID.
#[utoipa::path(
    get,
    path = "/v1/sessions/{id}",
    responses(
        (status = 200, description = "Session details", body = SessionView),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(
        ("id" = String, Path, description = "Session ID")
    )
)]
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let session = state
        .registry
        .get(&SessionId::from(id.clone()))
        .ok_or_else(|| ApiError::NotFound(format!("Session with id '{}' not found", id)))?;

    Ok(Json(SessionView::from(session.snapshot())))
}
