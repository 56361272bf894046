//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the gateway: the health
//! check, the session introspection endpoints and the WebSocket endpoint, all
//! wrapped in request tracing, panic recovery and CORS.

use crate::{
    handlers,
    models::{ErrorResponse, HealthResponse, SessionList, SessionView},
    state::AppState,
    ws::ws_handler,
};

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::list_sessions,
        handlers::get_session,
    ),
    components(
        schemas(HealthResponse, SessionView, SessionList, ErrorResponse)
    ),
    tags(
        (name = "Twinspeak Gateway", description = "Real-time conversational sessions over WebSocket")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let routes = Router::new()
        .route("/healthz", get(handlers::health))
        .route("/v1/speak", get(ws_handler))
        .route("/v1/sessions", get(handlers::list_sessions))
        .route("/v1/sessions/{id}", get(handlers::get_session))
        .with_state(app_state);

    with_middleware(routes)
}

/// Wraps every route in per-request tracing, panic recovery (a panicking
/// handler becomes a `500`) and a permissive CORS policy.
pub fn with_middleware(router: Router) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .layer(cors)
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
}
