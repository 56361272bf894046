//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the resources every
//! request handler and WebSocket connection shares.

use crate::config::Config;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use twinspeak_core::SessionRegistry;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub config: Arc<Config>,
    /// Cancelled when the server shuts down. Each connection runs under a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new()),
            config: Arc::new(config),
            shutdown: CancellationToken::new(),
        }
    }
}
