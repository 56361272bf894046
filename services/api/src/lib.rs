//! Twinspeak API Library Crate
//!
//! This library contains the gateway service: application state,
//! configuration, HTTP handlers, routing and the WebSocket session protocol.
//! The `api` binary is a thin wrapper around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
pub mod ws;
