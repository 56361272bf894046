//! WebSocket Session Protocol
//!
//! This module contains the real-time session gateway. It is structured into
//! submodules:
//!
//! - `envelope`: Extracts the `type` discriminator used for routing.
//! - `protocol`: Defines the JSON message format for client-server communication.
//! - `transport`: The frame channel seam between the protocol and the socket.
//! - `dispatcher`: The per-connection loop driving the session state machine.
//! - `connection`: Manages the connection lifecycle, from upgrade to teardown.

mod connection;
pub mod dispatcher;
pub mod envelope;
pub mod protocol;
pub mod transport;

pub use connection::{serve_connection, ws_handler};
