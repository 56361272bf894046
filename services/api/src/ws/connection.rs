//! Manages the WebSocket connection lifecycle, from upgrade to teardown.

use super::{
    dispatcher::{DispatchError, Dispatcher, Termination},
    transport::{FrameChannel, WsChannel},
};
use crate::state::AppState;
use axum::{
    extract::{
        State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use twinspeak_core::SessionRegistry;

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_failed_upgrade(|e| warn!(error = %e, "WebSocket upgrade failed"))
        .on_upgrade(move |socket| handle_socket(socket, state))
}

/// Entry point for an upgraded connection.
///
/// The connection runs under a child of the server's shutdown token, so a
/// server shutdown ends every live dispatch loop between frames.
#[instrument(name = "ws_connection", skip_all, fields(connection_id, session_id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection_id: u32 = rand::random();
    tracing::Span::current().record("connection_id", connection_id);
    info!("New WebSocket connection. Awaiting setup...");

    let scope = state.shutdown.child_token();
    // Already logged by `serve_connection`; nothing is left to do with it here.
    let _outcome = serve_connection(WsChannel::new(socket), state.registry.clone(), scope).await;
}

/// Runs the dispatcher over `channel` to completion and then closes the
/// channel. The channel is owned here and closed exactly once, whichever way
/// the dispatcher exits.
pub async fn serve_connection<C: FrameChannel>(
    mut channel: C,
    registry: Arc<SessionRegistry>,
    scope: CancellationToken,
) -> Result<Termination, DispatchError> {
    // Ending the connection also ends its scope.
    let _scope_guard = scope.clone().drop_guard();

    let outcome = Dispatcher::new(registry).run(&mut channel, &scope).await;
    match &outcome {
        Ok(termination) => info!(?termination, "WebSocket connection finished."),
        Err(e) => error!(error = ?e, "WebSocket connection terminated with error."),
    }

    if let Err(e) = channel.close().await {
        debug!(error = %e, "Channel was already closed by the peer.");
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::{
        protocol::{ErrorCode, ServerMessage},
        transport::memory,
    };
    use serde_json::json;

    #[tokio::test]
    async fn test_channel_closed_once_after_session_end() {
        let registry = Arc::new(SessionRegistry::new());
        let (channel, peer) = memory::pair();
        peer.send_json(json!({"type": "setup", "model": "m"}));
        peer.send_json(json!({"type": "end_session", "reason": "x"}));
        let mut peer = peer.hang_up();

        let result = serve_connection(channel, registry.clone(), CancellationToken::new()).await;

        assert_eq!(result.unwrap(), Termination::SessionEnded);
        assert_eq!(peer.close_count(), 1);
        assert_eq!(peer.received().len(), 2);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_channel_closed_once_after_peer_leaves() {
        let registry = Arc::new(SessionRegistry::new());
        let (channel, peer) = memory::pair();
        peer.send_json(json!({"type": "input_text", "text": "hi"}));
        let mut peer = peer.hang_up();

        let result = serve_connection(channel, registry, CancellationToken::new()).await;

        assert_eq!(result.unwrap(), Termination::PeerClosed);
        assert_eq!(peer.close_count(), 1);
        assert_eq!(
            peer.received(),
            vec![ServerMessage::error(ErrorCode::NoSession, "No active session")]
        );
    }

    #[tokio::test]
    async fn test_channel_closed_once_after_transport_error() {
        let registry = Arc::new(SessionRegistry::new());
        let (channel, peer) = memory::pair();
        peer.send_error();

        let result = serve_connection(channel, registry, CancellationToken::new()).await;

        assert!(matches!(result, Err(DispatchError::Transport(_))));
        assert_eq!(peer.close_count(), 1);
    }

    #[tokio::test]
    async fn test_channel_closed_once_after_shutdown() {
        let registry = Arc::new(SessionRegistry::new());
        let (channel, peer) = memory::pair();
        let shutdown = CancellationToken::new();

        let task = tokio::spawn(serve_connection(
            channel,
            registry,
            shutdown.child_token(),
        ));
        shutdown.cancel();

        assert_eq!(task.await.unwrap().unwrap(), Termination::Cancelled);
        assert_eq!(peer.close_count(), 1);
    }

    #[tokio::test]
    async fn test_finished_connection_cancels_its_scope() {
        let registry = Arc::new(SessionRegistry::new());
        let (channel, peer) = memory::pair();
        let scope = CancellationToken::new();
        let _peer = peer.hang_up();

        serve_connection(channel, registry, scope.clone())
            .await
            .unwrap();
        assert!(scope.is_cancelled());
    }
}
