//! The duplex frame channel the dispatcher reads from and writes to.
//!
//! `FrameChannel` is the narrow seam between protocol handling and the
//! socket. `WsChannel` adapts an upgraded axum `WebSocket`; control frames
//! (ping/pong) are absorbed here and a close frame ends the stream.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures_util::SinkExt;

/// A data frame received from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
}

/// A failure of the underlying channel. These are never reported to the peer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to receive frame: {0}")]
    Receive(String),
    #[error("Failed to send frame: {0}")]
    Send(String),
    #[error("Failed to close channel: {0}")]
    Close(String),
}

#[async_trait]
pub trait FrameChannel: Send {
    /// Waits for the next data frame. Returns `None` once the peer has closed.
    async fn recv_frame(&mut self) -> Option<Result<Frame, TransportError>>;

    /// Writes a single text frame and waits for it to be flushed.
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    async fn close(&mut self) -> Result<(), TransportError>;
}

/// `FrameChannel` over an upgraded axum WebSocket.
pub struct WsChannel {
    socket: WebSocket,
}

impl WsChannel {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

#[async_trait]
impl FrameChannel for WsChannel {
    async fn recv_frame(&mut self) -> Option<Result<Frame, TransportError>> {
        loop {
            let message = match self.socket.recv().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(TransportError::Receive(e.to_string()))),
            };
            match message {
                Message::Text(text) => return Some(Ok(Frame::Text(text.to_string()))),
                Message::Binary(data) => return Some(Ok(Frame::Binary(data))),
                Message::Ping(_) | Message::Pong(_) => continue,
                Message::Close(_) => return None,
            }
        }
    }

    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.socket
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        SinkExt::close(&mut self.socket)
            .await
            .map_err(|e| TransportError::Close(e.to_string()))
    }
}

/// An in-memory channel for exercising the dispatcher without a socket.
#[cfg(test)]
pub(crate) mod memory {
    use super::*;
    use crate::ws::protocol::ServerMessage;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };
    use tokio::sync::mpsc;

    pub(crate) struct MemoryChannel {
        inbound: mpsc::UnboundedReceiver<Result<Frame, TransportError>>,
        outbound: mpsc::UnboundedSender<String>,
        closes: Arc<AtomicUsize>,
        fail_sends: bool,
    }

    impl MemoryChannel {
        /// Every subsequent write fails as if the socket had gone away.
        pub(crate) fn with_failing_sends(mut self) -> Self {
            self.fail_sends = true;
            self
        }
    }

    /// The client's end of a `MemoryChannel`.
    pub(crate) struct MemoryPeer {
        inbound: mpsc::UnboundedSender<Result<Frame, TransportError>>,
        outbound: mpsc::UnboundedReceiver<String>,
        closes: Arc<AtomicUsize>,
    }

    impl MemoryPeer {
        pub(crate) fn send_text(&self, text: &str) {
            self.inbound
                .send(Ok(Frame::Text(text.to_string())))
                .expect("channel dropped");
        }

        pub(crate) fn send_json(&self, value: serde_json::Value) {
            self.send_text(&value.to_string());
        }

        pub(crate) fn send_binary(&self, data: &'static [u8]) {
            self.inbound
                .send(Ok(Frame::Binary(Bytes::from_static(data))))
                .expect("channel dropped");
        }

        pub(crate) fn send_error(&self) {
            self.inbound
                .send(Err(TransportError::Receive("connection reset".into())))
                .expect("channel dropped");
        }

        /// Simulates the client closing its side.
        pub(crate) fn hang_up(self) -> ClosedPeer {
            ClosedPeer {
                outbound: self.outbound,
                closes: self.closes,
            }
        }

        pub(crate) fn close_count(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }
    }

    /// A peer that has stopped sending but can still read what was written.
    pub(crate) struct ClosedPeer {
        outbound: mpsc::UnboundedReceiver<String>,
        closes: Arc<AtomicUsize>,
    }

    impl ClosedPeer {
        pub(crate) fn received(&mut self) -> Vec<ServerMessage> {
            let mut messages = Vec::new();
            while let Ok(text) = self.outbound.try_recv() {
                messages.push(serde_json::from_str(&text).expect("server sent invalid JSON"));
            }
            messages
        }

        pub(crate) fn close_count(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }
    }

    pub(crate) fn pair() -> (MemoryChannel, MemoryPeer) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let closes = Arc::new(AtomicUsize::new(0));
        (
            MemoryChannel {
                inbound: inbound_rx,
                outbound: outbound_tx,
                closes: closes.clone(),
                fail_sends: false,
            },
            MemoryPeer {
                inbound: inbound_tx,
                outbound: outbound_rx,
                closes,
            },
        )
    }

    #[async_trait]
    impl FrameChannel for MemoryChannel {
        async fn recv_frame(&mut self) -> Option<Result<Frame, TransportError>> {
            self.inbound.recv().await
        }

        async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
            if self.fail_sends {
                return Err(TransportError::Send("broken pipe".into()));
            }
            self.outbound
                .send(text)
                .map_err(|e| TransportError::Send(e.to_string()))
        }

        async fn close(&mut self) -> Result<(), TransportError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
