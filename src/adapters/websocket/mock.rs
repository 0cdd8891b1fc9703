//! In-memory connection pair for exercising the engine without sockets.
//!
//! [`duplex`] returns the peer's end plus a source/sink pair implementing
//! the connection port, wired back to back over unbounded channels.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::ports::{ConnectionError, Frame, MessageSink, MessageSource};

use super::messages::Message;

/// Build a connected pair: the peer end for the test to drive, and the
/// source/sink halves to hand to a participant actor.
pub fn duplex() -> (PeerEnd, MockSource, MockSink) {
    let (to_engine_tx, to_engine_rx) = mpsc::unbounded_channel();
    let (to_peer_tx, to_peer_rx) = mpsc::unbounded_channel();

    let peer = PeerEnd {
        outbound: to_engine_tx,
        inbound: to_peer_rx,
    };
    (peer, MockSource { rx: to_engine_rx }, MockSink { tx: to_peer_tx })
}

/// The remote participant's side of the connection.
pub struct PeerEnd {
    outbound: mpsc::UnboundedSender<Frame>,
    inbound: mpsc::UnboundedReceiver<Frame>,
}

impl PeerEnd {
    /// Send a raw frame to the engine.
    pub fn send_frame(&self, frame: Frame) {
        let _ = self.outbound.send(frame);
    }

    /// Send a text frame to the engine.
    pub fn send_text(&self, text: impl Into<String>) {
        self.send_frame(Frame::Text(text.into()));
    }

    /// Send an application message as JSON.
    pub fn send_json(&self, message: &Message) {
        let payload =
            serde_json::to_string(message).expect("Message serialization should not fail");
        self.send_text(payload);
    }

    /// Next frame from the engine, or `None` once the engine side is gone.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        self.inbound.recv().await
    }

    /// Next application message, skipping liveness probes. Returns `None`
    /// on a close frame or once the engine side is gone.
    pub async fn next_message(&mut self) -> Option<Message> {
        loop {
            match self.inbound.recv().await? {
                Frame::Text(text) => {
                    return Some(
                        serde_json::from_str(&text).expect("engine emitted unreadable JSON"),
                    )
                }
                Frame::Ping | Frame::Pong => continue,
                Frame::Close => return None,
            }
        }
    }

    /// Drop the sending half, as a peer that vanished mid-session would.
    pub fn hang_up(self) -> mpsc::UnboundedReceiver<Frame> {
        self.inbound
    }
}

/// Read half handed to the engine.
pub struct MockSource {
    rx: mpsc::UnboundedReceiver<Frame>,
}

#[async_trait]
impl MessageSource for MockSource {
    async fn recv(&mut self) -> Result<Frame, ConnectionError> {
        self.rx.recv().await.ok_or(ConnectionError::Closed)
    }
}

/// Write half handed to the engine.
pub struct MockSink {
    tx: mpsc::UnboundedSender<Frame>,
}

#[async_trait]
impl MessageSink for MockSink {
    async fn send(&mut self, frame: Frame) -> Result<(), ConnectionError> {
        self.tx.send(frame).map_err(|_| ConnectionError::Closed)
    }

    async fn close(&mut self) -> Result<(), ConnectionError> {
        Ok(())
    }
}
