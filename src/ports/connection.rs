//! Connection port - one upgraded bidirectional message stream.
//!
//! A connection belongs to exactly one authenticated participant. The
//! participant actor drives the two halves independently: the inbound half
//! reads frames, the outbound half writes them, so the port is split into
//! a source and a sink rather than one shared object.

use async_trait::async_trait;
use thiserror::Error;

/// A single frame on the wire.
///
/// Application payloads travel as JSON text frames; ping/pong carry the
/// liveness probes; close ends the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Ping,
    Pong,
    Close,
}

/// Connection-level failures.
#[derive(Debug, Clone, Error)]
pub enum ConnectionError {
    /// The peer went away in an orderly fashion. Not logged as an error.
    #[error("connection closed by peer")]
    Closed,

    /// Any other transport failure.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Read half of a connection.
#[async_trait]
pub trait MessageSource: Send {
    /// Wait for the next inbound frame.
    async fn recv(&mut self) -> Result<Frame, ConnectionError>;
}

/// Write half of a connection.
#[async_trait]
pub trait MessageSink: Send {
    /// Write one frame to the peer.
    async fn send(&mut self, frame: Frame) -> Result<(), ConnectionError>;

    /// Close the underlying stream.
    async fn close(&mut self) -> Result<(), ConnectionError>;
}
