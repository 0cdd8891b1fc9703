//! Connection port over an upgraded axum WebSocket.

use async_trait::async_trait;
use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures::stream::{SplitSink, SplitStream, StreamExt};
use futures::SinkExt;

use crate::ports::{ConnectionError, Frame, MessageSink, MessageSource};

/// Split an upgraded socket into the engine's source/sink halves.
pub fn split_socket(socket: WebSocket) -> (SocketSource, SocketSink) {
    let (sink, stream) = socket.split();
    (SocketSource { stream }, SocketSink { sink })
}

/// Read half of an upgraded socket.
pub struct SocketSource {
    stream: SplitStream<WebSocket>,
}

#[async_trait]
impl MessageSource for SocketSource {
    async fn recv(&mut self) -> Result<Frame, ConnectionError> {
        loop {
            let message = match self.stream.next().await {
                None => return Err(ConnectionError::Closed),
                Some(Err(e)) => return Err(ConnectionError::Transport(e.to_string())),
                Some(Ok(message)) => message,
            };

            return Ok(match message {
                WsMessage::Text(text) => Frame::Text(text),
                WsMessage::Binary(_) => {
                    // The protocol is JSON text only.
                    tracing::warn!("ignoring binary frame");
                    continue;
                }
                WsMessage::Ping(_) => Frame::Ping,
                WsMessage::Pong(_) => Frame::Pong,
                WsMessage::Close(_) => Frame::Close,
            });
        }
    }
}

/// Write half of an upgraded socket.
pub struct SocketSink {
    sink: SplitSink<WebSocket, WsMessage>,
}

#[async_trait]
impl MessageSink for SocketSink {
    async fn send(&mut self, frame: Frame) -> Result<(), ConnectionError> {
        let message = match frame {
            Frame::Text(text) => WsMessage::Text(text),
            Frame::Ping => WsMessage::Ping(Vec::new()),
            Frame::Pong => WsMessage::Pong(Vec::new()),
            Frame::Close => WsMessage::Close(None),
        };

        self.sink
            .send(message)
            .await
            .map_err(|e| ConnectionError::Transport(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), ConnectionError> {
        self.sink
            .close()
            .await
            .map_err(|e| ConnectionError::Transport(e.to_string()))
    }
}
