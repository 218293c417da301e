//! The client side of a voice session, abstracted so the relay can be driven
//! by an axum WebSocket in production and by an in-memory double in tests.

use super::protocol::{ClientFrame, ServerFrame};
use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use tokio::sync::{Mutex, watch};
use tracing::{debug, warn};

/// Failures talking to the client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The client is gone. A normal way for a session to end.
    #[error("client disconnected")]
    Disconnected,
    #[error("client connection error: {0}")]
    Transport(String),
}

/// A message-oriented, bidirectional client connection.
///
/// `recv` and `send` may be used concurrently from different tasks. `close`
/// is idempotent and wakes a pending `recv`, which then reports a disconnect.
#[async_trait]
pub trait ClientConnection: Send + Sync {
    /// Waits for the next frame. `Ok(None)` means the client went away.
    async fn recv(&self) -> Result<Option<ClientFrame>, ClientError>;

    async fn send(&self, frame: ServerFrame) -> Result<(), ClientError>;

    async fn close(&self);
}

/// Resolves once the watched flag becomes `true`.
pub(crate) async fn closed_signal(rx: &mut watch::Receiver<bool>) {
    loop {
        let closed = *rx.borrow_and_update();
        if closed {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// `ClientConnection` over an upgraded axum WebSocket.
pub struct WsClientConnection {
    sink: Mutex<SplitSink<WebSocket, Message>>,
    stream: Mutex<SplitStream<WebSocket>>,
    closed: watch::Sender<bool>,
}

impl WsClientConnection {
    pub fn new(socket: WebSocket) -> Self {
        let (sink, stream) = socket.split();
        let (closed, _) = watch::channel(false);
        Self {
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
            closed,
        }
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

#[async_trait]
impl ClientConnection for WsClientConnection {
    async fn recv(&self) -> Result<Option<ClientFrame>, ClientError> {
        let mut closed_rx = self.closed.subscribe();
        if *closed_rx.borrow_and_update() {
            return Ok(None);
        }
        let mut stream = self.stream.lock().await;

        loop {
            let msg = tokio::select! {
                _ = closed_signal(&mut closed_rx) => return Ok(None),
                msg = stream.next() => msg,
            };
            match msg {
                Some(Ok(Message::Binary(data))) => return Ok(Some(ClientFrame::Audio(data))),
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(ClientFrame::Text(text.to_string())));
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "Client sent close frame.");
                    return Ok(None);
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Err(e)) => {
                    // An abrupt drop surfaces as a read error; treat it as a disconnect.
                    warn!("Error receiving from client WebSocket: {}", e);
                    return Ok(None);
                }
                None => return Ok(None),
            }
        }
    }

    async fn send(&self, frame: ServerFrame) -> Result<(), ClientError> {
        if self.is_closed() {
            return Err(ClientError::Disconnected);
        }
        let message = match frame {
            ServerFrame::Audio(data) => Message::Binary(data),
            ServerFrame::Message(msg) => {
                let serialized = serde_json::to_string(&msg)
                    .map_err(|e| ClientError::Transport(e.to_string()))?;
                Message::Text(serialized.into())
            }
        };
        self.sink
            .lock()
            .await
            .send(message)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))
    }

    async fn close(&self) {
        if self.closed.send_replace(true) {
            return;
        }
        let mut sink = self.sink.lock().await;
        if let Err(e) = sink.send(Message::Close(None)).await {
            debug!("Client socket already gone while closing: {}", e);
        }
    }
}
