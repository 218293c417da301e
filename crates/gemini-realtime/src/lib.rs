//! A `RealtimeSession` backed by the Google Gemini Live WebSocket API.
//!
//! The connector performs the `setup` handshake and only hands out a session
//! once the server acknowledged it with `setupComplete`. The session exposes
//! raw PCM audio in and out; base64 and JSON framing stay inside this crate.

mod types;

use async_trait::async_trait;
use base64::Engine;
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use std::sync::Arc;
use tokio::{
    net::TcpStream,
    sync::{Mutex, watch},
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message as WsMessage,
};
use tracing::{debug, info, warn};
use url::Url;
use twin_core::{
    generic_types::{AudioChunk, LiveSessionConfig, ResponseEvent},
    realtime_api::{RealtimeConnector, RealtimeSession, SessionError},
};
use types::{
    BidiGenerateContentRealtimeInput, BidiGenerateContentSetup, Blob, ClientMessage, ServerMessage,
};

/// Public endpoint of the Gemini Live bidirectional streaming API.
pub const DEFAULT_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens Gemini Live sessions with a fixed API key.
#[derive(Clone)]
pub struct GeminiLiveConnector {
    api_key: String,
    endpoint: String,
}

impl GeminiLiveConnector {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Overrides the WebSocket endpoint, e.g. to point at a local test server.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// The endpoint with the API key appended as a percent-encoded `key` query parameter.
    fn session_url(&self) -> Result<Url, SessionError> {
        Url::parse_with_params(&self.endpoint, [("key", self.api_key.as_str())])
            .map_err(|e| SessionError::Connect(format!("invalid endpoint: {e}")))
    }
}

#[async_trait]
impl RealtimeConnector for GeminiLiveConnector {
    async fn connect(
        &self,
        config: &LiveSessionConfig,
    ) -> Result<Arc<dyn RealtimeSession>, SessionError> {
        let url = self.session_url()?;
        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| SessionError::Connect(e.to_string()))?;
        info!(model = %config.model, "Connected to Gemini Live WebSocket.");
        let (mut gemini_tx, mut gemini_rx) = ws_stream.split();

        let setup_msg = ClientMessage::Setup(BidiGenerateContentSetup::from_config(config));
        let payload =
            serde_json::to_string(&setup_msg).map_err(|e| SessionError::Connect(e.to_string()))?;
        gemini_tx
            .send(WsMessage::Text(payload.into()))
            .await
            .map_err(|e| SessionError::Connect(e.to_string()))?;

        loop {
            let payload = match gemini_rx.next().await {
                Some(Ok(WsMessage::Text(text))) => text.as_bytes().to_vec(),
                Some(Ok(WsMessage::Binary(data))) => data.to_vec(),
                Some(Ok(WsMessage::Close(frame))) => {
                    return Err(SessionError::Connect(format!(
                        "server closed the connection during setup: {:?}",
                        frame
                    )));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(SessionError::Connect(e.to_string())),
                None => {
                    return Err(SessionError::Connect(
                        "connection ended before setup completed".to_string(),
                    ));
                }
            };
            match ServerMessage::parse(&payload) {
                Ok(msg) if msg.setup_complete.is_some() => break,
                Ok(msg) => warn!("Received unexpected message during Gemini setup: {:?}", msg),
                Err(e) => return Err(SessionError::Connect(e.to_string())),
            }
        }
        info!("Gemini session setup is complete.");

        Ok(Arc::new(GeminiLiveSession::new(gemini_tx, gemini_rx)))
    }
}

/// One established Gemini Live session.
///
/// The write and read halves are locked independently so audio can be sent
/// while another task is parked in `next_event`.
pub struct GeminiLiveSession {
    sink: Mutex<SplitSink<WsStream, WsMessage>>,
    stream: Mutex<SplitStream<WsStream>>,
    closed: watch::Sender<bool>,
}

impl GeminiLiveSession {
    fn new(sink: SplitSink<WsStream, WsMessage>, stream: SplitStream<WsStream>) -> Self {
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

/// Resolves once the session has been marked closed.
async fn closed_signal(rx: &mut watch::Receiver<bool>) {
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

#[async_trait]
impl RealtimeSession for GeminiLiveSession {
    async fn send_audio(&self, chunk: AudioChunk) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        let msg = ClientMessage::RealtimeInput(BidiGenerateContentRealtimeInput {
            audio: Blob {
                mime_type: chunk.mime_type.to_string(),
                data: base64::engine::general_purpose::STANDARD.encode(&chunk.data),
            },
        });
        let payload =
            serde_json::to_string(&msg).map_err(|e| SessionError::Protocol(e.to_string()))?;

        let mut sink = self.sink.lock().await;
        match sink.send(WsMessage::Text(payload.into())).await {
            Ok(()) => Ok(()),
            Err(_) if self.is_closed() => Err(SessionError::Closed),
            Err(e) => Err(SessionError::Transport(e.to_string())),
        }
    }

    async fn next_event(&self) -> Result<Option<ResponseEvent>, SessionError> {
        let mut closed_rx = self.closed.subscribe();
        if *closed_rx.borrow_and_update() {
            return Err(SessionError::Closed);
        }
        let mut stream = self.stream.lock().await;

        loop {
            let frame = tokio::select! {
                _ = closed_signal(&mut closed_rx) => return Err(SessionError::Closed),
                frame = stream.next() => frame,
            };
            let payload = match frame {
                Some(Ok(WsMessage::Text(text))) => text.as_bytes().to_vec(),
                Some(Ok(WsMessage::Binary(data))) => data.to_vec(),
                Some(Ok(WsMessage::Close(frame))) => {
                    info!(?frame, "Gemini WebSocket connection closed by server.");
                    return Ok(None);
                }
                Some(Ok(_)) => continue,
                Some(Err(_)) if self.is_closed() => return Err(SessionError::Closed),
                Some(Err(e)) => return Err(SessionError::Transport(e.to_string())),
                None => return Ok(None),
            };

            let msg = ServerMessage::parse(&payload)?;
            if msg.go_away.is_some() {
                warn!("Gemini announced that it will end the session soon.");
            }
            match msg.into_event()? {
                Some(event) => return Ok(Some(event)),
                None => debug!("Skipping Gemini message without audio or turn boundary."),
            }
        }
    }

    async fn close(&self) {
        if self.closed.send_replace(true) {
            return;
        }
        let mut sink = self.sink.lock().await;
        if let Err(e) = sink.send(WsMessage::Close(None)).await {
            debug!("Gemini socket already gone while closing: {}", e);
        }
        info!("Gemini session closed.");
    }
}
