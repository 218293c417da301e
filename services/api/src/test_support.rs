//! In-memory doubles for the client connection, the backend session and the
//! chat client, plus an `AppState` built from them.

use crate::{
    state::AppState,
    ws::{
        connection::{ClientConnection, ClientError, closed_signal},
        protocol::{ClientFrame, ServerFrame},
    },
};
use async_trait::async_trait;
use mockall::mock;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use tokio::sync::{Mutex as AsyncMutex, mpsc, watch};
use twin_core::{
    chat::ChatTurn,
    generic_types::{AudioChunk, LiveSessionConfig, ResponseEvent},
    llm_client::ChatClient,
    realtime_api::{RealtimeConnector, RealtimeSession, SessionError},
};

pub const TEST_PERSONA: &str = "You are a test persona.";

mock! {
    pub Chat {}

    #[async_trait]
    impl ChatClient for Chat {
        async fn generate(
            &self,
            system_prompt: String,
            history: Vec<ChatTurn>,
            message: String,
        ) -> anyhow::Result<String>;
    }
}

/// Builds an `AppState` around the given doubles with a fixed test persona.
pub fn app_state_with(
    connector: Arc<dyn RealtimeConnector>,
    chat_client: Arc<dyn ChatClient>,
) -> AppState {
    AppState {
        chat_client,
        connector,
        system_prompt: Arc::new(TEST_PERSONA.to_string()),
        live_config: Arc::new(LiveSessionConfig {
            model: "gemini-test".to_string(),
            instructions: TEST_PERSONA.to_string(),
            voice_name: "Kore".to_string(),
            ..Default::default()
        }),
    }
}

pub type ClientScript = mpsc::UnboundedSender<Result<ClientFrame, ClientError>>;
pub type BackendScript = mpsc::UnboundedSender<Result<ResponseEvent, SessionError>>;

/// A client fed from a channel. Dropping the script sender is a disconnect.
pub struct FakeClient {
    inbound: AsyncMutex<mpsc::UnboundedReceiver<Result<ClientFrame, ClientError>>>,
    sent: Mutex<Vec<ServerFrame>>,
    send_error: Mutex<Option<ClientError>>,
    failed_sends: AtomicUsize,
    close_calls: AtomicUsize,
    closed: watch::Sender<bool>,
}

impl FakeClient {
    pub fn new() -> (Arc<Self>, ClientScript) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (closed, _) = watch::channel(false);
        let client = Arc::new(Self {
            inbound: AsyncMutex::new(rx),
            sent: Mutex::new(Vec::new()),
            send_error: Mutex::new(None),
            failed_sends: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
            closed,
        });
        (client, tx)
    }

    pub fn sent(&self) -> Vec<ServerFrame> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_sends_with(&self, error: ClientError) {
        *self.send_error.lock().unwrap() = Some(error);
    }

    pub fn failed_sends(&self) -> usize {
        self.failed_sends.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClientConnection for FakeClient {
    async fn recv(&self) -> Result<Option<ClientFrame>, ClientError> {
        let mut closed_rx = self.closed.subscribe();
        let mut inbound = self.inbound.lock().await;
        tokio::select! {
            _ = closed_signal(&mut closed_rx) => Ok(None),
            item = inbound.recv() => item.transpose(),
        }
    }

    async fn send(&self, frame: ServerFrame) -> Result<(), ClientError> {
        if *self.closed.borrow() {
            self.failed_sends.fetch_add(1, Ordering::SeqCst);
            return Err(ClientError::Disconnected);
        }
        let error = self.send_error.lock().unwrap().clone();
        if let Some(error) = error {
            self.failed_sends.fetch_add(1, Ordering::SeqCst);
            return Err(error);
        }
        self.sent.lock().unwrap().push(frame);
        Ok(())
    }

    async fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.send_replace(true);
    }
}

/// A backend session fed from a channel. Dropping the script sender ends the stream.
pub struct FakeBackend {
    events: AsyncMutex<mpsc::UnboundedReceiver<Result<ResponseEvent, SessionError>>>,
    received: Mutex<Vec<AudioChunk>>,
    send_error: Mutex<Option<SessionError>>,
    close_calls: AtomicUsize,
    closed: watch::Sender<bool>,
}

impl FakeBackend {
    pub fn new() -> (Arc<Self>, BackendScript) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (closed, _) = watch::channel(false);
        let backend = Arc::new(Self {
            events: AsyncMutex::new(rx),
            received: Mutex::new(Vec::new()),
            send_error: Mutex::new(None),
            close_calls: AtomicUsize::new(0),
            closed,
        });
        (backend, tx)
    }

    pub fn received(&self) -> Vec<AudioChunk> {
        self.received.lock().unwrap().clone()
    }

    pub fn fail_sends_with(&self, error: SessionError) {
        *self.send_error.lock().unwrap() = Some(error);
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RealtimeSession for FakeBackend {
    async fn send_audio(&self, chunk: AudioChunk) -> Result<(), SessionError> {
        if *self.closed.borrow() {
            return Err(SessionError::Closed);
        }
        let error = self.send_error.lock().unwrap().clone();
        if let Some(error) = error {
            return Err(error);
        }
        self.received.lock().unwrap().push(chunk);
        Ok(())
    }

    async fn next_event(&self) -> Result<Option<ResponseEvent>, SessionError> {
        let mut closed_rx = self.closed.subscribe();
        let mut events = self.events.lock().await;
        tokio::select! {
            _ = closed_signal(&mut closed_rx) => Err(SessionError::Closed),
            item = events.recv() => item.transpose(),
        }
    }

    async fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.send_replace(true);
    }
}

/// Hands out a prepared backend, or fails the handshake.
pub struct FakeConnector {
    backend: Mutex<Option<Arc<FakeBackend>>>,
    error: Option<SessionError>,
    pub configs: Mutex<Vec<LiveSessionConfig>>,
}

impl FakeConnector {
    pub fn with_backend(backend: Arc<FakeBackend>) -> Self {
        Self {
            backend: Mutex::new(Some(backend)),
            error: None,
            configs: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: SessionError) -> Self {
        Self {
            backend: Mutex::new(None),
            error: Some(error),
            configs: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl RealtimeConnector for FakeConnector {
    async fn connect(
        &self,
        config: &LiveSessionConfig,
    ) -> Result<Arc<dyn RealtimeSession>, SessionError> {
        self.configs.lock().unwrap().push(config.clone());
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        let backend = self
            .backend
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| SessionError::Connect("no backend prepared".to_string()))?;
        Ok(backend)
    }
}
