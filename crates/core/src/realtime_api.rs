use crate::generic_types::{AudioChunk, LiveSessionConfig, ResponseEvent};
use async_trait::async_trait;
use std::sync::Arc;

/// Failures surfaced by a real-time backend session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The session was closed locally; not an escalation.
    #[error("session is closed")]
    Closed,
    #[error("failed to establish backend session: {0}")]
    Connect(String),
    #[error("backend transport error: {0}")]
    Transport(String),
    #[error("unexpected backend message: {0}")]
    Protocol(String),
}

/// A handle to one live, bidirectional session with a generative backend.
///
/// Implementations must be safe to share between the two relay directions:
/// `close` may be called from either side, any number of times, and must wake
/// a pending `next_event` with [`SessionError::Closed`].
#[async_trait]
pub trait RealtimeSession: Send + Sync {
    /// Pushes one chunk of input audio to the backend.
    async fn send_audio(&self, chunk: AudioChunk) -> Result<(), SessionError>;

    /// Waits for the next response event. `Ok(None)` means the backend ended the stream.
    async fn next_event(&self) -> Result<Option<ResponseEvent>, SessionError>;

    /// Closes the session. Idempotent and infallible.
    async fn close(&self);
}

/// Opens backend sessions. Returns only once the backend handshake succeeded.
#[async_trait]
pub trait RealtimeConnector: Send + Sync {
    async fn connect(
        &self,
        config: &LiveSessionConfig,
    ) -> Result<Arc<dyn RealtimeSession>, SessionError>;
}
