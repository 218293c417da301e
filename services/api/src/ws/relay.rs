//! The duplex relay between one client connection and one backend session.
//!
//! Two forwarders run concurrently on the same task and are joined before
//! `run` returns:
//!
//! - inbound: client audio/control frames into the backend session
//! - outbound: backend response events back to the client
//!
//! The forwarders share no channel. Each one, when its source ends or fails,
//! closes the handle the *other* forwarder is blocked on; the resulting
//! `Closed`/disconnect is that forwarder's signal to stop.

use super::{
    connection::{ClientConnection, ClientError},
    protocol::{ClientFrame, ClientMessage, ServerFrame, ServerMessage},
};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};
use tracing::{debug, error, info, warn};
use twin_core::{
    generic_types::{AudioChunk, ResponseEvent},
    realtime_api::{RealtimeSession, SessionError},
};

/// Lifecycle of a voice session. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    /// Waiting for the backend handshake.
    Connecting,
    /// Both forwarders are running.
    Active,
    /// Backend closure has been requested.
    Closing,
    /// Both forwarders returned. Terminal.
    Closed,
}

/// Owns one client connection and one backend session for their lifetime.
pub struct DuplexRelay {
    session_id: u32,
    client: Arc<dyn ClientConnection>,
    backend: Arc<dyn RealtimeSession>,
    state: Mutex<SessionState>,
    backend_closed: AtomicBool,
    error_reported: AtomicBool,
    turn_complete: AtomicBool,
}

impl DuplexRelay {
    /// Creates a relay over a backend session whose handshake already succeeded.
    pub fn new(
        session_id: u32,
        client: Arc<dyn ClientConnection>,
        backend: Arc<dyn RealtimeSession>,
    ) -> Self {
        Self {
            session_id,
            client,
            backend,
            state: Mutex::new(SessionState::Connecting),
            backend_closed: AtomicBool::new(false),
            error_reported: AtomicBool::new(false),
            turn_complete: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Whether the last backend event ended a model turn.
    pub fn turn_complete(&self) -> bool {
        self.turn_complete.load(Ordering::SeqCst)
    }

    /// Relays until both directions have terminated.
    ///
    /// Never fails: errors are contained, logged and, at most once, reported
    /// to the client. On return the backend session has been closed exactly
    /// once; closing the client connection is left to the caller.
    pub async fn run(&self) {
        self.advance(SessionState::Active);
        info!(session_id = self.session_id, "Relay started.");
        tokio::join!(self.forward_inbound(), self.forward_outbound());
        self.close_backend().await;
        self.advance(SessionState::Closed);
        info!(session_id = self.session_id, "Relay finished.");
    }

    async fn forward_inbound(&self) {
        loop {
            let frame = match self.client.recv().await {
                Ok(Some(frame)) => frame,
                Ok(None) | Err(ClientError::Disconnected) => {
                    info!("Client disconnected.");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Error receiving from client.");
                    self.report_error(e.to_string()).await;
                    break;
                }
            };

            match frame {
                ClientFrame::Audio(data) => {
                    match self.backend.send_audio(AudioChunk::pcm16(data)).await {
                        Ok(()) => {}
                        Err(SessionError::Closed) => {
                            debug!("Backend session closed; stopping inbound forwarding.");
                            break;
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to forward audio to backend.");
                            self.report_error(e.to_string()).await;
                            break;
                        }
                    }
                }
                ClientFrame::Text(text) => match ClientMessage::parse(&text) {
                    Some(ClientMessage::Close) => {
                        info!("Client requested session close.");
                        break;
                    }
                    // The backend detects turn boundaries on its own.
                    Some(ClientMessage::End) => debug!("Client signaled end of turn."),
                    Some(ClientMessage::Unknown) => {
                        debug!(%text, "Ignoring unrecognized control message.")
                    }
                    None => debug!(%text, "Ignoring malformed control message."),
                },
            }
        }
        self.close_backend().await;
    }

    async fn forward_outbound(&self) {
        loop {
            let event = match self.backend.next_event().await {
                Ok(Some(event)) => event,
                Ok(None) => {
                    info!("Backend ended the session.");
                    break;
                }
                Err(SessionError::Closed) => {
                    debug!("Backend session closed; stopping outbound forwarding.");
                    return;
                }
                Err(e) => {
                    error!(error = %e, "Error receiving from backend.");
                    self.report_error(e.to_string()).await;
                    break;
                }
            };

            if let Err(e) = self.deliver(event).await {
                match e {
                    ClientError::Disconnected => info!("Client gone while relaying backend output."),
                    other => {
                        warn!(error = %other, "Failed to send to client.");
                        self.report_error(other.to_string()).await;
                    }
                }
                self.close_backend().await;
                break;
            }
        }
        self.client.close().await;
    }

    async fn deliver(&self, event: ResponseEvent) -> Result<(), ClientError> {
        if let Some(audio) = event.audio {
            self.turn_complete.store(false, Ordering::SeqCst);
            self.client.send(ServerFrame::Audio(audio)).await?;
        }
        if event.turn_complete {
            self.turn_complete.store(true, Ordering::SeqCst);
            self.client
                .send(ServerFrame::Message(ServerMessage::TurnComplete))
                .await?;
        }
        Ok(())
    }

    /// Best-effort error notification; at most one per session.
    async fn report_error(&self, message: String) {
        if self.error_reported.swap(true, Ordering::SeqCst) {
            return;
        }
        let frame = ServerFrame::Message(ServerMessage::Error { message });
        if let Err(e) = self.client.send(frame).await {
            debug!(error = %e, "Could not deliver error notification to client.");
        }
    }

    async fn close_backend(&self) {
        if self.backend_closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.advance(SessionState::Closing);
        self.backend.close().await;
    }

    fn advance(&self, next: SessionState) {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if next > *state {
            debug!(
                session_id = self.session_id,
                from = ?*state,
                to = ?next,
                "Session state transition."
            );
            *state = next;
        }
    }
}
