//! Accepts `/voice` connections, opens the backend session and hands both
//! ends to the duplex relay.

use super::{
    connection::{ClientConnection, WsClientConnection},
    protocol::{ServerFrame, ServerMessage},
    relay::DuplexRelay,
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
use tracing::{debug, error, info, instrument};

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

#[instrument(name = "voice_session", skip_all, fields(session_id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id: u32 = rand::random();
    tracing::Span::current().record("session_id", session_id);
    info!("New voice connection. Opening backend session...");

    let client: Arc<dyn ClientConnection> = Arc::new(WsClientConnection::new(socket));
    run_voice_session(session_id, client, &state).await;
}

/// Runs one voice session to completion and closes the client afterwards.
///
/// A failed backend handshake is reported to the client as a single error
/// message; no relay is created in that case.
pub async fn run_voice_session(
    session_id: u32,
    client: Arc<dyn ClientConnection>,
    state: &AppState,
) {
    let backend = match state.connector.connect(&state.live_config).await {
        Ok(backend) => backend,
        Err(e) => {
            error!(error = %e, "Failed to open backend session.");
            let frame = ServerFrame::Message(ServerMessage::Error {
                message: e.to_string(),
            });
            if let Err(e) = client.send(frame).await {
                debug!(error = %e, "Could not deliver handshake failure to client.");
            }
            client.close().await;
            return;
        }
    };
    info!("Backend session established. Relaying.");

    let relay = DuplexRelay::new(session_id, client.clone(), backend);
    relay.run().await;
    client.close().await;
    info!(state = ?relay.state(), "Voice session finished.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test_support::{FakeBackend, FakeClient, FakeConnector, MockChat, TEST_PERSONA, app_state_with},
        ws::{connection::ClientError, protocol::ClientFrame},
    };
    use bytes::Bytes;
    use twin_core::{generic_types::ResponseEvent, realtime_api::SessionError};

    fn app_state(connector: Arc<FakeConnector>) -> AppState {
        app_state_with(connector, Arc::new(MockChat::new()))
    }

    #[tokio::test]
    async fn test_failed_handshake_reports_error_and_closes_client() {
        let connector = Arc::new(FakeConnector::failing(SessionError::Connect(
            "bad key".to_string(),
        )));
        let state = app_state(connector.clone());
        let (client, _client_tx) = FakeClient::new();

        run_voice_session(1, client.clone(), &state).await;

        assert_eq!(
            client.sent(),
            vec![ServerFrame::Message(ServerMessage::Error {
                message: "failed to establish backend session: bad key".to_string()
            })]
        );
        assert_eq!(client.close_calls(), 1);
        assert_eq!(connector.configs.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_handshake_with_departed_client_still_closes_it() {
        let connector = Arc::new(FakeConnector::failing(SessionError::Connect(
            "bad key".to_string(),
        )));
        let state = app_state(connector);
        let (client, _client_tx) = FakeClient::new();
        client.fail_sends_with(ClientError::Disconnected);

        run_voice_session(3, client.clone(), &state).await;

        assert!(client.sent().is_empty());
        assert_eq!(client.failed_sends(), 1);
        assert_eq!(client.close_calls(), 1);
    }

    #[tokio::test]
    async fn test_session_uses_live_config_and_tears_down_both_ends() {
        let (backend, events) = FakeBackend::new();
        let connector = Arc::new(FakeConnector::with_backend(backend.clone()));
        let state = app_state(connector.clone());
        let (client, client_tx) = FakeClient::new();

        events.send(Ok(ResponseEvent::audio(vec![9u8, 9]))).unwrap();
        client_tx
            .send(Ok(ClientFrame::Audio(Bytes::from_static(&[1, 1]))))
            .unwrap();
        client_tx
            .send(Ok(ClientFrame::Text(r#"{"type":"close"}"#.to_string())))
            .unwrap();

        run_voice_session(2, client.clone(), &state).await;

        let configs = connector.configs.lock().unwrap().clone();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].voice_name, "Kore");
        assert_eq!(configs[0].instructions, TEST_PERSONA);
        assert_eq!(backend.close_calls(), 1);
        assert!(client.close_calls() >= 1);
        assert_eq!(backend.received().len(), 1);
    }
}
