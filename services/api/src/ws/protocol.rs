//! Defines the `/voice` WebSocket message protocol between the client and the server.
//!
//! Audio travels as raw binary frames in both directions; the JSON messages
//! below are the only text frames.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Control messages sent from the client.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// The user finished speaking. Advisory only; the backend detects turns itself.
    End,
    /// The client wants the session torn down.
    Close,
    /// Any other `type` value, accepted for forward compatibility.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Parses a text frame. Returns `None` for anything that is not a JSON
    /// object with a string `type`; callers ignore those frames.
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }
}

/// Control messages sent to the client.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The model finished speaking for this turn.
    TurnComplete,
    /// The session failed; sent at most once, right before teardown.
    Error { message: String },
}

/// One unit received from the client connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    /// 16-bit, 16kHz, mono PCM.
    Audio(Bytes),
    Text(String),
}

/// One unit sent to the client connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerFrame {
    /// 16-bit, 24kHz, mono PCM, forwarded verbatim from the backend.
    Audio(Bytes),
    Message(ServerMessage),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_client_messages() {
        assert_eq!(ClientMessage::parse(r#"{"type":"end"}"#), Some(ClientMessage::End));
        assert_eq!(
            ClientMessage::parse(r#"{"type": "close"}"#),
            Some(ClientMessage::Close)
        );
        assert_eq!(
            ClientMessage::parse(r#"{"type":"close","reason":"bye"}"#),
            Some(ClientMessage::Close)
        );
    }

    #[test]
    fn test_parse_unknown_type_is_accepted() {
        assert_eq!(
            ClientMessage::parse(r#"{"type":"ping"}"#),
            Some(ClientMessage::Unknown)
        );
    }

    #[test]
    fn test_parse_malformed_messages() {
        for text in ["not json", "", "[]", r#"{"kind":"end"}"#, "{"] {
            assert_eq!(ClientMessage::parse(text), None, "text: {text}");
        }
    }

    #[test]
    fn test_server_message_serialization() {
        assert_eq!(
            serde_json::to_string(&ServerMessage::TurnComplete).unwrap(),
            r#"{"type":"turn_complete"}"#
        );
        assert_eq!(
            serde_json::to_string(&ServerMessage::Error {
                message: "boom".to_string()
            })
            .unwrap(),
            r#"{"type":"error","message":"boom"}"#
        );
    }
}
