//! API Models
//!
//! Request and response bodies of the HTTP endpoints, annotated for OpenAPI
//! documentation with `utoipa`.

use serde::{Deserialize, Serialize};
use twin_core::chat::{ChatRole, ChatTurn};
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    User,
    Model,
}

/// One earlier turn of the conversation, supplied by the caller.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct HistoryMessage {
    pub role: HistoryRole,
    #[schema(example = "What are you working on?")]
    pub text: String,
}

impl From<HistoryMessage> for ChatTurn {
    fn from(msg: HistoryMessage) -> Self {
        let role = match msg.role {
            HistoryRole::User => ChatRole::User,
            HistoryRole::Model => ChatRole::Model,
        };
        ChatTurn {
            role,
            text: msg.text,
        }
    }
}

#[derive(Deserialize, ToSchema, Debug)]
pub struct ChatRequest {
    #[schema(example = "Which local models do you like?")]
    pub message: String,
    #[serde(default)]
    pub history: Vec<HistoryMessage>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, PartialEq, Eq)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    #[schema(example = "digital-twin")]
    pub service: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_history_defaults_to_empty() {
        let request: ChatRequest = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert_eq!(request.message, "hi");
        assert!(request.history.is_empty());
    }

    #[test]
    fn test_chat_request_with_history() {
        let request: ChatRequest = serde_json::from_str(
            r#"{"message":"and now?","history":[{"role":"user","text":"hi"},{"role":"model","text":"hello"}]}"#,
        )
        .unwrap();
        assert_eq!(
            request.history,
            vec![
                HistoryMessage {
                    role: HistoryRole::User,
                    text: "hi".to_string()
                },
                HistoryMessage {
                    role: HistoryRole::Model,
                    text: "hello".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_history_role_rejects_unknown_roles() {
        let result = serde_json::from_str::<ChatRequest>(
            r#"{"message":"hi","history":[{"role":"system","text":"x"}]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_history_message_into_chat_turn() {
        let turn: ChatTurn = HistoryMessage {
            role: HistoryRole::Model,
            text: "hello".to_string(),
        }
        .into();
        assert_eq!(turn, ChatTurn::model("hello"));
    }

    #[test]
    fn test_response_serialization() {
        let json = serde_json::to_string(&ChatResponse {
            response: "sure".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"response":"sure"}"#);
    }
}
