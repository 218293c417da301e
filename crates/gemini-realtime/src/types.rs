//! Wire types for the Gemini Live `BidiGenerateContent` WebSocket protocol.

use base64::Engine;
use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use twin_core::{
    generic_types::{LiveSessionConfig, ResponseEvent},
    realtime_api::SessionError,
};

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) enum ClientMessage {
    Setup(BidiGenerateContentSetup),
    RealtimeInput(BidiGenerateContentRealtimeInput),
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BidiGenerateContentSetup {
    pub model: String,
    pub generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
}

impl BidiGenerateContentSetup {
    pub(crate) fn from_config(config: &LiveSessionConfig) -> Self {
        let model = if config.model.starts_with("models/") {
            config.model.clone()
        } else {
            format!("models/{}", config.model)
        };
        let speech_config = (!config.voice_name.is_empty()).then(|| SpeechConfig {
            voice_config: VoiceConfig {
                prebuilt_voice_config: PrebuiltVoiceConfig {
                    voice_name: config.voice_name.clone(),
                },
            },
        });
        let system_instruction = (!config.instructions.is_empty()).then(|| Content {
            parts: vec![Part {
                text: config.instructions.clone(),
            }],
        });
        Self {
            model,
            generation_config: GenerationConfig {
                response_modalities: vec![config.response_modality.into()],
                speech_config,
            },
            system_instruction,
        }
    }
}

#[derive(Serialize, Debug)]
pub(crate) struct Content {
    pub parts: Vec<Part>,
}

#[derive(Serialize, Debug)]
pub(crate) struct Part {
    pub text: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationConfig {
    pub response_modalities: Vec<ResponseModality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<SpeechConfig>,
}

#[derive(Serialize, Debug, Clone, Copy)]
#[serde(rename_all = "UPPERCASE")]
pub(crate) enum ResponseModality {
    Text,
    Audio,
}

impl From<twin_core::generic_types::ResponseModality> for ResponseModality {
    fn from(modality: twin_core::generic_types::ResponseModality) -> Self {
        match modality {
            twin_core::generic_types::ResponseModality::Text => ResponseModality::Text,
            twin_core::generic_types::ResponseModality::Audio => ResponseModality::Audio,
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BidiGenerateContentRealtimeInput {
    pub audio: Blob,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Blob {
    pub mime_type: String,
    pub data: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ServerMessage {
    pub setup_complete: Option<serde_json::Value>,
    pub server_content: Option<LiveServerContent>,
    pub go_away: Option<serde_json::Value>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LiveServerContent {
    pub model_turn: Option<ServerContentTurn>,
    pub turn_complete: Option<bool>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ServerContentTurn {
    #[serde(default)]
    pub parts: Vec<ServerPart>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ServerPart {
    pub inline_data: Option<ServerBlob>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ServerBlob {
    pub data: String,
}

impl ServerMessage {
    pub(crate) fn parse(payload: &[u8]) -> Result<Self, SessionError> {
        serde_json::from_slice(payload).map_err(|e| SessionError::Protocol(e.to_string()))
    }

    /// Extracts the relay-relevant part of a server message.
    ///
    /// Returns `None` for messages carrying neither audio nor a turn boundary.
    pub(crate) fn into_event(self) -> Result<Option<ResponseEvent>, SessionError> {
        let Some(content) = self.server_content else {
            return Ok(None);
        };

        let mut audio = BytesMut::new();
        let mut has_audio = false;
        for part in content.model_turn.into_iter().flat_map(|turn| turn.parts) {
            if let Some(blob) = part.inline_data {
                let decoded = base64::engine::general_purpose::STANDARD
                    .decode(blob.data.as_bytes())
                    .map_err(|e| SessionError::Protocol(format!("invalid inline audio: {e}")))?;
                audio.extend_from_slice(&decoded);
                has_audio = true;
            }
        }
        let turn_complete = content.turn_complete == Some(true);

        if !has_audio && !turn_complete {
            return Ok(None);
        }
        Ok(Some(ResponseEvent {
            audio: has_audio.then(|| audio.freeze()),
            turn_complete,
        }))
    }
}
