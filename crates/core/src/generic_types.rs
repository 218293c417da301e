use bytes::Bytes;

/// MIME tag attached to every audio chunk forwarded from the client.
pub const INBOUND_AUDIO_MIME: &str = "audio/pcm;rate=16000";

/// Modalities the backend can answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseModality {
    Text,
    #[default]
    Audio,
}

/// Fixed configuration for opening a real-time session with any provider.
#[derive(Debug, Clone, Default)]
pub struct LiveSessionConfig {
    pub model: String,
    /// Persona / system instruction text.
    pub instructions: String,
    /// Prebuilt voice used for synthesized speech.
    pub voice_name: String,
    pub response_modality: ResponseModality,
}

/// One chunk of raw client audio on its way to the backend.
///
/// The payload is opaque; format correctness is the sender's responsibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    pub data: Bytes,
    pub mime_type: &'static str,
}

impl AudioChunk {
    /// Wraps 16-bit, 16kHz, mono PCM with the inbound format descriptor.
    pub fn pcm16(data: Bytes) -> Self {
        Self {
            data,
            mime_type: INBOUND_AUDIO_MIME,
        }
    }
}

/// A single event yielded by the backend's response stream.
///
/// Either field may be empty; an event with neither is still a valid event
/// and is simply ignored by consumers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseEvent {
    /// Raw 16-bit, 24kHz, mono PCM from the model.
    pub audio: Option<Bytes>,
    /// The model finished its turn.
    pub turn_complete: bool,
}

impl ResponseEvent {
    pub fn audio(data: impl Into<Bytes>) -> Self {
        Self {
            audio: Some(data.into()),
            turn_complete: false,
        }
    }

    pub fn turn_complete() -> Self {
        Self {
            audio: None,
            turn_complete: true,
        }
    }
}
