use crate::chat::{ChatTurn, build_messages};
use anyhow::{Context, Result};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{CreateChatCompletionRequestArgs, CreateChatCompletionResponse},
};
use async_trait::async_trait;
use tracing::debug;

/// Sampling settings for a single text generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_output_tokens: 1024,
        }
    }
}

/// A generic client for one-shot text generation.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Makes a single, non-streaming call and returns the model's text.
    async fn generate(
        &self,
        system_prompt: String,
        history: Vec<ChatTurn>,
        message: String,
    ) -> Result<String>;
}

/// An implementation of `ChatClient` for any OpenAI-compatible API.
pub struct OpenAICompatibleClient {
    client: Client<OpenAIConfig>,
    model: String,
    options: GenerationOptions,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `config` - API key and base URL of the service.
    /// * `model` - The model identifier used for completions.
    pub fn new(config: OpenAIConfig, model: String) -> Self {
        Self {
            client: Client::with_config(config),
            model,
            options: GenerationOptions::default(),
        }
    }
}

#[async_trait]
impl ChatClient for OpenAICompatibleClient {
    async fn generate(
        &self,
        system_prompt: String,
        history: Vec<ChatTurn>,
        message: String,
    ) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(build_messages(&system_prompt, &history, &message)?)
            .temperature(self.options.temperature)
            .max_completion_tokens(self.options.max_output_tokens)
            .build()?;

        debug!(model = %self.model, turns = history.len(), "Requesting chat completion");
        let response: CreateChatCompletionResponse = self.client.chat().create(request).await?;

        let answer = response
            .choices
            .first()
            .context("No response choice from LLM")?
            .message
            .content
            .clone()
            .context("No content in LLM response")?;
        Ok(answer)
    }
}
