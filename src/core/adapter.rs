//! Turns a conversation into exactly one provider call and a normalized
//! result or error.

use crate::config::{Provider, ProviderConfig, ProviderSettings};
use crate::core::error::GenerateError;
use crate::providers::{LLMProvider, Message, ProviderError, Role};
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Instant;

/// Anything that can answer a conversation with one reply.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// `conversation` is oldest first and must end with a user message.
    async fn generate(&self, conversation: &[Message]) -> Result<String, GenerateError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// Read one completed body.
    Batch,
    /// Concatenate streamed fragments in arrival order.
    Stream,
}

pub struct ResponseAdapter {
    backend: Box<dyn LLMProvider>,
    settings: ProviderSettings,
    instruction: String,
    mode: TransportMode,
}

impl ResponseAdapter {
    pub fn new(
        backend: Box<dyn LLMProvider>,
        settings: ProviderSettings,
        instruction: impl Into<String>,
        mode: TransportMode,
    ) -> Self {
        Self {
            backend,
            settings,
            instruction: instruction.into(),
            mode,
        }
    }

    pub fn provider(&self) -> Provider {
        self.backend.name()
    }

    pub fn model(&self) -> String {
        self.settings.model_or_default(self.provider())
    }

    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    fn request_messages(&self, conversation: &[Message]) -> Vec<Message> {
        let mut messages = Vec::with_capacity(conversation.len() + 1);
        messages.push(Message::system(self.instruction.clone()));
        messages.extend(conversation.iter().cloned());
        messages
    }

    async fn send(
        &self,
        config: &ProviderConfig,
        messages: &[Message],
    ) -> Result<String, ProviderError> {
        match self.mode {
            TransportMode::Batch => self.backend.get_response(config, messages).await,
            TransportMode::Stream => {
                let mut stream = self.backend.get_response_stream(config, messages).await?;
                let mut full_response = String::new();
                while let Some(fragment) = stream.next().await {
                    full_response.push_str(&fragment?);
                }
                Ok(full_response)
            }
        }
    }
}

#[async_trait]
impl ResponseGenerator for ResponseAdapter {
    async fn generate(&self, conversation: &[Message]) -> Result<String, GenerateError> {
        let provider = self.provider();

        if conversation.last().map(|m| m.role) != Some(Role::User) {
            return Err(GenerateError::Unknown(
                "A conversation must end with a user message.".to_string(),
            ));
        }

        let config = self.settings.resolve(provider).inspect_err(|_| {
            tracing::warn!(provider = %provider, "credential not configured");
        })?;

        let messages = self.request_messages(conversation);
        let started = Instant::now();
        let result = self.send(&config, &messages).await;
        let duration_ms = started.elapsed().as_millis();

        match result {
            Ok(text) if text.trim().is_empty() => {
                tracing::warn!(
                    provider = %provider,
                    model = %config.model,
                    duration_ms = %duration_ms,
                    "provider returned no content"
                );
                Err(GenerateError::EmptyResponse { provider })
            }
            Ok(text) => {
                tracing::info!(
                    provider = %provider,
                    model = %config.model,
                    mode = ?self.mode,
                    duration_ms = %duration_ms,
                    reply_chars = text.chars().count(),
                    "generation completed"
                );
                Ok(text)
            }
            Err(failure) => {
                tracing::error!(
                    provider = %provider,
                    model = %config.model,
                    duration_ms = %duration_ms,
                    status = ?failure.status,
                    error = %failure.message,
                    "generation failed"
                );
                Err(GenerateError::classify(provider, &failure))
            }
        }
    }
}
