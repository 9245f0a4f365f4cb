use crate::config::{Provider, ProviderConfig};
use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

pub mod anthropic;
pub mod base_client;
pub mod factory;
pub mod openai_compatible;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Raw transport failure, before classification.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ProviderError {
    /// HTTP status when the server answered at all.
    pub status: Option<u16>,
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("Request timed out: {}", err)
        } else if err.is_connect() {
            format!("Connection failed: {}", err)
        } else {
            format!("Request failed: {}", err)
        };
        Self {
            status: err.status().map(|s| s.as_u16()),
            message,
        }
    }
}

/// Ordered text fragments of one streamed reply.
pub type FragmentStream = BoxStream<'static, Result<String, ProviderError>>;

/// Wire-format strategy for one vendor API.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    fn name(&self) -> Provider;

    /// Single-shot completion. Returns an empty string when the body
    /// carries no text.
    async fn get_response(
        &self,
        config: &ProviderConfig,
        messages: &[Message],
    ) -> Result<String, ProviderError>;

    async fn get_response_stream(
        &self,
        config: &ProviderConfig,
        messages: &[Message],
    ) -> Result<FragmentStream, ProviderError>;
}
