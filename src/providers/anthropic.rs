use crate::config::{Provider, ProviderConfig};
use crate::providers::base_client::{AuthScheme, HttpClient, data_payload};
use crate::providers::{FragmentStream, LLMProvider, Message, ProviderError, Role};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Parser for Anthropic's streaming response
pub fn anthropic_stream_parser(line: &str) -> Result<Option<String>, ProviderError> {
    let Some(data) = data_payload(line) else {
        return Ok(None);
    };
    if data.is_empty() {
        return Ok(None);
    }

    let parsed: Value = serde_json::from_str(data)
        .map_err(|e| ProviderError::new(format!("Failed to parse stream data: {}", e)))?;

    match parsed["type"].as_str() {
        Some("content_block_delta") if parsed["delta"]["type"] == "text_delta" => {
            Ok(parsed["delta"]["text"].as_str().map(str::to_owned))
        }
        Some("error") => {
            let error = &parsed["error"];
            let message = error["message"].as_str().unwrap_or("unknown stream error");
            // overloaded_error and rate_limit_error carry no status on the stream
            Err(ProviderError::new(format!(
                "{}: {}",
                error["type"].as_str().unwrap_or("error"),
                message
            )))
        }
        _ => Ok(None),
    }
}

#[derive(Clone)]
pub struct AnthropicProvider {
    client: HttpClient,
}

impl AnthropicProvider {
    pub fn new() -> Self {
        let mut extra_headers = HashMap::new();
        extra_headers.insert(
            "anthropic-version".to_string(),
            ANTHROPIC_VERSION.to_string(),
        );
        Self {
            client: HttpClient::new(AuthScheme::Header("x-api-key"), Some(extra_headers)),
        }
    }

    /// The system instruction travels in its own field; the message list only
    /// holds user and assistant turns.
    fn build_request<'a>(
        config: &'a ProviderConfig,
        messages: &'a [Message],
        stream: bool,
    ) -> AnthropicRequest<'a> {
        let system = messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str());

        AnthropicRequest {
            model: &config.model,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            messages: messages
                .iter()
                .filter(|m| m.role != Role::System)
                .map(|m| AnthropicMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            stream,
            system,
        }
    }
}

impl Default for AnthropicProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    fn name(&self) -> Provider {
        Provider::Anthropic
    }

    async fn get_response(
        &self,
        config: &ProviderConfig,
        messages: &[Message],
    ) -> Result<String, ProviderError> {
        let payload = Self::build_request(config, messages, false);
        let response = self
            .client
            .post(&config.base_url, "messages", &config.api_key, &payload)
            .await?;

        let response_body = response.text().await?;
        let parsed: AnthropicResponse = serde_json::from_str(&response_body)
            .map_err(|e| ProviderError::new(format!("Malformed response body: {}", e)))?;

        Ok(parsed
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join(""))
    }

    async fn get_response_stream(
        &self,
        config: &ProviderConfig,
        messages: &[Message],
    ) -> Result<FragmentStream, ProviderError> {
        let payload = Self::build_request(config, messages, true);
        let response = self
            .client
            .post(&config.base_url, "messages", &config.api_key, &payload)
            .await?;

        Ok(self.client.stream_response(response, anthropic_stream_parser))
    }
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    messages: Vec<AnthropicMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: Option<String>,
}
