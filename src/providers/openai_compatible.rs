use crate::config::{Provider, ProviderConfig};
use crate::providers::base_client::{AuthScheme, HttpClient, data_payload};
use crate::providers::{FragmentStream, LLMProvider, Message, ProviderError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parser for OpenAI-compatible streaming lines (OpenAI, Mistral)
pub fn openai_stream_parser(line: &str) -> Result<Option<String>, ProviderError> {
    let Some(data) = data_payload(line) else {
        return Ok(None);
    };
    if data.is_empty() || data == "[DONE]" {
        return Ok(None);
    }

    let parsed: Value = serde_json::from_str(data)
        .map_err(|e| ProviderError::new(format!("Failed to parse stream data: {}", e)))?;

    if let Some(error) = parsed.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| error.as_str())
            .unwrap_or("unknown stream error");
        return Err(ProviderError::new(message));
    }

    Ok(parsed
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
        .map(str::to_owned))
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatCompletionMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
    stream: bool,
}

#[derive(Serialize)]
struct ChatCompletionMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    content: Option<String>,
}

/// Chat-completions client shared by every vendor that speaks the OpenAI
/// wire format.
#[derive(Clone)]
pub struct OpenAICompatibleProvider {
    provider: Provider,
    client: HttpClient,
}

impl OpenAICompatibleProvider {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            client: HttpClient::new(AuthScheme::Bearer, None),
        }
    }

    fn build_request<'a>(
        config: &'a ProviderConfig,
        messages: &'a [Message],
        stream: bool,
    ) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &config.model,
            messages: messages
                .iter()
                .map(|m| ChatCompletionMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            top_p: config.top_p,
            presence_penalty: config.presence_penalty,
            frequency_penalty: config.frequency_penalty,
            stream,
        }
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatibleProvider {
    fn name(&self) -> Provider {
        self.provider
    }

    async fn get_response(
        &self,
        config: &ProviderConfig,
        messages: &[Message],
    ) -> Result<String, ProviderError> {
        let payload = Self::build_request(config, messages, false);
        let response = self
            .client
            .post(&config.base_url, "chat/completions", &config.api_key, &payload)
            .await?;

        let response_body = response.text().await?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&response_body)
            .map_err(|e| ProviderError::new(format!("Malformed response body: {}", e)))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }

    async fn get_response_stream(
        &self,
        config: &ProviderConfig,
        messages: &[Message],
    ) -> Result<FragmentStream, ProviderError> {
        let payload = Self::build_request(config, messages, true);
        let response = self
            .client
            .post(&config.base_url, "chat/completions", &config.api_key, &payload)
            .await?;

        Ok(self.client.stream_response(response, openai_stream_parser))
    }
}
