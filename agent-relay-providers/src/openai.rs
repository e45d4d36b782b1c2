//! OpenAI-compatible HTTP client implementation

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use agent_relay_core::config::ProviderConfig;

use crate::base::{ChatMessage, LLMProvider, LLMResponse, ProviderError, ProviderResult, ToolCallRequest};

/// `chat/completions` request body
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    max_tokens: u32,
    temperature: f32,
}

/// `chat/completions` response body
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    /// Some servers send `null` instead of leaving the field out
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallRequest>>,
}

#[derive(Debug, Deserialize, Default)]
struct Usage {
    #[serde(default)]
    prompt_tokens: Option<i64>,
    #[serde(default)]
    completion_tokens: Option<i64>,
    #[serde(default)]
    total_tokens: Option<i64>,
}

/// Client for any OpenAI-compatible chat completions endpoint
pub struct OpenAICompatClient {
    client: Client,
    api_base: String,
    api_key: Option<String>,
    max_tokens: u32,
    temperature: f32,
    extra_headers: HashMap<String, String>,
}

impl OpenAICompatClient {
    /// Create a client from provider configuration
    pub fn new(config: &ProviderConfig) -> Self {
        let api_key = Some(config.api_key.trim())
            .filter(|k| !k.is_empty())
            .map(ToString::to_string);

        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            extra_headers: config.extra_headers.clone(),
        }
    }

    /// Base URL requests are sent to
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn build_request<'a>(
        &self,
        model: &'a str,
        messages: Vec<ChatMessage>,
        tools: Option<Vec<serde_json::Value>>,
    ) -> ChatCompletionRequest<'a> {
        let tools = tools.filter(|t| !t.is_empty());
        ChatCompletionRequest {
            model,
            messages,
            tool_choice: tools.as_ref().map(|_| "auto"),
            tools,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    fn apply_headers(&self, mut req_builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(api_key) = &self.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        for (key, value) in &self.extra_headers {
            req_builder = req_builder.header(key, value);
        }

        req_builder
    }

    /// Convert the wire response into our standard format
    fn parse_response(response: ChatCompletionResponse) -> ProviderResult<LLMResponse> {
        let Some(choice) = response.choices.into_iter().next() else {
            return Err(ProviderError::InvalidResponse(
                "No choices in response".to_string(),
            ));
        };

        let reported = response.usage.unwrap_or_default();
        let usage: HashMap<String, i64> = [
            ("prompt_tokens", reported.prompt_tokens),
            ("completion_tokens", reported.completion_tokens),
            ("total_tokens", reported.total_tokens),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.unwrap_or_default()))
        .collect();

        Ok(LLMResponse {
            content: choice.message.content,
            tool_calls: choice.message.tool_calls.unwrap_or_default(),
            finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".to_string()),
            usage,
        })
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatClient {
    async fn chat(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        tools: Option<Vec<serde_json::Value>>,
    ) -> ProviderResult<LLMResponse> {
        let request = self.build_request(model, messages, tools);

        debug!(
            "Sending chat request to {} with model {} ({} messages)",
            self.api_base,
            model,
            request.messages.len()
        );

        let url = format!("{}/chat/completions", self.api_base);
        let response = self
            .apply_headers(self.client.post(&url).json(&request))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::ApiError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let response_data: ChatCompletionResponse = response.json().await?;
        Self::parse_response(response_data)
    }
}
