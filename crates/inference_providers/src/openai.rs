//! OpenAI-compatible provider implementation
//!
//! Works against any endpoint implementing OpenAI's chat-completion
//! format (api.openai.com, Azure OpenAI, Together, Groq, Fireworks,
//! local vLLM deployments, and so on).

use crate::sse_parser::SseParser;
use crate::{
    ChatCompletionParams, ChatCompletionResponse, ChatProvider, CompletionError, StreamOptions,
    StreamingResult,
};
use async_trait::async_trait;
use reqwest::{header::HeaderValue, Client};
use std::collections::HashMap;

/// Connection settings for one OpenAI-compatible endpoint
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_seconds: u32,
    /// Provider-specific extras (e.g. "organization_id")
    pub extra: HashMap<String, String>,
}

impl EndpointConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout_seconds: 300,
            extra: HashMap::new(),
        }
    }
}

/// OpenAI-compatible chat-completion client
pub struct OpenAiCompatibleProvider {
    client: Client,
    config: EndpointConfig,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: EndpointConfig) -> Self {
        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(30))
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    fn build_headers(&self) -> Result<reqwest::header::HeaderMap, String> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        let auth_value = format!("Bearer {}", self.config.api_key);
        let header_value = HeaderValue::from_str(&auth_value)
            .map_err(|e| format!("Invalid API key format: {e}"))?;
        headers.insert("Authorization", header_value);

        // OpenAI organization header (if provided)
        if let Some(org_id) = self.config.extra.get("organization_id") {
            if let Ok(value) = HeaderValue::from_str(org_id) {
                headers.insert("OpenAI-Organization", value);
            }
        }

        Ok(headers)
    }

    async fn post_completion(
        &self,
        params: &ChatCompletionParams,
    ) -> Result<reqwest::Response, CompletionError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let headers = self.build_headers().map_err(|message| CompletionError::Connect {
            model: params.model.clone(),
            status: None,
            message,
        })?;
        let timeout = std::time::Duration::from_secs(self.config.timeout_seconds as u64);

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .timeout(timeout)
            .json(params)
            .send()
            .await
            .map_err(|e| CompletionError::Connect {
                model: params.model.clone(),
                status: None,
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("Failed to read error response body: {e}"));
            return Err(CompletionError::Connect {
                model: params.model.clone(),
                status: Some(status),
                message: body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatibleProvider {
    async fn chat_completion_stream(
        &self,
        params: ChatCompletionParams,
    ) -> Result<StreamingResult, CompletionError> {
        // Ensure streaming and usage reporting are enabled
        let mut streaming_params = params;
        streaming_params.stream = Some(true);
        streaming_params.stream_options = Some(StreamOptions {
            include_usage: Some(true),
        });

        let response = self.post_completion(&streaming_params).await?;

        let sse_stream = SseParser::new(response.bytes_stream());
        Ok(Box::pin(sse_stream))
    }

    async fn chat_completion(
        &self,
        params: ChatCompletionParams,
    ) -> Result<ChatCompletionResponse, CompletionError> {
        let mut non_streaming_params = params;
        non_streaming_params.stream = Some(false);
        non_streaming_params.stream_options = None;

        let response = self.post_completion(&non_streaming_params).await?;

        response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| CompletionError::InvalidResponse(format!("Failed to parse response: {e}")))
    }
}
