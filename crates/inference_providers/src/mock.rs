//! Mock implementation of ChatProvider for testing
//!
//! This module provides a mock provider that generates realistic
//! streaming responses without requiring a live endpoint. Tests
//! configure it through an expectation builder: match on the request,
//! respond from a template. Templates can emit tool-call deltas,
//! simulate a connect failure for selected models (to exercise the
//! fallback path) and cut the stream mid-way (to exercise partial
//! salvage).

use crate::{
    ChatChoice, ChatCompletionChunk, ChatCompletionParams, ChatCompletionResponse,
    ChatCompletionResponseChoice, ChatDelta, ChatMessage, ChatProvider, ChatResponseMessage,
    CompletionError, FinishReason, FunctionCall, MessageRole, StreamingResult, TokenUsage,
    ToolCall,
};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

/// Request matcher for conditional responses
#[derive(Clone)]
pub enum RequestMatcher {
    /// Match any request
    Any,
    /// Match requests whose combined message text contains the needle
    PromptContains(String),
    /// Match requests for a specific model id
    Model(String),
}

impl RequestMatcher {
    /// Check if this matcher matches the given parameters
    pub fn matches(&self, params: &ChatCompletionParams) -> bool {
        match self {
            Self::Any => true,
            Self::PromptContains(needle) => {
                Self::extract_text_from_messages(&params.messages).contains(needle)
            }
            Self::Model(model) => params.model == *model,
        }
    }

    /// Extract all text content from messages
    fn extract_text_from_messages(messages: &[ChatMessage]) -> String {
        messages
            .iter()
            .filter_map(|msg| msg.content.as_deref())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Template for generating responses
#[derive(Clone)]
pub struct ResponseTemplate {
    content: String,
    /// Emit a native tool call (name, arguments) after the content
    tool_call: Option<(String, serde_json::Value)>,
    /// Cut the stream after N chunks and end it with a transport error
    disconnect_after_chunks: Option<usize>,
}

impl ResponseTemplate {
    /// Create a new response template with the given content
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_call: None,
            disconnect_after_chunks: None,
        }
    }

    /// Emit a native tool-call for this template, finishing the stream
    /// with a `tool_calls` finish reason. Arguments are streamed in two
    /// fragments the way real providers deliver them.
    pub fn with_tool_call(mut self, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        self.tool_call = Some((name.into(), arguments));
        self
    }

    /// Simulate a transport failure after N chunks
    pub fn with_disconnect_after(mut self, chunks: usize) -> Self {
        self.disconnect_after_chunks = Some(chunks);
        self
    }

    fn base_chunk(id: &str, created: i64, model: &str) -> ChatCompletionChunk {
        ChatCompletionChunk {
            id: id.to_string(),
            object: "chat.completion.chunk".to_string(),
            created,
            model: model.to_string(),
            choices: vec![],
            usage: None,
        }
    }

    fn delta_chunk(id: &str, created: i64, model: &str, delta: ChatDelta, finish: Option<FinishReason>) -> ChatCompletionChunk {
        let mut chunk = Self::base_chunk(id, created, model);
        chunk.choices = vec![ChatChoice {
            index: 0,
            delta: Some(delta),
            finish_reason: finish,
        }];
        chunk
    }

    fn text_delta(content: String) -> ChatDelta {
        ChatDelta {
            role: None,
            content: Some(content),
            tool_calls: None,
        }
    }

    /// Generate streaming chunks from this template
    /// Streams word-by-word (split by spaces) for realistic chunking
    fn generate_chunks(&self, id: String, created: i64, model: String) -> Vec<ChatCompletionChunk> {
        let mut chunks = Vec::new();
        let mut output_tokens = 0;

        if !self.content.is_empty() {
            let words: Vec<&str> = self.content.split(' ').collect();
            let last = words.len() - 1;
            for (i, word) in words.iter().enumerate() {
                output_tokens += 1;
                let word_with_space = if i == 0 {
                    word.to_string()
                } else {
                    format!(" {}", word)
                };
                let finish = if i == last && self.tool_call.is_none() {
                    Some(FinishReason::Stop)
                } else {
                    None
                };
                chunks.push(Self::delta_chunk(
                    &id,
                    created,
                    &model,
                    Self::text_delta(word_with_space),
                    finish,
                ));
            }
        }

        if let Some((name, arguments)) = &self.tool_call {
            let args = arguments.to_string();
            // Keep the split on a char boundary so multi-byte argument
            // text still fragments cleanly
            let mut split_at = args.len() / 2;
            while !args.is_char_boundary(split_at) {
                split_at += 1;
            }
            let (head, tail) = args.split_at(split_at);

            // First fragment carries id, name and the opening of the
            // argument string; the second carries the rest.
            chunks.push(Self::delta_chunk(
                &id,
                created,
                &model,
                ChatDelta {
                    role: None,
                    content: None,
                    tool_calls: Some(vec![ToolCall {
                        id: Some(format!("call_{}", uuid::Uuid::new_v4().simple())),
                        type_: Some("function".to_string()),
                        function: FunctionCall {
                            name: Some(name.clone()),
                            arguments: Some(head.to_string()),
                        },
                        index: Some(0),
                    }]),
                },
                None,
            ));
            chunks.push(Self::delta_chunk(
                &id,
                created,
                &model,
                ChatDelta {
                    role: None,
                    content: None,
                    tool_calls: Some(vec![ToolCall {
                        id: None,
                        type_: None,
                        function: FunctionCall {
                            name: None,
                            arguments: Some(tail.to_string()),
                        },
                        index: Some(0),
                    }]),
                },
                None,
            ));
            let mut finish = Self::base_chunk(&id, created, &model);
            finish.choices = vec![ChatChoice {
                index: 0,
                delta: Some(ChatDelta {
                    role: None,
                    content: None,
                    tool_calls: None,
                }),
                finish_reason: Some(FinishReason::ToolCalls),
            }];
            chunks.push(finish);
            output_tokens += 4;
        }

        // Final chunk with usage only
        let mut usage_chunk = Self::base_chunk(&id, created, &model);
        usage_chunk.usage = Some(TokenUsage::new(10, output_tokens));
        chunks.push(usage_chunk);

        chunks
    }

    /// Generate a full (non-streaming) response from this template
    fn generate_response(&self, id: String, created: i64, model: String) -> ChatCompletionResponse {
        let output_tokens = self.content.split_whitespace().count() as i32;
        ChatCompletionResponse {
            id,
            object: "chat.completion".to_string(),
            created,
            model,
            choices: vec![ChatCompletionResponseChoice {
                index: 0,
                message: ChatResponseMessage {
                    role: MessageRole::Assistant,
                    content: Some(self.content.clone()),
                    tool_calls: None,
                },
                finish_reason: Some("stop".to_string()),
            }],
            usage: Some(TokenUsage::new(10, output_tokens)),
        }
    }
}

/// Configuration for a single expectation
struct MockExpectation {
    matcher: RequestMatcher,
    response: ResponseTemplate,
}

/// Configuration for the mock provider
struct MockConfig {
    expectations: Vec<MockExpectation>,
    default_response: ResponseTemplate,
    fail_connect_models: HashSet<String>,
}

/// Builder for configuring a single expectation
pub struct MockExpectationBuilder {
    config: Arc<Mutex<MockConfig>>,
    matcher: RequestMatcher,
}

impl MockExpectationBuilder {
    /// Set the response for this expectation
    pub async fn respond_with(self, response: ResponseTemplate) {
        let mut config = self.config.lock().await;
        config.expectations.push(MockExpectation {
            matcher: self.matcher,
            response,
        });
    }
}

/// Mock provider that implements ChatProvider for testing
pub struct MockProvider {
    config: Arc<Mutex<MockConfig>>,
    /// Every request this provider received, in order
    calls: Arc<Mutex<Vec<ChatCompletionParams>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            config: Arc::new(Mutex::new(MockConfig {
                expectations: Vec::new(),
                default_response: ResponseTemplate::new(
                    "This is a mock response from the assistant.",
                ),
                fail_connect_models: HashSet::new(),
            })),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Start configuring a conditional response
    pub fn when_matching(&self, matcher: RequestMatcher) -> MockExpectationBuilder {
        MockExpectationBuilder {
            config: self.config.clone(),
            matcher,
        }
    }

    /// Replace the fallthrough response
    pub async fn set_default_response(&self, response: ResponseTemplate) {
        self.config.lock().await.default_response = response;
    }

    /// Make connection attempts for the given model fail with a 503
    pub async fn fail_connect_for(&self, model: impl Into<String>) {
        self.config.lock().await.fail_connect_models.insert(model.into());
    }

    /// Number of requests received so far (streaming and non-streaming)
    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    /// All requests received so far, in order
    pub async fn calls(&self) -> Vec<ChatCompletionParams> {
        self.calls.lock().await.clone()
    }

    async fn resolve(&self, params: &ChatCompletionParams) -> Result<ResponseTemplate, CompletionError> {
        let config = self.config.lock().await;
        if config.fail_connect_models.contains(&params.model) {
            return Err(CompletionError::Connect {
                model: params.model.clone(),
                status: Some(503),
                message: "mock connect failure".to_string(),
            });
        }
        let template = config
            .expectations
            .iter()
            .find(|e| e.matcher.matches(params))
            .map(|e| e.response.clone())
            .unwrap_or_else(|| config.default_response.clone());
        Ok(template)
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatProvider for MockProvider {
    async fn chat_completion_stream(
        &self,
        params: ChatCompletionParams,
    ) -> Result<StreamingResult, CompletionError> {
        self.calls.lock().await.push(params.clone());
        let template = self.resolve(&params).await?;

        let id = format!("chatcmpl-{}", uuid::Uuid::new_v4().simple());
        let chunks = template.generate_chunks(id, Self::now(), params.model);

        let mut items: Vec<Result<ChatCompletionChunk, CompletionError>> =
            chunks.into_iter().map(Ok).collect();
        if let Some(n) = template.disconnect_after_chunks {
            items.truncate(n);
            items.push(Err(CompletionError::Stream(
                "connection reset by peer".to_string(),
            )));
        }

        Ok(Box::pin(futures_util::stream::iter(items)))
    }

    async fn chat_completion(
        &self,
        params: ChatCompletionParams,
    ) -> Result<ChatCompletionResponse, CompletionError> {
        self.calls.lock().await.push(params.clone());
        let template = self.resolve(&params).await?;

        let id = format!("chatcmpl-{}", uuid::Uuid::new_v4().simple());
        Ok(template.generate_response(id, Self::now(), params.model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    async fn collect_text(mut stream: StreamingResult) -> String {
        let mut text = String::new();
        while let Some(chunk) = stream.next().await {
            if let Ok(chunk) = chunk {
                if let Some(delta) = chunk.content_delta() {
                    text.push_str(delta);
                }
            }
        }
        text
    }

    #[tokio::test]
    async fn test_default_response_streams_word_by_word() {
        let provider = MockProvider::new();
        let stream = provider
            .chat_completion_stream(ChatCompletionParams::new("m", vec![ChatMessage::user("hi")]))
            .await
            .unwrap();
        let text = collect_text(stream).await;
        assert_eq!(text, "This is a mock response from the assistant.");
        assert_eq!(provider.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_expectation_matching() {
        let provider = MockProvider::new();
        provider
            .when_matching(RequestMatcher::PromptContains("weather".to_string()))
            .respond_with(ResponseTemplate::new("It is sunny."))
            .await;

        let stream = provider
            .chat_completion_stream(ChatCompletionParams::new(
                "m",
                vec![ChatMessage::user("what is the weather today?")],
            ))
            .await
            .unwrap();
        assert_eq!(collect_text(stream).await, "It is sunny.");
    }

    #[tokio::test]
    async fn test_tool_call_template_accumulates() {
        let provider = MockProvider::new();
        provider
            .set_default_response(
                ResponseTemplate::new("").with_tool_call(
                    "web_search",
                    serde_json::json!({"query": "rust news", "reason": "current info"}),
                ),
            )
            .await;

        let mut stream = provider
            .chat_completion_stream(ChatCompletionParams::new("m", vec![ChatMessage::user("hi")]))
            .await
            .unwrap();

        let mut name = None;
        let mut args = String::new();
        let mut finish = None;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.unwrap();
            if let Some(choice) = chunk.choices.first() {
                if let Some(delta) = &choice.delta {
                    for call in delta.tool_calls.iter().flatten() {
                        if let Some(n) = &call.function.name {
                            name = Some(n.clone());
                        }
                        if let Some(a) = &call.function.arguments {
                            args.push_str(a);
                        }
                    }
                }
                if let Some(reason) = choice.finish_reason {
                    finish = Some(reason);
                }
            }
        }

        assert_eq!(name.as_deref(), Some("web_search"));
        assert_eq!(finish, Some(FinishReason::ToolCalls));
        let parsed: serde_json::Value = serde_json::from_str(&args).unwrap();
        assert_eq!(parsed["query"], "rust news");
    }

    #[tokio::test]
    async fn test_tool_call_template_with_non_ascii_arguments() {
        let provider = MockProvider::new();
        provider
            .set_default_response(
                ResponseTemplate::new("").with_tool_call(
                    "web_search",
                    serde_json::json!({"query": "météo à Zürich aujourd'hui ☀️"}),
                ),
            )
            .await;

        let mut stream = provider
            .chat_completion_stream(ChatCompletionParams::new("m", vec![ChatMessage::user("hi")]))
            .await
            .unwrap();

        let mut args = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.unwrap();
            if let Some(delta) = chunk.choices.first().and_then(|c| c.delta.as_ref()) {
                for call in delta.tool_calls.iter().flatten() {
                    if let Some(a) = &call.function.arguments {
                        args.push_str(a);
                    }
                }
            }
        }

        let parsed: serde_json::Value = serde_json::from_str(&args).unwrap();
        assert_eq!(parsed["query"], "météo à Zürich aujourd'hui ☀️");
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let provider = MockProvider::new();
        provider.fail_connect_for("bad-model").await;

        let err = provider
            .chat_completion_stream(ChatCompletionParams::new(
                "bad-model",
                vec![ChatMessage::user("hi")],
            ))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, CompletionError::Connect { status: Some(503), .. }));
    }

    #[tokio::test]
    async fn test_disconnect_mid_stream() {
        let provider = MockProvider::new();
        provider
            .set_default_response(ResponseTemplate::new("one two three four five").with_disconnect_after(2))
            .await;

        let mut stream = provider
            .chat_completion_stream(ChatCompletionParams::new("m", vec![ChatMessage::user("hi")]))
            .await
            .unwrap();

        let mut text = String::new();
        let mut saw_error = false;
        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => {
                    if let Some(delta) = chunk.content_delta() {
                        text.push_str(delta);
                    }
                }
                Err(CompletionError::Stream(_)) => saw_error = true,
                Err(other) => panic!("unexpected error {other:?}"),
            }
        }

        assert_eq!(text, "one two");
        assert!(saw_error);
    }
}
