//! Inference provider clients for the generation backend
//!
//! This crate provides a streaming-first trait interface over
//! OpenAI-compatible chat-completion endpoints. Streams are lazy,
//! single-consumer and forward-only: the caller either drains a stream
//! to completion or drops it, which releases the underlying connection.
//!
//! Failure semantics follow the orchestrator's needs:
//!
//! - a non-2xx response at connection time surfaces as
//!   [`CompletionError::Connect`] (retryable against a fallback model),
//! - a transport failure mid-stream surfaces as
//!   [`CompletionError::Stream`] after whatever chunks were already
//!   delivered (the caller keeps the partial text),
//! - a single malformed delta frame is skipped with a warning rather
//!   than aborting the whole stream.
//!
//! The client itself never retries; model fallback is the caller's job.

pub mod mock;
pub mod models;
pub mod openai;
pub mod sse_parser;

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

// Re-export commonly used types for convenience
pub use mock::{MockProvider, RequestMatcher, ResponseTemplate};
pub use models::{
    ChatChoice, ChatCompletionChunk, ChatCompletionParams, ChatCompletionResponse,
    ChatCompletionResponseChoice, ChatDelta, ChatMessage, ChatResponseMessage, CompletionError,
    FinishReason, FunctionCall, FunctionDefinition, MessageRole, StreamOptions, TokenUsage,
    ToolCall, ToolChoice, ToolDefinition,
};
pub use openai::{EndpointConfig, OpenAiCompatibleProvider};

/// Type alias for streaming completion results
pub type StreamingResult =
    Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk, CompletionError>> + Send>>;

#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Performs a streaming chat completion request
    ///
    /// Returns a stream of `ChatCompletionChunk` objects that can be
    /// processed incrementally. The stream emits chunks as they become
    /// available from the underlying provider and is finite.
    async fn chat_completion_stream(
        &self,
        params: ChatCompletionParams,
    ) -> Result<StreamingResult, CompletionError>;

    /// Performs a non-streaming chat completion request
    ///
    /// Used for short auxiliary generations (conversation titles) where
    /// incremental delivery has no value.
    async fn chat_completion(
        &self,
        params: ChatCompletionParams,
    ) -> Result<ChatCompletionResponse, CompletionError>;
}
