//! The generation orchestrator

use crate::conversations::{Conversation, ConversationRepository};
use crate::detector::{self, ToolCallAccumulator, ToolInvocation};
use crate::generation::gate::{GateStatus, PersistenceGate};
use crate::generation::prompts;
use crate::generation::GenerationRequest;
use crate::messages::{MessagePatch, MessageRepository};
use crate::routing::{self, ContextFlags, ModelSelection};
use crate::search::{self, SearchAugmentor};
use crate::tools::ToolRegistry;
use anyhow::{anyhow, Result};
use config::GenerationConfig;
use futures_util::StreamExt;
use inference_providers::{
    ChatCompletionParams, ChatMessage, ChatProvider, CompletionError, StreamingResult,
    ToolDefinition,
};
use std::sync::Arc;

/// Result of draining one provider stream
struct StreamOutcome {
    /// Text accumulated during this pass
    appended: String,
    /// Mid-stream transport error, if the stream ended early; the
    /// accumulated text is salvaged either way
    stream_error: Option<String>,
    /// The gate observed a pause and already wrote the pause notice
    paused: bool,
}

/// Orchestrates one generation run per scheduled request.
///
/// Internally sequential: one provider stream at a time, one writer
/// for the target message. The run is fire-and-forget; every error is
/// converted to a terminal message write and logged.
pub struct GenerationService {
    provider: Arc<dyn ChatProvider>,
    conversations: Arc<dyn ConversationRepository>,
    messages: Arc<dyn MessageRepository>,
    tools: Arc<ToolRegistry>,
    augmentor: Arc<SearchAugmentor>,
    config: GenerationConfig,
}

impl GenerationService {
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        conversations: Arc<dyn ConversationRepository>,
        messages: Arc<dyn MessageRepository>,
        tools: Arc<ToolRegistry>,
        augmentor: Arc<SearchAugmentor>,
        config: GenerationConfig,
    ) -> Self {
        Self {
            provider,
            conversations,
            messages,
            tools,
            augmentor,
            config,
        }
    }

    /// Kick off a run as a detached task. The task never fails from
    /// the scheduler's point of view.
    pub fn start(self: &Arc<Self>, request: GenerationRequest) {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            service.run(request).await;
        });
    }

    /// Execute a run to completion, converting any internal error into
    /// a terminal failure write
    pub async fn run(&self, request: GenerationRequest) {
        tracing::info!(
            conversation_id = %request.conversation_id,
            message_id = %request.target_message_id,
            "starting generation run"
        );
        if let Err(error) = self.try_run(&request).await {
            tracing::error!(
                conversation_id = %request.conversation_id,
                message_id = %request.target_message_id,
                error = %error,
                "generation run failed"
            );
            self.write_failure(&request).await;
        }
    }

    async fn try_run(&self, request: &GenerationRequest) -> Result<()> {
        let conversation = self
            .conversations
            .get_by_id(request.conversation_id)
            .await?
            .ok_or_else(|| anyhow!("conversation {} not found", request.conversation_id))?;
        let trigger = self
            .messages
            .get_by_id(request.trigger_message_id)
            .await?
            .ok_or_else(|| anyhow!("trigger message {} not found", request.trigger_message_id))?;
        let target = self
            .messages
            .get_by_id(request.target_message_id)
            .await?
            .ok_or_else(|| anyhow!("target message {} not found", request.target_message_id))?;

        // At-least-once scheduling: a redelivered request for an
        // already-finalized message is a no-op
        if !target.is_streaming {
            tracing::debug!(message_id = %request.target_message_id, "target already finalized, skipping");
            return Ok(());
        }

        let mut gate = PersistenceGate::new(
            Arc::clone(&self.conversations),
            Arc::clone(&self.messages),
            request.conversation_id,
            request.target_message_id,
            self.config.flush_interval_chars,
        );

        // Paused before any provider call
        if conversation.is_paused {
            gate.write_pause_notice().await?;
            return Ok(());
        }

        let prompt = trigger.content.clone();
        let selection = self.route(&prompt, &conversation);

        // Search augmentation path. Mutually exclusive with the tool
        // path: when it produces results, the single pass is augmented
        // and no tools are offered.
        let mut search_patch = MessagePatch::default();
        let mut search_context = None;
        let wants_search = request.include_web_search || search::should_auto_search(&prompt);
        if wants_search && self.augmentor.is_enabled() {
            let results = self.augmentor.gather(&prompt).await;
            if !results.is_empty() {
                search_context = Some(SearchAugmentor::build_context(&results));
                search_patch.search_results = Some(search::to_search_results(&results));
                search_patch.has_web_search = Some(true);
            }
        }

        let tools_offered = search_context.is_none() && !self.tools.is_empty();
        let system_prompt =
            prompts::build_system_prompt(&conversation, request.timezone.as_deref(), tools_offered);

        let mut request_messages = vec![ChatMessage::system(system_prompt.clone())];
        if let Some(context) = &search_context {
            request_messages.push(ChatMessage::system(prompts::build_search_context(context)));
        }
        request_messages.push(ChatMessage::user(prompt.clone()));

        let tool_definitions = tools_offered.then(|| self.tools.definitions());

        // First pass
        let (stream, model_used) = self
            .open_stream(&selection, request_messages, tool_definitions)
            .await
            .map_err(|e| anyhow!("all models failed to connect: {e}"))?;

        let mut accumulator = ToolCallAccumulator::new();
        let outcome = self
            .consume_stream(stream, "", &mut gate, Some(&mut accumulator))
            .await?;
        if outcome.paused {
            return Ok(());
        }
        let content = outcome.appended;

        // A mid-stream failure salvages the partial text and skips
        // tool handling entirely
        let invocation = if outcome.stream_error.is_some() || search_context.is_some() {
            None
        } else {
            accumulator
                .take_first()
                .or_else(|| detector::detect_fenced_tool_call(&content))
        };

        let mut final_patch = search_patch;
        final_patch.model = Some(model_used);

        if let Some(invocation) = invocation {
            match self
                .handle_tool(invocation, &selection, &system_prompt, &prompt, content, &mut gate)
                .await?
            {
                ToolPhaseResult::Finalize { content, patch } => {
                    final_patch = final_patch.merge(patch);
                    return self.finalize(request, content, final_patch).await;
                }
                ToolPhaseResult::Paused => return Ok(()),
            }
        }

        self.finalize(request, content, final_patch).await
    }

    /// Routing plus per-conversation overrides
    fn route(&self, prompt: &str, conversation: &Conversation) -> ModelSelection {
        let mut selection = routing::select_model(prompt, &ContextFlags::default());
        if let Some(model) = &conversation.model {
            selection.fallbacks.retain(|m| m != model);
            if selection.primary != *model {
                let previous = std::mem::replace(&mut selection.primary, model.clone());
                selection.fallbacks.insert(0, previous);
            }
        }
        if let Some(temperature) = conversation.temperature {
            selection.params.temperature = temperature;
        }
        selection
    }

    /// Open a stream against the primary model, retrying once per
    /// fallback on connect errors. Mid-stream errors are not retried.
    async fn open_stream(
        &self,
        selection: &ModelSelection,
        messages: Vec<ChatMessage>,
        tools: Option<Vec<ToolDefinition>>,
    ) -> Result<(StreamingResult, String), CompletionError> {
        let mut last_error = None;
        for model in
            std::iter::once(&selection.primary).chain(selection.fallbacks.iter())
        {
            let mut params = ChatCompletionParams::new(model.clone(), messages.clone());
            params.temperature = Some(selection.params.temperature);
            params.max_tokens = Some(selection.params.max_tokens);
            params.top_p = Some(selection.params.top_p);
            params.tools = tools.clone();

            match self.provider.chat_completion_stream(params).await {
                Ok(stream) => return Ok((stream, model.clone())),
                Err(error @ CompletionError::Connect { .. }) => {
                    tracing::warn!(model, error = %error, "model connect failed, trying next");
                    last_error = Some(error);
                }
                Err(error) => return Err(error),
            }
        }
        Err(last_error
            .unwrap_or_else(|| CompletionError::InvalidResponse("empty model list".to_string())))
    }

    /// Drain one provider stream, appending text to the buffer, feeding
    /// the accumulator and gating every delta through the persistence
    /// gate. `base` is content already committed before this pass.
    async fn consume_stream(
        &self,
        mut stream: StreamingResult,
        base: &str,
        gate: &mut PersistenceGate,
        mut accumulator: Option<&mut ToolCallAccumulator>,
    ) -> Result<StreamOutcome> {
        let mut appended = String::new();
        let mut stream_error = None;

        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => {
                    if let Some(acc) = accumulator.as_deref_mut() {
                        if let Some(tool_calls) = chunk
                            .choices
                            .first()
                            .and_then(|c| c.delta.as_ref())
                            .and_then(|d| d.tool_calls.as_ref())
                        {
                            acc.push_deltas(tool_calls);
                        }
                        if let Some(reason) = chunk.finish_reason() {
                            acc.push_finish(reason);
                        }
                    }
                    if let Some(delta) = chunk.content_delta() {
                        if delta.is_empty() {
                            continue;
                        }
                        appended.push_str(delta);
                        let full = format!("{base}{appended}");
                        if gate.maybe_write(&full, false).await? == GateStatus::Paused {
                            return Ok(StreamOutcome {
                                appended,
                                stream_error: None,
                                paused: true,
                            });
                        }
                    }
                }
                Err(error) => {
                    tracing::warn!(error = %error, "provider stream failed mid-flight, salvaging partial content");
                    stream_error = Some(error.to_string());
                    break;
                }
            }
        }

        Ok(StreamOutcome {
            appended,
            stream_error,
            paused: false,
        })
    }

    /// Execute the detected tool and, when it yields follow-up context,
    /// run the second pass with the same model policy
    async fn handle_tool(
        &self,
        invocation: ToolInvocation,
        selection: &ModelSelection,
        system_prompt: &str,
        prompt: &str,
        mut content: String,
        gate: &mut PersistenceGate,
    ) -> Result<ToolPhaseResult> {
        tracing::info!(tool = %invocation.name, "tool call detected");
        let output = match self
            .tools
            .invoke(&invocation.name, invocation.arguments.clone())
            .await
        {
            Ok(output) => output,
            Err(error) => {
                // Keep the un-executed text as-is (fenced block
                // included) plus a short failure note
                tracing::warn!(tool = %invocation.name, error = %error, "tool execution failed");
                content.push_str(&prompts::tool_failure_note(&invocation.name));
                return Ok(ToolPhaseResult::Finalize {
                    content,
                    patch: MessagePatch::default(),
                });
            }
        };

        // Tool-execution boundary: the fenced block (if any) leaves the
        // visible text, the tool's fragment joins it, and the gate
        // flushes the rewritten content
        content = detector::strip_fenced_block(&content, &invocation);
        if let Some(fragment) = &output.content_fragment {
            content.push_str(fragment);
        }
        gate.reset_baseline(&content);
        if gate.maybe_write(&content, true).await? == GateStatus::Paused {
            return Ok(ToolPhaseResult::Paused);
        }

        let Some(tool_context) = &output.context else {
            return Ok(ToolPhaseResult::Finalize {
                content,
                patch: output.patch,
            });
        };

        // Second pass: same model policy, no tools offered
        let mut followup = vec![
            ChatMessage::system(system_prompt.to_string()),
            ChatMessage::user(prompt.to_string()),
        ];
        if !content.trim().is_empty() {
            followup.push(ChatMessage::assistant(content.clone()));
        }
        followup.push(ChatMessage::system(prompts::build_followup_context(
            &invocation.name,
            tool_context,
        )));

        match self.open_stream(selection, followup, None).await {
            Ok((stream, model)) => {
                let base = if content.is_empty() {
                    String::new()
                } else {
                    format!("{content}\n\n")
                };
                let outcome = self.consume_stream(stream, &base, gate, None).await?;
                if outcome.paused {
                    return Ok(ToolPhaseResult::Paused);
                }
                let mut patch = output.patch;
                patch.model = Some(model);
                Ok(ToolPhaseResult::Finalize {
                    content: format!("{base}{}", outcome.appended),
                    patch,
                })
            }
            Err(error) => {
                // The tool result alone is still a useful response
                tracing::warn!(error = %error, "follow-up pass failed to connect, finalizing with tool result");
                Ok(ToolPhaseResult::Finalize {
                    content,
                    patch: output.patch,
                })
            }
        }
    }

    /// The single terminal write: content, is_streaming=false, any
    /// attachments, then the conversation's last-activity bump.
    /// Idempotent via the message's own is_streaming flag.
    async fn finalize(
        &self,
        request: &GenerationRequest,
        content: String,
        extra: MessagePatch,
    ) -> Result<()> {
        let Some(current) = self.messages.get_by_id(request.target_message_id).await? else {
            tracing::warn!(message_id = %request.target_message_id, "target message vanished before finalize");
            return Ok(());
        };
        if !current.is_streaming {
            return Ok(());
        }

        let patch = MessagePatch {
            content: Some(content),
            is_streaming: Some(false),
            ..Default::default()
        }
        .merge(extra);
        self.messages
            .patch(request.target_message_id, patch)
            .await?;
        self.conversations
            .touch_last_activity(request.conversation_id)
            .await?;
        tracing::info!(
            conversation_id = %request.conversation_id,
            message_id = %request.target_message_id,
            "generation run finalized"
        );
        Ok(())
    }

    /// Best-effort terminal write for the failure path. A failing
    /// write here is logged, never re-thrown: the scheduler must not
    /// see an unhandled failure.
    async fn write_failure(&self, request: &GenerationRequest) {
        let result = async {
            let Some(current) = self.messages.get_by_id(request.target_message_id).await? else {
                return Ok(());
            };
            if !current.is_streaming {
                return Ok(());
            }
            self.messages
                .patch(
                    request.target_message_id,
                    MessagePatch {
                        content: Some(prompts::GENERATION_FAILED.to_string()),
                        is_streaming: Some(false),
                        ..Default::default()
                    },
                )
                .await?;
            anyhow::Ok(())
        }
        .await;

        if let Err(error) = result {
            tracing::error!(
                message_id = %request.target_message_id,
                error = %error,
                "failed to write terminal failure state"
            );
        }
    }
}

enum ToolPhaseResult {
    Finalize { content: String, patch: MessagePatch },
    Paused,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversations::Conversation;
    use crate::generation::prompts::{GENERATION_FAILED, PAUSE_NOTICE};
    use crate::messages::Message;
    use crate::routing::catalog;
    use crate::search::{PageFetcher, SearchClient, SearchError, SearchHit};
    use crate::test_utils::{InMemoryConversations, InMemoryMessages};
    use crate::tools::{DocumentTool, LandingPageTool, WebSearchTool};
    use async_trait::async_trait;
    use inference_providers::{MockProvider, RequestMatcher, ResponseTemplate};

    struct DisabledSearchClient;

    #[async_trait]
    impl SearchClient for DisabledSearchClient {
        fn is_enabled(&self) -> bool {
            false
        }

        async fn search(
            &self,
            _query: &str,
            _max_results: usize,
        ) -> Result<Vec<SearchHit>, SearchError> {
            Err(SearchError::Disabled)
        }
    }

    struct StubSearchClient;

    #[async_trait]
    impl SearchClient for StubSearchClient {
        fn is_enabled(&self) -> bool {
            true
        }

        async fn search(
            &self,
            _query: &str,
            _max_results: usize,
        ) -> Result<Vec<SearchHit>, SearchError> {
            Ok(vec![SearchHit {
                title: "Rust 1.80 announcement".to_string(),
                url: "https://blog.rust-lang.org/1.80".to_string(),
                content: Some("Rust 1.80 is out.".to_string()),
            }])
        }
    }

    struct Fixture {
        provider: Arc<MockProvider>,
        conversations: Arc<InMemoryConversations>,
        messages: Arc<InMemoryMessages>,
        service: Arc<GenerationService>,
    }

    fn build_fixture(search_client: Arc<dyn SearchClient>) -> Fixture {
        let provider = Arc::new(MockProvider::new());
        let conversations = Arc::new(InMemoryConversations::new());
        let messages = Arc::new(InMemoryMessages::new());

        let augmentor = Arc::new(SearchAugmentor::new(
            search_client,
            PageFetcher::disabled(),
            5,
            3,
        ));

        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(WebSearchTool::new(Arc::clone(&augmentor))));
        tools.register(Arc::new(LandingPageTool));
        tools.register(Arc::new(DocumentTool));

        let service = Arc::new(GenerationService::new(
            provider.clone() as Arc<dyn ChatProvider>,
            conversations.clone() as Arc<dyn ConversationRepository>,
            messages.clone() as Arc<dyn MessageRepository>,
            Arc::new(tools),
            augmentor,
            GenerationConfig::default(),
        ));

        Fixture {
            provider,
            conversations,
            messages,
            service,
        }
    }

    async fn seed(
        fixture: &Fixture,
        prompt: &str,
        paused: bool,
    ) -> GenerationRequest {
        let mut conversation = Conversation::new("user_1");
        conversation.is_paused = paused;
        let conversation_id = conversation.id;
        fixture.conversations.insert(conversation).await.unwrap();

        let trigger = Message::user(conversation_id, prompt);
        let trigger_id = trigger.id;
        fixture.messages.insert(trigger).await.unwrap();

        let placeholder = Message::placeholder(conversation_id);
        let target_id = placeholder.id;
        fixture.messages.insert(placeholder).await.unwrap();

        GenerationRequest {
            conversation_id,
            trigger_message_id: trigger_id,
            target_message_id: target_id,
            include_web_search: false,
            timezone: None,
        }
    }

    #[tokio::test]
    async fn test_plain_run_finalizes_with_streamed_text() {
        let fixture = build_fixture(Arc::new(DisabledSearchClient));
        fixture
            .provider
            .set_default_response(ResponseTemplate::new("The capital of France is Paris."))
            .await;

        let request = seed(&fixture, "what is the capital of France", false).await;
        fixture.service.run(request.clone()).await;

        let message = fixture
            .messages
            .get_by_id(request.target_message_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message.content, "The capital of France is Paris.");
        assert!(!message.is_streaming);
        assert_eq!(message.model.as_deref(), Some(catalog::GENERAL_MODEL));
        assert!(!message.has_web_search);
    }

    #[tokio::test]
    async fn test_paused_at_start_makes_zero_provider_calls() {
        let fixture = build_fixture(Arc::new(DisabledSearchClient));
        let request = seed(&fixture, "hello", true).await;
        fixture.service.run(request.clone()).await;

        assert_eq!(fixture.provider.call_count().await, 0);
        let message = fixture
            .messages
            .get_by_id(request.target_message_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message.content, PAUSE_NOTICE);
        assert!(!message.is_streaming);
    }

    #[tokio::test]
    async fn test_connect_failure_falls_back_to_next_model() {
        let fixture = build_fixture(Arc::new(DisabledSearchClient));
        fixture.provider.fail_connect_for(catalog::GENERAL_MODEL).await;
        fixture
            .provider
            .set_default_response(ResponseTemplate::new("Answer from the fallback model."))
            .await;

        let request = seed(&fixture, "hello there", false).await;
        fixture.service.run(request.clone()).await;

        let message = fixture
            .messages
            .get_by_id(request.target_message_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message.content, "Answer from the fallback model.");
        assert!(!message.is_streaming);
        // Both the failed primary attempt and the fallback were issued
        assert_eq!(fixture.provider.call_count().await, 2);
        assert_ne!(message.model.as_deref(), Some(catalog::GENERAL_MODEL));
    }

    #[tokio::test]
    async fn test_all_models_failing_writes_failure_state() {
        let fixture = build_fixture(Arc::new(DisabledSearchClient));
        fixture.provider.fail_connect_for(catalog::GENERAL_MODEL).await;
        fixture.provider.fail_connect_for("gpt-4.1").await;
        fixture
            .provider
            .fail_connect_for("llama-3.3-70b-instruct")
            .await;

        let request = seed(&fixture, "hello there", false).await;
        fixture.service.run(request.clone()).await;

        let message = fixture
            .messages
            .get_by_id(request.target_message_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message.content, GENERATION_FAILED);
        assert!(!message.is_streaming);
    }

    #[tokio::test]
    async fn test_mid_stream_failure_salvages_partial() {
        let fixture = build_fixture(Arc::new(DisabledSearchClient));
        fixture
            .provider
            .set_default_response(
                ResponseTemplate::new("one two three four five six").with_disconnect_after(3),
            )
            .await;

        let request = seed(&fixture, "count for me", false).await;
        fixture.service.run(request.clone()).await;

        let message = fixture
            .messages
            .get_by_id(request.target_message_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message.content, "one two three");
        assert!(!message.is_streaming);
    }

    #[tokio::test]
    async fn test_native_tool_call_runs_followup_pass() {
        let fixture = build_fixture(Arc::new(StubSearchClient));
        fixture
            .provider
            .when_matching(RequestMatcher::PromptContains("web_search".to_string()))
            .respond_with(ResponseTemplate::new(
                "Rust 1.80 brings LazyCell to the standard library.",
            ))
            .await;
        fixture
            .provider
            .set_default_response(ResponseTemplate::new("").with_tool_call(
                "web_search",
                serde_json::json!({"query": "rust 1.80 features"}),
            ))
            .await;

        let request = seed(&fixture, "look up rust one eighty features", false).await;
        fixture.service.run(request.clone()).await;

        let message = fixture
            .messages
            .get_by_id(request.target_message_id)
            .await
            .unwrap()
            .unwrap();
        assert!(message.content.contains("LazyCell"));
        assert!(!message.is_streaming);
        assert!(message.has_web_search);
        assert_eq!(message.search_results.as_ref().unwrap().len(), 1);
        assert_eq!(fixture.provider.call_count().await, 2);
    }

    #[tokio::test]
    async fn test_fenced_tool_call_produces_artifact() {
        let fixture = build_fixture(Arc::new(DisabledSearchClient));
        let block = "```json\n{\"tool\": \"generate_document\", \"arguments\": {\"title\": \"Notes\"}}\n```";
        fixture
            .provider
            .when_matching(RequestMatcher::PromptContains(
                "generate_document".to_string(),
            ))
            .respond_with(ResponseTemplate::new("Here is the document I created."))
            .await;
        fixture
            .provider
            .set_default_response(ResponseTemplate::new(format!("Creating that now. {block}")))
            .await;

        let request = seed(&fixture, "write my meeting notes up", false).await;
        fixture.service.run(request.clone()).await;

        let message = fixture
            .messages
            .get_by_id(request.target_message_id)
            .await
            .unwrap()
            .unwrap();
        assert!(!message.is_streaming);
        assert!(!message.content.contains("```"));
        assert!(message.content.contains("Here is the document I created."));
        let artifact = message.artifact.unwrap();
        assert_eq!(artifact.title, "Notes");
    }

    #[tokio::test]
    async fn test_malformed_fenced_block_stays_as_text() {
        let fixture = build_fixture(Arc::new(DisabledSearchClient));
        let block = "```json\n{\"tool\": \"generate_document\", \"arguments\": \n```";
        fixture
            .provider
            .set_default_response(ResponseTemplate::new(format!("Attempting: {block}")))
            .await;

        let request = seed(&fixture, "write something", false).await;
        fixture.service.run(request.clone()).await;

        let message = fixture
            .messages
            .get_by_id(request.target_message_id)
            .await
            .unwrap()
            .unwrap();
        assert!(!message.is_streaming);
        assert!(message.content.contains("\"tool\": \"generate_document\""));
        assert!(message.artifact.is_none());
        // No second pass for a block that never parsed
        assert_eq!(fixture.provider.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_tool_validation_failure_keeps_text_with_note() {
        let fixture = build_fixture(Arc::new(DisabledSearchClient));
        // Missing the required title argument
        let block = "```json\n{\"tool\": \"generate_document\", \"arguments\": {}}\n```";
        fixture
            .provider
            .set_default_response(ResponseTemplate::new(format!("On it. {block}")))
            .await;

        let request = seed(&fixture, "write something", false).await;
        fixture.service.run(request.clone()).await;

        let message = fixture
            .messages
            .get_by_id(request.target_message_id)
            .await
            .unwrap()
            .unwrap();
        assert!(!message.is_streaming);
        assert!(message.content.contains("On it."));
        assert!(message.content.contains("could not be executed"));
        assert!(message.artifact.is_none());
    }

    #[tokio::test]
    async fn test_auto_search_with_disabled_provider_degrades() {
        let fixture = build_fixture(Arc::new(DisabledSearchClient));
        fixture
            .provider
            .set_default_response(ResponseTemplate::new("I cannot browse, but here is what I know."))
            .await;

        let request = seed(&fixture, "what is the latest news on rust", false).await;
        fixture.service.run(request.clone()).await;

        let message = fixture
            .messages
            .get_by_id(request.target_message_id)
            .await
            .unwrap()
            .unwrap();
        assert!(!message.is_streaming);
        assert!(!message.has_web_search);
        assert!(message.search_results.is_none());
        assert!(message.content.contains("here is what I know"));
    }

    #[tokio::test]
    async fn test_auto_search_augments_single_pass() {
        let fixture = build_fixture(Arc::new(StubSearchClient));
        fixture
            .provider
            .when_matching(RequestMatcher::PromptContains(
                "Web search results".to_string(),
            ))
            .respond_with(ResponseTemplate::new("Rust 1.80 was released, per the blog."))
            .await;

        let request = seed(&fixture, "what is the latest rust release", false).await;
        fixture.service.run(request.clone()).await;

        let message = fixture
            .messages
            .get_by_id(request.target_message_id)
            .await
            .unwrap()
            .unwrap();
        assert!(!message.is_streaming);
        assert!(message.has_web_search);
        assert_eq!(message.search_results.as_ref().unwrap().len(), 1);
        assert!(message.content.contains("per the blog"));
        // Search path is a single augmented pass, never two
        assert_eq!(fixture.provider.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_conversation_model_override_wins() {
        let fixture = build_fixture(Arc::new(DisabledSearchClient));

        let mut conversation = Conversation::new("user_1");
        conversation.model = Some("my-custom-model".to_string());
        let conversation_id = conversation.id;
        fixture.conversations.insert(conversation).await.unwrap();

        let trigger = Message::user(conversation_id, "hello");
        let trigger_id = trigger.id;
        fixture.messages.insert(trigger).await.unwrap();
        let placeholder = Message::placeholder(conversation_id);
        let target_id = placeholder.id;
        fixture.messages.insert(placeholder).await.unwrap();

        fixture
            .service
            .run(GenerationRequest {
                conversation_id,
                trigger_message_id: trigger_id,
                target_message_id: target_id,
                include_web_search: false,
                timezone: None,
            })
            .await;

        let calls = fixture.provider.calls().await;
        assert_eq!(calls[0].model, "my-custom-model");
        let message = fixture.messages.get_by_id(target_id).await.unwrap().unwrap();
        assert_eq!(message.model.as_deref(), Some("my-custom-model"));
    }

    #[tokio::test]
    async fn test_rerun_on_finalized_message_is_noop() {
        let fixture = build_fixture(Arc::new(DisabledSearchClient));
        fixture
            .provider
            .set_default_response(ResponseTemplate::new("First answer."))
            .await;

        let request = seed(&fixture, "hello", false).await;
        fixture.service.run(request.clone()).await;
        let first_calls = fixture.provider.call_count().await;

        // At-least-once delivery: the same request arrives again
        fixture.service.run(request.clone()).await;

        assert_eq!(fixture.provider.call_count().await, first_calls);
        let message = fixture
            .messages
            .get_by_id(request.target_message_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message.content, "First answer.");
    }

    #[tokio::test]
    async fn test_missing_conversation_writes_failure() {
        let fixture = build_fixture(Arc::new(DisabledSearchClient));
        let conversation_id = crate::conversations::ConversationId::generate();

        let trigger = Message::user(conversation_id, "hello");
        let trigger_id = trigger.id;
        fixture.messages.insert(trigger).await.unwrap();
        let placeholder = Message::placeholder(conversation_id);
        let target_id = placeholder.id;
        fixture.messages.insert(placeholder).await.unwrap();

        fixture
            .service
            .run(GenerationRequest {
                conversation_id,
                trigger_message_id: trigger_id,
                target_message_id: target_id,
                include_web_search: false,
                timezone: None,
            })
            .await;

        let message = fixture.messages.get_by_id(target_id).await.unwrap().unwrap();
        assert_eq!(message.content, GENERATION_FAILED);
        assert!(!message.is_streaming);
        assert_eq!(fixture.provider.call_count().await, 0);
    }
}
