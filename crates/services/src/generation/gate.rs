//! Incremental persistence gate
//!
//! Single write path for partial content during a run. Throttles
//! partial writes to one per `flush_interval` accumulated characters,
//! and re-reads the conversation's pause flag before every write. The
//! pause flag is the system's only cancellation mechanism: there is no
//! hard preemption of an in-flight provider call.

use crate::conversations::{ConversationId, ConversationRepository};
use crate::generation::prompts::PAUSE_NOTICE;
use crate::messages::{MessageId, MessagePatch, MessageRepository};
use anyhow::Result;
use std::sync::Arc;

/// Outcome of a gated write attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    /// Keep streaming
    Continue,
    /// The conversation was paused; the pause notice has been written
    /// and the run must stop consuming the provider stream
    Paused,
}

pub struct PersistenceGate {
    conversations: Arc<dyn ConversationRepository>,
    messages: Arc<dyn MessageRepository>,
    conversation_id: ConversationId,
    message_id: MessageId,
    flush_interval: usize,
    /// Character count of the last flushed content
    last_flushed: usize,
}

impl PersistenceGate {
    pub fn new(
        conversations: Arc<dyn ConversationRepository>,
        messages: Arc<dyn MessageRepository>,
        conversation_id: ConversationId,
        message_id: MessageId,
        flush_interval: usize,
    ) -> Self {
        Self {
            conversations,
            messages,
            conversation_id,
            message_id,
            flush_interval: flush_interval.max(1),
            last_flushed: 0,
        }
    }

    /// Persist the accumulated content if the throttle allows it (or
    /// `force` is set). Checks the pause flag before any write.
    pub async fn maybe_write(&mut self, content: &str, force: bool) -> Result<GateStatus> {
        let chars = content.chars().count();
        if !force && chars < self.last_flushed + self.flush_interval {
            return Ok(GateStatus::Continue);
        }

        if self.is_paused().await? {
            self.write_pause_notice().await?;
            return Ok(GateStatus::Paused);
        }

        // Partial writes never touch is_streaming; the terminal write
        // is the orchestrator's alone
        self.messages
            .patch(self.message_id, MessagePatch::content(content))
            .await?;
        self.last_flushed = chars;
        tracing::trace!(message_id = %self.message_id, chars, "flushed partial content");
        Ok(GateStatus::Continue)
    }

    /// Current pause flag; a missing conversation reads as not paused
    /// and is caught by the orchestrator's own lookups
    pub async fn is_paused(&self) -> Result<bool> {
        Ok(self
            .conversations
            .get_by_id(self.conversation_id)
            .await?
            .map(|c| c.is_paused)
            .unwrap_or(false))
    }

    /// Replace the partial with the pause notice and finalize in the
    /// paused state. Idempotent: a message already finalized is left
    /// untouched.
    pub async fn write_pause_notice(&self) -> Result<()> {
        let current = self.messages.get_by_id(self.message_id).await?;
        if matches!(current, Some(ref m) if !m.is_streaming) {
            return Ok(());
        }
        tracing::info!(
            conversation_id = %self.conversation_id,
            message_id = %self.message_id,
            "conversation paused, finalizing with pause notice"
        );
        self.messages
            .patch(
                self.message_id,
                MessagePatch {
                    content: Some(PAUSE_NOTICE.to_string()),
                    is_streaming: Some(false),
                    ..Default::default()
                },
            )
            .await?;
        Ok(())
    }

    /// Reset the throttle baseline, used when the visible content is
    /// rewritten at a tool-execution boundary
    pub fn reset_baseline(&mut self, content: &str) {
        self.last_flushed = content.chars().count();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversations::Conversation;
    use crate::messages::Message;
    use crate::test_utils::{InMemoryConversations, InMemoryMessages};

    async fn setup(paused: bool) -> (PersistenceGate, Arc<InMemoryMessages>, MessageId) {
        let conversations = Arc::new(InMemoryConversations::new());
        let messages = Arc::new(InMemoryMessages::new());

        let mut conversation = Conversation::new("user_1");
        conversation.is_paused = paused;
        let conversation_id = conversation.id;
        conversations.insert(conversation).await.unwrap();

        let message = Message::placeholder(conversation_id);
        let message_id = message.id;
        messages.insert(message).await.unwrap();

        let gate = PersistenceGate::new(
            conversations,
            messages.clone(),
            conversation_id,
            message_id,
            10,
        );
        (gate, messages, message_id)
    }

    #[tokio::test]
    async fn test_throttle_skips_short_growth() {
        let (mut gate, messages, message_id) = setup(false).await;

        assert_eq!(gate.maybe_write("short", false).await.unwrap(), GateStatus::Continue);
        let message = messages.get_by_id(message_id).await.unwrap().unwrap();
        assert_eq!(message.content, "");

        assert_eq!(
            gate.maybe_write("now past threshold", false).await.unwrap(),
            GateStatus::Continue
        );
        let message = messages.get_by_id(message_id).await.unwrap().unwrap();
        assert_eq!(message.content, "now past threshold");
        assert!(message.is_streaming);
    }

    #[tokio::test]
    async fn test_force_writes_regardless_of_throttle() {
        let (mut gate, messages, message_id) = setup(false).await;
        gate.maybe_write("x", true).await.unwrap();
        let message = messages.get_by_id(message_id).await.unwrap().unwrap();
        assert_eq!(message.content, "x");
    }

    #[tokio::test]
    async fn test_pause_writes_notice_and_finalizes() {
        let (mut gate, messages, message_id) = setup(true).await;
        let status = gate.maybe_write("partial content here", true).await.unwrap();
        assert_eq!(status, GateStatus::Paused);

        let message = messages.get_by_id(message_id).await.unwrap().unwrap();
        assert_eq!(message.content, PAUSE_NOTICE);
        assert!(!message.is_streaming);
    }

    #[tokio::test]
    async fn test_pause_notice_is_idempotent() {
        let (gate, messages, message_id) = setup(true).await;
        gate.write_pause_notice().await.unwrap();

        // Simulate a client edit after finalize; a second notice write
        // must not clobber it
        messages
            .patch(message_id, MessagePatch::content("edited"))
            .await
            .unwrap();
        gate.write_pause_notice().await.unwrap();

        let message = messages.get_by_id(message_id).await.unwrap().unwrap();
        assert_eq!(message.content, "edited");
    }
}
