use crate::conversations::models::{Conversation, ConversationId};
use anyhow::Result;
use async_trait::async_trait;

/// Repository port for conversations.
///
/// Every operation is an atomic single-document read or write; no
/// multi-document transactions are required by the orchestrator.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Insert a new conversation
    async fn insert(&self, conversation: Conversation) -> Result<()>;

    /// Get a conversation by ID
    async fn get_by_id(&self, id: ConversationId) -> Result<Option<Conversation>>;

    /// Set the pause flag
    async fn set_paused(&self, id: ConversationId, paused: bool) -> Result<bool>;

    /// Bump the last-activity timestamp to now. Called at finalize
    /// only, never on partial writes.
    async fn touch_last_activity(&self, id: ConversationId) -> Result<()>;
}
