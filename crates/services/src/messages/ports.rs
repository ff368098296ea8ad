use crate::messages::models::{Message, MessageId, MessagePatch};
use anyhow::Result;
use async_trait::async_trait;

/// Repository port for messages.
///
/// `patch` must be atomic per document: concurrent patches may
/// interleave but a single patch is applied in full or not at all.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Insert a new message
    async fn insert(&self, message: Message) -> Result<()>;

    /// Get a message by ID
    async fn get_by_id(&self, id: MessageId) -> Result<Option<Message>>;

    /// Apply a partial update; returns the updated message, or None if
    /// the message does not exist
    async fn patch(&self, id: MessageId, patch: MessagePatch) -> Result<Option<Message>>;
}
