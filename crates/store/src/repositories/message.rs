use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use services::conversations::ConversationId;
use services::messages::{Message, MessageId, MessagePatch, MessageRepository};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Message repository backed by an in-memory map.
///
/// `patch` applies its field set under a single write-lock hold, which
/// gives the per-document atomicity the orchestrator relies on.
#[derive(Default)]
pub struct MemoryMessageRepository {
    items: RwLock<HashMap<MessageId, Message>>,
}

impl MemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages in a conversation, oldest first
    pub async fn list_by_conversation(&self, conversation_id: ConversationId) -> Vec<Message> {
        let items = self.items.read().await;
        let mut messages: Vec<Message> = items
            .values()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        messages
    }
}

#[async_trait]
impl MessageRepository for MemoryMessageRepository {
    async fn insert(&self, message: Message) -> Result<()> {
        self.items.write().await.insert(message.id, message);
        Ok(())
    }

    async fn get_by_id(&self, id: MessageId) -> Result<Option<Message>> {
        Ok(self.items.read().await.get(&id).cloned())
    }

    async fn patch(&self, id: MessageId, patch: MessagePatch) -> Result<Option<Message>> {
        let mut items = self.items.write().await;
        let Some(message) = items.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(content) = patch.content {
            message.content = content;
        }
        if let Some(is_streaming) = patch.is_streaming {
            message.is_streaming = is_streaming;
        }
        if let Some(search_results) = patch.search_results {
            message.search_results = Some(search_results);
        }
        if let Some(has_web_search) = patch.has_web_search {
            message.has_web_search = has_web_search;
        }
        if let Some(artifact) = patch.artifact {
            message.artifact = Some(artifact);
        }
        if let Some(model) = patch.model {
            message.model = Some(model);
        }
        message.updated_at = Utc::now();
        Ok(Some(message.clone()))
    }
}
