use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use services::conversations::{Conversation, ConversationId, ConversationRepository};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Conversation repository backed by an in-memory map
#[derive(Default)]
pub struct MemoryConversationRepository {
    items: RwLock<HashMap<ConversationId, Conversation>>,
}

impl MemoryConversationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// All conversations for an owner, newest first
    pub async fn list_by_owner(&self, owner: &str) -> Vec<Conversation> {
        let items = self.items.read().await;
        let mut conversations: Vec<Conversation> = items
            .values()
            .filter(|c| c.owner == owner)
            .cloned()
            .collect();
        conversations.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
        conversations
    }
}

#[async_trait]
impl ConversationRepository for MemoryConversationRepository {
    async fn insert(&self, conversation: Conversation) -> Result<()> {
        self.items
            .write()
            .await
            .insert(conversation.id, conversation);
        Ok(())
    }

    async fn get_by_id(&self, id: ConversationId) -> Result<Option<Conversation>> {
        Ok(self.items.read().await.get(&id).cloned())
    }

    async fn set_paused(&self, id: ConversationId, paused: bool) -> Result<bool> {
        let mut items = self.items.write().await;
        match items.get_mut(&id) {
            Some(conversation) => {
                conversation.is_paused = paused;
                tracing::debug!(conversation_id = %id, paused, "pause flag updated");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn touch_last_activity(&self, id: ConversationId) -> Result<()> {
        if let Some(conversation) = self.items.write().await.get_mut(&id) {
            conversation.last_activity_at = Utc::now();
        }
        Ok(())
    }
}
