//! In-memory repository implementations for unit tests

use crate::conversations::{Conversation, ConversationId, ConversationRepository};
use crate::messages::{Message, MessageId, MessagePatch, MessageRepository};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryConversations {
    items: RwLock<HashMap<ConversationId, Conversation>>,
}

impl InMemoryConversations {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationRepository for InMemoryConversations {
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

#[derive(Default)]
pub struct InMemoryMessages {
    items: RwLock<HashMap<MessageId, Message>>,
}

impl InMemoryMessages {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored messages, for assertions
    pub async fn all(&self) -> Vec<Message> {
        self.items.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessages {
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
