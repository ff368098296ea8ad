use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub Uuid);

#[derive(Debug, Error)]
#[error("Invalid conversation ID: {0}")]
pub struct InvalidConversationId(String);

impl std::str::FromStr for ConversationId {
    type Err = InvalidConversationId;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let raw = value.strip_prefix("conv_").unwrap_or(value);
        Uuid::parse_str(raw)
            .map(ConversationId)
            .map_err(|_| InvalidConversationId(value.to_string()))
    }
}

impl From<Uuid> for ConversationId {
    fn from(uuid: Uuid) -> Self {
        ConversationId(uuid)
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conv_{}", self.0.simple())
    }
}

impl ConversationId {
    pub fn generate() -> Self {
        ConversationId(Uuid::new_v4())
    }
}

/// Conversation model
///
/// Owned by a user; the orchestrator reads the pause flag and the
/// generation overrides, and only ever writes `last_activity_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub owner: String,
    pub archived: bool,
    /// Cooperative-cancellation flag, re-read before every partial write
    pub is_paused: bool,
    pub last_activity_at: DateTime<Utc>,
    /// Preferred model; overrides the routing policy's primary pick
    pub model: Option<String>,
    /// System prompt override for this conversation
    pub system_prompt: Option<String>,
    /// Sampling temperature override
    pub temperature: Option<f32>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(owner: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::generate(),
            owner: owner.into(),
            archived: false,
            is_paused: false,
            last_activity_at: now,
            model: None,
            system_prompt: None,
            temperature: None,
            created_at: now,
        }
    }
}
