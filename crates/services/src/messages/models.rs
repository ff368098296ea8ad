use crate::conversations::ConversationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

#[derive(Debug, Error)]
#[error("Invalid message ID: {0}")]
pub struct InvalidMessageId(String);

impl std::str::FromStr for MessageId {
    type Err = InvalidMessageId;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let raw = value.strip_prefix("msg_").unwrap_or(value);
        Uuid::parse_str(raw)
            .map(MessageId)
            .map_err(|_| InvalidMessageId(value.to_string()))
    }
}

impl From<Uuid> for MessageId {
    fn from(uuid: Uuid) -> Self {
        MessageId(uuid)
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "msg_{}", self.0.simple())
    }
}

impl MessageId {
    pub fn generate() -> Self {
        MessageId(Uuid::new_v4())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A single ranked web-search result attached to a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
    /// Host part of the link, for compact rendering
    pub display_link: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    LandingPage,
    Document,
}

/// Structured payload for a generated artifact (page or document)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub kind: ArtifactKind,
    pub title: String,
    pub content: String,
    /// Whether the client should surface this in the side panel
    pub show_in_panel: bool,
}

/// Message model
///
/// The assistant placeholder is born with empty content and
/// `is_streaming = true`; the orchestrator owns it exclusively until
/// the single terminal write flips `is_streaming` to false.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub role: Role,
    pub content: String,
    pub is_streaming: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_results: Option<Vec<SearchResult>>,
    pub has_web_search: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<GeneratedArtifact>,
    /// Model that produced this message (assistant messages only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    /// User message, immutable after creation
    pub fn user(conversation_id: ConversationId, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: MessageId::generate(),
            conversation_id,
            role: Role::User,
            content: content.into(),
            is_streaming: false,
            search_results: None,
            has_web_search: false,
            artifact: None,
            model: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Assistant placeholder, the orchestrator's mutable write target
    pub fn placeholder(conversation_id: ConversationId) -> Self {
        let now = Utc::now();
        Self {
            id: MessageId::generate(),
            conversation_id,
            role: Role::Assistant,
            content: String::new(),
            is_streaming: true,
            search_results: None,
            has_web_search: false,
            artifact: None,
            model: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Field set for a partial message update; only `Some` fields are
/// applied by the store.
#[derive(Debug, Clone, Default)]
pub struct MessagePatch {
    pub content: Option<String>,
    pub is_streaming: Option<bool>,
    pub search_results: Option<Vec<SearchResult>>,
    pub has_web_search: Option<bool>,
    pub artifact: Option<GeneratedArtifact>,
    pub model: Option<String>,
}

impl MessagePatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// Merge another patch into this one; fields set in `other` win
    pub fn merge(mut self, other: MessagePatch) -> Self {
        if other.content.is_some() {
            self.content = other.content;
        }
        if other.is_streaming.is_some() {
            self.is_streaming = other.is_streaming;
        }
        if other.search_results.is_some() {
            self.search_results = other.search_results;
        }
        if other.has_web_search.is_some() {
            self.has_web_search = other.has_web_search;
        }
        if other.artifact.is_some() {
            self.artifact = other.artifact;
        }
        if other.model.is_some() {
            self.model = other.model;
        }
        self
    }
}
