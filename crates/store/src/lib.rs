//! In-memory document store
//!
//! Implements the repository ports declared in the services crate with
//! `tokio::sync::RwLock` maps. Every operation is an atomic
//! single-document read or write, which is all the orchestrator's
//! contract requires; there are no cross-document transactions.

pub mod repositories;

pub use repositories::{MemoryConversationRepository, MemoryMessageRepository};

use std::sync::Arc;

/// Store service combining all repositories
pub struct Store {
    pub conversations: Arc<MemoryConversationRepository>,
    pub messages: Arc<MemoryMessageRepository>,
}

impl Store {
    pub fn new() -> Self {
        Self {
            conversations: Arc::new(MemoryConversationRepository::new()),
            messages: Arc::new(MemoryMessageRepository::new()),
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
