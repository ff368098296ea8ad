pub mod conversation;
pub mod message;

pub use conversation::MemoryConversationRepository;
pub use message::MemoryMessageRepository;
