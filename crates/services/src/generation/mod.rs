//! Streaming generation orchestration
//!
//! The orchestrator drives one generation run against one assistant
//! placeholder message: route to a model, stream the first pass,
//! detect and execute at most one tool call, optionally stream a
//! follow-up pass with the tool result as context, and commit exactly
//! one terminal write. All failures are converted into terminal
//! message states; nothing propagates to the scheduler.

pub mod gate;
pub mod prompts;
pub mod service;
pub mod titles;

use crate::conversations::ConversationId;
use crate::messages::MessageId;

pub use service::GenerationService;

/// Arguments for one fire-and-forget generation run
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub conversation_id: ConversationId,
    /// The user message that triggered this run
    pub trigger_message_id: MessageId,
    /// The assistant placeholder this run writes into; must exist with
    /// `is_streaming = true` before the run is scheduled
    pub target_message_id: MessageId,
    /// Force-enable the search augmentation path regardless of the
    /// prompt heuristic
    pub include_web_search: bool,
    /// User timezone for the system prompt, IANA name
    pub timezone: Option<String>,
}
