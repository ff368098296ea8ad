//! Conversation title generation
//!
//! A short non-streaming completion against the title task class. A
//! provider failure degrades to a truncated form of the prompt itself;
//! titling must never fail a conversation.

use crate::routing::{self, ContextFlags};
use inference_providers::{ChatCompletionParams, ChatMessage, ChatProvider};
use std::sync::Arc;

const TITLE_SYSTEM_PROMPT: &str = "\
Generate a short title (at most six words) for a conversation that \
starts with the user message below. Respond with the title only, no \
quotes, no trailing punctuation.";

const MAX_TITLE_CHARS: usize = 80;

/// Produce a title for a conversation from its first user message
pub async fn generate_title(provider: &Arc<dyn ChatProvider>, first_message: &str) -> String {
    let flags = ContextFlags {
        title_generation: true,
        ..Default::default()
    };
    let selection = routing::select_model(first_message, &flags);

    let mut params = ChatCompletionParams::new(
        selection.primary.clone(),
        vec![
            ChatMessage::system(TITLE_SYSTEM_PROMPT),
            ChatMessage::user(first_message.to_string()),
        ],
    );
    params.temperature = Some(selection.params.temperature);
    params.max_tokens = Some(selection.params.max_tokens);

    match provider.chat_completion(params).await {
        Ok(response) => {
            let title = response
                .content()
                .map(clean_title)
                .unwrap_or_default();
            if title.is_empty() {
                fallback_title(first_message)
            } else {
                title
            }
        }
        Err(error) => {
            tracing::warn!(error = %error, "title generation failed, using prompt prefix");
            fallback_title(first_message)
        }
    }
}

/// Strip wrapping quotes and trailing punctuation, cap the length
fn clean_title(raw: &str) -> String {
    let trimmed = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim_end_matches(['.', '!'])
        .trim();
    truncate_chars(trimmed, MAX_TITLE_CHARS)
}

fn fallback_title(prompt: &str) -> String {
    let collapsed = prompt.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return "New conversation".to_string();
    }
    truncate_chars(&collapsed, MAX_TITLE_CHARS)
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let truncated: String = s.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", truncated.trim_end())
}
