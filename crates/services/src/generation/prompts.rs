//! Prompt builders and user-visible strings for the orchestrator

use crate::conversations::Conversation;

/// Terminal content written when a run fails for any reason. Prefixed
/// so clients can recognize it without parsing.
pub const GENERATION_FAILED: &str =
    "[Generation failed] Something went wrong while generating this response. Please try again.";

/// Terminal content written when the conversation is paused mid-run
pub const PAUSE_NOTICE: &str =
    "[Paused] This conversation is paused. Resume it to continue generating responses.";

const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a helpful assistant. Answer clearly and concisely, using \
markdown formatting where it improves readability.";

const TOOL_GUIDANCE: &str = "\
You have tools available. To invoke one you may either use the native \
tool-calling mechanism, or emit exactly one fenced code block tagged \
`json` containing an object of the form \
{\"tool\": \"<name>\", \"arguments\": {...}}. Invoke at most one tool \
per response.";

/// System prompt for the first generation pass
pub fn build_system_prompt(
    conversation: &Conversation,
    timezone: Option<&str>,
    tools_available: bool,
) -> String {
    let mut prompt = conversation
        .system_prompt
        .clone()
        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

    if let Some(tz) = timezone {
        prompt.push_str(&format!("\n\nThe user's timezone is {tz}."));
    }
    if tools_available {
        prompt.push_str("\n\n");
        prompt.push_str(TOOL_GUIDANCE);
    }
    prompt
}

/// System context for the follow-up pass after a tool execution
pub fn build_followup_context(tool_name: &str, tool_context: &str) -> String {
    format!(
        "The `{tool_name}` tool was executed. Its result follows. Use it \
to answer the user's request. Do not invoke any further tools.\n\n{tool_context}"
    )
}

/// System context for a search-augmented pass
pub fn build_search_context(search_context: &str) -> String {
    format!(
        "Use the following web search results to answer the user's \
request. Cite sources where relevant.\n\n{search_context}"
    )
}

/// Short inline note appended when a detected tool fails
pub fn tool_failure_note(tool_name: &str) -> String {
    format!("\n\n*The {tool_name} tool could not be executed.*")
}
