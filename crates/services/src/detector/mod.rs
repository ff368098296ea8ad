//! Tool-call detection
//!
//! Two detection paths feed the orchestrator:
//!
//! * native: providers stream structured tool-call deltas, fragments of
//!   one logical call spread across chunks and keyed by index. The
//!   accumulator reassembles them and yields the first complete call.
//! * fenced: some models emit a fenced ```json or ```tool block with
//!   `{"tool": ..., "arguments": ...}` instead. Scanned only after a
//!   clean stream close, and only when no native call was seen.
//!
//! Both paths are first-wins and fail open: anything malformed is
//! treated as ordinary text.

use inference_providers::{FinishReason, ToolCall};

/// A detected tool invocation ready for the registry
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: serde_json::Value,
    /// Raw text of the fenced block this came from, if any; used to
    /// strip the block from the visible content
    pub raw_text: Option<String>,
}

/// Accumulates native tool-call deltas across stream chunks.
///
/// Fragments are merged by call index: the first fragment carries the
/// id and function name, later ones append argument text. The call is
/// considered complete once the stream reports `tool_calls` as its
/// finish reason.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    calls: Vec<PartialCall>,
    complete: bool,
}

#[derive(Debug, Default)]
struct PartialCall {
    name: String,
    arguments: String,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed tool-call deltas from one chunk
    pub fn push_deltas(&mut self, deltas: &[ToolCall]) {
        for delta in deltas {
            let index = delta.index.unwrap_or(0).max(0) as usize;
            if self.calls.len() <= index {
                self.calls.resize_with(index + 1, PartialCall::default);
            }
            let call = &mut self.calls[index];
            if let Some(name) = &delta.function.name {
                call.name.push_str(name);
            }
            if let Some(arguments) = &delta.function.arguments {
                call.arguments.push_str(arguments);
            }
        }
    }

    /// Feed a finish reason; `tool_calls` marks the set complete
    pub fn push_finish(&mut self, reason: FinishReason) {
        if reason == FinishReason::ToolCalls {
            self.complete = true;
        }
    }

    /// Whether any fragment has been seen
    pub fn has_calls(&self) -> bool {
        !self.calls.is_empty()
    }

    /// The first complete call, if the stream finished with
    /// `tool_calls`. Malformed argument JSON degrades to an empty
    /// object so schema validation produces the failure downstream.
    pub fn take_first(&mut self) -> Option<ToolInvocation> {
        if !self.complete {
            return None;
        }
        let call = self.calls.iter().find(|c| !c.name.is_empty())?;
        let arguments = if call.arguments.trim().is_empty() {
            serde_json::json!({})
        } else {
            serde_json::from_str(&call.arguments).unwrap_or_else(|_| {
                tracing::warn!(
                    tool = %call.name,
                    "tool call arguments are not valid JSON, passing empty object"
                );
                serde_json::json!({})
            })
        };
        Some(ToolInvocation {
            name: call.name.clone(),
            arguments,
            raw_text: None,
        })
    }
}

/// Scan accumulated text for a fenced tool-call block.
///
/// Accepts ```json and ```tool fences whose body is an object with a
/// string `tool` field and an object `arguments` field. Only the first
/// such block counts; malformed blocks are left alone as regular text.
pub fn detect_fenced_tool_call(text: &str) -> Option<ToolInvocation> {
    let mut search_from = 0;
    while let Some(relative) = text[search_from..].find("```") {
        let fence_start = search_from + relative;
        let after_fence = &text[fence_start + 3..];

        let (language, body_offset) = match after_fence.find('\n') {
            Some(nl) => (after_fence[..nl].trim(), nl + 1),
            None => return None,
        };
        if language != "json" && language != "tool" {
            search_from = fence_start + 3;
            continue;
        }

        let body_start = fence_start + 3 + body_offset;
        let Some(body_len) = text[body_start..].find("```") else {
            return None;
        };
        let body = &text[body_start..body_start + body_len];
        let block_end = body_start + body_len + 3;

        if let Some(invocation) = parse_tool_block(body) {
            let raw = text[fence_start..block_end].to_string();
            return Some(ToolInvocation {
                raw_text: Some(raw),
                ..invocation
            });
        }

        // Malformed block: keep scanning past it
        search_from = block_end;
    }
    None
}

fn parse_tool_block(body: &str) -> Option<ToolInvocation> {
    let value: serde_json::Value = serde_json::from_str(body.trim()).ok()?;
    let name = value.get("tool")?.as_str()?.to_string();
    let arguments = value.get("arguments")?.clone();
    if !arguments.is_object() {
        return None;
    }
    Some(ToolInvocation {
        name,
        arguments,
        raw_text: None,
    })
}

/// Remove a detected fenced block from the visible content
pub fn strip_fenced_block(text: &str, invocation: &ToolInvocation) -> String {
    match &invocation.raw_text {
        Some(raw) => text.replacen(raw.as_str(), "", 1).trim().to_string(),
        None => text.to_string(),
    }
}
