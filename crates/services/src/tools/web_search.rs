//! `web_search` tool
//!
//! Wraps the search augmentor. Degrades rather than fails: a disabled
//! provider or an empty result set produces an empty output with no
//! follow-up context, and the stream finalizes from whatever text was
//! already accumulated.

use crate::messages::MessagePatch;
use crate::search::{self, SearchAugmentor};
use crate::tools::{ArgumentSpec, Tool, ToolError, ToolOutput, ToolSpec};
use async_trait::async_trait;
use std::sync::Arc;

pub struct WebSearchTool {
    augmentor: Arc<SearchAugmentor>,
}

impl WebSearchTool {
    pub fn new(augmentor: Arc<SearchAugmentor>) -> Self {
        Self { augmentor }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "web_search",
            description: "Search the web for current information and return ranked results",
            arguments: &[
                ArgumentSpec {
                    name: "query",
                    type_: "string",
                    required: true,
                    description: "The search query",
                },
                ArgumentSpec {
                    name: "reason",
                    type_: "string",
                    required: false,
                    description: "Why the search is needed",
                },
            ],
        }
    }

    async fn execute(&self, args: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let query = args["query"].as_str().unwrap_or_default();
        if query.trim().is_empty() {
            return Err(ToolError::Validation {
                tool: "web_search".to_string(),
                message: "query must not be empty".to_string(),
            });
        }

        tracing::info!(query, "executing web search tool");
        let results = self.augmentor.gather(query).await;
        if results.is_empty() {
            // Nothing to feed the follow-up pass; the caller finalizes
            // from the accumulated text
            return Ok(ToolOutput::default());
        }

        let context = SearchAugmentor::build_context(&results);
        let search_results = search::to_search_results(&results);

        Ok(ToolOutput {
            context: Some(context),
            content_fragment: None,
            patch: MessagePatch {
                search_results: Some(search_results),
                has_web_search: Some(true),
                ..Default::default()
            },
        })
    }
}
