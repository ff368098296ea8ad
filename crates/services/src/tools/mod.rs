//! Tool registry and executors
//!
//! A fixed set of named tools the model may invoke mid-stream. Each
//! tool carries a typed argument schema, an execution function, and a
//! rendering step that turns its result into message content and a
//! message patch. Arguments arrive as untrusted JSON (from native
//! tool-call deltas or a fenced text block) and are validated against
//! the schema before execution.

pub mod image;
pub mod page;
pub mod web_search;

use crate::messages::MessagePatch;
use async_trait::async_trait;
use inference_providers::{FunctionDefinition, ToolDefinition};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub use image::ImageTool;
pub use page::{DocumentTool, LandingPageTool};
pub use web_search::WebSearchTool;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments for {tool}: {message}")]
    Validation { tool: String, message: String },

    #[error("tool {tool} failed: {message}")]
    Execution { tool: String, message: String },

    #[error("unknown tool: {0}")]
    Unknown(String),
}

/// One argument in a tool's schema
#[derive(Debug, Clone, Copy)]
pub struct ArgumentSpec {
    pub name: &'static str,
    /// JSON schema type: "string", "number", "boolean", "array", "object"
    pub type_: &'static str,
    pub required: bool,
    pub description: &'static str,
}

/// Declared shape of a tool: name, description, argument schema
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub arguments: &'static [ArgumentSpec],
}

impl ToolSpec {
    /// OpenAI-style tool definition for the provider request
    pub fn to_definition(&self) -> ToolDefinition {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for arg in self.arguments {
            properties.insert(
                arg.name.to_string(),
                serde_json::json!({
                    "type": arg.type_,
                    "description": arg.description,
                }),
            );
            if arg.required {
                required.push(serde_json::Value::String(arg.name.to_string()));
            }
        }

        ToolDefinition {
            type_: "function".to_string(),
            function: FunctionDefinition {
                name: self.name.to_string(),
                description: Some(self.description.to_string()),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": properties,
                    "required": required,
                }),
            },
        }
    }

    /// Validate untrusted arguments against the schema
    pub fn validate(&self, args: &serde_json::Value) -> Result<(), ToolError> {
        let object = args.as_object().ok_or_else(|| ToolError::Validation {
            tool: self.name.to_string(),
            message: "arguments must be a JSON object".to_string(),
        })?;

        for arg in self.arguments {
            match object.get(arg.name) {
                None | Some(serde_json::Value::Null) => {
                    if arg.required {
                        return Err(ToolError::Validation {
                            tool: self.name.to_string(),
                            message: format!("missing required argument '{}'", arg.name),
                        });
                    }
                }
                Some(value) => {
                    let ok = match arg.type_ {
                        "string" => value.is_string(),
                        "number" => value.is_number(),
                        "boolean" => value.is_boolean(),
                        "array" => value.is_array(),
                        "object" => value.is_object(),
                        _ => true,
                    };
                    if !ok {
                        return Err(ToolError::Validation {
                            tool: self.name.to_string(),
                            message: format!(
                                "argument '{}' must be of type {}",
                                arg.name, arg.type_
                            ),
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

/// Rendered result of a tool execution
#[derive(Debug, Default)]
pub struct ToolOutput {
    /// Textual result handed to the model as context for the follow-up
    /// generation pass; None when no follow-up adds value
    pub context: Option<String>,
    /// Fragment appended to the final message content
    pub content_fragment: Option<String>,
    /// Fields patched onto the assistant message at finalize
    pub patch: MessagePatch,
}

impl ToolOutput {
    /// Whether the orchestrator should run a second generation pass
    /// with this output as context
    pub fn needs_followup(&self) -> bool {
        self.context.is_some()
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn spec(&self) -> ToolSpec;

    async fn execute(&self, args: serde_json::Value) -> Result<ToolOutput, ToolError>;
}

/// Registry of the built-in tools, keyed by name
pub struct ToolRegistry {
    tools: HashMap<&'static str, Arc<dyn Tool>>,
    /// Registration order, for stable definition lists
    order: Vec<&'static str>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.spec().name;
        if self.tools.insert(name, tool).is_none() {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Tool definitions offered to the provider, in registration order
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.spec().to_definition())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate arguments and execute the named tool
    pub async fn invoke(
        &self,
        name: &str,
        args: serde_json::Value,
    ) -> Result<ToolOutput, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::Unknown(name.to_string()))?;
        tool.spec().validate(&args)?;
        tool.execute(args).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn spec(&self) -> ToolSpec {
            ToolSpec {
                name: "echo",
                description: "Echo the input back",
                arguments: &[
                    ArgumentSpec {
                        name: "text",
                        type_: "string",
                        required: true,
                        description: "Text to echo",
                    },
                    ArgumentSpec {
                        name: "times",
                        type_: "number",
                        required: false,
                        description: "Repeat count",
                    },
                ],
            }
        }

        async fn execute(&self, args: serde_json::Value) -> Result<ToolOutput, ToolError> {
            let text = args["text"].as_str().unwrap_or_default().to_string();
            Ok(ToolOutput {
                content_fragment: Some(text),
                ..Default::default()
            })
        }
    }

    #[tokio::test]
    async fn test_invoke_validates_before_executing() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));

        let err = registry
            .invoke("echo", serde_json::json!({}))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ToolError::Validation { .. }));

        let output = registry
            .invoke("echo", serde_json::json!({"text": "hi"}))
            .await
            .unwrap();
        assert_eq!(output.content_fragment.as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry
            .invoke("nope", serde_json::json!({}))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ToolError::Unknown(_)));
    }

    #[test]
    fn test_wrong_argument_type_rejected() {
        let spec = EchoTool.spec();
        let err = spec.validate(&serde_json::json!({"text": 42})).err().unwrap();
        assert!(matches!(err, ToolError::Validation { .. }));
    }

    #[test]
    fn test_definition_shape() {
        let definition = EchoTool.spec().to_definition();
        assert_eq!(definition.function.name, "echo");
        let params = definition.function.parameters;
        assert_eq!(params["type"], "object");
        assert_eq!(params["properties"]["text"]["type"], "string");
        assert_eq!(params["required"][0], "text");
    }
}
