//! `generate_image` tool
//!
//! Calls an OpenAI-compatible image generation endpoint and renders
//! the resulting URL as a markdown image fragment. Unlike search, a
//! failure here is an execution error the orchestrator surfaces as a
//! failure note; there is no useful degraded output.

use crate::tools::{ArgumentSpec, Tool, ToolError, ToolOutput, ToolSpec};
use async_trait::async_trait;
use config::ImageProviderConfig;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    url: String,
}

pub struct ImageTool {
    client: reqwest::Client,
    config: ImageProviderConfig,
}

impl ImageTool {
    pub fn new(config: ImageProviderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl Tool for ImageTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "generate_image",
            description: "Generate an image from a text prompt and embed it in the response",
            arguments: &[
                ArgumentSpec {
                    name: "prompt",
                    type_: "string",
                    required: true,
                    description: "Description of the image to generate",
                },
                ArgumentSpec {
                    name: "size",
                    type_: "string",
                    required: false,
                    description: "Image size, e.g. 1024x1024",
                },
            ],
        }
    }

    async fn execute(&self, args: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let prompt = args["prompt"].as_str().unwrap_or_default();
        if prompt.trim().is_empty() {
            return Err(ToolError::Validation {
                tool: "generate_image".to_string(),
                message: "prompt must not be empty".to_string(),
            });
        }
        let size = args["size"].as_str().unwrap_or("1024x1024");

        let url = format!(
            "{}/images/generations",
            self.config.base_url.trim_end_matches('/')
        );
        let body = serde_json::json!({
            "model": self.config.model,
            "prompt": prompt,
            "n": 1,
            "size": size,
        });

        tracing::info!(model = %self.config.model, "executing image generation tool");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolError::Execution {
                tool: "generate_image".to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::Execution {
                tool: "generate_image".to_string(),
                message: format!("provider returned {status}: {body}"),
            });
        }

        let parsed: ImageResponse = response.json().await.map_err(|e| ToolError::Execution {
            tool: "generate_image".to_string(),
            message: format!("invalid provider response: {e}"),
        })?;

        let image_url = parsed
            .data
            .first()
            .map(|d| d.url.clone())
            .ok_or_else(|| ToolError::Execution {
                tool: "generate_image".to_string(),
                message: "provider returned no images".to_string(),
            })?;

        Ok(ToolOutput {
            context: None,
            content_fragment: Some(format!("\n\n![{prompt}]({image_url})\n")),
            patch: Default::default(),
        })
    }
}
