//! `generate_landing_page` and `generate_document` tools
//!
//! Both are pure: they render an artifact from their arguments with no
//! network or model calls, attach it to the message patch, and request
//! a follow-up pass that lets the model present the artifact to the
//! user.

use crate::messages::{ArtifactKind, GeneratedArtifact, MessagePatch};
use crate::tools::{ArgumentSpec, Tool, ToolError, ToolOutput, ToolSpec};
use async_trait::async_trait;

/// Named color themes for generated pages. Unknown names fall back to
/// the first entry.
const THEMES: &[(&str, PageTheme)] = &[
    (
        "light",
        PageTheme {
            background: "#ffffff",
            surface: "#f4f4f5",
            text: "#18181b",
            accent: "#2563eb",
        },
    ),
    (
        "dark",
        PageTheme {
            background: "#09090b",
            surface: "#18181b",
            text: "#fafafa",
            accent: "#60a5fa",
        },
    ),
    (
        "ocean",
        PageTheme {
            background: "#0c4a6e",
            surface: "#075985",
            text: "#f0f9ff",
            accent: "#38bdf8",
        },
    ),
    (
        "sunset",
        PageTheme {
            background: "#431407",
            surface: "#7c2d12",
            text: "#fff7ed",
            accent: "#fb923c",
        },
    ),
    (
        "forest",
        PageTheme {
            background: "#14532d",
            surface: "#166534",
            text: "#f0fdf4",
            accent: "#4ade80",
        },
    ),
];

#[derive(Debug, Clone, Copy)]
struct PageTheme {
    background: &'static str,
    surface: &'static str,
    text: &'static str,
    accent: &'static str,
}

fn theme_for(name: &str) -> PageTheme {
    THEMES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, t)| *t)
        .unwrap_or(THEMES[0].1)
}

/// Minimal HTML escaping for interpolated user text
fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub struct LandingPageTool;

#[async_trait]
impl Tool for LandingPageTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "generate_landing_page",
            description: "Generate a self-contained HTML landing page from a title, sections, and an optional theme",
            arguments: &[
                ArgumentSpec {
                    name: "title",
                    type_: "string",
                    required: true,
                    description: "Page title and hero heading",
                },
                ArgumentSpec {
                    name: "tagline",
                    type_: "string",
                    required: false,
                    description: "Short hero subheading",
                },
                ArgumentSpec {
                    name: "sections",
                    type_: "array",
                    required: false,
                    description: "Content sections, each with 'heading' and 'body'",
                },
                ArgumentSpec {
                    name: "theme",
                    type_: "string",
                    required: false,
                    description: "Color theme: light, dark, ocean, sunset, or forest",
                },
            ],
        }
    }

    async fn execute(&self, args: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let title = args["title"].as_str().unwrap_or_default();
        if title.trim().is_empty() {
            return Err(ToolError::Validation {
                tool: "generate_landing_page".to_string(),
                message: "title must not be empty".to_string(),
            });
        }
        let tagline = args["tagline"].as_str().unwrap_or_default();
        let theme = theme_for(args["theme"].as_str().unwrap_or("light"));

        let mut sections_html = String::new();
        if let Some(sections) = args["sections"].as_array() {
            for section in sections {
                let heading = section["heading"].as_str().unwrap_or_default();
                let body = section["body"].as_str().unwrap_or_default();
                if heading.is_empty() && body.is_empty() {
                    continue;
                }
                sections_html.push_str(&format!(
                    "    <section>\n      <h2>{}</h2>\n      <p>{}</p>\n    </section>\n",
                    escape_html(heading),
                    escape_html(body)
                ));
            }
        }

        let html = format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{title}</title>
  <style>
    :root {{
      --bg: {bg};
      --surface: {surface};
      --text: {text};
      --accent: {accent};
    }}
    * {{ margin: 0; padding: 0; box-sizing: border-box; }}
    body {{
      background: var(--bg);
      color: var(--text);
      font-family: system-ui, -apple-system, sans-serif;
      line-height: 1.6;
    }}
    header {{
      padding: 6rem 2rem;
      text-align: center;
    }}
    header h1 {{ font-size: 3rem; margin-bottom: 1rem; }}
    header p {{ font-size: 1.25rem; opacity: 0.85; }}
    main {{ max-width: 48rem; margin: 0 auto; padding: 0 2rem 4rem; }}
    section {{
      background: var(--surface);
      border-radius: 0.75rem;
      padding: 2rem;
      margin-bottom: 1.5rem;
    }}
    section h2 {{ color: var(--accent); margin-bottom: 0.75rem; }}
  </style>
</head>
<body>
  <header>
    <h1>{title}</h1>
    <p>{tagline}</p>
  </header>
  <main>
{sections}  </main>
</body>
</html>
"#,
            title = escape_html(title),
            tagline = escape_html(tagline),
            sections = sections_html,
            bg = theme.background,
            surface = theme.surface,
            text = theme.text,
            accent = theme.accent,
        );

        Ok(ToolOutput {
            context: Some(format!(
                "A landing page titled \"{title}\" has been generated and is shown to the user in a side panel. Briefly describe the page to the user."
            )),
            content_fragment: None,
            patch: MessagePatch {
                artifact: Some(GeneratedArtifact {
                    kind: ArtifactKind::LandingPage,
                    title: title.to_string(),
                    content: html,
                    show_in_panel: true,
                }),
                ..Default::default()
            },
        })
    }
}

pub struct DocumentTool;

#[async_trait]
impl Tool for DocumentTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "generate_document",
            description: "Generate a structured markdown document from a title and sections",
            arguments: &[
                ArgumentSpec {
                    name: "title",
                    type_: "string",
                    required: true,
                    description: "Document title",
                },
                ArgumentSpec {
                    name: "sections",
                    type_: "array",
                    required: false,
                    description: "Content sections, each with 'heading' and 'body'",
                },
            ],
        }
    }

    async fn execute(&self, args: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let title = args["title"].as_str().unwrap_or_default();
        if title.trim().is_empty() {
            return Err(ToolError::Validation {
                tool: "generate_document".to_string(),
                message: "title must not be empty".to_string(),
            });
        }

        let mut markdown = format!("# {title}\n");
        if let Some(sections) = args["sections"].as_array() {
            for section in sections {
                let heading = section["heading"].as_str().unwrap_or_default();
                let body = section["body"].as_str().unwrap_or_default();
                if !heading.is_empty() {
                    markdown.push_str(&format!("\n## {heading}\n"));
                }
                if !body.is_empty() {
                    markdown.push_str(&format!("\n{body}\n"));
                }
            }
        }

        Ok(ToolOutput {
            context: Some(format!(
                "A document titled \"{title}\" has been generated and is shown to the user in a side panel. Briefly describe the document to the user."
            )),
            content_fragment: None,
            patch: MessagePatch {
                artifact: Some(GeneratedArtifact {
                    kind: ArtifactKind::Document,
                    title: title.to_string(),
                    content: markdown,
                    show_in_panel: true,
                }),
                ..Default::default()
            },
        })
    }
}
