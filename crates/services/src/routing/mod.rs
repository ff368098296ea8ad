//! Model routing policy
//!
//! Pure mapping from a prompt and context flags to a primary model and
//! an ordered fallback list. No I/O, no error conditions: routing
//! always returns a selection, falling through to the general model.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

pub mod catalog;

use catalog::TaskClass;

/// Context flags known before the prompt is inspected. Flag checks
/// take precedence over keyword matching, first match wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextFlags {
    pub title_generation: bool,
    pub summary_generation: bool,
    pub landing_page: bool,
    pub research: bool,
    pub has_data_files: bool,
    pub has_images: bool,
}

/// Resolved generation parameters for a selection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: i64,
    pub top_p: f32,
}

/// Result of the routing policy; computed once per run and immutable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSelection {
    pub primary: String,
    pub fallbacks: Vec<String>,
    pub params: GenerationParams,
}

/// Ordered keyword families tested against the lowercased prompt.
/// Each family maps to one task class; earlier families win.
const KEYWORD_FAMILIES: &[(TaskClass, &str)] = &[
    (
        TaskClass::Research,
        r"\b(research|investigate|in[- ]depth|literature review|comprehensive (report|analysis))\b",
    ),
    (
        TaskClass::LandingPage,
        r"\b(landing page|web ?page|website|homepage|web site)\b",
    ),
    (
        TaskClass::Coding,
        r"\b(code|coding|function|refactor|debug|compile|script|algorithm|unit test)\b",
    ),
    (
        TaskClass::Summarization,
        r"\b(summariz\w*|summar(y|ies)|tl;?dr|recap|condense)\b",
    ),
    (
        TaskClass::Vision,
        r"\b(analyz\w* (this |the )?(image|photo|picture|screenshot)|what('s| is) in (this|the) (image|photo|picture))\b",
    ),
    (
        TaskClass::DataAnalysis,
        r"\b(csv|spreadsheet|dataset|data analysis|pivot table|plot the data)\b",
    ),
];

/// Select a model for the given prompt and flags.
///
/// Deterministic: the same inputs always yield the same selection, and
/// the fallback list never contains the primary model.
pub fn select_model(prompt: &str, flags: &ContextFlags) -> ModelSelection {
    let class = classify(prompt, flags);
    let (primary, fallbacks) = catalog::models_for(class);

    let fallbacks = fallbacks
        .iter()
        .filter(|m| **m != primary)
        .map(|m| m.to_string())
        .collect();

    ModelSelection {
        primary: primary.to_string(),
        fallbacks,
        params: catalog::params_for(class),
    }
}

fn classify(prompt: &str, flags: &ContextFlags) -> TaskClass {
    // Explicit flags first, in priority order
    if flags.title_generation || flags.summary_generation {
        return if flags.title_generation {
            TaskClass::Title
        } else {
            TaskClass::Summarization
        };
    }
    if flags.landing_page {
        return TaskClass::LandingPage;
    }
    if flags.research {
        return TaskClass::Research;
    }
    if flags.has_data_files {
        return TaskClass::DataAnalysis;
    }
    if flags.has_images {
        return TaskClass::Vision;
    }

    let lowered = prompt.trim().to_lowercase();
    if lowered.is_empty() {
        return TaskClass::General;
    }

    for (class, re) in keyword_regexes() {
        if re.is_match(&lowered) {
            return *class;
        }
    }

    TaskClass::General
}

/// Keyword families compiled once on first use
fn keyword_regexes() -> &'static [(TaskClass, regex::Regex)] {
    static REGEXES: OnceLock<Vec<(TaskClass, regex::Regex)>> = OnceLock::new();
    REGEXES.get_or_init(|| {
        KEYWORD_FAMILIES
            .iter()
            .map(|(class, pattern)| {
                // Patterns are compile-time constants; construction cannot fail
                let re = regex::Regex::new(pattern).expect("invalid routing pattern");
                (*class, re)
            })
            .collect()
    })
}
