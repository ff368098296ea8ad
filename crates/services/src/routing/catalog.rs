//! Model catalog: one model per task class plus per-family fallbacks.
//!
//! Fallback lists put same-provider siblings first and end with a
//! cross-provider default, so a provider-wide outage still has an
//! escape hatch.

use crate::routing::GenerationParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskClass {
    General,
    Title,
    Research,
    Coding,
    LandingPage,
    Summarization,
    Vision,
    DataAnalysis,
}

pub const GENERAL_MODEL: &str = "gpt-4.1-mini";
pub const TITLE_MODEL: &str = "gpt-4.1-nano";
pub const RESEARCH_MODEL: &str = "o3-mini";
pub const CODING_MODEL: &str = "gpt-4.1";
pub const LANDING_PAGE_MODEL: &str = "gpt-4.1";
pub const SUMMARIZATION_MODEL: &str = "gpt-4.1-mini";
pub const VISION_MODEL: &str = "gpt-4o";
pub const DATA_ANALYSIS_MODEL: &str = "o3-mini";

/// Cross-provider default appended to every fallback list
const CROSS_PROVIDER_FALLBACK: &str = "llama-3.3-70b-instruct";

/// Primary model and raw fallback list for a task class.
///
/// The raw list may contain the primary (families share members);
/// callers filter it out.
pub fn models_for(class: TaskClass) -> (&'static str, &'static [&'static str]) {
    match class {
        TaskClass::General => (GENERAL_MODEL, &["gpt-4.1", CROSS_PROVIDER_FALLBACK]),
        TaskClass::Title => (TITLE_MODEL, &["gpt-4.1-mini", "llama-3.1-8b-instruct"]),
        TaskClass::Research => (RESEARCH_MODEL, &["gpt-4.1", CROSS_PROVIDER_FALLBACK]),
        TaskClass::Coding => (CODING_MODEL, &["o3-mini", "qwen2.5-coder-32b-instruct"]),
        TaskClass::LandingPage => (
            LANDING_PAGE_MODEL,
            &["gpt-4.1-mini", "qwen2.5-coder-32b-instruct"],
        ),
        TaskClass::Summarization => (
            SUMMARIZATION_MODEL,
            &["gpt-4.1-nano", "llama-3.1-8b-instruct"],
        ),
        TaskClass::Vision => (VISION_MODEL, &["gpt-4.1", "llama-3.2-90b-vision-instruct"]),
        TaskClass::DataAnalysis => (DATA_ANALYSIS_MODEL, &["gpt-4.1", CROSS_PROVIDER_FALLBACK]),
    }
}

/// Generation parameters per task class
pub fn params_for(class: TaskClass) -> GenerationParams {
    match class {
        TaskClass::Title => GenerationParams {
            temperature: 0.3,
            max_tokens: 64,
            top_p: 1.0,
        },
        TaskClass::Research | TaskClass::DataAnalysis => GenerationParams {
            temperature: 0.5,
            max_tokens: 8192,
            top_p: 1.0,
        },
        TaskClass::Coding | TaskClass::LandingPage => GenerationParams {
            temperature: 0.4,
            max_tokens: 8192,
            top_p: 1.0,
        },
        TaskClass::Summarization => GenerationParams {
            temperature: 0.3,
            max_tokens: 2048,
            top_p: 1.0,
        },
        TaskClass::General | TaskClass::Vision => GenerationParams {
            temperature: 0.7,
            max_tokens: 4096,
            top_p: 1.0,
        },
    }
}
