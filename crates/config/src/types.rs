use serde::Deserialize;
use std::{collections::HashMap, env};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub image: Option<ImageProviderConfig>,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            provider: ProviderConfig::from_env()?,
            image: ImageProviderConfig::from_env(),
            search: SearchConfig::from_env(),
            generation: GenerationConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        })
    }
}

/// Chat-completion provider endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u32,
}

fn default_provider_timeout() -> u32 {
    300
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            timeout_seconds: default_provider_timeout(),
        }
    }
}

impl ProviderConfig {
    /// Load from environment variables
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            base_url: env::var("PROVIDER_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            api_key: env::var("PROVIDER_API_KEY").map_err(|_| "PROVIDER_API_KEY not set")?,
            timeout_seconds: env::var("PROVIDER_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_provider_timeout),
        })
    }
}

/// Image generation provider configuration
///
/// Absence of this section means image generation is disabled; the
/// `generate_image` tool then reports an execution error instead of
/// calling out.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageProviderConfig {
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_image_model")]
    pub model: String,
}

fn default_image_model() -> String {
    "dall-e-3".to_string()
}

impl ImageProviderConfig {
    /// Load from environment variables; None when the key is absent
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("IMAGE_API_KEY").ok()?;
        Some(Self {
            base_url: env::var("IMAGE_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            api_key,
            model: env::var("IMAGE_MODEL").unwrap_or_else(|_| default_image_model()),
        })
    }
}

/// Search provider configuration
///
/// A missing API key is the valid "search disabled" state, not an error.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_search_url")]
    pub base_url: String,
    #[serde(default = "default_search_max_results")]
    pub max_results: usize,
}

fn default_search_url() -> String {
    "https://api.tavily.com".to_string()
}

fn default_search_max_results() -> usize {
    5
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_search_url(),
            max_results: default_search_max_results(),
        }
    }
}

impl SearchConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        Self {
            api_key: env::var("SEARCH_API_KEY").ok(),
            base_url: env::var("SEARCH_BASE_URL").unwrap_or_else(|_| default_search_url()),
            max_results: env::var("SEARCH_MAX_RESULTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_search_max_results),
        }
    }
}

/// Tuning knobs for the generation orchestrator
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    /// Partial content is persisted every N accumulated characters
    #[serde(default = "default_flush_interval")]
    pub flush_interval_chars: usize,
    /// How many search results get a full-page content fetch
    #[serde(default = "default_enrich_top_n")]
    pub enrich_top_n: usize,
    /// Byte cap on fetched page content
    #[serde(default = "default_enrich_max_bytes")]
    pub enrich_max_bytes: usize,
}

fn default_flush_interval() -> usize {
    40
}

fn default_enrich_top_n() -> usize {
    3
}

fn default_enrich_max_bytes() -> usize {
    4000
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            flush_interval_chars: default_flush_interval(),
            enrich_top_n: default_enrich_top_n(),
            enrich_max_bytes: default_enrich_max_bytes(),
        }
    }
}

impl GenerationConfig {
    /// Load from environment variables
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            flush_interval_chars: env::var("GENERATION_FLUSH_INTERVAL_CHARS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_flush_interval),
            enrich_top_n: env::var("GENERATION_ENRICH_TOP_N")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_enrich_top_n),
            enrich_max_bytes: env::var("GENERATION_ENRICH_MAX_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_enrich_max_bytes),
        })
    }
}

/// Logging Configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl LoggingConfig {
    /// Load from environment variables
    pub fn from_env() -> Result<Self, String> {
        let mut modules = HashMap::new();

        // Load module-specific log levels
        if let Ok(level) = env::var("LOG_MODULE_SERVICES") {
            modules.insert("services".to_string(), level);
        }
        if let Ok(level) = env::var("LOG_MODULE_PROVIDERS") {
            modules.insert("inference_providers".to_string(), level);
        }

        Ok(Self {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| default_log_level()),
            format: env::var("LOG_FORMAT").unwrap_or_else(|_| default_log_format()),
            modules,
        })
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            modules: HashMap::new(),
        }
    }
}
