// Configuration Management
//
// This crate handles all configuration loading for the generation backend.
// It provides:
// - Configuration structs and deserialization
// - File loading logic
// - Default configuration values
//
// This keeps configuration concerns separate from domain logic.

use std::path::Path;
use thiserror::Error;

pub mod types;

// Re-export all configuration types
pub use types::*;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found. Tried paths: {paths}")]
    FileNotFound { paths: String },

    #[error("Failed to read configuration file: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {source}")]
    ParseError {
        #[from]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration loading interface
impl AppConfig {
    /// Load configuration from YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        // Try different config locations in order
        let config_paths = ["config/config.yaml", "config.yaml", "config/default.yaml"];

        for path in &config_paths {
            if std::path::Path::new(path).exists() {
                return Self::load_from_file(path);
            }
        }

        // If no config file found, fail with descriptive error
        Err(ConfigError::FileNotFound {
            paths: config_paths.join(", "),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let yaml = r#"
provider:
  base_url: "https://api.openai.com/v1"
  api_key: "sk-test"
search:
  api_key: "tvly-test"
"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = AppConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.provider.base_url, "https://api.openai.com/v1");
        assert_eq!(config.provider.api_key, "sk-test");
        assert_eq!(config.search.api_key.as_deref(), Some("tvly-test"));
        // Unspecified sections fall back to defaults
        assert_eq!(config.generation.flush_interval_chars, 40);
    }

    #[test]
    fn test_load_from_missing_file() {
        let result = AppConfig::load_from_file("/nonexistent/config.yaml");
        assert!(matches!(result, Err(ConfigError::IoError { .. })));
    }
}
