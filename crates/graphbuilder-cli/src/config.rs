//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use graphbuilder_extractor::{ChunkingConfig, TransformerConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Model connection
    #[serde(default)]
    pub model: ModelConfig,

    /// Extraction settings
    #[serde(default)]
    pub transformer: TransformerConfig,

    /// Chunking of large inputs
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,
}

/// Model backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Local Ollama server
    Ollama,
    /// OpenAI-compatible chat completions API
    OpenAi,
}

/// Model connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Backend to talk to
    #[serde(default = "default_provider")]
    pub provider: Provider,

    /// Base URL of the API
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Whether the served model supports schema-bound output
    #[serde(default = "default_true")]
    pub structured_output: bool,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retry attempts per request
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

/// Global CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,

    /// Process documents concurrently
    #[serde(default = "default_true")]
    pub concurrent: bool,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Summary table
    Table,
    /// Full graph documents as JSON
    Json,
    /// Quiet (one line per document)
    Quiet,
}

impl Config {
    /// Get the default configuration file path.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".graphbuilder").join("config.toml"))
    }

    /// Load configuration from `path`, or defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Check the transformer and chunking sections.
    pub fn validate(&self) -> Result<()> {
        self.transformer.validate().map_err(CliError::Config)?;
        self.chunking.validate().map_err(CliError::Config)?;
        Ok(())
    }

    /// Resolve the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<Option<String>> {
        match &self.model.api_key_env {
            None => Ok(None),
            Some(var) => std::env::var(var)
                .map(Some)
                .map_err(|_| CliError::Config(format!("Environment variable '{}' is not set", var))),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: None,
            structured_output: true,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
            concurrent: true,
        }
    }
}

fn default_provider() -> Provider {
    Provider::Ollama
}

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.1".to_string()
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model.provider, Provider::Ollama);
        assert!(config.transformer.strict_mode);
        assert!(config.settings.concurrent);
        assert_eq!(config.chunking.chunk_size, 200);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.model.model, "llama3.1");
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
            [model]
            provider = "openai"
            endpoint = "https://api.example.com/v1"
            model = "gpt-4o-mini"
            api_key_env = "EXAMPLE_KEY"

            [transformer]
            allowed_nodes = ["Person", "Company"]
            strict_mode = false

            [settings]
            format = "json"
            "#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.model.provider, Provider::OpenAi);
        assert_eq!(config.model.max_retries, 3);
        assert_eq!(config.transformer.allowed_nodes.len(), 2);
        assert!(!config.transformer.strict_mode);
        assert_eq!(config.settings.format, OutputFormat::Json);
        assert!(config.settings.color);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.transformer.allowed_relationships = vec!["WORKS_FOR".to_string()];
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.transformer, config.transformer);
        assert_eq!(loaded.chunking, config.chunking);
    }

    #[test]
    fn test_invalid_chunking_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[chunking]\nchunk_size = 10\nchunk_overlap = 10\n").unwrap();
        assert!(matches!(Config::load(&path), Err(CliError::Config(_))));
    }

    #[test]
    fn test_missing_api_key_env() {
        let mut config = Config::default();
        config.model.api_key_env = Some("GRAPHBUILDER_TEST_UNSET_KEY".to_string());
        assert!(config.api_key().is_err());
        config.model.api_key_env = None;
        assert_eq!(config.api_key().unwrap(), None);
    }
}
