//! Configuration management for Chatfolio
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//! Credentials are not part of this configuration; they live in each
//! profile's credential record (see [`crate::profile`]).

use crate::error::{ChatfolioError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for Chatfolio
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root directory holding one subdirectory per profile
    #[serde(default = "default_profiles_dir")]
    pub profiles_dir: PathBuf,

    /// Completion gateway settings
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Document retrieval settings
    #[serde(default)]
    pub documents: DocumentsConfig,
}

fn default_profiles_dir() -> PathBuf {
    ProjectDirs::from("com", "chatfolio", "chatfolio")
        .map(|dirs| dirs.data_dir().join("profiles"))
        .unwrap_or_else(|| PathBuf::from("profiles"))
}

/// Completion gateway configuration
///
/// Targets any OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Base URL of the API (without the `/chat/completions` suffix)
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Chat model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens in a generated reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound for one gateway round trip, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_temperature() -> f32 {
    0.7
}

fn default_request_timeout() -> u64 {
    120
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

/// Document retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentsConfig {
    /// Embedding model identifier
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared between neighbouring chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Number of chunks handed to the model per retrieval query
    #[serde(default = "default_similarity_top_k")]
    pub similarity_top_k: usize,

    /// Cap on generated sub-questions per user query
    #[serde(default = "default_max_sub_questions")]
    pub max_sub_questions: usize,

    /// Query used to describe a freshly ingested document
    #[serde(default = "default_description_prompt")]
    pub description_prompt: String,
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_chunk_size() -> usize {
    1024
}

fn default_chunk_overlap() -> usize {
    128
}

fn default_similarity_top_k() -> usize {
    3
}

fn default_max_sub_questions() -> usize {
    5
}

fn default_description_prompt() -> String {
    "Please provide a brief description of this document in 200 words or less.".to_string()
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            embedding_model: default_embedding_model(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            similarity_top_k: default_similarity_top_k(),
            max_sub_questions: default_max_sub_questions(),
            description_prompt: default_description_prompt(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ChatfolioError::Config(format!("Failed to read {}: {}", path, e)))?;
        let config: Config = serde_yaml::from_str(&contents)?;
        tracing::debug!("Loaded configuration from {}", path);
        Ok(config)
    }

    fn apply_env_vars(&mut self) {
        if let Ok(dir) = std::env::var("CHATFOLIO_PROFILES_DIR") {
            self.profiles_dir = PathBuf::from(dir);
        }
        if let Ok(base) = std::env::var("CHATFOLIO_API_BASE") {
            self.completion.api_base = base;
        }
        if let Ok(model) = std::env::var("CHATFOLIO_MODEL") {
            self.completion.model = model;
        }
        if let Ok(model) = std::env::var("CHATFOLIO_EMBEDDING_MODEL") {
            self.documents.embedding_model = model;
        }
        if let Ok(timeout) = std::env::var("CHATFOLIO_TIMEOUT_SECONDS") {
            match timeout.parse() {
                Ok(secs) => self.completion.request_timeout_seconds = secs,
                Err(_) => tracing::warn!(
                    "Ignoring CHATFOLIO_TIMEOUT_SECONDS={}: not a number",
                    timeout
                ),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(dir) = &cli.profiles_dir {
            self.profiles_dir = dir.clone();
        }
        if let Some(model) = &cli.model {
            self.completion.model = model.clone();
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns `ChatfolioError::Config` describing the first invalid value
    pub fn validate(&self) -> Result<()> {
        if self.completion.model.trim().is_empty() {
            return Err(ChatfolioError::Config("completion.model cannot be empty".into()).into());
        }

        let base = url::Url::parse(&self.completion.api_base).map_err(|e| {
            ChatfolioError::Config(format!(
                "completion.api_base '{}' is not a valid URL: {}",
                self.completion.api_base, e
            ))
        })?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(ChatfolioError::Config(format!(
                "completion.api_base must use http or https, got {}",
                base.scheme()
            ))
            .into());
        }

        if self.completion.max_tokens == 0 {
            return Err(
                ChatfolioError::Config("completion.max_tokens must be greater than 0".into())
                    .into(),
            );
        }

        if !(0.0..=2.0).contains(&self.completion.temperature) {
            return Err(ChatfolioError::Config(
                "completion.temperature must be between 0.0 and 2.0".into(),
            )
            .into());
        }

        if self.completion.request_timeout_seconds == 0 {
            return Err(ChatfolioError::Config(
                "completion.request_timeout_seconds must be greater than 0".into(),
            )
            .into());
        }

        if self.documents.embedding_model.trim().is_empty() {
            return Err(
                ChatfolioError::Config("documents.embedding_model cannot be empty".into()).into(),
            );
        }

        if self.documents.chunk_size == 0 {
            return Err(
                ChatfolioError::Config("documents.chunk_size must be greater than 0".into())
                    .into(),
            );
        }

        if self.documents.chunk_overlap >= self.documents.chunk_size {
            return Err(ChatfolioError::Config(
                "documents.chunk_overlap must be smaller than documents.chunk_size".into(),
            )
            .into());
        }

        if self.documents.similarity_top_k == 0 {
            return Err(ChatfolioError::Config(
                "documents.similarity_top_k must be greater than 0".into(),
            )
            .into());
        }

        if self.documents.max_sub_questions == 0 {
            return Err(ChatfolioError::Config(
                "documents.max_sub_questions must be greater than 0".into(),
            )
            .into());
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profiles_dir: default_profiles_dir(),
            completion: CompletionConfig::default(),
            documents: DocumentsConfig::default(),
        }
    }
}
