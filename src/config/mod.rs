
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Top-level application configuration, loaded from a TOML file.
///
/// Every section has sensible defaults so a missing config file yields a
/// working local setup (Ollama on localhost, WebSocket server on 8765).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub ollama: OllamaConfig,
    pub content: ContentConfig,
    pub query: QueryConfig,
    pub collection: CollectionConfig,
}

/// WebSocket server bind address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    #[inline]
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8765,
        }
    }
}

/// Logging level, format, and sink selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub level: String,
    pub format: LogFormat,
    pub console: ConsoleSinkConfig,
    pub file: FileSinkConfig,
}

impl Default for LoggingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Full,
            console: ConsoleSinkConfig::default(),
            file: FileSinkConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConsoleSinkConfig {
    pub enabled: bool,
}

impl Default for ConsoleSinkConfig {
    #[inline]
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FileSinkConfig {
    pub enabled: bool,
    pub filename: PathBuf,
}

impl Default for FileSinkConfig {
    #[inline]
    fn default() -> Self {
        Self {
            enabled: false,
            filename: PathBuf::from("rag-bridge.log"),
        }
    }
}

/// Connection settings for the Ollama server plus the model identifiers
/// used for embedding and generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub embedding_model: String,
    pub generation_model: String,
}

impl Default for OllamaConfig {
    #[inline]
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            embedding_model: "nomic-embed-text".to_string(),
            generation_model: "llama3.2".to_string(),
        }
    }
}

/// Chunk sizing and ingestion batching.
///
/// `chars_per_token` is the divisor of the character-count token estimate.
/// The default of 4 mirrors the common rule of thumb for English text; it
/// is a policy knob, not a calibrated constant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContentConfig {
    pub max_chunk_tokens: usize,
    pub chars_per_token: usize,
    pub batch_size: usize,
}

impl Default for ContentConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_chunk_tokens: 500,
            chars_per_token: 4,
            batch_size: 64,
        }
    }
}

impl ContentConfig {
    #[inline]
    pub fn chunker(&self) -> crate::chunker::ChunkerConfig {
        crate::chunker::ChunkerConfig {
            max_chunk_tokens: self.max_chunk_tokens,
            chars_per_token: self.chars_per_token,
        }
    }
}

/// Retrieval settings for query enhancement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QueryConfig {
    pub max_results: usize,
}

impl Default for QueryConfig {
    #[inline]
    fn default() -> Self {
        Self { max_results: 5 }
    }
}

/// Vector store collection name, on-disk location, and search metric.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CollectionConfig {
    pub name: String,
    pub data_dir: PathBuf,
    pub metric: Metric,
}

impl Default for CollectionConfig {
    #[inline]
    fn default() -> Self {
        Self {
            name: "web_content".to_string(),
            data_dir: PathBuf::from("rag-bridge-data"),
            metric: Metric::default(),
        }
    }
}

/// Distance metric used for similarity search.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    L2,
    Cosine,
    Dot,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid model name: {0:?} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid host: cannot be empty")]
    InvalidHost,
    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(usize),
    #[error("Invalid max chunk tokens: {0} (must be between 1 and 8192)")]
    InvalidMaxChunkTokens(usize),
    #[error("Invalid chars per token: {0} (must be between 1 and 16)")]
    InvalidCharsPerToken(usize),
    #[error("Invalid max results: {0} (must be between 1 and 100)")]
    InvalidMaxResults(usize),
    #[error("Invalid collection name: cannot be empty")]
    InvalidCollectionName,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Load configuration from the given path.
    ///
    /// A missing file yields the defaults; an unreadable or invalid file is
    /// an error, which aborts the process before anything is served.
    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.logging.validate()?;
        self.ollama.validate()?;
        self.content.validate()?;
        self.query.validate()?;
        self.collection.validate()?;
        Ok(())
    }

    /// Render the effective configuration as pretty TOML.
    #[inline]
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl ServerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::InvalidHost);
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }
        Ok(())
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.level
            .parse::<tracing::Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(self.level.clone()))?;
        Ok(())
    }
}

impl OllamaConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::InvalidHost);
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }
        if self.embedding_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.embedding_model.clone()));
        }
        if self.generation_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.generation_model.clone()));
        }
        self.url()?;
        Ok(())
    }

    /// Base URL of the Ollama server.
    #[inline]
    pub fn url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }
}

impl ContentConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=8192).contains(&self.max_chunk_tokens) {
            return Err(ConfigError::InvalidMaxChunkTokens(self.max_chunk_tokens));
        }
        if !(1..=16).contains(&self.chars_per_token) {
            return Err(ConfigError::InvalidCharsPerToken(self.chars_per_token));
        }
        if !(1..=1000).contains(&self.batch_size) {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }
        Ok(())
    }
}

impl QueryConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.max_results) {
            return Err(ConfigError::InvalidMaxResults(self.max_results));
        }
        Ok(())
    }
}

impl CollectionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::InvalidCollectionName);
        }
        Ok(())
    }
}
