//! TOML configuration.
//!
//! Every section is optional; [`Config::default`] describes a fallback-only
//! deployment (no embeddings, no index, OpenAI chat for generation).
//! Credentials are never read from this file, only from the environment.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::chunk::ChunkSettings;

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const PINECONE_API_KEY: &str = "PINECONE_API_KEY";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContentConfig {
    #[serde(default = "default_content_path")]
    pub path: PathBuf,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            path: default_content_path(),
        }
    }
}

fn default_content_path() -> PathBuf {
    PathBuf::from("./content/profile.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

impl ChunkingConfig {
    pub fn settings(&self) -> ChunkSettings {
        ChunkSettings {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the ollama provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_embedding_provider() -> String {
    "disabled".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_batch_size() -> usize {
    100
}
fn default_embedding_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_index_backend")]
    pub backend: String,
    #[serde(default = "default_index_name")]
    pub name: String,
    /// SQLite file for the `sqlite` backend.
    #[serde(default = "default_index_path")]
    pub path: PathBuf,
    /// Explicit data-plane host for the `pinecone` backend; resolved from
    /// `name` when absent.
    #[serde(default)]
    pub host: Option<String>,
    /// Pinecone control-plane URL used to resolve `host`.
    #[serde(default)]
    pub control_plane: Option<String>,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_index_timeout")]
    pub timeout_secs: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: default_index_backend(),
            name: default_index_name(),
            path: default_index_path(),
            host: None,
            control_plane: None,
            top_k: default_top_k(),
            timeout_secs: default_index_timeout(),
        }
    }
}

fn default_index_backend() -> String {
    "disabled".to_string()
}
fn default_index_name() -> String {
    "portfolio".to_string()
}
fn default_index_path() -> PathBuf {
    PathBuf::from("./data/index.sqlite")
}
fn default_top_k() -> usize {
    5
}
fn default_index_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Override the provider's API base URL (proxies, gateways).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: None,
            url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            history_turns: default_history_turns(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl LlmConfig {
    /// Configured model, or the provider's default.
    pub fn model_name(&self) -> &str {
        match (&self.model, self.provider.as_str()) {
            (Some(model), _) => model,
            (None, "anthropic") => "claude-3-5-haiku-latest",
            (None, _) => "gpt-4o-mini",
        }
    }
}

fn default_llm_provider() -> String {
    "openai".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> usize {
    500
}
fn default_history_turns() -> usize {
    6
}
fn default_llm_timeout() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

/// Read an environment credential, treating blank values as absent.
pub fn credential(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Validate chunking
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        anyhow::bail!("chunking.chunk_overlap must be smaller than chunking.chunk_size");
    }

    // Validate embedding
    if !(1..=100).contains(&config.embedding.batch_size) {
        anyhow::bail!("embedding.batch_size must be in [1, 100]");
    }
    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" | "local" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
            other
        ),
    }
    if config.embedding.dims == Some(0) {
        anyhow::bail!("embedding.dims must be > 0 when set");
    }

    // Validate index
    match config.index.backend.as_str() {
        "disabled" | "memory" | "sqlite" | "pinecone" => {}
        other => anyhow::bail!(
            "Unknown index backend: '{}'. Must be disabled, memory, sqlite, or pinecone.",
            other
        ),
    }
    if config.index.top_k == 0 {
        anyhow::bail!("index.top_k must be >= 1");
    }
    if config.index.backend != "disabled" && !config.embedding.is_enabled() {
        anyhow::bail!(
            "index.backend '{}' requires an embedding provider",
            config.index.backend
        );
    }

    // Validate llm
    match config.llm.provider.as_str() {
        "openai" | "anthropic" => {}
        other => anyhow::bail!(
            "Unknown llm provider: '{}'. Must be openai or anthropic.",
            other
        ),
    }
    if !(0.0..=2.0).contains(&config.llm.temperature) {
        anyhow::bail!("llm.temperature must be in [0.0, 2.0]");
    }
    if config.llm.max_tokens == 0 {
        anyhow::bail!("llm.max_tokens must be > 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.index.top_k, 5);
        assert_eq!(config.embedding.model, "text-embedding-3-small");
        assert_eq!(config.llm.max_tokens, 500);
        assert!((config.llm.temperature - 0.7).abs() < f32::EPSILON);
        assert!(!config.embedding.is_enabled());
    }

    #[test]
    fn overrides_are_applied() {
        let config = parse_config(
            r#"
            [chunking]
            chunk_size = 500
            chunk_overlap = 50

            [embedding]
            provider = "openai"

            [index]
            backend = "pinecone"
            name = "folio"
            top_k = 3
            control_plane = "http://localhost:5080"

            [llm]
            url = "http://localhost:8080"
            "#,
        )
        .unwrap();
        assert_eq!(config.chunking.settings().overlap_words(), 10);
        assert_eq!(config.index.control_plane.as_deref(), Some("http://localhost:5080"));
        assert_eq!(config.llm.url.as_deref(), Some("http://localhost:8080"));
        assert_eq!(config.index.name, "folio");
        assert_eq!(config.index.top_k, 3);
    }

    #[test]
    fn overlap_must_be_smaller_than_size() {
        let err = parse_config("[chunking]\nchunk_size = 100\nchunk_overlap = 100\n").unwrap_err();
        assert!(err.to_string().contains("chunk_overlap"));
    }

    #[test]
    fn batch_size_is_capped_at_100() {
        let err = parse_config("[embedding]\nbatch_size = 101\n").unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn index_requires_embeddings() {
        let err = parse_config("[index]\nbackend = \"memory\"\n").unwrap_err();
        assert!(err.to_string().contains("requires an embedding provider"));
    }

    #[test]
    fn unknown_llm_provider_rejected() {
        assert!(parse_config("[llm]\nprovider = \"mystery\"\n").is_err());
    }

    #[test]
    fn default_model_follows_provider() {
        let mut llm = LlmConfig::default();
        assert_eq!(llm.model_name(), "gpt-4o-mini");
        llm.provider = "anthropic".to_string();
        assert_eq!(llm.model_name(), "claude-3-5-haiku-latest");
    }
}
