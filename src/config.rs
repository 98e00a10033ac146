use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Chat models the assistant may be configured with.
pub const SUPPORTED_CHAT_MODELS: &[&str] = &["gpt-4o-mini", "gpt-4", "gpt-3.5-turbo"];

/// History memory strategies accepted in configuration.
pub const SUPPORTED_MEMORY_STRATEGIES: &[&str] = &["buffer", "summary", "token-buffer"];

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_collection() -> String {
    "documents".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters. Chunks are cut at exactly this
    /// size with no overlap; the final chunk may be shorter.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Number of nearest chunks fetched per query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Approximate token budget for the assembled context string.
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            token_budget: default_token_budget(),
        }
    }
}

fn default_top_k() -> usize {
    3
}
fn default_token_budget() -> usize {
    1500
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Override the embeddings endpoint (primarily for tests).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Fixed delay between retry attempts, in seconds.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    /// Mandatory pause between consecutive embedding calls during bulk
    /// indexing, in seconds.
    #[serde(default = "default_bulk_pause_secs")]
    pub bulk_pause_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            url: None,
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            bulk_pause_secs: default_bulk_pause_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay_secs() -> u64 {
    20
}
fn default_bulk_pause_secs() -> u64 {
    1
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    #[serde(default = "default_chat_model")]
    pub model: String,
    /// Override the chat-completions endpoint (primarily for tests).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_stream")]
    pub stream: bool,
    /// History window strategy: `buffer`, `summary`, or `token-buffer`.
    #[serde(default = "default_memory")]
    pub memory: String,
    /// Exchanges kept by the `buffer` strategy.
    #[serde(default = "default_buffer_turns")]
    pub buffer_turns: usize,
    /// Approximate token cap for the `token-buffer` strategy.
    #[serde(default = "default_token_buffer")]
    pub token_buffer: usize,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: default_chat_model(),
            url: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            stream: default_stream(),
            memory: default_memory(),
            buffer_turns: default_buffer_turns(),
            token_buffer: default_token_buffer(),
            system_prompt: default_system_prompt(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_max_tokens() -> u32 {
    150
}
fn default_temperature() -> f64 {
    0.7
}
fn default_stream() -> bool {
    true
}
fn default_memory() -> String {
    "buffer".to_string()
}
fn default_buffer_turns() -> usize {
    5
}
fn default_token_buffer() -> usize {
    5000
}
fn default_system_prompt() -> String {
    "You are a helpful assistant that answers questions using the provided document context."
        .to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeatherConfig {
    #[serde(default = "default_weather_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            url: default_weather_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_weather_url() -> String {
    "https://api.openweathermap.org/data/2.5/weather".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate chunking
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }

    // Validate retrieval
    if config.retrieval.top_k == 0 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    // Validate retry bounds
    if config.embedding.max_retries == 0 || config.chat.max_retries == 0 {
        anyhow::bail!("max_retries must be >= 1");
    }

    // Validate chat model
    if !SUPPORTED_CHAT_MODELS.contains(&config.chat.model.as_str()) {
        anyhow::bail!(
            "Unknown chat model: '{}'. Supported models: {}",
            config.chat.model,
            SUPPORTED_CHAT_MODELS.join(", ")
        );
    }

    // Validate memory strategy
    if !SUPPORTED_MEMORY_STRATEGIES.contains(&config.chat.memory.as_str()) {
        anyhow::bail!(
            "Unknown memory strategy: '{}'. Supported: {}",
            config.chat.memory,
            SUPPORTED_MEMORY_STRATEGIES.join(", ")
        );
    }

    if !(0.0..=2.0).contains(&config.chat.temperature) {
        anyhow::bail!("chat.temperature must be in [0.0, 2.0]");
    }

    Ok(config)
}
