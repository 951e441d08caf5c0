use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Target chunk size in characters for plain-text input.
    #[serde(default = "default_plain_target")]
    pub plain_target: usize,
    #[serde(default = "default_plain_overlap")]
    pub plain_overlap: usize,
    /// Target chunk size for structured (markdown) input, where splitting
    /// prefers section-header boundaries.
    #[serde(default = "default_structured_target")]
    pub structured_target: usize,
    #[serde(default = "default_structured_overlap")]
    pub structured_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            plain_target: default_plain_target(),
            plain_overlap: default_plain_overlap(),
            structured_target: default_structured_target(),
            structured_overlap: default_structured_overlap(),
        }
    }
}

fn default_plain_target() -> usize {
    4000
}
fn default_plain_overlap() -> usize {
    800
}
fn default_structured_target() -> usize {
    8000
}
fn default_structured_overlap() -> usize {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Candidate cap for the brute-force fallback scan. The degraded path
    /// only scores the first `scan_cap` chunks returned by the store, so on
    /// corpora larger than this the fallback trades recall for latency.
    #[serde(default = "default_scan_cap")]
    pub scan_cap: i64,
    #[serde(default = "default_final_limit")]
    pub final_limit: i64,
    /// Over-fetch multiplier applied when a system-context hint filters
    /// search results.
    #[serde(default = "default_hint_overfetch")]
    pub hint_overfetch: i64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            scan_cap: default_scan_cap(),
            final_limit: default_final_limit(),
            hint_overfetch: default_hint_overfetch(),
        }
    }
}

fn default_scan_cap() -> i64 {
    100
}
fn default_final_limit() -> i64 {
    5
}
fn default_hint_overfetch() -> i64 {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// Provider priority order. Each entry must have a matching
    /// per-provider table below; the first healthy provider wins.
    pub providers: Vec<String>,
    /// Fixed vector dimensionality enforced store-wide.
    pub dims: usize,
    #[serde(default)]
    pub openai: Option<OpenAiConfig>,
    #[serde(default)]
    pub ollama: Option<OllamaConfig>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Liveness-probe timeout. Kept short so an explicit provider hint
    /// cannot stall a request.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    /// Circuit-breaker cooldown after a provider failure.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    /// Embedding cache capacity, in entries. Eviction is LRU.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OpenAiConfig {
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_openai_url")]
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OllamaConfig {
    pub model: String,
    #[serde(default = "default_ollama_url")]
    pub url: String,
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_probe_timeout_secs() -> u64 {
    1
}
fn default_cooldown_secs() -> u64 {
    300
}
fn default_cache_capacity() -> usize {
    100
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_openai_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.chunking.plain_target == 0 || config.chunking.structured_target == 0 {
        anyhow::bail!("chunking targets must be > 0");
    }
    if config.chunking.plain_overlap >= config.chunking.plain_target
        || config.chunking.structured_overlap >= config.chunking.structured_target
    {
        anyhow::bail!("chunking overlap must be smaller than the target size");
    }

    if config.retrieval.scan_cap < 1 {
        anyhow::bail!("retrieval.scan_cap must be >= 1");
    }
    if config.retrieval.final_limit < 1 {
        anyhow::bail!("retrieval.final_limit must be >= 1");
    }
    if config.retrieval.hint_overfetch < 1 {
        anyhow::bail!("retrieval.hint_overfetch must be >= 1");
    }

    if config.embedding.dims == 0 {
        anyhow::bail!("embedding.dims must be > 0");
    }
    if config.embedding.providers.is_empty() {
        anyhow::bail!("embedding.providers must list at least one provider");
    }
    for name in &config.embedding.providers {
        match name.as_str() {
            "openai" => {
                if config.embedding.openai.is_none() {
                    anyhow::bail!("embedding.providers lists 'openai' but [embedding.openai] is missing");
                }
            }
            "ollama" => {
                if config.embedding.ollama.is_none() {
                    anyhow::bail!("embedding.providers lists 'ollama' but [embedding.ollama] is missing");
                }
            }
            other => anyhow::bail!("Unknown embedding provider: '{}'. Must be openai or ollama.", other),
        }
    }
    if config.embedding.cache_capacity == 0 {
        anyhow::bail!("embedding.cache_capacity must be >= 1");
    }

    Ok(())
}
