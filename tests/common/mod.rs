//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use threatlens::config::{ChunkingConfig, RetrievalConfig};
use threatlens::embedding::chain::ProviderChain;
use threatlens::embedding::EmbeddingProvider;

pub const DIMS: usize = 3;

/// Deterministic vocabulary-based embedder: the vector depends on which
/// marker word the text contains, so tests can steer similarity exactly.
pub struct VocabProvider {
    id: String,
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl VocabProvider {
    pub fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    pub fn vector_for(text: &str) -> Vec<f32> {
        if text.contains("alpha") {
            vec![1.0, 0.0, 0.0]
        } else if text.contains("beta") {
            vec![0.0, 1.0, 0.0]
        } else if text.contains("gamma") {
            vec![0.0, 0.0, 1.0]
        } else {
            vec![0.577, 0.577, 0.577]
        }
    }
}

#[async_trait]
impl EmbeddingProvider for VocabProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn probe(&self) -> bool {
        !self.fail.load(Ordering::SeqCst)
    }

    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("provider forced down");
        }
        Ok(texts.iter().map(|t| Self::vector_for(t)).collect())
    }
}

/// Provider that always returns vectors of the wrong length.
pub struct WrongDimsProvider;

#[async_trait]
impl EmbeddingProvider for WrongDimsProvider {
    fn id(&self) -> &str {
        "wrongdims"
    }

    async fn probe(&self) -> bool {
        true
    }

    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
    }
}

pub fn chain_with(providers: Vec<Arc<dyn EmbeddingProvider>>) -> Arc<ProviderChain> {
    Arc::new(ProviderChain::new(providers, DIMS, Duration::from_secs(300), 64).unwrap())
}

pub fn vocab_chain() -> (Arc<VocabProvider>, Arc<ProviderChain>) {
    let provider = VocabProvider::new("vocab");
    let chain = chain_with(vec![provider.clone()]);
    (provider, chain)
}

/// Tiny chunk target with no overlap, so marker-word paragraphs map to one
/// chunk each.
pub fn tiny_chunking() -> ChunkingConfig {
    ChunkingConfig {
        plain_target: 20,
        plain_overlap: 0,
        structured_target: 40,
        structured_overlap: 0,
    }
}

pub fn retrieval() -> RetrievalConfig {
    RetrievalConfig::default()
}

/// Three paragraphs, one marker word each; chunks to exactly three chunks
/// under [`tiny_chunking`].
pub fn three_part_content() -> &'static str {
    "alpha alpha alpha\n\nbeta beta beta\n\ngamma gamma gamma"
}
