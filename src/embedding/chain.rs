//! Ordered embedding-provider fallback chain.
//!
//! [`ProviderChain`] wraps N [`EmbeddingProvider`] backends behind one
//! `embed` entry point:
//!
//! - An explicit provider hint is honored only if a short liveness probe of
//!   that provider succeeds; otherwise the chain falls through the
//!   default-priority order (the configuration order of the providers).
//! - A provider whose embed call fails is marked unavailable for a cooldown
//!   window and skipped without re-probing while the window lasts. The mark
//!   expires on its own; a success clears it immediately.
//! - Results are cached per `(provider, text)` in a bounded LRU map, so a
//!   repeated request returns the identical vector without a network call.
//! - A vector whose length differs from the configured dimensionality is
//!   rejected outright; it never falls through to another provider and
//!   never reaches the store.
//!
//! The cache and the breaker timestamps are the only shared mutable state
//! in the crate. Both sit behind one mutex that is never held across an
//! await point; concurrent inserts are last-writer-wins, which is sound
//! because entries are immutable once cached.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::EmbeddingConfig;
use crate::embedding::{EmbeddingProvider, OllamaProvider, OpenAiProvider};
use crate::error::{Error, Result};

/// Bounded `(provider, text) → vector` cache with LRU eviction.
struct EmbeddingCache {
    capacity: usize,
    entries: HashMap<(String, String), CacheEntry>,
    clock: u64,
}

struct CacheEntry {
    vector: Vec<f32>,
    last_used: u64,
}

impl EmbeddingCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            clock: 0,
        }
    }

    fn get(&mut self, provider: &str, text: &str) -> Option<Vec<f32>> {
        self.clock += 1;
        let clock = self.clock;
        let entry = self
            .entries
            .get_mut(&(provider.to_string(), text.to_string()))?;
        entry.last_used = clock;
        Some(entry.vector.clone())
    }

    fn insert(&mut self, provider: &str, text: &str, vector: Vec<f32>) {
        self.clock += 1;
        if self.entries.len() >= self.capacity
            && !self
                .entries
                .contains_key(&(provider.to_string(), text.to_string()))
        {
            // Evict the least-recently-used entry.
            if let Some(key) = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone())
            {
                self.entries.remove(&key);
            }
        }
        self.entries.insert(
            (provider.to_string(), text.to_string()),
            CacheEntry {
                vector,
                last_used: self.clock,
            },
        );
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Circuit-breaker and cache state shared across in-flight requests.
struct ChainState {
    cache: EmbeddingCache,
    /// Provider id → instant until which the provider is skipped.
    tripped: HashMap<String, Instant>,
}

/// Ordered fallback chain over embedding providers.
pub struct ProviderChain {
    providers: Vec<Arc<dyn EmbeddingProvider>>,
    dims: usize,
    cooldown: Duration,
    state: Mutex<ChainState>,
}

impl ProviderChain {
    /// Compose an explicit provider list. The list order is the default
    /// priority order.
    pub fn new(
        providers: Vec<Arc<dyn EmbeddingProvider>>,
        dims: usize,
        cooldown: Duration,
        cache_capacity: usize,
    ) -> Result<Self> {
        if providers.is_empty() {
            return Err(Error::Configuration(
                "embedding chain requires at least one provider".to_string(),
            ));
        }
        Ok(Self {
            providers,
            dims,
            cooldown,
            state: Mutex::new(ChainState {
                cache: EmbeddingCache::new(cache_capacity),
                tripped: HashMap::new(),
            }),
        })
    }

    /// Build the chain from configuration, constructing each listed
    /// provider. Missing credentials or endpoints fail here, not at call
    /// time.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let mut providers: Vec<Arc<dyn EmbeddingProvider>> = Vec::new();
        for name in &config.providers {
            match name.as_str() {
                "openai" => {
                    let openai = config.openai.as_ref().ok_or_else(|| {
                        Error::Configuration("[embedding.openai] is missing".to_string())
                    })?;
                    providers.push(Arc::new(OpenAiProvider::new(openai, config)?));
                }
                "ollama" => {
                    let ollama = config.ollama.as_ref().ok_or_else(|| {
                        Error::Configuration("[embedding.ollama] is missing".to_string())
                    })?;
                    providers.push(Arc::new(OllamaProvider::new(ollama, config)?));
                }
                other => {
                    return Err(Error::Configuration(format!(
                        "unknown embedding provider: '{other}'"
                    )))
                }
            }
        }
        Self::new(
            providers,
            config.dims,
            Duration::from_secs(config.cooldown_secs),
            config.cache_capacity,
        )
    }

    /// Fixed dimensionality every returned vector must have.
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Embed one text, walking the provider order until a provider
    /// succeeds.
    ///
    /// Returns [`Error::ProviderUnavailable`] once every provider has been
    /// tried, and [`Error::DimensionMismatch`] immediately if a provider
    /// returns a vector of the wrong length.
    pub async fn embed(&self, text: &str, provider_hint: Option<&str>) -> Result<Vec<f32>> {
        let order = self.attempt_order(provider_hint).await;
        let mut failures: Vec<String> = Vec::new();

        for provider in order {
            let id = provider.id().to_string();

            if self.is_tripped(&id) {
                debug!(provider = %id, "skipping provider in cooldown");
                failures.push(format!("{id}: skipped (circuit open)"));
                continue;
            }

            if let Some(vector) = self.cache_get(&id, text) {
                debug!(provider = %id, "embedding cache hit");
                return Ok(vector);
            }

            match provider.embed_batch(&[text.to_string()]).await {
                Ok(mut vectors) => {
                    if vectors.is_empty() {
                        warn!(provider = %id, "provider returned no vectors");
                        self.trip(&id);
                        failures.push(format!("{id}: empty response"));
                        continue;
                    }
                    let vector = vectors.swap_remove(0);
                    if vector.len() != self.dims {
                        return Err(Error::DimensionMismatch {
                            provider: id,
                            expected: self.dims,
                            actual: vector.len(),
                        });
                    }
                    self.clear_trip(&id);
                    self.cache_insert(&id, text, vector.clone());
                    return Ok(vector);
                }
                Err(e) => {
                    warn!(provider = %id, error = %e, "embed call failed, opening circuit");
                    self.trip(&id);
                    failures.push(format!("{id}: {e}"));
                }
            }
        }

        Err(Error::ProviderUnavailable {
            summary: failures.join("; "),
        })
    }

    /// Resolve the attempt order for one request.
    ///
    /// The hinted provider moves to the front only when its liveness probe
    /// answers in time; a tripped hint is not probed at all.
    async fn attempt_order(&self, hint: Option<&str>) -> Vec<Arc<dyn EmbeddingProvider>> {
        let mut order: Vec<Arc<dyn EmbeddingProvider>> = self.providers.clone();

        if let Some(hint) = hint {
            if let Some(pos) = order.iter().position(|p| p.id() == hint) {
                if !self.is_tripped(hint) && order[pos].probe().await {
                    let preferred = order.remove(pos);
                    order.insert(0, preferred);
                } else {
                    debug!(provider = %hint, "hint ignored: probe failed or circuit open");
                }
            }
        }

        order
    }

    fn is_tripped(&self, id: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        match state.tripped.get(id) {
            Some(until) if Instant::now() < *until => true,
            Some(_) => {
                // Cooldown elapsed; the breaker resets on its own.
                state.tripped.remove(id);
                false
            }
            None => false,
        }
    }

    fn trip(&self, id: &str) {
        let until = Instant::now() + self.cooldown;
        self.state
            .lock()
            .unwrap()
            .tripped
            .insert(id.to_string(), until);
    }

    fn clear_trip(&self, id: &str) {
        self.state.lock().unwrap().tripped.remove(id);
    }

    fn cache_get(&self, id: &str, text: &str) -> Option<Vec<f32>> {
        self.state.lock().unwrap().cache.get(id, text)
    }

    fn cache_insert(&self, id: &str, text: &str, vector: Vec<f32>) {
        self.state.lock().unwrap().cache.insert(id, text, vector);
    }

    #[cfg(test)]
    fn cache_len(&self) -> usize {
        self.state.lock().unwrap().cache.len()
    }
}
