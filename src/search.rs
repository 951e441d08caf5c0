//! Similarity search with graceful degradation.
//!
//! [`HybridSearchEngine`] first queries the store's native vector index;
//! when that query fails or the index is missing, it degrades to a bounded
//! brute-force scan: fetch up to `retrieval.scan_cap` chunks from the
//! store, compute cosine similarity in-process, sort, truncate.
//!
//! The degraded path only scores the first `scan_cap` chunks the store
//! returns, not the full corpus, so on large corpora it trades recall for
//! bounded latency. The cap is configuration, not a constant. Given
//! identical embeddings, both paths produce the same rank order; ties are
//! broken by retrieval order (stable sort).

use std::sync::Arc;

use tracing::warn;

use crate::config::RetrievalConfig;
use crate::embedding::chain::ProviderChain;
use crate::embedding::cosine_similarity;
use crate::error::Result;
use crate::models::SearchHit;
use crate::store::Store;

pub struct HybridSearchEngine {
    store: Arc<dyn Store>,
    chain: Arc<ProviderChain>,
    retrieval: RetrievalConfig,
}

impl HybridSearchEngine {
    pub fn new(
        store: Arc<dyn Store>,
        chain: Arc<ProviderChain>,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            chain,
            retrieval,
        }
    }

    /// Embed `query` through the provider chain, then run [`search`](Self::search).
    pub async fn search_text(
        &self,
        query: &str,
        k: i64,
        provider_hint: Option<&str>,
    ) -> Result<Vec<SearchHit>> {
        let query_vec = self.chain.embed(query, provider_hint).await?;
        self.search(&query_vec, k).await
    }

    /// Top-`k` chunks by descending cosine similarity.
    ///
    /// Index failures are recovered locally via the brute-force fallback;
    /// only total store loss surfaces to the caller.
    pub async fn search(&self, query_vec: &[f32], k: i64) -> Result<Vec<SearchHit>> {
        match self.store.vector_search(query_vec, k).await {
            Ok(hits) => Ok(hits),
            Err(e) => {
                warn!(error = %e, cap = self.retrieval.scan_cap, "vector index query failed, degrading to bounded scan");
                self.brute_force(query_vec, k).await
            }
        }
    }

    /// Degraded path: score at most `scan_cap` candidates in-process.
    async fn brute_force(&self, query_vec: &[f32], k: i64) -> Result<Vec<SearchHit>> {
        let candidates = self.store.scan_chunks(self.retrieval.scan_cap).await?;

        let mut hits: Vec<SearchHit> = candidates
            .into_iter()
            .map(|(chunk, document)| {
                let score = cosine_similarity(query_vec, &chunk.embedding) as f64;
                SearchHit {
                    chunk,
                    document,
                    score,
                }
            })
            .collect();

        // Stable: equal scores keep store retrieval order.
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k.max(0) as usize);
        Ok(hits)
    }
}
