//! Retrieval-context assembly.
//!
//! [`ContextAssembler`] turns ranked search hits into a scored,
//! human-readable context bundle for the (out-of-scope) agent/report
//! layer. When the caller supplies a system-context hint, results are
//! over-fetched and filtered to sources that mention the hint or are
//! flagged always-relevant; an unmatched hint silently falls back to the
//! unfiltered top results rather than returning an empty context.

use std::collections::HashSet;

use tracing::debug;

use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::models::{ContextBundle, ContextSource, SearchHit, ALWAYS_RELEVANT_KEY};
use crate::search::HybridSearchEngine;

pub struct ContextAssembler {
    engine: HybridSearchEngine,
    retrieval: RetrievalConfig,
}

impl ContextAssembler {
    pub fn new(engine: HybridSearchEngine, retrieval: RetrievalConfig) -> Self {
        Self { engine, retrieval }
    }

    /// Search and assemble context for a query.
    ///
    /// `system_hint` narrows the sources to those relevant to the system
    /// under analysis; mapping/taxonomy reference documents (marked with
    /// the `always_relevant` metadata key at ingest) always pass the
    /// filter.
    pub async fn search_context(
        &self,
        query: &str,
        k: i64,
        system_hint: Option<&str>,
    ) -> Result<ContextBundle> {
        let fetch = match system_hint {
            Some(_) => k.saturating_mul(self.retrieval.hint_overfetch),
            None => k,
        };

        let hits = self.engine.search_text(query, fetch, None).await?;

        let selected: Vec<SearchHit> = match system_hint {
            Some(hint) => {
                let filtered: Vec<SearchHit> = hits
                    .iter()
                    .filter(|hit| matches_hint(hit, hint))
                    .take(k.max(0) as usize)
                    .cloned()
                    .collect();
                if filtered.is_empty() {
                    // The hint matched nothing; better an unfiltered answer
                    // than none at all.
                    debug!(hint, "system-context hint matched no sources, using unfiltered results");
                    hits.into_iter().take(k.max(0) as usize).collect()
                } else {
                    filtered
                }
            }
            None => hits,
        };

        Ok(assemble(selected))
    }
}

fn matches_hint(hit: &SearchHit, hint: &str) -> bool {
    let hint = hint.to_lowercase();
    if hit
        .document
        .metadata
        .get(ALWAYS_RELEVANT_KEY)
        .is_some_and(|v| v == "true" || v == "1")
    {
        return true;
    }
    hit.document.name.to_lowercase().contains(&hint)
        || hit.document.content.to_lowercase().contains(&hint)
}

/// Concatenate chunk texts in rank order under per-source attribution
/// headers, and score the bundle.
fn assemble(hits: Vec<SearchHit>) -> ContextBundle {
    let mut sections = Vec::with_capacity(hits.len());
    let mut sources = Vec::with_capacity(hits.len());
    let mut documents: HashSet<&str> = HashSet::new();
    let mut score_sum = 0.0;

    for hit in &hits {
        sections.push(format!(
            "=== Source: {} (chunk {}, relevance {:.2}) ===\n{}",
            hit.document.name, hit.chunk.index, hit.score, hit.chunk.content
        ));
        sources.push(ContextSource {
            document_name: hit.document.name.clone(),
            chunk_index: hit.chunk.index,
            score: hit.score,
        });
        documents.insert(hit.document.id.as_str());
        score_sum += hit.score;
    }

    let confidence = if hits.is_empty() {
        0.0
    } else {
        (score_sum / hits.len() as f64 * 100.0).clamp(0.0, 100.0)
    };
    let total_documents = documents.len();

    ContextBundle {
        context: sections.join("\n\n"),
        sources,
        total_documents,
        confidence,
    }
}
