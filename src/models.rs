//! Core data models for the indexing and retrieval pipeline.
//!
//! These types represent the documents, chunks, and search results that flow
//! through ingestion and retrieval.

use std::collections::BTreeMap;

use serde::Serialize;

/// Opaque key/value metadata attached to documents and chunks.
///
/// Stored as JSON in the backing store. `BTreeMap` keeps serialization
/// deterministic.
pub type Metadata = BTreeMap<String, String>;

/// Metadata key marking a document as always-relevant reference material
/// (e.g. attack-pattern mapping or taxonomy documents). Such documents
/// survive the system-context filter in context assembly regardless of
/// whether they mention the hint.
pub const ALWAYS_RELEVANT_KEY: &str = "always_relevant";

/// A reference document stored in the index.
#[derive(Debug, Clone)]
pub struct Document {
    /// Deterministic hex SHA-256 of the document name.
    pub id: String,
    pub name: String,
    /// Hex SHA-256 of the full content. Unique store-wide.
    pub content_hash: String,
    pub content: String,
    /// Content length in bytes.
    pub size: usize,
    /// Unix seconds.
    pub uploaded_at: i64,
    pub metadata: Metadata,
}

/// A bounded slice of a document's text, the unit of embedding and retrieval.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Deterministic UUID derived from `(document_id, index)`.
    pub id: String,
    pub document_id: String,
    pub content: String,
    /// 0-based ordinal. Chunks of one document form a contiguous `0..n-1` range.
    pub index: i64,
    pub size: usize,
    /// Fixed-length embedding vector. All vectors in one store share a dimension.
    pub embedding: Vec<f32>,
    pub metadata: Metadata,
}

/// Outcome of a single [`ingest`](crate::ingest::DocumentStore::ingest) call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestOutcome {
    /// A new document was stored.
    Created,
    /// An existing document was atomically replaced with new content.
    Updated,
    /// Nothing was written: unchanged content, or duplicate content already
    /// stored under another name.
    Skipped,
}

/// A ranked similarity-search result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub chunk: Chunk,
    pub document: Document,
    /// Cosine similarity against the query vector, descending across hits.
    pub score: f64,
}

/// Assembled retrieval context returned to the caller (agent/report layer).
#[derive(Debug, Clone, Serialize)]
pub struct ContextBundle {
    /// Rank-ordered chunk texts with per-source attribution headers.
    pub context: String,
    pub sources: Vec<ContextSource>,
    /// Distinct documents represented in `sources`.
    pub total_documents: usize,
    /// Mean hit score scaled to a 0–100 percentage, capped at 100.
    pub confidence: f64,
}

/// Attribution entry for one hit inside a [`ContextBundle`].
#[derive(Debug, Clone, Serialize)]
pub struct ContextSource {
    pub document_name: String,
    pub chunk_index: i64,
    pub score: f64,
}

/// Store-wide counters reported by `statistics`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub total_documents: u64,
    pub total_chunks: u64,
}
