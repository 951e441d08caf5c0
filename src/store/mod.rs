//! Storage abstraction.
//!
//! The [`Store`] trait defines the persistence and vector-query operations
//! the ingestion and retrieval pipeline needs, enabling pluggable backends
//! (SQLite, in-memory for tests).
//!
//! Implementations must be `Send + Sync` and must make
//! [`write_document`](Store::write_document) atomic: a concurrent reader
//! never observes a document with zero or partial chunks mid-replace.
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`find_document_id_by_hash`](Store::find_document_id_by_hash) | Content-dedup lookup |
//! | [`get_document`](Store::get_document) | Fetch one document by id |
//! | [`write_document`](Store::write_document) | Atomically write one document generation |
//! | [`vector_search`](Store::vector_search) | Native vector-index query |
//! | [`scan_chunks`](Store::scan_chunks) | Bounded candidate fetch for the degraded path |
//! | [`stats`](Store::stats) | Document/chunk counters |
//! | [`clear`](Store::clear) | Destructive, idempotent wipe |

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Chunk, Document, IndexStats, SearchHit};

#[async_trait]
pub trait Store: Send + Sync {
    /// Fixed embedding dimensionality this store accepts.
    fn dims(&self) -> usize;

    /// Return the id of the document holding `content_hash`, if any.
    async fn find_document_id_by_hash(&self, content_hash: &str) -> Result<Option<String>>;

    /// Fetch a document by id, without its chunks.
    async fn get_document(&self, id: &str) -> Result<Option<Document>>;

    /// Atomically persist one generation of a document: upsert the document
    /// record, delete any previous chunks, insert the new ones. Either the
    /// whole generation becomes visible or none of it does.
    async fn write_document(&self, doc: &Document, chunks: &[Chunk]) -> Result<()>;

    /// Query the native vector index for the `k` chunks most similar to
    /// `query`, highest first.
    async fn vector_search(&self, query: &[f32], k: i64) -> Result<Vec<SearchHit>>;

    /// Fetch up to `cap` chunks (with their documents) in storage order, for
    /// the brute-force fallback. Callers score these in-process.
    async fn scan_chunks(&self, cap: i64) -> Result<Vec<(Chunk, Document)>>;

    async fn stats(&self) -> Result<IndexStats>;

    /// Delete all documents and chunks. Idempotent.
    async fn clear(&self) -> Result<()>;
}
