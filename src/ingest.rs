//! Ingestion pipeline orchestration.
//!
//! [`DocumentStore`] owns the full ingest flow: content-hash dedup →
//! chunking → embedding (in chunk-index order) → one atomic store write.
//! Ingestion is idempotent: re-ingesting unchanged content is a no-op, and
//! identical content under a second name is skipped rather than reprocessed.
//!
//! All embeddings for a document are computed before the store transaction
//! opens, so a failure (or a caller dropping the future) mid-embedding
//! leaves the previous document generation fully intact.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use crate::chunking;
use crate::config::ChunkingConfig;
use crate::embedding::chain::ProviderChain;
use crate::error::{Error, Result};
use crate::models::{Chunk, Document, IndexStats, IngestOutcome, Metadata};
use crate::store::Store;

/// Metadata key carrying the caller's content-type hint.
pub const CONTENT_TYPE_KEY: &str = "content_type";

pub struct DocumentStore {
    store: Arc<dyn Store>,
    chain: Arc<ProviderChain>,
    chunking: ChunkingConfig,
}

impl DocumentStore {
    pub fn new(store: Arc<dyn Store>, chain: Arc<ProviderChain>, chunking: ChunkingConfig) -> Self {
        Self {
            store,
            chain,
            chunking,
        }
    }

    /// Ingest one document.
    ///
    /// Returns [`IngestOutcome::Skipped`] when the content already exists
    /// (same name and hash, or same hash under another name),
    /// [`IngestOutcome::Created`] for a new document, and
    /// [`IngestOutcome::Updated`] when an existing document's content
    /// changed and all of its chunks were atomically replaced.
    pub async fn ingest(
        &self,
        name: &str,
        content: &str,
        metadata: Metadata,
    ) -> Result<IngestOutcome> {
        let content_hash = sha256_hex(content);
        let doc_id = sha256_hex(name);

        // Duplicate content stored under a different name is not
        // reprocessed.
        if let Some(existing_id) = self.store.find_document_id_by_hash(&content_hash).await? {
            if existing_id != doc_id {
                debug!(name, "skipping ingest: identical content already stored");
                return Ok(IngestOutcome::Skipped);
            }
            // Same document, unchanged content.
            return Ok(IngestOutcome::Skipped);
        }

        let existing = self.store.get_document(&doc_id).await?;
        let outcome = match &existing {
            None => IngestOutcome::Created,
            Some(doc) if doc.content_hash == content_hash => return Ok(IngestOutcome::Skipped),
            Some(_) => IngestOutcome::Updated,
        };

        let structured = is_structured(name, &metadata);
        let texts = chunking::split(content, structured, &self.chunking);
        if texts.is_empty() {
            return Err(Error::IngestionIntegrity {
                name: name.to_string(),
                reason: "chunking produced no chunks".to_string(),
            });
        }
        debug!(name, chunks = texts.len(), structured, "document chunked");

        // Embed in index order; nothing is written until every chunk has a
        // vector, so embedding[i] always lands on chunk[i] and a failed or
        // cancelled ingest cannot commit a partial generation.
        let mut chunks = Vec::with_capacity(texts.len());
        for (index, text) in texts.iter().enumerate() {
            let embedding = self.chain.embed(text, None).await?;
            chunks.push(Chunk {
                id: chunk_id(&doc_id, index as i64),
                document_id: doc_id.clone(),
                content: text.clone(),
                index: index as i64,
                size: text.len(),
                embedding,
                metadata: Metadata::new(),
            });
        }

        let document = Document {
            id: doc_id,
            name: name.to_string(),
            content_hash,
            content: content.to_string(),
            size: content.len(),
            uploaded_at: chrono::Utc::now().timestamp(),
            metadata,
        };

        self.store.write_document(&document, &chunks).await?;
        info!(name, chunks = chunks.len(), outcome = ?outcome, "document ingested");
        Ok(outcome)
    }

    /// Fetch a document by name (without chunks).
    pub async fn get_document(&self, name: &str) -> Result<Option<Document>> {
        self.store.get_document(&sha256_hex(name)).await
    }

    pub async fn statistics(&self) -> Result<IndexStats> {
        self.store.stats().await
    }

    /// Delete every document and chunk. Destructive, idempotent.
    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await
    }
}

/// Deterministic document id: hex SHA-256 of the name.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Deterministic chunk id derived from the owning document and ordinal.
pub fn chunk_id(document_id: &str, index: i64) -> String {
    Uuid::new_v5(
        &Uuid::NAMESPACE_OID,
        format!("{document_id}/{index}").as_bytes(),
    )
    .to_string()
}

/// A document is chunked with the structure-aware strategy when the caller
/// says so via metadata or the name carries a markdown extension.
fn is_structured(name: &str, metadata: &Metadata) -> bool {
    if let Some(content_type) = metadata.get(CONTENT_TYPE_KEY) {
        return content_type.contains("markdown");
    }
    let lower = name.to_lowercase();
    lower.ends_with(".md") || lower.ends_with(".markdown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_ids_are_deterministic() {
        assert_eq!(sha256_hex("stride-mapping.md"), sha256_hex("stride-mapping.md"));
        assert_ne!(sha256_hex("a"), sha256_hex("b"));
    }

    #[test]
    fn chunk_ids_are_deterministic_and_distinct() {
        let doc = sha256_hex("doc");
        assert_eq!(chunk_id(&doc, 0), chunk_id(&doc, 0));
        assert_ne!(chunk_id(&doc, 0), chunk_id(&doc, 1));
        assert_ne!(chunk_id(&doc, 0), chunk_id(&sha256_hex("other"), 0));
    }

    #[test]
    fn structured_detection() {
        let mut metadata = Metadata::new();
        assert!(is_structured("guide.md", &metadata));
        assert!(is_structured("GUIDE.MD", &metadata));
        assert!(!is_structured("notes.txt", &metadata));

        metadata.insert(CONTENT_TYPE_KEY.to_string(), "text/markdown".to_string());
        assert!(is_structured("notes.txt", &metadata));

        metadata.insert(CONTENT_TYPE_KEY.to_string(), "text/plain".to_string());
        assert!(!is_structured("guide.md", &metadata));
    }
}
