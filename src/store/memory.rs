//! In-memory [`Store`] implementation for tests.
//!
//! Uses `HashMap` and `Vec` behind a single `std::sync::RwLock`, so a
//! document replace happens under one write lock and is atomic with respect
//! to concurrent readers. Vector search is brute-force cosine similarity
//! over all stored chunks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::error::{Error, Result};
use crate::models::{Chunk, Document, IndexStats, SearchHit};
use crate::store::Store;

struct Inner {
    docs: HashMap<String, Document>,
    /// Insertion-ordered, replaced wholesale per document.
    chunks: Vec<Chunk>,
}

pub struct InMemoryStore {
    inner: RwLock<Inner>,
    dims: usize,
    index_available: AtomicBool,
}

impl InMemoryStore {
    pub fn new(dims: usize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                docs: HashMap::new(),
                chunks: Vec::new(),
            }),
            dims,
            index_available: AtomicBool::new(true),
        }
    }

    /// Simulate loss of the native vector index, forcing callers onto the
    /// brute-force fallback path.
    pub fn set_index_available(&self, available: bool) {
        self.index_available.store(available, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for InMemoryStore {
    fn dims(&self) -> usize {
        self.dims
    }

    async fn find_document_id_by_hash(&self, content_hash: &str) -> Result<Option<String>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .docs
            .values()
            .find(|d| d.content_hash == content_hash)
            .map(|d| d.id.clone()))
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.docs.get(id).cloned())
    }

    async fn write_document(&self, doc: &Document, chunks: &[Chunk]) -> Result<()> {
        for chunk in chunks {
            if chunk.embedding.len() != self.dims {
                return Err(Error::DimensionMismatch {
                    provider: format!("store (document '{}')", doc.name),
                    expected: self.dims,
                    actual: chunk.embedding.len(),
                });
            }
        }

        let mut inner = self.inner.write().unwrap();
        inner.chunks.retain(|c| c.document_id != doc.id);
        inner.chunks.extend_from_slice(chunks);
        inner.docs.insert(doc.id.clone(), doc.clone());
        Ok(())
    }

    async fn vector_search(&self, query: &[f32], k: i64) -> Result<Vec<SearchHit>> {
        if !self.index_available.load(Ordering::SeqCst) {
            return Err(Error::IndexUnavailable(anyhow::anyhow!(
                "vector index offline"
            )));
        }

        let inner = self.inner.read().unwrap();
        let mut hits: Vec<SearchHit> = inner
            .chunks
            .iter()
            .filter_map(|chunk| {
                let document = inner.docs.get(&chunk.document_id)?;
                Some(SearchHit {
                    chunk: chunk.clone(),
                    document: document.clone(),
                    score: cosine_similarity(query, &chunk.embedding) as f64,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k.max(0) as usize);
        Ok(hits)
    }

    async fn scan_chunks(&self, cap: i64) -> Result<Vec<(Chunk, Document)>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .chunks
            .iter()
            .take(cap.max(0) as usize)
            .filter_map(|chunk| {
                let document = inner.docs.get(&chunk.document_id)?;
                Some((chunk.clone(), document.clone()))
            })
            .collect())
    }

    async fn stats(&self) -> Result<IndexStats> {
        let inner = self.inner.read().unwrap();
        Ok(IndexStats {
            total_documents: inner.docs.len() as u64,
            total_chunks: inner.chunks.len() as u64,
        })
    }

    async fn clear(&self) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.docs.clear();
        inner.chunks.clear();
        Ok(())
    }
}
