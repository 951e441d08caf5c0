//! SQLite [`Store`] backend.
//!
//! Documents and chunks live in two tables with uniqueness constraints on
//! document `id`, `name`, and `content_hash` (see [`crate::migrate`]).
//! Embeddings are stored as little-endian f32 BLOBs. Atomic replace relies
//! on SQLite transactions: delete-then-insert of a document's chunks and
//! the document upsert share one transaction.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::error::{Error, Result};
use crate::models::{Chunk, Document, IndexStats, Metadata, SearchHit};
use crate::store::Store;

pub struct SqliteStore {
    pool: SqlitePool,
    dims: usize,
}

impl SqliteStore {
    /// Wrap an existing connection pool. The pool is constructed once at
    /// startup (see [`crate::db::connect`]) and shared by reference.
    pub fn new(pool: SqlitePool, dims: usize) -> Self {
        Self { pool, dims }
    }

    fn check_dims(&self, doc: &Document, chunks: &[Chunk]) -> Result<()> {
        for chunk in chunks {
            if chunk.embedding.len() != self.dims {
                return Err(Error::DimensionMismatch {
                    provider: format!("store (document '{}')", doc.name),
                    expected: self.dims,
                    actual: chunk.embedding.len(),
                });
            }
        }
        Ok(())
    }
}

fn metadata_to_json(metadata: &Metadata) -> String {
    serde_json::to_string(metadata).unwrap_or_else(|_| "{}".to_string())
}

fn metadata_from_json(json: &str) -> Metadata {
    serde_json::from_str(json).unwrap_or_default()
}

fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Document {
    Document {
        id: row.get("doc_id"),
        name: row.get("name"),
        content_hash: row.get("content_hash"),
        content: row.get("content"),
        size: row.get::<i64, _>("size") as usize,
        uploaded_at: row.get("uploaded_at"),
        metadata: metadata_from_json(&row.get::<String, _>("metadata_json")),
    }
}

fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> Chunk {
    let blob: Vec<u8> = row.get("embedding");
    Chunk {
        id: row.get("chunk_id"),
        document_id: row.get("document_id"),
        content: row.get("chunk_content"),
        index: row.get("chunk_index"),
        size: row.get::<i64, _>("chunk_size") as usize,
        embedding: blob_to_vec(&blob),
        metadata: metadata_from_json(&row.get::<String, _>("chunk_metadata_json")),
    }
}

const JOINED_COLUMNS: &str = r#"
    c.id AS chunk_id, c.document_id, c.chunk_index, c.content AS chunk_content,
    c.size AS chunk_size, c.embedding, c.metadata_json AS chunk_metadata_json,
    d.id AS doc_id, d.name, d.content_hash, d.content, d.size,
    d.uploaded_at, d.metadata_json
"#;

#[async_trait]
impl Store for SqliteStore {
    fn dims(&self) -> usize {
        self.dims
    }

    async fn find_document_id_by_hash(&self, content_hash: &str) -> Result<Option<String>> {
        let id: Option<String> =
            sqlx::query_scalar("SELECT id FROM documents WHERE content_hash = ?")
                .bind(content_hash)
                .fetch_optional(&self.pool)
                .await?;
        Ok(id)
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query(
            r#"
            SELECT id AS doc_id, name, content_hash, content, size, uploaded_at, metadata_json
            FROM documents WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_document))
    }

    async fn write_document(&self, doc: &Document, chunks: &[Chunk]) -> Result<()> {
        self.check_dims(doc, chunks)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(&doc.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO documents (id, name, content_hash, content, size, uploaded_at, metadata_json)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                content_hash = excluded.content_hash,
                content = excluded.content,
                size = excluded.size,
                uploaded_at = excluded.uploaded_at,
                metadata_json = excluded.metadata_json
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.name)
        .bind(&doc.content_hash)
        .bind(&doc.content)
        .bind(doc.size as i64)
        .bind(doc.uploaded_at)
        .bind(metadata_to_json(&doc.metadata))
        .execute(&mut *tx)
        .await?;

        for chunk in chunks {
            sqlx::query(
                r#"
                INSERT INTO chunks (id, document_id, chunk_index, content, size, embedding, metadata_json)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chunk.id)
            .bind(&chunk.document_id)
            .bind(chunk.index)
            .bind(&chunk.content)
            .bind(chunk.size as i64)
            .bind(vec_to_blob(&chunk.embedding))
            .bind(metadata_to_json(&chunk.metadata))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn vector_search(&self, query: &[f32], k: i64) -> Result<Vec<SearchHit>> {
        let rows = sqlx::query(&format!(
            "SELECT {JOINED_COLUMNS} FROM chunks c JOIN documents d ON d.id = c.document_id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::IndexUnavailable(e.into()))?;

        let mut hits: Vec<SearchHit> = rows
            .iter()
            .map(|row| {
                let chunk = row_to_chunk(row);
                let document = row_to_document(row);
                let score = cosine_similarity(query, &chunk.embedding) as f64;
                SearchHit {
                    chunk,
                    document,
                    score,
                }
            })
            .collect();

        // Stable sort: equal scores keep retrieval order.
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k.max(0) as usize);
        Ok(hits)
    }

    async fn scan_chunks(&self, cap: i64) -> Result<Vec<(Chunk, Document)>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {JOINED_COLUMNS} FROM chunks c
            JOIN documents d ON d.id = c.document_id
            ORDER BY c.document_id, c.chunk_index
            LIMIT ?
            "#
        ))
        .bind(cap)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| (row_to_chunk(row), row_to_document(row)))
            .collect())
    }

    async fn stats(&self) -> Result<IndexStats> {
        let total_documents: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        let total_chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;

        Ok(IndexStats {
            total_documents: total_documents as u64,
            total_chunks: total_chunks as u64,
        })
    }

    async fn clear(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM chunks").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM documents")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}
