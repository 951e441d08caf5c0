//! Error taxonomy.
//!
//! Recovery policy: provider- and index-level failures are handled locally
//! through the fallback paths in [`embedding::chain`](crate::embedding::chain)
//! and [`search`](crate::search) and only surface once every fallback is
//! exhausted. Ingestion failures always surface, since they affect data
//! integrity.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing credentials/endpoints at provider construction. Not
    /// recoverable at call time.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Every provider in the chain failed for one request.
    #[error("all embedding providers unavailable: {summary}")]
    ProviderUnavailable {
        /// One line per attempted provider, in attempt order.
        summary: String,
    },

    /// A provider returned a vector of the wrong dimensionality. Fatal for
    /// the affected document; nothing is stored.
    #[error("embedding dimension mismatch from '{provider}': expected {expected}, got {actual}")]
    DimensionMismatch {
        provider: String,
        expected: usize,
        actual: usize,
    },

    /// The native vector index could not serve a query. Recoverable: search
    /// falls back to a bounded brute-force scan.
    #[error("vector index unavailable: {0}")]
    IndexUnavailable(#[source] anyhow::Error),

    /// Chunking produced no chunks, or an atomic replace could not complete.
    /// The previous document generation is left untouched.
    #[error("ingestion integrity violation for '{name}': {reason}")]
    IngestionIntegrity { name: String, reason: String },

    /// Backing-store failure (connection loss, constraint violation).
    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::Store(e.into())
    }
}
