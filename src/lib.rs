//! # Threatlens
//!
//! The RAG indexing and retrieval core of an AI-assisted threat-modeling
//! tool. Reference documents are chunked, embedded through an ordered chain
//! of providers, and persisted in a vector-indexed store; similarity search
//! degrades gracefully when providers or the index are unavailable.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌───────────────┐   ┌──────────┐
//! │  caller  │──▶│ Document  │──▶│ ChunkingEngine │──▶│  SQLite   │
//! │ (upload) │   │  Store    │   │ ProviderChain │   │  + index  │
//! └──────────┘   └───────────┘   └───────────────┘   └────┬─────┘
//!                                                        │
//! ┌──────────┐   ┌───────────┐   ┌───────────────┐       │
//! │  caller  │──▶│  Context  │──▶│ HybridSearch  │◀──────┘
//! │ (agent)  │   │ Assembler │   │    Engine     │
//! └──────────┘   └───────────┘   └───────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use threatlens::{
//!     config, context::ContextAssembler, db, embedding::chain::ProviderChain,
//!     ingest::DocumentStore, migrate, models::Metadata, search::HybridSearchEngine,
//!     store::sqlite::SqliteStore,
//! };
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = config::load_config(std::path::Path::new("threatlens.toml"))?;
//!
//! let pool = db::connect(&config.db).await?;
//! migrate::run_migrations(&pool).await?;
//!
//! let store = Arc::new(SqliteStore::new(pool, config.embedding.dims));
//! let chain = Arc::new(ProviderChain::from_config(&config.embedding)?);
//!
//! let documents = DocumentStore::new(store.clone(), chain.clone(), config.chunking.clone());
//! let engine = HybridSearchEngine::new(store, chain, config.retrieval.clone());
//! let assembler = ContextAssembler::new(engine, config.retrieval.clone());
//!
//! documents.ingest("capec-mapping.md", "# CAPEC\n...", Metadata::new()).await?;
//! let bundle = assembler.search_context("spoofing of login", 5, Some("payments")).await?;
//! println!("{}", bundle.context);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`chunking`] | Text chunking strategies |
//! | [`embedding`] | Embedding providers and the fallback chain |
//! | [`store`] | Storage abstraction (SQLite, in-memory) |
//! | [`ingest`] | Idempotent document ingestion |
//! | [`search`] | Similarity search with degraded fallback |
//! | [`context`] | Retrieval-context assembly |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |

pub mod chunking;
pub mod config;
pub mod context;
pub mod db;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod search;
pub mod store;

pub use error::{Error, Result};
pub use models::{
    Chunk, ContextBundle, ContextSource, Document, IndexStats, IngestOutcome, Metadata, SearchHit,
};
