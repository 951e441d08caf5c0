//! End-to-end pipeline tests over the in-memory store.

mod common;

use std::sync::Arc;

use common::*;
use threatlens::context::ContextAssembler;
use threatlens::error::Error;
use threatlens::ingest::DocumentStore;
use threatlens::models::{IngestOutcome, Metadata, ALWAYS_RELEVANT_KEY};
use threatlens::search::HybridSearchEngine;
use threatlens::store::memory::InMemoryStore;

fn pipeline(
    store: Arc<InMemoryStore>,
    chain: Arc<threatlens::embedding::chain::ProviderChain>,
) -> (DocumentStore, HybridSearchEngine) {
    let documents = DocumentStore::new(store.clone(), chain.clone(), tiny_chunking());
    let engine = HybridSearchEngine::new(store, chain, retrieval());
    (documents, engine)
}

#[tokio::test]
async fn ingest_is_idempotent() {
    let store = Arc::new(InMemoryStore::new(DIMS));
    let (_, chain) = vocab_chain();
    let (documents, _) = pipeline(store.clone(), chain);

    let first = documents
        .ingest("notes.txt", three_part_content(), Metadata::new())
        .await
        .unwrap();
    assert_eq!(first, IngestOutcome::Created);

    let stats_after_first = documents.statistics().await.unwrap();
    assert_eq!(stats_after_first.total_documents, 1);
    assert_eq!(stats_after_first.total_chunks, 3);

    let second = documents
        .ingest("notes.txt", three_part_content(), Metadata::new())
        .await
        .unwrap();
    assert_eq!(second, IngestOutcome::Skipped);

    let stats_after_second = documents.statistics().await.unwrap();
    assert_eq!(stats_after_second, stats_after_first);
}

#[tokio::test]
async fn identical_content_under_second_name_is_skipped() {
    let store = Arc::new(InMemoryStore::new(DIMS));
    let (_, chain) = vocab_chain();
    let (documents, _) = pipeline(store.clone(), chain);

    let first = documents
        .ingest("original.txt", "alpha material", Metadata::new())
        .await
        .unwrap();
    assert_eq!(first, IngestOutcome::Created);

    let second = documents
        .ingest("copy.txt", "alpha material", Metadata::new())
        .await
        .unwrap();
    assert_eq!(second, IngestOutcome::Skipped);

    let stats = documents.statistics().await.unwrap();
    assert_eq!(stats.total_documents, 1);
    assert!(documents.get_document("original.txt").await.unwrap().is_some());
    assert!(documents.get_document("copy.txt").await.unwrap().is_none());
}

#[tokio::test]
async fn update_replaces_all_chunks_exactly_once() {
    let store = Arc::new(InMemoryStore::new(DIMS));
    let (_, chain) = vocab_chain();
    let (documents, engine) = pipeline(store.clone(), chain);

    documents
        .ingest("sys-doc", three_part_content(), Metadata::new())
        .await
        .unwrap();
    assert_eq!(documents.statistics().await.unwrap().total_chunks, 3);

    let outcome = documents
        .ingest("sys-doc", "gamma gamma gamma", Metadata::new())
        .await
        .unwrap();
    assert_eq!(outcome, IngestOutcome::Updated);

    let stats = documents.statistics().await.unwrap();
    assert_eq!(stats.total_documents, 1);
    assert_eq!(stats.total_chunks, 1);

    // The surviving chunks derive only from the new content.
    let doc = documents.get_document("sys-doc").await.unwrap().unwrap();
    assert_eq!(doc.content, "gamma gamma gamma");

    let hits = engine.search_text("alpha", 5, None).await.unwrap();
    assert!(hits.iter().all(|h| !h.chunk.content.contains("alpha")));
}

#[tokio::test]
async fn empty_content_is_an_integrity_error() {
    let store = Arc::new(InMemoryStore::new(DIMS));
    let (_, chain) = vocab_chain();
    let (documents, _) = pipeline(store.clone(), chain);

    let err = documents
        .ingest("empty.txt", "", Metadata::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::IngestionIntegrity { .. }));
    assert_eq!(documents.statistics().await.unwrap().total_documents, 0);
}

#[tokio::test]
async fn provider_exhaustion_surfaces_and_writes_nothing() {
    let store = Arc::new(InMemoryStore::new(DIMS));
    let provider = VocabProvider::new("only");
    provider.set_failing(true);
    let chain = chain_with(vec![provider]);
    let (documents, _) = pipeline(store.clone(), chain);

    let err = documents
        .ingest("doc.txt", "alpha", Metadata::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ProviderUnavailable { .. }));
    assert_eq!(documents.statistics().await.unwrap().total_documents, 0);
}

#[tokio::test]
async fn provider_fallback_still_ingests() {
    let store = Arc::new(InMemoryStore::new(DIMS));
    let primary = VocabProvider::new("primary");
    primary.set_failing(true);
    let secondary = VocabProvider::new("secondary");
    let chain = chain_with(vec![primary.clone(), secondary.clone()]);
    let (documents, _) = pipeline(store.clone(), chain);

    let outcome = documents
        .ingest("doc.txt", "alpha", Metadata::new())
        .await
        .unwrap();
    assert_eq!(outcome, IngestOutcome::Created);
    assert_eq!(primary.calls(), 1);
    assert_eq!(secondary.calls(), 1);

    // Within the cooldown window the failed provider is skipped outright.
    documents
        .ingest("other.txt", "beta", Metadata::new())
        .await
        .unwrap();
    assert_eq!(primary.calls(), 1);
    assert_eq!(secondary.calls(), 2);
}

#[tokio::test]
async fn wrong_dimensionality_rejects_the_document() {
    let store = Arc::new(InMemoryStore::new(DIMS));
    let chain = chain_with(vec![Arc::new(WrongDimsProvider)]);
    let (documents, _) = pipeline(store.clone(), chain);

    let err = documents
        .ingest("doc.txt", "alpha", Metadata::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { .. }));
    assert_eq!(documents.statistics().await.unwrap().total_documents, 0);
}

#[tokio::test]
async fn search_returns_the_nearest_chunk() {
    let store = Arc::new(InMemoryStore::new(DIMS));
    let (_, chain) = vocab_chain();
    let (documents, engine) = pipeline(store.clone(), chain);

    documents
        .ingest("A", three_part_content(), Metadata::new())
        .await
        .unwrap();

    // The query embeds nearest the second chunk's vector.
    let hits = engine.search_text("beta", 1, None).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].chunk.content.contains("beta"));
    assert_eq!(hits[0].chunk.index, 1);
    assert_eq!(hits[0].document.name, "A");
    assert!((hits[0].score - 1.0).abs() < 1e-6);
}

#[tokio::test]
async fn degraded_scan_matches_native_rank_order() {
    let store = Arc::new(InMemoryStore::new(DIMS));
    let (_, chain) = vocab_chain();
    let (documents, engine) = pipeline(store.clone(), chain);

    documents
        .ingest("A", three_part_content(), Metadata::new())
        .await
        .unwrap();
    documents
        .ingest("B", "beta notes\n\nbeta summary", Metadata::new())
        .await
        .unwrap();

    let native = engine.search_text("beta", 5, None).await.unwrap();
    assert!(!native.is_empty());

    store.set_index_available(false);
    let degraded = engine.search_text("beta", 5, None).await.unwrap();

    let native_ids: Vec<&str> = native.iter().map(|h| h.chunk.id.as_str()).collect();
    let degraded_ids: Vec<&str> = degraded.iter().map(|h| h.chunk.id.as_str()).collect();
    assert_eq!(native_ids, degraded_ids);
}

#[tokio::test]
async fn degraded_scan_respects_candidate_cap() {
    let store = Arc::new(InMemoryStore::new(DIMS));
    let (_, chain) = vocab_chain();
    let documents = DocumentStore::new(store.clone(), chain.clone(), tiny_chunking());
    let mut config = retrieval();
    config.scan_cap = 1;
    let engine = HybridSearchEngine::new(store.clone(), chain, config);

    documents
        .ingest("A", three_part_content(), Metadata::new())
        .await
        .unwrap();

    store.set_index_available(false);
    let hits = engine.search_text("gamma", 5, None).await.unwrap();
    // Only the first stored candidate is scanned.
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].chunk.index, 0);
}

#[tokio::test]
async fn unmatched_hint_falls_back_to_unfiltered_results() {
    let store = Arc::new(InMemoryStore::new(DIMS));
    let (_, chain) = vocab_chain();
    let (documents, engine) = pipeline(store.clone(), chain);
    let assembler = ContextAssembler::new(engine, retrieval());

    documents
        .ingest("A", three_part_content(), Metadata::new())
        .await
        .unwrap();

    let bundle = assembler
        .search_context("beta", 5, Some("Bar"))
        .await
        .unwrap();
    assert!(!bundle.sources.is_empty());
    assert!(!bundle.context.is_empty());
    assert_eq!(bundle.total_documents, 1);
}

#[tokio::test]
async fn hint_filters_to_matching_and_always_relevant_sources() {
    let store = Arc::new(InMemoryStore::new(DIMS));
    let (_, chain) = vocab_chain();
    let (documents, engine) = pipeline(store.clone(), chain);
    let assembler = ContextAssembler::new(engine, retrieval());

    documents
        .ingest("payments-design.txt", "beta payments flow", Metadata::new())
        .await
        .unwrap();
    documents
        .ingest("unrelated.txt", "beta misc notes", Metadata::new())
        .await
        .unwrap();
    let mut taxonomy = Metadata::new();
    taxonomy.insert(ALWAYS_RELEVANT_KEY.to_string(), "true".to_string());
    documents
        .ingest("attack-taxonomy.txt", "beta catalogue", taxonomy)
        .await
        .unwrap();

    let bundle = assembler
        .search_context("beta", 3, Some("payments"))
        .await
        .unwrap();

    let names: Vec<&str> = bundle
        .sources
        .iter()
        .map(|s| s.document_name.as_str())
        .collect();
    assert!(names.contains(&"payments-design.txt"));
    assert!(names.contains(&"attack-taxonomy.txt"));
    assert!(!names.contains(&"unrelated.txt"));
}

#[tokio::test]
async fn clear_is_destructive_and_idempotent() {
    let store = Arc::new(InMemoryStore::new(DIMS));
    let (_, chain) = vocab_chain();
    let (documents, engine) = pipeline(store.clone(), chain);

    documents
        .ingest("A", three_part_content(), Metadata::new())
        .await
        .unwrap();
    documents.clear().await.unwrap();

    let stats = documents.statistics().await.unwrap();
    assert_eq!(stats.total_documents, 0);
    assert_eq!(stats.total_chunks, 0);
    assert!(engine.search_text("beta", 5, None).await.unwrap().is_empty());

    // A second clear is a no-op, not an error.
    documents.clear().await.unwrap();
}

#[tokio::test]
async fn concurrent_ingest_of_different_documents() {
    let store = Arc::new(InMemoryStore::new(DIMS));
    let (_, chain) = vocab_chain();
    let documents = Arc::new(DocumentStore::new(
        store.clone(),
        chain,
        tiny_chunking(),
    ));

    let mut handles = Vec::new();
    for i in 0..8 {
        let documents = documents.clone();
        handles.push(tokio::spawn(async move {
            documents
                .ingest(&format!("doc-{i}.txt"), &format!("alpha {i}"), Metadata::new())
                .await
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), IngestOutcome::Created);
    }

    assert_eq!(documents.statistics().await.unwrap().total_documents, 8);
}
