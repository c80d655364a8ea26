//! Query engine tests: exact-ID, ANN, BM25 and hybrid over the in-memory store.

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use docvec_core::embedding::Embedder;
use docvec_core::hash::content_hash;
use docvec_core::models::{ChunkAttributes, QueryResult, VectorRecord};
use docvec_core::query::{QueryEngine, QueryRequest, QueryResponse, SearchMethod};
use docvec_core::store::memory::InMemoryStore;
use docvec_core::store::{StoreQuery, VectorStore};
use docvec_core::Error;

/// Maps known query strings to fixed 2-d vectors.
struct FixedEmbedder {
    calls: AtomicUsize,
}

#[async_trait]
impl Embedder for FixedEmbedder {
    fn model_name(&self) -> &str {
        "fixed"
    }

    fn dims(&self) -> usize {
        2
    }

    async fn embed(&self, texts: &[String]) -> AnyResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| if t.contains("python") { vec![0.0, 1.0] } else { vec![1.0, 0.0] })
            .collect())
    }
}

fn fixed() -> FixedEmbedder {
    FixedEmbedder {
        calls: AtomicUsize::new(0),
    }
}

/// Counts every store call; returns canned lists for ANN and BM25.
struct ScriptedStore {
    ann: Vec<&'static str>,
    bm25: Vec<&'static str>,
    calls: AtomicUsize,
}

fn rows(ids: &[&str]) -> Vec<QueryResult> {
    ids.iter()
        .map(|id| QueryResult {
            id: id.to_string(),
            dist: Some(0.1),
            attributes: ChunkAttributes::default(),
        })
        .collect()
}

#[async_trait]
impl VectorStore for ScriptedStore {
    async fn upsert(&self, _namespace: &str, _records: &[VectorRecord]) -> AnyResult<()> {
        Ok(())
    }

    async fn query(&self, _namespace: &str, query: &StoreQuery) -> AnyResult<Vec<QueryResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(match query {
            StoreQuery::Ann { .. } => rows(&self.ann),
            StoreQuery::Bm25 { .. } => rows(&self.bm25),
            StoreQuery::IdEquals { .. } => Vec::new(),
        })
    }
}

struct DownStore;

#[async_trait]
impl VectorStore for DownStore {
    async fn upsert(&self, _namespace: &str, _records: &[VectorRecord]) -> AnyResult<()> {
        anyhow::bail!("connection refused")
    }

    async fn query(&self, _namespace: &str, _query: &StoreQuery) -> AnyResult<Vec<QueryResult>> {
        anyhow::bail!("connection refused")
    }
}

fn record(id: &str, vector: Vec<f32>, text: &str) -> VectorRecord {
    VectorRecord {
        id: id.to_string(),
        vector,
        attributes: ChunkAttributes {
            text: text.to_string(),
            content_hash: content_hash(text),
            source: "kb.md".to_string(),
            header: None,
            level: 1,
        },
    }
}

async fn seeded() -> InMemoryStore {
    let store = InMemoryStore::new();
    store
        .upsert(
            "kb",
            &[
                record("kb.md_0", vec![1.0, 0.0], "# Rust\nRust ownership rules"),
                record("kb.md_1", vec![0.0, 1.0], "# Python\nPython decorators explained"),
                record("kb.md_2", vec![0.8, 0.2], "# Cargo\nCargo workspaces for Rust"),
            ],
        )
        .await
        .unwrap();
    store
}

fn ids(results: &[QueryResult]) -> Vec<&str> {
    results.iter().map(|r| r.id.as_str()).collect()
}

#[tokio::test]
async fn test_get_by_id() {
    let store = seeded().await;
    let engine = QueryEngine::new(&store, "kb");
    let hit = engine.get("kb.md_1").await.unwrap().unwrap();
    assert_eq!(hit.attributes.source, "kb.md");
    assert_eq!(hit.dist, None);
    assert!(engine.get("kb.md_99").await.unwrap().is_none());
}

#[tokio::test]
async fn test_vector_search_nearest_first() {
    let store = seeded().await;
    let embedder = fixed();
    let engine = QueryEngine::new(&store, "kb").with_embedder(&embedder);
    let hits = engine.vector("rust things", 2).await.unwrap();
    assert_eq!(ids(&hits), vec!["kb.md_0", "kb.md_2"]);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_bm25_needs_no_embedder() {
    let store = seeded().await;
    let engine = QueryEngine::new(&store, "kb");
    let hits = engine.bm25("decorators", 5).await.unwrap();
    assert_eq!(ids(&hits), vec!["kb.md_1"]);
    assert!(hits[0].dist.unwrap() > 0.0);
}

#[tokio::test]
async fn test_bm25_custom_text_field() {
    let store = seeded().await;
    let engine = QueryEngine::new(&store, "kb").with_text_field("source");
    let hits = engine.bm25("kb", 5).await.unwrap();
    assert_eq!(hits.len(), 3);
}

#[tokio::test]
async fn test_hybrid_fuses_both_lists() {
    let store = ScriptedStore {
        ann: vec!["p", "q", "r"],
        bm25: vec!["q", "r", "p"],
        calls: AtomicUsize::new(0),
    };
    let embedder = fixed();
    let engine = QueryEngine::new(&store, "kb").with_embedder(&embedder);
    let results = engine.hybrid("anything", 3).await.unwrap();
    assert_eq!(ids(&results.vector), vec!["p", "q", "r"]);
    assert_eq!(ids(&results.bm25), vec!["q", "r", "p"]);
    assert_eq!(ids(&results.fused), vec!["q", "p", "r"]);
    let q = results.fused[0].dist.unwrap();
    assert!((q - (1.0 / 62.0 + 1.0 / 61.0)).abs() < 1e-12);
    assert_eq!(store.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_hybrid_over_memory_store() {
    let store = seeded().await;
    let embedder = fixed();
    let engine = QueryEngine::new(&store, "kb").with_embedder(&embedder);
    let results = engine.hybrid("rust cargo", 2).await.unwrap();
    assert_eq!(ids(&results.vector), vec!["kb.md_0", "kb.md_2"]);
    assert_eq!(ids(&results.bm25), vec!["kb.md_2", "kb.md_0"]);
    // mirrored ranks tie; the vector list is discovered first
    assert_eq!(ids(&results.fused), vec!["kb.md_0", "kb.md_2"]);
    assert_eq!(results.fused[0].dist, results.fused[1].dist);
}

#[tokio::test]
async fn test_run_dispatches_modes() {
    let store = seeded().await;
    let embedder = fixed();
    let engine = QueryEngine::new(&store, "kb").with_embedder(&embedder);

    let by_id = engine
        .run(&QueryRequest::ById {
            id: "kb.md_0".into(),
        })
        .await
        .unwrap();
    assert!(matches!(by_id, QueryResponse::Record { record: Some(_) }));

    let ranked = engine
        .run(&QueryRequest::Search {
            text: "python".into(),
            method: SearchMethod::Vector,
            top_k: 1,
        })
        .await
        .unwrap();
    match ranked {
        QueryResponse::Ranked { results } => assert_eq!(ids(&results), vec!["kb.md_1"]),
        other => panic!("unexpected response {:?}", other),
    }

    let hybrid = engine
        .run(&QueryRequest::Search {
            text: "python".into(),
            method: SearchMethod::Hybrid,
            top_k: 1,
        })
        .await
        .unwrap();
    assert!(matches!(hybrid, QueryResponse::Hybrid(_)));
}

#[tokio::test]
async fn test_preconditions_make_no_calls() {
    let store = ScriptedStore {
        ann: vec![],
        bm25: vec![],
        calls: AtomicUsize::new(0),
    };
    let embedder = fixed();
    let without = QueryEngine::new(&store, "kb");
    let with = QueryEngine::new(&store, "kb").with_embedder(&embedder);

    assert!(without.vector("rust", 5).await.unwrap_err().is_precondition());
    assert!(without.hybrid("rust", 5).await.unwrap_err().is_precondition());
    assert!(with.bm25("   ", 5).await.unwrap_err().is_precondition());
    assert!(with.vector("rust", 0).await.unwrap_err().is_precondition());
    assert!(with.get("").await.unwrap_err().is_precondition());

    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_store_failure_is_query_error() {
    let engine = QueryEngine::new(&DownStore, "kb");
    let err = engine.bm25("rust", 3).await.unwrap_err();
    match err {
        Error::Query(msg) => assert!(msg.contains("connection refused")),
        other => panic!("expected query error, got {:?}", other),
    }
}
