//! Vector-store abstraction for docvec.
//!
//! The [`VectorStore`] trait is the only way the migration pipeline and the
//! query engine touch a vector index, so backends are pluggable: the
//! `docvec` app crate ships a Turbopuffer HTTP store and this crate ships
//! [`memory::InMemoryStore`] for tests and embedding in other programs.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod bm25;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{QueryResult, VectorRecord};

/// One ranked or filtered lookup against a namespace.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreQuery {
    /// Exact match on the record ID. At most one row.
    IdEquals { id: String },
    /// Approximate nearest neighbours by vector distance, nearest first.
    Ann { vector: Vec<f32>, top_k: usize },
    /// Okapi BM25 over a text attribute, highest score first.
    Bm25 {
        field: String,
        text: String,
        top_k: usize,
    },
}

impl StoreQuery {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreQuery::IdEquals { .. } => "id",
            StoreQuery::Ann { .. } => "ann",
            StoreQuery::Bm25 { .. } => "bm25",
        }
    }
}

/// Abstract vector index.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert`](VectorStore::upsert) | Insert or overwrite records by ID |
/// | [`query`](VectorStore::query) | Run one ranked or filtered lookup |
/// | [`multi_query`](VectorStore::multi_query) | Run several lookups, results in request order |
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert records, overwriting any existing record with the same ID.
    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<()>;

    /// Run a single query against `namespace`.
    async fn query(&self, namespace: &str, query: &StoreQuery) -> Result<Vec<QueryResult>>;

    /// Run several queries; result `i` answers query `i`.
    ///
    /// The default issues every query concurrently and fails if any fails.
    /// Backends with a native batched endpoint may override it.
    async fn multi_query(
        &self,
        namespace: &str,
        queries: &[StoreQuery],
    ) -> Result<Vec<Vec<QueryResult>>> {
        futures::future::try_join_all(queries.iter().map(|q| self.query(namespace, q))).await
    }
}
