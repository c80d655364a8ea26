//! Query engine: exact-ID, ANN, BM25 and hybrid retrieval.
//!
//! The engine works entirely through the [`VectorStore`] and [`Embedder`]
//! traits. Every precondition (missing embedder, empty text, zero top-k)
//! is checked before any call leaves the process.
//!
//! # Hybrid
//!
//! 1. Embed the query text.
//! 2. Send the ANN and BM25 queries together via
//!    [`VectorStore::multi_query`], each with the same `top_k`.
//! 3. Fuse both lists with [`reciprocal_rank_fusion`].
//!
//! The fused list may hold up to `2 * top_k` items; it is not truncated so
//! callers see every candidate either strategy produced.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embedding::{embed_query, Embedder};
use crate::error::{Error, Result};
use crate::fusion::{reciprocal_rank_fusion, DEFAULT_RRF_K};
use crate::models::QueryResult;
use crate::store::{StoreQuery, VectorStore};

/// Default number of results per strategy.
pub const DEFAULT_TOP_K: usize = 5;

/// Default attribute ranked by BM25.
pub const DEFAULT_TEXT_FIELD: &str = "text";

/// Ranking strategy for a text search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMethod {
    /// Approximate nearest neighbours over the query embedding.
    #[default]
    Vector,
    /// Lexical BM25 over a text attribute.
    Bm25,
    /// Vector and BM25, fused with RRF.
    Hybrid,
}

impl SearchMethod {
    pub fn needs_embedder(self) -> bool {
        matches!(self, SearchMethod::Vector | SearchMethod::Hybrid)
    }
}

impl FromStr for SearchMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "vector" => Ok(SearchMethod::Vector),
            "bm25" => Ok(SearchMethod::Bm25),
            "hybrid" => Ok(SearchMethod::Hybrid),
            other => Err(Error::precondition(format!(
                "unknown search method '{}' (expected vector, bm25 or hybrid)",
                other
            ))),
        }
    }
}

impl fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SearchMethod::Vector => "vector",
            SearchMethod::Bm25 => "bm25",
            SearchMethod::Hybrid => "hybrid",
        })
    }
}

/// One query. The two modes are mutually exclusive.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryRequest {
    ById {
        id: String,
    },
    Search {
        text: String,
        method: SearchMethod,
        top_k: usize,
    },
}

/// The three lists a hybrid query produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HybridResults {
    pub vector: Vec<QueryResult>,
    pub bm25: Vec<QueryResult>,
    pub fused: Vec<QueryResult>,
}

/// Answer to a [`QueryRequest`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum QueryResponse {
    /// Exact-ID lookup; `None` when the ID does not exist.
    Record { record: Option<QueryResult> },
    /// Single-strategy ranking.
    Ranked { results: Vec<QueryResult> },
    Hybrid(HybridResults),
}

/// Runs queries against one namespace of a [`VectorStore`].
pub struct QueryEngine<'a, S: VectorStore + ?Sized> {
    store: &'a S,
    embedder: Option<&'a dyn Embedder>,
    namespace: String,
    text_field: String,
    rrf_k: u32,
}

impl<'a, S: VectorStore + ?Sized> QueryEngine<'a, S> {
    /// Engine without an embedder: exact-ID and BM25 only.
    pub fn new(store: &'a S, namespace: impl Into<String>) -> Self {
        Self {
            store,
            embedder: None,
            namespace: namespace.into(),
            text_field: DEFAULT_TEXT_FIELD.to_string(),
            rrf_k: DEFAULT_RRF_K,
        }
    }

    pub fn with_embedder(mut self, embedder: &'a dyn Embedder) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_text_field(mut self, field: impl Into<String>) -> Self {
        self.text_field = field.into();
        self
    }

    pub fn with_rrf_k(mut self, k: u32) -> Self {
        self.rrf_k = k;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Dispatch a request to the matching mode.
    pub async fn run(&self, request: &QueryRequest) -> Result<QueryResponse> {
        match request {
            QueryRequest::ById { id } => Ok(QueryResponse::Record {
                record: self.get(id).await?,
            }),
            QueryRequest::Search {
                text,
                method,
                top_k,
            } => match method {
                SearchMethod::Vector => Ok(QueryResponse::Ranked {
                    results: self.vector(text, *top_k).await?,
                }),
                SearchMethod::Bm25 => Ok(QueryResponse::Ranked {
                    results: self.bm25(text, *top_k).await?,
                }),
                SearchMethod::Hybrid => Ok(QueryResponse::Hybrid(self.hybrid(text, *top_k).await?)),
            },
        }
    }

    /// Fetch a single record by exact ID.
    pub async fn get(&self, id: &str) -> Result<Option<QueryResult>> {
        if id.trim().is_empty() {
            return Err(Error::precondition("vector id must not be empty"));
        }
        let mut rows = self
            .send(&StoreQuery::IdEquals { id: id.to_string() })
            .await?;
        rows.truncate(1);
        Ok(rows.pop())
    }

    /// Nearest neighbours of the embedded query text, nearest first.
    pub async fn vector(&self, text: &str, top_k: usize) -> Result<Vec<QueryResult>> {
        let embedder = self.check_search(text, top_k, SearchMethod::Vector)?;
        let vector = self.embed(embedder, text).await?;
        self.send(&StoreQuery::Ann { vector, top_k }).await
    }

    /// BM25 ranking over the configured text field, best first.
    pub async fn bm25(&self, text: &str, top_k: usize) -> Result<Vec<QueryResult>> {
        self.check_search(text, top_k, SearchMethod::Bm25)?;
        self.send(&self.bm25_query(text, top_k)).await
    }

    /// ANN and BM25 in one round trip, fused with RRF.
    pub async fn hybrid(&self, text: &str, top_k: usize) -> Result<HybridResults> {
        let embedder = self.check_search(text, top_k, SearchMethod::Hybrid)?;
        let vector = self.embed(embedder, text).await?;

        let queries = [StoreQuery::Ann { vector, top_k }, self.bm25_query(text, top_k)];
        debug!(namespace = %self.namespace, top_k, "hybrid multi-query");
        let mut lists = self
            .store
            .multi_query(&self.namespace, &queries)
            .await
            .map_err(|e| Error::Query(format!("{:#}", e)))?;
        if lists.len() != 2 {
            return Err(Error::Query(format!(
                "multi-query returned {} result sets for 2 queries",
                lists.len()
            )));
        }
        let bm25 = lists.pop().unwrap_or_default();
        let vector = lists.pop().unwrap_or_default();

        let fused = reciprocal_rank_fusion(&[vector.clone(), bm25.clone()], self.rrf_k);
        Ok(HybridResults {
            vector,
            bm25,
            fused,
        })
    }

    fn bm25_query(&self, text: &str, top_k: usize) -> StoreQuery {
        StoreQuery::Bm25 {
            field: self.text_field.clone(),
            text: text.to_string(),
            top_k,
        }
    }

    fn check_search(
        &self,
        text: &str,
        top_k: usize,
        method: SearchMethod,
    ) -> Result<Option<&'a dyn Embedder>> {
        if text.trim().is_empty() {
            return Err(Error::precondition("search text must not be empty"));
        }
        if top_k == 0 {
            return Err(Error::precondition("top_k must be at least 1"));
        }
        if method.needs_embedder() && self.embedder.is_none() {
            return Err(Error::precondition(format!(
                "{} search requires an embedding provider",
                method
            )));
        }
        Ok(self.embedder)
    }

    async fn embed(&self, embedder: Option<&'a dyn Embedder>, text: &str) -> Result<Vec<f32>> {
        let embedder = embedder
            .ok_or_else(|| Error::precondition("search requires an embedding provider"))?;
        embed_query(embedder, text)
            .await
            .map_err(|e| Error::Query(e.to_string()))
    }

    async fn send(&self, query: &StoreQuery) -> Result<Vec<QueryResult>> {
        debug!(namespace = %self.namespace, kind = query.kind(), "store query");
        self.store
            .query(&self.namespace, query)
            .await
            .map_err(|e| Error::Query(format!("{:#}", e)))
    }
}
