//! Turbopuffer vector store over its v2 HTTP API.
//!
//! | Operation | Request |
//! |-----------|---------|
//! | upsert | `POST /v2/namespaces/{ns}` with `upsert_rows` |
//! | query | `POST /v2/namespaces/{ns}/query` |
//! | multi-query | `POST /v2/namespaces/{ns}/query` with `queries` |
//!
//! Attributes are stored flat beside `id` and `vector`. Upserts declare
//! `text` as full-text searchable so BM25 ranking works on it. Rows come
//! back as `{id, $dist, ...attributes}`.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use docvec_core::models::{ChunkAttributes, QueryResult, VectorRecord, ATTRIBUTE_FIELDS};
use docvec_core::store::{StoreQuery, VectorStore};

use crate::config::{StoreConfig, TURBOPUFFER_API_KEY_ENV};
use crate::http::{build_client, send_json, RetryPolicy};

pub struct TurbopufferStore {
    client: Client,
    api_key: String,
    base_url: String,
    distance_metric: String,
    retry: RetryPolicy,
}

impl TurbopufferStore {
    /// Build from config, reading `TURBOPUFFER_API_KEY` from the environment.
    pub fn from_env(config: &StoreConfig) -> Result<Self> {
        let api_key = std::env::var(TURBOPUFFER_API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow!("{} environment variable not set", TURBOPUFFER_API_KEY_ENV))?;
        Self::new(config, api_key)
    }

    pub fn new(config: &StoreConfig, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            api_key: api_key.into(),
            base_url: config.effective_base_url(),
            distance_metric: config.distance_metric.clone(),
            retry: RetryPolicy::new(config.max_retries),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: for<'de> Deserialize<'de>>(&self, path: &str, body: &Value) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "turbopuffer request");
        send_json(&self.retry, "Turbopuffer", || {
            self.client.post(&url).bearer_auth(&self.api_key).json(body)
        })
        .await
    }
}

#[derive(Serialize)]
struct UpsertRow<'a> {
    id: &'a str,
    vector: &'a [f32],
    #[serde(flatten)]
    attributes: &'a ChunkAttributes,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    rows: Vec<Row>,
}

#[derive(Deserialize)]
struct MultiQueryResponse {
    results: Vec<QueryResponse>,
}

#[derive(Deserialize)]
struct Row {
    id: Value,
    #[serde(rename = "$dist", default)]
    dist: Option<f64>,
    #[serde(flatten)]
    attributes: ChunkAttributes,
}

impl Row {
    fn into_result(self) -> QueryResult {
        let id = match self.id {
            Value::String(s) => s,
            other => other.to_string(),
        };
        QueryResult {
            id,
            dist: self.dist,
            attributes: self.attributes,
        }
    }
}

fn namespace_path(namespace: &str) -> Result<String> {
    if namespace.is_empty()
        || !namespace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        bail!("invalid namespace name: '{}'", namespace);
    }
    Ok(format!("/v2/namespaces/{}", namespace))
}

/// JSON body for one query.
pub fn query_body(query: &StoreQuery) -> Value {
    match query {
        StoreQuery::IdEquals { id } => json!({
            "rank_by": ["id", "asc"],
            "filters": ["id", "Eq", id],
            "top_k": 1,
            "include_attributes": ATTRIBUTE_FIELDS,
        }),
        StoreQuery::Ann { vector, top_k } => json!({
            "rank_by": ["vector", "ANN", vector],
            "top_k": top_k,
            "include_attributes": ATTRIBUTE_FIELDS,
        }),
        StoreQuery::Bm25 { field, text, top_k } => json!({
            "rank_by": [field, "BM25", text],
            "top_k": top_k,
            "include_attributes": ATTRIBUTE_FIELDS,
        }),
    }
}

#[async_trait]
impl VectorStore for TurbopufferStore {
    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let rows: Vec<UpsertRow<'_>> = records
            .iter()
            .map(|r| UpsertRow {
                id: &r.id,
                vector: &r.vector,
                attributes: &r.attributes,
            })
            .collect();
        let body = json!({
            "upsert_rows": rows,
            "distance_metric": self.distance_metric,
            "schema": {
                "text": { "type": "string", "full_text_search": true }
            },
        });
        let _: Value = self.post(&namespace_path(namespace)?, &body).await?;
        Ok(())
    }

    async fn query(&self, namespace: &str, query: &StoreQuery) -> Result<Vec<QueryResult>> {
        let path = format!("{}/query", namespace_path(namespace)?);
        let response: QueryResponse = self.post(&path, &query_body(query)).await?;
        Ok(response.rows.into_iter().map(Row::into_result).collect())
    }

    async fn multi_query(
        &self,
        namespace: &str,
        queries: &[StoreQuery],
    ) -> Result<Vec<Vec<QueryResult>>> {
        let path = format!("{}/query", namespace_path(namespace)?);
        let body = json!({
            "queries": queries.iter().map(query_body).collect::<Vec<_>>(),
        });
        let response: MultiQueryResponse = self.post(&path, &body).await?;
        if response.results.len() != queries.len() {
            bail!(
                "Turbopuffer returned {} result sets for {} queries",
                response.results.len(),
                queries.len()
            );
        }
        Ok(response
            .results
            .into_iter()
            .map(|r| r.rows.into_iter().map(Row::into_result).collect())
            .collect())
    }
}
