//! In-memory [`VectorStore`] implementation for testing and embedding.
//!
//! Records live in a `HashMap<namespace, Vec<VectorRecord>>` behind
//! `std::sync::RwLock`. ANN is brute-force cosine distance over every
//! stored vector; BM25 tokenizes the namespace at query time (see
//! [`super::bm25`]). Insertion order is kept so equal scores rank stably.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{QueryResult, VectorRecord};

use super::{bm25, StoreQuery, VectorStore};

/// In-memory vector store.
#[derive(Default)]
pub struct InMemoryStore {
    namespaces: RwLock<HashMap<String, Vec<VectorRecord>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in `namespace`.
    pub fn len(&self, namespace: &str) -> Result<usize> {
        Ok(self.read()?.get(namespace).map_or(0, Vec::len))
    }

    /// Copy of a stored record, by ID.
    pub fn get(&self, namespace: &str, id: &str) -> Result<Option<VectorRecord>> {
        Ok(self
            .read()?
            .get(namespace)
            .and_then(|records| records.iter().find(|r| r.id == id).cloned()))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Vec<VectorRecord>>>> {
        self.namespaces
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Vec<VectorRecord>>>> {
        self.namespaces
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }
}

fn to_result(record: &VectorRecord, dist: Option<f64>) -> QueryResult {
    QueryResult {
        id: record.id.clone(),
        dist,
        attributes: record.attributes.clone(),
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<()> {
        let mut namespaces = self.write()?;
        let stored = namespaces.entry(namespace.to_string()).or_default();
        for record in records {
            match stored.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record.clone(),
                None => stored.push(record.clone()),
            }
        }
        Ok(())
    }

    async fn query(&self, namespace: &str, query: &StoreQuery) -> Result<Vec<QueryResult>> {
        let namespaces = self.read()?;
        let records: &[VectorRecord] = namespaces
            .get(namespace)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        match query {
            StoreQuery::IdEquals { id } => Ok(records
                .iter()
                .find(|r| &r.id == id)
                .map(|r| to_result(r, None))
                .into_iter()
                .collect()),

            StoreQuery::Ann { vector, top_k } => {
                let mut scored: Vec<(f64, &VectorRecord)> = records
                    .iter()
                    .map(|r| (1.0 - cosine_similarity(vector, &r.vector) as f64, r))
                    .collect();
                scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
                Ok(scored
                    .into_iter()
                    .take(*top_k)
                    .map(|(d, r)| to_result(r, Some(d)))
                    .collect())
            }

            StoreQuery::Bm25 { field, text, top_k } => {
                let mut texts = Vec::with_capacity(records.len());
                for r in records {
                    match r.attributes.text_field(field) {
                        Some(t) => texts.push(t),
                        None => bail!("attribute '{}' is not full-text searchable", field),
                    }
                }
                let scores = bm25::score_all(text, &texts);
                let mut scored: Vec<(f64, &VectorRecord)> = scores
                    .into_iter()
                    .zip(records)
                    .filter(|(s, _)| *s > 0.0)
                    .collect();
                scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
                Ok(scored
                    .into_iter()
                    .take(*top_k)
                    .map(|(s, r)| to_result(r, Some(s)))
                    .collect())
            }
        }
    }
}
