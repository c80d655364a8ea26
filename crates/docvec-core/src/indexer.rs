//! Vector-ID assignment and the migration manifest.
//!
//! [`index_batch`] turns an [`EmbeddingBatch`] into upsert-ready
//! [`VectorRecord`]s. It is a pure function of the batch and the incoming
//! [`IndexCursor`]; the caller threads the returned cursor into the next
//! batch so positions run across every file of a migration.
//!
//! # ID schemes
//!
//! | Scheme | ID | Stable across |
//! |--------|----|---------------|
//! | [`IdScheme::Positional`] | `{source}_{position}` | same file set, order |
//! | [`IdScheme::Content`] | `{source}_{hash16}[-N]` | edits to other chunks |

use std::collections::HashMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{Error, Result};
use crate::hash::{content_hash, ContentHash};
use crate::models::{Chunk, ChunkAttributes, VectorRecord};

/// How vector IDs are derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdScheme {
    /// `{source}_{position}` where position counts chunks across the whole run.
    #[default]
    Positional,
    /// `{source}_{first 16 hex of the fingerprint}`, with `-N` for the N-th
    /// repeat of identical text within one source.
    Content,
}

impl std::str::FromStr for IdScheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "positional" => Ok(IdScheme::Positional),
            "content" => Ok(IdScheme::Content),
            other => Err(Error::precondition(format!(
                "unknown id scheme '{}' (expected positional or content)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for IdScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            IdScheme::Positional => "positional",
            IdScheme::Content => "content",
        })
    }
}

/// Running state carried from one batch to the next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexCursor {
    /// Chunks indexed so far in this run.
    pub position: usize,
    duplicates: HashMap<(String, ContentHash), usize>,
}

impl IndexCursor {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Chunks paired with their embeddings, in order.
#[derive(Debug, Clone)]
pub struct EmbeddingBatch<'a> {
    pairs: Vec<(&'a Chunk, Vec<f32>)>,
}

impl<'a> EmbeddingBatch<'a> {
    /// Pair `chunks` with `vectors`; the lengths must match.
    pub fn new(chunks: &'a [Chunk], vectors: Vec<Vec<f32>>) -> Result<Self> {
        if chunks.len() != vectors.len() {
            return Err(Error::Embedding(format!(
                "{} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }
        Ok(Self {
            pairs: chunks.iter().zip(vectors).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Build records for one batch and return the advanced cursor.
pub fn index_batch(
    batch: EmbeddingBatch<'_>,
    scheme: IdScheme,
    cursor: IndexCursor,
) -> (Vec<VectorRecord>, IndexCursor) {
    let mut cursor = cursor;
    let mut records = Vec::with_capacity(batch.len());

    for (chunk, vector) in batch.pairs {
        let hash = content_hash(&chunk.text);
        let id = match scheme {
            IdScheme::Positional => format!("{}_{}", chunk.source, cursor.position),
            IdScheme::Content => {
                let seen = cursor
                    .duplicates
                    .entry((chunk.source.clone(), hash.clone()))
                    .or_insert(0);
                let id = if *seen == 0 {
                    format!("{}_{}", chunk.source, hash.short())
                } else {
                    format!("{}_{}-{}", chunk.source, hash.short(), seen)
                };
                *seen += 1;
                id
            }
        };
        cursor.position += 1;

        records.push(VectorRecord {
            id,
            vector,
            attributes: ChunkAttributes {
                text: chunk.text.clone(),
                content_hash: hash,
                source: chunk.source.clone(),
                header: chunk.header.clone(),
                level: chunk.level,
            },
        });
    }

    (records, cursor)
}

/// One manifest row: where a chunk went and what it contained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    pub vector_id: String,
    pub content_hash: ContentHash,
}

/// Source path → `(vector_id, content_hash)` pairs, in migration order.
///
/// Serializes as a JSON object keyed by source, keys in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationManifest {
    files: Vec<(String, Vec<ManifestEntry>)>,
    index: HashMap<String, usize>,
}

impl MigrationManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every record of an upserted batch under its source.
    pub fn record(&mut self, records: &[VectorRecord]) {
        for r in records {
            let pos = match self.index.get(&r.attributes.source) {
                Some(&pos) => pos,
                None => {
                    self.index
                        .insert(r.attributes.source.clone(), self.files.len());
                    self.files.push((r.attributes.source.clone(), Vec::new()));
                    self.files.len() - 1
                }
            };
            self.files[pos].1.push(ManifestEntry {
                vector_id: r.id.clone(),
                content_hash: r.attributes.content_hash.clone(),
            });
        }
    }

    /// Entries for one source, if it produced any chunks.
    pub fn get(&self, source: &str) -> Option<&[ManifestEntry]> {
        self.index.get(source).map(|&pos| self.files[pos].1.as_slice())
    }

    pub fn contains(&self, source: &str) -> bool {
        self.index.contains_key(source)
    }

    /// Sources in first-recorded order.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|(s, _)| s.as_str())
    }

    /// Total entries across all sources.
    pub fn len(&self) -> usize {
        self.files.iter().map(|(_, e)| e.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Serialize for MigrationManifest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.files.len()))?;
        for (source, entries) in &self.files {
            map.serialize_entry(source, entries)?;
        }
        map.end()
    }
}
