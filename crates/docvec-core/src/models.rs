//! Data types that flow through the indexing pipeline and query engine.

use serde::{Deserialize, Serialize};

use crate::hash::ContentHash;

/// An input document: its source identifier and raw markdown.
#[derive(Debug, Clone)]
pub struct Document {
    /// Source path exactly as given by the caller. Becomes the vector-ID prefix.
    pub source: String,
    pub content: String,
}

impl Document {
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
        }
    }
}

/// A header-bounded span of a document.
///
/// `header`/`level` describe the nearest preceding heading. Prose before
/// the first heading has no header and level 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub source: String,
    pub header: Option<String>,
    pub level: u8,
}

/// Attributes stored alongside each vector and returned by queries.
///
/// Every field defaults when absent so partially projected rows still parse.
/// `header` is written as an empty string when missing, matching what
/// earlier migrations put in the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkAttributes {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub content_hash: ContentHash,
    #[serde(default)]
    pub source: String,
    #[serde(default, with = "empty_as_none")]
    pub header: Option<String>,
    #[serde(default)]
    pub level: u8,
}

/// Names of the attribute fields, in the order they are stored.
pub const ATTRIBUTE_FIELDS: [&str; 5] = ["text", "content_hash", "source", "header", "level"];

impl ChunkAttributes {
    /// Value of a text attribute by name, for lexical ranking.
    pub fn text_field(&self, name: &str) -> Option<&str> {
        match name {
            "text" => Some(&self.text),
            "content_hash" => Some(self.content_hash.as_str()),
            "source" => Some(&self.source),
            "header" => Some(self.header.as_deref().unwrap_or("")),
            _ => None,
        }
    }
}

/// A vector plus its attributes, ready to upsert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub attributes: ChunkAttributes,
}

/// One row of a ranked query response.
///
/// `dist` is method-specific: cosine distance for ANN (lower first), the
/// BM25 score for lexical queries (higher first), the fused RRF score for
/// hybrid queries (higher first), and absent for exact-ID lookups.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dist: Option<f64>,
    pub attributes: ChunkAttributes,
}

mod empty_as_none {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(value.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        Ok(raw.filter(|h| !h.is_empty()))
    }
}
