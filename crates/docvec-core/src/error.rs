//! Error taxonomy for the indexing pipeline and query engine.
//!
//! Capability implementations ([`Embedder`](crate::embedding::Embedder),
//! [`VectorStore`](crate::store::VectorStore)) report failures as
//! `anyhow::Error`; the core maps them into the variants below so callers
//! can tell a bad request apart from a failed provider call.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A required capability, credential, or argument is missing or invalid.
    /// Raised before any provider call is attempted.
    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The embedding provider failed or returned a malformed batch.
    #[error("embedding provider error: {0}")]
    Embedding(String),

    /// The vector store rejected or failed an upsert.
    #[error("vector store error: {0}")]
    Store(String),

    /// A store or provider call failed while serving a query.
    #[error("query failed: {0}")]
    Query(String),
}

impl Error {
    pub fn precondition(msg: impl Into<String>) -> Self {
        Error::Precondition(msg.into())
    }

    /// True for errors raised before any external call was made.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Error::Precondition(_))
    }
}
