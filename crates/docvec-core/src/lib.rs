//! # docvec core
//!
//! Shared, WASM-safe logic for docvec: data models, markdown chunking,
//! content fingerprints, batched embedding, vector-ID assignment, the
//! migration pipeline, and the query/fusion engine.
//!
//! This crate contains no tokio, HTTP, or filesystem I/O. Embedding
//! providers and vector stores are consumed through the [`embedding::Embedder`]
//! and [`store::VectorStore`] traits; the `docvec` app crate supplies the
//! network-backed implementations.
//!
//! ```text
//! documents ─▶ chunk ─▶ hash ─▶ embedding (batched) ─▶ indexer ─▶ VectorStore
//!
//! query text ─▶ QueryEngine ─┬─▶ ANN  ──┐
//!                            └─▶ BM25 ──┴─▶ fusion (RRF) ─▶ results
//! ```

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod fusion;
pub mod hash;
pub mod indexer;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod query;
pub mod store;

pub use error::{Error, Result};
