//! # docvec
//!
//! Migrates long-form markdown documentation into a vector index and serves
//! hybrid (semantic + lexical) queries over it.
//!
//! The pipeline, query engine and RRF fusion live in [`docvec_core`], which
//! knows nothing about HTTP. This crate supplies the concrete capabilities
//! (OpenAI / Ollama / local embedders and the Turbopuffer store), the TOML
//! configuration, input discovery and the `docvec` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────────────┐   ┌─────────────┐
//! │ sources      │──▶│ docvec_core::pipeline │──▶│ Turbopuffer │
//! │ walk + globs │   │ chunk → embed → index │   │  (upsert)   │
//! └──────────────┘   └──────────┬────────────┘   └──────┬──────┘
//!                               │ Embedder              │
//!                               ▼                       ▼
//!                         ┌───────────┐      ┌──────────────────────┐
//!                         │ OpenAI /  │◀─────│ docvec_core::query   │
//!                         │ Ollama    │      │ ANN · BM25 · RRF     │
//!                         └───────────┘      └──────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export OPENAI_API_KEY=... TURBOPUFFER_API_KEY=...
//! docvec migrate ./docs -n handbook --manifest manifest.json
//! docvec query --search "deployment" -n handbook --method hybrid
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`embedding`] | Embedding providers |
//! | [`http`] | Shared HTTP client and retry policy |
//! | [`turbopuffer`] | Turbopuffer vector store |
//! | [`sources`] | Markdown input discovery |
//! | [`progress`] | Migration progress rendering |
//! | [`migrate`] | `docvec migrate` |
//! | [`query`] | `docvec query` |
//! | [`inspect`] | `docvec chunk` and `docvec hash` |

pub mod config;
pub mod embedding;
pub mod http;
pub mod inspect;
pub mod migrate;
pub mod progress;
pub mod query;
pub mod sources;
pub mod turbopuffer;
