//! Migration pipeline: documents in, vectors upserted, manifest out.
//!
//! ```text
//! documents ─▶ chunk ─▶ embedding stream ─▶ index_batch ─▶ upsert ─▶ manifest
//!                        (≤ concurrency        (cursor        (one batch
//!                         batches in flight)    threaded)      at a time)
//! ```
//!
//! Batch `i + 1` is never upserted before batch `i` completes, and any
//! embedding or store failure aborts the run without returning a partial
//! manifest. Records already upserted stay in the store; a re-run with
//! the same inputs overwrites them by ID.

use futures::StreamExt;
use tracing::{debug, info};

use crate::chunk::chunk_markdown;
use crate::embedding::{check_batching, embedding_stream, DimensionCheck, Embedder, DEFAULT_BATCH_SIZE};
use crate::error::{Error, Result};
use crate::indexer::{index_batch, EmbeddingBatch, IdScheme, IndexCursor, MigrationManifest};
use crate::models::{Chunk, Document};
use crate::progress::{MigrationProgressEvent, ProgressReporter};
use crate::store::VectorStore;

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "documents";

/// Tuning for one migration run.
#[derive(Debug, Clone)]
pub struct MigrationOptions {
    pub namespace: String,
    pub batch_size: usize,
    /// Embedding batches allowed in flight at once.
    pub concurrency: usize,
    pub id_scheme: IdScheme,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: 1,
            id_scheme: IdScheme::Positional,
        }
    }
}

/// Outcome of a successful migration.
#[derive(Debug, Clone)]
pub struct MigrationReport {
    pub manifest: MigrationManifest,
    /// Chunks upserted.
    pub chunks: usize,
    /// Batches sent to the embedder and the store.
    pub batches: usize,
}

/// Chunk every document in order, reporting per-document counts.
pub fn chunk_all(documents: &[Document], progress: &dyn ProgressReporter) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for doc in documents {
        let doc_chunks = chunk_markdown(&doc.content, &doc.source);
        debug!(source = %doc.source, chunks = doc_chunks.len(), "chunked");
        progress.report(MigrationProgressEvent::Chunked {
            source: doc.source.clone(),
            chunks: doc_chunks.len(),
        });
        chunks.extend(doc_chunks);
    }
    chunks
}

/// Migrate `documents` into `options.namespace`.
pub async fn migrate<E, S>(
    documents: &[Document],
    embedder: &E,
    store: &S,
    options: &MigrationOptions,
    progress: &dyn ProgressReporter,
) -> Result<MigrationReport>
where
    E: Embedder + ?Sized,
    S: VectorStore + ?Sized,
{
    check_batching(options.batch_size, options.concurrency)?;
    if options.namespace.trim().is_empty() {
        return Err(Error::precondition("namespace must not be empty"));
    }

    let chunks = chunk_all(documents, progress);
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let total = texts.len().div_ceil(options.batch_size);
    info!(
        documents = documents.len(),
        chunks = chunks.len(),
        batches = total,
        namespace = %options.namespace,
        model = embedder.model_name(),
        "starting migration"
    );

    let mut batches = std::pin::pin!(embedding_stream(
        embedder,
        &texts,
        options.batch_size,
        options.concurrency
    )?);
    let mut dims = DimensionCheck::new(embedder.dims());
    let mut cursor = IndexCursor::new();
    let mut manifest = MigrationManifest::new();
    let mut upserted = 0usize;
    let mut batch_no = 0usize;

    while let Some(vectors) = batches.next().await {
        let vectors = vectors?;
        dims.check(&vectors)?;

        let start = cursor.position;
        let batch_chunks = chunks
            .get(start..start + vectors.len())
            .ok_or_else(|| Error::Embedding("provider returned more vectors than chunks".into()))?;
        batch_no += 1;
        progress.report(MigrationProgressEvent::Embedding {
            batch: batch_no,
            total,
            chunks: batch_chunks.len(),
        });

        let (records, next) = index_batch(
            EmbeddingBatch::new(batch_chunks, vectors)?,
            options.id_scheme,
            cursor,
        );
        cursor = next;

        store
            .upsert(&options.namespace, &records)
            .await
            .map_err(|e| Error::Store(format!("batch {} of {}: {:#}", batch_no, total, e)))?;
        upserted += records.len();
        manifest.record(&records);

        info!(batch = batch_no, total, records = records.len(), "upserted batch");
        progress.report(MigrationProgressEvent::Upserted {
            batch: batch_no,
            total,
            records: upserted,
        });
    }

    info!(chunks = upserted, files = manifest.files().count(), "migration complete");
    Ok(MigrationReport {
        manifest,
        chunks: upserted,
        batches: batch_no,
    })
}
