//! Embedding capability and batched embedding.
//!
//! Defines the [`Embedder`] trait that every embedding backend implements,
//! and the batcher that feeds it: inputs are split into contiguous batches
//! of at most `batch_size` texts, each batch is sent in one call, and the
//! results are reassembled in input order.
//!
//! Concrete providers (OpenAI, Ollama, local fastembed) live in the
//! `docvec` app crate.
//!
//! # Ordering
//!
//! [`embedding_stream`] may keep several batches in flight
//! (`concurrency > 1`) but yields them strictly in batch order, so vector
//! `i` of the flattened output always belongs to text `i`.

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use tracing::debug;

use crate::error::{Error, Result};

/// Default number of texts per provider call.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Trait for embedding providers.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-large"`).
    fn model_name(&self) -> &str;

    /// Returns the vector dimensionality, or `0` when the provider does not
    /// know it up front.
    fn dims(&self) -> usize;

    /// Embed a batch of texts. Must return one vector per input, in order.
    async fn embed(&self, texts: &[String]) -> AnyResult<Vec<Vec<f32>>>;
}

/// Validate batching parameters before any provider call.
pub fn check_batching(batch_size: usize, concurrency: usize) -> Result<()> {
    if batch_size == 0 {
        return Err(Error::precondition("batch size must be at least 1"));
    }
    if concurrency == 0 {
        return Err(Error::precondition("embedding concurrency must be at least 1"));
    }
    Ok(())
}

/// Stream of per-batch embeddings, in batch order.
///
/// Up to `concurrency` provider calls run at once; results are buffered and
/// released in input order. Each item is exactly as long as its batch.
pub fn embedding_stream<'a, E: Embedder + ?Sized>(
    embedder: &'a E,
    texts: &'a [String],
    batch_size: usize,
    concurrency: usize,
) -> Result<impl Stream<Item = Result<Vec<Vec<f32>>>> + 'a> {
    check_batching(batch_size, concurrency)?;
    Ok(stream::iter(texts.chunks(batch_size).enumerate())
        .map(move |(index, batch)| embed_batch(embedder, index, batch))
        .buffered(concurrency))
}

/// Embed `texts` in batches of `batch_size`, returning one vector per text.
///
/// Equivalent to a single unbatched call: batching never changes the
/// order or content of the output.
pub async fn embed_in_batches<E: Embedder + ?Sized>(
    embedder: &E,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    let mut batches = std::pin::pin!(embedding_stream(embedder, texts, batch_size, 1)?);
    let mut dims = DimensionCheck::new(embedder.dims());
    let mut vectors = Vec::with_capacity(texts.len());
    while let Some(batch) = batches.next().await {
        let batch = batch?;
        dims.check(&batch)?;
        vectors.extend(batch);
    }
    Ok(vectors)
}

/// Embed a single query string.
pub async fn embed_query<E: Embedder + ?Sized>(embedder: &E, text: &str) -> Result<Vec<f32>> {
    let mut vectors = embed_batch(embedder, 0, &[text.to_string()]).await?;
    DimensionCheck::new(embedder.dims()).check(&vectors)?;
    vectors
        .pop()
        .ok_or_else(|| Error::Embedding("empty embedding response".to_string()))
}

async fn embed_batch<E: Embedder + ?Sized>(
    embedder: &E,
    index: usize,
    batch: &[String],
) -> Result<Vec<Vec<f32>>> {
    debug!(batch = index + 1, texts = batch.len(), model = embedder.model_name(), "embedding batch");
    let vectors = embedder
        .embed(batch)
        .await
        .map_err(|e| Error::Embedding(format!("batch {} failed: {:#}", index + 1, e)))?;
    if vectors.len() != batch.len() {
        return Err(Error::Embedding(format!(
            "batch {} returned {} vectors for {} texts",
            index + 1,
            vectors.len(),
            batch.len()
        )));
    }
    Ok(vectors)
}

/// Enforces one dimensionality across every vector of a run.
#[derive(Debug, Clone)]
pub struct DimensionCheck {
    expected: Option<usize>,
}

impl DimensionCheck {
    /// `declared` is the provider's advertised dimensionality; `0` means
    /// "take it from the first vector".
    pub fn new(declared: usize) -> Self {
        Self {
            expected: (declared > 0).then_some(declared),
        }
    }

    pub fn check(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        for v in vectors {
            if v.is_empty() {
                return Err(Error::Embedding("provider returned an empty vector".to_string()));
            }
            match self.expected {
                None => self.expected = Some(v.len()),
                Some(d) if d != v.len() => {
                    return Err(Error::Embedding(format!(
                        "dimension mismatch: expected {}, got {}",
                        d,
                        v.len()
                    )))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty vectors, vectors of
/// different lengths, or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Embeds each text as `[len, first byte]` and records batch sizes.
    struct RecordingEmbedder {
        calls: Mutex<Vec<usize>>,
        fail_on_call: Option<usize>,
    }

    impl RecordingEmbedder {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_on_call: None,
            }
        }
    }

    #[async_trait]
    impl Embedder for RecordingEmbedder {
        fn model_name(&self) -> &str {
            "recording"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> AnyResult<Vec<Vec<f32>>> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(texts.len());
                calls.len()
            };
            if self.fail_on_call == Some(call) {
                anyhow::bail!("rate limited");
            }
            Ok(texts
                .iter()
                .map(|t| vec![t.len() as f32, t.bytes().next().unwrap_or(0) as f32])
                .collect())
        }
    }

    /// Sleeps longer for earlier batches so completions arrive out of order.
    struct SlowFirstEmbedder;

    #[async_trait]
    impl Embedder for SlowFirstEmbedder {
        fn model_name(&self) -> &str {
            "slow-first"
        }
        fn dims(&self) -> usize {
            1
        }
        async fn embed(&self, texts: &[String]) -> AnyResult<Vec<Vec<f32>>> {
            let first: f32 = texts[0].parse()?;
            tokio::time::sleep(Duration::from_millis(40u64.saturating_sub(first as u64 * 5))).await;
            Ok(texts.iter().map(|t| vec![t.parse::<f32>().unwrap()]).collect())
        }
    }

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("text number {}", i)).collect()
    }

    #[tokio::test]
    async fn test_batching_is_order_neutral() {
        let inputs = texts(23);
        let single = embed_in_batches(&RecordingEmbedder::new(), &inputs, 1000)
            .await
            .unwrap();
        for b in [1, 2, 5, 7, 22, 23, 24, 100] {
            let batched = embed_in_batches(&RecordingEmbedder::new(), &inputs, b)
                .await
                .unwrap();
            assert_eq!(batched, single, "batch size {}", b);
        }
    }

    #[tokio::test]
    async fn test_one_call_per_batch() {
        let embedder = RecordingEmbedder::new();
        embed_in_batches(&embedder, &texts(250), 100).await.unwrap();
        assert_eq!(*embedder.calls.lock().unwrap(), vec![100, 100, 50]);
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_calls() {
        let embedder = RecordingEmbedder::new();
        let out = embed_in_batches(&embedder, &[], 10).await.unwrap();
        assert!(out.is_empty());
        assert!(embedder.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_batch_size_is_precondition() {
        let embedder = RecordingEmbedder::new();
        let err = embed_in_batches(&embedder, &texts(3), 0).await.unwrap_err();
        assert!(err.is_precondition());
        assert!(embedder.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_fails_whole_call() {
        let embedder = RecordingEmbedder {
            calls: Mutex::new(Vec::new()),
            fail_on_call: Some(2),
        };
        let err = embed_in_batches(&embedder, &texts(5), 2).await.unwrap_err();
        assert!(matches!(err, Error::Embedding(ref m) if m.contains("batch 2")));
    }

    #[tokio::test]
    async fn test_concurrent_stream_keeps_order() {
        let inputs: Vec<String> = (0..8).map(|i| i.to_string()).collect();
        let stream = embedding_stream(&SlowFirstEmbedder, &inputs, 1, 4).unwrap();
        let batches: Vec<Vec<Vec<f32>>> = stream
            .map(|b| b.unwrap())
            .collect::<Vec<_>>()
            .await;
        let flat: Vec<f32> = batches.into_iter().flatten().map(|v| v[0]).collect();
        assert_eq!(flat, (0..8).map(|i| i as f32).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_embed_query_single_vector() {
        let v = embed_query(&RecordingEmbedder::new(), "abc").await.unwrap();
        assert_eq!(v, vec![3.0, b'a' as f32]);
    }

    #[test]
    fn test_dimension_check() {
        let mut check = DimensionCheck::new(0);
        check.check(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert!(check.check(&[vec![1.0]]).is_err());

        let mut declared = DimensionCheck::new(3);
        assert!(declared.check(&[vec![1.0, 2.0]]).is_err());
        assert!(declared.check(&[vec![]]).is_err());
    }

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        assert!(cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite() {
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
