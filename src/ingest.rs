//! Batched loading of chunks into the vector index.
//!
//! Chunks are embedded and stored in fixed-size batches, in corpus order.
//! The first batch creates the index, later batches append to it, and the
//! index is flushed once at the end. A rate-limit failure anywhere restarts
//! the whole loop from the first batch after a backoff.

use crate::chunking::Chunk;
use crate::embedding::Embedder;
use crate::error::{Result, VidqaError};
use crate::retry::{cancellable, retry_with_backoff, RetryPolicy, Sleeper, TokioSleeper};
use crate::vector_store::{IndexEntry, VectorIndex};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

/// Outcome of a successful ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    /// Chunks stored in the index.
    pub chunks: usize,
    /// Batches written (one create plus appends).
    pub batches: usize,
    /// Attempts used, including the successful one.
    pub attempts: u32,
}

/// Embeds chunks and writes them to a vector index in batches.
pub struct IngestionPipeline {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    batch_size: usize,
    batch_pause: Duration,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    show_progress: bool,
}

impl IngestionPipeline {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            batch_size: 10,
            batch_pause: Duration::from_secs(1),
            policy: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
            show_progress: false,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_batch_pause(mut self, pause: Duration) -> Self {
        self.batch_pause = pause;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Show a terminal progress bar while batches are written.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Number of batches `chunk_count` chunks are split into.
    pub fn batch_count(&self, chunk_count: usize) -> usize {
        chunk_count.div_ceil(self.batch_size)
    }

    /// Load every chunk into the index, retrying the whole run on rate limits.
    #[instrument(skip(self, chunks, cancel), fields(chunks = chunks.len(), batch_size = self.batch_size))]
    pub async fn run(&self, chunks: &[Chunk], cancel: &CancellationToken) -> Result<IngestReport> {
        if chunks.is_empty() {
            return Err(VidqaError::InvalidInput("No chunks to index".to_string()));
        }

        info!(
            "Processing {} chunks in {} batches",
            chunks.len(),
            self.batch_count(chunks.len())
        );

        retry_with_backoff(
            &self.policy,
            self.sleeper.as_ref(),
            cancel,
            "Knowledge base ingestion",
            |attempt| self.ingest_once(chunks, attempt, cancel),
        )
        .await
    }

    async fn ingest_once(
        &self,
        chunks: &[Chunk],
        attempt: u32,
        cancel: &CancellationToken,
    ) -> Result<IngestReport> {
        let total = self.batch_count(chunks.len());
        let progress = self.progress_bar(total);

        for (batch_index, batch) in chunks.chunks(self.batch_size).enumerate() {
            if batch_index > 0 && !self.batch_pause.is_zero() {
                self.sleeper.sleep(self.batch_pause, cancel).await?;
            }

            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = cancellable(cancel, self.embedder.embed_batch(&texts))
                .await
                .inspect_err(|e| {
                    error!(batch = batch_index + 1, error = %e, "embedding failed during ingestion")
                })?;

            if embeddings.len() != batch.len() {
                return Err(VidqaError::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }

            let offset = batch_index * self.batch_size;
            let entries: Vec<IndexEntry> = batch
                .iter()
                .zip(embeddings)
                .enumerate()
                .map(|(i, (chunk, embedding))| {
                    IndexEntry::new((offset + i) as i64, chunk.text.clone(), embedding)
                })
                .collect();

            let stored = if batch_index == 0 {
                cancellable(cancel, self.index.create(&entries)).await
            } else {
                cancellable(cancel, self.index.append(&entries)).await
            }
            .inspect_err(|e| {
                error!(batch = batch_index + 1, error = %e, "index write failed during ingestion")
            })?;

            if let Some(pb) = &progress {
                pb.inc(1);
            }
            info!("Processed batch {}/{} ({} chunks)", batch_index + 1, total, stored);
        }

        cancellable(cancel, self.index.flush()).await?;

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }
        info!("Knowledge base built with {} chunks", chunks.len());

        Ok(IngestReport {
            chunks: chunks.len(),
            batches: total,
            attempts: attempt + 1,
        })
    }

    fn progress_bar(&self, total: usize) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }

        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} Indexing  [{bar:30.cyan/blue}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        Some(pb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::testing::ScriptedEmbedder;
    use crate::retry::testing::RecordingSleeper;
    use crate::vector_store::testing::{IndexOp, RecordingIndex};
    use tokio_test::{assert_err, assert_ok};

    fn chunks(n: usize) -> Vec<Chunk> {
        (0..n)
            .map(|i| Chunk {
                text: format!("chunk number {}", i),
                start: i * 10,
                end: i * 10 + 10,
            })
            .collect()
    }

    struct Harness {
        embedder: Arc<ScriptedEmbedder>,
        index: Arc<RecordingIndex>,
        sleeper: Arc<RecordingSleeper>,
        pipeline: IngestionPipeline,
    }

    fn harness(failures: Vec<VidqaError>, batch_size: usize) -> Harness {
        harness_with(ScriptedEmbedder::failing_with(failures), batch_size)
    }

    fn harness_with(embedder: ScriptedEmbedder, batch_size: usize) -> Harness {
        let embedder = Arc::new(embedder);
        let index = Arc::new(RecordingIndex::default());
        let sleeper = Arc::new(RecordingSleeper::default());
        let pipeline = IngestionPipeline::new(embedder.clone(), index.clone())
            .with_batch_size(batch_size)
            .with_batch_pause(Duration::ZERO)
            .with_retry_policy(RetryPolicy::rate_limited(3))
            .with_sleeper(sleeper.clone());

        Harness {
            embedder,
            index,
            sleeper,
            pipeline,
        }
    }

    #[tokio::test]
    async fn test_one_create_then_appends_then_one_flush() {
        for (n, batch) in [(1, 10), (10, 10), (11, 10), (25, 4), (7, 1)] {
            let h = harness(vec![], batch);
            let report = assert_ok!(h.pipeline.run(&chunks(n), &CancellationToken::new()).await);

            let expected = n.div_ceil(batch);
            assert_eq!(report.batches, expected);

            let ops = h.index.recorded();
            assert_eq!(ops.len(), expected + 1);
            assert!(matches!(ops[0], IndexOp::Create(_)));
            assert!(ops[1..expected]
                .iter()
                .all(|op| matches!(op, IndexOp::Append(_))));
            assert_eq!(ops[expected], IndexOp::Flush);
            assert_eq!(h.index.len().await.unwrap(), n);
        }
    }

    #[tokio::test]
    async fn test_pause_only_between_batches() {
        let h = harness(vec![], 2);
        let pipeline = h.pipeline.with_batch_pause(Duration::from_millis(1000));

        assert_ok!(pipeline.run(&chunks(5), &CancellationToken::new()).await);
        assert_eq!(h.sleeper.recorded(), vec![Duration::from_secs(1); 2]);
    }

    #[tokio::test]
    async fn test_rate_limits_restart_from_first_batch() {
        let h = harness(
            vec![
                VidqaError::RateLimited("429".into()),
                VidqaError::RateLimited("429".into()),
            ],
            10,
        );

        let report = assert_ok!(h.pipeline.run(&chunks(3), &CancellationToken::new()).await);
        assert_eq!(report.attempts, 3);
        assert_eq!(
            h.sleeper.recorded(),
            vec![Duration::from_secs(10), Duration::from_secs(20)]
        );
        assert_eq!(h.index.recorded(), vec![IndexOp::Create(3), IndexOp::Flush]);
    }

    #[tokio::test]
    async fn test_rate_limit_in_later_batch_recreates_index() {
        let h = harness_with(
            ScriptedEmbedder::failing_on_call(2, VidqaError::RateLimited("429".into())),
            10,
        );

        let report = assert_ok!(h.pipeline.run(&chunks(25), &CancellationToken::new()).await);
        assert_eq!(report.attempts, 2);
        assert_eq!(report.batches, 3);

        assert_eq!(*h.embedder.calls.lock().unwrap(), vec![10, 10, 10, 10, 5]);
        assert_eq!(h.sleeper.recorded(), vec![Duration::from_secs(10)]);
        assert_eq!(
            h.index.recorded(),
            vec![
                IndexOp::Create(10),
                IndexOp::Create(10),
                IndexOp::Append(10),
                IndexOp::Append(5),
                IndexOp::Flush,
            ]
        );

        assert_eq!(h.index.len().await.unwrap(), 25);
        let mut positions: Vec<i64> = h
            .index
            .search(&[1.0; 26], 100)
            .await
            .unwrap()
            .into_iter()
            .map(|hit| hit.entry.position)
            .collect();
        positions.sort_unstable();
        assert_eq!(positions, (0..25).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn test_exhausted_retries_propagate() {
        let failures = (0..3).map(|_| VidqaError::RateLimited("429".into())).collect();
        let h = harness(failures, 10);

        let err = assert_err!(h.pipeline.run(&chunks(3), &CancellationToken::new()).await);
        assert!(err.is_rate_limit());
        assert_eq!(h.embedder.call_count(), 3);
        assert!(h.index.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_authentication_failure_is_immediate() {
        let h = harness(vec![VidqaError::Authentication("bad key".into())], 10);

        let err = assert_err!(h.pipeline.run(&chunks(3), &CancellationToken::new()).await);
        assert!(matches!(err, VidqaError::Authentication(_)));
        assert_eq!(h.embedder.call_count(), 1);
        assert!(h.sleeper.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_run_does_not_flush() {
        let h = harness(vec![], 10);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = assert_err!(h.pipeline.run(&chunks(3), &cancel).await);
        assert!(matches!(err, VidqaError::Cancelled));
        assert!(h.index.recorded().is_empty());
    }
}
