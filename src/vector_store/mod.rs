//! Vector index abstraction for vidqa.
//!
//! The index is append-only for the life of a process: `create` replaces the
//! contents, `append` adds to them, and `flush` makes them durable.

mod memory;
mod sqlite;

pub use memory::MemoryVectorIndex;
pub use sqlite::SqliteVectorIndex;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// File name of the persistent index inside the index directory.
pub const INDEX_FILE: &str = "index.db";

/// A chunk stored in the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Unique entry ID.
    pub id: Uuid,
    /// Insertion order across the whole corpus.
    pub position: i64,
    /// Chunk text.
    pub content: String,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// When this entry was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl IndexEntry {
    pub fn new(position: i64, content: String, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            content,
            embedding,
            indexed_at: Utc::now(),
        }
    }
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// The matched entry.
    pub entry: IndexEntry,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Trait for vector index implementations.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Initialise the index with `entries`, discarding previous contents.
    async fn create(&self, entries: &[IndexEntry]) -> Result<usize>;

    /// Add entries to an existing index.
    async fn append(&self, entries: &[IndexEntry]) -> Result<usize>;

    /// Return the `limit` entries most similar to `query_embedding`.
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchHit>>;

    /// Make all writes durable.
    async fn flush(&self) -> Result<()>;

    /// Number of stored entries.
    async fn len(&self) -> Result<usize>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Score, order and truncate candidate entries.
pub(crate) fn rank<I>(candidates: I, query_embedding: &[f32], limit: usize) -> Vec<SearchHit>
where
    I: IntoIterator<Item = IndexEntry>,
{
    let mut hits: Vec<SearchHit> = candidates
        .into_iter()
        .map(|entry| {
            let score = cosine_similarity(query_embedding, &entry.embedding);
            SearchHit { entry, score }
        })
        .collect();

    // Ties keep corpus order.
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.entry.position.cmp(&b.entry.position))
    });
    hits.truncate(limit);
    hits
}
