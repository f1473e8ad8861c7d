//! Retrieval of transcript context for a question.

use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::{SearchHit, VectorIndex};
use std::sync::Arc;
use tracing::debug;

/// Fetches the chunks most relevant to a question.
pub struct ContextBuilder {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl ContextBuilder {
    pub fn new(index: Arc<dyn VectorIndex>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            index,
            embedder,
            top_k: 4,
        }
    }

    /// Set the number of chunks retrieved per question.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Retrieve context for a query.
    pub async fn build(&self, query: &str) -> Result<Vec<SearchHit>> {
        let query_embedding = self.embedder.embed(query).await?;
        let hits = self.index.search(&query_embedding, self.top_k).await?;
        debug!("Retrieved {} context chunks", hits.len());
        Ok(hits)
    }
}

/// Join retrieved chunks for the answer prompt.
pub fn format_context_for_prompt(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| hit.entry.content.trim())
        .collect::<Vec<_>>()
        .join("\n\n")
}
