//! In-memory vector index.
//!
//! Useful for testing and for throwaway sessions.

use super::{rank, IndexEntry, SearchHit, VectorIndex};
use crate::error::{Result, VidqaError};
use async_trait::async_trait;
use std::sync::RwLock;

/// In-memory vector index.
#[derive(Default)]
pub struct MemoryVectorIndex {
    entries: RwLock<Vec<IndexEntry>>,
}

impl MemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned<E: std::fmt::Display>(e: E) -> VidqaError {
        VidqaError::VectorStore(format!("Failed to acquire lock: {}", e))
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn create(&self, entries: &[IndexEntry]) -> Result<usize> {
        let mut store = self.entries.write().map_err(Self::poisoned)?;
        store.clear();
        store.extend_from_slice(entries);
        Ok(entries.len())
    }

    async fn append(&self, entries: &[IndexEntry]) -> Result<usize> {
        let mut store = self.entries.write().map_err(Self::poisoned)?;
        store.extend_from_slice(entries);
        Ok(entries.len())
    }

    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchHit>> {
        let store = self.entries.read().map_err(Self::poisoned)?;
        Ok(rank(store.iter().cloned(), query_embedding, limit))
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.read().map_err(Self::poisoned)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_replaces_and_append_extends() {
        let index = MemoryVectorIndex::new();
        index
            .create(&[IndexEntry::new(0, "old".into(), vec![1.0, 0.0])])
            .await
            .unwrap();
        index
            .create(&[IndexEntry::new(0, "new".into(), vec![1.0, 0.0])])
            .await
            .unwrap();
        index
            .append(&[IndexEntry::new(1, "more".into(), vec![0.0, 1.0])])
            .await
            .unwrap();

        assert_eq!(index.len().await.unwrap(), 2);
        let hits = index.search(&[1.0, 0.0], 1).await.unwrap();
        assert_eq!(hits[0].entry.content, "new");
    }
}
