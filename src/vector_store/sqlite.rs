//! SQLite-based vector index.
//!
//! Embeddings are stored as little-endian `f32` blobs and cosine similarity
//! is computed in Rust over every row. Fine for one video's worth of chunks.

use super::{rank, IndexEntry, SearchHit, VectorIndex, INDEX_FILE};
use crate::error::{Result, VidqaError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS chunks (
        id TEXT PRIMARY KEY,
        position INTEGER NOT NULL,
        content TEXT NOT NULL,
        embedding BLOB NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_chunks_position ON chunks(position);
"#;

/// SQLite-based vector index.
pub struct SqliteVectorIndex {
    conn: Mutex<Connection>,
}

impl SqliteVectorIndex {
    /// Open (or create) the index file inside `dir`.
    #[instrument(skip_all)]
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(INDEX_FILE);

        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Opened vector index at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory index (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| VidqaError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn insert_all(tx: &Transaction<'_>, entries: &[IndexEntry]) -> Result<()> {
        let mut stmt = tx.prepare(
            r#"
            INSERT INTO chunks (id, position, content, embedding, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )?;

        for entry in entries {
            stmt.execute(params![
                entry.id.to_string(),
                entry.position,
                entry.content,
                Self::embedding_to_bytes(&entry.embedding),
                entry.indexed_at.to_rfc3339(),
            ])?;
        }
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    #[instrument(skip(self, entries), fields(count = entries.len()))]
    async fn create(&self, entries: &[IndexEntry]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM chunks", [])?;
        Self::insert_all(&tx, entries)?;
        tx.commit()?;

        if removed > 0 {
            debug!("Replaced {} previously indexed chunks", removed);
        }
        info!("Created index with {} chunks", entries.len());
        Ok(entries.len())
    }

    #[instrument(skip(self, entries), fields(count = entries.len()))]
    async fn append(&self, entries: &[IndexEntry]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        Self::insert_all(&tx, entries)?;
        tx.commit()?;

        debug!("Appended {} chunks", entries.len());
        Ok(entries.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchHit>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT id, position, content, embedding, indexed_at FROM chunks")?;

        let rows = stmt.query_map([], |row| {
            let id_str: String = row.get(0)?;
            let embedding_bytes: Vec<u8> = row.get(3)?;
            let indexed_at_str: String = row.get(4)?;

            Ok(IndexEntry {
                id: uuid::Uuid::parse_str(&id_str).unwrap_or_default(),
                position: row.get(1)?,
                content: row.get(2)?,
                embedding: Self::bytes_to_embedding(&embedding_bytes),
                indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?;

        let entries = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        let hits = rank(entries, query_embedding, limit);

        debug!("Found {} matching chunks", hits.len());
        Ok(hits)
    }

    #[instrument(skip(self))]
    async fn flush(&self) -> Result<()> {
        let conn = self.lock()?;
        // Harmless no-op for in-memory databases.
        conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;
        info!("Vector index flushed to disk");
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
