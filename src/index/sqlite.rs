//! SQLite-backed [`VectorIndex`].
//!
//! Vectors are stored as little-endian `f32` BLOBs next to their text and
//! provenance. Queries scan every row and rank by cosine similarity, which
//! is plenty for a portfolio-sized corpus.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::debug;

use super::{rank, VectorIndex};
use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::error::IndexError;
use crate::models::{DocumentKind, EmbeddingRecord, IndexMatch, RecordMetadata};

pub struct SqliteIndex {
    pool: SqlitePool,
}

impl SqliteIndex {
    /// Open (creating if missing) the database at `path` and ensure the
    /// schema exists.
    pub async fn open(path: &Path) -> Result<Self, IndexError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    IndexError::Storage(format!("cannot create {}: {}", parent.display(), e))
                })?;
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let index = Self { pool };
        index.migrate().await?;
        Ok(index)
    }

    async fn migrate(&self) -> Result<(), IndexError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS embeddings (
                id TEXT PRIMARY KEY,
                source TEXT NOT NULL,
                kind TEXT NOT NULL,
                chunk_index INTEGER,
                text TEXT NOT NULL,
                dims INTEGER NOT NULL,
                vector BLOB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_embeddings_source ON embeddings(source)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Number of stored vectors.
    pub async fn count(&self) -> Result<i64, IndexError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM embeddings")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn upsert(&self, records: &[EmbeddingRecord]) -> Result<(), IndexError> {
        let mut tx = self.pool.begin().await?;
        for record in records {
            sqlx::query(
                r#"
                INSERT INTO embeddings (id, source, kind, chunk_index, text, dims, vector)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    source = excluded.source,
                    kind = excluded.kind,
                    chunk_index = excluded.chunk_index,
                    text = excluded.text,
                    dims = excluded.dims,
                    vector = excluded.vector
                "#,
            )
            .bind(&record.id)
            .bind(&record.metadata.source)
            .bind(record.metadata.kind.as_str())
            .bind(record.metadata.chunk_index.map(|i| i as i64))
            .bind(&record.metadata.text)
            .bind(record.vector.len() as i64)
            .bind(vec_to_blob(&record.vector))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        debug!(records = records.len(), "sqlite batch committed");
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>, IndexError> {
        let rows = sqlx::query("SELECT id, source, kind, chunk_index, text, vector FROM embeddings")
            .fetch_all(&self.pool)
            .await?;

        let mut matches = Vec::with_capacity(rows.len());
        for row in &rows {
            let blob: Vec<u8> = row.get("vector");
            let kind: String = row.get("kind");
            let chunk_index: Option<i64> = row.get("chunk_index");
            matches.push(IndexMatch {
                id: row.get("id"),
                score: cosine_similarity(vector, &blob_to_vec(&blob)),
                // Rows with an unknown kind were written by something else.
                metadata: DocumentKind::parse(&kind).map(|kind| RecordMetadata {
                    text: row.get("text"),
                    source: row.get("source"),
                    kind,
                    chunk_index: chunk_index.map(|i| i as usize),
                }),
            });
        }

        Ok(rank(matches, top_k))
    }
}
