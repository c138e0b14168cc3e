//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait is the capability interface the context store
//! talks to. Backends:
//!
//! | Backend | Type | Persistence |
//! |---------|------|-------------|
//! | `memory` | [`InMemoryIndex`] | process lifetime |
//! | `sqlite` | [`SqliteIndex`] | local file |
//! | `pinecone` | [`PineconeIndex`] | hosted |
//!
//! Implementations must be `Send + Sync` so one instance can serve
//! concurrent queries without client-side locking.

pub mod memory;
pub mod pinecone;
pub mod sqlite;

use std::cmp::Ordering;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::config::{credential, IndexConfig, PINECONE_API_KEY};
use crate::error::IndexError;
use crate::models::{EmbeddingRecord, IndexMatch};

pub use memory::InMemoryIndex;
pub use pinecone::PineconeIndex;
pub use sqlite::SqliteIndex;

/// Maximum records per upsert call accepted by the backends.
pub const MAX_UPSERT_BATCH: usize = 100;

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    /// Insert or replace records by id. Callers pass at most
    /// [`MAX_UPSERT_BATCH`] records per call.
    async fn upsert(&self, records: &[EmbeddingRecord]) -> Result<(), IndexError>;

    /// Nearest neighbors of `vector` by cosine similarity, best first.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>, IndexError>;
}

/// Build the configured index.
///
/// Returns `Ok(None)` for the degraded modes: backend `disabled`, or
/// `pinecone` without a `PINECONE_API_KEY`.
pub async fn create_index(config: &IndexConfig) -> Result<Option<Arc<dyn VectorIndex>>> {
    match config.backend.as_str() {
        "disabled" => Ok(None),
        "memory" => Ok(Some(Arc::new(InMemoryIndex::new()))),
        "sqlite" => Ok(Some(Arc::new(SqliteIndex::open(&config.path).await?))),
        "pinecone" => match credential(PINECONE_API_KEY) {
            Some(api_key) => {
                let mut index = PineconeIndex::new(config, api_key)?;
                if let Some(url) = &config.control_plane {
                    index = index.with_control_plane(url);
                }
                Ok(Some(Arc::new(index)))
            }
            None => {
                info!("{} not set; vector index unavailable", PINECONE_API_KEY);
                Ok(None)
            }
        },
        other => anyhow::bail!("Unknown index backend: {}", other),
    }
}

/// Sort matches by descending score and keep the best `top_k`.
pub(crate) fn rank(mut matches: Vec<IndexMatch>, top_k: usize) -> Vec<IndexMatch> {
    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    matches.truncate(top_k);
    matches
}
