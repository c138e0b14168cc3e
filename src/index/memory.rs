//! In-memory [`VectorIndex`] for tests and ephemeral runs.
//!
//! Records live in a `Vec` behind `std::sync::RwLock`. Search is
//! brute-force cosine similarity over every stored vector.

use std::sync::RwLock;

use async_trait::async_trait;

use super::{rank, VectorIndex};
use crate::embedding::cosine_similarity;
use crate::error::IndexError;
use crate::models::{EmbeddingRecord, IndexMatch};

pub struct InMemoryIndex {
    records: RwLock<Vec<EmbeddingRecord>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> IndexError {
    IndexError::Storage("in-memory index lock poisoned".to_string())
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    fn name(&self) -> &str {
        "memory"
    }

    async fn upsert(&self, records: &[EmbeddingRecord]) -> Result<(), IndexError> {
        let mut stored = self.records.write().map_err(poisoned)?;
        for record in records {
            match stored.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record.clone(),
                None => stored.push(record.clone()),
            }
        }
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>, IndexError> {
        let stored = self.records.read().map_err(poisoned)?;
        let matches = stored
            .iter()
            .map(|r| IndexMatch {
                id: r.id.clone(),
                score: cosine_similarity(vector, &r.vector),
                metadata: Some(r.metadata.clone()),
            })
            .collect();
        Ok(rank(matches, top_k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentKind, RecordMetadata};

    fn record(id: &str, vector: Vec<f32>) -> EmbeddingRecord {
        EmbeddingRecord {
            id: id.to_string(),
            vector,
            metadata: RecordMetadata {
                text: format!("text of {}", id),
                source: "test".to_string(),
                kind: DocumentKind::Text,
                chunk_index: Some(0),
            },
        }
    }

    #[tokio::test]
    async fn upsert_is_idempotent_per_id() {
        let index = InMemoryIndex::new();
        index.upsert(&[record("a", vec![1.0, 0.0])]).await.unwrap();
        index.upsert(&[record("a", vec![0.0, 1.0])]).await.unwrap();
        assert_eq!(index.len(), 1);

        let hits = index.query(&[0.0, 1.0], 5).await.unwrap();
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn query_ranks_by_similarity() {
        let index = InMemoryIndex::new();
        index
            .upsert(&[
                record("east", vec![1.0, 0.0]),
                record("north", vec![0.0, 1.0]),
                record("northeast", vec![1.0, 1.0]),
            ])
            .await
            .unwrap();

        let hits = index.query(&[0.1, 1.0], 2).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["north", "northeast"]);
    }
}
