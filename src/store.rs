//! The embedding index: chunk vectors in, context passages out.
//!
//! [`ContextStore`] pairs an [`EmbeddingProvider`] with an optional
//! [`VectorIndex`]. Ingestion embeds and upserts in sequential batches of
//! at most [`MAX_UPSERT_BATCH`] records; a failed batch stops the run but
//! leaves earlier batches committed. Query-time retrieval never fails the
//! caller: [`ContextStore::query`] logs and returns an empty list, while
//! [`ContextStore::try_query`] exposes the reason.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::embedding::EmbeddingProvider;
use crate::error::{EmbeddingError, RetrievalError, UpsertError};
use crate::index::{VectorIndex, MAX_UPSERT_BATCH};
use crate::models::{Chunk, EmbeddingRecord};

pub const DEFAULT_TOP_K: usize = 5;

/// Counts reported after a bulk ingestion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub batches: usize,
    pub records: usize,
}

pub struct ContextStore {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Option<Arc<dyn VectorIndex>>,
    top_k: usize,
    batch_size: usize,
}

impl ContextStore {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Option<Arc<dyn VectorIndex>>) -> Self {
        Self {
            embedder,
            index,
            top_k: DEFAULT_TOP_K,
            batch_size: MAX_UPSERT_BATCH,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Batch size for embedding and upsert calls, clamped to `1..=100`.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_UPSERT_BATCH);
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn embedder_name(&self) -> &str {
        self.embedder.model_name()
    }

    pub fn has_index(&self) -> bool {
        self.index.is_some()
    }

    /// Embed one text with the configured model. No retries.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embedder.embed(text).await
    }

    /// Upsert precomputed records in sequential batches.
    pub async fn upsert(&self, records: &[EmbeddingRecord]) -> Result<IngestStats, UpsertError> {
        let index = self.index.as_ref().ok_or(UpsertError::IndexUnavailable)?;
        let mut stats = IngestStats::default();
        for (batch, slice) in records.chunks(self.batch_size).enumerate() {
            index
                .upsert(slice)
                .await
                .map_err(|source| UpsertError::Index { batch, source })?;
            stats.batches += 1;
            stats.records += slice.len();
            debug!(batch, records = slice.len(), "batch committed");
        }
        Ok(stats)
    }

    /// Embed chunks and upsert them, one batch at a time.
    ///
    /// Each batch is embedded then committed before the next begins, so a
    /// failure at batch `n` leaves batches `0..n` in the index.
    pub async fn ingest(&self, chunks: &[Chunk]) -> Result<IngestStats, UpsertError> {
        let index = self.index.as_ref().ok_or(UpsertError::IndexUnavailable)?;
        let mut stats = IngestStats::default();
        for (batch, slice) in chunks.chunks(self.batch_size).enumerate() {
            let texts: Vec<String> = slice.iter().map(|c| c.text.clone()).collect();
            let vectors = self
                .embedder
                .embed_texts(&texts)
                .await
                .map_err(|source| UpsertError::Embedding { batch, source })?;
            if vectors.len() != slice.len() {
                return Err(UpsertError::Embedding {
                    batch,
                    source: EmbeddingError::InvalidResponse(format!(
                        "expected {} vectors, got {}",
                        slice.len(),
                        vectors.len()
                    )),
                });
            }

            let records: Vec<EmbeddingRecord> = slice
                .iter()
                .zip(vectors)
                .map(|(chunk, vector)| EmbeddingRecord::from_chunk(chunk, vector))
                .collect();
            index
                .upsert(&records)
                .await
                .map_err(|source| UpsertError::Index { batch, source })?;

            stats.batches += 1;
            stats.records += records.len();
            info!(batch, records = records.len(), "batch committed");
        }
        Ok(stats)
    }

    /// Retrieve up to `top_k` passages for `text`, best first.
    ///
    /// Matches without text metadata are dropped. An empty result after
    /// filtering is reported as [`RetrievalError::NoMatches`].
    pub async fn try_query(&self, text: &str, top_k: usize) -> Result<Vec<String>, RetrievalError> {
        let index = self.index.as_ref().ok_or(RetrievalError::IndexUnavailable)?;
        let vector = self.embedder.embed(text).await?;
        let matches = index.query(&vector, top_k).await?;

        let passages: Vec<String> = matches
            .into_iter()
            .filter_map(|m| m.metadata)
            .map(|meta| meta.text)
            .filter(|text| !text.trim().is_empty())
            .take(top_k)
            .collect();

        if passages.is_empty() {
            return Err(RetrievalError::NoMatches);
        }
        Ok(passages)
    }

    /// Like [`try_query`](Self::try_query) with the configured `top_k`, but
    /// every failure degrades to an empty list.
    pub async fn query(&self, text: &str) -> Vec<String> {
        match self.try_query(text, self.top_k).await {
            Ok(passages) => passages,
            Err(RetrievalError::IndexUnavailable) => Vec::new(),
            Err(e) => {
                warn!("vector retrieval failed, using no vector context: {}", e);
                Vec::new()
            }
        }
    }
}
