//! Pinecone-hosted [`VectorIndex`].
//!
//! The data-plane host is resolved once from the control plane
//! (`GET /indexes/{name}`) unless configured explicitly. Pinecone returns
//! numeric metadata as floats and tolerates foreign records, so match
//! metadata is decoded leniently: a match without a `text` field yields
//! `metadata: None` instead of an error.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::OnceCell;
use tracing::debug;

use super::VectorIndex;
use crate::config::IndexConfig;
use crate::error::IndexError;
use crate::models::{DocumentKind, EmbeddingRecord, IndexMatch, RecordMetadata};

const CONTROL_PLANE: &str = "https://api.pinecone.io";
const API_VERSION: &str = "2024-07";

pub struct PineconeIndex {
    name: String,
    api_key: String,
    control_plane: String,
    host: OnceCell<String>,
    client: reqwest::Client,
}

impl PineconeIndex {
    pub fn new(config: &IndexConfig, api_key: String) -> Result<Self, IndexError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let host = match &config.host {
            Some(host) => OnceCell::new_with(Some(normalize_host(host))),
            None => OnceCell::new(),
        };
        Ok(Self {
            name: config.name.clone(),
            api_key,
            control_plane: CONTROL_PLANE.to_string(),
            host,
            client,
        })
    }

    /// Point control-plane lookups somewhere else (tests, proxies).
    pub fn with_control_plane(mut self, url: impl Into<String>) -> Self {
        self.control_plane = url.into();
        self
    }

    async fn host(&self) -> Result<&str, IndexError> {
        self.host
            .get_or_try_init(|| self.describe_index())
            .await
            .map(String::as_str)
    }

    async fn describe_index(&self) -> Result<String, IndexError> {
        let url = format!(
            "{}/indexes/{}",
            self.control_plane.trim_end_matches('/'),
            self.name
        );
        let response = self
            .client
            .get(&url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(IndexError::NotFound(self.name.clone()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IndexError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let described: DescribeIndexResponse = response
            .json()
            .await
            .map_err(|e| IndexError::InvalidResponse(e.to_string()))?;
        debug!(index = %self.name, host = %described.host, "resolved pinecone host");
        Ok(normalize_host(&described.host))
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, IndexError> {
        let host = self.host().await?;
        let response = self
            .client
            .post(format!("{}{}", host, path))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(IndexError::NotFound(self.name.clone()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IndexError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

#[derive(Deserialize)]
struct DescribeIndexResponse {
    host: String,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<PineconeVector<'a>>,
}

#[derive(Serialize)]
struct PineconeVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: &'a RecordMetadata,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<PineconeMatch>,
}

#[derive(Deserialize)]
struct PineconeMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

/// Decode stored metadata, tolerating float-typed integers and records
/// that were not written by this crate.
fn decode_metadata(raw: &Map<String, Value>) -> Option<RecordMetadata> {
    let text = raw.get("text")?.as_str()?.to_string();
    let source = raw
        .get("source")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let kind = raw
        .get("kind")
        .and_then(Value::as_str)
        .and_then(DocumentKind::parse)
        .unwrap_or(DocumentKind::Text);
    let chunk_index = raw
        .get("chunk_index")
        .and_then(Value::as_f64)
        .filter(|i| *i >= 0.0)
        .map(|i| i as usize);
    Some(RecordMetadata {
        text,
        source,
        kind,
        chunk_index,
    })
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    fn name(&self) -> &str {
        "pinecone"
    }

    async fn upsert(&self, records: &[EmbeddingRecord]) -> Result<(), IndexError> {
        if records.is_empty() {
            return Ok(());
        }
        let request = UpsertRequest {
            vectors: records
                .iter()
                .map(|r| PineconeVector {
                    id: &r.id,
                    values: &r.vector,
                    metadata: &r.metadata,
                })
                .collect(),
        };
        self.post("/vectors/upsert", &request).await?;
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>, IndexError> {
        let response = self
            .post(
                "/query",
                &QueryRequest {
                    vector,
                    top_k,
                    include_metadata: true,
                },
            )
            .await?;
        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| IndexError::InvalidResponse(e.to_string()))?;

        Ok(parsed
            .matches
            .into_iter()
            .map(|m| IndexMatch {
                metadata: m.metadata.as_ref().and_then(decode_metadata),
                id: m.id,
                score: m.score,
            })
            .collect())
    }
}
