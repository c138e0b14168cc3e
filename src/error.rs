//! Error taxonomy for the retrieval pipeline.
//!
//! Each layer has its own error type so callers can decide, by matching on
//! the variant, whether a failure is absorbed (retrieval) or surfaced
//! (generation, ingestion).

use std::path::PathBuf;

use thiserror::Error;

/// Reading or parsing a source document failed.
///
/// Aborts processing of that one document; the ingestion caller decides
/// whether to skip it or stop the whole run.
#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to walk directory {path}: {message}")]
    Walk { path: PathBuf, message: String },
    #[error("PDF extraction failed for {source_id}: {message}")]
    Pdf { source_id: String, message: String },
    #[error("{source_id} is not valid UTF-8 text")]
    Encoding { source_id: String },
    #[error("invalid structured content in {source_id}: {message}")]
    Structured { source_id: String, message: String },
}

/// The embedding backend could not produce a vector.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding provider is disabled")]
    Disabled,
    #[error("embedding credential missing: {0} is not set")]
    MissingCredential(&'static str),
    #[error("embedding request failed: {0}")]
    Transport(String),
    #[error("embedding backend returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for EmbeddingError {
    fn from(err: reqwest::Error) -> Self {
        EmbeddingError::Transport(err.to_string())
    }
}

/// The vector index rejected or failed an operation.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index '{0}' not found")]
    NotFound(String),
    #[error("index request failed: {0}")]
    Transport(String),
    #[error("index backend returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("index storage error: {0}")]
    Storage(String),
    #[error("invalid index response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for IndexError {
    fn from(err: reqwest::Error) -> Self {
        IndexError::Transport(err.to_string())
    }
}

impl From<sqlx::Error> for IndexError {
    fn from(err: sqlx::Error) -> Self {
        IndexError::Storage(err.to_string())
    }
}

/// Why vector retrieval produced no context.
///
/// Every variant is recoverable at query time: the orchestrator answers
/// from the fallback selector instead.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// No vector index is configured. A recognized degraded mode.
    #[error("no vector index configured")]
    IndexUnavailable,
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error(transparent)]
    Index(#[from] IndexError),
    /// The index answered but no match carried text.
    #[error("vector search returned no usable matches")]
    NoMatches,
}

/// Failure while bulk-loading chunks into the index.
#[derive(Debug, Error)]
pub enum UpsertError {
    #[error("no vector index configured")]
    IndexUnavailable,
    #[error("batch {batch} failed to embed: {source}")]
    Embedding {
        batch: usize,
        #[source]
        source: EmbeddingError,
    },
    #[error("batch {batch} failed to commit: {source}")]
    Index {
        batch: usize,
        #[source]
        source: IndexError,
    },
}

/// The language-model backend failed to produce an answer.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("language model rejected credentials: {0}")]
    Unauthorized(String),
    #[error("language model request failed: {0}")]
    Transport(String),
    #[error("language model returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("invalid language model response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        GenerationError::Transport(err.to_string())
    }
}

const AUTH_SIGNATURES: &[&str] = &[
    "api key",
    "api_key",
    "apikey",
    "authentication",
    "unauthorized",
    "invalid_api_key",
    "credential",
];

impl GenerationError {
    /// Whether this failure looks like a missing or rejected credential.
    ///
    /// Typed `Unauthorized` errors and 401/403 statuses always match. Other
    /// API statuses never do; their bodies are upstream text. Transport and
    /// decoding failures match when their text carries an auth signature.
    pub fn is_credential_failure(&self) -> bool {
        match self {
            GenerationError::Unauthorized(_) => true,
            GenerationError::Api { status, .. } => *status == 401 || *status == 403,
            other => mentions_credentials(&other.to_string()),
        }
    }
}

/// Case-insensitive check for an authentication signature in failure text.
pub fn mentions_credentials(message: &str) -> bool {
    let lower = message.to_lowercase();
    AUTH_SIGNATURES.iter().any(|sig| lower.contains(sig))
}
