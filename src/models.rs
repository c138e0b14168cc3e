//! Core data models used throughout the pipeline.
//!
//! These types represent the source documents, chunks, index records, and
//! conversation turns that flow between ingestion, retrieval, and
//! generation.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Format of a raw artifact to ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Text,
    Markdown,
    Structured,
}

impl DocumentKind {
    /// Map a file extension (without the dot) to a kind.
    ///
    /// Returns `None` for unsupported extensions, which directory ingestion
    /// skips silently.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "txt" | "text" => Some(DocumentKind::Text),
            "md" | "markdown" | "mdx" => Some(DocumentKind::Markdown),
            "json" => Some(DocumentKind::Structured),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Text => "text",
            DocumentKind::Markdown => "markdown",
            DocumentKind::Structured => "structured",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pdf" => Some(DocumentKind::Pdf),
            "text" => Some(DocumentKind::Text),
            "markdown" => Some(DocumentKind::Markdown),
            "structured" => Some(DocumentKind::Structured),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw payload of a source document.
#[derive(Debug, Clone)]
pub enum RawContent {
    Text(String),
    Bytes(Vec<u8>),
}

/// Raw artifact handed to the document processor.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Provenance identifier (file path or record id).
    pub source: String,
    pub kind: DocumentKind,
    pub content: RawContent,
}

impl SourceDocument {
    pub fn text(source: impl Into<String>, kind: DocumentKind, body: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            kind,
            content: RawContent::Text(body.into()),
        }
    }
}

/// A bounded span of source text tagged with provenance.
///
/// `chunk_index < total_chunks` always holds; both are fixed per document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    pub text: String,
    pub source: String,
    pub kind: DocumentKind,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

impl Chunk {
    /// Deterministic record id for this chunk.
    ///
    /// Derived from `(source, chunk_index, text)`, so re-ingesting unchanged
    /// content upserts the same record and changed content gets a new one.
    pub fn record_id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.source.as_bytes());
        hasher.update(b"\0");
        hasher.update(self.chunk_index.to_le_bytes());
        hasher.update(b"\0");
        hasher.update(self.text.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        format!("chunk-{}", &digest[..32])
    }
}

/// Payload stored beside a vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub text: String,
    pub source: String,
    pub kind: DocumentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,
}

/// A vector plus provenance, as upserted into the index.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: RecordMetadata,
}

impl EmbeddingRecord {
    pub fn from_chunk(chunk: &Chunk, vector: Vec<f32>) -> Self {
        Self {
            id: chunk.record_id(),
            vector,
            metadata: RecordMetadata {
                text: chunk.text.clone(),
                source: chunk.source.clone(),
                kind: chunk.kind,
                chunk_index: Some(chunk.chunk_index),
            },
        }
    }
}

/// A nearest-neighbor hit returned by a vector index.
///
/// `metadata` may be absent for records written by other tools; such
/// matches are dropped during retrieval.
#[derive(Debug, Clone)]
pub struct IndexMatch {
    pub id: String,
    pub score: f32,
    pub metadata: Option<RecordMetadata>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One caller-owned conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
