//! Document processor: raw source material in, [`Chunk`]s out.
//!
//! Dispatches on [`DocumentKind`]:
//!
//! | Kind | Handling |
//! |------|----------|
//! | `text` | [`chunk_text`] |
//! | `pdf` | text layer via [`extract_pdf`], then [`chunk_text`] |
//! | `markdown` | [`chunk_markdown`] (heading sections) |
//! | `structured` | parsed as [`StructuredContent`], one chunk per record |
//!
//! Chunk indices are assigned per document after splitting, so they are
//! contiguous from 0 and `total_chunks` equals the chunk count.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::chunk::{chunk_markdown, chunk_text, ChunkSettings};
use crate::content::StructuredContent;
use crate::error::IngestionError;
use crate::extract::{decode_utf8, extract_pdf};
use crate::models::{Chunk, DocumentKind, RawContent, SourceDocument};

#[derive(Debug, Clone, Default)]
pub struct DocumentProcessor {
    settings: ChunkSettings,
}

impl DocumentProcessor {
    pub fn new(settings: ChunkSettings) -> Self {
        Self { settings }
    }

    /// Chunk a single source document.
    pub fn process(&self, doc: &SourceDocument) -> Result<Vec<Chunk>, IngestionError> {
        if doc.kind == DocumentKind::Structured {
            let json = self.body_text(doc)?;
            let content = StructuredContent::from_json(&doc.source, &json)?;
            return Ok(self.process_structured(&content));
        }

        let pieces = match doc.kind {
            DocumentKind::Markdown => chunk_markdown(&self.body_text(doc)?, &self.settings),
            _ => chunk_text(&self.body_text(doc)?, &self.settings),
        };
        Ok(index_pieces(&doc.source, doc.kind, pieces))
    }

    /// Read and chunk one file, dispatching on its extension.
    ///
    /// Returns `Ok(None)` for unsupported extensions.
    pub fn process_path(
        &self,
        path: &Path,
        source_id: &str,
    ) -> Result<Option<Vec<Chunk>>, IngestionError> {
        let Some(kind) = kind_for_path(path) else {
            return Ok(None);
        };
        let bytes = std::fs::read(path).map_err(|source| IngestionError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let doc = SourceDocument {
            source: source_id.to_string(),
            kind,
            content: RawContent::Bytes(bytes),
        };
        self.process(&doc).map(Some)
    }

    /// Recursively chunk every supported file under `root`.
    ///
    /// The first failing file aborts the walk and its error is returned.
    /// Callers that prefer to skip bad files can drive [`walk`] and
    /// [`process_path`](Self::process_path) themselves.
    pub fn process_directory(&self, root: &Path) -> Result<Vec<Chunk>, IngestionError> {
        let mut chunks = Vec::new();
        for path in discover(root)? {
            let source_id = relative_source_id(root, &path);
            if let Some(mut file_chunks) = self.process_path(&path, &source_id)? {
                chunks.append(&mut file_chunks);
            }
        }
        Ok(chunks)
    }

    /// One chunk per about/project/experience/education record.
    ///
    /// Records are never split by size; each is its own provenance unit.
    pub fn process_structured(&self, content: &StructuredContent) -> Vec<Chunk> {
        content
            .identified_records()
            .into_iter()
            .map(|(source, record)| Chunk {
                text: record.render(),
                source,
                kind: DocumentKind::Structured,
                chunk_index: 0,
                total_chunks: 1,
            })
            .collect()
    }

    fn body_text(&self, doc: &SourceDocument) -> Result<String, IngestionError> {
        match (&doc.content, doc.kind) {
            (RawContent::Text(text), _) => Ok(text.clone()),
            (RawContent::Bytes(bytes), DocumentKind::Pdf) => extract_pdf(&doc.source, bytes),
            (RawContent::Bytes(bytes), _) => decode_utf8(&doc.source, bytes.clone()),
        }
    }
}

/// Supported files under `root`, depth-first, sorted by file name.
///
/// Unreadable entries are yielded as errors in walk order so callers can
/// choose to stop or skip.
pub fn walk(root: &Path) -> impl Iterator<Item = Result<PathBuf, IngestionError>> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_file() && kind_for_path(entry.path()).is_some() => {
                Some(Ok(entry.into_path()))
            }
            Ok(_) => None,
            Err(e) => Some(Err(IngestionError::Walk {
                path: e.path().map(Path::to_path_buf).unwrap_or_default(),
                message: e.to_string(),
            })),
        })
}

/// Every supported file under `root`, failing on the first unreadable entry.
pub fn discover(root: &Path) -> Result<Vec<PathBuf>, IngestionError> {
    walk(root).collect()
}

pub fn kind_for_path(path: &Path) -> Option<DocumentKind> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(DocumentKind::from_extension)
}

pub fn relative_source_id(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn index_pieces(source: &str, kind: DocumentKind, pieces: Vec<String>) -> Vec<Chunk> {
    let total = pieces.len();
    pieces
        .into_iter()
        .enumerate()
        .map(|(i, text)| Chunk {
            text,
            source: source.to_string(),
            kind,
            chunk_index: i,
            total_chunks: total,
        })
        .collect()
}
