//! Ingestion command glue.
//!
//! Coordinates the bulk flow: discover files → chunk → embed → upsert.
//! Used by `folio ingest` and `folio chunk`. Per-file failures either abort
//! the run or are reported and skipped (`--keep-going`); embedding and
//! index failures always stop at the failing batch.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::config::Config;
use crate::content::StructuredContent;
use crate::embedding::{create_provider, EmbeddingProvider};
use crate::error::IngestionError;
use crate::index::create_index;
use crate::models::Chunk;
use crate::processor::{relative_source_id, walk, DocumentProcessor};
use crate::store::ContextStore;

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    pub keep_going: bool,
    pub dry_run: bool,
    pub no_content: bool,
}

/// Chunks gathered from disk plus the files that were skipped.
#[derive(Debug, Default)]
pub struct Collected {
    pub files: usize,
    pub chunks: Vec<Chunk>,
    pub skipped: Vec<(PathBuf, IngestionError)>,
}

/// Chunk a file or every supported file under a directory.
///
/// Without `keep_going` the first [`IngestionError`] is returned; with it
/// the failure is recorded in [`Collected::skipped`] and the walk continues.
pub fn collect_chunks(
    processor: &DocumentProcessor,
    path: &Path,
    keep_going: bool,
) -> Result<Collected, IngestionError> {
    collect_chunks_excluding(processor, path, keep_going, &[])
}

/// Like [`collect_chunks`], leaving out any file in `exclude`.
pub fn collect_chunks_excluding(
    processor: &DocumentProcessor,
    path: &Path,
    keep_going: bool,
    exclude: &[PathBuf],
) -> Result<Collected, IngestionError> {
    let excluded: Vec<PathBuf> = exclude.iter().map(|p| canonical(p)).collect();
    let (root, files): (PathBuf, Vec<Result<PathBuf, IngestionError>>) = if path.is_dir() {
        (path.to_path_buf(), walk(path).collect())
    } else {
        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        (root, vec![Ok(path.to_path_buf())])
    };

    let mut collected = Collected::default();
    for file in files {
        let outcome = file.and_then(|file| {
            if excluded.contains(&canonical(&file)) {
                return Ok(None);
            }
            processor.process_path(&file, &relative_source_id(&root, &file))
        });
        match outcome {
            Ok(Some(mut chunks)) => {
                collected.files += 1;
                collected.chunks.append(&mut chunks);
            }
            Ok(None) => {}
            Err(e) if keep_going => {
                warn!("skipping: {}", e);
                collected.skipped.push((failed_path(&e, &root), e));
            }
            Err(e) => return Err(e),
        }
    }
    Ok(collected)
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn failed_path(err: &IngestionError, root: &Path) -> PathBuf {
    match err {
        IngestionError::Read { path, .. } | IngestionError::Walk { path, .. } => path.clone(),
        IngestionError::Pdf { source_id, .. }
        | IngestionError::Encoding { source_id }
        | IngestionError::Structured { source_id, .. } => root.join(source_id),
    }
}

/// `folio chunk <path>`: print chunks without calling any backend.
pub fn run_chunk(config: &Config, path: &Path) -> Result<()> {
    let processor = DocumentProcessor::new(config.chunking.settings());
    let collected = collect_chunks(&processor, path, false)?;

    for chunk in &collected.chunks {
        println!(
            "── {} [{}/{}] ({}, {} chars)",
            chunk.source,
            chunk.chunk_index + 1,
            chunk.total_chunks,
            chunk.kind,
            chunk.text.chars().count()
        );
        println!("{}", chunk.text);
        println!();
    }
    println!(
        "{} files, {} chunks",
        collected.files,
        collected.chunks.len()
    );
    Ok(())
}

/// `folio ingest <path>`: chunk, embed and upsert.
pub async fn run_ingest(config: &Config, path: &Path, opts: IngestOptions) -> Result<()> {
    let processor = DocumentProcessor::new(config.chunking.settings());
    // The [content] file is ingested as records below, not as a walked document.
    let exclude = if opts.no_content {
        Vec::new()
    } else {
        vec![config.content.path.clone()]
    };
    let mut collected = collect_chunks_excluding(&processor, path, opts.keep_going, &exclude)?;

    if !opts.no_content {
        let content_path = &config.content.path;
        match StructuredContent::load(content_path) {
            Ok(content) => {
                let mut records = processor.process_structured(&content);
                info!(
                    records = records.len(),
                    path = %content_path.display(),
                    "structured content loaded"
                );
                collected.chunks.append(&mut records);
            }
            Err(e) if opts.keep_going => {
                warn!("skipping structured content: {}", e);
                collected.skipped.push((content_path.clone(), e));
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!(
                        "Failed to load structured content (pass --no-content to skip): {}",
                        content_path.display()
                    )
                })
            }
        }
    }

    if opts.dry_run {
        println!("ingest {} (dry-run)", path.display());
        println!("  files: {}", collected.files);
        println!("  chunks: {}", collected.chunks.len());
        println!("  skipped: {}", collected.skipped.len());
        return Ok(());
    }

    let Some(index) = create_index(&config.index).await? else {
        bail!(
            "No vector index available (index.backend = '{}'). \
             Configure a backend and its credentials before ingesting.",
            config.index.backend
        );
    };
    let embedder: Arc<dyn EmbeddingProvider> = Arc::from(create_provider(&config.embedding)?);
    info!(
        model = embedder.model_name(),
        dims = embedder.dims(),
        index = index.name(),
        "embedding chunks"
    );
    let store = ContextStore::new(embedder, Some(index))
        .with_batch_size(config.embedding.batch_size)
        .with_top_k(config.index.top_k);

    let stats = store
        .ingest(&collected.chunks)
        .await
        .context("Ingestion stopped; earlier batches remain committed")?;

    println!("ingest {}", path.display());
    println!("  files: {}", collected.files);
    println!("  chunks: {}", collected.chunks.len());
    println!("  batches committed: {}", stats.batches);
    println!("  records upserted: {}", stats.records);
    if !collected.skipped.is_empty() {
        println!("  skipped:");
        for (file, err) in &collected.skipped {
            println!("    {}: {}", file.display(), err);
        }
    }
    println!("ok");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn single_file_uses_file_name_as_source() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("about.txt");
        std::fs::write(&file, "I write Rust. I like hiking.").unwrap();

        let collected = collect_chunks(&DocumentProcessor::default(), &file, false).unwrap();
        assert_eq!(collected.files, 1);
        assert_eq!(collected.chunks[0].source, "about.txt");
    }

    #[test]
    fn keep_going_records_bad_files() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.txt"), "Fine text.").unwrap();
        std::fs::write(tmp.path().join("b.txt"), [0xff, 0xfe, 0xfd]).unwrap();
        std::fs::write(tmp.path().join("c.md"), "# Title\nBody.").unwrap();

        let processor = DocumentProcessor::default();
        assert!(collect_chunks(&processor, tmp.path(), false).is_err());

        let collected = collect_chunks(&processor, tmp.path(), true).unwrap();
        assert_eq!(collected.files, 2);
        assert_eq!(collected.skipped.len(), 1);
        assert!(collected.skipped[0].0.ends_with("b.txt"));
    }

    #[test]
    fn excluded_file_is_not_walked() {
        let tmp = TempDir::new().unwrap();
        let profile = tmp.path().join("profile.json");
        std::fs::write(
            &profile,
            r#"{"profile": {"name": "A", "title": "B", "bio": "C"}, "contact": {"email": "a@b.c"}}"#,
        )
        .unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "Some notes.").unwrap();

        let processor = DocumentProcessor::default();
        let all = collect_chunks(&processor, tmp.path(), false).unwrap();
        assert_eq!(all.files, 2);

        let relative = tmp.path().join(".").join("profile.json");
        let collected =
            collect_chunks_excluding(&processor, tmp.path(), false, &[relative]).unwrap();
        assert_eq!(collected.files, 1);
        assert!(collected.chunks.iter().all(|c| c.source == "notes.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn keep_going_skips_unreadable_directory() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.txt"), "Readable.").unwrap();
        let locked = tmp.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::write(locked.join("b.txt"), "Hidden.").unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        let readable = std::fs::read_dir(&locked).is_ok();
        let processor = DocumentProcessor::default();
        let strict = collect_chunks(&processor, tmp.path(), false);
        let lenient = collect_chunks(&processor, tmp.path(), true);
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        // Privileged users can read the directory anyway.
        if readable {
            return;
        }
        assert!(matches!(strict, Err(IngestionError::Walk { .. })));
        let lenient = lenient.unwrap();
        assert_eq!(lenient.files, 1);
        assert_eq!(lenient.skipped.len(), 1);
        assert!(lenient.skipped[0].0.ends_with("locked"));
    }
}
