//! Sentence-accumulating text chunker with word overlap.
//!
//! Splits document text into bounded pieces suitable for embedding. Free
//! text and PDF bodies go through [`chunk_text`]; markdown goes through
//! [`chunk_markdown`], which first splits at headings.
//!
//! # Algorithm
//!
//! 1. Normalize: collapse 3+ consecutive newlines to 2, collapse every
//!    whitespace run to a single space, trim.
//! 2. Split into sentence-like units after each run of `.`, `!`, `?`.
//!    Text without a boundary is a single unit; a trailing remainder
//!    without terminal punctuation is kept as the last unit.
//! 3. Accumulate units into a buffer. When the next unit would push a
//!    non-empty buffer past `chunk_size` characters, close the buffer as a
//!    chunk and seed the next one with the closed chunk's trailing
//!    `chunk_overlap / 5` words.
//! 4. Flush the remaining buffer.
//!
//! # Example
//!
//! ```rust
//! use portfolio_rag::chunk::{chunk_text, ChunkSettings};
//!
//! let pieces = chunk_text("Hello world. Second sentence!", &ChunkSettings::default());
//! assert_eq!(pieces, vec!["Hello world. Second sentence!".to_string()]);
//! ```

/// Approximate characters per word used to turn a character overlap into
/// a word count.
pub const CHARS_PER_WORD: usize = 5;

/// Chunk size and overlap, both in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl ChunkSettings {
    /// Number of trailing words carried into the next chunk.
    pub fn overlap_words(&self) -> usize {
        self.chunk_overlap / CHARS_PER_WORD
    }
}

/// Whitespace normalization applied before splitting.
pub fn normalize(text: &str) -> String {
    let mut collapsed = String::with_capacity(text.len());
    let mut newline_run = 0usize;
    for ch in text.chars() {
        if ch == '\n' {
            newline_run += 1;
            if newline_run <= 2 {
                collapsed.push(ch);
            }
        } else {
            newline_run = 0;
            collapsed.push(ch);
        }
    }
    collapsed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split normalized text into sentence-like units.
///
/// Units keep their leading whitespace, so concatenating them reproduces
/// the input exactly.
pub fn split_units(text: &str) -> Vec<&str> {
    let mut units = Vec::new();
    let mut start = 0usize;
    let mut chars = text.char_indices().peekable();

    while let Some((i, ch)) = chars.next() {
        if !is_terminal(ch) {
            continue;
        }
        let mut end = i + ch.len_utf8();
        while let Some(&(j, next)) = chars.peek() {
            if !is_terminal(next) {
                break;
            }
            end = j + next.len_utf8();
            chars.next();
        }
        units.push(&text[start..end]);
        start = end;
    }

    if !text[start..].trim().is_empty() {
        units.push(&text[start..]);
    }
    if units.is_empty() && !text.is_empty() {
        units.push(text);
    }
    units
}

fn is_terminal(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?')
}

/// Chunk free text. Returns an empty list for blank input.
pub fn chunk_text(text: &str, settings: &ChunkSettings) -> Vec<String> {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return Vec::new();
    }

    let overlap_words = settings.overlap_words();
    let mut chunks: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut buf_chars = 0usize;

    for unit in split_units(&normalized) {
        let unit_chars = unit.chars().count();

        if buf_chars > 0 && buf_chars + unit_chars > settings.chunk_size {
            let closed = buf.trim().to_string();
            let seed = trailing_words(&closed, overlap_words);
            chunks.push(closed);

            buf.clear();
            if !seed.is_empty() {
                buf.push_str(&seed);
                buf.push(' ');
            }
            buf.push_str(unit.trim_start());
            buf_chars = buf.chars().count();
        } else {
            buf.push_str(unit);
            buf_chars += unit_chars;
        }
    }

    let rest = buf.trim();
    if !rest.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}

/// Chunk markdown: split at headings, then chunk oversized sections.
///
/// Sections no longer than `chunk_size` are emitted verbatim (trimmed) so
/// their line structure survives.
pub fn chunk_markdown(text: &str, settings: &ChunkSettings) -> Vec<String> {
    let mut chunks = Vec::new();
    for section in split_sections(text) {
        if section.chars().count() > settings.chunk_size {
            chunks.extend(chunk_text(&section, settings));
        } else {
            chunks.push(section);
        }
    }
    chunks
}

/// Split markdown at each `#`..`######` heading line.
///
/// Each section starts with its heading; text before the first heading is
/// a section of its own. Blank sections are dropped. Lines inside fenced
/// code blocks never start a section.
pub fn split_sections(text: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut fence: Option<&str> = None;

    for line in text.lines() {
        let marker = fence_marker(line);
        match (fence, marker) {
            (None, Some(open)) => fence = Some(open),
            (Some(open), Some(close)) if close.starts_with(open) => fence = None,
            _ => {}
        }
        if fence.is_none() && marker.is_none() && is_heading(line) && !current.is_empty() {
            push_section(&mut sections, &current);
            current.clear();
        }
        current.push(line);
    }
    push_section(&mut sections, &current);
    sections
}

fn push_section(sections: &mut Vec<String>, lines: &[&str]) {
    let section = lines.join("\n");
    let trimmed = section.trim();
    if !trimmed.is_empty() {
        sections.push(trimmed.to_string());
    }
}

/// The run of backticks or tildes opening a code fence, if `line` is one.
fn fence_marker(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let ch = trimmed.chars().next().filter(|&c| c == '`' || c == '~')?;
    let len = trimmed.chars().take_while(|&c| c == ch).count();
    (len >= 3).then(|| &trimmed[..len])
}

fn is_heading(line: &str) -> bool {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if !(1..=6).contains(&hashes) {
        return false;
    }
    match line[hashes..].chars().next() {
        None => true,
        Some(c) => c.is_whitespace(),
    }
}

/// The last `n` space-separated words of `text`.
fn trailing_words(text: &str, n: usize) -> String {
    if n == 0 {
        return String::new();
    }
    let words: Vec<&str> = text.split(' ').collect();
    let skip = words.len().saturating_sub(n);
    words[skip..].join(" ")
}
