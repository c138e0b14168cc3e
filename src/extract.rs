//! Plain-text extraction for binary documents.
//!
//! The processor hands over raw bytes and the document kind; this module
//! returns UTF-8 text or an [`IngestionError`]. It never panics on
//! malformed input.

use crate::error::IngestionError;

/// Extract the text layer of a PDF.
pub fn extract_pdf(source_id: &str, bytes: &[u8]) -> Result<String, IngestionError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| IngestionError::Pdf {
        source_id: source_id.to_string(),
        message: e.to_string(),
    })
}

/// Decode bytes as UTF-8, tolerating a leading byte-order mark.
pub fn decode_utf8(source_id: &str, bytes: Vec<u8>) -> Result<String, IngestionError> {
    let text = String::from_utf8(bytes).map_err(|_| IngestionError::Encoding {
        source_id: source_id.to_string(),
    })?;
    Ok(match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    })
}
