//! Text extraction

use lopdf::Document;

use super::error::{PdfError, PdfResult};

/// Extract the visible text of every page, in document order.
///
/// Layout is not preserved: each text object ends with a line break and
/// nothing else is inferred about columns or spacing.
pub fn extract_text(bytes: &[u8]) -> PdfResult<String> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| PdfError::MalformedDocument(e.to_string()))?;

    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    if page_numbers.is_empty() {
        return Ok(String::new());
    }

    doc.extract_text(&page_numbers)
        .map_err(|e| PdfError::TextExtractionError(e.to_string()))
}
