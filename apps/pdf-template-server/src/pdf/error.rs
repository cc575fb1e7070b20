//! PDF error types

use thiserror::Error;

/// Errors raised while reading or writing PDF documents
#[derive(Debug, Error)]
pub enum PdfError {
    /// Bytes could not be parsed as a PDF
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// Document parsed but has no pages to work on
    #[error("Document has no pages")]
    NoPages,

    /// Text extraction failed on a parsed document
    #[error("Text extraction error: {0}")]
    TextExtractionError(String),

    /// Failed to build or serialize output
    #[error("Render error: {0}")]
    RenderError(String),

    #[error("PDF error: {0}")]
    Lopdf(#[from] lopdf::Error),
}

/// Result type alias for PDF operations
pub type PdfResult<T> = std::result::Result<T, PdfError>;
