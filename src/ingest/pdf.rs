//! PDF text extraction with scanned-document detection.
//!
//! Page counts come from `lopdf`, text from `pdf-extract`. A PDF that parses but yields no text is
//! reported as scanned, which is a successful extraction of zero content rather than an error.

use crate::ingest::types::ExtractionError;
use lopdf::Document;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::debug;

/// Leading bytes of every PDF file.
pub const PDF_SIGNATURE: &[u8] = b"%PDF";

/// Result of a successful PDF extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfExtraction {
    /// Extracted text; empty for scanned documents.
    pub text: String,
    /// Number of pages in the document.
    pub page_count: u32,
    /// `true` when the document has no extractable text layer.
    pub is_scanned: bool,
    /// Human-readable explanation for scanned documents.
    pub notice: Option<String>,
}

/// Extract text from PDF bytes.
///
/// Empty input and a missing `%PDF` signature fail with [`ExtractionError::MalformedInput`];
/// parser failures (including parser panics) become [`ExtractionError::ExtractionFailed`].
pub fn extract_pdf(bytes: &[u8]) -> Result<PdfExtraction, ExtractionError> {
    validate_signature(bytes)?;

    let page_count = count_pages(bytes)?;
    let text = extract_text(bytes)?;

    if text.trim().is_empty() {
        debug!(page_count, "PDF has no text layer");
        return Ok(PdfExtraction {
            text: String::new(),
            page_count,
            is_scanned: true,
            notice: Some(scanned_notice(page_count)),
        });
    }

    Ok(PdfExtraction {
        text,
        page_count,
        is_scanned: false,
        notice: None,
    })
}

/// Reject empty buffers and buffers that do not start with the PDF signature.
pub fn validate_signature(bytes: &[u8]) -> Result<(), ExtractionError> {
    if bytes.is_empty() {
        return Err(ExtractionError::MalformedInput("empty PDF buffer".into()));
    }
    if !bytes.starts_with(PDF_SIGNATURE) {
        return Err(ExtractionError::MalformedInput(
            "missing %PDF signature; the file is not a PDF or is corrupted".into(),
        ));
    }
    Ok(())
}

fn count_pages(bytes: &[u8]) -> Result<u32, ExtractionError> {
    let document = Document::load_mem(bytes)
        .map_err(|error| ExtractionError::ExtractionFailed(format!("PDF parse error: {error}")))?;
    Ok(document.get_pages().len() as u32)
}

fn extract_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    // pdf-extract panics on some malformed streams.
    match catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(error)) => Err(ExtractionError::ExtractionFailed(format!(
            "PDF text extraction error: {error}"
        ))),
        Err(_) => Err(ExtractionError::ExtractionFailed(
            "PDF text extraction aborted on a corrupt stream".into(),
        )),
    }
}

fn scanned_notice(page_count: u32) -> String {
    let pages = if page_count == 1 { "page" } else { "pages" };
    format!(
        "Scanned PDF ({page_count} {pages}) with no extractable text layer. \
         The pages are probably images; run OCR or upload them as images."
    )
}
