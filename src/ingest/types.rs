//! Core data types and error definitions for the ingestion pipeline.

use crate::ingest::format::FileKind;
use crate::synthesis::SynthesisError;
use serde::Serialize;
use thiserror::Error;

/// Per-file failures. Both variants are caught at the orchestrator boundary and recorded on the
/// file's [`ExtractionRecord`]; neither aborts the batch.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Input bytes are empty, oversized, or do not match the declared format.
    #[error("Malformed input: {0}")]
    MalformedInput(String),
    /// The format decoder rejected the content.
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),
}

/// Errors that abort a whole pipeline invocation.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The answering service call failed; synthesis runs over the aggregate so this is fatal.
    #[error("Answer synthesis failed: {0}")]
    SynthesisFailed(#[from] SynthesisError),
    /// An outbound HTTP client could not be constructed at startup.
    #[error("Failed to initialize HTTP client: {0}")]
    Client(String),
}

/// A file received from the caller. Consumed once by the orchestrator and never persisted.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-supplied file name, used for format detection.
    pub name: String,
    /// Raw file contents.
    pub content: Vec<u8>,
    /// Media type declared by the client, if any.
    pub media_type: Option<String>,
}

impl UploadedFile {
    /// Build an upload without a declared media type.
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            media_type: None,
        }
    }
}

/// Inline image payload forwarded to the answering service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePart {
    /// Source file name.
    pub name: String,
    /// Resolved MIME type.
    pub mime_type: String,
    /// Base64-encoded image bytes.
    pub data: String,
}

/// Outcome of extracting a single upload. Exactly one record exists per upload, in upload order.
#[derive(Debug, Clone)]
pub struct ExtractionRecord {
    /// File name as uploaded.
    pub name: String,
    /// Lowercased extension without the dot; empty when the name has none.
    pub extension: String,
    /// Classification assigned by the format detector.
    pub kind: FileKind,
    /// Extracted text, possibly empty. Images carry a placeholder marker.
    pub text: String,
    /// Size of the upload in bytes.
    pub byte_size: usize,
    /// Diagnostic for a per-file failure.
    pub error: Option<String>,
    /// Set for PDFs that carry no text layer.
    pub is_scanned: bool,
    /// Page count reported by the PDF parser.
    pub page_count: Option<u32>,
    /// Non-error explanation attached to the record (e.g. scanned PDF notice).
    pub notice: Option<String>,
    /// Inline payload produced for image uploads only.
    pub image: Option<ImagePart>,
}

impl ExtractionRecord {
    /// Start an empty record for an upload.
    pub fn new(name: &str, extension: String, kind: FileKind, byte_size: usize) -> Self {
        Self {
            name: name.to_string(),
            extension,
            kind,
            text: String::new(),
            byte_size,
            error: None,
            is_scanned: false,
            page_count: None,
            notice: None,
            image: None,
        }
    }

    /// Length of the extracted text in characters.
    pub fn text_length(&self) -> usize {
        self.text.chars().count()
    }

    /// Caller-facing view of the record.
    pub fn summary(&self) -> FileSummary {
        FileSummary {
            name: self.name.clone(),
            file_type: self.extension.clone(),
            size: self.byte_size,
            text_length: self.text_length(),
            error: self.error.clone(),
            scanned: self.is_scanned,
            notice: self.notice.clone(),
        }
    }
}

/// Per-file entry of the caller response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    /// File name as uploaded.
    pub name: String,
    /// Lowercased extension.
    #[serde(rename = "type")]
    pub file_type: String,
    /// Upload size in bytes.
    pub size: usize,
    /// Extracted text length in characters.
    pub text_length: usize,
    /// Per-file diagnostic, `null` when extraction succeeded.
    pub error: Option<String>,
    /// Present and `true` for PDFs without a text layer.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub scanned: bool,
    /// Non-error explanation, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

/// Response returned to the caller of the ask pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct AskResponse {
    /// Aggregated context text.
    pub extracted: String,
    /// Synthesized answer; `null` in extraction-only mode.
    pub answer: Option<String>,
    /// One entry per upload, in upload order.
    pub files: Vec<FileSummary>,
    /// Per-file errors joined into one line when no content could be extracted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response of the direct OCR operation.
#[derive(Debug, Clone, Serialize)]
pub struct OcrReport {
    /// File name as uploaded.
    pub name: String,
    /// Recognized text, possibly empty.
    pub text: String,
    /// Strategy that produced the text, `null` when every strategy came back empty.
    pub strategy: Option<&'static str>,
}
