//! Per-file extraction orchestrator.
//!
//! Each upload is classified, dispatched to exactly one extractor, and turned into an
//! [`ExtractionRecord`]. Extractor errors are recorded on the file's record and never abort the
//! batch. Files are processed concurrently up to the configured limit while records keep
//! upload order.

use crate::config::PipelineLimits;
use crate::ingest::format::{self, FileKind};
use crate::ingest::office::{extract_docx, extract_xlsx};
use crate::ingest::pdf::extract_pdf;
use crate::ingest::types::{ExtractionError, ExtractionRecord, ImagePart, UploadedFile};
use crate::metrics::PipelineMetrics;
use crate::ocr::{OcrChain, OcrInput};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

/// Content produced by a single extractor.
#[derive(Debug, Default)]
struct Extracted {
    text: String,
    page_count: Option<u32>,
    is_scanned: bool,
    notice: Option<String>,
    image: Option<ImagePart>,
}

impl Extracted {
    fn text(text: String) -> Self {
        Self {
            text,
            ..Self::default()
        }
    }
}

/// Dispatches uploads to format extractors.
pub struct Extractor {
    limits: PipelineLimits,
    ocr: Arc<OcrChain>,
    metrics: Arc<PipelineMetrics>,
}

impl Extractor {
    /// Build an orchestrator with injected budgets and OCR chain.
    pub fn new(limits: PipelineLimits, ocr: Arc<OcrChain>, metrics: Arc<PipelineMetrics>) -> Self {
        Self {
            limits,
            ocr,
            metrics,
        }
    }

    /// Extract every upload, returning one record per file in input order.
    pub async fn extract_all(&self, files: Vec<UploadedFile>) -> Vec<ExtractionRecord> {
        let concurrency = self.limits.extraction_concurrency.max(1);
        stream::iter(files)
            .map(|file| self.extract_file(file))
            .buffered(concurrency)
            .collect()
            .await
    }

    /// Extract a single upload. Never fails: errors land in the record.
    pub async fn extract_file(&self, file: UploadedFile) -> ExtractionRecord {
        let extension = format::extension_of(&file.name);
        let kind = format::classify_extension(&extension);
        let mut record = ExtractionRecord::new(&file.name, extension, kind, file.content.len());
        debug!(
            file = %file.name,
            kind = kind.as_str(),
            bytes = record.byte_size,
            media_type = ?file.media_type,
            "Extracting file"
        );

        match self.dispatch(kind, &record.extension, file).await {
            Ok(extracted) => {
                record.text = extracted.text;
                record.page_count = extracted.page_count;
                record.is_scanned = extracted.is_scanned;
                record.notice = extracted.notice;
                record.image = extracted.image;
            }
            Err(error) => {
                warn!(file = %record.name, kind = kind.as_str(), error = %error, "File extraction failed");
                record.error = Some(error.to_string());
            }
        }

        self.metrics.record_file(record.error.is_some(), record.is_scanned);
        record
    }

    async fn dispatch(
        &self,
        kind: FileKind,
        extension: &str,
        file: UploadedFile,
    ) -> Result<Extracted, ExtractionError> {
        if kind == FileKind::Unsupported {
            debug!(file = %file.name, "Skipping unsupported file type");
            return Ok(Extracted::default());
        }
        if file.content.len() > self.limits.max_file_bytes {
            return Err(ExtractionError::MalformedInput(format!(
                "file is {} bytes, above the {} byte limit",
                file.content.len(),
                self.limits.max_file_bytes
            )));
        }

        match kind {
            FileKind::Pdf => self.extract_pdf_file(file).await,
            FileKind::Docx => {
                run_blocking(move || extract_docx(&file.content).map(Extracted::text)).await
            }
            FileKind::Xlsx => {
                run_blocking(move || extract_xlsx(&file.content).map(Extracted::text)).await
            }
            FileKind::Text => decode_text(&file.content).map(Extracted::text),
            FileKind::Image => encode_image(&file, extension),
            FileKind::Unsupported => Ok(Extracted::default()),
        }
    }

    async fn extract_pdf_file(&self, file: UploadedFile) -> Result<Extracted, ExtractionError> {
        let UploadedFile { name, content, .. } = file;
        let (content, result) = run_blocking(move || {
            let result = extract_pdf(&content);
            Ok((content, result))
        })
        .await?;
        let pdf = result?;

        let mut extracted = Extracted {
            text: pdf.text,
            page_count: Some(pdf.page_count),
            is_scanned: pdf.is_scanned,
            notice: pdf.notice,
            image: None,
        };

        if pdf.is_scanned && self.limits.ocr_scanned_pdfs {
            self.metrics.record_ocr();
            let outcome = self
                .ocr
                .recognize(&OcrInput {
                    name: &name,
                    bytes: &content,
                    is_pdf: true,
                })
                .await;
            if let Some(strategy) = outcome.strategy {
                debug!(file = %name, strategy, "Recovered scanned PDF text via OCR");
                extracted.text = outcome.text;
                extracted.notice = Some(format!(
                    "Scanned PDF ({} page(s)); text recovered with {strategy} OCR.",
                    pdf.page_count
                ));
            }
        }
        Ok(extracted)
    }
}

/// Run a CPU-bound decoder off the async runtime; a panicking decoder becomes a per-file failure.
async fn run_blocking<T, F>(task: F) -> Result<T, ExtractionError>
where
    F: FnOnce() -> Result<T, ExtractionError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|error| ExtractionError::ExtractionFailed(format!("decoder task failed: {error}")))?
}

fn decode_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    if bytes.is_empty() {
        return Err(ExtractionError::MalformedInput("empty text file".into()));
    }
    let text = String::from_utf8_lossy(bytes);
    Ok(text.strip_prefix('\u{feff}').unwrap_or(&text).to_string())
}

fn encode_image(file: &UploadedFile, extension: &str) -> Result<Extracted, ExtractionError> {
    if file.content.is_empty() {
        return Err(ExtractionError::MalformedInput("empty image file".into()));
    }
    let mime_type = format::image_mime(extension);
    Ok(Extracted {
        text: image_placeholder(&file.name),
        image: Some(ImagePart {
            name: file.name.clone(),
            mime_type: mime_type.to_string(),
            data: BASE64.encode(&file.content),
        }),
        ..Extracted::default()
    })
}

/// Marker stored as the text of image records.
pub fn image_placeholder(name: &str) -> String {
    format!("[Image: {name}]")
}
