//! Pipeline service coordinating extraction, aggregation, and answer synthesis.

use crate::{
    config::{Config, PipelineLimits},
    ingest::{
        aggregate::{AggregatedContext, aggregate},
        extract::Extractor,
        format::{self, FileKind},
        types::{
            AskResponse, ExtractionError, ExtractionRecord, OcrReport, PipelineError,
            UploadedFile,
        },
    },
    metrics::{MetricsSnapshot, PipelineMetrics},
    ocr::{OcrChain, OcrInput},
    synthesis::{
        AnswerClient, GeminiClient, SynthesisRequest,
        prompt::{PromptMode, build_diagnostic_answer, build_prompt, error_summary},
    },
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Runs uploads through extraction, aggregation, and synthesis.
///
/// Holds no per-request state: each invocation owns its records and context, so one instance
/// is shared by every request behind an `Arc`.
pub struct PipelineService {
    extractor: Extractor,
    ocr: Arc<OcrChain>,
    answer_client: Option<Box<dyn AnswerClient>>,
    limits: PipelineLimits,
    metrics: Arc<PipelineMetrics>,
}

/// Abstraction over the pipeline used by external surfaces (HTTP, CLI).
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Extract every upload and answer the question over the aggregated content.
    async fn ask(
        &self,
        question: &str,
        files: Vec<UploadedFile>,
    ) -> Result<AskResponse, PipelineError>;

    /// Run the OCR fallback chain directly on a single upload.
    async fn ocr(&self, file: UploadedFile) -> Result<OcrReport, ExtractionError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl PipelineService {
    /// Build the service from explicit collaborators.
    ///
    /// Passing `None` for the answer client selects extraction-only responses.
    pub fn new(
        limits: PipelineLimits,
        ocr: OcrChain,
        answer_client: Option<Box<dyn AnswerClient>>,
    ) -> Self {
        let metrics = Arc::new(PipelineMetrics::new());
        let ocr = Arc::new(ocr);
        Self {
            extractor: Extractor::new(limits, ocr.clone(), metrics.clone()),
            ocr,
            answer_client,
            limits,
            metrics,
        }
    }

    /// Build the service with the configured OCR chain and answering client.
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let ocr = OcrChain::from_config(config)
            .map_err(|error| PipelineError::Client(error.to_string()))?;
        let answer_client: Option<Box<dyn AnswerClient>> = match &config.answer_api_key {
            Some(api_key) => {
                let client = GeminiClient::new(
                    config.answer_api_url.clone(),
                    config.answer_model.clone(),
                    api_key.clone(),
                    Duration::from_secs(config.answer_timeout_secs),
                )
                .map_err(|error| PipelineError::Client(error.to_string()))?;
                Some(Box::new(client))
            }
            None => {
                tracing::info!("No answering service credential; running in extraction-only mode");
                None
            }
        };
        Ok(Self::new(config.limits, ocr, answer_client))
    }

    /// Extract uploads and aggregate their content without synthesizing an answer.
    pub async fn extract(
        &self,
        files: Vec<UploadedFile>,
    ) -> (Vec<ExtractionRecord>, AggregatedContext) {
        let records = self.extractor.extract_all(files).await;
        let context = aggregate(&records, &self.limits);
        (records, context)
    }
}

#[async_trait]
impl PipelineApi for PipelineService {
    async fn ask(
        &self,
        question: &str,
        files: Vec<UploadedFile>,
    ) -> Result<AskResponse, PipelineError> {
        self.metrics.record_request();
        let file_count = files.len();
        let (records, context) = self.extract(files).await;
        let summaries = records.iter().map(ExtractionRecord::summary).collect();
        tracing::info!(
            files = file_count,
            text_chars = context.text.chars().count(),
            images = context.images.len(),
            "Aggregated uploaded content"
        );

        let Some(mode) = PromptMode::select(&context) else {
            self.metrics.record_diagnostic();
            tracing::warn!(files = file_count, "No content extracted; returning diagnostic answer");
            return Ok(AskResponse {
                extracted: context.text,
                answer: Some(build_diagnostic_answer(&records)),
                files: summaries,
                error: error_summary(&records),
            });
        };

        let Some(client) = &self.answer_client else {
            tracing::debug!("Extraction-only response");
            return Ok(AskResponse {
                extracted: context.text,
                answer: None,
                files: summaries,
                error: None,
            });
        };

        let prompt = build_prompt(mode, question, &context);
        let AggregatedContext { text, images } = context;
        let request = SynthesisRequest::new(prompt, images);
        self.metrics.record_synthesis();
        tracing::debug!(mode = ?mode, images = request.images.len(), "Synthesizing answer");
        let answer = client.generate_answer(&request).await.inspect_err(|error| {
            tracing::error!(error = %error, "Answer synthesis failed");
        })?;

        Ok(AskResponse {
            extracted: text,
            answer,
            files: summaries,
            error: None,
        })
    }

    async fn ocr(&self, file: UploadedFile) -> Result<OcrReport, ExtractionError> {
        if file.content.is_empty() {
            return Err(ExtractionError::MalformedInput(format!(
                "{} is empty",
                file.name
            )));
        }
        if file.content.len() > self.limits.max_file_bytes {
            return Err(ExtractionError::MalformedInput(format!(
                "file is {} bytes, above the {} byte limit",
                file.content.len(),
                self.limits.max_file_bytes
            )));
        }
        let is_pdf = format::detect(&file.name) == FileKind::Pdf;
        self.metrics.record_ocr();
        let outcome = self
            .ocr
            .recognize(&OcrInput {
                name: &file.name,
                bytes: &file.content,
                is_pdf,
            })
            .await;
        Ok(OcrReport {
            name: file.name,
            text: outcome.text,
            strategy: outcome.strategy,
        })
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
