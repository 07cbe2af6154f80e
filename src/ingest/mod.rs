//! Upload ingestion: format detection, per-file extraction, aggregation, and the pipeline
//! service that ties them to answer synthesis.

pub mod aggregate;
pub mod extract;
pub mod format;
pub mod office;
pub mod pdf;
mod service;
pub mod types;

#[cfg(test)]
mod fixtures;

pub use aggregate::{AggregatedContext, aggregate};
pub use extract::Extractor;
pub use format::FileKind;
pub use service::{PipelineApi, PipelineService};
pub use types::{
    AskResponse, ExtractionError, ExtractionRecord, FileSummary, ImagePart, OcrReport,
    PipelineError, UploadedFile,
};
