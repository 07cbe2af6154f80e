#![deny(missing_docs)]

//! Core library for the askfiles upload-and-ask service.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Upload ingestion pipeline: detection, extraction, and aggregation.
pub mod ingest;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline metrics helpers.
pub mod metrics;
/// OCR fallback chain for images and scanned PDFs.
pub mod ocr;
/// Prompt construction and the answering-service client.
pub mod synthesis;
