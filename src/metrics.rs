use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing pipeline activity since startup.
#[derive(Default)]
pub struct PipelineMetrics {
    requests: AtomicU64,
    files_processed: AtomicU64,
    files_failed: AtomicU64,
    scanned_pdfs: AtomicU64,
    ocr_runs: AtomicU64,
    synthesis_calls: AtomicU64,
    diagnostic_answers: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pipeline invocation.
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one extracted file and whether it ended in an error or as a scanned PDF.
    pub fn record_file(&self, failed: bool, scanned: bool) {
        self.files_processed.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.files_failed.fetch_add(1, Ordering::Relaxed);
        }
        if scanned {
            self.scanned_pdfs.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a run of the OCR fallback chain.
    pub fn record_ocr(&self) {
        self.ocr_runs.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an outbound call to the answering service.
    pub fn record_synthesis(&self) {
        self.synthesis_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a locally generated diagnostic answer.
    pub fn record_diagnostic(&self) {
        self.diagnostic_answers.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            files_processed: self.files_processed.load(Ordering::Relaxed),
            files_failed: self.files_failed.load(Ordering::Relaxed),
            scanned_pdfs: self.scanned_pdfs.load(Ordering::Relaxed),
            ocr_runs: self.ocr_runs.load(Ordering::Relaxed),
            synthesis_calls: self.synthesis_calls.load(Ordering::Relaxed),
            diagnostic_answers: self.diagnostic_answers.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Pipeline invocations since startup.
    pub requests: u64,
    /// Files that went through extraction.
    pub files_processed: u64,
    /// Files whose record carries an error.
    pub files_failed: u64,
    /// PDFs detected as having no text layer.
    pub scanned_pdfs: u64,
    /// Runs of the OCR fallback chain.
    pub ocr_runs: u64,
    /// Calls made to the answering service.
    pub synthesis_calls: u64,
    /// Diagnostic answers produced without calling the answering service.
    pub diagnostic_answers: u64,
}
