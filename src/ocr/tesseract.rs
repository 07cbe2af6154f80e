//! Local OCR strategy backed by the Tesseract command-line engine.
//!
//! Raster images are written to a temporary file and passed to Tesseract directly. PDFs are
//! first rasterized page by page with `pdftoppm` (Poppler).

use super::{OcrError, OcrInput, OcrStrategy};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;
use tracing::debug;

/// Runs Tesseract on the input bytes.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    tesseract_bin: String,
    pdftoppm_bin: String,
    language: String,
}

impl TesseractOcr {
    /// Build the strategy around the given executables.
    pub fn new(tesseract_bin: String, pdftoppm_bin: String, language: String) -> Self {
        Self {
            tesseract_bin,
            pdftoppm_bin,
            language,
        }
    }

    fn recognize_blocking(&self, bytes: &[u8], is_pdf: bool) -> Result<String, OcrError> {
        let workdir = TempDir::new().map_err(|error| OcrError::Engine(error.to_string()))?;
        let input_name = if is_pdf { "input.pdf" } else { "input.img" };
        let input_path = workdir.path().join(input_name);
        std::fs::write(&input_path, bytes).map_err(|error| OcrError::Engine(error.to_string()))?;

        if !is_pdf {
            return self.run_tesseract(&input_path);
        }

        let pages = self.rasterize_pdf(&input_path, workdir.path())?;
        debug!(pages = pages.len(), "Rasterized PDF for OCR");
        let mut texts = Vec::with_capacity(pages.len());
        for page in &pages {
            let text = self.run_tesseract(page)?;
            if !text.trim().is_empty() {
                texts.push(text.trim().to_string());
            }
        }
        Ok(texts.join("\n"))
    }

    fn run_tesseract(&self, image_path: &Path) -> Result<String, OcrError> {
        let output = Command::new(&self.tesseract_bin)
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &self.language])
            .output();
        stdout_or_error(output, &self.tesseract_bin)
    }

    fn rasterize_pdf(&self, pdf_path: &Path, output_dir: &Path) -> Result<Vec<PathBuf>, OcrError> {
        let output = Command::new(&self.pdftoppm_bin)
            .args(["-png", "-r", "300"])
            .arg(pdf_path)
            .arg(output_dir.join("page"))
            .output();
        stdout_or_error(output, &self.pdftoppm_bin)?;

        let mut pages: Vec<PathBuf> = std::fs::read_dir(output_dir)
            .map_err(|error| OcrError::Engine(error.to_string()))?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with("page") && name.ends_with(".png"))
            })
            .collect();
        // pdftoppm zero-pads page numbers, so lexical order is page order.
        pages.sort();
        if pages.is_empty() {
            return Err(OcrError::Engine("pdftoppm produced no page images".into()));
        }
        Ok(pages)
    }
}

fn stdout_or_error(result: std::io::Result<Output>, tool: &str) -> Result<String, OcrError> {
    match result {
        Ok(output) if output.status.success() => {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        Ok(output) => Err(OcrError::Engine(format!(
            "{tool} failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ))),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            Err(OcrError::Unavailable(format!("{tool} not found on PATH")))
        }
        Err(error) => Err(OcrError::Engine(format!("{tool}: {error}"))),
    }
}

#[async_trait]
impl OcrStrategy for TesseractOcr {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    async fn recognize(&self, input: &OcrInput<'_>) -> Result<String, OcrError> {
        let engine = self.clone();
        let bytes = input.bytes.to_vec();
        let is_pdf = input.is_pdf;
        tokio::task::spawn_blocking(move || engine.recognize_blocking(&bytes, is_pdf))
            .await
            .map_err(|error| OcrError::Engine(format!("OCR task failed: {error}")))?
    }
}
