//! OCR fallback chain for images and scanned PDFs.
//!
//! Strategies are tried strictly in order: the hosted OCR service first, then the local
//! Tesseract engine. A strategy that errors or returns blank text hands over to the next one,
//! and the chain itself always resolves to a string (possibly empty).

mod hosted;
mod tesseract;

pub use hosted::HostedOcr;
pub use tesseract::TesseractOcr;

use crate::config::Config;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Failures internal to a single OCR strategy. Never escapes [`OcrChain::recognize`].
#[derive(Debug, Error)]
pub enum OcrError {
    /// Strategy cannot run: missing credential or missing engine binary.
    #[error("OCR unavailable: {0}")]
    Unavailable(String),
    /// Network failure or non-success status from the hosted service.
    #[error("OCR request failed: {0}")]
    Transport(String),
    /// Hosted service responded with a body we could not use.
    #[error("Malformed OCR response: {0}")]
    InvalidResponse(String),
    /// The engine ran but produced no text.
    #[error("OCR produced no text")]
    Empty,
    /// The local engine failed while processing the input.
    #[error("OCR engine failed: {0}")]
    Engine(String),
}

/// Bytes handed to an OCR strategy.
#[derive(Debug, Clone, Copy)]
pub struct OcrInput<'a> {
    /// Source file name, forwarded to the hosted service for type sniffing.
    pub name: &'a str,
    /// Raw file contents.
    pub bytes: &'a [u8],
    /// `true` when the bytes are a PDF rather than a raster image.
    pub is_pdf: bool,
}

/// One text-recognition strategy in the fallback chain.
#[async_trait]
pub trait OcrStrategy: Send + Sync {
    /// Stable identifier reported alongside recognized text.
    fn name(&self) -> &'static str;

    /// Recognize text in the input.
    async fn recognize(&self, input: &OcrInput<'_>) -> Result<String, OcrError>;
}

/// Text recognized by the chain and the strategy that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OcrOutcome {
    /// Recognized text; empty when every strategy came back empty.
    pub text: String,
    /// Name of the strategy whose result was used.
    pub strategy: Option<&'static str>,
}

/// Ordered list of OCR strategies.
pub struct OcrChain {
    strategies: Vec<Box<dyn OcrStrategy>>,
}

impl OcrChain {
    /// Build a chain from explicit strategies, tried in the given order.
    pub fn new(strategies: Vec<Box<dyn OcrStrategy>>) -> Self {
        Self { strategies }
    }

    /// Hosted OCR followed by local Tesseract, as configured.
    pub fn from_config(config: &Config) -> Result<Self, OcrError> {
        let hosted = HostedOcr::new(
            config.ocr_api_url.clone(),
            config.ocr_api_key.clone(),
            config.ocr_language.clone(),
            Duration::from_secs(config.ocr_timeout_secs),
        )?;
        let local = TesseractOcr::new(
            config.tesseract_bin.clone(),
            config.pdftoppm_bin.clone(),
            config.ocr_language.clone(),
        );
        Ok(Self::new(vec![Box::new(hosted), Box::new(local)]))
    }

    /// Run strategies in order until one yields non-blank text.
    pub async fn recognize(&self, input: &OcrInput<'_>) -> OcrOutcome {
        for strategy in &self.strategies {
            match strategy.recognize(input).await {
                Ok(text) if !text.trim().is_empty() => {
                    info!(
                        file = input.name,
                        strategy = strategy.name(),
                        chars = text.len(),
                        "OCR succeeded"
                    );
                    return OcrOutcome {
                        text: text.trim().to_string(),
                        strategy: Some(strategy.name()),
                    };
                }
                Ok(_) => {
                    debug!(file = input.name, strategy = strategy.name(), "OCR returned no text");
                }
                Err(error) => {
                    warn!(
                        file = input.name,
                        strategy = strategy.name(),
                        error = %error,
                        "OCR strategy failed; falling back"
                    );
                }
            }
        }
        OcrOutcome::default()
    }
}
