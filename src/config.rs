use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Default base URL of the multimodal answering service.
pub const DEFAULT_ANSWER_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Default model identifier passed to the answering service.
pub const DEFAULT_ANSWER_MODEL: &str = "gemini-1.5-flash";
/// Default endpoint of the hosted OCR service.
pub const DEFAULT_OCR_API_URL: &str = "https://api.ocr.space/parse/image";
/// Per-source character budget applied by the context aggregator.
pub const DEFAULT_MAX_CHARS_PER_FILE: usize = 20_000;
/// Upload size cap applied to each file.
pub const DEFAULT_MAX_FILE_BYTES: usize = 5 * 1024 * 1024;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the askfiles server and CLI.
#[derive(Debug, Clone)]
pub struct Config {
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Credential for the answering service; `None` selects extraction-only responses.
    pub answer_api_key: Option<String>,
    /// Base URL of the answering service.
    pub answer_api_url: String,
    /// Model identifier used for answer synthesis.
    pub answer_model: String,
    /// Request timeout for the answering service, in seconds.
    pub answer_timeout_secs: u64,
    /// Credential for the hosted OCR service; `None` skips straight to local OCR.
    pub ocr_api_key: Option<String>,
    /// Endpoint of the hosted OCR service.
    pub ocr_api_url: String,
    /// Language hint sent to both OCR engines.
    pub ocr_language: String,
    /// Request timeout for the hosted OCR service, in seconds.
    pub ocr_timeout_secs: u64,
    /// Tesseract executable used by the local OCR engine.
    pub tesseract_bin: String,
    /// Poppler rasterizer used to feed PDF pages to Tesseract.
    pub pdftoppm_bin: String,
    /// Budgets injected into the extraction pipeline.
    pub limits: PipelineLimits,
}

/// Immutable budgets consumed by the orchestrator and the context aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineLimits {
    /// Maximum characters kept from each source in the aggregated context.
    pub max_chars_per_file: usize,
    /// Maximum accepted size of a single upload, in bytes.
    pub max_file_bytes: usize,
    /// Number of files extracted concurrently.
    pub extraction_concurrency: usize,
    /// Run the OCR fallback chain on PDFs without a text layer.
    pub ocr_scanned_pdfs: bool,
}

impl Default for PipelineLimits {
    fn default() -> Self {
        Self {
            max_chars_per_file: DEFAULT_MAX_CHARS_PER_FILE,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            extraction_concurrency: default_concurrency(),
            ocr_scanned_pdfs: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = PipelineLimits::default();
        Ok(Self {
            server_port: parse_optional("SERVER_PORT")?,
            answer_api_key: load_env_optional("ANSWER_API_KEY"),
            answer_api_url: load_env_or("ANSWER_API_URL", DEFAULT_ANSWER_API_URL),
            answer_model: load_env_or("ANSWER_MODEL", DEFAULT_ANSWER_MODEL),
            answer_timeout_secs: parse_optional("ANSWER_TIMEOUT_SECS")?.unwrap_or(120),
            ocr_api_key: load_env_optional("OCR_API_KEY"),
            ocr_api_url: load_env_or("OCR_API_URL", DEFAULT_OCR_API_URL),
            ocr_language: load_env_or("OCR_LANGUAGE", "eng"),
            ocr_timeout_secs: parse_optional("OCR_TIMEOUT_SECS")?.unwrap_or(60),
            tesseract_bin: load_env_or("TESSERACT_BIN", "tesseract"),
            pdftoppm_bin: load_env_or("PDFTOPPM_BIN", "pdftoppm"),
            limits: PipelineLimits {
                max_chars_per_file: parse_optional("MAX_CHARS_PER_FILE")?
                    .unwrap_or(defaults.max_chars_per_file),
                max_file_bytes: parse_optional("MAX_FILE_BYTES")?
                    .unwrap_or(defaults.max_file_bytes),
                extraction_concurrency: parse_optional::<usize>("EXTRACTION_CONCURRENCY")?
                    .unwrap_or(defaults.extraction_concurrency)
                    .max(1),
                ocr_scanned_pdfs: parse_optional_bool("OCR_SCANNED_PDFS")?
                    .unwrap_or(defaults.ocr_scanned_pdfs),
            },
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: None,
            answer_api_key: None,
            answer_api_url: DEFAULT_ANSWER_API_URL.to_string(),
            answer_model: DEFAULT_ANSWER_MODEL.to_string(),
            answer_timeout_secs: 120,
            ocr_api_key: None,
            ocr_api_url: DEFAULT_OCR_API_URL.to_string(),
            ocr_language: "eng".to_string(),
            ocr_timeout_secs: 60,
            tesseract_bin: "tesseract".to_string(),
            pdftoppm_bin: "pdftoppm".to_string(),
            limits: PipelineLimits::default(),
        }
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|value| value.get())
        .unwrap_or(4)
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_env_or(key: &str, default: &str) -> String {
    load_env_optional(key).unwrap_or_else(|| default.to_string())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

fn parse_optional_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    load_env_optional(key)
        .map(|value| parse_bool(&value).ok_or_else(|| ConfigError::InvalidValue(key.to_string())))
        .transpose()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        server_port = ?config.server_port,
        answer_model = %config.answer_model,
        has_answer_key = config.answer_api_key.is_some(),
        has_ocr_key = config.ocr_api_key.is_some(),
        limits = ?config.limits,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
