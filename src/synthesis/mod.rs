//! Answer synthesis against an external multimodal model.
//!
//! The request carries the prompt text first, then one inline payload per image in aggregation
//! order. Generation parameters are fixed. The client mirrors the other outbound adapters: a
//! trait at the seam and a `reqwest` implementation behind it.

pub mod prompt;

use crate::ingest::ImagePart;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the answering service.
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// The request never produced a response.
    #[error("failed to reach answering service: {0}")]
    Transport(String),
    /// The service answered with a non-success status.
    #[error("answering service returned {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the service.
        status: StatusCode,
        /// Response body, for diagnostics.
        body: String,
    },
    /// The response body could not be decoded.
    #[error("malformed answering service response: {0}")]
    InvalidResponse(String),
}

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Sampling temperature.
    pub temperature: f32,
    /// Top-k sampling cutoff.
    pub top_k: u32,
    /// Nucleus sampling cutoff.
    pub top_p: f32,
    /// Upper bound on generated tokens.
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.4,
            top_k: 32,
            top_p: 1.0,
            max_output_tokens: 8192,
        }
    }
}

/// Externally bound payload, built fresh for each invocation.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    /// Prompt text: question plus context framing.
    pub prompt: String,
    /// Images attached after the prompt, in aggregation order.
    pub images: Vec<ImagePart>,
    /// Sampling parameters.
    pub generation: GenerationConfig,
}

impl SynthesisRequest {
    /// Build a request with the fixed generation parameters.
    pub fn new(prompt: String, images: Vec<ImagePart>) -> Self {
        Self {
            prompt,
            images,
            generation: GenerationConfig::default(),
        }
    }

    /// Wire body for `generateContent`.
    pub fn to_body(&self) -> GenerateContentBody<'_> {
        let mut parts = Vec::with_capacity(1 + self.images.len());
        parts.push(RequestPart::Text { text: &self.prompt });
        parts.extend(self.images.iter().map(|image| RequestPart::InlineData {
            inline_data: InlineData {
                mime_type: &image.mime_type,
                data: &image.data,
            },
        }));
        GenerateContentBody {
            contents: vec![RequestContent { parts }],
            generation_config: self.generation,
        }
    }
}

/// Serialized request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentBody<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// First candidate's first text part.
    fn into_answer(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text)
    }
}

/// Interface implemented by answering-service backends.
#[async_trait]
pub trait AnswerClient: Send + Sync {
    /// Send the request and return the answer text, if the service produced one.
    async fn generate_answer(
        &self,
        request: &SynthesisRequest,
    ) -> Result<Option<String>, SynthesisError>;
}

/// Client for a Gemini-style `generateContent` endpoint.
pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    /// Build a client with an explicit request timeout.
    pub fn new(
        base_url: String,
        model: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, SynthesisError> {
        let http = Client::builder()
            .user_agent("askfiles/answer")
            .timeout(timeout)
            .build()
            .map_err(|error| SynthesisError::Transport(format!("HTTP client error: {error}")))?;
        Ok(Self {
            http,
            base_url,
            model,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl AnswerClient for GeminiClient {
    async fn generate_answer(
        &self,
        request: &SynthesisRequest,
    ) -> Result<Option<String>, SynthesisError> {
        tracing::debug!(
            model = %self.model,
            prompt_chars = request.prompt.len(),
            images = request.images.len(),
            "Calling answering service"
        );
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request.to_body())
            .send()
            .await
            .map_err(|error| SynthesisError::Transport(error.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisError::UnexpectedStatus { status, body });
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|error| SynthesisError::InvalidResponse(error.to_string()))?;
        Ok(body.into_answer())
    }
}
