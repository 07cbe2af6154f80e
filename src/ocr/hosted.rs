//! Hosted OCR strategy (OCR.space-compatible multipart API).

use super::{OcrError, OcrInput, OcrStrategy};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Calls the hosted OCR endpoint with the raw bytes and a language hint.
pub struct HostedOcr {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
    language: String,
}

impl HostedOcr {
    /// Build the strategy. A missing `api_key` makes every call report [`OcrError::Unavailable`]
    /// without touching the network.
    pub fn new(
        endpoint: String,
        api_key: Option<String>,
        language: String,
        timeout: Duration,
    ) -> Result<Self, OcrError> {
        let http = Client::builder()
            .user_agent("askfiles/ocr")
            .timeout(timeout)
            .build()
            .map_err(|error| OcrError::Unavailable(format!("HTTP client error: {error}")))?;
        Ok(Self {
            http,
            endpoint,
            api_key,
            language,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HostedOcrResponse {
    #[serde(default)]
    parsed_results: Option<Vec<ParsedResult>>,
    #[serde(default)]
    is_errored_on_processing: bool,
    #[serde(default)]
    error_message: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParsedResult {
    #[serde(default)]
    parsed_text: Option<String>,
}

impl HostedOcrResponse {
    fn into_text(self) -> Result<String, OcrError> {
        let pages: Vec<String> = self
            .parsed_results
            .unwrap_or_default()
            .into_iter()
            .filter_map(|result| result.parsed_text)
            .filter(|text| !text.trim().is_empty())
            .collect();
        if !pages.is_empty() {
            return Ok(pages.join("\n"));
        }

        match self.error_message.as_ref().and_then(describe_error) {
            Some(message) => Err(OcrError::InvalidResponse(message)),
            None if self.is_errored_on_processing => Err(OcrError::InvalidResponse(
                "service reported a processing error".into(),
            )),
            None => Err(OcrError::Empty),
        }
    }
}

/// `ErrorMessage` arrives either as a string or as a list of strings.
fn describe_error(value: &Value) -> Option<String> {
    match value {
        Value::String(message) if !message.trim().is_empty() => Some(message.clone()),
        Value::Array(items) => {
            let messages: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}

#[async_trait]
impl OcrStrategy for HostedOcr {
    fn name(&self) -> &'static str {
        "hosted"
    }

    async fn recognize(&self, input: &OcrInput<'_>) -> Result<String, OcrError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(OcrError::Unavailable("no hosted OCR API key configured".into()));
        };

        let part = Part::bytes(input.bytes.to_vec()).file_name(input.name.to_string());
        let form = Form::new()
            .text("apikey", api_key.to_string())
            .text("language", self.language.clone())
            .part("file", part);

        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|error| OcrError::Transport(format!("failed to reach OCR service: {error}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::Transport(format!("OCR service returned {status}: {body}")));
        }

        let body: HostedOcrResponse = response.json().await.map_err(|error| {
            OcrError::InvalidResponse(format!("failed to decode OCR response: {error}"))
        })?;
        body.into_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;

    const INPUT: OcrInput<'static> = OcrInput {
        name: "receipt.png",
        bytes: b"fake png bytes",
        is_pdf: false,
    };

    fn client(server: &MockServer, api_key: Option<&str>) -> HostedOcr {
        HostedOcr::new(
            server.url("/parse/image"),
            api_key.map(str::to_string),
            "eng".into(),
            Duration::from_secs(5),
        )
        .expect("client")
    }

    #[tokio::test]
    async fn joins_parsed_pages_with_newlines() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/parse/image")
                    .body_contains("eng")
                    .body_contains("receipt.png");
                then.status(200).json_body(json!({
                    "ParsedResults": [
                        { "ParsedText": "Total: 42" },
                        { "ParsedText": "" },
                        { "ParsedText": "Thank you" }
                    ],
                    "IsErroredOnProcessing": false
                }));
            })
            .await;

        let text = client(&server, Some("secret"))
            .recognize(&INPUT)
            .await
            .expect("ocr text");

        mock.assert_async().await;
        assert_eq!(text, "Total: 42\nThank you");
    }

    #[tokio::test]
    async fn missing_key_skips_network() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/parse/image");
                then.status(200).json_body(json!({ "ParsedResults": [] }));
            })
            .await;

        let error = client(&server, None).recognize(&INPUT).await.unwrap_err();

        assert!(matches!(error, OcrError::Unavailable(_)));
        assert_eq!(mock.hits_async().await, 0);
    }

    #[tokio::test]
    async fn empty_results_are_reported_as_empty() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/parse/image");
                then.status(200).json_body(json!({ "ParsedResults": [] }));
            })
            .await;

        let error = client(&server, Some("secret"))
            .recognize(&INPUT)
            .await
            .unwrap_err();
        assert!(matches!(error, OcrError::Empty));
    }

    #[tokio::test]
    async fn error_message_list_is_surfaced() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/parse/image");
                then.status(200).json_body(json!({
                    "ParsedResults": null,
                    "IsErroredOnProcessing": true,
                    "ErrorMessage": ["Unable to recognize the file type"]
                }));
            })
            .await;

        let error = client(&server, Some("secret"))
            .recognize(&INPUT)
            .await
            .unwrap_err();
        assert!(
            matches!(error, OcrError::InvalidResponse(message) if message.contains("file type"))
        );
    }

    #[tokio::test]
    async fn server_errors_are_transport_failures() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/parse/image");
                then.status(503).body("down");
            })
            .await;

        let error = client(&server, Some("secret"))
            .recognize(&INPUT)
            .await
            .unwrap_err();
        assert!(matches!(error, OcrError::Transport(message) if message.contains("503")));
    }
}
