//! HTTP surface for askfiles.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /ask` – Multipart upload of a `question` field plus any number of files. Every file is
//!   extracted, the content is aggregated, and the question is answered over it. Returns
//!   `{ extracted, answer, files, error? }`.
//! - `POST /ocr` – Multipart upload of a single file; runs the OCR fallback chain and returns
//!   `{ name, text, strategy }`.
//! - `GET /metrics` – Observe pipeline counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.

use crate::ingest::{
    AskResponse, ExtractionError, OcrReport, PipelineApi, PipelineError, UploadedFile,
};
use crate::metrics::MetricsSnapshot;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartError},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Upper bound on a whole multipart request body.
pub const MAX_REQUEST_BYTES: usize = 64 * 1024 * 1024;

const QUESTION_FIELD: &str = "question";
const USER_ID_HEADER: &str = "x-user-id";

/// Build the HTTP router exposing the pipeline API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: PipelineApi + 'static,
{
    Router::new()
        .route("/ask", post(ask::<S>))
        .route("/ocr", post(ocr::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
        .with_state(service)
}

/// Question and uploads read from a multipart body, in field order.
#[derive(Default)]
struct AskForm {
    question: Option<String>,
    files: Vec<UploadedFile>,
}

/// Read every field of the form. Fields carrying a file name are uploads.
async fn read_form(multipart: &mut Multipart) -> Result<AskForm, AppError> {
    let mut form = AskForm::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if let Some(file_name) = field.file_name().map(str::to_string) {
            let media_type = field.content_type().map(str::to_string);
            let content = field.bytes().await.map_err(multipart_error)?;
            form.files.push(UploadedFile {
                name: file_name,
                content: content.to_vec(),
                media_type,
            });
        } else if field.name() == Some(QUESTION_FIELD) {
            form.question = Some(field.text().await.map_err(multipart_error)?);
        }
    }
    Ok(form)
}

/// Answer a question over the uploaded files.
///
/// Per-file extraction failures are reported inside the response body. Only a failed call to
/// the answering service turns into a 500.
async fn ask<S>(
    State(service): State<Arc<S>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<AskResponse>, AppError>
where
    S: PipelineApi,
{
    let span = tracing::info_span!(
        "ask",
        request_id = %Uuid::new_v4(),
        user_id = tracing::field::Empty
    );
    if let Some(user_id) = headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        span.record("user_id", user_id);
    }

    async move {
        let form = read_form(&mut multipart).await?;
        let question = form
            .question
            .map(|question| question.trim().to_string())
            .filter(|question| !question.is_empty())
            .ok_or_else(|| AppError::BadRequest("Missing `question` field".into()))?;
        tracing::info!(files = form.files.len(), "Ask request received");

        let response = service.ask(&question, form.files).await?;
        tracing::info!(
            answered = response.answer.is_some(),
            extracted_chars = response.extracted.chars().count(),
            "Ask request completed"
        );
        Ok::<_, AppError>(Json(response))
    }
    .instrument(span)
    .await
}

/// Run the OCR fallback chain on exactly one uploaded file.
async fn ocr<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<OcrReport>, AppError>
where
    S: PipelineApi,
{
    let form = read_form(&mut multipart).await?;
    let mut files = form.files.into_iter();
    let (Some(file), None) = (files.next(), files.next()) else {
        return Err(AppError::BadRequest(
            "Expected exactly one file upload".into(),
        ));
    };
    tracing::info!(file = %file.name, bytes = file.content.len(), "OCR request received");
    let report = service.ocr(file).await?;
    Ok(Json(report))
}

/// Return the pipeline counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: PipelineApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "ask",
                method: "POST",
                path: "/ask",
                description: "Upload files (multipart) with a `question` field. Extracts text from PDF, DOCX, XLSX and text files, attaches images, and answers the question. Response returns { \"extracted\": string, \"answer\": string|null, \"files\": [...] }.",
                request_example: Some(json!({
                    "question": "What is the total on the invoice?",
                    "files": ["invoice.pdf", "receipt.jpg"]
                })),
            },
            CommandDescriptor {
                name: "ocr",
                method: "POST",
                path: "/ocr",
                description: "Upload one image or scanned PDF (multipart) and return its recognized text with the OCR strategy that produced it.",
                request_example: Some(json!({ "file": "scan.png" })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return pipeline counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    BadRequest(String),
    Extraction(ExtractionError),
    Pipeline(PipelineError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Extraction(error) => (StatusCode::BAD_REQUEST, error.to_string()),
            Self::Pipeline(error) => (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(inner: PipelineError) -> Self {
        Self::Pipeline(inner)
    }
}

impl From<ExtractionError> for AppError {
    fn from(inner: ExtractionError) -> Self {
        Self::Extraction(inner)
    }
}

fn multipart_error(error: MultipartError) -> AppError {
    AppError::BadRequest(format!("Malformed multipart body: {error}"))
}

#[cfg(test)]
mod tests {
    use super::{create_router, get_commands};
    use crate::ingest::{
        AskResponse, ExtractionError, FileSummary, OcrReport, PipelineApi, PipelineError,
        UploadedFile,
    };
    use crate::metrics::MetricsSnapshot;
    use crate::synthesis::SynthesisError;
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    const BOUNDARY: &str = "askfiles-test-boundary";

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a [u8]),
    }

    fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File(field, file_name, bytes) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
                             Content-Type: application/octet-stream\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header("x-user-id", "user-7")
            .body(Body::from(multipart_body(parts)))
            .expect("request")
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json body")
    }

    #[tokio::test]
    async fn commands_catalog_exposes_ask_endpoint() {
        let response = get_commands().await;
        let commands = response.0.commands;
        let ask = commands
            .iter()
            .find(|cmd| cmd.name == "ask")
            .expect("ask command present");

        assert_eq!(ask.method, "POST");
        assert_eq!(ask.path, "/ask");
        assert!(commands.iter().any(|cmd| cmd.path == "/ocr"));
    }

    #[tokio::test]
    async fn ask_route_forwards_question_and_files_in_order() {
        let service = Arc::new(StubPipeline::default());
        let app = create_router(service.clone());

        let response = app
            .oneshot(multipart_request(
                "/ask",
                &[
                    Part::File("files", "b.txt", b"second"),
                    Part::Text("question", "  What is inside?  "),
                    Part::File("files", "a.pdf", b"%PDF"),
                ],
            ))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["answer"], "stub answer");
        assert_eq!(json["files"][0]["name"], "b.txt");
        assert_eq!(json["files"][0]["textLength"], 6);
        assert!(json.get("error").is_none());

        let calls = service.calls.lock().await;
        assert_eq!(calls.len(), 1);
        let (question, names) = &calls[0];
        assert_eq!(question, "What is inside?");
        assert_eq!(names, &vec!["b.txt".to_string(), "a.pdf".to_string()]);
    }

    #[tokio::test]
    async fn ask_route_requires_question() {
        let app = create_router(Arc::new(StubPipeline::default()));
        let response = app
            .oneshot(multipart_request(
                "/ask",
                &[Part::File("files", "a.txt", b"text")],
            ))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert!(json["error"].as_str().is_some_and(|e| e.contains("question")));
    }

    #[tokio::test]
    async fn synthesis_failure_maps_to_server_error() {
        let service = Arc::new(StubPipeline {
            fail: true,
            ..StubPipeline::default()
        });
        let app = create_router(service);
        let response = app
            .oneshot(multipart_request(
                "/ask",
                &[
                    Part::Text("question", "q"),
                    Part::File("files", "a.txt", b"text"),
                ],
            ))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_body(response).await;
        assert!(json["error"].as_str().is_some_and(|e| e.contains("timed out")));
    }

    #[tokio::test]
    async fn ocr_route_requires_exactly_one_file() {
        let app = create_router(Arc::new(StubPipeline::default()));
        let response = app
            .clone()
            .oneshot(multipart_request("/ocr", &[Part::Text("question", "q")]))
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .clone()
            .oneshot(multipart_request(
                "/ocr",
                &[
                    Part::File("file", "scan.png", b"png"),
                    Part::File("file", "second.png", b"png"),
                ],
            ))
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["error"], "Expected exactly one file upload");

        let response = app
            .oneshot(multipart_request(
                "/ocr",
                &[Part::File("file", "scan.png", b"png")],
            ))
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["name"], "scan.png");
        assert_eq!(json["strategy"], "stub");
    }

    #[tokio::test]
    async fn metrics_route_serializes_snapshot() {
        let app = create_router(Arc::new(StubPipeline::default()));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["requests"], 3);
        assert_eq!(json["files_failed"], 0);
    }

    #[derive(Default)]
    struct StubPipeline {
        calls: Mutex<Vec<(String, Vec<String>)>>,
        fail: bool,
    }

    #[async_trait]
    impl PipelineApi for StubPipeline {
        async fn ask(
            &self,
            question: &str,
            files: Vec<UploadedFile>,
        ) -> Result<AskResponse, PipelineError> {
            self.calls.lock().await.push((
                question.to_string(),
                files.iter().map(|file| file.name.clone()).collect(),
            ));
            if self.fail {
                return Err(PipelineError::SynthesisFailed(SynthesisError::Transport(
                    "request timed out".into(),
                )));
            }
            Ok(AskResponse {
                extracted: String::new(),
                answer: Some("stub answer".into()),
                files: files
                    .iter()
                    .map(|file| FileSummary {
                        name: file.name.clone(),
                        file_type: String::new(),
                        size: file.content.len(),
                        text_length: file.content.len(),
                        error: None,
                        scanned: false,
                        notice: None,
                    })
                    .collect(),
                error: None,
            })
        }

        async fn ocr(&self, file: UploadedFile) -> Result<OcrReport, ExtractionError> {
            Ok(OcrReport {
                name: file.name,
                text: "recognized".into(),
                strategy: Some("stub"),
            })
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                requests: 3,
                ..MetricsSnapshot::default()
            }
        }
    }
}
