//! Request/response calls to the backend

use super::wire::{ContentDescriptor, ErrorBody, QuestionRequest, UploadRequest};
use super::TransportError;
use reqwest::{Client, Response};
use std::time::{Duration, Instant};

const UPLOAD_PATH: &str = "/api/upload";
const ASK_QUESTION_PATH: &str = "/api/ask_question";

/// HTTP side of the transport adapter.
///
/// Every call is single-shot: no retry, and no timeout beyond the one the
/// client was built with.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Submit a content URL for processing
    pub async fn submit_url(&self, url: &str) -> Result<ContentDescriptor, TransportError> {
        let start = Instant::now();
        let result = async {
            let response = self
                .client
                .post(self.endpoint(UPLOAD_PATH))
                .json(&UploadRequest {
                    video_url: url.to_string(),
                })
                .send()
                .await?;
            let response = check_status(response).await?;
            Ok::<_, TransportError>(response.json::<ContentDescriptor>().await?)
        }
        .await;

        log_outcome(UPLOAD_PATH, start, &result);
        result
    }

    /// Ask a question about the submitted content. The response body is
    /// discarded; replies arrive over the push channel.
    pub async fn ask_question(&self, text: &str) -> Result<(), TransportError> {
        let start = Instant::now();
        let result = async {
            let response = self
                .client
                .post(self.endpoint(ASK_QUESTION_PATH))
                .json(&QuestionRequest {
                    question: text.to_string(),
                })
                .send()
                .await?;
            check_status(response).await?;
            Ok::<_, TransportError>(())
        }
        .await;

        log_outcome(ASK_QUESTION_PATH, start, &result);
        result
    }
}

/// Turn a non-success status into an error, preferring the server's own
/// `error` message when the body carries one.
async fn check_status(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body).map_or_else(
        |_| {
            if body.is_empty() {
                format!("HTTP {status}")
            } else {
                format!("HTTP {status}: {body}")
            }
        },
        |e| e.error,
    );
    Err(TransportError::status(status.as_u16(), message))
}

fn log_outcome<T>(path: &str, start: Instant, result: &Result<T, TransportError>) {
    let duration = start.elapsed();
    match result {
        Ok(_) => {
            tracing::info!(
                path,
                duration_ms = %duration.as_millis(),
                "Request completed"
            );
        }
        Err(e) => {
            tracing::error!(
                path,
                duration_ms = %duration.as_millis(),
                kind = ?e.kind,
                status = ?e.status,
                error = %e.message,
                "Request failed"
            );
        }
    }
}
