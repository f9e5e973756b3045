//! Remote OCR engine: multipart POST of the encoded image to an HTTP
//! endpoint returning JSON `{"text": ...}`. Connection pooling via reqwest,
//! bounded retry ladder, cancellation-aware waits.

use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use image::DynamicImage;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{OcrBackend, OcrError, OcrRequest};

const DEFAULT_ENDPOINT: &str = "http://localhost:5000/ocr";

/// HTTP OCR service client.
pub struct HttpOcrClient {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpOcrClient {
    /// Client for the default local service endpoint.
    pub fn new() -> Result<Self, OcrError> {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self, OcrError> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| OcrError::BackendUnavailable(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    /// Send the multipart request with retry.
    /// 429: Retry-After or 1s/2s/4s (max 3).
    /// 5xx: exponential backoff (max 2).
    /// Timeout: immediate retry once.
    async fn send_with_retry(
        &self,
        png_bytes: &[u8],
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response, OcrError> {
        let mut attempt: u32 = 0;
        let max_429_retries: u32 = 3;
        let max_5xx_retries: u32 = 2;
        let mut timeout_retried = false;

        loop {
            if cancel.is_cancelled() {
                return Err(OcrError::Cancelled);
            }

            // multipart::Form is consumed per send; rebuild from the bytes
            // on every attempt.
            let part = reqwest::multipart::Part::bytes(png_bytes.to_vec())
                .file_name("surface.png")
                .mime_str("image/png")
                .map_err(|e| OcrError::ProcessingFailed(format!("multipart: {e}")))?;
            let form = reqwest::multipart::Form::new().part("file", part);

            let result = self.http.post(&self.endpoint).multipart(form).send().await;

            match result {
                Ok(resp) if resp.status().is_success() => {
                    return Ok(resp);
                }
                Ok(resp) if resp.status().as_u16() == 429 => {
                    if attempt >= max_429_retries {
                        return Err(OcrError::BackendUnavailable(
                            "rate limited by OCR service".into(),
                        ));
                    }
                    let wait = resp
                        .headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .map(Duration::from_secs)
                        .unwrap_or_else(|| Duration::from_secs(1 << attempt));
                    warn!(attempt, wait_ms = wait.as_millis() as u64, "429 rate limited, retrying");
                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {}
                        _ = cancel.cancelled() => return Err(OcrError::Cancelled),
                    }
                    attempt += 1;
                }
                Ok(resp) if resp.status().is_server_error() => {
                    if attempt >= max_5xx_retries {
                        return Err(OcrError::BackendUnavailable(format!(
                            "server error: {}",
                            resp.status()
                        )));
                    }
                    let wait = Duration::from_millis(500 * (1 << attempt));
                    warn!(
                        attempt,
                        status = resp.status().as_u16(),
                        wait_ms = wait.as_millis() as u64,
                        "5xx error, retrying"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {}
                        _ = cancel.cancelled() => return Err(OcrError::Cancelled),
                    }
                    attempt += 1;
                }
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    return Err(OcrError::BackendUnavailable(format!(
                        "unexpected status {}: {}",
                        status,
                        body.chars().take(200).collect::<String>()
                    )));
                }
                Err(e) if e.is_timeout() => {
                    if timeout_retried {
                        return Err(OcrError::BackendUnavailable("request timeout".into()));
                    }
                    warn!("request timeout, retrying once");
                    timeout_retried = true;
                }
                Err(e) => {
                    return Err(OcrError::BackendUnavailable(e.to_string()));
                }
            }
        }
    }
}

#[async_trait]
impl OcrBackend for HttpOcrClient {
    async fn recognize(
        &self,
        request: &OcrRequest,
        image: &DynamicImage,
        cancel: &CancellationToken,
    ) -> Result<String, OcrError> {
        if cancel.is_cancelled() {
            return Err(OcrError::Cancelled);
        }

        let png_bytes = encode_png(image).await?;

        let response = tokio::select! {
            r = self.send_with_retry(&png_bytes, cancel) => r?,
            _ = cancel.cancelled() => return Err(OcrError::Cancelled),
        };

        let parsed: RemoteOcrResponse = response
            .json()
            .await
            .map_err(|e| OcrError::ProcessingFailed(format!("bad response body: {e}")))?;

        let text = parsed.text.unwrap_or_default();
        debug!(request_id = %request.request_id, chars = text.len(), "remote OCR complete");
        Ok(text)
    }

    fn label(&self) -> &str {
        "ocr-http"
    }
}

/// Encode the (possibly cropped) pixel buffer as PNG off the async thread.
async fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, OcrError> {
    let owned = image.clone();
    tokio::task::spawn_blocking(move || {
        let mut buffer = Cursor::new(Vec::new());
        owned
            .write_to(&mut buffer, image::ImageFormat::Png)
            .map_err(|e| OcrError::ProcessingFailed(format!("png encode: {e}")))?;
        Ok(buffer.into_inner())
    })
    .await
    .map_err(|e| OcrError::ProcessingFailed(format!("encode task panicked: {e}")))?
}

#[derive(Deserialize)]
struct RemoteOcrResponse {
    text: Option<String>,
}
