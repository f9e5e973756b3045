//! Text-recognition backends. Both engines sit behind [`OcrBackend`] and the
//! extraction pipeline treats them uniformly: pixels in, text out.

pub mod cache;
pub mod local;
pub mod remote;

use async_trait::async_trait;
use image::DynamicImage;
use tokio_util::sync::CancellationToken;

/// Metadata attached to one recognition call, for log correlation and stale
/// result detection.
#[derive(Debug, Clone)]
pub struct OcrRequest {
    pub request_id: String,
    pub generation: u64,
}

impl OcrRequest {
    pub fn new(generation: u64) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            generation,
        }
    }
}

#[derive(Debug)]
pub enum OcrError {
    /// The engine cannot be reached (missing binary, network/HTTP failure).
    BackendUnavailable(String),
    /// The engine ran but failed to produce text.
    ProcessingFailed(String),
    Cancelled,
}

impl std::fmt::Display for OcrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OcrError::BackendUnavailable(msg) => write!(f, "OCR backend unavailable: {msg}"),
            OcrError::ProcessingFailed(msg) => write!(f, "OCR processing failed: {msg}"),
            OcrError::Cancelled => write!(f, "OCR request cancelled"),
        }
    }
}

/// A text-recognition capability. Implementations must treat zero-area
/// input as empty text rather than an error, so the pipeline keeps a single
/// dispatch path for full-image and cropped-region extraction.
#[async_trait]
pub trait OcrBackend: Send + Sync {
    async fn recognize(
        &self,
        request: &OcrRequest,
        image: &DynamicImage,
        cancel: &CancellationToken,
    ) -> Result<String, OcrError>;

    /// Stable engine label, used for logging and cache keying.
    fn label(&self) -> &str;
}
