//! Local OCR engine driving the system `tesseract` binary.
//! Availability is probed once at construction; recognition runs on the
//! blocking pool since the CLI call is synchronous.

use std::collections::HashMap;
use std::process::Command;

use async_trait::async_trait;
use image::DynamicImage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{OcrBackend, OcrError, OcrRequest};

/// In-process engine wrapping `rusty_tesseract`.
pub struct TesseractEngine {
    language: String,
    dpi: i32,
    available: bool,
}

impl TesseractEngine {
    /// Probe for the tesseract binary and configure English recognition.
    pub fn new() -> Self {
        Self::with_language("eng")
    }

    pub fn with_language(language: &str) -> Self {
        let available = probe_command("tesseract");
        if available {
            info!(language, "tesseract binary found, local OCR available");
        } else {
            warn!("tesseract binary not found, local OCR unavailable");
        }
        Self {
            language: language.to_string(),
            dpi: 150,
            available,
        }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OcrBackend for TesseractEngine {
    async fn recognize(
        &self,
        request: &OcrRequest,
        image: &DynamicImage,
        cancel: &CancellationToken,
    ) -> Result<String, OcrError> {
        if cancel.is_cancelled() {
            return Err(OcrError::Cancelled);
        }
        if !self.available {
            return Err(OcrError::BackendUnavailable(
                "tesseract binary not found on PATH".into(),
            ));
        }
        // Empty crops recognize as empty text; the engine itself rejects
        // zero-dimension images.
        if image.width() == 0 || image.height() == 0 {
            debug!(request_id = %request.request_id, "zero-area input, returning empty text");
            return Ok(String::new());
        }

        let owned = image.clone();
        let language = self.language.clone();
        let dpi = self.dpi;
        let request_id = request.request_id.clone();

        let text = tokio::task::spawn_blocking(move || {
            let tess_image = rusty_tesseract::Image::from_dynamic_image(&owned)
                .map_err(|e| OcrError::ProcessingFailed(format!("image conversion: {e}")))?;
            let args = rusty_tesseract::Args {
                lang: language,
                config_variables: HashMap::new(),
                dpi: Some(dpi),
                psm: None,
                oem: None,
            };
            rusty_tesseract::image_to_string(&tess_image, &args)
                .map_err(|e| OcrError::ProcessingFailed(e.to_string()))
        })
        .await
        .map_err(|e| OcrError::ProcessingFailed(format!("recognition task panicked: {e}")))??;

        debug!(request_id = %request_id, chars = text.len(), "local OCR complete");
        Ok(text)
    }

    fn label(&self) -> &str {
        "tesseract-local"
    }
}

/// Probe whether a command is available on PATH.
fn probe_command(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
