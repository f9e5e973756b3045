//! Extraction pipeline: image bytes -> decode -> optional region crop ->
//! OCR backend -> per-surface stored text. One request may be in flight per
//! surface; a newer request supersedes it and the stale result is dropped
//! on arrival.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::ocr::cache::OcrCache;
use crate::ocr::{OcrBackend, OcrError, OcrRequest};
use crate::region::{self, RegionMapError, SelectionRegion};
use crate::session::Session;
use crate::surface::SurfaceId;

#[derive(Debug)]
pub enum ExtractError {
    /// No image file is bound to the surface (full-image extraction).
    NoImage,
    /// No background image to scope a region against.
    NoBackgroundImage,
    /// The stored bytes could not be decoded.
    DecodeFailure(String),
    /// The OCR engine failed.
    Backend(OcrError),
    /// A newer request for the same surface took over; this result was
    /// discarded without touching stored state.
    Superseded,
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::NoImage => write!(f, "no image uploaded"),
            ExtractError::NoBackgroundImage => write!(f, "no background image to extract from"),
            ExtractError::DecodeFailure(msg) => write!(f, "image decode failed: {msg}"),
            ExtractError::Backend(e) => write!(f, "{e}"),
            ExtractError::Superseded => write!(f, "superseded by a newer request"),
        }
    }
}

impl From<RegionMapError> for ExtractError {
    fn from(e: RegionMapError) -> Self {
        match e {
            RegionMapError::NoBackgroundImage => ExtractError::NoBackgroundImage,
        }
    }
}

/// Orchestrates text extraction for both surfaces against one configured
/// OCR backend. Backend choice is made at construction; the pipeline treats
/// local and remote engines uniformly.
pub struct ExtractionPipeline {
    backend: Arc<dyn OcrBackend>,
    cache: OcrCache,
}

impl ExtractionPipeline {
    pub fn new(backend: Arc<dyn OcrBackend>) -> Self {
        Self {
            backend,
            cache: OcrCache::default(),
        }
    }

    pub fn with_cache(backend: Arc<dyn OcrBackend>, capacity: usize, ttl: Duration) -> Self {
        Self {
            backend,
            cache: OcrCache::new(capacity, ttl),
        }
    }

    /// Recognize the entire bound image.
    pub async fn extract_full(
        &self,
        session: &Session,
        id: SurfaceId,
    ) -> Result<String, ExtractError> {
        self.run(session, id, None).await
    }

    /// Recognize a selected sub-region of the bound image. The region is in
    /// display coordinates; mapping to image pixels happens here.
    pub async fn extract_region(
        &self,
        session: &Session,
        id: SurfaceId,
        region: SelectionRegion,
    ) -> Result<String, ExtractError> {
        self.run(session, id, Some(region)).await
    }

    async fn run(
        &self,
        session: &Session,
        id: SurfaceId,
        region: Option<SelectionRegion>,
    ) -> Result<String, ExtractError> {
        let image = match session.image_info(id) {
            Some(image) => image,
            None => {
                // Region extraction reads the background placement; full
                // extraction reads the bound file. Same absence, different
                // user-facing condition.
                return Err(if region.is_some() {
                    ExtractError::NoBackgroundImage
                } else {
                    ExtractError::NoImage
                });
            }
        };

        let guard = session.begin_extraction(id);
        let request = OcrRequest::new(guard.generation());
        info!(
            surface = %id,
            request_id = %request.request_id,
            region = region.is_some(),
            engine = self.backend.label(),
            "extraction started"
        );

        let pixel_rect = match region {
            Some(r) => Some(region::map_to_image_pixels(
                &r,
                Some(&image.placement),
                session.display_size(id),
                image.pixel_size(),
            )?),
            None => None,
        };

        let bytes = image.bytes.clone();
        let decoded = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
            .await
            .map_err(|e| ExtractError::DecodeFailure(format!("decode task panicked: {e}")))?
            .map_err(|e| ExtractError::DecodeFailure(e.to_string()))?;

        if !guard.should_continue() {
            debug!(surface = %id, request_id = %request.request_id, "superseded during decode");
            return Err(ExtractError::Superseded);
        }

        // Zero-area crops still dispatch; backends answer empty text for
        // them, keeping full-image and region extraction on one path.
        let target = match pixel_rect {
            Some(rect) => decoded.crop_imm(rect.x, rect.y, rect.width, rect.height),
            None => decoded,
        };

        let key = OcrCache::compute_key(self.backend.label(), &image.bytes, pixel_rect.as_ref());
        let text = match self.cache.get(&key) {
            Some(cached) => {
                debug!(surface = %id, request_id = %request.request_id, "OCR cache hit");
                cached
            }
            None => {
                let recognized = self
                    .backend
                    .recognize(&request, &target, guard.token())
                    .await
                    .map_err(|e| match e {
                        OcrError::Cancelled => ExtractError::Superseded,
                        other => {
                            warn!(surface = %id, error = %other, "OCR backend failed");
                            ExtractError::Backend(other)
                        }
                    })?;
                let trimmed = recognized.trim().to_string();
                self.cache.insert(key, trimmed.clone());
                trimmed
            }
        };

        if !guard.is_current() {
            debug!(
                surface = %id,
                request_id = %request.request_id,
                generation = guard.generation(),
                "stale extraction result discarded"
            );
            return Err(ExtractError::Superseded);
        }

        session.apply_extraction(id, text.clone());
        info!(
            surface = %id,
            request_id = %request.request_id,
            chars = text.len(),
            "extraction stored"
        );
        Ok(text)
    }
}
