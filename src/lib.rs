//! Duoscribe: session core for a dual-surface annotation and OCR-comparison
//! tool. Owns snapshot history, selection-to-pixel region mapping, the
//! extraction pipeline, and extracted-text similarity scoring; the rendering
//! shell implements the collaborator traits and drains the event bus.

pub mod cancellation;
pub mod events;
pub mod extract;
pub mod history;
pub mod ocr;
pub mod region;
pub mod selection;
pub mod session;
pub mod similarity;
pub mod store;
pub mod surface;

pub use events::{NotifyLevel, UiEvent};
pub use extract::{ExtractError, ExtractionPipeline};
pub use history::{HistoryController, HistoryError, Snapshot, SnapshotStore};
pub use region::{ImagePlacement, PixelRect, SelectionRegion};
pub use session::Session;
pub use similarity::{SimilarityLevel, SimilarityOutcome, SimilarityScorer};
pub use store::{SavedWork, SessionStore};
pub use surface::{SceneHost, SurfaceId};

/// Initialize tracing for a shell embedding this crate. Honors
/// `RUST_LOG`-style filters from the environment.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "duoscribe=debug".parse().expect("static filter parses")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();
}
