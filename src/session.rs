//! The session aggregate: exactly two surfaces, their history, selection
//! trackers, and extraction guards, plus the orchestration layer that maps
//! component outcomes onto user-visible notifications.

use std::io::Cursor;

use parking_lot::{Mutex, RwLock};
use tracing::{error, info, warn};

use crate::cancellation::{RequestGuard, RequestSlot};
use crate::events::{EventBus, NotifyLevel, UiEvent};
use crate::extract::{ExtractError, ExtractionPipeline};
use crate::history::{HistoryController, HistoryError, DEFAULT_HISTORY_LIMIT};
use crate::region::{ImagePlacement, SelectionRegion};
use crate::selection::{SelectionOutcome, SelectionTracker};
use crate::similarity::{SimilarityOutcome, SimilarityScorer};
use crate::store::{SavedWork, SessionStore};
use crate::surface::{
    BoundImage, ExtractionMode, SceneHost, SurfaceId, SurfaceState, DEFAULT_ZOOM, ZOOM_MAX,
    ZOOM_MIN, ZOOM_STEP,
};

struct SurfaceSlot {
    host: Box<dyn SceneHost>,
    state: RwLock<SurfaceState>,
    history: Mutex<HistoryController>,
    tracker: Mutex<SelectionTracker>,
    requests: RequestSlot,
}

impl SurfaceSlot {
    fn new(host: Box<dyn SceneHost>) -> Self {
        Self {
            host,
            state: RwLock::new(SurfaceState::new()),
            history: Mutex::new(HistoryController::new(DEFAULT_HISTORY_LIMIT)),
            tracker: Mutex::new(SelectionTracker::new()),
            requests: RequestSlot::new(),
        }
    }
}

/// One user session: two fixed surfaces and everything they own. All
/// surface mutation happens through this aggregate; there is no other
/// shared state.
pub struct Session {
    slots: [SurfaceSlot; 2],
    active: RwLock<SurfaceId>,
    events: EventBus,
    scorer: SimilarityScorer,
}

impl Session {
    /// Build the session around the two drawing widgets and seed each
    /// history with the initial (blank) scene.
    pub fn new(host_a: Box<dyn SceneHost>, host_b: Box<dyn SceneHost>) -> Self {
        let slots = [SurfaceSlot::new(host_a), SurfaceSlot::new(host_b)];
        for slot in &slots {
            slot.history.lock().reset_and_seed(slot.host.as_ref());
        }
        info!("session created with two surfaces");
        Self {
            slots,
            active: RwLock::new(SurfaceId::A),
            events: EventBus::new(),
            scorer: SimilarityScorer::new(),
        }
    }

    fn slot(&self, id: SurfaceId) -> &SurfaceSlot {
        &self.slots[id.index()]
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> crossbeam_channel::Receiver<UiEvent> {
        self.events.subscribe()
    }

    pub fn active(&self) -> SurfaceId {
        *self.active.read()
    }

    /// Hovering or clicking a surface makes it the target of the shared
    /// toolbar actions.
    pub fn set_active(&self, id: SurfaceId) {
        *self.active.write() = id;
    }

    // --- History ---

    /// Content-change notification from a surface's drawing widget.
    pub fn scene_changed(&self, id: SurfaceId) {
        let slot = self.slot(id);
        slot.history.lock().on_scene_changed(slot.host.as_ref());
    }

    pub fn undo(&self, id: SurfaceId) -> bool {
        let slot = self.slot(id);
        let result = slot.history.lock().undo(slot.host.as_ref());
        match result {
            Ok(()) => {
                self.events.notify(NotifyLevel::Info, "Action undone");
                true
            }
            Err(HistoryError::NothingToUndo) => {
                self.events.notify(NotifyLevel::Warning, "Nothing to undo");
                false
            }
            Err(e) => {
                error!(surface = %id, error = %e, "history invariant violation");
                self.events.notify(NotifyLevel::Error, "History unavailable");
                false
            }
        }
    }

    pub fn redo(&self, id: SurfaceId) -> bool {
        let slot = self.slot(id);
        let result = slot.history.lock().redo(slot.host.as_ref());
        match result {
            Ok(()) => {
                self.events.notify(NotifyLevel::Info, "Action redone");
                true
            }
            Err(HistoryError::NothingToRedo) => {
                self.events.notify(NotifyLevel::Warning, "Nothing to redo");
                false
            }
            Err(e) => {
                error!(surface = %id, error = %e, "history invariant violation");
                self.events.notify(NotifyLevel::Error, "History unavailable");
                false
            }
        }
    }

    // --- Zoom ---

    pub fn zoom(&self, id: SurfaceId) -> f64 {
        self.slot(id).state.read().zoom
    }

    pub fn zoom_in(&self, id: SurfaceId) {
        let slot = self.slot(id);
        let new_zoom = {
            let mut state = slot.state.write();
            if state.zoom >= ZOOM_MAX {
                None
            } else {
                state.zoom = (state.zoom * ZOOM_STEP).min(ZOOM_MAX);
                Some(state.zoom)
            }
        };
        match new_zoom {
            Some(zoom) => self.apply_zoom(id, zoom),
            None => self
                .events
                .notify(NotifyLevel::Warning, "Maximum zoom level reached"),
        }
    }

    pub fn zoom_out(&self, id: SurfaceId) {
        let slot = self.slot(id);
        let new_zoom = {
            let mut state = slot.state.write();
            if state.zoom <= ZOOM_MIN {
                None
            } else {
                state.zoom = (state.zoom / ZOOM_STEP).max(ZOOM_MIN);
                Some(state.zoom)
            }
        };
        match new_zoom {
            Some(zoom) => self.apply_zoom(id, zoom),
            None => self
                .events
                .notify(NotifyLevel::Warning, "Minimum zoom level reached"),
        }
    }

    pub fn reset_zoom(&self, id: SurfaceId) {
        self.slot(id).state.write().zoom = DEFAULT_ZOOM;
        self.apply_zoom(id, DEFAULT_ZOOM);
    }

    fn apply_zoom(&self, id: SurfaceId, zoom: f64) {
        let slot = self.slot(id);
        slot.host.set_zoom(zoom);
        slot.host.render();
        self.events.emit(UiEvent::ZoomChanged { surface: id, zoom });
    }

    // --- Background image ---

    /// Bind uploaded image bytes as the surface background. Content-sniffs
    /// the format, computes the scale-to-fit placement, resets zoom, and
    /// snapshots the scene. Returns false (with a notification) on invalid
    /// or corrupt input.
    pub fn load_image(&self, id: SurfaceId, bytes: Vec<u8>) -> bool {
        let reader = match image::ImageReader::new(Cursor::new(&bytes)).with_guessed_format() {
            Ok(reader) => reader,
            Err(e) => {
                warn!(surface = %id, error = %e, "image sniffing failed");
                self.events.notify(
                    NotifyLevel::Error,
                    "Please upload a valid image file (JPEG, PNG, GIF, WebP)",
                );
                return false;
            }
        };

        use image::ImageFormat::{Gif, Jpeg, Png, WebP};
        if !matches!(reader.format(), Some(Png | Jpeg | Gif | WebP)) {
            self.events.notify(
                NotifyLevel::Error,
                "Please upload a valid image file (JPEG, PNG, GIF, WebP)",
            );
            return false;
        }

        let dims = match reader.into_dimensions() {
            Ok(dims) => dims,
            Err(e) => {
                warn!(surface = %id, error = %e, "image decode failed");
                self.events.notify(
                    NotifyLevel::Error,
                    "Error loading image. The file may be corrupted.",
                );
                return false;
            }
        };

        let slot = self.slot(id);
        let placement = ImagePlacement::fit(slot.host.display_size(), dims);
        let bound = BoundImage {
            bytes,
            pixel_width: dims.0,
            pixel_height: dims.1,
            placement,
        };
        slot.host.set_background_image(Some(&bound));
        slot.host.render();
        {
            let mut state = slot.state.write();
            state.image = Some(bound);
            state.zoom = DEFAULT_ZOOM;
        }
        self.apply_zoom(id, DEFAULT_ZOOM);
        self.scene_changed(id);
        info!(surface = %id, width = dims.0, height = dims.1, "image loaded");
        self.events
            .notify(NotifyLevel::Success, "Image loaded successfully");
        true
    }

    /// Remove the background image, the stored bytes, and the extracted
    /// text; zoom returns to default.
    pub fn clear_image(&self, id: SurfaceId) {
        let slot = self.slot(id);
        slot.host.set_background_image(None);
        slot.host.render();
        self.scene_changed(id);
        {
            let mut state = slot.state.write();
            state.image = None;
            state.zoom = DEFAULT_ZOOM;
            state.extracted_text.clear();
        }
        self.apply_zoom(id, DEFAULT_ZOOM);
        self.events.emit(UiEvent::ExtractedTextChanged {
            surface: id,
            text: String::new(),
        });
        self.refresh_comparison();
        self.events.notify(NotifyLevel::Info, "Surface cleared");
    }

    /// Back to the blank state: empty scene, history reseeded with a single
    /// snapshot, default zoom, no image, no text.
    pub fn reset_surface(&self, id: SurfaceId) {
        let slot = self.slot(id);
        slot.host.clear();
        slot.host.render();
        slot.history.lock().reset_and_seed(slot.host.as_ref());
        slot.state.write().reset();
        slot.tracker.lock().disarm();
        self.apply_zoom(id, DEFAULT_ZOOM);
        self.events.emit(UiEvent::ExtractedTextChanged {
            surface: id,
            text: String::new(),
        });
        self.refresh_comparison();
        self.events
            .notify(NotifyLevel::Success, "Surface reset successfully");
    }

    // --- Selection mode ---

    pub fn extraction_mode(&self, id: SurfaceId) -> ExtractionMode {
        self.slot(id).state.read().mode
    }

    pub fn enter_selection_mode(&self, id: SurfaceId) {
        let slot = self.slot(id);
        slot.state.write().mode = ExtractionMode::Selecting;
        slot.tracker.lock().arm();
        self.events.notify(
            NotifyLevel::Warning,
            "Click and drag to select an area for text extraction",
        );
    }

    pub fn exit_selection_mode(&self, id: SurfaceId) {
        let slot = self.slot(id);
        slot.state.write().mode = ExtractionMode::Idle;
        slot.tracker.lock().disarm();
    }

    pub fn pointer_down(&self, id: SurfaceId, x: f64, y: f64) {
        self.slot(id).tracker.lock().pointer_down(x, y);
    }

    pub fn pointer_move(&self, id: SurfaceId, x: f64, y: f64) {
        self.slot(id).tracker.lock().pointer_move(x, y);
    }

    /// Complete the selection drag. Exits selection mode in every case;
    /// returns the normalized region only when it met the minimum size.
    pub fn pointer_up(&self, id: SurfaceId, x: f64, y: f64) -> Option<SelectionRegion> {
        let slot = self.slot(id);
        let outcome = slot.tracker.lock().pointer_up(x, y);
        match outcome {
            SelectionOutcome::Completed(region) => {
                slot.state.write().mode = ExtractionMode::Idle;
                Some(region)
            }
            SelectionOutcome::TooSmall => {
                slot.state.write().mode = ExtractionMode::Idle;
                None
            }
            SelectionOutcome::NotSelecting => None,
        }
    }

    // --- Extraction ---

    pub fn extracted_text(&self, id: SurfaceId) -> String {
        self.slot(id).state.read().extracted_text.clone()
    }

    /// Full-image extraction with user-facing outcome messages.
    pub async fn run_full_extraction(
        &self,
        pipeline: &ExtractionPipeline,
        id: SurfaceId,
    ) -> Option<String> {
        match pipeline.extract_full(self, id).await {
            Ok(text) => {
                if text.is_empty() {
                    self.events
                        .notify(NotifyLevel::Warning, "No text found in the image");
                } else {
                    self.events
                        .notify(NotifyLevel::Success, "Full text extracted successfully");
                }
                Some(text)
            }
            Err(e) => {
                self.report_extract_error(id, &e);
                None
            }
        }
    }

    /// Region-scoped extraction with user-facing outcome messages.
    pub async fn run_region_extraction(
        &self,
        pipeline: &ExtractionPipeline,
        id: SurfaceId,
        region: SelectionRegion,
    ) -> Option<String> {
        match pipeline.extract_region(self, id, region).await {
            Ok(text) => {
                if text.is_empty() {
                    self.events.notify(
                        NotifyLevel::Warning,
                        "No text found in the selected area",
                    );
                } else {
                    self.events.notify(
                        NotifyLevel::Success,
                        "Text extracted successfully from selected area",
                    );
                }
                Some(text)
            }
            Err(e) => {
                self.report_extract_error(id, &e);
                None
            }
        }
    }

    fn report_extract_error(&self, id: SurfaceId, err: &ExtractError) {
        match err {
            ExtractError::NoImage => {
                self.events.notify(
                    NotifyLevel::Warning,
                    "No image uploaded. Please upload an image first.",
                );
            }
            ExtractError::NoBackgroundImage => {
                self.events
                    .notify(NotifyLevel::Error, "No background image to extract from");
            }
            ExtractError::Superseded => {
                // Expected when the user restarts extraction; no banner.
                info!(surface = %id, "extraction superseded");
            }
            ExtractError::DecodeFailure(msg) => {
                warn!(surface = %id, error = %msg, "extraction decode failure");
                self.events.notify(
                    NotifyLevel::Error,
                    "Error loading image. The file may be corrupted.",
                );
            }
            ExtractError::Backend(e) => {
                warn!(surface = %id, error = %e, "extraction backend failure");
                self.events.notify(
                    NotifyLevel::Error,
                    "Text extraction failed. Please try again.",
                );
            }
        }
    }

    // --- Comparison ---

    /// Score the two stored texts. Distinguishes "nothing extracted yet"
    /// from "extracted text normalizes to nothing".
    pub fn compare_texts(&self) -> SimilarityOutcome {
        let text_a = self.extracted_text(SurfaceId::A);
        let text_b = self.extracted_text(SurfaceId::B);

        if text_a.is_empty() || text_b.is_empty() {
            let outcome = SimilarityOutcome::InsufficientText;
            self.events.emit(UiEvent::SimilarityComputed { outcome });
            self.events
                .notify(NotifyLevel::Warning, "Extract text from both surfaces first");
            return outcome;
        }

        let outcome = self.scorer.score(&text_a, &text_b);
        self.events.emit(UiEvent::SimilarityComputed { outcome });
        match outcome {
            SimilarityOutcome::InsufficientText => {
                self.events
                    .notify(NotifyLevel::Warning, "No meaningful text to compare");
            }
            SimilarityOutcome::Scored { percentage, .. } => {
                self.events.notify(
                    NotifyLevel::Success,
                    format!("Text similarity calculated: {percentage}%"),
                );
            }
        }
        outcome
    }

    fn refresh_comparison(&self) {
        self.events.emit(UiEvent::ComparisonTextsChanged {
            text_a: self.extracted_text(SurfaceId::A),
            text_b: self.extracted_text(SurfaceId::B),
        });
    }

    // --- Persistence & export ---

    pub fn save_work(&self, store: &SessionStore) -> bool {
        let work = SavedWork {
            surface_a: self.slot(SurfaceId::A).host.serialize_scene(),
            surface_b: self.slot(SurfaceId::B).host.serialize_scene(),
            text_a: self.extracted_text(SurfaceId::A),
            text_b: self.extracted_text(SurfaceId::B),
        };
        match store.save(&work) {
            Ok(()) => {
                self.events
                    .notify(NotifyLevel::Success, "Work saved successfully!");
                true
            }
            Err(e) => {
                warn!(error = %e, "save work failed");
                self.events.notify(NotifyLevel::Error, "Failed to save work.");
                false
            }
        }
    }

    pub fn load_work(&self, store: &SessionStore) -> bool {
        match store.load() {
            Ok(Some(work)) => {
                let restored = [
                    (SurfaceId::A, &work.surface_a, &work.text_a),
                    (SurfaceId::B, &work.surface_b, &work.text_b),
                ];
                for (id, snapshot, text) in restored {
                    let slot = self.slot(id);
                    slot.host.load_scene(snapshot);
                    slot.host.render();
                    self.scene_changed(id);
                    slot.state.write().extracted_text = text.clone();
                    self.events.emit(UiEvent::ExtractedTextChanged {
                        surface: id,
                        text: text.clone(),
                    });
                }
                self.refresh_comparison();
                self.events
                    .notify(NotifyLevel::Success, "Work loaded successfully!");
                true
            }
            Ok(None) => {
                self.events
                    .notify(NotifyLevel::Warning, "No saved work found.");
                false
            }
            Err(e) => {
                warn!(error = %e, "load work failed");
                self.events.notify(NotifyLevel::Error, "Failed to load work.");
                false
            }
        }
    }

    /// Rasterize a surface for download. Returns the PNG bytes on success.
    pub fn export_surface(&self, id: SurfaceId) -> Option<Vec<u8>> {
        match self.slot(id).host.export_png() {
            Ok(bytes) => {
                self.events
                    .notify(NotifyLevel::Success, format!("{id} exported successfully"));
                Some(bytes)
            }
            Err(e) => {
                warn!(surface = %id, error = %e, "export failed");
                self.events.notify(
                    NotifyLevel::Error,
                    "Error exporting surface. Please try again.",
                );
                None
            }
        }
    }

    // --- Pipeline-facing internals ---

    pub(crate) fn image_info(&self, id: SurfaceId) -> Option<BoundImage> {
        self.slot(id).state.read().image.clone()
    }

    pub(crate) fn display_size(&self, id: SurfaceId) -> (f64, f64) {
        self.slot(id).host.display_size()
    }

    pub(crate) fn begin_extraction(&self, id: SurfaceId) -> RequestGuard {
        self.slot(id).requests.begin()
    }

    /// Store a completed extraction and refresh dependents. Only called by
    /// the pipeline after its generation check passed.
    pub(crate) fn apply_extraction(&self, id: SurfaceId, text: String) {
        self.slot(id).state.write().extracted_text = text.clone();
        self.events
            .emit(UiEvent::ExtractedTextChanged { surface: id, text });
        self.refresh_comparison();
    }

    #[cfg(test)]
    pub(crate) fn bind_image_bytes_for_test(&self, id: SurfaceId, bytes: Vec<u8>) {
        let slot = self.slot(id);
        let mut state = slot.state.write();
        match state.image.as_mut() {
            Some(image) => image.bytes = bytes,
            None => {
                state.image = Some(BoundImage {
                    bytes,
                    pixel_width: 8,
                    pixel_height: 8,
                    placement: ImagePlacement::fit(slot.host.display_size(), (8, 8)),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::SimilarityLevel;
    use crate::surface::testing::MockScene;

    fn session_with_hosts() -> Session {
        Session::new(
            Box::new(MockScene::new((800.0, 600.0))),
            Box::new(MockScene::new((800.0, 600.0))),
        )
    }

    fn drain_notifications(rx: &crossbeam_channel::Receiver<UiEvent>) -> Vec<(NotifyLevel, String)> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let UiEvent::Notification { level, message } = event {
                out.push((level, message));
            }
        }
        out
    }

    fn png_fixture() -> Vec<u8> {
        use std::io::Cursor;
        let image = image::DynamicImage::new_rgba8(8, 8);
        let mut buffer = Cursor::new(Vec::new());
        image
            .write_to(&mut buffer, image::ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    #[test]
    fn new_session_seeds_both_histories() {
        let session = session_with_hosts();
        for id in SurfaceId::ALL {
            let slot = session.slot(id);
            assert_eq!(slot.history.lock().store().undo_len(), 1);
        }
        assert_eq!(session.active(), SurfaceId::A);
    }

    #[test]
    fn undo_redo_banner_flow() {
        let session = session_with_hosts();
        let rx = session.subscribe();

        // Nothing to undo on a fresh surface.
        assert!(!session.undo(SurfaceId::A));
        let notes = drain_notifications(&rx);
        assert_eq!(notes.last().unwrap().1, "Nothing to undo");

        // Mutate, then undo/redo.
        session.slot(SurfaceId::A).host.load_scene(
            &crate::history::Snapshot::new("{\"objects\":[\"x\"]}"),
        );
        session.scene_changed(SurfaceId::A);
        assert!(session.undo(SurfaceId::A));
        assert!(session.redo(SurfaceId::A));
        let notes = drain_notifications(&rx);
        let messages: Vec<&str> = notes.iter().map(|(_, m)| m.as_str()).collect();
        assert!(messages.contains(&"Action undone"));
        assert!(messages.contains(&"Action redone"));
    }

    #[test]
    fn zoom_steps_and_clamps() {
        let session = session_with_hosts();
        for _ in 0..20 {
            session.zoom_in(SurfaceId::A);
        }
        assert!(session.zoom(SurfaceId::A) <= ZOOM_MAX + 1e-9);
        assert!((session.zoom(SurfaceId::A) - ZOOM_MAX).abs() < 1e-9);

        for _ in 0..40 {
            session.zoom_out(SurfaceId::A);
        }
        assert!((session.zoom(SurfaceId::A) - ZOOM_MIN).abs() < 1e-9);

        session.reset_zoom(SurfaceId::A);
        assert_eq!(session.zoom(SurfaceId::A), DEFAULT_ZOOM);
    }

    #[test]
    fn zoom_at_limit_warns() {
        let session = session_with_hosts();
        for _ in 0..20 {
            session.zoom_in(SurfaceId::B);
        }
        let rx = session.subscribe();
        // Drain the queue, then hit the limit once more.
        drain_notifications(&rx);
        session.zoom_in(SurfaceId::B);
        let notes = drain_notifications(&rx);
        assert_eq!(notes.last().unwrap().1, "Maximum zoom level reached");
    }

    #[test]
    fn load_image_binds_and_resets_zoom() {
        let session = session_with_hosts();
        session.zoom_in(SurfaceId::A);

        assert!(session.load_image(SurfaceId::A, png_fixture()));
        assert_eq!(session.zoom(SurfaceId::A), DEFAULT_ZOOM);
        assert!(session.image_info(SurfaceId::A).is_some());

        let image = session.image_info(SurfaceId::A).unwrap();
        assert_eq!(image.pixel_size(), (8, 8));
        // 8x8 image on 800x600: height-limited, scale 75, centered.
        assert!((image.placement.scale - 75.0).abs() < 1e-9);
        assert!((image.placement.left - 100.0).abs() < 1e-9);
        assert!((image.placement.top - 0.0).abs() < 1e-9);
    }

    #[test]
    fn load_image_rejects_non_image_bytes() {
        let session = session_with_hosts();
        let rx = session.subscribe();
        assert!(!session.load_image(SurfaceId::A, b"definitely not an image".to_vec()));
        assert!(session.image_info(SurfaceId::A).is_none());
        let notes = drain_notifications(&rx);
        assert!(notes
            .last()
            .unwrap()
            .1
            .starts_with("Please upload a valid image file"));
    }

    #[test]
    fn clear_image_drops_bytes_text_and_zoom() {
        let session = session_with_hosts();
        session.load_image(SurfaceId::A, png_fixture());
        session.apply_extraction(SurfaceId::A, "some text".into());
        session.zoom_in(SurfaceId::A);

        session.clear_image(SurfaceId::A);
        assert!(session.image_info(SurfaceId::A).is_none());
        assert!(session.extracted_text(SurfaceId::A).is_empty());
        assert_eq!(session.zoom(SurfaceId::A), DEFAULT_ZOOM);
    }

    #[test]
    fn reset_surface_restores_blank_state() {
        let session = session_with_hosts();
        session.load_image(SurfaceId::A, png_fixture());
        session.apply_extraction(SurfaceId::A, "text".into());
        session.zoom_in(SurfaceId::A);
        session.enter_selection_mode(SurfaceId::A);

        session.reset_surface(SurfaceId::A);

        assert_eq!(session.zoom(SurfaceId::A), DEFAULT_ZOOM);
        assert!(session.extracted_text(SurfaceId::A).is_empty());
        assert!(session.image_info(SurfaceId::A).is_none());
        assert_eq!(session.extraction_mode(SurfaceId::A), ExtractionMode::Idle);
        let slot = session.slot(SurfaceId::A);
        assert_eq!(slot.history.lock().store().undo_len(), 1);
    }

    #[test]
    fn selection_mode_lifecycle() {
        let session = session_with_hosts();
        session.enter_selection_mode(SurfaceId::B);
        assert_eq!(
            session.extraction_mode(SurfaceId::B),
            ExtractionMode::Selecting
        );

        session.pointer_down(SurfaceId::B, 100.0, 100.0);
        session.pointer_move(SurfaceId::B, 200.0, 180.0);
        let region = session.pointer_up(SurfaceId::B, 200.0, 180.0).unwrap();
        assert_eq!(region.left, 100.0);
        assert_eq!(region.width, 100.0);
        assert_eq!(session.extraction_mode(SurfaceId::B), ExtractionMode::Idle);
    }

    #[test]
    fn tiny_selection_aborts_mode_without_region() {
        let session = session_with_hosts();
        session.enter_selection_mode(SurfaceId::A);
        session.pointer_down(SurfaceId::A, 10.0, 10.0);
        assert!(session.pointer_up(SurfaceId::A, 12.0, 12.0).is_none());
        assert_eq!(session.extraction_mode(SurfaceId::A), ExtractionMode::Idle);
    }

    #[test]
    fn compare_distinguishes_missing_from_meaningless() {
        let session = session_with_hosts();
        let rx = session.subscribe();

        assert_eq!(session.compare_texts(), SimilarityOutcome::InsufficientText);
        let notes = drain_notifications(&rx);
        assert_eq!(notes.last().unwrap().1, "Extract text from both surfaces first");

        session.apply_extraction(SurfaceId::A, "!!!".into());
        session.apply_extraction(SurfaceId::B, "hello".into());
        drain_notifications(&rx);
        assert_eq!(session.compare_texts(), SimilarityOutcome::InsufficientText);
        let notes = drain_notifications(&rx);
        assert_eq!(notes.last().unwrap().1, "No meaningful text to compare");
    }

    #[test]
    fn compare_scores_matching_texts() {
        let session = session_with_hosts();
        session.apply_extraction(SurfaceId::A, "Hello, World!".into());
        session.apply_extraction(SurfaceId::B, "hello world".into());

        let outcome = session.compare_texts();
        assert_eq!(
            outcome,
            SimilarityOutcome::Scored {
                percentage: 100,
                level: SimilarityLevel::VeryHigh,
            }
        );
    }

    #[test]
    fn save_and_load_round_trip() {
        let session = session_with_hosts();
        let store = SessionStore::open_in_memory().unwrap();

        session.slot(SurfaceId::A).host.load_scene(
            &crate::history::Snapshot::new("{\"objects\":[\"drawing\"]}"),
        );
        session.apply_extraction(SurfaceId::A, "left".into());
        session.apply_extraction(SurfaceId::B, "right".into());
        assert!(session.save_work(&store));

        // Wipe and restore.
        session.reset_surface(SurfaceId::A);
        session.reset_surface(SurfaceId::B);
        assert!(session.load_work(&store));

        assert_eq!(session.extracted_text(SurfaceId::A), "left");
        assert_eq!(session.extracted_text(SurfaceId::B), "right");
        assert_eq!(
            session.slot(SurfaceId::A).host.serialize_scene().as_str(),
            "{\"objects\":[\"drawing\"]}"
        );
    }

    #[test]
    fn load_without_save_reports_no_saved_work() {
        let session = session_with_hosts();
        let store = SessionStore::open_in_memory().unwrap();
        let rx = session.subscribe();

        assert!(!session.load_work(&store));
        let notes = drain_notifications(&rx);
        assert_eq!(notes.last().unwrap().1, "No saved work found.");
    }

    #[test]
    fn export_returns_png_bytes() {
        let session = session_with_hosts();
        let bytes = session.export_surface(SurfaceId::A).unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));
    }
}
