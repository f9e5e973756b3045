//! Surface identity and per-surface mutable state, plus the `SceneHost`
//! seam behind which the actual drawing widget lives.

use serde::{Deserialize, Serialize};

use crate::history::Snapshot;
use crate::region::ImagePlacement;

pub const ZOOM_MIN: f64 = 0.2;
pub const ZOOM_MAX: f64 = 3.0;
pub const ZOOM_STEP: f64 = 1.2;
pub const DEFAULT_ZOOM: f64 = 1.0;

/// The two drawing surfaces, fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SurfaceId {
    A,
    B,
}

impl SurfaceId {
    pub const ALL: [SurfaceId; 2] = [SurfaceId::A, SurfaceId::B];

    pub fn index(self) -> usize {
        match self {
            SurfaceId::A => 0,
            SurfaceId::B => 1,
        }
    }

    /// The paired surface: A <-> B.
    pub fn other(self) -> SurfaceId {
        match self {
            SurfaceId::A => SurfaceId::B,
            SurfaceId::B => SurfaceId::A,
        }
    }
}

impl std::fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfaceId::A => write!(f, "surface-A"),
            SurfaceId::B => write!(f, "surface-B"),
        }
    }
}

/// Whether the surface is waiting for a region-selection drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    Idle,
    Selecting,
}

/// The background image bound to a surface: the raw encoded bytes as
/// uploaded (kept for extraction), the decoded pixel dimensions, and the
/// placement chosen at load time.
#[derive(Debug, Clone)]
pub struct BoundImage {
    pub bytes: Vec<u8>,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub placement: ImagePlacement,
}

impl BoundImage {
    pub fn pixel_size(&self) -> (u32, u32) {
        (self.pixel_width, self.pixel_height)
    }
}

/// Mutable state owned by one surface. Scene content itself lives behind the
/// [`SceneHost`] seam; this struct carries everything the core tracks about
/// the surface.
#[derive(Debug)]
pub struct SurfaceState {
    pub zoom: f64,
    pub mode: ExtractionMode,
    pub extracted_text: String,
    pub image: Option<BoundImage>,
}

impl SurfaceState {
    pub fn new() -> Self {
        Self {
            zoom: DEFAULT_ZOOM,
            mode: ExtractionMode::Idle,
            extracted_text: String::new(),
            image: None,
        }
    }

    /// Back to the blank state: default zoom, idle mode, no image, no text.
    pub fn reset(&mut self) {
        self.zoom = DEFAULT_ZOOM;
        self.mode = ExtractionMode::Idle;
        self.extracted_text.clear();
        self.image = None;
    }
}

impl Default for SurfaceState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub enum SceneError {
    ExportFailed(String),
}

impl std::fmt::Display for SceneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneError::ExportFailed(msg) => write!(f, "export failed: {msg}"),
        }
    }
}

/// The drawing-surface widget, implemented by the rendering shell. The core
/// treats scene content as opaque: it only serializes, reloads, and clears
/// it, and pushes view-level settings down.
pub trait SceneHost: Send + Sync {
    /// Serialize the full scene graph into an opaque snapshot.
    fn serialize_scene(&self) -> Snapshot;

    /// Replace the scene with a previously serialized snapshot.
    fn load_scene(&self, snapshot: &Snapshot);

    /// Repaint.
    fn render(&self);

    /// Remove all scene content (annotations and background).
    fn clear(&self);

    /// Apply the interactive zoom view transform.
    fn set_zoom(&self, zoom: f64);

    /// Bind or remove the background image.
    fn set_background_image(&self, image: Option<&BoundImage>);

    /// Rasterize the surface (scene + background) to an encoded PNG.
    fn export_png(&self) -> Result<Vec<u8>, SceneError>;

    /// Logical display size of the surface, independent of zoom.
    fn display_size(&self) -> (f64, f64);
}

#[cfg(test)]
pub(crate) mod testing {
    use parking_lot::Mutex;

    use super::*;

    /// In-memory stand-in for the drawing widget, used across the crate's
    /// unit tests.
    pub(crate) struct MockScene {
        scene: Mutex<String>,
        zoom: Mutex<f64>,
        background: Mutex<Option<(u32, u32)>>,
        display: (f64, f64),
    }

    impl MockScene {
        pub(crate) fn new(display: (f64, f64)) -> Self {
            Self {
                scene: Mutex::new("{}".to_string()),
                zoom: Mutex::new(DEFAULT_ZOOM),
                background: Mutex::new(None),
                display,
            }
        }

        pub(crate) fn set_content(&self, content: &str) {
            *self.scene.lock() = content.to_string();
        }

        pub(crate) fn content(&self) -> String {
            self.scene.lock().clone()
        }

        pub(crate) fn zoom(&self) -> f64 {
            *self.zoom.lock()
        }

        pub(crate) fn background(&self) -> Option<(u32, u32)> {
            *self.background.lock()
        }
    }

    impl SceneHost for MockScene {
        fn serialize_scene(&self) -> Snapshot {
            Snapshot::new(self.scene.lock().clone())
        }

        fn load_scene(&self, snapshot: &Snapshot) {
            *self.scene.lock() = snapshot.as_str().to_string();
        }

        fn render(&self) {}

        fn clear(&self) {
            *self.scene.lock() = "{}".to_string();
            *self.background.lock() = None;
        }

        fn set_zoom(&self, zoom: f64) {
            *self.zoom.lock() = zoom;
        }

        fn set_background_image(&self, image: Option<&BoundImage>) {
            *self.background.lock() = image.map(|img| img.pixel_size());
        }

        fn export_png(&self) -> Result<Vec<u8>, SceneError> {
            Ok(b"\x89PNG".to_vec())
        }

        fn display_size(&self) -> (f64, f64) {
            self.display
        }
    }

    #[test]
    fn surface_state_reset_restores_defaults() {
        let mut state = SurfaceState::new();
        state.zoom = 2.4;
        state.mode = ExtractionMode::Selecting;
        state.extracted_text = "hello".into();
        state.image = Some(BoundImage {
            bytes: vec![1, 2, 3],
            pixel_width: 10,
            pixel_height: 10,
            placement: crate::region::ImagePlacement {
                left: 0.0,
                top: 0.0,
                scale: 1.0,
            },
        });

        state.reset();
        assert_eq!(state.zoom, DEFAULT_ZOOM);
        assert_eq!(state.mode, ExtractionMode::Idle);
        assert!(state.extracted_text.is_empty());
        assert!(state.image.is_none());
    }
}
