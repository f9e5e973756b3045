//! Typed event bus between the session core and the rendering shell.
//! The core publishes; the shell drains the channel and maps events onto
//! banners, text panels, and the zoom display.

use crossbeam_channel as cb;
use serde::Serialize;
use tracing::debug;

use crate::similarity::SimilarityOutcome;
use crate::surface::SurfaceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiEvent {
    /// Transient banner.
    Notification {
        level: NotifyLevel,
        message: String,
    },
    /// A surface's extracted text changed (extraction, clear, reset, load).
    ExtractedTextChanged {
        surface: SurfaceId,
        text: String,
    },
    /// Both texts for the side-by-side comparison panel.
    ComparisonTextsChanged {
        text_a: String,
        text_b: String,
    },
    /// A similarity computation finished.
    SimilarityComputed {
        outcome: SimilarityOutcome,
    },
    /// The zoom display for a surface needs refreshing.
    ZoomChanged {
        surface: SurfaceId,
        zoom: f64,
    },
}

/// Unbounded fan-in channel of [`UiEvent`]s. Publishing never blocks; the
/// shell holds a cloned receiver.
pub struct EventBus {
    tx: cb::Sender<UiEvent>,
    rx: cb::Receiver<UiEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = cb::unbounded();
        Self { tx, rx }
    }

    pub fn subscribe(&self) -> cb::Receiver<UiEvent> {
        self.rx.clone()
    }

    pub fn emit(&self, event: UiEvent) {
        debug!(?event, "ui_event");
        let _ = self.tx.send(event);
    }

    pub fn notify(&self, level: NotifyLevel, message: impl Into<String>) {
        self.emit(UiEvent::Notification {
            level,
            message: message.into(),
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
