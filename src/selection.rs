//! Selection-drag tracking for region-scoped extraction: armed surface,
//! pointer down/move/up, minimum-size rejection.

use tracing::debug;

use crate::region::SelectionRegion;

#[derive(Debug, Clone, Copy, PartialEq)]
enum DragState {
    /// Not in selection mode.
    Idle,
    /// Selection mode entered, waiting for pointer down.
    Armed,
    /// Drag in progress.
    Dragging {
        start: (f64, f64),
        current: (f64, f64),
    },
}

/// What a completed pointer-up produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionOutcome {
    /// A normalized region at least the minimum size.
    Completed(SelectionRegion),
    /// Drag was below the minimum span; selection mode exits with no region.
    TooSmall,
    /// The surface was not in a drag (stray pointer-up).
    NotSelecting,
}

/// Per-surface selection gesture state machine. Completing or aborting a
/// drag always leaves the tracker idle; re-entering selection mode requires
/// a fresh [`SelectionTracker::arm`].
#[derive(Debug)]
pub struct SelectionTracker {
    state: DragState,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self {
            state: DragState::Idle,
        }
    }

    /// Enter selection mode.
    pub fn arm(&mut self) {
        self.state = DragState::Armed;
    }

    /// Leave selection mode, abandoning any drag in progress.
    pub fn disarm(&mut self) {
        self.state = DragState::Idle;
    }

    pub fn is_armed(&self) -> bool {
        !matches!(self.state, DragState::Idle)
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) {
        match self.state {
            DragState::Idle => {}
            DragState::Armed | DragState::Dragging { .. } => {
                self.state = DragState::Dragging {
                    start: (x, y),
                    current: (x, y),
                };
            }
        }
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) {
        if let DragState::Dragging { start, .. } = self.state {
            self.state = DragState::Dragging {
                start,
                current: (x, y),
            };
        }
    }

    /// Finish the drag. Exits selection mode regardless of outcome.
    pub fn pointer_up(&mut self, x: f64, y: f64) -> SelectionOutcome {
        let DragState::Dragging { start, .. } = self.state else {
            return SelectionOutcome::NotSelecting;
        };
        self.state = DragState::Idle;

        let region = SelectionRegion::from_drag(start, (x, y));
        if !region.meets_minimum() {
            debug!(
                width = region.width,
                height = region.height,
                "selection below minimum span, discarded"
            );
            return SelectionOutcome::TooSmall;
        }
        SelectionOutcome::Completed(region.normalized())
    }
}

impl Default for SelectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_drag_produces_normalized_region() {
        let mut tracker = SelectionTracker::new();
        tracker.arm();
        tracker.pointer_down(100.0, 80.0);
        tracker.pointer_move(150.0, 100.0);
        let outcome = tracker.pointer_up(40.0, 30.0);

        // Dragged up-left: normalization folds the negative extent.
        let SelectionOutcome::Completed(region) = outcome else {
            panic!("expected completed selection, got {outcome:?}");
        };
        assert_eq!(region.left, 40.0);
        assert_eq!(region.top, 30.0);
        assert_eq!(region.width, 60.0);
        assert_eq!(region.height, 50.0);
        assert!(!tracker.is_armed());
    }

    #[test]
    fn tiny_drag_is_discarded_and_exits_mode() {
        let mut tracker = SelectionTracker::new();
        tracker.arm();
        tracker.pointer_down(10.0, 10.0);
        let outcome = tracker.pointer_up(15.0, 60.0);
        assert_eq!(outcome, SelectionOutcome::TooSmall);
        assert!(!tracker.is_armed());
    }

    #[test]
    fn pointer_up_without_drag_is_not_selecting() {
        let mut tracker = SelectionTracker::new();
        assert_eq!(tracker.pointer_up(5.0, 5.0), SelectionOutcome::NotSelecting);

        tracker.arm();
        // Armed but no pointer-down yet.
        assert_eq!(tracker.pointer_up(5.0, 5.0), SelectionOutcome::NotSelecting);
    }

    #[test]
    fn pointer_events_ignored_while_idle() {
        let mut tracker = SelectionTracker::new();
        tracker.pointer_down(10.0, 10.0);
        tracker.pointer_move(50.0, 50.0);
        assert_eq!(
            tracker.pointer_up(50.0, 50.0),
            SelectionOutcome::NotSelecting
        );
    }

    #[test]
    fn disarm_abandons_drag() {
        let mut tracker = SelectionTracker::new();
        tracker.arm();
        tracker.pointer_down(0.0, 0.0);
        tracker.disarm();
        assert_eq!(
            tracker.pointer_up(100.0, 100.0),
            SelectionOutcome::NotSelecting
        );
    }
}
