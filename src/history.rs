//! Per-surface undo/redo history over opaque scene snapshots.
//! The store is a bounded undo stack (the last entry is always the current
//! state) plus a redo stack that survives only until the next forward
//! mutation.

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::surface::SceneHost;

/// Maximum retained undo entries per surface.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// An immutable serialized capture of a surface's entire scene. Opaque to
/// the history engine; equality is byte equality of the serialized form.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Snapshot(String);

impl Snapshot {
    pub fn new(serialized: impl Into<String>) -> Self {
        Self(serialized.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryError {
    /// The undo stack is empty. Cannot occur once the store is seeded; if it
    /// does, it is an internal invariant violation.
    EmptyHistory,
    NothingToUndo,
    NothingToRedo,
}

impl std::fmt::Display for HistoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryError::EmptyHistory => write!(f, "history is empty (invariant violation)"),
            HistoryError::NothingToUndo => write!(f, "nothing to undo"),
            HistoryError::NothingToRedo => write!(f, "nothing to redo"),
        }
    }
}

/// Bounded undo/redo stacks for one surface. Does not touch the drawing
/// surface; [`HistoryController`] bridges the two.
#[derive(Debug)]
pub struct SnapshotStore {
    undo: VecDeque<Snapshot>,
    redo: Vec<Snapshot>,
    limit: usize,
}

impl SnapshotStore {
    pub fn new(limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Append a snapshot as the new current state. Evicts the oldest entry
    /// past the bound and unconditionally clears the redo stack.
    pub fn push(&mut self, snapshot: Snapshot) {
        self.undo.push_back(snapshot);
        if self.undo.len() > self.limit {
            self.undo.pop_front();
        }
        self.redo.clear();
    }

    /// The current state: the last entry of the undo stack.
    pub fn peek_current(&self) -> Result<&Snapshot, HistoryError> {
        self.undo.back().ok_or(HistoryError::EmptyHistory)
    }

    /// Undo is permitted only while more than one entry remains; popping the
    /// sole entry would leave no current state.
    pub fn can_undo(&self) -> bool {
        self.undo.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Move the current state onto the redo stack and return the new current
    /// (the previous entry).
    pub fn undo(&mut self) -> Result<Snapshot, HistoryError> {
        if !self.can_undo() {
            return Err(HistoryError::NothingToUndo);
        }
        let current = self
            .undo
            .pop_back()
            .expect("can_undo guarantees an entry");
        self.redo.push(current);
        self.peek_current().cloned()
    }

    /// Move the most recently undone state back onto the undo stack and
    /// return it.
    pub fn redo(&mut self) -> Result<Snapshot, HistoryError> {
        let next = self.redo.pop().ok_or(HistoryError::NothingToRedo)?;
        self.undo.push_back(next.clone());
        Ok(next)
    }

    /// Clear both stacks.
    pub fn reset(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Oldest-first view of the undo stack.
    pub fn undo_entries(&self) -> impl Iterator<Item = &Snapshot> {
        self.undo.iter()
    }
}

/// Bridges scene-change notifications from a surface's drawing widget to its
/// [`SnapshotStore`] and drives undo/redo against both.
pub struct HistoryController {
    store: SnapshotStore,
}

impl HistoryController {
    pub fn new(limit: usize) -> Self {
        Self {
            store: SnapshotStore::new(limit),
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Called after any content mutation. Serializes the scene and pushes a
    /// snapshot unless it is structurally identical to the stored current
    /// state (drawing widgets fire change events for no-op moves).
    ///
    /// Returns true when a snapshot was recorded.
    pub fn on_scene_changed(&mut self, host: &dyn SceneHost) -> bool {
        let snapshot = host.serialize_scene();
        if let Ok(current) = self.store.peek_current() {
            if *current == snapshot {
                debug!("scene change produced identical snapshot, skipping");
                return false;
            }
        }
        self.store.push(snapshot);
        true
    }

    /// Step back one state. The store moves the current snapshot onto redo
    /// before the scene is replaced, so the pre-undo state is always
    /// recoverable.
    pub fn undo(&mut self, host: &dyn SceneHost) -> Result<(), HistoryError> {
        let previous = self.store.undo()?;
        host.load_scene(&previous);
        host.render();
        Ok(())
    }

    pub fn redo(&mut self, host: &dyn SceneHost) -> Result<(), HistoryError> {
        let next = self.store.redo()?;
        host.load_scene(&next);
        host.render();
        Ok(())
    }

    /// Clear all history and reseed with the surface's current (blank)
    /// scene so the store always holds at least one entry.
    pub fn reset_and_seed(&mut self, host: &dyn SceneHost) {
        self.store.reset();
        self.store.push(host.serialize_scene());
        if self.store.undo_len() != 1 {
            warn!(len = self.store.undo_len(), "history reseed left unexpected length");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::testing::MockScene;

    fn snap(n: usize) -> Snapshot {
        Snapshot::new(format!("{{\"objects\":[{n}]}}"))
    }

    #[test]
    fn push_is_bounded_and_evicts_oldest() {
        let bound = 5;
        let mut store = SnapshotStore::new(bound);
        for n in 0..12 {
            store.push(snap(n));
        }
        assert_eq!(store.undo_len(), bound);
        // Survivors are exactly the newest `bound` entries, oldest first.
        let kept: Vec<Snapshot> = store.undo_entries().cloned().collect();
        let expected: Vec<Snapshot> = (7..12).map(snap).collect();
        assert_eq!(kept, expected);
    }

    #[test]
    fn fewer_pushes_than_bound_keeps_all() {
        let mut store = SnapshotStore::new(50);
        for n in 0..3 {
            store.push(snap(n));
        }
        assert_eq!(store.undo_len(), 3);
    }

    #[test]
    fn undo_then_redo_round_trips() {
        let mut store = SnapshotStore::new(50);
        store.push(snap(0));
        store.push(snap(1));
        store.push(snap(2));

        let before = store.peek_current().unwrap().clone();
        let previous = store.undo().unwrap();
        assert_eq!(previous, snap(1));

        let restored = store.redo().unwrap();
        assert_eq!(restored, before);
        assert_eq!(*store.peek_current().unwrap(), before);
    }

    #[test]
    fn forward_push_clears_redo() {
        let mut store = SnapshotStore::new(50);
        store.push(snap(0));
        store.push(snap(1));
        store.undo().unwrap();
        assert!(store.can_redo());

        store.push(snap(2));
        assert!(!store.can_redo());
        assert_eq!(store.redo_len(), 0);
    }

    #[test]
    fn undo_with_single_entry_fails_and_leaves_stacks_unchanged() {
        let mut store = SnapshotStore::new(50);
        store.push(snap(0));

        assert_eq!(store.undo(), Err(HistoryError::NothingToUndo));
        assert_eq!(store.undo_len(), 1);
        assert_eq!(store.redo_len(), 0);
        assert_eq!(*store.peek_current().unwrap(), snap(0));
    }

    #[test]
    fn redo_on_empty_redo_stack_fails() {
        let mut store = SnapshotStore::new(50);
        store.push(snap(0));
        assert_eq!(store.redo(), Err(HistoryError::NothingToRedo));
    }

    #[test]
    fn peek_on_unseeded_store_reports_empty_history() {
        let store = SnapshotStore::new(50);
        assert_eq!(store.peek_current().err(), Some(HistoryError::EmptyHistory));
    }

    #[test]
    fn controller_dedupes_identical_scene_changes() {
        let host = MockScene::new((800.0, 600.0));
        let mut controller = HistoryController::new(50);

        host.set_content("{\"objects\":[\"a\"]}");
        assert!(controller.on_scene_changed(&host));
        // Redundant notification with no actual change.
        assert!(!controller.on_scene_changed(&host));
        assert_eq!(controller.store().undo_len(), 1);

        host.set_content("{\"objects\":[\"a\",\"b\"]}");
        assert!(controller.on_scene_changed(&host));
        assert_eq!(controller.store().undo_len(), 2);
    }

    #[test]
    fn controller_undo_restores_previous_scene() {
        let host = MockScene::new((800.0, 600.0));
        let mut controller = HistoryController::new(50);

        controller.on_scene_changed(&host); // blank seed
        host.set_content("{\"objects\":[\"a\"]}");
        controller.on_scene_changed(&host);

        controller.undo(&host).unwrap();
        assert_eq!(host.content(), "{}");

        controller.redo(&host).unwrap();
        assert_eq!(host.content(), "{\"objects\":[\"a\"]}");
    }

    #[test]
    fn controller_undo_without_history_is_informational() {
        let host = MockScene::new((800.0, 600.0));
        let mut controller = HistoryController::new(50);
        controller.on_scene_changed(&host);

        assert_eq!(controller.undo(&host), Err(HistoryError::NothingToUndo));
        // Scene untouched.
        assert_eq!(host.content(), "{}");
    }

    #[test]
    fn reset_and_seed_leaves_exactly_one_entry() {
        let host = MockScene::new((800.0, 600.0));
        let mut controller = HistoryController::new(50);
        for n in 0..4 {
            host.set_content(&format!("{{\"objects\":[{n}]}}"));
            controller.on_scene_changed(&host);
        }

        host.clear();
        controller.reset_and_seed(&host);
        assert_eq!(controller.store().undo_len(), 1);
        assert_eq!(controller.store().redo_len(), 0);
        assert_eq!(controller.store().peek_current().unwrap().as_str(), "{}");
    }
}
