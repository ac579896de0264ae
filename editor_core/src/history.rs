//! Undo/Redo history system.

use crate::editor::UpdateEvent;
use crate::state::EditorState;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Default time window for coalescing edits (in milliseconds).
const COALESCE_WINDOW_MS: u64 = 300;

/// Updates carrying this tag are never recorded (undo/redo themselves,
/// restores, programmatic resets).
pub const TAG_HISTORIC: &str = "historic";
/// Tags a single typed insertion.
pub const TAG_TYPING: &str = "typing";
/// Tags a single character deletion.
pub const TAG_DELETING: &str = "deleting";

/// What kind of edit produced a snapshot. Only consecutive edits of the same
/// coalescable kind are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Typing,
    Deleting,
    Other,
}

impl EditKind {
    pub fn of(event: &UpdateEvent) -> Self {
        if event.has_tag(TAG_TYPING) {
            EditKind::Typing
        } else if event.has_tag(TAG_DELETING) {
            EditKind::Deleting
        } else {
            EditKind::Other
        }
    }

    fn coalesces(self) -> bool {
        self != EditKind::Other
    }
}

/// A state that can be returned to.
#[derive(Debug, Clone)]
struct Entry {
    state: Rc<EditorState>,
    kind: EditKind,
    /// Timestamp of the last edit merged into this entry.
    last_edit_time: Instant,
}

impl Entry {
    fn can_coalesce(&self, kind: EditKind, window: Duration) -> bool {
        kind.coalesces() && self.kind == kind && self.last_edit_time.elapsed() <= window
    }
}

/// Snapshot-based undo/redo stacks.
///
/// Each entry holds the document as it was before an edit. Runs of typing or
/// deleting inside the coalesce window collapse into one entry so a single
/// undo reverts the whole run.
#[derive(Debug)]
pub struct History {
    undo_stack: Vec<Entry>,
    redo_stack: Vec<Rc<EditorState>>,
    max_size: usize,
    coalesce_window: Duration,
    coalesce_enabled: bool,
    /// Set after undo/redo so the next edit starts a fresh entry.
    break_next: bool,
}

impl Default for History {
    fn default() -> Self {
        Self::new(100)
    }
}

impl History {
    /// Creates a new history with the given maximum depth.
    pub fn new(max_size: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_size,
            coalesce_window: Duration::from_millis(COALESCE_WINDOW_MS),
            coalesce_enabled: true,
            break_next: false,
        }
    }

    /// Sets the coalesce window duration.
    pub fn set_coalesce_window(&mut self, window: Duration) {
        self.coalesce_window = window;
    }

    /// Enables or disables coalescing.
    pub fn set_coalesce_enabled(&mut self, enabled: bool) {
        self.coalesce_enabled = enabled;
    }

    /// Changes the maximum depth, dropping the oldest entries if needed.
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
        self.enforce_limit();
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Records the state an edit started from.
    pub fn record(&mut self, before: Rc<EditorState>, kind: EditKind) {
        self.redo_stack.clear();
        let break_next = std::mem::take(&mut self.break_next);
        if self.coalesce_enabled && !break_next {
            if let Some(last) = self.undo_stack.last_mut() {
                if last.can_coalesce(kind, self.coalesce_window) {
                    last.last_edit_time = Instant::now();
                    return;
                }
            }
        }
        self.undo_stack.push(Entry {
            state: before,
            kind,
            last_edit_time: Instant::now(),
        });
        self.enforce_limit();
    }

    fn enforce_limit(&mut self) {
        if self.undo_stack.len() > self.max_size {
            let excess = self.undo_stack.len() - self.max_size;
            self.undo_stack.drain(..excess);
        }
    }

    /// Returns true if undo is available.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Returns true if redo is available.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Pops the state to restore for undo. `current` becomes redoable.
    pub fn undo(&mut self, current: Rc<EditorState>) -> Option<Rc<EditorState>> {
        let entry = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        self.break_next = true;
        Some(entry.state)
    }

    /// Pops the state to restore for redo. `current` becomes undoable.
    pub fn redo(&mut self, current: Rc<EditorState>) -> Option<Rc<EditorState>> {
        let state = self.redo_stack.pop()?;
        self.undo_stack.push(Entry {
            state: current,
            kind: EditKind::Other,
            last_edit_time: Instant::now(),
        });
        self.break_next = true;
        Some(state)
    }

    /// Clears all history.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.break_next = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(n: u64) -> Rc<EditorState> {
        let mut state = EditorState::new();
        state.next_key = n;
        Rc::new(state)
    }

    #[test]
    fn test_undo_redo() {
        let mut history = History::new(100);
        history.record(snapshot(1), EditKind::Other);

        assert!(history.can_undo());
        assert!(!history.can_redo());

        let restored = history.undo(snapshot(2)).unwrap();
        assert_eq!(restored.next_key, 1);
        assert!(!history.can_undo());
        assert!(history.can_redo());

        let restored = history.redo(snapshot(1)).unwrap();
        assert_eq!(restored.next_key, 2);
        assert!(history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_redo_cleared_on_new_edit() {
        let mut history = History::new(100);
        history.record(snapshot(1), EditKind::Other);
        history.undo(snapshot(2));
        assert!(history.can_redo());

        history.record(snapshot(1), EditKind::Other);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_coalescing_consecutive_typing() {
        let mut history = History::new(100);
        history.set_coalesce_window(Duration::from_secs(60));

        history.record(snapshot(1), EditKind::Typing);
        history.record(snapshot(2), EditKind::Typing);
        history.record(snapshot(3), EditKind::Typing);

        // One entry holding the state before the first keystroke.
        assert_eq!(history.undo_depth(), 1);
        assert_eq!(history.undo(snapshot(4)).unwrap().next_key, 1);
    }

    #[test]
    fn test_coalescing_breaks_on_kind_change() {
        let mut history = History::new(100);
        history.set_coalesce_window(Duration::from_secs(60));

        history.record(snapshot(1), EditKind::Typing);
        history.record(snapshot(2), EditKind::Typing);
        history.record(snapshot(3), EditKind::Other);
        history.record(snapshot(4), EditKind::Typing);
        history.record(snapshot(5), EditKind::Deleting);

        assert_eq!(history.undo_depth(), 4);
    }

    #[test]
    fn test_coalescing_breaks_after_undo() {
        let mut history = History::new(100);
        history.set_coalesce_window(Duration::from_secs(60));
        history.record(snapshot(1), EditKind::Typing);
        history.record(snapshot(2), EditKind::Typing);
        history.undo(snapshot(3));
        history.record(snapshot(1), EditKind::Typing);
        history.record(snapshot(4), EditKind::Typing);
        history.record(snapshot(5), EditKind::Typing);
        assert_eq!(history.undo_depth(), 1);
    }

    #[test]
    fn test_coalescing_disabled() {
        let mut history = History::new(100);
        history.set_coalesce_enabled(false);
        history.set_coalesce_window(Duration::from_secs(60));

        history.record(snapshot(1), EditKind::Typing);
        history.record(snapshot(2), EditKind::Typing);

        assert_eq!(history.undo_depth(), 2);
    }

    #[test]
    fn test_max_size_drops_oldest() {
        let mut history = History::new(2);
        history.record(snapshot(1), EditKind::Other);
        history.record(snapshot(2), EditKind::Other);
        history.record(snapshot(3), EditKind::Other);
        assert_eq!(history.undo_depth(), 2);

        history.set_max_size(1);
        assert_eq!(history.undo(snapshot(4)).unwrap().next_key, 3);
        assert!(!history.can_undo());
    }
}
