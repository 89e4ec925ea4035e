//! Linear undo/redo over whole-buffer snapshots.
//!
//! Every mutating command records its pre-image before touching the buffer.
//! `idx` walks the snapshot list: `idx == entries.len()` means the live
//! buffer is newer than every snapshot; an undo saves the live state once so
//! redo can return to it. A fresh pre-image truncates any redo tail.

use tracing::trace;

/// Snapshots retained per prompt state.
pub const UNDO_HISTORY_MAX: usize = 200;

#[derive(Debug, Default)]
pub struct UndoStack {
    entries: Vec<Snapshot>,
    idx: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Snapshot {
    content: String,
    position: usize,
}

impl UndoStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.idx = 0;
    }

    /// Record the pre-image of a mutating command. Identical successive
    /// states are skipped, but a redo tail is discarded either way.
    pub fn push(&mut self, content: &str, position: usize) {
        self.entries.truncate(self.idx);
        if let Some(last) = self.entries.last()
            && last.content == content
        {
            trace!(target: "state.undo", depth = self.entries.len(), "snapshot_dedupe_skip");
            self.idx = self.entries.len();
            return;
        }
        self.entries.push(Snapshot {
            content: content.to_string(),
            position,
        });
        if self.entries.len() > UNDO_HISTORY_MAX {
            self.entries.remove(0);
        }
        self.idx = self.entries.len();
        trace!(target: "state.undo", depth = self.entries.len(), "snapshot_push");
    }

    /// Step back one snapshot, returning the state to restore. The live
    /// state is saved on the first undo of a chain so redo can recover it.
    pub fn undo(&mut self, live_content: &str, live_position: usize) -> Option<(String, usize)> {
        if self.idx == 0 {
            return None;
        }
        if self.idx == self.entries.len() {
            self.entries.push(Snapshot {
                content: live_content.to_string(),
                position: live_position,
            });
        }
        self.idx -= 1;
        let snap = &self.entries[self.idx];
        trace!(target: "state.undo", idx = self.idx, "undo");
        Some((snap.content.clone(), snap.position))
    }

    /// Step forward one snapshot. Legal only while a redo tail exists.
    pub fn redo(&mut self) -> Option<(String, usize)> {
        if self.idx + 1 >= self.entries.len() {
            return None;
        }
        self.idx += 1;
        let snap = &self.entries[self.idx];
        trace!(target: "state.undo", idx = self.idx, "redo");
        Some((snap.content.clone(), snap.position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn undo_then_redo_round_trips() {
        let mut u = UndoStack::new();
        u.push("", 0);
        u.push("a", 1);
        // live buffer is "ab"
        let (c1, _) = u.undo("ab", 2).unwrap();
        assert_eq!(c1, "a");
        let (c0, _) = u.undo(&c1, 1).unwrap();
        assert_eq!(c0, "");
        assert_eq!(u.redo().unwrap().0, "a");
        assert_eq!(u.redo().unwrap().0, "ab");
        assert!(u.redo().is_none());
    }

    #[test]
    fn empty_stack_has_nothing_to_undo() {
        let mut u = UndoStack::new();
        assert!(u.undo("x", 1).is_none());
        assert!(u.redo().is_none());
    }

    #[test]
    fn new_edit_discards_redo_tail() {
        let mut u = UndoStack::new();
        u.push("", 0);
        u.push("a", 1);
        u.undo("ab", 2).unwrap(); // back to "a"
        u.push("a", 1); // new edit from "a"
        assert!(u.redo().is_none());
        assert_eq!(u.undo("ax", 2).unwrap().0, "a");
    }

    proptest! {
        // undoing an arbitrary edit sequence all the way down and redoing it
        // back returns to a byte-identical final state
        #[test]
        fn full_undo_redo_cycle(edits in proptest::collection::vec("[a-z]{1,4}", 1..8)) {
            let mut u = UndoStack::new();
            let mut buf = String::new();
            for e in &edits {
                u.push(&buf, buf.len());
                buf.push_str(e);
            }
            let final_state = buf.clone();
            let mut live = buf;
            while let Some((c, _)) = u.undo(&live, live.len()) {
                live = c;
            }
            prop_assert_eq!(&live, "");
            let mut last = live;
            while let Some((c, _)) = u.redo() {
                last = c;
            }
            prop_assert_eq!(last, final_state);
        }
    }
}
