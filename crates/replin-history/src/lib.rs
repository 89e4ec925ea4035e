//! History provider interface and a bounded in-memory implementation.
//!
//! The editor navigates history through this trait only; persistence and
//! indexing backends live outside the crate.

use tracing::trace;

pub trait History: Send {
    /// Step to the previous (older) entry, if any.
    fn prev(&mut self) -> Option<String>;
    /// Step to the next (newer) entry; `None` past the newest.
    fn next(&mut self) -> Option<String>;
    fn first(&mut self) -> Option<String>;
    fn last(&mut self) -> Option<String>;
    /// Incremental substring search from the navigation cursor. On a hit the
    /// cursor moves there, `response` is replaced, and `true` is returned.
    /// `advance` skips the entry the cursor is on (repeat-search).
    fn search(&mut self, query: &str, backward: bool, advance: bool, response: &mut String)
    -> bool;
    fn add(&mut self, entry: &str);
    /// Drop the navigation cursor back to "past the newest entry".
    fn reset(&mut self);
}

/// Session-local history with consecutive-duplicate suppression.
pub struct MemoryHistory {
    entries: Vec<String>,
    cursor: Option<usize>,
    max_entries: usize,
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl MemoryHistory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: None,
            max_entries: max_entries.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn at(&self, idx: usize) -> Option<String> {
        self.entries.get(idx).cloned()
    }
}

impl History for MemoryHistory {
    fn prev(&mut self) -> Option<String> {
        let idx = match self.cursor {
            None if self.entries.is_empty() => return None,
            None => self.entries.len() - 1,
            Some(0) => return None,
            Some(i) => i - 1,
        };
        self.cursor = Some(idx);
        self.at(idx)
    }

    fn next(&mut self) -> Option<String> {
        let i = self.cursor?;
        if i + 1 >= self.entries.len() {
            self.cursor = None;
            return None;
        }
        self.cursor = Some(i + 1);
        self.at(i + 1)
    }

    fn first(&mut self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        self.cursor = Some(0);
        self.at(0)
    }

    fn last(&mut self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        let idx = self.entries.len() - 1;
        self.cursor = Some(idx);
        self.at(idx)
    }

    fn search(
        &mut self,
        query: &str,
        backward: bool,
        advance: bool,
        response: &mut String,
    ) -> bool {
        if query.is_empty() || self.entries.is_empty() {
            return false;
        }
        let len = self.entries.len();
        let start = match (self.cursor, backward) {
            (None, true) => len as isize - 1,
            (None, false) => return false,
            (Some(i), _) => i as isize,
        };
        let step: isize = if backward { -1 } else { 1 };
        let mut idx = if advance { start + step } else { start };
        while idx >= 0 && (idx as usize) < len {
            if self.entries[idx as usize].contains(query) {
                self.cursor = Some(idx as usize);
                response.clear();
                response.push_str(&self.entries[idx as usize]);
                trace!(target: "history", idx, backward, "search_hit");
                return true;
            }
            idx += step;
        }
        false
    }

    fn add(&mut self, entry: &str) {
        self.cursor = None;
        if entry.trim().is_empty() {
            return;
        }
        if self.entries.last().map(String::as_str) == Some(entry) {
            return;
        }
        if self.entries.len() == self.max_entries {
            self.entries.remove(0);
        }
        self.entries.push(entry.to_string());
    }

    fn reset(&mut self) {
        self.cursor = None;
    }
}

/// Clonable handle sharing one history across successive prompt sessions.
#[derive(Clone, Default)]
pub struct SharedHistory(std::sync::Arc<std::sync::Mutex<MemoryHistory>>);

impl SharedHistory {
    pub fn new(inner: MemoryHistory) -> Self {
        Self(std::sync::Arc::new(std::sync::Mutex::new(inner)))
    }

    fn with<R>(&self, f: impl FnOnce(&mut MemoryHistory) -> R) -> R {
        let mut guard = self.0.lock().expect("history lock poisoned");
        f(&mut guard)
    }
}

impl History for SharedHistory {
    fn prev(&mut self) -> Option<String> {
        self.with(|h| h.prev())
    }

    fn next(&mut self) -> Option<String> {
        self.with(|h| h.next())
    }

    fn first(&mut self) -> Option<String> {
        self.with(|h| h.first())
    }

    fn last(&mut self) -> Option<String> {
        self.with(|h| h.last())
    }

    fn search(
        &mut self,
        query: &str,
        backward: bool,
        advance: bool,
        response: &mut String,
    ) -> bool {
        self.with(|h| h.search(query, backward, advance, response))
    }

    fn add(&mut self, entry: &str) {
        self.with(|h| h.add(entry));
    }

    fn reset(&mut self) {
        self.with(|h| h.reset());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hist(items: &[&str]) -> MemoryHistory {
        let mut h = MemoryHistory::new(100);
        for it in items {
            h.add(it);
        }
        h
    }

    #[test]
    fn prev_next_walk() {
        let mut h = hist(&["a", "b", "c"]);
        assert_eq!(h.prev().as_deref(), Some("c"));
        assert_eq!(h.prev().as_deref(), Some("b"));
        assert_eq!(h.next().as_deref(), Some("c"));
        assert_eq!(h.next(), None);
        // walking past the newest resets navigation
        assert_eq!(h.prev().as_deref(), Some("c"));
    }

    #[test]
    fn prev_stops_at_oldest() {
        let mut h = hist(&["a", "b"]);
        h.prev();
        h.prev();
        assert_eq!(h.prev(), None);
        assert_eq!(h.first().as_deref(), Some("a"));
        assert_eq!(h.last().as_deref(), Some("b"));
    }

    #[test]
    fn search_moves_cursor_and_response() {
        let mut h = hist(&["print(1)", "x = 2", "print(3)"]);
        let mut resp = String::new();
        assert!(h.search("print", true, false, &mut resp));
        assert_eq!(resp, "print(3)");
        // repeat advances past the current hit
        assert!(h.search("print", true, true, &mut resp));
        assert_eq!(resp, "print(1)");
        assert!(!h.search("print", true, true, &mut resp));
        // reverse direction from here finds the newer hit again
        assert!(h.search("print", false, true, &mut resp));
        assert_eq!(resp, "print(3)");
    }

    #[test]
    fn consecutive_duplicates_and_blanks_skipped() {
        let mut h = hist(&["a", "a", "  ", "b"]);
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn capacity_evicts_oldest() {
        let mut h = MemoryHistory::new(2);
        h.add("a");
        h.add("b");
        h.add("c");
        assert_eq!(h.len(), 2);
        assert_eq!(h.first().as_deref(), Some("b"));
    }
}
