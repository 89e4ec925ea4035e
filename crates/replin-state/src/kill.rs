//! Bounded kill ring shared by all modes.
//!
//! Kills either open a fresh entry or, when the same kill command repeats
//! within one action chain, merge into the tail. The merge direction matches
//! the deletion direction: backward deletions prepend, forward deletions
//! append. Yank reads the entry under the rotating index; yank-pop steps the
//! index backward with wraparound.

use std::collections::VecDeque;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillDirection {
    Forward,
    Backward,
}

#[derive(Debug)]
pub struct KillRing {
    entries: VecDeque<String>,
    max: usize,
    idx: usize,
}

impl KillRing {
    pub fn new(max: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max: max.max(1),
            idx: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record killed text as a fresh entry, evicting the oldest when full.
    pub fn push(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        if self.entries.len() == self.max {
            self.entries.pop_front();
        }
        self.entries.push_back(text);
        self.idx = self.entries.len() - 1;
        trace!(target: "state.kill", len = self.entries.len(), "kill_push");
    }

    /// Merge killed text into the tail entry in the given direction, opening
    /// a fresh entry when the ring is empty.
    pub fn merge(&mut self, text: &str, dir: KillDirection) {
        if text.is_empty() {
            return;
        }
        match self.entries.back_mut() {
            Some(tail) => {
                match dir {
                    KillDirection::Forward => tail.push_str(text),
                    KillDirection::Backward => tail.insert_str(0, text),
                }
                self.idx = self.entries.len() - 1;
                trace!(target: "state.kill", dir = ?dir, "kill_merge");
            }
            None => self.push(text.to_string()),
        }
    }

    /// The entry a yank would insert.
    pub fn current(&self) -> Option<&str> {
        self.entries.get(self.idx).map(String::as_str)
    }

    /// Rotate to the previous entry (for yank-pop), wrapping at the front.
    pub fn rotate_back(&mut self) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        self.idx = (self.idx + self.entries.len() - 1) % self.entries.len();
        self.current()
    }
}
