//! Byte-addressed editable text buffer.
//!
//! The buffer is a UTF-8 string addressed in bytes, with an insertion point
//! and an optional sticky mark. All mutation funnels through [`EditBuffer::splice`],
//! which keeps both offsets "with the text" as bytes are replaced. Motion and
//! width-aware helpers live in [`motion`] and [`width`]; higher-level edit
//! commands (transpose, case, indentation) live in [`ops`].
//!
//! Invariants, checked in debug builds:
//! * `position <= len`, and `position` is always on a character boundary.
//! * When set, `mark <= len` and sits on a character boundary.

pub mod motion;
pub mod ops;
pub mod width;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditBuffer {
    text: String,
    position: usize,
    mark: Option<usize>,
}

impl EditBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct from initial content with the cursor at the end.
    pub fn from_content(content: &str) -> Self {
        Self {
            text: content.to_string(),
            position: content.len(),
            mark: None,
        }
    }

    pub fn content(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn at_end(&self) -> bool {
        self.position == self.text.len()
    }

    pub fn set_position(&mut self, pos: usize) {
        debug_assert!(pos <= self.text.len() && self.text.is_char_boundary(pos));
        self.position = pos;
    }

    pub fn mark(&self) -> Option<usize> {
        self.mark
    }

    pub fn set_mark(&mut self, pos: usize) {
        debug_assert!(pos <= self.text.len() && self.text.is_char_boundary(pos));
        self.mark = Some(pos);
    }

    pub fn clear_mark(&mut self) {
        self.mark = None;
    }

    /// The active region as `(lo, hi)`, ordered, when a mark is set.
    pub fn region(&self) -> Option<(usize, usize)> {
        self.mark
            .map(|m| (m.min(self.position), m.max(self.position)))
    }

    pub fn char_at(&self, pos: usize) -> Option<char> {
        self.text[pos..].chars().next()
    }

    pub fn char_before(&self, pos: usize) -> Option<char> {
        self.text[..pos].chars().next_back()
    }

    /// Byte index of the first character of the line containing `pos`.
    pub fn line_start(&self, pos: usize) -> usize {
        self.text[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0)
    }

    /// Byte index of the newline terminating the line containing `pos`, or
    /// the buffer length for the last line.
    pub fn line_end(&self, pos: usize) -> usize {
        self.text[pos..]
            .find('\n')
            .map(|i| pos + i)
            .unwrap_or(self.text.len())
    }

    /// Replace bytes `[lo, hi)` with `ins`, returning the removed text.
    ///
    /// The cursor stays with the text: clamped to `lo` when it was inside the
    /// replaced range, shifted by the length delta when it was past it. The
    /// mark follows the same rule except when it sits strictly inside the
    /// range (or both endpoints coincide with it), where `rigid_mark` decides
    /// whether it clamps to the start of the replacement or lands after it.
    pub fn splice(&mut self, lo: usize, hi: usize, ins: &str, rigid_mark: bool) -> String {
        debug_assert!(lo <= hi && hi <= self.text.len());
        debug_assert!(self.text.is_char_boundary(lo) && self.text.is_char_boundary(hi));
        let removed = self.text[lo..hi].to_string();
        self.text.replace_range(lo..hi, ins);

        let p = self.position;
        self.position = if p < lo {
            p
        } else if p >= hi {
            p - (hi - lo) + ins.len()
        } else {
            lo
        };

        self.mark = self.mark.map(|m| {
            if m < lo {
                m
            } else if lo == hi && m == lo {
                if rigid_mark { lo } else { lo + ins.len() }
            } else if m >= hi {
                m - (hi - lo) + ins.len()
            } else if m == lo {
                lo
            } else if rigid_mark {
                lo
            } else {
                lo + ins.len()
            }
        });

        removed
    }

    /// Insert at the cursor, leaving the cursor after the inserted text.
    pub fn insert(&mut self, s: &str) {
        let p = self.position;
        self.splice(p, p, s, true);
    }

    /// Delete `[lo, hi)`, returning the removed text.
    pub fn delete_range(&mut self, lo: usize, hi: usize) -> String {
        self.splice(lo, hi, "", true)
    }

    /// Replace the whole content, placing the cursor at the end.
    pub fn reset_to(&mut self, content: &str) {
        self.text.clear();
        self.text.push_str(content);
        self.position = self.text.len();
        self.mark = None;
    }
}
