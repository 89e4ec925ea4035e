//! Cursor motion over the byte-addressed buffer.
//!
//! Motion is measured in characters even though offsets are bytes. Plain
//! left/right motion skips zero-width characters so the cursor never lands
//! between a base character and its combining marks; the loop stops at the
//! first column-advancing character or a newline. Word motion consumes a run
//! of delimiters followed by a run of non-delimiters, with the direction
//! choosing which comes first.

use crate::EditBuffer;
use crate::width::char_width;

/// Default word delimiters: whitespace plus a fixed punctuation set.
pub fn is_delimiter(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            '(' | ')'
                | '['
                | ']'
                | '{'
                | '}'
                | '<'
                | '>'
                | ','
                | ';'
                | ':'
                | '.'
                | '"'
                | '\''
                | '`'
                | '@'
                | '$'
                | '&'
                | '#'
                | '%'
                | '^'
                | '~'
                | '!'
                | '?'
                | '*'
                | '+'
                | '-'
                | '='
                | '|'
                | '/'
                | '\\'
        )
}

/// Delimiter set for `werase`: whitespace only.
pub fn is_whitespace_delimiter(c: char) -> bool {
    c.is_whitespace()
}

fn prev_char_start(text: &str, pos: usize) -> usize {
    debug_assert!(pos > 0);
    let mut p = pos - 1;
    while !text.is_char_boundary(p) {
        p -= 1;
    }
    p
}

/// One character left, skipping zero-width characters.
pub fn left_of(text: &str, mut pos: usize) -> usize {
    while pos > 0 {
        let prev = prev_char_start(text, pos);
        let c = text[prev..].chars().next().unwrap();
        pos = prev;
        if c == '\n' || char_width(c) > 0 || c == '\t' {
            break;
        }
    }
    pos
}

/// One character right, absorbing any trailing combining marks.
pub fn right_of(text: &str, mut pos: usize) -> usize {
    let mut chars = text[pos..].chars();
    while let Some(c) = chars.next() {
        pos += c.len_utf8();
        if c == '\n' {
            return pos;
        }
        if char_width(c) > 0 || c == '\t' {
            for d in text[pos..].chars() {
                if d != '\n' && d != '\t' && char_width(d) == 0 {
                    pos += d.len_utf8();
                } else {
                    break;
                }
            }
            return pos;
        }
    }
    pos
}

/// Start of the word to the left: skip delimiters, then the word itself.
pub fn word_left_of(text: &str, mut pos: usize, delim: impl Fn(char) -> bool) -> usize {
    while pos > 0 {
        let prev = prev_char_start(text, pos);
        let c = text[prev..].chars().next().unwrap();
        if !delim(c) {
            break;
        }
        pos = prev;
    }
    while pos > 0 {
        let prev = prev_char_start(text, pos);
        let c = text[prev..].chars().next().unwrap();
        if delim(c) {
            break;
        }
        pos = prev;
    }
    pos
}

/// End of the word to the right: skip delimiters, then the word itself.
pub fn word_right_of(text: &str, mut pos: usize, delim: impl Fn(char) -> bool) -> usize {
    let len = text.len();
    while pos < len {
        let c = text[pos..].chars().next().unwrap();
        if !delim(c) {
            break;
        }
        pos += c.len_utf8();
    }
    while pos < len {
        let c = text[pos..].chars().next().unwrap();
        if delim(c) {
            break;
        }
        pos += c.len_utf8();
    }
    pos
}

/// Byte range of the next word at or right of `pos` (skipping leading
/// delimiters), or `None` when no word follows.
pub fn next_word_range(
    text: &str,
    mut pos: usize,
    delim: impl Fn(char) -> bool,
) -> Option<(usize, usize)> {
    let len = text.len();
    while pos < len {
        let c = text[pos..].chars().next().unwrap();
        if !delim(c) {
            break;
        }
        pos += c.len_utf8();
    }
    if pos >= len {
        return None;
    }
    let start = pos;
    while pos < len {
        let c = text[pos..].chars().next().unwrap();
        if delim(c) {
            break;
        }
        pos += c.len_utf8();
    }
    Some((start, pos))
}

impl EditBuffer {
    pub fn move_left(&mut self) -> bool {
        let p = left_of(self.content(), self.position());
        let moved = p != self.position();
        self.set_position(p);
        moved
    }

    pub fn move_right(&mut self) -> bool {
        let p = right_of(self.content(), self.position());
        let moved = p != self.position();
        self.set_position(p);
        moved
    }

    pub fn move_word_left(&mut self, delim: impl Fn(char) -> bool) -> bool {
        let p = word_left_of(self.content(), self.position(), delim);
        let moved = p != self.position();
        self.set_position(p);
        moved
    }

    pub fn move_word_right(&mut self, delim: impl Fn(char) -> bool) -> bool {
        let p = word_right_of(self.content(), self.position(), delim);
        let moved = p != self.position();
        self.set_position(p);
        moved
    }

    pub fn move_line_start(&mut self) {
        let p = self.line_start(self.position());
        self.set_position(p);
    }

    pub fn move_line_end(&mut self) {
        let p = self.line_end(self.position());
        self.set_position(p);
    }

    /// Whether the cursor can move up a line (it is not on the first line).
    pub fn on_first_line(&self) -> bool {
        !self.content()[..self.position()].contains('\n')
    }

    pub fn on_last_line(&self) -> bool {
        !self.content()[self.position()..].contains('\n')
    }

    /// Move up one line, best-effort preserving the byte column.
    pub fn move_up(&mut self) -> bool {
        if self.on_first_line() {
            return false;
        }
        let pos = self.position();
        let start = self.line_start(pos);
        let col = pos - start;
        let prev_start = self.line_start(start - 1);
        let prev_end = start - 1;
        let mut target = prev_start + col.min(prev_end - prev_start);
        while !self.content().is_char_boundary(target) {
            target -= 1;
        }
        self.set_position(target);
        true
    }

    /// Move down one line, best-effort preserving the byte column.
    pub fn move_down(&mut self) -> bool {
        if self.on_last_line() {
            return false;
        }
        let pos = self.position();
        let start = self.line_start(pos);
        let col = pos - start;
        let next_start = self.line_end(pos) + 1;
        let next_end = self.line_end(next_start);
        let mut target = next_start + col.min(next_end - next_start);
        while !self.content().is_char_boundary(target) {
            target -= 1;
        }
        self.set_position(target);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn left_right_over_multibyte() {
        let text = "aβc";
        assert_eq!(right_of(text, 0), 1);
        assert_eq!(right_of(text, 1), 3);
        assert_eq!(right_of(text, 3), 4);
        assert_eq!(left_of(text, 4), 3);
        assert_eq!(left_of(text, 3), 1);
        assert_eq!(left_of(text, 1), 0);
    }

    #[test]
    fn right_absorbs_combining_marks() {
        let text = "e\u{0301}x"; // e + combining acute + x
        assert_eq!(right_of(text, 0), 3);
        assert_eq!(left_of(text, 3), 0);
    }

    #[test]
    fn motion_stops_at_newline() {
        let text = "a\nb";
        assert_eq!(right_of(text, 1), 2);
        assert_eq!(left_of(text, 2), 1);
    }

    #[test]
    fn word_left_across_unicode() {
        let text = "αβ γδ";
        let gamma = text.find('γ').unwrap();
        let end = text.len();
        assert_eq!(word_left_of(text, end, is_delimiter), gamma);
        assert_eq!(word_left_of(text, gamma, is_delimiter), 0);
    }

    #[test]
    fn word_right_lands_after_word() {
        let text = "  foo, bar";
        assert_eq!(word_right_of(text, 0, is_delimiter), 5);
        assert_eq!(word_right_of(text, 5, is_delimiter), 10);
    }

    #[test]
    fn werase_delimiters_are_whitespace_only() {
        let text = "a-b c";
        // from the end: whitespace-only delimiters treat "a-b" as one word
        assert_eq!(word_left_of(text, 3, is_whitespace_delimiter), 0);
        assert_eq!(word_left_of(text, 3, is_delimiter), 2);
    }

    #[test]
    fn next_word_range_skips_delimiters() {
        let text = "  hello world";
        assert_eq!(next_word_range(text, 0, is_delimiter), Some((2, 7)));
        assert_eq!(next_word_range(text, 7, is_delimiter), Some((8, 13)));
        assert_eq!(next_word_range(text, 13, is_delimiter), None);
    }

    #[test]
    fn vertical_motion_preserves_column() {
        let mut b = EditBuffer::from_content("alpha\nbe\ngamma");
        b.set_position(4); // 'a' column 4 of first line
        assert!(!b.move_up());
        assert!(b.move_down());
        assert_eq!(b.position(), 8); // clamped to end of "be"
        assert!(b.move_down());
        assert!(b.move_up());
        assert!(b.move_up());
        assert!(b.on_first_line());
    }
}
