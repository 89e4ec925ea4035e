//! Multi-line prompt renderer.
//!
//! Each repaint erases the previously painted area bottom-up (never
//! scrolling, never touching rows it did not paint), rewrites the prompt and
//! buffer with wrap-aware row accounting, and leaves the terminal cursor on
//! the buffer's insertion point. All output is queued on the terminal and
//! flushed by the caller in one write.
//!
//! Row arithmetic is simulated per character rather than per line so that
//! deferred wrap at the right margin, wide characters, and tab stops all
//! land on the same answer the terminal will produce.

use replin_term::Term;
use replin_text::EditBuffer;
use replin_text::width::{ansi_width, char_width, str_width};
use tracing::trace;

const REVERSE_ON: &str = "\x1b[7m";
const REVERSE_OFF: &str = "\x1b[27m";
const DIM_ON: &str = "\x1b[90m";
const SGR_RESET: &str = "\x1b[0m";

/// Extent of the terminal area occupied by the previous paint. Rows are
/// 1-based; `curs_row <= num_rows` whenever `num_rows > 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputAreaState {
    pub num_rows: usize,
    pub curs_row: usize,
}

impl Default for InputAreaState {
    fn default() -> Self {
        Self {
            num_rows: 0,
            curs_row: 1,
        }
    }
}

/// Per-paint policy flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOpts<'a> {
    /// Active region to show in reverse video, as buffer byte offsets.
    pub region: Option<(usize, usize)>,
    /// `Some("")` requests a clear-to-end-of-screen before painting (a hint
    /// was visible and must go away); `Some(text)` paints a dim trailing
    /// hint after the cursor.
    pub hint: Option<&'a str>,
    /// SGR prefix applied to the buffer text (used by the beep flash).
    pub text_sgr: Option<&'a str>,
    pub tabwidth: usize,
}

/// Erase the previously painted area, leaving the cursor at column 0 of its
/// top row.
pub fn clear_input_area(term: &mut dyn Term, area: &InputAreaState) {
    if area.num_rows > 0 {
        term.cmove_down(area.num_rows - area.curs_row);
        for _ in 1..area.num_rows {
            term.clear_line();
            term.cmove_up(1);
        }
    }
    term.clear_line();
    term.cmove_col(0);
}

struct RowTracker {
    cols: usize,
    row: usize,
    col: usize,
    out: String,
}

impl RowTracker {
    fn new(cols: usize) -> Self {
        Self {
            cols,
            row: 1,
            col: 0,
            out: String::new(),
        }
    }

    /// Advance over `w` cells, wrapping the way the terminal will.
    fn advance(&mut self, w: usize) {
        if self.col + w > self.cols {
            self.row += 1;
            self.col = 0;
        }
        self.col += w;
    }

    fn push_char(&mut self, c: char, tabwidth: usize) {
        if c == '\t' {
            let tw = tabwidth.max(1);
            let n = tw - self.col % tw;
            for _ in 0..n {
                self.advance(1);
                self.out.push(' ');
            }
            return;
        }
        self.advance(char_width(c));
        self.out.push(c);
    }

    fn newline(&mut self) {
        self.out.push_str("\r\n");
        self.row += 1;
        self.col = 0;
    }

    /// Where the insertion point sits if it is at the current offset,
    /// resolving deferred wrap to the start of the next row.
    fn cursor_here(&self) -> (usize, usize) {
        if self.col == self.cols && self.cols > 0 {
            (self.row + 1, 0)
        } else {
            (self.row, self.col)
        }
    }

    fn would_exceed(&self, w: usize) -> bool {
        self.col + w > self.cols
    }
}

/// Pre-measure the paint: total rows and the cursor row, with identical wrap
/// arithmetic to the emitting pass.
fn measure(
    text: &str,
    position: usize,
    cols: usize,
    prompt_width: usize,
    tabwidth: usize,
) -> (usize, usize) {
    let mut t = RowTracker::new(cols);
    t.col = prompt_width.min(cols.saturating_sub(1));
    let mut curs_row = None;
    for (b, c) in text.char_indices() {
        if b == position {
            curs_row = Some(t.cursor_here().0);
        }
        if c == '\n' {
            t.newline();
        } else {
            t.push_char(c, tabwidth);
        }
    }
    let curs_row = curs_row.unwrap_or_else(|| t.cursor_here().0);
    (t.row.max(curs_row), curs_row)
}

/// Repaint prompt and buffer over the previously painted area and return the
/// new area extent. The caller is responsible for flushing.
pub fn refresh_multi_line(
    term: &mut dyn Term,
    prompt: &str,
    buf: &EditBuffer,
    prior: &InputAreaState,
    opts: &RenderOpts<'_>,
) -> InputAreaState {
    let cols = term.width().max(2);
    let height = term.height().max(1);
    let prompt_width = ansi_width(prompt);

    clear_input_area(term, prior);
    if opts.hint == Some("") {
        term.write_str("\x1b[0J");
    }

    let mut t = RowTracker::new(cols);
    t.out.push_str(prompt);
    t.col = prompt_width.min(cols.saturating_sub(1));
    if let Some(sgr) = opts.text_sgr {
        t.out.push_str(sgr);
    }

    let text = buf.content();
    let position = buf.position();
    let mut cursor: Option<(usize, usize)> = None;
    let mut rv_open = false;

    // center the cursor row under height pressure: rows before the cursor
    // are still emitted (they scroll out), emission stops half a screen past
    // it. With a single-row terminal this drops the trailing newline of the
    // cursor's own line.
    let (rows_full, crow_full) = measure(text, position, cols, t.col, opts.tabwidth);
    let limit = (rows_full > height).then_some(crow_full + height / 2);

    for (b, c) in text.char_indices() {
        if b == position {
            cursor = Some(t.cursor_here());
        }
        if let Some((lo, hi)) = opts.region {
            debug_assert!(lo <= hi);
            if b == lo && lo != hi {
                t.out.push_str(REVERSE_ON);
                rv_open = true;
            }
            if b == hi && rv_open {
                t.out.push_str(REVERSE_OFF);
                rv_open = false;
            }
        }
        if c == '\n' {
            if let Some(l) = limit
                && cursor.is_some()
                && t.row >= l
            {
                break;
            }
            t.newline();
        } else {
            if let Some(l) = limit
                && cursor.is_some()
                && t.row >= l
                && t.would_exceed(char_width(c).max(1))
            {
                break;
            }
            t.push_char(c, opts.tabwidth);
        }
    }
    if rv_open {
        t.out.push_str(REVERSE_OFF);
    }
    let mut cursor = cursor.unwrap_or_else(|| t.cursor_here());
    if opts.text_sgr.is_some() {
        t.out.push_str(SGR_RESET);
    }

    // a cursor resolved onto a row nothing has been written to yet needs the
    // wrap made real
    if cursor.0 > t.row {
        t.newline();
    }
    let total_rows = t.row;
    if cursor.0 > total_rows {
        cursor = (total_rows, 0);
    }

    term.write_str(&t.out);

    // trailing display-only hint, cursor moved back over it
    if let Some(hint) = opts.hint
        && !hint.is_empty()
        && position == text.len()
    {
        let hw = str_width(hint);
        if term.hascolor() {
            term.write_str(DIM_ON);
            term.write_str(hint);
            term.write_str(SGR_RESET);
        } else {
            term.write_str(hint);
        }
        term.cmove_left(hw);
    }

    term.cmove_up(total_rows - cursor.0);
    term.cmove_col(cursor.1);

    let area = InputAreaState {
        num_rows: total_rows,
        curs_row: cursor.0,
    };
    trace!(target: "render", rows = area.num_rows, curs_row = area.curs_row, "repaint");
    area
}

/// Paint a candidate list under the input area in width-fitted columns. The
/// caller repaints the prompt afterwards with a fresh [`InputAreaState`].
pub fn paint_candidate_list(term: &mut dyn Term, area: &InputAreaState, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let cols = term.width().max(2);
    term.cmove_down(area.num_rows.saturating_sub(area.curs_row));
    term.write_str("\r\n");
    let widest = items.iter().map(|s| str_width(s)).max().unwrap_or(0) + 2;
    let per_row = (cols / widest).max(1);
    for chunk in items.chunks(per_row) {
        let mut line = String::new();
        for item in chunk {
            line.push_str(item);
            for _ in str_width(item)..widest {
                line.push(' ');
            }
        }
        line.push_str("\r\n");
        term.write_str(&line);
    }
}
