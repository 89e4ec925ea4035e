//! Paste handling: the bracketed-paste payload transform and the timing
//! heuristic used on terminals without bracketed paste.

use replin_text::width::expand_tabs;
use std::time::{Duration, Instant};
use tracing::debug;

pub const PASTE_START: &str = "\x1b[200~";
pub const PASTE_END: &str = "\x1b[201~";

/// Detects paste-speed typing. Two successive non-space insertions closer
/// together than the threshold suppress auto-indent for subsequent newlines;
/// the first insertion at human speed clears the suppression again.
#[derive(Debug)]
pub struct PasteGuard {
    threshold: Duration,
    last_insert: Option<Instant>,
    tmp_off: bool,
}

impl PasteGuard {
    pub fn new(threshold_ms: u64) -> Self {
        Self {
            threshold: Duration::from_millis(threshold_ms),
            last_insert: None,
            tmp_off: false,
        }
    }

    /// Record an insertion. Space insertions do not participate.
    pub fn note_insert(&mut self, now: Instant, is_space: bool) {
        if is_space {
            return;
        }
        let quick = self
            .last_insert
            .is_some_and(|prev| now.duration_since(prev) < self.threshold);
        if self.tmp_off != quick {
            debug!(target: "input.paste", suppressed = quick, "auto_indent_suppression");
        }
        self.tmp_off = quick;
        self.last_insert = Some(now);
    }

    pub fn suppress_indent(&self) -> bool {
        self.tmp_off
    }
}

/// Normalize a bracketed-paste payload: CR becomes LF, tabs expand to
/// spaces, and the common leading indentation of continuation lines is
/// stripped so pasted blocks do not double-indent.
pub fn process_paste(input: &str, tabwidth: usize) -> String {
    let unified = input.replace("\r\n", "\n").replace('\r', "\n");
    let expanded = expand_tabs(&unified, 0, tabwidth);

    let mut lines = expanded.split('\n');
    let first = lines.next().unwrap_or_default();
    let rest: Vec<&str> = lines.collect();
    if rest.is_empty() {
        return expanded;
    }
    let common = rest
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start_matches(' ').len())
        .min()
        .unwrap_or(0);
    let mut out = String::with_capacity(expanded.len());
    out.push_str(first);
    for line in rest {
        out.push('\n');
        out.push_str(line.get(common.min(line.len())..).unwrap_or(""));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quick_pair_suppresses_until_slow_insert() {
        let mut g = PasteGuard::new(10);
        let t0 = Instant::now();
        g.note_insert(t0, false);
        assert!(!g.suppress_indent());
        g.note_insert(t0 + Duration::from_millis(2), false);
        assert!(g.suppress_indent());
        // still suppressed through the burst
        g.note_insert(t0 + Duration::from_millis(4), false);
        assert!(g.suppress_indent());
        // a human-speed keystroke clears it
        g.note_insert(t0 + Duration::from_millis(500), false);
        assert!(!g.suppress_indent());
    }

    #[test]
    fn spaces_do_not_participate() {
        let mut g = PasteGuard::new(10);
        let t0 = Instant::now();
        g.note_insert(t0, false);
        g.note_insert(t0 + Duration::from_millis(1), true);
        assert!(!g.suppress_indent());
    }

    #[test]
    fn paste_normalizes_line_endings() {
        assert_eq!(process_paste("a\r\nb\rc", 8), "a\nb\nc");
    }

    #[test]
    fn paste_strips_common_indent_of_continuation_lines() {
        let input = "if x:\n        y = 1\n        z = 2";
        assert_eq!(process_paste(input, 8), "if x:\ny = 1\nz = 2");
        let mixed = "a\n    b\n        c";
        assert_eq!(process_paste(mixed, 8), "a\nb\n    c");
    }

    #[test]
    fn paste_expands_tabs() {
        assert_eq!(process_paste("a\tb", 4), "a   b");
    }

    #[test]
    fn blank_continuation_lines_ignored_for_indent() {
        let input = "x\n    a\n\n    b";
        assert_eq!(process_paste(input, 8), "x\na\n\nb");
    }
}
