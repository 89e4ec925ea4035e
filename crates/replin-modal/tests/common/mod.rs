//! Shared fixtures: a terminal handle that keeps its recording alive after
//! the session consumes it, and a deliberately slow completion provider.

use replin_complete::{CompleteProvider, Completions, NamedCompletion};
use replin_term::{ScriptedTerm, Term};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Terminal wrapper so tests can inspect what the session wrote after
/// `run_interface` has consumed the boxed terminal.
#[derive(Clone)]
pub struct TeeTerm(pub Arc<Mutex<ScriptedTerm>>);

impl TeeTerm {
    pub fn new(width: usize, height: usize) -> Self {
        Self(Arc::new(Mutex::new(ScriptedTerm::new(width, height))))
    }

    pub fn written(&self) -> String {
        self.0.lock().unwrap().written()
    }
}

impl Term for TeeTerm {
    fn raw_mode(&mut self, on: bool) -> anyhow::Result<()> {
        self.0.lock().unwrap().raw_mode(on)
    }

    fn width(&self) -> usize {
        self.0.lock().unwrap().width()
    }

    fn height(&self) -> usize {
        self.0.lock().unwrap().height()
    }

    fn clear_line(&mut self) {
        self.0.lock().unwrap().clear_line()
    }

    fn cmove_up(&mut self, n: usize) {
        self.0.lock().unwrap().cmove_up(n)
    }

    fn cmove_down(&mut self, n: usize) {
        self.0.lock().unwrap().cmove_down(n)
    }

    fn cmove_col(&mut self, col: usize) {
        self.0.lock().unwrap().cmove_col(col)
    }

    fn cmove_left(&mut self, n: usize) {
        self.0.lock().unwrap().cmove_left(n)
    }

    fn write(&mut self, bytes: &[u8]) {
        self.0.lock().unwrap().write(bytes)
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        self.0.lock().unwrap().flush()
    }

    fn enable_bracketed_paste(&mut self) {
        self.0.lock().unwrap().enable_bracketed_paste()
    }

    fn disable_bracketed_paste(&mut self) {
        self.0.lock().unwrap().disable_bracketed_paste()
    }

    fn hascolor(&self) -> bool {
        self.0.lock().unwrap().hascolor()
    }
}

/// Provider that takes a configurable time to answer, for hint-race tests.
pub struct SlowProvider {
    pub delay: Duration,
    pub candidates: Vec<String>,
}

impl CompleteProvider for SlowProvider {
    fn complete_line(
        &self,
        buffer: &str,
        position: usize,
        _scope: &str,
        _hint: bool,
    ) -> Completions {
        std::thread::sleep(self.delay);
        let start = buffer[..position]
            .rfind(|c: char| !c.is_alphanumeric())
            .map(|i| i + 1)
            .unwrap_or(0);
        Completions {
            candidates: self
                .candidates
                .iter()
                .map(|c| NamedCompletion::new(c.as_str()))
                .collect(),
            range: start..position,
            should_complete: true,
        }
    }
}
