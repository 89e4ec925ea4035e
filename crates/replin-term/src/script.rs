//! Scripted terminal for tests: records every queued operation and serves a
//! canned byte stream as input.

use crate::{Term, TermReader};
use anyhow::Result;
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermOp {
    Up(usize),
    Down(usize),
    Col(usize),
    Left(usize),
    ClearLine,
    Write(Vec<u8>),
    Flush,
}

pub struct ScriptedTerm {
    pub ops: Vec<TermOp>,
    pub width: usize,
    pub height: usize,
    pub color: bool,
    pub raw: bool,
    pub bracketed_paste: bool,
}

impl Default for ScriptedTerm {
    fn default() -> Self {
        Self::new(80, 24)
    }
}

impl ScriptedTerm {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            ops: Vec::new(),
            width,
            height,
            color: true,
            raw: false,
            bracketed_paste: false,
        }
    }

    /// Everything written so far, concatenated, with motion ops skipped.
    /// Convenient for content assertions.
    pub fn written(&self) -> String {
        let mut out = Vec::new();
        for op in &self.ops {
            if let TermOp::Write(bytes) = op {
                out.extend_from_slice(bytes);
            }
        }
        String::from_utf8_lossy(&out).into_owned()
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }
}

impl Term for ScriptedTerm {
    fn raw_mode(&mut self, on: bool) -> Result<()> {
        self.raw = on;
        Ok(())
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn clear_line(&mut self) {
        self.ops.push(TermOp::ClearLine);
    }

    fn cmove_up(&mut self, n: usize) {
        if n > 0 {
            self.ops.push(TermOp::Up(n));
        }
    }

    fn cmove_down(&mut self, n: usize) {
        if n > 0 {
            self.ops.push(TermOp::Down(n));
        }
    }

    fn cmove_col(&mut self, col: usize) {
        self.ops.push(TermOp::Col(col));
    }

    fn cmove_left(&mut self, n: usize) {
        if n > 0 {
            self.ops.push(TermOp::Left(n));
        }
    }

    fn write(&mut self, bytes: &[u8]) {
        self.ops.push(TermOp::Write(bytes.to_vec()));
    }

    fn flush(&mut self) -> Result<()> {
        self.ops.push(TermOp::Flush);
        Ok(())
    }

    fn enable_bracketed_paste(&mut self) {
        self.bracketed_paste = true;
    }

    fn disable_bracketed_paste(&mut self) {
        self.bracketed_paste = false;
    }

    fn hascolor(&self) -> bool {
        self.color
    }
}

/// Canned input byte stream.
pub struct ScriptedReader {
    bytes: VecDeque<u8>,
}

impl ScriptedReader {
    pub fn new(script: &[u8]) -> Self {
        Self {
            bytes: script.iter().copied().collect(),
        }
    }
}

impl TermReader for ScriptedReader {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        Ok(self.bytes.pop_front())
    }

    fn eof(&self) -> bool {
        self.bytes.is_empty()
    }
}
