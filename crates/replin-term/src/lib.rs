//! Terminal abstraction consumed by the renderer and event loop.
//!
//! The write half queues cursor motion and text into an internal buffer that
//! [`Term::flush`] hands to the terminal in a single write, which avoids
//! flicker during repaints. The read half is a separate trait so the input
//! task can own it while the session owns the writer.

use anyhow::Result;
use crossterm::{
    cursor::{MoveLeft, MoveToColumn, MoveUp},
    queue,
    terminal::{Clear, ClearType, disable_raw_mode, enable_raw_mode},
    tty::IsTty,
};
use std::io::{Read, Write, stdout};

pub mod script;
pub use script::{ScriptedReader, ScriptedTerm, TermOp};

pub trait Term: Send {
    fn raw_mode(&mut self, on: bool) -> Result<()>;
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    /// Queue a clear of the current line.
    fn clear_line(&mut self);
    fn cmove_up(&mut self, n: usize);
    fn cmove_down(&mut self, n: usize);
    fn cmove_col(&mut self, col: usize);
    fn cmove_left(&mut self, n: usize);
    /// Queue raw bytes for the next flush.
    fn write(&mut self, bytes: &[u8]);
    /// Write everything queued in one system call.
    fn flush(&mut self) -> Result<()>;
    fn enable_bracketed_paste(&mut self);
    fn disable_bracketed_paste(&mut self);
    fn hascolor(&self) -> bool;

    fn write_str(&mut self, s: &str) {
        self.write(s.as_bytes());
    }

    /// Audible bell.
    fn beep(&mut self) {
        self.write(b"\x07");
    }
}

/// Blocking byte source owned by the input task.
pub trait TermReader: Send {
    /// Next raw byte, or `None` at end of input.
    fn read_byte(&mut self) -> Result<Option<u8>>;
    fn eof(&self) -> bool;
}

// -------------------------------------------------------------------------------------------------
// Crossterm-backed implementation
// -------------------------------------------------------------------------------------------------

pub struct CrosstermTerm {
    buf: Vec<u8>,
    raw: bool,
}

impl Default for CrosstermTerm {
    fn default() -> Self {
        Self::new()
    }
}

impl CrosstermTerm {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(4096),
            raw: false,
        }
    }
}

impl Term for CrosstermTerm {
    fn raw_mode(&mut self, on: bool) -> Result<()> {
        if on && !self.raw {
            enable_raw_mode()?;
            self.raw = true;
        } else if !on && self.raw {
            disable_raw_mode()?;
            self.raw = false;
        }
        Ok(())
    }

    fn width(&self) -> usize {
        crossterm::terminal::size().map(|(w, _)| w as usize).unwrap_or(80)
    }

    fn height(&self) -> usize {
        crossterm::terminal::size().map(|(_, h)| h as usize).unwrap_or(24)
    }

    fn clear_line(&mut self) {
        let _ = queue!(self.buf, Clear(ClearType::CurrentLine));
    }

    fn cmove_up(&mut self, n: usize) {
        if n > 0 {
            let _ = queue!(self.buf, MoveUp(n as u16));
        }
    }

    fn cmove_down(&mut self, n: usize) {
        if n > 0 {
            let _ = queue!(self.buf, crossterm::cursor::MoveDown(n as u16));
        }
    }

    fn cmove_col(&mut self, col: usize) {
        let _ = queue!(self.buf, MoveToColumn(col as u16));
    }

    fn cmove_left(&mut self, n: usize) {
        if n > 0 {
            let _ = queue!(self.buf, MoveLeft(n as u16));
        }
    }

    fn write(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    fn flush(&mut self) -> Result<()> {
        let mut out = stdout();
        out.write_all(&self.buf)?;
        out.flush()?;
        self.buf.clear();
        Ok(())
    }

    fn enable_bracketed_paste(&mut self) {
        self.write(b"\x1b[?2004h");
    }

    fn disable_bracketed_paste(&mut self) {
        self.write(b"\x1b[?2004l");
    }

    fn hascolor(&self) -> bool {
        stdout().is_tty() && std::env::var("TERM").map(|t| t != "dumb").unwrap_or(true)
    }
}

impl Drop for CrosstermTerm {
    fn drop(&mut self) {
        if self.raw {
            let _ = disable_raw_mode();
        }
    }
}

/// Blocking stdin reader for the input task.
#[derive(Default)]
pub struct StdinReader {
    eof: bool,
}

impl StdinReader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TermReader for StdinReader {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        let n = std::io::stdin().lock().read(&mut byte)?;
        if n == 0 {
            self.eof = true;
            return Ok(None);
        }
        Ok(Some(byte[0]))
    }

    fn eof(&self) -> bool {
        self.eof
    }
}

/// RAII guard restoring cooked mode and bracketed-paste state even when the
/// caller unwinds.
pub struct RawGuard<'a> {
    term: &'a mut dyn Term,
}

impl<'a> RawGuard<'a> {
    pub fn enter(term: &'a mut dyn Term) -> Result<Self> {
        term.raw_mode(true)?;
        term.enable_bracketed_paste();
        term.flush()?;
        Ok(Self { term })
    }

    pub fn term(&mut self) -> &mut dyn Term {
        self.term
    }
}

impl Drop for RawGuard<'_> {
    fn drop(&mut self) {
        self.term.disable_bracketed_paste();
        let _ = self.term.flush();
        let _ = self.term.raw_mode(false);
    }
}
