//! Session state: one record per mode plus the shared pieces (kill ring,
//! terminal, options, providers), and the mode transition protocol.

use crate::paste::PasteGuard;
use replin_complete::CompleteProvider;
use replin_config::Options;
use replin_history::History;
use replin_render::{InputAreaState, RenderOpts, clear_input_area, refresh_multi_line};
use replin_state::{KillDirection, KillRing, RegionActive, UndoStack};
use replin_term::Term;
use replin_text::EditBuffer;
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeId {
    Main,
    Search,
    Prefix,
}

/// Transition target: a real mode or one of the two pseudo-modes that only
/// set flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Mode(ModeId),
    Abort,
    Reset,
}

pub type OnEnter = Box<dyn Fn(&str) -> bool + Send>;
pub type OnDone = Box<dyn FnMut(&str, bool) + Send>;

/// User-facing prompt surface.
pub struct PromptConfig {
    pub prompt: String,
    /// Escape prefix written before the prompt (usually a color).
    pub prompt_prefix: String,
    /// Escape suffix written after the prompt (usually a reset).
    pub prompt_suffix: String,
    /// Written before evaluator output by the outer loop.
    pub output_prefix: String,
    pub keep_history: bool,
    /// Keep the committed line in the buffer for the next prompt.
    pub sticky: bool,
    /// Decides whether Enter commits (`true`) or continues the line.
    pub on_enter: Option<OnEnter>,
    pub on_done: Option<OnDone>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            prompt: "> ".to_string(),
            prompt_prefix: String::new(),
            prompt_suffix: String::new(),
            output_prefix: String::new(),
            keep_history: true,
            sticky: false,
            on_enter: None,
            on_done: None,
        }
    }
}

/// Main prompt mode state.
pub struct PromptState {
    pub buf: EditBuffer,
    pub region_active: RegionActive,
    /// `None`: nothing. `Some("")`: a hint was visible and the next paint
    /// must clear forward. `Some(text)`: display-only trailing hint.
    pub hint: Option<String>,
    pub undo: UndoStack,
    pub area: InputAreaState,
    pub beep_level: u32,
    pub pending_repaint: bool,
}

impl Default for PromptState {
    fn default() -> Self {
        Self {
            buf: EditBuffer::new(),
            region_active: RegionActive::Off,
            hint: None,
            undo: UndoStack::new(),
            area: InputAreaState::default(),
            beep_level: 0,
            pending_repaint: false,
        }
    }
}

/// Incremental history search state.
pub struct SearchState {
    pub query: String,
    pub response: EditBuffer,
    pub backward: bool,
    pub failed: bool,
    pub parent: ModeId,
    pub area: InputAreaState,
}

/// Prefix-anchored history search state.
pub struct PrefixState {
    pub prefix: String,
    pub original: String,
    pub response: EditBuffer,
    pub parent: ModeId,
    pub area: InputAreaState,
}

pub struct Session {
    pub term: Box<dyn Term>,
    pub opts: Options,
    pub history: Box<dyn History>,
    pub completer: Option<Arc<dyn CompleteProvider>>,
    pub prompt: PromptConfig,

    pub main: PromptState,
    pub search: Option<SearchState>,
    pub prefix: Option<PrefixState>,
    pub current_mode: ModeId,

    pub kill: KillRing,
    /// Byte range of the text inserted by the last yank, for yank-pop.
    pub last_yank: Option<(usize, usize)>,

    pub prev_key: String,
    pub key_repeats: u32,
    pub last_action: Option<&'static str>,
    pub current_action: Option<&'static str>,

    pub paste_guard: PasteGuard,
    /// Characters the loop must feed back through the decoder (alias replay,
    /// search pass-through).
    pub reinject: Vec<char>,
    /// Set by dispatch; the loop spawns the flash task and clears it.
    pub beep_requested: bool,
    pub aborted: bool,
    pub eof: bool,
}

impl Session {
    pub fn new(
        term: Box<dyn Term>,
        opts: Options,
        history: Box<dyn History>,
        completer: Option<Arc<dyn CompleteProvider>>,
        prompt: PromptConfig,
    ) -> Self {
        let kill = KillRing::new(opts.kill_ring_max);
        let paste_guard = PasteGuard::new(opts.auto_indent_time_threshold);
        Self {
            term,
            opts,
            history,
            completer,
            prompt,
            main: PromptState::default(),
            search: None,
            prefix: None,
            current_mode: ModeId::Main,
            kill,
            last_yank: None,
            prev_key: String::new(),
            key_repeats: 0,
            last_action: None,
            current_action: None,
            paste_guard,
            reinject: Vec::new(),
            beep_requested: false,
            aborted: false,
            eof: false,
        }
    }

    pub fn main_prompt_text(&self) -> String {
        format!(
            "{}{}{}",
            self.prompt.prompt_prefix, self.prompt.prompt, self.prompt.prompt_suffix
        )
    }

    fn search_prompt_text(&self) -> String {
        let Some(search) = &self.search else {
            return String::new();
        };
        let dir = if search.backward {
            "reverse-i-search"
        } else {
            "i-search"
        };
        let failed = if search.failed { "failed " } else { "" };
        format!("({failed}{dir})`{}': ", search.query)
    }

    /// Queue an audible bell now; the event loop turns `beep_requested` into
    /// the timed visual flash.
    pub fn beep(&mut self) {
        self.term.beep();
        if self.opts.beep_duration > 0 {
            self.beep_requested = true;
        }
    }

    /// Repaint the current mode over its previous area. Output stays queued
    /// until the caller flushes.
    pub fn repaint(&mut self) {
        match self.current_mode {
            ModeId::Main => {
                let prompt = self.main_prompt_text();
                let region = self
                    .main
                    .region_active
                    .is_active()
                    .then(|| self.main.buf.region())
                    .flatten()
                    .filter(|(lo, hi)| lo != hi);
                let sgr = (self.main.beep_level > 0 && !self.opts.beep_use_current)
                    .then(|| self.opts.beep_sgr(0));
                let opts = RenderOpts {
                    region,
                    hint: self.main.hint.as_deref(),
                    text_sgr: sgr,
                    tabwidth: self.opts.tabwidth,
                };
                self.main.area = refresh_multi_line(
                    self.term.as_mut(),
                    &prompt,
                    &self.main.buf,
                    &self.main.area,
                    &opts,
                );
                if self.main.hint.as_deref() == Some("") {
                    self.main.hint = None;
                }
                self.main.pending_repaint = false;
            }
            ModeId::Search => {
                let prompt = self.search_prompt_text();
                let Some(search) = &mut self.search else {
                    return;
                };
                let opts = RenderOpts {
                    tabwidth: self.opts.tabwidth,
                    ..Default::default()
                };
                search.area = refresh_multi_line(
                    self.term.as_mut(),
                    &prompt,
                    &search.response,
                    &search.area,
                    &opts,
                );
            }
            ModeId::Prefix => {
                let prompt = self.main_prompt_text();
                let Some(prefix) = &mut self.prefix else {
                    return;
                };
                let opts = RenderOpts {
                    tabwidth: self.opts.tabwidth,
                    ..Default::default()
                };
                prefix.area = refresh_multi_line(
                    self.term.as_mut(),
                    &prompt,
                    &prefix.response,
                    &prefix.area,
                    &opts,
                );
            }
        }
    }

    fn clear_mode_area(&mut self, mode: ModeId) {
        let area = match mode {
            ModeId::Main => &mut self.main.area,
            ModeId::Search => match &mut self.search {
                Some(s) => &mut s.area,
                None => return,
            },
            ModeId::Prefix => match &mut self.prefix {
                Some(p) => &mut p.area,
                None => return,
            },
        };
        let old = *area;
        *area = InputAreaState::default();
        clear_input_area(self.term.as_mut(), &old);
    }

    /// Switch modes: cancel the pending beep, clear the old mode's input
    /// area, switch, then render the new mode and flush.
    pub fn transition(&mut self, to: ModeId) {
        self.transition_with(Target::Mode(to), |_| {});
    }

    /// Full transition protocol with a callback run between the mode switch
    /// and the activation paint. The pseudo-targets set their flag and
    /// return without touching the screen.
    pub fn transition_with(&mut self, to: Target, inside: impl FnOnce(&mut Session)) {
        self.main.beep_level = 0;
        self.beep_requested = false;
        match to {
            Target::Abort => {
                self.aborted = true;
            }
            Target::Reset => {
                self.main.buf.reset_to("");
                self.main.undo.clear();
                self.main.hint = None;
                self.search = None;
                self.prefix = None;
                self.current_mode = ModeId::Main;
            }
            Target::Mode(to) => {
                let from = self.current_mode;
                self.clear_mode_area(from);
                self.current_mode = to;
                debug!(target: "modal", from = ?from, to = ?to, "mode_transition");
                inside(self);
                self.repaint();
                let _ = self.term.flush();
            }
        }
    }

    /// Enter incremental history search from the current mode.
    pub fn enter_search(&mut self, backward: bool) {
        let parent = self.current_mode;
        let response = EditBuffer::from_content(self.main.buf.content());
        self.history.reset();
        self.search = Some(SearchState {
            query: String::new(),
            response,
            backward,
            failed: false,
            parent,
            area: InputAreaState::default(),
        });
        self.transition(ModeId::Search);
    }

    /// Enter prefix history search, capturing the buffer up to the cursor.
    pub fn enter_prefix_search(&mut self) {
        let parent = self.current_mode;
        let buf = &self.main.buf;
        let prefix = buf.content()[..buf.position()].to_string();
        self.history.reset();
        self.prefix = Some(PrefixState {
            prefix,
            original: buf.content().to_string(),
            response: EditBuffer::from_content(buf.content()),
            parent,
            area: InputAreaState::default(),
        });
        self.transition(ModeId::Prefix);
    }

    /// Leave a search mode, optionally accepting the response into the
    /// parent buffer.
    pub fn leave_search(&mut self, accept: bool) {
        let parent = match self.current_mode {
            ModeId::Search => {
                let Some(search) = self.search.take() else {
                    return;
                };
                if accept {
                    let pos = search.response.position();
                    self.main.buf.reset_to(search.response.content());
                    self.main.buf.set_position(pos.min(self.main.buf.len()));
                }
                search.parent
            }
            ModeId::Prefix => {
                let Some(prefix) = self.prefix.take() else {
                    return;
                };
                if accept {
                    self.main.buf.reset_to(prefix.response.content());
                }
                prefix.parent
            }
            ModeId::Main => return,
        };
        self.history.reset();
        self.transition(parent);
    }

    /// Record killed text, merging with the tail when the same kill command
    /// repeats within one action chain.
    pub fn record_kill(&mut self, text: &str, dir: KillDirection) {
        if text.is_empty() {
            return;
        }
        if self.last_action.is_some() && self.last_action == self.current_action {
            self.kill.merge(text, dir);
        } else {
            self.kill.push(text.to_string());
        }
        trace!(target: "state.kill", ring_len = self.kill.len(), "kill_recorded");
    }

    /// Snapshot the main buffer before a mutating command.
    pub fn push_undo(&mut self) {
        let content = self.main.buf.content().to_string();
        let pos = self.main.buf.position();
        self.main.undo.push(&content, pos);
    }

    /// Install or clear the hint from the hint worker.
    pub fn set_hint(&mut self, hint: Option<String>) {
        match hint {
            Some(text) if !text.is_empty() => self.main.hint = Some(text),
            _ => {
                if matches!(self.main.hint.as_deref(), Some(h) if !h.is_empty()) {
                    self.main.hint = Some(String::new());
                } else {
                    self.main.hint = None;
                }
            }
        }
    }

    /// Flag a visible hint for clearing on the next paint.
    pub fn invalidate_hint(&mut self) {
        if matches!(self.main.hint.as_deref(), Some(h) if !h.is_empty()) {
            self.main.hint = Some(String::new());
        }
    }
}
