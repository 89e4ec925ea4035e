//! The interface event loop.
//!
//! One blocking input thread turns raw terminal bytes into characters on a
//! bounded channel. The async loop walks them through the current mode's
//! keymap trie, runs resolved actions under the line-modify lock, repaints,
//! and exits on commit or abort. Two auxiliary tasks exist: the
//! deferred-action inbox (which runs closures under the line lock on behalf
//! of timers and external subsystems) and on-demand hint generation.

use crate::Outcome;
use crate::action::EditorAction;
use crate::bindings;
use crate::dispatch::dispatch;
use crate::hint::{SharedHandles, spawn_hint_task};
use crate::paste::{PASTE_END, process_paste};
use crate::session::{ModeId, PromptConfig, Session};
use anyhow::Result;
use replin_complete::CompleteProvider;
use replin_config::Options;
use replin_history::History;
use replin_keymap::{Decoded, Decoder, Keymap, Layer};
use replin_render::InputAreaState;
use replin_term::{Term, TermReader};
use replin_text::width::{ansi_width, end_col, str_width};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

/// Everything the outer REPL hands the editor for one prompt session.
pub struct ModalEditor {
    pub opts: Options,
    pub history: Box<dyn History>,
    pub completer: Option<Arc<dyn CompleteProvider>>,
    pub prompt: PromptConfig,
    pub user_layers: Vec<Layer<EditorAction>>,
    pub enable_hints: bool,
}

impl ModalEditor {
    pub fn new(prompt: PromptConfig, history: Box<dyn History>) -> Self {
        Self {
            opts: Options::default(),
            history,
            completer: None,
            prompt,
            user_layers: Vec::new(),
            enable_hints: true,
        }
    }

    pub fn with_options(mut self, opts: Options) -> Self {
        self.opts = opts;
        self
    }

    pub fn with_completer(mut self, completer: Arc<dyn CompleteProvider>) -> Self {
        self.completer = Some(completer);
        self
    }

    pub fn with_user_layer(mut self, layer: Layer<EditorAction>) -> Self {
        self.user_layers.push(layer);
        self
    }

    pub fn without_hints(mut self) -> Self {
        self.enable_hints = false;
        self
    }
}

struct Keymaps {
    main: Keymap<EditorAction>,
    search: Keymap<EditorAction>,
    prefix: Keymap<EditorAction>,
}

impl Keymaps {
    fn for_mode(&self, mode: ModeId) -> &Keymap<EditorAction> {
        match mode {
            ModeId::Main => &self.main,
            ModeId::Search => &self.search,
            ModeId::Prefix => &self.prefix,
        }
    }
}

fn spawn_input_thread(
    mut reader: Box<dyn TermReader>,
    tx: mpsc::Sender<char>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let mut acc: Vec<u8> = Vec::with_capacity(4);
        loop {
            match reader.read_byte() {
                Ok(Some(byte)) => {
                    acc.push(byte);
                    match std::str::from_utf8(&acc) {
                        Ok(s) => {
                            let c = s.chars().next().expect("non-empty utf8");
                            acc.clear();
                            if tx.blocking_send(c).is_err() {
                                break;
                            }
                        }
                        Err(_) if acc.len() < 4 => {}
                        Err(_) => {
                            trace!(target: "input.thread", len = acc.len(), "invalid_utf8_dropped");
                            acc.clear();
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(target: "input.thread", error = %e, "read_failed");
                    break;
                }
            }
        }
        info!(target: "input.thread", "input_thread_stopped");
    })
}

/// Run one action with panic isolation: a failing action never takes the
/// loop down, it restores the pre-action buffer and mode and continues.
fn dispatch_protected(s: &mut Session, action: EditorAction, seq: &str) -> Outcome {
    let pre_buf = s.main.buf.clone();
    let pre_mode = s.current_mode;
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| dispatch(s, action, seq))) {
        Ok(outcome) => outcome,
        Err(_) => {
            error!(target: "modal", action = action.name(), "action_failed_state_restored");
            s.main.buf = pre_buf;
            s.current_mode = pre_mode;
            Outcome::Ignore
        }
    }
}

/// Whether a plain insertion at end of buffer can be echoed in place during
/// the repaint-coalescing window instead of a full repaint.
fn can_fast_echo(s: &Session, seq: &str) -> bool {
    if s.opts.auto_refresh_time_delay == 0
        || s.current_mode != ModeId::Main
        || !s.main.buf.at_end()
        || s.main.region_active.is_active()
        || s.main.hint.is_some()
        || s.main.beep_level > 0
    {
        return false;
    }
    let mut chars = seq.chars();
    let Some(c) = chars.next() else { return false };
    if chars.next().is_some() || c.is_control() {
        return false;
    }
    // the echo must not wrap: check the visual column after insertion
    let buf = &s.main.buf;
    let start = buf.line_start(buf.position());
    let indent = if start == 0 {
        ansi_width(&s.main_prompt_text())
    } else {
        0
    };
    let col = end_col(&buf.content()[start..], indent, s.opts.tabwidth);
    col + str_width(seq) < s.term.width().saturating_sub(1)
}

async fn read_paste_payload(
    pending: &mut VecDeque<char>,
    rx: &mut mpsc::Receiver<char>,
) -> String {
    let mut out = String::new();
    loop {
        let c = match pending.pop_front() {
            Some(c) => c,
            None => match rx.recv().await {
                Some(c) => c,
                None => break,
            },
        };
        out.push(c);
        if out.ends_with(PASTE_END) {
            out.truncate(out.len() - PASTE_END.len());
            break;
        }
    }
    out
}

/// Enter raw mode, run the modal interface until commit or abort, invoke
/// `on_done`, and tear the terminal back down. Returns the committed line,
/// or `None` when the session was aborted or hit end of input.
pub async fn run_interface(
    mut term: Box<dyn Term>,
    reader: Box<dyn TermReader>,
    editor: ModalEditor,
) -> Result<Option<String>> {
    term.raw_mode(true)?;
    term.enable_bracketed_paste();

    let keymaps = Keymaps {
        main: bindings::main_keymap(&editor.user_layers)?,
        search: bindings::search_keymap()?,
        prefix: bindings::prefix_keymap()?,
    };

    let mut session = Session::new(
        term,
        editor.opts,
        editor.history,
        editor.completer,
        editor.prompt,
    );
    session.repaint();
    session.term.flush()?;

    let shared = SharedHandles {
        line: Arc::new(Mutex::new(session)),
        hint_gate: Arc::new(tokio::sync::Mutex::new(())),
        keys: Arc::new(AtomicU64::new(0)),
        aborted: Arc::new(AtomicBool::new(false)),
    };

    // deferred-action inbox: external subsystems and timers request
    // line-level updates without racing the renderer
    type Deferred = Box<dyn FnOnce(&mut Session) + Send>;
    let (inbox_tx, mut inbox_rx) = mpsc::unbounded_channel::<Deferred>();
    let inbox_line = shared.line.clone();
    let inbox_task = tokio::spawn(async move {
        while let Some(f) = inbox_rx.recv().await {
            if let Ok(mut s) = inbox_line.lock() {
                f(&mut s);
            }
        }
    });

    let (char_tx, mut char_rx) = mpsc::channel::<char>(1024);
    let _input_thread = spawn_input_thread(reader, char_tx);

    let result = event_loop(
        &shared,
        &keymaps,
        &mut char_rx,
        &inbox_tx,
        editor.enable_hints,
    )
    .await;

    shared.aborted.store(true, Ordering::SeqCst);
    drop(inbox_tx);
    inbox_task.abort();

    let mut s = shared.line.lock().expect("line lock poisoned at teardown");
    let accepted_line = match &result {
        Ok(line) => line.clone(),
        Err(_) => None,
    };
    finalize(&mut s, accepted_line.as_deref());
    drop(s);

    result
}

fn finalize(s: &mut Session, accepted: Option<&str>) {
    s.main.region_active = replin_state::RegionActive::Off;
    s.main.hint = None;
    if s.current_mode != ModeId::Main {
        s.leave_search(accepted.is_some());
    }
    s.repaint();
    let rows = s.main.area.num_rows;
    let curs = s.main.area.curs_row;
    s.term.cmove_down(rows.saturating_sub(curs));
    s.term.write_str("\r\n");
    if let Some(line) = accepted {
        if s.prompt.keep_history {
            s.history.add(line);
        }
    }
    let line = accepted.map(str::to_string);
    if let Some(mut cb) = s.prompt.on_done.take() {
        cb(line.as_deref().unwrap_or(""), line.is_some());
    }
    if !s.prompt.sticky {
        s.main.buf.reset_to("");
        s.main.area = InputAreaState::default();
    }
    s.term.disable_bracketed_paste();
    let _ = s.term.flush();
    let _ = s.term.raw_mode(false);
    info!(target: "runtime", accepted = accepted.is_some(), "session_finished");
}

async fn event_loop(
    shared: &SharedHandles,
    keymaps: &Keymaps,
    char_rx: &mut mpsc::Receiver<char>,
    inbox_tx: &mpsc::UnboundedSender<Box<dyn FnOnce(&mut Session) + Send>>,
    enable_hints: bool,
) -> Result<Option<String>> {
    let mut mode = ModeId::Main;
    let mut decoder = Decoder::new(keymaps.for_mode(mode));
    let mut pending: VecDeque<char> = VecDeque::new();

    loop {
        let c = match pending.pop_front() {
            Some(c) => c,
            None => match char_rx.recv().await {
                Some(c) => c,
                None => {
                    debug!(target: "input.decode", "input_stream_ended");
                    let mut s = shared.line.lock().expect("line lock poisoned");
                    s.eof = true;
                    return Ok(None);
                }
            },
        };
        shared.keys.fetch_add(1, Ordering::SeqCst);

        let (action, seq) = match decoder.push(c) {
            Decoded::Pending | Decoded::Ignored { .. } => continue,
            Decoded::Dropped { seq } => {
                trace!(target: "input.decode", seq_len = seq.len(), "dropped");
                continue;
            }
            Decoded::Alias { target, .. } => {
                for &ch in target.iter().rev() {
                    pending.push_front(ch);
                }
                continue;
            }
            Decoded::Action { action, seq } => (action, seq),
        };

        if action == EditorAction::BracketedPaste {
            let payload = read_paste_payload(&mut pending, char_rx).await;
            // payload characters bypass the decode counter; bump it so a
            // hint computed against the pre-paste buffer is discarded
            shared.keys.fetch_add(1, Ordering::SeqCst);
            let mut s = shared.line.lock().expect("line lock poisoned");
            let text = process_paste(&payload, s.opts.tabwidth);
            s.push_undo();
            s.main.buf.insert(&text);
            s.invalidate_hint();
            s.repaint();
            s.term.flush()?;
            continue;
        }

        // run the action and repaint under the line-modify lock
        let step = {
            let mut s = shared.line.lock().expect("line lock poisoned");
            let fast = action == EditorAction::SelfInsert && can_fast_echo(&s, &seq);
            let outcome = dispatch_protected(&mut s, action, &seq);

            match outcome {
                Outcome::Continue | Outcome::Ignore => {
                    if fast && outcome == Outcome::Continue {
                        // echo in place; the timer below settles the full
                        // repaint once the burst quiets down
                        s.term.write_str(&seq);
                        s.main.pending_repaint = true;
                    } else {
                        s.repaint();
                    }
                    s.term.flush()?;
                }
                Outcome::Done | Outcome::Abort | Outcome::Suspend => {}
            }

            if s.current_mode != mode {
                mode = s.current_mode;
                decoder = Decoder::new(keymaps.for_mode(mode));
            }
            for ch in s.reinject.drain(..).rev() {
                pending.push_front(ch);
            }

            LoopStep {
                outcome,
                fast_echo: fast && outcome == Outcome::Continue,
                beep: std::mem::take(&mut s.beep_requested),
                hint_wanted: enable_hints
                    && s.completer.is_some()
                    && matches!(outcome, Outcome::Continue)
                    && s.current_mode == ModeId::Main
                    && s.main.buf.at_end()
                    && !s.main.buf.is_empty(),
                snapshot: (s.main.buf.content().to_string(), s.main.buf.position()),
                accepted: (outcome == Outcome::Done).then(|| s.main.buf.content().to_string()),
                delays: (s.opts.auto_refresh_time_delay, s.opts.beep_duration, s.opts.beep_maxduration),
                completer: s.completer.clone(),
            }
        };

        if step.fast_echo {
            let delay = step.delays.0;
            let tx = inbox_tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                let _ = tx.send(Box::new(|s: &mut Session| {
                    if s.main.pending_repaint {
                        s.repaint();
                        let _ = s.term.flush();
                    }
                }));
            });
        }

        if step.beep {
            let line = shared.line.clone();
            let duration = step.delays.1.min(step.delays.2.max(1));
            {
                let mut s = shared.line.lock().expect("line lock poisoned");
                s.main.beep_level += 1;
                s.repaint();
                let _ = s.term.flush();
            }
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(duration)).await;
                if let Ok(mut s) = line.lock() {
                    s.main.beep_level = s.main.beep_level.saturating_sub(1);
                    if s.main.beep_level == 0 {
                        s.repaint();
                        let _ = s.term.flush();
                    }
                }
            });
        }

        if step.hint_wanted
            && let Some(provider) = step.completer
        {
            let keys_now = shared.keys.load(Ordering::SeqCst);
            let (content, position) = step.snapshot;
            let _ = spawn_hint_task(shared.clone(), provider, content, position, keys_now);
        }

        match step.outcome {
            Outcome::Continue | Outcome::Ignore => {}
            Outcome::Done => return Ok(step.accepted),
            Outcome::Abort => return Ok(None),
            Outcome::Suspend => {
                suspend_session(shared)?;
            }
        }
    }
}

struct LoopStep {
    outcome: Outcome,
    fast_echo: bool,
    beep: bool,
    hint_wanted: bool,
    snapshot: (String, usize),
    accepted: Option<String>,
    delays: (u64, u64, u64),
    completer: Option<Arc<dyn CompleteProvider>>,
}

/// Raise OS job-control stop, restoring the terminal around it.
fn suspend_session(shared: &SharedHandles) -> Result<()> {
    {
        let mut s = shared.line.lock().expect("line lock poisoned");
        s.term.disable_bracketed_paste();
        s.term.flush()?;
        s.term.raw_mode(false)?;
    }
    #[cfg(unix)]
    unsafe {
        libc::raise(libc::SIGSTOP);
    }
    #[cfg(not(unix))]
    warn!(target: "runtime", "suspend_unsupported_on_this_platform");
    {
        let mut s = shared.line.lock().expect("line lock poisoned");
        s.term.raw_mode(true)?;
        s.term.enable_bracketed_paste();
        // screen contents are unknown after resume: paint from scratch
        s.main.area = InputAreaState::default();
        s.repaint();
        s.term.flush()?;
    }
    Ok(())
}
