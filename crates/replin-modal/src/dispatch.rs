//! Action dispatch: runs one resolved keymap action against the session and
//! reports the loop outcome.
//!
//! The dispatcher owns the cross-cutting protocol: `current_action`
//! bookkeeping, repeat counting, shift activation of the region before the
//! motion runs, and region deactivation afterwards for commands that neither
//! preserve nor manage it themselves. "Nothing to do" conditions never
//! mutate the buffer; they beep and report [`Outcome::Ignore`].

use crate::Outcome;
use crate::action::EditorAction;
use crate::session::Session;
use replin_complete::common_prefix;
use replin_render::{InputAreaState, paint_candidate_list};
use replin_state::{KillDirection, RegionActive, preserves_region};
use replin_text::width::end_col;
use replin_text::{EditBuffer, motion, ops};
use std::time::Instant;
use tracing::{debug, warn};

/// Run `f` against the main buffer, pushing the pre-image onto the undo
/// stack only when the edit reports success.
fn try_edit(s: &mut Session, f: impl FnOnce(&mut EditBuffer) -> bool) -> bool {
    let pre_content = s.main.buf.content().to_string();
    let pre_pos = s.main.buf.position();
    if f(&mut s.main.buf) {
        s.main.undo.push(&pre_content, pre_pos);
        true
    } else {
        false
    }
}

fn indent_unit(s: &Session) -> usize {
    if s.opts.auto_indent > 0 {
        s.opts.auto_indent
    } else {
        4
    }
}

pub fn dispatch(s: &mut Session, action: EditorAction, seq: &str) -> Outcome {
    let name = action.name();
    s.current_action = Some(name);
    if seq == s.prev_key && !seq.is_empty() {
        s.key_repeats += 1;
    } else {
        s.key_repeats = 0;
    }
    s.prev_key = seq.to_string();

    // a visible hint is stale the moment any other action runs; Complete
    // reads it before invalidation so tab can accept it
    let shown_hint = s.main.hint.clone().filter(|h| !h.is_empty());
    if action != EditorAction::Complete {
        s.invalidate_hint();
    }

    // shift-modified motion activates the region at the pre-motion position
    if action.is_shift() && !s.main.region_active.is_active() {
        let pos = s.main.buf.position();
        s.main.buf.set_mark(pos);
        s.main.region_active = RegionActive::Shift;
    }

    let mut region_keep_override: Option<bool> = None;
    let outcome = run_action(s, action, seq, shown_hint, &mut region_keep_override);

    let keeps = region_keep_override.unwrap_or_else(|| {
        action.is_shift()
            || (action.is_motion() && s.main.region_active == RegionActive::Mark)
            || preserves_region(name)
            || matches!(action, EditorAction::SetMark | EditorAction::ExchangeMark)
    });
    if !keeps {
        s.main.region_active = RegionActive::Off;
    }

    if outcome != Outcome::Ignore {
        s.last_action = s.current_action;
    }
    debug!(target: "modal", action = name, outcome = ?outcome, "action_dispatched");
    outcome
}

fn run_action(
    s: &mut Session,
    action: EditorAction,
    seq: &str,
    shown_hint: Option<String>,
    region_keep: &mut Option<bool>,
) -> Outcome {
    use EditorAction::*;
    match action {
        SelfInsert => {
            if seq.starts_with('\x1b') || seq.chars().any(|c| c.is_control() && c != '\t') {
                return Outcome::Ignore;
            }
            let text = seq.to_string();
            try_edit(s, |b| {
                b.insert(&text);
                true
            });
            let is_space = seq.chars().all(char::is_whitespace);
            s.paste_guard.note_insert(Instant::now(), is_space);
            Outcome::Continue
        }
        AcceptLine => {
            let complete = s
                .prompt
                .on_enter
                .as_ref()
                .map(|f| f(s.main.buf.content()))
                .unwrap_or(true);
            if complete {
                return Outcome::Done;
            }
            let indent = if s.paste_guard.suppress_indent() {
                0
            } else {
                ops::indent_for_newline(
                    s.main.buf.content(),
                    s.main.buf.position(),
                    s.opts.tabwidth,
                )
            };
            let text = format!("\n{}", " ".repeat(indent));
            try_edit(s, |b| {
                b.insert(&text);
                true
            });
            Outcome::Continue
        }
        Backspace => {
            let align = s.opts.backspace_align;
            let adjust = align && s.opts.backspace_adjust;
            if try_edit(s, |b| ops::backspace(b, align, adjust)) {
                Outcome::Continue
            } else {
                s.beep();
                Outcome::Ignore
            }
        }
        DeleteForward => {
            if try_edit(s, ops::delete_forward) {
                Outcome::Continue
            } else {
                s.beep();
                Outcome::Ignore
            }
        }
        DeleteForwardOrEof => {
            if s.main.buf.is_empty() {
                if s.opts.confirm_exit && s.key_repeats == 0 {
                    s.beep();
                    return Outcome::Ignore;
                }
                s.eof = true;
                return Outcome::Abort;
            }
            if try_edit(s, ops::delete_forward) {
                Outcome::Continue
            } else {
                s.beep();
                Outcome::Ignore
            }
        }

        MoveLeft | ShiftMoveLeft => motion_outcome(s.main.buf.move_left()),
        MoveRight | ShiftMoveRight => motion_outcome(s.main.buf.move_right()),
        MoveWordLeft | ShiftMoveWordLeft => {
            motion_outcome(s.main.buf.move_word_left(motion::is_delimiter))
        }
        MoveWordRight | ShiftMoveWordRight => {
            motion_outcome(s.main.buf.move_word_right(motion::is_delimiter))
        }
        MoveLineStart | ShiftMoveLineStart => {
            s.main.buf.move_line_start();
            Outcome::Continue
        }
        MoveLineEnd | ShiftMoveLineEnd => {
            s.main.buf.move_line_end();
            Outcome::Continue
        }
        ShiftMoveUp => motion_outcome(s.main.buf.move_up()),
        ShiftMoveDown => motion_outcome(s.main.buf.move_down()),
        MoveUp => {
            if s.main.buf.move_up() {
                Outcome::Continue
            } else {
                s.enter_prefix_search();
                prefix_step(s, true);
                Outcome::Continue
            }
        }
        MoveDown => {
            if s.main.buf.move_down() {
                Outcome::Continue
            } else {
                s.enter_prefix_search();
                prefix_step(s, false);
                Outcome::Continue
            }
        }

        KillLine => kill_range(s, ops::kill_forward_range(&s.main.buf), KillDirection::Forward),
        KillLineBackward => {
            kill_range(s, ops::kill_backward_range(&s.main.buf), KillDirection::Backward)
        }
        Werase => {
            if s.main.region_active.is_active() {
                return kill_region(s);
            }
            let pos = s.main.buf.position();
            let start = motion::word_left_of(s.main.buf.content(), pos, motion::is_whitespace_delimiter);
            kill_range(
                s,
                (start < pos).then_some((start, pos)),
                KillDirection::Backward,
            )
        }
        KillWordBack => {
            let pos = s.main.buf.position();
            let start = motion::word_left_of(s.main.buf.content(), pos, motion::is_delimiter);
            kill_range(
                s,
                (start < pos).then_some((start, pos)),
                KillDirection::Backward,
            )
        }
        KillWordForward => {
            let pos = s.main.buf.position();
            let end = motion::word_right_of(s.main.buf.content(), pos, motion::is_delimiter);
            kill_range(s, (end > pos).then_some((pos, end)), KillDirection::Forward)
        }
        KillRegion => kill_region(s),
        CopyRegion => {
            let Some((lo, hi)) = active_region(s) else {
                s.beep();
                return Outcome::Ignore;
            };
            let text = s.main.buf.content()[lo..hi].to_string();
            s.kill.push(text);
            Outcome::Continue
        }
        Yank => {
            let Some(text) = s.kill.current().map(str::to_string) else {
                s.beep();
                return Outcome::Ignore;
            };
            let start = s.main.buf.position();
            try_edit(s, |b| {
                b.insert(&text);
                true
            });
            s.last_yank = Some((start, start + text.len()));
            Outcome::Continue
        }
        YankPop => {
            let yank_chain = matches!(s.last_action, Some("edit_yank") | Some("edit_yank_pop"));
            let Some((lo, hi)) = s.last_yank.filter(|_| yank_chain) else {
                s.beep();
                return Outcome::Ignore;
            };
            let Some(text) = s.kill.rotate_back().map(str::to_string) else {
                s.beep();
                return Outcome::Ignore;
            };
            try_edit(s, |b| {
                b.splice(lo, hi, &text, true);
                b.set_position(lo + text.len());
                true
            });
            s.last_yank = Some((lo, lo + text.len()));
            Outcome::Continue
        }

        SetMark => {
            let pos = s.main.buf.position();
            s.main.buf.set_mark(pos);
            s.main.region_active = RegionActive::Mark;
            Outcome::Continue
        }
        ExchangeMark => {
            let Some(mark) = s.main.buf.mark() else {
                s.beep();
                return Outcome::Ignore;
            };
            let pos = s.main.buf.position();
            s.main.buf.set_mark(pos);
            s.main.buf.set_position(mark.min(s.main.buf.len()));
            s.main.region_active = RegionActive::Mark;
            Outcome::Continue
        }

        Undo => {
            let content = s.main.buf.content().to_string();
            let pos = s.main.buf.position();
            match s.main.undo.undo(&content, pos) {
                None => {
                    s.beep();
                    Outcome::Ignore
                }
                Some((c, p)) => {
                    s.main.buf.reset_to(&c);
                    s.main.buf.set_position(p.min(c.len()));
                    Outcome::Continue
                }
            }
        }
        Redo => {
            if !matches!(s.last_action, Some("edit_undo") | Some("edit_redo")) {
                s.beep();
                return Outcome::Ignore;
            }
            match s.main.undo.redo() {
                None => {
                    s.beep();
                    Outcome::Ignore
                }
                Some((c, p)) => {
                    s.main.buf.reset_to(&c);
                    s.main.buf.set_position(p.min(c.len()));
                    Outcome::Continue
                }
            }
        }

        TransposeChars => edit_or_beep(s, ops::transpose_chars),
        TransposeWords => edit_or_beep(s, |b| ops::transpose_words(b, motion::is_delimiter)),
        TransposeLinesUp => {
            let (lo, hi) = region_or_cursor(s);
            edit_or_beep(s, move |b| ops::transpose_lines_up(b, lo, hi))
        }
        TransposeLinesDown => {
            let (lo, hi) = region_or_cursor(s);
            edit_or_beep(s, move |b| ops::transpose_lines_down(b, lo, hi))
        }
        UpcaseWord => edit_or_beep(s, |b| ops::case_word(b, ops::CaseOp::Upper, motion::is_delimiter)),
        DowncaseWord => edit_or_beep(s, |b| ops::case_word(b, ops::CaseOp::Lower, motion::is_delimiter)),
        TitlecaseWord => edit_or_beep(s, |b| ops::case_word(b, ops::CaseOp::Title, motion::is_delimiter)),

        Indent => {
            *region_keep = Some(true);
            indent_active_region(s)
        }
        Outdent => {
            *region_keep = Some(true);
            let Some((lo, hi)) = active_region(s) else {
                s.beep();
                return Outcome::Ignore;
            };
            let n = indent_unit(s);
            if try_edit(s, move |b| ops::outdent_region(b, lo, hi, n)) {
                Outcome::Continue
            } else {
                s.beep();
                Outcome::Ignore
            }
        }

        Complete => complete_line(s, shown_hint, region_keep),

        ClearScreen => {
            s.term.write_str("\x1b[H\x1b[2J");
            s.main.area = InputAreaState::default();
            Outcome::Continue
        }
        Interrupt => {
            s.transition_with(crate::session::Target::Abort, |_| {});
            Outcome::Abort
        }
        Suspend => Outcome::Suspend,
        BracketedPaste => {
            // consumed by the event loop before dispatch
            warn!(target: "modal", "bracketed_paste_reached_dispatch");
            Outcome::Ignore
        }

        HistorySearchBack => {
            s.enter_search(true);
            Outcome::Continue
        }
        HistorySearchForward => {
            s.enter_search(false);
            Outcome::Continue
        }

        SearchAppend => {
            if seq.starts_with('\x1b') || seq.chars().any(char::is_control) {
                s.beep();
                return Outcome::Ignore;
            }
            if let Some(search) = &mut s.search {
                search.query.push_str(seq);
            }
            run_search(s, false);
            Outcome::Continue
        }
        SearchBackspace => {
            let popped = match &mut s.search {
                Some(search) => search.query.pop().is_some(),
                None => return Outcome::Ignore,
            };
            if !popped {
                s.beep();
                return Outcome::Ignore;
            }
            if let Some(search) = &mut s.search {
                search.failed = false;
            }
            s.history.reset();
            run_search(s, false);
            Outcome::Continue
        }
        SearchAgainBack => {
            if let Some(search) = &mut s.search {
                search.backward = true;
            }
            run_search(s, true);
            Outcome::Continue
        }
        SearchAgainForward => {
            if let Some(search) = &mut s.search {
                search.backward = false;
            }
            run_search(s, true);
            Outcome::Continue
        }
        SearchAccept => {
            s.leave_search(true);
            Outcome::Continue
        }
        SearchAcceptReplay => {
            s.leave_search(true);
            s.reinject = seq.chars().collect();
            Outcome::Continue
        }
        SearchCancel => {
            s.leave_search(false);
            Outcome::Continue
        }

        PrefixPrev => {
            prefix_step(s, true);
            Outcome::Continue
        }
        PrefixNext => {
            prefix_step(s, false);
            Outcome::Continue
        }
        PrefixAccept => {
            s.leave_search(true);
            Outcome::Continue
        }
        PrefixAcceptReplay => {
            s.leave_search(true);
            s.reinject = seq.chars().collect();
            Outcome::Continue
        }
    }
}

fn motion_outcome(moved: bool) -> Outcome {
    if moved { Outcome::Continue } else { Outcome::Ignore }
}

fn edit_or_beep(s: &mut Session, f: impl FnOnce(&mut EditBuffer) -> bool) -> Outcome {
    if try_edit(s, f) {
        Outcome::Continue
    } else {
        s.beep();
        Outcome::Ignore
    }
}

fn active_region(s: &Session) -> Option<(usize, usize)> {
    if !s.main.region_active.is_active() {
        return None;
    }
    s.main.buf.region().filter(|(lo, hi)| lo != hi)
}

fn region_or_cursor(s: &Session) -> (usize, usize) {
    active_region(s).unwrap_or_else(|| {
        let p = s.main.buf.position();
        (p, p)
    })
}

fn kill_range(
    s: &mut Session,
    range: Option<(usize, usize)>,
    dir: KillDirection,
) -> Outcome {
    let Some((lo, hi)) = range else {
        s.beep();
        return Outcome::Ignore;
    };
    let mut removed = String::new();
    try_edit(s, |b| {
        removed = b.delete_range(lo, hi);
        true
    });
    s.record_kill(&removed, dir);
    Outcome::Continue
}

fn kill_region(s: &mut Session) -> Outcome {
    let Some((lo, hi)) = active_region(s) else {
        s.beep();
        return Outcome::Ignore;
    };
    let mut removed = String::new();
    try_edit(s, |b| {
        removed = b.delete_range(lo, hi);
        true
    });
    s.kill.push(removed);
    Outcome::Continue
}

fn indent_active_region(s: &mut Session) -> Outcome {
    let Some((lo, hi)) = active_region(s) else {
        s.beep();
        return Outcome::Ignore;
    };
    let n = indent_unit(s);
    if try_edit(s, move |b| ops::indent_region(b, lo, hi, n)) {
        Outcome::Continue
    } else {
        s.beep();
        Outcome::Ignore
    }
}

/// Tab: indent an active region, accept a visible hint, then fall back to
/// provider-driven completion.
fn complete_line(
    s: &mut Session,
    shown_hint: Option<String>,
    region_keep: &mut Option<bool>,
) -> Outcome {
    if s.main.region_active.is_active() {
        *region_keep = Some(true);
        return indent_active_region(s);
    }

    if s.opts.hint_tab_completes
        && let Some(hint) = shown_hint
        && s.main.buf.at_end()
    {
        try_edit(s, |b| {
            b.insert(&hint);
            true
        });
        s.main.hint = None;
        return Outcome::Continue;
    }
    s.invalidate_hint();

    let Some(completer) = s.completer.clone() else {
        // no provider: advance to the next indent stop
        let unit = indent_unit(s);
        let line_start = s.main.buf.line_start(s.main.buf.position());
        let col = end_col(
            &s.main.buf.content()[line_start..s.main.buf.position()],
            0,
            s.opts.tabwidth,
        );
        let pad = " ".repeat(unit - col % unit);
        try_edit(s, |b| {
            b.insert(&pad);
            true
        });
        return Outcome::Continue;
    };

    let res = completer.complete_line(s.main.buf.content(), s.main.buf.position(), "", false);
    if res.candidates.is_empty() {
        s.beep();
        return Outcome::Ignore;
    }
    let range = res.range.start..res.range.end.min(s.main.buf.len());
    let partial = s.main.buf.content()[range.clone()].to_string();

    if res.should_complete && res.candidates.len() == 1 {
        let text = res.candidates[0].completion.clone();
        let (lo, hi) = (range.start, range.end);
        try_edit(s, move |b| {
            b.splice(lo, hi, &text, true);
            true
        });
        return Outcome::Continue;
    }

    let cp = common_prefix(&res.candidates);
    if res.should_complete && cp.len() > partial.len() {
        let (lo, hi) = (range.start, range.end);
        try_edit(s, move |b| {
            b.splice(lo, hi, &cp, true);
            true
        });
        return Outcome::Continue;
    }

    // no further progress: list candidates when the provider asked for a
    // list or on repeated tab
    if !res.should_complete || s.key_repeats >= 1 {
        let items: Vec<String> = res.candidates.iter().map(|c| c.display.clone()).collect();
        let area = s.main.area;
        paint_candidate_list(s.term.as_mut(), &area, &items);
        s.main.area = InputAreaState::default();
        return Outcome::Continue;
    }
    s.beep();
    Outcome::Ignore
}

fn run_search(s: &mut Session, advance: bool) {
    let Some(search) = &s.search else {
        return;
    };
    let query = search.query.clone();
    let backward = search.backward;
    if query.is_empty() {
        return;
    }
    let mut resp = String::new();
    let found = s.history.search(&query, backward, advance, &mut resp);
    let Some(search) = &mut s.search else {
        return;
    };
    if found {
        search.response.reset_to(&resp);
        search.failed = false;
    } else {
        search.failed = true;
        s.beep();
    }
}

/// Walk history entries matching the captured prefix; walking past the
/// newest entry restores the original line.
fn prefix_step(s: &mut Session, back: bool) {
    let Some(st) = &s.prefix else {
        return;
    };
    let prefix = st.prefix.clone();
    let current = st.response.content().to_string();
    let original = st.original.clone();

    let mut found: Option<String> = None;
    loop {
        let entry = if back { s.history.prev() } else { s.history.next() };
        match entry {
            Some(e) => {
                if e.starts_with(&prefix) && e != current {
                    found = Some(e);
                    break;
                }
            }
            None => break,
        }
    }

    match found {
        Some(e) => {
            if let Some(st) = &mut s.prefix {
                st.response.reset_to(&e);
            }
        }
        None if !back => {
            // walked past the newest entry: restore the line being typed
            s.history.reset();
            if let Some(st) = &mut s.prefix {
                st.response.reset_to(&original);
            }
        }
        None => s.beep(),
    }
}
