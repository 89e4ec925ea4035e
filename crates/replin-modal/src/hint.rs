//! Background hint generation.
//!
//! After a key leaves the cursor at end of buffer, a task asks the
//! completion provider for a fast answer and installs the unambiguous
//! suffix as a dim hint. The task is raced against further keystrokes: the
//! key counter is checked before the provider runs, after it returns, and
//! once more under the line lock, so a stale hint is never installed.

use crate::session::Session;
use replin_complete::{CompleteProvider, Completions, common_prefix};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Handles shared between the event loop and its auxiliary tasks.
#[derive(Clone)]
pub struct SharedHandles {
    /// Line-modify lock: every mutation of mode state, buffer, or the
    /// rendered area happens under it.
    pub line: Arc<Mutex<Session>>,
    /// Serializes completion calls across hint tasks.
    pub hint_gate: Arc<tokio::sync::Mutex<()>>,
    /// Keystrokes seen; a hint is valid only for the count it was spawned
    /// at.
    pub keys: Arc<AtomicU64>,
    pub aborted: Arc<AtomicBool>,
}

/// The suffix a hint would display: the single candidate, or a common
/// prefix that is itself a candidate, beyond the current partial.
fn hint_suffix(res: &Completions, buffer: &str, position: usize) -> Option<String> {
    if res.candidates.is_empty() {
        return None;
    }
    let range = res.range.start..res.range.end.min(position);
    let partial = buffer.get(range)?;
    let full = if res.candidates.len() == 1 {
        res.candidates[0].completion.as_str()
    } else {
        let cp = common_prefix(&res.candidates);
        let owned = res
            .candidates
            .iter()
            .find(|c| c.completion == cp)
            .map(|c| c.completion.as_str());
        match owned {
            Some(f) => f,
            None => return None,
        }
    };
    let suffix = full.strip_prefix(partial)?;
    (!suffix.is_empty()).then(|| suffix.to_string())
}

pub fn spawn_hint_task(
    shared: SharedHandles,
    provider: Arc<dyn CompleteProvider>,
    content: String,
    position: usize,
    keys_at: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let _gate = shared.hint_gate.lock().await;
        if shared.keys.load(Ordering::SeqCst) != keys_at || shared.aborted.load(Ordering::SeqCst) {
            trace!(target: "hint", "stale_before_completion");
            return;
        }
        let snapshot = content.clone();
        let res = match tokio::task::spawn_blocking(move || {
            provider.complete_line(&snapshot, position, "", true)
        })
        .await
        {
            Ok(res) => res,
            Err(e) => {
                // provider failure clears the hint and stays silent
                debug!(target: "hint", error = %e, "provider_failed");
                if let Ok(mut s) = shared.line.lock() {
                    s.set_hint(None);
                }
                return;
            }
        };
        if shared.keys.load(Ordering::SeqCst) != keys_at {
            trace!(target: "hint", "stale_after_completion");
            return;
        }
        let suffix = hint_suffix(&res, &content, position);

        let Ok(mut s) = shared.line.lock() else {
            return;
        };
        if shared.keys.load(Ordering::SeqCst) != keys_at || shared.aborted.load(Ordering::SeqCst) {
            trace!(target: "hint", "stale_under_line_lock");
            return;
        }
        let had_hint = matches!(s.main.hint.as_deref(), Some(h) if !h.is_empty());
        if suffix.is_none() && !had_hint {
            return;
        }
        s.set_hint(suffix);
        s.repaint();
        let _ = s.term.flush();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use replin_complete::NamedCompletion;

    fn completions(cands: &[&str], range: std::ops::Range<usize>) -> Completions {
        Completions {
            candidates: cands.iter().map(|c| NamedCompletion::new(*c)).collect(),
            range,
            should_complete: true,
        }
    }

    #[test]
    fn single_candidate_yields_suffix() {
        let res = completions(&["hello"], 0..3);
        assert_eq!(hint_suffix(&res, "hel", 3).as_deref(), Some("lo"));
    }

    #[test]
    fn common_prefix_must_be_a_candidate() {
        let res = completions(&["print", "println"], 2..4);
        assert_eq!(hint_suffix(&res, "  pr", 4).as_deref(), Some("int"));
        let res = completions(&["printa", "printb"], 0..2);
        assert_eq!(hint_suffix(&res, "pr", 2), None);
    }

    #[test]
    fn no_suffix_when_nothing_to_add() {
        let res = completions(&["hel"], 0..3);
        assert_eq!(hint_suffix(&res, "hel", 3), None);
        assert_eq!(hint_suffix(&completions(&[], 0..0), "x", 1), None);
    }
}
