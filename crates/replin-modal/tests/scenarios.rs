//! End-to-end sessions: scripted bytes in, committed line out.

mod common;

use common::{SlowProvider, TeeTerm};
use replin_config::Options;
use replin_history::{History, MemoryHistory, SharedHistory};
use replin_modal::{ModalEditor, PromptConfig, run_interface};
use replin_term::ScriptedReader;
use std::sync::Arc;
use std::time::Duration;

fn editor_with(prompt: PromptConfig, history: MemoryHistory) -> ModalEditor {
    ModalEditor::new(prompt, Box::new(history)).without_hints()
}

async fn run_script(editor: ModalEditor, script: &str) -> Option<String> {
    let term = Box::new(TeeTerm::new(80, 24));
    let reader = Box::new(ScriptedReader::new(script.as_bytes()));
    run_interface(term, reader, editor).await.unwrap()
}

#[tokio::test]
async fn typed_line_commits_on_enter() {
    let editor = editor_with(PromptConfig::default(), MemoryHistory::default());
    assert_eq!(run_script(editor, "hi\r").await.as_deref(), Some("hi"));
}

#[tokio::test]
async fn newline_commits_through_the_alias_chain() {
    // "\n" is bound as an alias of "\r"; pressing it commits a valid line
    let editor = editor_with(PromptConfig::default(), MemoryHistory::default());
    assert_eq!(run_script(editor, "hi\n").await.as_deref(), Some("hi"));
}

#[tokio::test]
async fn end_of_input_aborts() {
    let editor = editor_with(PromptConfig::default(), MemoryHistory::default());
    assert_eq!(run_script(editor, "partial").await, None);
}

#[tokio::test]
async fn ctrl_c_aborts() {
    let editor = editor_with(PromptConfig::default(), MemoryHistory::default());
    assert_eq!(run_script(editor, "abc\x03").await, None);
}

#[tokio::test]
async fn ctrl_d_on_empty_buffer_aborts() {
    let editor = editor_with(PromptConfig::default(), MemoryHistory::default());
    assert_eq!(run_script(editor, "\x04").await, None);
}

#[tokio::test]
async fn line_editing_before_commit() {
    // type "hxi", back up over the typo, delete it
    let editor = editor_with(PromptConfig::default(), MemoryHistory::default());
    let script = "hxi\x02\x02\x1b[3~\r"; // C-b C-b Delete
    assert_eq!(run_script(editor, script).await.as_deref(), Some("hi"));
}

#[tokio::test]
async fn kill_and_yank_round_trip() {
    // C-a C-k kills the whole line, C-y C-y yanks it twice
    let editor = editor_with(PromptConfig::default(), MemoryHistory::default());
    let script = "abc\x01\x0b\x19\x19\r";
    assert_eq!(run_script(editor, script).await.as_deref(), Some("abcabc"));
}

#[tokio::test]
async fn paste_speed_typing_suppresses_auto_indent() {
    // everything in a scripted session is "pasted fast"; the newline after
    // an indented line must not double-indent
    let prompt = PromptConfig {
        on_enter: Some(Box::new(|line: &str| line.ends_with("go"))),
        ..Default::default()
    };
    let mut opts = Options::default();
    opts.auto_indent_time_threshold = 10_000;
    let editor = editor_with(prompt, MemoryHistory::default()).with_options(opts);
    let accepted = run_script(editor, "    xab\rgo\r").await.unwrap();
    assert_eq!(accepted, "    xab\ngo");
}

#[tokio::test]
async fn incremental_search_recalls_and_commits() {
    let mut history = MemoryHistory::default();
    history.add("print(1)");
    history.add("x = 2");
    history.add("print(3)");
    let editor = editor_with(PromptConfig::default(), history);
    // C-r pri <Enter> accepts the match, second <Enter> commits it
    let script = "\x12pri\r\r";
    assert_eq!(run_script(editor, script).await.as_deref(), Some("print(3)"));
}

#[tokio::test]
async fn search_repeat_walks_older_matches() {
    let mut history = MemoryHistory::default();
    history.add("print(1)");
    history.add("x = 2");
    history.add("print(3)");
    let editor = editor_with(PromptConfig::default(), history);
    let script = "\x12pri\x12\r\r"; // repeat C-r advances to the older hit
    assert_eq!(run_script(editor, script).await.as_deref(), Some("print(1)"));
}

#[tokio::test]
async fn search_cancel_restores_typed_line() {
    let mut history = MemoryHistory::default();
    history.add("print(1)");
    let editor = editor_with(PromptConfig::default(), history);
    let script = "keep\x12pri\x07\r"; // C-g cancels the search
    assert_eq!(run_script(editor, script).await.as_deref(), Some("keep"));
}

#[tokio::test]
async fn up_arrow_prefix_search_recalls_matching_entry() {
    let mut history = MemoryHistory::default();
    history.add("plot(x)");
    history.add("print(1)");
    let editor = editor_with(PromptConfig::default(), history);
    let script = "pr\x1b[A\r\r"; // Up walks to the newest entry starting "pr"
    assert_eq!(run_script(editor, script).await.as_deref(), Some("print(1)"));
}

#[tokio::test]
async fn prefix_search_skips_non_matching_entries() {
    let mut history = MemoryHistory::default();
    history.add("print(1)");
    history.add("x = 2");
    let editor = editor_with(PromptConfig::default(), history);
    let script = "pr\x1b[A\x1b[A\r\r"; // second Up has nowhere older to go
    assert_eq!(run_script(editor, script).await.as_deref(), Some("print(1)"));
}

#[tokio::test]
async fn bracketed_paste_inserts_one_normalized_edit() {
    let editor = editor_with(PromptConfig::default(), MemoryHistory::default());
    let script = "\x1b[200~x\ty\r\nz\x1b[201~\r";
    let accepted = run_script(editor, script).await.unwrap();
    assert_eq!(accepted, "x       y\nz");
}

#[tokio::test]
async fn committed_lines_land_in_shared_history() {
    let shared = SharedHistory::new(MemoryHistory::default());
    let editor = ModalEditor::new(PromptConfig::default(), Box::new(shared.clone())).without_hints();
    run_script(editor, "first\r").await;
    let mut h = shared;
    assert_eq!(h.last().as_deref(), Some("first"));
}

#[tokio::test]
async fn stale_hint_is_never_painted() {
    // provider answers after 50ms; the user keeps typing, so no hint may
    // ever reach the terminal, even after the worker finishes
    let term = TeeTerm::new(80, 24);
    let provider = Arc::new(SlowProvider {
        delay: Duration::from_millis(50),
        candidates: vec!["hello".to_string()],
    });
    let editor = ModalEditor::new(PromptConfig::default(), Box::new(MemoryHistory::default()))
        .with_completer(provider);
    let reader = Box::new(ScriptedReader::new(b"help\r"));
    let accepted = run_interface(Box::new(term.clone()), reader, editor)
        .await
        .unwrap();
    assert_eq!(accepted.as_deref(), Some("help"));
    tokio::time::sleep(Duration::from_millis(150)).await;
    let written = term.written();
    assert!(
        !written.contains("\x1b[90m"),
        "stale hint escaped into the output: {written:?}"
    );
}

#[tokio::test]
async fn tab_completes_unique_candidate() {
    let provider = Arc::new(SlowProvider {
        delay: Duration::from_millis(0),
        candidates: vec!["hello".to_string()],
    });
    let editor = ModalEditor::new(PromptConfig::default(), Box::new(MemoryHistory::default()))
        .without_hints()
        .with_completer(provider);
    assert_eq!(
        run_script(editor, "hel\t\r").await.as_deref(),
        Some("hello")
    );
}

#[tokio::test]
async fn on_done_reports_acceptance() {
    let seen: Arc<std::sync::Mutex<Option<(String, bool)>>> = Arc::default();
    let seen2 = seen.clone();
    let prompt = PromptConfig {
        on_done: Some(Box::new(move |line, accepted| {
            *seen2.lock().unwrap() = Some((line.to_string(), accepted));
        })),
        ..Default::default()
    };
    let editor = editor_with(prompt, MemoryHistory::default());
    run_script(editor, "ok\r").await;
    assert_eq!(
        seen.lock().unwrap().clone(),
        Some(("ok".to_string(), true))
    );
}
