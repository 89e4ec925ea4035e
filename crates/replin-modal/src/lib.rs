//! Modal line-editing core: mode states, action dispatch, transitions, and
//! the interface event loop.
//!
//! Three cooperating modes share one terminal and one input stream: the main
//! prompt, an incremental history search, and a prefix-anchored history
//! search. Each mode owns a keymap; the loop decodes the raw character
//! stream through the current mode's trie, runs the resolved action under
//! the line-modify lock, and repaints.

pub mod action;
pub mod bindings;
pub mod dispatch;
pub mod hint;
pub mod paste;
pub mod run;
pub mod session;

pub use action::EditorAction;
pub use run::{ModalEditor, run_interface};
pub use session::{ModeId, PromptConfig, Session, Target};

/// What an action tells the event loop to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Commit the visible state change and keep reading.
    Continue,
    /// Keep reading without recording the action as `last_action`.
    Ignore,
    /// Commit the line and leave the loop.
    Done,
    /// Terminate the loop without accepting the line.
    Abort,
    /// Yield to OS job control, then resume.
    Suspend,
}
