//! Session-lived editing state: the kill ring, per-mode undo history, and
//! region activation.

mod kill;
mod region;
mod undo;

pub use kill::{KillDirection, KillRing};
pub use region::{RegionActive, preserves_region};
pub use undo::UndoStack;
