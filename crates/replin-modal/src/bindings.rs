//! Default key bindings for the three modes.
//!
//! Each mode compiles its own trie from a layered stack: the wildcard
//! self-insert base, the mode's bindings, then any user layers on top.

use crate::action::EditorAction::{self, *};
use anyhow::Result;
use replin_keymap::{Keymap, Layer};

fn base_layer() -> Layer<EditorAction> {
    Layer::new().bind("*", SelfInsert)
}

fn motion_layer() -> Layer<EditorAction> {
    Layer::new()
        .bind("\\C-b", MoveLeft)
        .bind("\\C-f", MoveRight)
        .bind("\x1b[D", MoveLeft)
        .bind("\x1b[C", MoveRight)
        .bind("\\C-a", MoveLineStart)
        .bind("\\C-e", MoveLineEnd)
        .bind("\x1b[H", MoveLineStart)
        .bind("\x1b[F", MoveLineEnd)
        .bind("\x1bOH", MoveLineStart)
        .bind("\x1bOF", MoveLineEnd)
        .bind("\x1b[1~", MoveLineStart)
        .bind("\x1b[4~", MoveLineEnd)
        .bind("\\M-f", MoveWordRight)
        .bind("\\M-b", MoveWordLeft)
        .bind("\x1b[1;5C", MoveWordRight)
        .bind("\x1b[1;5D", MoveWordLeft)
}

pub fn main_keymap(user_layers: &[Layer<EditorAction>]) -> Result<Keymap<EditorAction>> {
    let bindings = Layer::new()
        .bind("\r", AcceptLine)
        .redirect("\n", "\r")
        .bind("\\C-?", Backspace)
        .redirect("\\C-h", "\\C-?")
        .bind("\x1b[3~", DeleteForward)
        .bind("\\C-d", DeleteForwardOrEof)
        .bind("\x1b[A", MoveUp)
        .bind("\x1b[B", MoveDown)
        .bind("\\C-p", MoveUp)
        .bind("\\C-n", MoveDown)
        // shift-modified motion
        .bind("\x1b[1;2D", ShiftMoveLeft)
        .bind("\x1b[1;2C", ShiftMoveRight)
        .bind("\x1b[1;2A", ShiftMoveUp)
        .bind("\x1b[1;2B", ShiftMoveDown)
        .bind("\x1b[1;2H", ShiftMoveLineStart)
        .bind("\x1b[1;2F", ShiftMoveLineEnd)
        .bind("\x1b[1;6C", ShiftMoveWordRight)
        .bind("\x1b[1;6D", ShiftMoveWordLeft)
        // kill / yank
        .bind("\\C-k", KillLine)
        .bind("\\C-u", KillLineBackward)
        .bind("\\C-w", Werase)
        .bind("\\M-d", KillWordForward)
        .bind("\x1b\x7f", KillWordBack)
        .bind("\\C-y", Yank)
        .bind("\\M-y", YankPop)
        // mark and region
        .bind("\\C-@", SetMark)
        .bind("\\C-x\\C-x", ExchangeMark)
        .bind("\\M-w", CopyRegion)
        .bind("\\C-x\\C-k", KillRegion)
        // undo / redo
        .bind("\\C-_", Undo)
        .bind("\\M-_", Redo)
        // structural edits
        .bind("\\C-t", TransposeChars)
        .bind("\\M-t", TransposeWords)
        .bind("\x1b[1;3A", TransposeLinesUp)
        .bind("\x1b[1;3B", TransposeLinesDown)
        .bind("\\M-u", UpcaseWord)
        .bind("\\M-l", DowncaseWord)
        .bind("\\M-c", TitlecaseWord)
        // completion
        .bind("\t", Complete)
        .bind("\x1b[Z", Outdent)
        // session control
        .bind("\\C-l", ClearScreen)
        .bind("\\C-c", Interrupt)
        .bind("\\C-z", Suspend)
        // history search
        .bind("\\C-r", HistorySearchBack)
        .bind("\\C-s", HistorySearchForward)
        // bracketed paste framing; a stray terminator is swallowed
        .bind("\x1b[200~", BracketedPaste)
        .ignore("\x1b[201~");

    let mut layers = vec![base_layer(), motion_layer(), bindings];
    layers.extend_from_slice(user_layers);
    Keymap::compile(&layers)
}

pub fn search_keymap() -> Result<Keymap<EditorAction>> {
    let accepting = motion_layer_as(SearchAcceptReplay);
    let bindings = Layer::new()
        .bind("\r", SearchAccept)
        .redirect("\n", "\r")
        .bind("\\C-r", SearchAgainBack)
        .bind("\\C-s", SearchAgainForward)
        .bind("\\C-?", SearchBackspace)
        .redirect("\\C-h", "\\C-?")
        .bind("\\C-c", SearchCancel)
        .bind("\\C-g", SearchCancel)
        .bind("\x1b\x1b", SearchCancel)
        .bind("\x1b[A", SearchAcceptReplay)
        .bind("\x1b[B", SearchAcceptReplay);
    Keymap::compile(&[Layer::new().bind("*", SearchAppend), accepting, bindings])
}

pub fn prefix_keymap() -> Result<Keymap<EditorAction>> {
    let bindings = Layer::new()
        .bind("\x1b[A", PrefixPrev)
        .bind("\x1b[B", PrefixNext)
        .bind("\\C-p", PrefixPrev)
        .bind("\\C-n", PrefixNext)
        .bind("\r", PrefixAccept)
        .redirect("\n", "\r");
    Keymap::compile(&[Layer::new().bind("*", PrefixAcceptReplay), bindings])
}

/// The motion set rebound to a single action, used by search mode where any
/// motion accepts the match and replays in the parent.
fn motion_layer_as(action: EditorAction) -> Layer<EditorAction> {
    let mut layer = Layer::new();
    for key in [
        "\\C-b", "\\C-f", "\x1b[D", "\x1b[C", "\\C-a", "\\C-e", "\x1b[H", "\x1b[F", "\x1b[1~",
        "\x1b[4~", "\\M-f", "\\M-b", "\x1b[1;5C", "\x1b[1;5D",
    ] {
        layer = layer.bind(key, action);
    }
    layer
}

#[cfg(test)]
mod tests {
    use super::*;
    use replin_keymap::{Decoded, Decoder};

    fn decode_one(km: &Keymap<EditorAction>, input: &str) -> Option<EditorAction> {
        let mut d = Decoder::new(km);
        for c in input.chars() {
            match d.push(c) {
                Decoded::Pending => {}
                Decoded::Action { action, .. } => return Some(action),
                _ => return None,
            }
        }
        None
    }

    #[test]
    fn default_maps_compile() {
        let main = main_keymap(&[]).unwrap();
        assert_eq!(decode_one(&main, "a"), Some(SelfInsert));
        assert_eq!(decode_one(&main, "\x01"), Some(MoveLineStart));
        assert_eq!(decode_one(&main, "\x1b[1;2C"), Some(ShiftMoveRight));
        assert_eq!(decode_one(&main, "\x12"), Some(HistorySearchBack));
        assert_eq!(decode_one(&main, "\t"), Some(Complete));
        search_keymap().unwrap();
        prefix_keymap().unwrap();
    }

    #[test]
    fn newline_aliases_to_carriage_return() {
        let main = main_keymap(&[]).unwrap();
        let mut d = Decoder::new(&main);
        match d.push('\n') {
            Decoded::Alias { target, .. } => assert_eq!(target.as_slice(), &['\r']),
            other => panic!("expected alias, got {other:?}"),
        }
    }

    #[test]
    fn user_layer_overrides_default() {
        let user = Layer::new().bind("\\C-t", ClearScreen);
        let main = main_keymap(&[user]).unwrap();
        assert_eq!(decode_one(&main, "\x14"), Some(ClearScreen));
    }

    #[test]
    fn search_mode_motions_accept_and_replay() {
        let km = search_keymap().unwrap();
        assert_eq!(decode_one(&km, "\x1b[C"), Some(SearchAcceptReplay));
        assert_eq!(decode_one(&km, "x"), Some(SearchAppend));
        assert_eq!(decode_one(&km, "\x07"), Some(SearchCancel));
    }

    #[test]
    fn prefix_mode_passthrough_is_wildcard() {
        let km = prefix_keymap().unwrap();
        assert_eq!(decode_one(&km, "\x1b[A"), Some(PrefixPrev));
        assert_eq!(decode_one(&km, "q"), Some(PrefixAcceptReplay));
        assert_eq!(decode_one(&km, "\x03"), Some(PrefixAcceptReplay));
    }
}
