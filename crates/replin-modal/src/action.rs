//! The editor command set.
//!
//! Keymap leaves carry one of these; dispatch switches on the variant and
//! the name symbol drives the region protocol (`shift_` activation, motion
//! preservation) and repeat detection.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorAction {
    // insertion and deletion
    SelfInsert,
    AcceptLine,
    Backspace,
    DeleteForward,
    DeleteForwardOrEof,
    // plain motion
    MoveLeft,
    MoveRight,
    MoveWordLeft,
    MoveWordRight,
    MoveLineStart,
    MoveLineEnd,
    MoveUp,
    MoveDown,
    // shift-modified motion (activates the region)
    ShiftMoveLeft,
    ShiftMoveRight,
    ShiftMoveWordLeft,
    ShiftMoveWordRight,
    ShiftMoveLineStart,
    ShiftMoveLineEnd,
    ShiftMoveUp,
    ShiftMoveDown,
    // kill / yank
    KillLine,
    KillLineBackward,
    Werase,
    KillWordBack,
    KillWordForward,
    KillRegion,
    CopyRegion,
    Yank,
    YankPop,
    // mark
    SetMark,
    ExchangeMark,
    // history
    Undo,
    Redo,
    // structural edits
    TransposeChars,
    TransposeWords,
    TransposeLinesUp,
    TransposeLinesDown,
    UpcaseWord,
    DowncaseWord,
    TitlecaseWord,
    Indent,
    Outdent,
    // completion
    Complete,
    // session control
    ClearScreen,
    Interrupt,
    Suspend,
    BracketedPaste,
    // transitions into search modes
    HistorySearchBack,
    HistorySearchForward,
    // incremental search mode
    SearchAppend,
    SearchBackspace,
    SearchAgainBack,
    SearchAgainForward,
    SearchAccept,
    SearchAcceptReplay,
    SearchCancel,
    // prefix search mode
    PrefixPrev,
    PrefixNext,
    PrefixAccept,
    PrefixAcceptReplay,
}

impl EditorAction {
    /// Stable name symbol used for repeat detection, the region protocol,
    /// and logging.
    pub fn name(self) -> &'static str {
        use EditorAction::*;
        match self {
            SelfInsert => "edit_insert",
            AcceptLine => "accept_line",
            Backspace => "edit_backspace",
            DeleteForward => "edit_delete",
            DeleteForwardOrEof => "edit_delete_or_eof",
            MoveLeft => "edit_move_left",
            MoveRight => "edit_move_right",
            MoveWordLeft => "edit_move_word_left",
            MoveWordRight => "edit_move_word_right",
            MoveLineStart => "edit_move_line_start",
            MoveLineEnd => "edit_move_line_end",
            MoveUp => "edit_move_up",
            MoveDown => "edit_move_down",
            ShiftMoveLeft => "shift_move_left",
            ShiftMoveRight => "shift_move_right",
            ShiftMoveWordLeft => "shift_move_word_left",
            ShiftMoveWordRight => "shift_move_word_right",
            ShiftMoveLineStart => "shift_move_line_start",
            ShiftMoveLineEnd => "shift_move_line_end",
            ShiftMoveUp => "shift_move_up",
            ShiftMoveDown => "shift_move_down",
            KillLine => "edit_kill_line",
            KillLineBackward => "edit_kill_line_backward",
            Werase => "edit_werase",
            KillWordBack => "edit_kill_word_back",
            KillWordForward => "edit_kill_word_forward",
            KillRegion => "edit_kill_region",
            CopyRegion => "edit_copy_region",
            Yank => "edit_yank",
            YankPop => "edit_yank_pop",
            SetMark => "edit_set_mark",
            ExchangeMark => "edit_exchange_mark",
            Undo => "edit_undo",
            Redo => "edit_redo",
            TransposeChars => "edit_transpose_chars",
            TransposeWords => "edit_transpose_words",
            TransposeLinesUp => "edit_transpose_lines_up",
            TransposeLinesDown => "edit_transpose_lines_down",
            UpcaseWord => "edit_upper_case",
            DowncaseWord => "edit_lower_case",
            TitlecaseWord => "edit_title_case",
            Indent => "edit_indent",
            Outdent => "edit_outdent",
            Complete => "complete_line",
            ClearScreen => "clear_screen",
            Interrupt => "interrupt",
            Suspend => "suspend",
            BracketedPaste => "bracketed_paste",
            HistorySearchBack => "history_search_back",
            HistorySearchForward => "history_search_forward",
            SearchAppend => "search_append",
            SearchBackspace => "search_backspace",
            SearchAgainBack => "search_again_back",
            SearchAgainForward => "search_again_forward",
            SearchAccept => "search_accept",
            SearchAcceptReplay => "search_accept_replay",
            SearchCancel => "search_cancel",
            PrefixPrev => "prefix_search_prev",
            PrefixNext => "prefix_search_next",
            PrefixAccept => "prefix_search_accept",
            PrefixAcceptReplay => "prefix_search_replay",
        }
    }

    pub fn is_shift(self) -> bool {
        self.name().starts_with("shift_")
    }

    /// Plain motions preserve a mark-activated region.
    pub fn is_motion(self) -> bool {
        self.name().starts_with("edit_move")
    }
}
