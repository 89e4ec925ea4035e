//! Completion provider interface, shared by tab completion and the hint
//! worker.

use std::ops::Range;

/// A candidate: the text spliced into the buffer versus the text shown in
/// the candidate list. They coincide unless the provider says otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedCompletion {
    pub completion: String,
    pub display: String,
}

impl NamedCompletion {
    pub fn new(completion: impl Into<String>) -> Self {
        let completion = completion.into();
        Self {
            display: completion.clone(),
            completion,
        }
    }

    pub fn with_display(completion: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            completion: completion.into(),
            display: display.into(),
        }
    }
}

/// Result of one provider call: candidates, the byte range they replace, and
/// whether splicing is appropriate at this position.
#[derive(Debug, Clone, Default)]
pub struct Completions {
    pub candidates: Vec<NamedCompletion>,
    pub range: Range<usize>,
    pub should_complete: bool,
}

pub trait CompleteProvider: Send + Sync {
    /// `hint` grants permission to return fast, possibly partial results.
    fn complete_line(&self, buffer: &str, position: usize, scope: &str, hint: bool)
    -> Completions;
}

/// Longest common prefix of all candidate completions.
pub fn common_prefix(candidates: &[NamedCompletion]) -> String {
    let Some(first) = candidates.first() else {
        return String::new();
    };
    let mut prefix = first.completion.as_str();
    for c in &candidates[1..] {
        while !c.completion.starts_with(prefix) {
            let mut end = prefix.len() - 1;
            while !prefix.is_char_boundary(end) {
                end -= 1;
            }
            prefix = &prefix[..end];
            if prefix.is_empty() {
                return String::new();
            }
        }
    }
    prefix.to_string()
}

/// Completes the identifier left of the cursor against a fixed word list.
pub struct WordCompleter {
    words: Vec<String>,
}

impl WordCompleter {
    pub fn new(words: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut words: Vec<String> = words.into_iter().map(Into::into).collect();
        words.sort();
        Self { words }
    }

    fn word_start(buffer: &str, position: usize) -> usize {
        buffer[..position]
            .rfind(|c: char| !c.is_alphanumeric() && c != '_')
            .map(|i| i + buffer[i..].chars().next().map_or(1, char::len_utf8))
            .unwrap_or(0)
    }
}

impl CompleteProvider for WordCompleter {
    fn complete_line(
        &self,
        buffer: &str,
        position: usize,
        _scope: &str,
        _hint: bool,
    ) -> Completions {
        let start = Self::word_start(buffer, position);
        let partial = &buffer[start..position];
        let candidates = if partial.is_empty() {
            Vec::new()
        } else {
            self.words
                .iter()
                .filter(|w| w.starts_with(partial))
                .map(|w| NamedCompletion::new(w.as_str()))
                .collect()
        };
        Completions {
            candidates,
            range: start..position,
            should_complete: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_prefix_of_candidates() {
        let cands = vec![
            NamedCompletion::new("printline"),
            NamedCompletion::new("println"),
            NamedCompletion::new("print"),
        ];
        assert_eq!(common_prefix(&cands), "print");
        assert_eq!(common_prefix(&[]), "");
        let disjoint = vec![NamedCompletion::new("abc"), NamedCompletion::new("xyz")];
        assert_eq!(common_prefix(&disjoint), "");
    }

    #[test]
    fn word_completer_replaces_partial_word() {
        let wc = WordCompleter::new(["hello", "help", "heap"]);
        let res = wc.complete_line("say hel", 7, "", false);
        assert_eq!(res.range, 4..7);
        let names: Vec<&str> = res.candidates.iter().map(|c| c.completion.as_str()).collect();
        assert_eq!(names, vec!["hello", "help"]);
    }

    #[test]
    fn empty_partial_yields_nothing() {
        let wc = WordCompleter::new(["x"]);
        let res = wc.complete_line("foo ", 4, "", true);
        assert!(res.candidates.is_empty());
    }

    #[test]
    fn display_defaults_to_completion() {
        let c = NamedCompletion::new("abc");
        assert_eq!(c.display, "abc");
        let c = NamedCompletion::with_display("abc", "abc()");
        assert_eq!(c.display, "abc()");
    }
}
