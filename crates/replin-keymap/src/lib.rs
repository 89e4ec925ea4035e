//! Layered keymaps compiled into a character trie.
//!
//! A keymap is built from a stack of layers; within one layer conflicting
//! definitions are a construction error (unless the layer opts into
//! overriding), across layers the higher layer wins. Leaves are actions,
//! lazy aliases to another key sequence, or explicit ignores. A designated
//! wildcard character matches any character not otherwise enumerated at a
//! node; after merging, wildcard subtrees are copied into their siblings so
//! every partially matched prefix keeps a defined fallback.
//!
//! Compilation happens once per mode per session. Decoding is a pure walk:
//! `(current node, input char) -> next node or leaf`, with no side effects
//! beyond TRACE logging.

use ahash::AHashMap;
use anyhow::{Result, bail, ensure};
use smallvec::SmallVec;
use std::collections::HashSet;
use tracing::trace;

/// Private-use catch-all child. User key strings spell it `*`; a literal
/// occurrence of the codepoint itself is rejected by normalization.
pub const WILDCARD: char = '\u{10F7FF}';

/// Normalized key sequence. Sequences are short; eight chars covers every
/// common escape sequence without spilling.
pub type KeySeq = SmallVec<[char; 8]>;

// -------------------------------------------------------------------------------------------------
// Key normalization
// -------------------------------------------------------------------------------------------------

fn ctrl_char(x: char) -> Result<char> {
    if x == '?' {
        return Ok('\x7f');
    }
    let u = x.to_ascii_uppercase();
    ensure!(
        ('@'..='_').contains(&u),
        "unknown control key '^{x}'"
    );
    Ok(((u as u8) - 64) as char)
}

/// Reduce a user-facing key string (`^X`, `\C-x`, `\M-x`, `*`, literals) to
/// a plain character sequence.
pub fn normalize_key(key: &str) -> Result<KeySeq> {
    let mut out = KeySeq::new();
    let mut chars = key.chars();
    while let Some(c) = chars.next() {
        match c {
            WILDCARD => bail!("key {key:?} contains the reserved wildcard codepoint"),
            '*' => out.push(WILDCARD),
            '^' => {
                let Some(x) = chars.next() else {
                    bail!("dangling '^' in key {key:?}");
                };
                out.push(ctrl_char(x)?);
            }
            '\\' => match chars.next() {
                Some('C') => {
                    ensure!(chars.next() == Some('-'), "malformed \\C- in key {key:?}");
                    let Some(x) = chars.next() else {
                        bail!("dangling \\C- in key {key:?}");
                    };
                    out.push(ctrl_char(x)?);
                }
                Some('M') => {
                    ensure!(chars.next() == Some('-'), "malformed \\M- in key {key:?}");
                    let Some(x) = chars.next() else {
                        bail!("dangling \\M- in key {key:?}");
                    };
                    out.push('\x1b');
                    out.push(x);
                }
                Some(other) => bail!("unknown escape \\{other} in key {key:?}"),
                None => bail!("dangling '\\' in key {key:?}"),
            },
            other => out.push(other),
        }
    }
    ensure!(!out.is_empty(), "empty key");
    Ok(out)
}

// -------------------------------------------------------------------------------------------------
// Trie
// -------------------------------------------------------------------------------------------------

/// What a fully matched key sequence resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyLeaf<A> {
    Action(A),
    /// Restart decoding as if the aliased sequence had been typed, against
    /// the post-merge map, so aliasing sees later layers.
    Alias(KeySeq),
    Ignore,
}

#[derive(Debug, Clone)]
enum Node<A> {
    Branch(AHashMap<char, Node<A>>),
    Leaf(KeyLeaf<A>),
}

/// One precedence layer: an ordered list of bindings in user-facing form.
#[derive(Debug, Clone)]
pub struct Layer<A> {
    entries: Vec<(String, Entry<A>)>,
    override_conflicts: bool,
}

#[derive(Debug, Clone)]
enum Entry<A> {
    Action(A),
    Redirect(String),
    Ignore,
}

impl<A> Default for Layer<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Layer<A> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            override_conflicts: false,
        }
    }

    /// Allow later entries in this layer to replace earlier conflicting ones.
    pub fn with_override(mut self) -> Self {
        self.override_conflicts = true;
        self
    }

    pub fn bind(mut self, key: &str, action: A) -> Self {
        self.entries.push((key.to_string(), Entry::Action(action)));
        self
    }

    /// Redirect `key` to whatever `target` resolves to at merge time.
    pub fn redirect(mut self, key: &str, target: &str) -> Self {
        self.entries
            .push((key.to_string(), Entry::Redirect(target.to_string())));
        self
    }

    pub fn ignore(mut self, key: &str) -> Self {
        self.entries.push((key.to_string(), Entry::Ignore));
        self
    }
}

/// A compiled, read-only keymap.
#[derive(Debug, Clone)]
pub struct Keymap<A> {
    root: AHashMap<char, Node<A>>,
}

impl<A: Clone> Keymap<A> {
    /// Compile a stack of layers, lowest precedence first.
    pub fn compile(layers: &[Layer<A>]) -> Result<Self> {
        let mut root: AHashMap<char, Node<A>> = AHashMap::new();
        for layer in layers {
            // direct entries first, then redirections against the merged map
            let mut built: AHashMap<char, Node<A>> = AHashMap::new();
            let mut direct_keys: HashSet<Vec<char>> = HashSet::new();
            for (key, entry) in &layer.entries {
                let seq = normalize_key(key)?;
                let leaf = match entry {
                    Entry::Action(a) => KeyLeaf::Action(a.clone()),
                    Entry::Ignore => KeyLeaf::Ignore,
                    Entry::Redirect(_) => continue,
                };
                direct_keys.insert(seq.to_vec());
                insert(&mut built, &seq, leaf, layer.override_conflicts, key)?;
            }
            graft(&mut root, built);
            let mut redirects: AHashMap<char, Node<A>> = AHashMap::new();
            for (key, entry) in &layer.entries {
                let Entry::Redirect(target) = entry else {
                    continue;
                };
                let seq = normalize_key(key)?;
                ensure!(
                    layer.override_conflicts || !direct_keys.contains(&seq.to_vec()),
                    "conflicting definitions for key {key:?}"
                );
                let resolved_seq = chase_redirect(layer, key, target)?;
                ensure!(
                    lookup(&root, &resolved_seq).is_some(),
                    "alias target of key {key:?} is not bound"
                );
                insert(
                    &mut redirects,
                    &seq,
                    KeyLeaf::Alias(resolved_seq),
                    layer.override_conflicts,
                    key,
                )?;
            }
            graft(&mut root, redirects);
        }
        fixup_wildcards(&mut root);
        trace!(target: "keymap", layers = layers.len(), "keymap_compiled");
        Ok(Self { root })
    }

    /// Resolve a full sequence without consuming decoder state. Used by
    /// tests and by alias re-entry checks.
    pub fn resolve(&self, seq: &[char]) -> Resolution<'_, A> {
        let mut map = &self.root;
        for (i, c) in seq.iter().enumerate() {
            let child = map.get(c).or_else(|| map.get(&WILDCARD));
            match child {
                None => return Resolution::Unmapped,
                Some(Node::Leaf(leaf)) => {
                    return if i + 1 == seq.len() {
                        Resolution::Leaf(leaf)
                    } else {
                        Resolution::Unmapped
                    };
                }
                Some(Node::Branch(b)) => map = b,
            }
        }
        Resolution::Prefix
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Resolution<'a, A> {
    /// The sequence is a strict prefix of at least one binding.
    Prefix,
    Leaf(&'a KeyLeaf<A>),
    Unmapped,
}

fn insert<A: Clone>(
    map: &mut AHashMap<char, Node<A>>,
    seq: &[char],
    leaf: KeyLeaf<A>,
    override_conflicts: bool,
    key: &str,
) -> Result<()> {
    let (&c, rest) = seq.split_first().expect("normalized keys are non-empty");
    if rest.is_empty() {
        match map.get(&c) {
            Some(_) if !override_conflicts => {
                bail!("conflicting definitions for key {key:?}")
            }
            _ => {
                map.insert(c, Node::Leaf(leaf));
            }
        }
        return Ok(());
    }
    let slot = map.entry(c).or_insert_with(|| Node::Branch(AHashMap::new()));
    if let Node::Leaf(_) = slot {
        ensure!(
            override_conflicts,
            "conflicting definitions for key {key:?}"
        );
        *slot = Node::Branch(AHashMap::new());
    }
    let Node::Branch(b) = slot else { unreachable!() };
    insert(b, rest, leaf, override_conflicts, key)
}

/// Merge `new` over `acc`: new (higher-precedence) leaves replace, branches
/// recurse.
fn graft<A>(acc: &mut AHashMap<char, Node<A>>, new: AHashMap<char, Node<A>>) {
    use std::collections::hash_map::Entry;
    for (c, node) in new {
        match acc.entry(c) {
            Entry::Vacant(v) => {
                v.insert(node);
            }
            Entry::Occupied(mut o) => match (o.get_mut(), node) {
                (Node::Branch(existing), Node::Branch(b)) => graft(existing, b),
                (slot, node) => *slot = node,
            },
        }
    }
}

/// Follow a chain of redirects within one layer, erroring on cycles.
/// Comparison happens in normalized key space so spellings like `^H` and
/// `\C-h` chain correctly.
fn chase_redirect<A>(layer: &Layer<A>, origin: &str, target: &str) -> Result<KeySeq> {
    let mut seen: HashSet<Vec<char>> = HashSet::new();
    let mut cur = normalize_key(target)?;
    loop {
        if !seen.insert(cur.to_vec()) {
            bail!("redirect cycle through key {cur:?} starting at {origin:?}");
        }
        let next = layer
            .entries
            .iter()
            .find_map(|(k, e)| match (normalize_key(k), e) {
                (Ok(seq), Entry::Redirect(t)) if seq == cur => Some(t.clone()),
                _ => None,
            });
        match next {
            Some(t) => cur = normalize_key(&t)?,
            None => return Ok(cur),
        }
    }
}

fn lookup<'a, A>(map: &'a AHashMap<char, Node<A>>, seq: &[char]) -> Option<&'a Node<A>> {
    let (&c, rest) = seq.split_first()?;
    let node = map.get(&c).or_else(|| map.get(&WILDCARD))?;
    if rest.is_empty() {
        Some(node)
    } else {
        match node {
            Node::Branch(b) => lookup(b, rest),
            Node::Leaf(_) => None,
        }
    }
}

/// Copy each wildcard subtree into its siblings, top-down, so deep wildcards
/// propagate through every partially matched prefix.
fn fixup_wildcards<A: Clone>(map: &mut AHashMap<char, Node<A>>) {
    if let Some(fallback) = map.get(&WILDCARD).cloned() {
        for (c, child) in map.iter_mut() {
            if *c != WILDCARD {
                graft_fallback(child, &fallback);
            }
        }
    }
    for child in map.values_mut() {
        if let Node::Branch(b) = child {
            fixup_wildcards(b);
        }
    }
}

fn graft_fallback<A: Clone>(child: &mut Node<A>, fallback: &Node<A>) {
    match (child, fallback) {
        (Node::Branch(b), Node::Branch(fb)) => {
            for (c, fnode) in fb {
                match b.get_mut(c) {
                    None => {
                        b.insert(*c, fnode.clone());
                    }
                    Some(existing) => graft_fallback(existing, fnode),
                }
            }
        }
        (Node::Branch(b), leaf @ Node::Leaf(_)) => {
            b.entry(WILDCARD).or_insert_with(|| leaf.clone());
        }
        (Node::Leaf(_), _) => {}
    }
}

// -------------------------------------------------------------------------------------------------
// Decoder
// -------------------------------------------------------------------------------------------------

/// Incremental trie walk over the input character stream.
pub struct Decoder<'k, A> {
    keymap: &'k Keymap<A>,
    node: Option<&'k AHashMap<char, Node<A>>>,
    matched: KeySeq,
}

/// Result of feeding one character to the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded<A> {
    /// Mid-sequence; feed more input.
    Pending,
    Action { action: A, seq: String },
    /// Re-enter decoding with the aliased sequence.
    Alias { target: KeySeq, seq: String },
    Ignored { seq: String },
    /// No binding along this path; the sequence is dropped cleanly.
    Dropped { seq: String },
}

impl<'k, A: Clone> Decoder<'k, A> {
    pub fn new(keymap: &'k Keymap<A>) -> Self {
        Self {
            keymap,
            node: None,
            matched: KeySeq::new(),
        }
    }

    pub fn pending(&self) -> bool {
        !self.matched.is_empty()
    }

    fn take_seq(&mut self) -> String {
        self.node = None;
        self.matched.drain(..).collect()
    }

    pub fn push(&mut self, c: char) -> Decoded<A> {
        let map = self.node.unwrap_or(&self.keymap.root);
        let child = map.get(&c).or_else(|| map.get(&WILDCARD));
        self.matched.push(c);
        match child {
            None => {
                let seq = self.take_seq();
                trace!(target: "input.decode", seq_len = seq.len(), "sequence_dropped");
                Decoded::Dropped { seq }
            }
            Some(Node::Branch(b)) => {
                self.node = Some(b);
                Decoded::Pending
            }
            Some(Node::Leaf(leaf)) => {
                let leaf = leaf.clone();
                let seq = self.take_seq();
                match leaf {
                    KeyLeaf::Action(action) => Decoded::Action { action, seq },
                    KeyLeaf::Alias(target) => Decoded::Alias { target, seq },
                    KeyLeaf::Ignore => Decoded::Ignored { seq },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed<'k>(km: &'k Keymap<&'static str>, input: &str) -> Vec<Decoded<&'static str>> {
        let mut d = Decoder::new(km);
        let mut out = Vec::new();
        for c in input.chars() {
            match d.push(c) {
                Decoded::Pending => {}
                other => out.push(other),
            }
        }
        out
    }

    fn actions(results: &[Decoded<&'static str>]) -> Vec<&'static str> {
        results
            .iter()
            .filter_map(|r| match r {
                Decoded::Action { action, .. } => Some(*action),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn normalization_forms() {
        assert_eq!(normalize_key("^A").unwrap().as_slice(), &['\x01']);
        assert_eq!(normalize_key("\\C-a").unwrap().as_slice(), &['\x01']);
        assert_eq!(normalize_key("\\C-?").unwrap().as_slice(), &['\x7f']);
        assert_eq!(normalize_key("\\M-f").unwrap().as_slice(), &['\x1b', 'f']);
        assert_eq!(normalize_key("*").unwrap().as_slice(), &[WILDCARD]);
        assert_eq!(normalize_key("\x1b[A").unwrap().as_slice(), &['\x1b', '[', 'A']);
    }

    #[test]
    fn normalization_rejects_bad_forms() {
        assert!(normalize_key("\\X-a").is_err());
        assert!(normalize_key("\\C_a").is_err());
        assert!(normalize_key("^").is_err());
        assert!(normalize_key(&WILDCARD.to_string()).is_err());
        assert!(normalize_key("").is_err());
    }

    #[test]
    fn single_layer_decode() {
        let km = Keymap::compile(&[Layer::new().bind("^A", "home").bind("\x1b[A", "up")]).unwrap();
        assert_eq!(actions(&feed(&km, "\x01")), vec!["home"]);
        assert_eq!(actions(&feed(&km, "\x1b[A")), vec!["up"]);
    }

    #[test]
    fn unmatched_sequence_is_dropped() {
        let km = Keymap::compile(&[Layer::new().bind("\x1b[A", "up")]).unwrap();
        let out = feed(&km, "\x1b[Zq");
        assert!(matches!(&out[0], Decoded::Dropped { .. }));
        // 'q' after the drop starts a fresh walk at the root
        assert!(matches!(&out[1], Decoded::Dropped { seq } if seq == "q"));
    }

    #[test]
    fn higher_layer_wins_conflicts() {
        let low = Layer::new().bind("^A", "low");
        let high = Layer::new().bind("^A", "high");
        let km = Keymap::compile(&[low, high]).unwrap();
        assert_eq!(actions(&feed(&km, "\x01")), vec!["high"]);
    }

    #[test]
    fn conflict_within_layer_is_fatal() {
        let layer = Layer::new().bind("^A", "x").bind("^A", "y");
        assert!(Keymap::<&str>::compile(&[layer]).is_err());
    }

    #[test]
    fn override_layer_allows_replacement() {
        let layer = Layer::new().with_override().bind("^A", "x").bind("^A", "y");
        let km = Keymap::compile(&[layer]).unwrap();
        assert_eq!(actions(&feed(&km, "\x01")), vec!["y"]);
    }

    #[test]
    fn prefix_conflict_within_layer_is_fatal() {
        let layer = Layer::new().bind("ab", "x").bind("a", "y");
        assert!(Keymap::<&str>::compile(&[layer]).is_err());
        let layer = Layer::new().bind("a", "y").bind("ab", "x");
        assert!(Keymap::<&str>::compile(&[layer]).is_err());
    }

    #[test]
    fn alias_resolves_lazily_against_merged_map() {
        // "\n" redirects to "\r"; a higher layer rebinds "\r". The alias
        // must see the later binding.
        let low = Layer::new().bind("\r", "commit-low").redirect("\n", "\r");
        let high = Layer::new().bind("\r", "commit-high");
        let km = Keymap::compile(&[low, high]).unwrap();
        let out = feed(&km, "\n");
        let Decoded::Alias { target, .. } = &out[0] else {
            panic!("expected alias, got {out:?}");
        };
        assert_eq!(target.as_slice(), &['\r']);
        match km.resolve(target) {
            Resolution::Leaf(KeyLeaf::Action(a)) => assert_eq!(*a, "commit-high"),
            other => panic!("unexpected resolution {other:?}"),
        }
    }

    #[test]
    fn redirect_chain_resolves() {
        let layer = Layer::new()
            .bind("c", "end")
            .redirect("a", "b")
            .redirect("b", "c");
        let km = Keymap::compile(&[layer]).unwrap();
        let out = feed(&km, "a");
        let Decoded::Alias { target, .. } = &out[0] else {
            panic!("expected alias");
        };
        assert_eq!(target.as_slice(), &['c']);
    }

    #[test]
    fn redirect_cycle_is_fatal() {
        let layer = Layer::new().redirect("a", "b").redirect("b", "a");
        assert!(Keymap::<&str>::compile(&[layer]).is_err());
    }

    #[test]
    fn dangling_redirect_is_fatal() {
        let layer = Layer::new().redirect("a", "zzz");
        assert!(Keymap::<&str>::compile(&[layer]).is_err());
    }

    #[test]
    fn ignore_entry_swallows_sequence() {
        let km = Keymap::compile(&[Layer::new().ignore("^L").bind("*", "insert")]).unwrap();
        let out = feed(&km, "\x0c");
        assert!(matches!(&out[0], Decoded::Ignored { .. }));
    }

    #[test]
    fn wildcard_matches_unbound_chars() {
        let km = Keymap::compile(&[Layer::new().bind("*", "insert").bind("^D", "eof")]).unwrap();
        assert_eq!(actions(&feed(&km, "x")), vec!["insert"]);
        assert_eq!(actions(&feed(&km, "\x04")), vec!["eof"]);
    }

    #[test]
    fn wildcard_fixup_gives_prefixes_a_fallback() {
        // after fixup, any extension of the accepted prefix "\x1b[" resolves
        // rather than being undefined
        let km = Keymap::compile(&[
            Layer::new().bind("*", "insert").bind("\x1b[A", "up"),
        ])
        .unwrap();
        assert_eq!(actions(&feed(&km, "\x1b[A")), vec!["up"]);
        // an unknown continuation resolves through the grafted fallback
        let out = feed(&km, "\x1b[Q");
        assert_eq!(actions(&out), vec!["insert"]);
    }

    #[test]
    fn merge_order_is_irrelevant_for_disjoint_layers() {
        let a = Layer::new().bind("^A", "a").bind("\x1b[A", "up");
        let b = Layer::new().bind("^B", "b");
        let c = Layer::new().bind("^C", "c").bind("\x1b[B", "down");
        let abc = Keymap::compile(&[a.clone(), b.clone(), c.clone()]).unwrap();
        let cba = Keymap::compile(&[c, b, a]).unwrap();
        for input in ["\x01", "\x02", "\x03", "\x1b[A", "\x1b[B"] {
            assert_eq!(actions(&feed(&abc, input)), actions(&feed(&cba, input)));
        }
    }
}
