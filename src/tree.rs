//! The concurrent radix trie.
//!
//! Lookup and insertion drive the same descent loop: lock the node under
//! inspection, match its fragment against the remaining key bytes, then
//! return, fail, or step into a child. A thread holds at most one node's
//! lock at a time; descending clones the child's `Arc` under the parent's
//! lock and only then releases the parent. Structural rewrites happen in
//! [`crate::node::NodeState::split`], under the same write guard that
//! detected the partial match.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::node::Node;

/// A thread-safe ordered map from byte-sequence keys to values, backed by a
/// radix trie with prefix compression.
///
/// All operations take `&self`; concurrency control is per node, with no
/// global lock. Keys may be any byte sequence, including the empty one. A
/// key can be stored with an absent payload, which is distinct from the key
/// never having been inserted: [`RadixTree::get`] returns `Some(None)` for
/// the former and `None` for the latter.
///
/// # Example
///
/// ```rust
/// use radixkv::RadixTree;
///
/// let tree: RadixTree<u64> = RadixTree::new();
/// tree.insert(b"hello", 1);
/// tree.insert(b"help", 2);
///
/// assert_eq!(tree.get(b"hello"), Some(Some(1)));
/// assert_eq!(tree.get(b"hel"), None);
/// ```
pub struct RadixTree<V> {
    root: Arc<Node<V>>,
    len: AtomicUsize,
}

impl<V> RadixTree<V> {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self {
            root: Arc::new(Node::root()),
            len: AtomicUsize::new(0),
        }
    }

    /// Number of distinct keys stored.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    /// True if no key has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    pub(crate) fn root(&self) -> &Arc<Node<V>> {
        &self.root
    }
}

impl<V: Clone> RadixTree<V> {
    /// Looks up `key`.
    ///
    /// Returns `None` if the key was never inserted, `Some(None)` if it was
    /// inserted with an absent payload, and `Some(Some(value))` with a clone
    /// of the stored value otherwise. Never blocks longer than one node's
    /// lock at a time; the descent runs at most `key.len() + 1` steps.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<Option<V>> {
        let key = key.as_ref();

        if key.is_empty() {
            let state = self.root.read();
            return state.terminal.then(|| state.value.clone());
        }

        let mut current = Arc::clone(&self.root);
        let mut cursor = 0usize;

        loop {
            let next = {
                let state = current.read();
                let fragment = &state.fragment;

                if cursor + fragment.len() > key.len() {
                    // Fragment longer than the remaining key.
                    return None;
                }
                if fragment[..] != key[cursor..cursor + fragment.len()] {
                    return None;
                }
                cursor += fragment.len();

                if cursor == key.len() {
                    return state.terminal.then(|| state.value.clone());
                }
                match state.children.get(key[cursor]) {
                    Some(child) => Arc::clone(child),
                    None => return None,
                }
            };
            current = next;
        }
    }

    /// True if `key` was inserted, with or without a payload.
    pub fn contains(&self, key: impl AsRef<[u8]>) -> bool {
        self.get(key).is_some()
    }

    /// Stores `value` under `key`, replacing any previous payload.
    ///
    /// `value` accepts a plain `V` or `None`; storing `None` still marks the
    /// key as present. At most one existing node is mutated per call, either
    /// in place or through a split; up to two nodes are allocated.
    pub fn insert(&self, key: impl AsRef<[u8]>, value: impl Into<Option<V>>) {
        let key = key.as_ref();
        let value = value.into();

        if key.is_empty() {
            let mut state = self.root.write();
            if !state.terminal {
                self.len.fetch_add(1, Ordering::Relaxed);
            }
            state.value = value;
            state.terminal = true;
            return;
        }

        let mut current = Arc::clone(&self.root);
        let mut cursor = 0usize;

        loop {
            let next = {
                let mut state = current.write();

                let match_len = state
                    .fragment
                    .iter()
                    .zip(key[cursor..].iter())
                    .take_while(|(a, b)| a == b)
                    .count();

                if match_len < state.fragment.len() {
                    // Partial match. The split runs under the write guard
                    // that computed `match_len`; releasing it first would
                    // let another writer change the fragment underneath.
                    state.split(match_len, key, cursor, value);
                    self.len.fetch_add(1, Ordering::Relaxed);
                    return;
                }

                cursor += match_len;

                if cursor == key.len() {
                    if !state.terminal {
                        self.len.fetch_add(1, Ordering::Relaxed);
                    }
                    state.value = value;
                    state.terminal = true;
                    return;
                }

                match state.children.get(key[cursor]) {
                    Some(child) => Arc::clone(child),
                    None => {
                        // Check-then-insert under the continuously held
                        // lock: a racing insert targeting the same empty
                        // slot must not create a second node.
                        let child = Node::for_suffix(&key[cursor..], value);
                        state.children.set(key[cursor], Arc::new(child));
                        self.len.fetch_add(1, Ordering::Relaxed);
                        return;
                    }
                }
            };
            current = next;
        }
    }

    /// All stored keys with their payloads, in ascending byte order.
    ///
    /// The traversal takes one node's read lock at a time, so each node is
    /// observed consistently, but the snapshot as a whole is not atomic with
    /// respect to concurrent inserts.
    pub fn iter(&self) -> impl Iterator<Item = (Vec<u8>, Option<V>)> {
        let mut out = Vec::new();
        let mut path = Vec::new();
        Self::collect_subtree(&self.root, &mut path, &mut out);
        out.into_iter()
    }

    /// All stored keys starting with `prefix`, in ascending byte order.
    ///
    /// The prefix may end in the middle of a node's fragment; the whole
    /// subtree below that point is still covered.
    pub fn prefix_scan(&self, prefix: impl AsRef<[u8]>) -> impl Iterator<Item = (Vec<u8>, Option<V>)> {
        let prefix = prefix.as_ref();
        let mut out = Vec::new();
        let mut path: Vec<u8> = Vec::new();

        let mut current = Arc::clone(&self.root);
        let mut cursor = 0usize;

        loop {
            let next = {
                let state = current.read();
                let fragment = &state.fragment;
                let remaining = prefix.len() - cursor;

                if remaining <= fragment.len() {
                    // The subtree rooted here covers every extension of the
                    // prefix, or nothing at all.
                    if fragment[..remaining] != prefix[cursor..] {
                        break;
                    }
                    drop(state);
                    Self::collect_subtree(&current, &mut path, &mut out);
                    break;
                }
                if fragment[..] != prefix[cursor..cursor + fragment.len()] {
                    break;
                }
                cursor += fragment.len();
                path.extend_from_slice(fragment);

                match state.children.get(prefix[cursor]) {
                    Some(child) => Arc::clone(child),
                    None => break,
                }
            };
            current = next;
        }

        out.into_iter()
    }

    /// In-order walk: a node's own entry first, then its children by
    /// ascending slot byte. `path` holds the concatenated fragments above
    /// `node` and is restored before returning.
    fn collect_subtree(node: &Arc<Node<V>>, path: &mut Vec<u8>, out: &mut Vec<(Vec<u8>, Option<V>)>) {
        let base = path.len();
        let children = {
            let state = node.read();
            path.extend_from_slice(&state.fragment);
            if state.terminal {
                out.push((path.clone(), state.value.clone()));
            }
            state
                .children
                .iter()
                .map(|(_, child)| Arc::clone(child))
                .collect::<Vec<_>>()
        };
        for child in children {
            Self::collect_subtree(&child, path, out);
        }
        path.truncate(base);
    }
}

impl<V> Default for RadixTree<V> {
    fn default() -> Self {
        Self::new()
    }
}
