//! Node storage for the radix trie.
//!
//! Each node owns a compressed path fragment, an optional payload, a
//! terminal flag, and a fixed 256-way child table. All four fields are
//! guarded as one unit by the node's own read-write lock; nothing reads or
//! writes them outside a held guard.

use std::mem;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use smallvec::SmallVec;

/// Fragments up to this many bytes are stored inline.
const FRAGMENT_INLINE: usize = 16;

/// A compressed path segment. Immutable once the owning node is published,
/// except through a whole-node rewrite in [`NodeState::split`].
pub(crate) type Fragment = SmallVec<[u8; FRAGMENT_INLINE]>;

/// Fixed-width child table: one slot per unsigned byte value.
///
/// Slot index doubles as the child's discriminating byte, so iteration is
/// byte-ascending by construction and no two children can share a byte.
pub(crate) struct ChildTable<V> {
    slots: Box<[Option<Arc<Node<V>>>; 256]>,
}

impl<V> ChildTable<V> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Box::new(std::array::from_fn(|_| None)),
        }
    }

    pub(crate) fn get(&self, byte: u8) -> Option<&Arc<Node<V>>> {
        self.slots[byte as usize].as_ref()
    }

    pub(crate) fn set(&mut self, byte: u8, child: Arc<Node<V>>) {
        self.slots[byte as usize] = Some(child);
    }

    /// Occupied slots in ascending byte order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (u8, &Arc<Node<V>>)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(byte, slot)| slot.as_ref().map(|child| (byte as u8, child)))
    }
}

impl<V> Default for ChildTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// The lock-guarded portion of a node.
///
/// Invariants, holding whenever no thread has the node locked:
/// - the root's `fragment` is empty; every other node's is non-empty;
/// - a child reachable through slot `b` has `fragment[0] == b`;
/// - a non-terminal node holds no `value`;
/// - a non-terminal non-root node has at least one child.
pub(crate) struct NodeState<V> {
    pub(crate) fragment: Fragment,
    pub(crate) value: Option<V>,
    pub(crate) terminal: bool,
    pub(crate) children: ChildTable<V>,
}

/// A trie node: a read-write lock around [`NodeState`].
pub(crate) struct Node<V> {
    state: RwLock<NodeState<V>>,
}

impl<V> Node<V> {
    /// The root node: empty fragment, no payload, not terminal.
    pub(crate) fn root() -> Self {
        Self::from_parts(Fragment::new(), None, false, ChildTable::new())
    }

    /// A node covering a key suffix. Terminal by construction: a key ends
    /// exactly here, whether or not it carries a payload.
    pub(crate) fn for_suffix(suffix: &[u8], value: Option<V>) -> Self {
        debug_assert!(!suffix.is_empty());
        Self::from_parts(Fragment::from_slice(suffix), value, true, ChildTable::new())
    }

    pub(crate) fn from_parts(
        fragment: Fragment,
        value: Option<V>,
        terminal: bool,
        children: ChildTable<V>,
    ) -> Self {
        Self {
            state: RwLock::new(NodeState {
                fragment,
                value,
                terminal,
                children,
            }),
        }
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, NodeState<V>> {
        self.state.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, NodeState<V>> {
        self.state.write()
    }
}

impl<V> NodeState<V> {
    /// Rewrites this node into a branching point after a partial fragment
    /// match at `match_len`, keeping every key stored at or below it
    /// reachable and making the new key reachable.
    ///
    /// Callable only through an already-held write guard, and `match_len`
    /// must have been computed under that same guard; the whole rewrite is
    /// then atomic with respect to the decision that triggered it.
    pub(crate) fn split(&mut self, match_len: usize, key: &[u8], cursor: usize, value: Option<V>) {
        debug_assert!(match_len < self.fragment.len());
        // The descent only enters a node through a matching first byte, so
        // at least one byte matched and the truncated fragment stays
        // non-empty.
        debug_assert!(match_len > 0);

        let old_fragment = mem::take(&mut self.fragment);
        let old_value = self.value.take();
        let old_terminal = mem::replace(&mut self.terminal, false);
        let old_children = mem::take(&mut self.children);

        self.fragment = Fragment::from_slice(&old_fragment[..match_len]);

        // Push the unmatched remainder of the old fragment down into a
        // child that carries the old payload, terminal flag, and subtree.
        let suffix = &old_fragment[match_len..];
        let carried = Node::from_parts(
            Fragment::from_slice(suffix),
            old_value,
            old_terminal,
            old_children,
        );
        self.children.set(suffix[0], Arc::new(carried));

        let tail = cursor + match_len;
        if tail == key.len() {
            // The new key ends exactly at the branching point.
            self.value = value;
            self.terminal = true;
        } else {
            // The old fragment and the key diverge at `match_len`, so this
            // slot cannot collide with the carried child's.
            self.children
                .set(key[tail], Arc::new(Node::for_suffix(&key[tail..], value)));
        }
    }
}
