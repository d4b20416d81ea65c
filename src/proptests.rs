//! Model-based property tests against `BTreeMap`, plus a whole-tree
//! structural invariant walk.

use std::collections::BTreeMap;
use std::sync::Arc;

use proptest::prelude::*;

use crate::node::Node;
use crate::RadixTree;

/// Walks the whole tree, checking the structural invariants at every node,
/// and returns the stored entries keyed by their root-to-node fragment
/// concatenation. Also used by the threaded stress tests in `tree.rs`.
pub(crate) fn validate_tree<V: Clone>(tree: &RadixTree<V>) -> BTreeMap<Vec<u8>, Option<V>> {
    let mut found = BTreeMap::new();
    // (node, concatenated fragments above it, slot byte in the parent).
    // Child states are read after the parent's guard is released, matching
    // the one-lock-at-a-time discipline of the real operations.
    let mut stack: Vec<(Arc<Node<V>>, Vec<u8>, Option<u8>)> =
        vec![(Arc::clone(tree.root()), Vec::new(), None)];

    while let Some((node, path, slot)) = stack.pop() {
        let state = node.read();

        match slot {
            None => assert!(state.fragment.is_empty(), "root fragment must be empty"),
            Some(byte) => {
                assert!(
                    !state.fragment.is_empty(),
                    "non-root fragment must not be empty"
                );
                assert_eq!(
                    state.fragment[0], byte,
                    "fragment must start with its slot byte"
                );
            }
        }

        let mut key = path;
        key.extend_from_slice(&state.fragment);

        let mut child_count = 0usize;
        for (byte, child) in state.children.iter() {
            child_count += 1;
            stack.push((Arc::clone(child), key.clone(), Some(byte)));
        }

        if state.terminal {
            let prev = found.insert(key, state.value.clone());
            assert!(prev.is_none(), "two nodes must not store the same key");
        } else {
            assert!(
                state.value.is_none(),
                "non-terminal node must not hold a value"
            );
            assert!(
                slot.is_none() || child_count > 0,
                "non-terminal node must have at least one child"
            );
        }
    }

    found
}

#[derive(Clone, Debug)]
enum Op {
    Insert(Vec<u8>, u64),
    /// Store the key with an absent payload.
    Mark(Vec<u8>),
    Get(Vec<u8>),
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    // Bias towards a tiny alphabet so generated keys collide on long common
    // prefixes and exercise the split paths.
    let byte = prop_oneof![4 => 0u8..4, 1 => any::<u8>()];
    prop::collection::vec(byte, 0..=24)
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let key = key_strategy();
    let op = prop_oneof![
        55 => (key.clone(), any::<u64>()).prop_map(|(k, v)| Op::Insert(k, v)),
        15 => key.clone().prop_map(Op::Mark),
        30 => key.prop_map(Op::Get),
    ];
    prop::collection::vec(op, 0..=1200)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in ops_strategy()) {
        let tree: RadixTree<u64> = RadixTree::new();
        let mut model: BTreeMap<Vec<u8>, Option<u64>> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    tree.insert(&key, value);
                    model.insert(key, Some(value));
                }
                Op::Mark(key) => {
                    tree.insert(&key, None);
                    model.insert(key, None);
                }
                Op::Get(key) => {
                    prop_assert_eq!(tree.get(&key), model.get(key.as_slice()).cloned());
                }
            }
            prop_assert_eq!(tree.len(), model.len());
        }

        let found = validate_tree(&tree);
        prop_assert_eq!(&found, &model);

        let got: Vec<(Vec<u8>, Option<u64>)> = tree.iter().collect();
        let expected: Vec<(Vec<u8>, Option<u64>)> =
            model.iter().map(|(k, v)| (k.clone(), *v)).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_prefix_scan(ops in ops_strategy(), prefix in key_strategy()) {
        let tree: RadixTree<u64> = RadixTree::new();
        let mut model: BTreeMap<Vec<u8>, Option<u64>> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    tree.insert(&key, value);
                    model.insert(key, Some(value));
                }
                Op::Mark(key) => {
                    tree.insert(&key, None);
                    model.insert(key, None);
                }
                Op::Get(_) => {}
            }
        }

        let got: Vec<(Vec<u8>, Option<u64>)> = tree.prefix_scan(&prefix).collect();
        let expected: Vec<(Vec<u8>, Option<u64>)> = model
            .iter()
            .filter(|(k, _)| k.starts_with(&prefix))
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        prop_assert_eq!(got, expected);
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

#[test]
fn exhaustive_insert_order_small_set() {
    let keys: Vec<Vec<u8>> = vec![
        b"".to_vec(),
        b"a".to_vec(),
        b"ab".to_vec(),
        b"abc".to_vec(),
        b"ax".to_vec(),
        b"b".to_vec(),
        b"ba".to_vec(),
    ];

    for_each_permutation(&keys, |perm| {
        let tree: RadixTree<u64> = RadixTree::new();
        let mut model: BTreeMap<Vec<u8>, Option<u64>> = BTreeMap::new();

        for (i, key) in perm.into_iter().enumerate() {
            let value = i as u64;
            tree.insert(&key, value);
            model.insert(key, Some(value));
        }

        assert_eq!(tree.len(), model.len());
        let found = validate_tree(&tree);
        assert_eq!(found, model);
    });
}
