//! # radixkv
//!
//! A thread-safe ordered key-value map built on a radix trie (Patricia
//! tree) with prefix compression.
//!
//! Keys are arbitrary byte sequences. Chains of single-child nodes are
//! compressed into multi-byte fragments, so lookups and inserts run in
//! O(key length) with low memory overhead on keyspaces with long shared
//! prefixes.
//!
//! ## Features
//!
//! - **O(key length) operations**: point lookups and inserts walk at most
//!   one node per key byte
//! - **Prefix compression**: shared key prefixes are stored once
//! - **Per-node locking**: readers and writers take read-write locks one
//!   node at a time; there is no global lock
//! - **Ordered scans**: in-order iteration and prefix scans over unsigned
//!   byte order
//!
//! ## Example
//!
//! ```rust
//! use radixkv::RadixTree;
//!
//! let tree: RadixTree<u64> = RadixTree::new();
//! tree.insert(b"user:1001", 42);
//! tree.insert(b"user:1002", 43);
//!
//! assert_eq!(tree.get(b"user:1001"), Some(Some(42)));
//! assert_eq!(tree.get(b"user:1"), None);
//!
//! for (key, value) in tree.prefix_scan(b"user:") {
//!     println!("{:?} -> {:?}", key, value);
//! }
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod node;
mod tree;

pub use tree::RadixTree;

#[cfg(test)]
mod proptests;
