//! # cidr-trie
//!
//! A memory-efficient path-compressed binary trie (Patricia trie) mapping
//! CIDR prefixes to values, with exact-match and longest-prefix-match lookup
//! for IPv4 and IPv6.
//!
//! ## Example
//!
//! ```rust
//! use cidr_trie::{parse_addr, parse_prefix, Ipv4Trie};
//!
//! let mut trie: Ipv4Trie<&str> = Ipv4Trie::new();
//! trie.insert(parse_prefix("10.0.0.0/8").unwrap(), "A");
//! trie.insert(parse_prefix("10.1.0.0/16").unwrap(), "B");
//!
//! let (prefix, value) = trie.longest_match(&parse_addr("10.1.2.3").unwrap()).unwrap();
//! assert_eq!(prefix.to_string(), "10.1.0.0/16");
//! assert_eq!(*value, "B");
//! ```
//!
//! ## Layout
//!
//! Nodes live in an index arena. Each node stores the full prefix it
//! represents; the bits between a node and its parent form the compressed
//! segment, so no chain of single-child nodes is ever built. A value-less
//! node is always a branch point with two children, which bounds the node
//! count at `2n - 1` for `n` prefixes.

#![deny(unsafe_code)]
#![warn(clippy::all)]

pub mod codec;
pub mod error;
pub mod key;
mod node;
pub mod sync;
pub mod table;
pub mod trie;

pub use codec::{format, parse_addr, parse_prefix};
pub use error::{FormatError, Result};
pub use key::{AddressBits, BitKey, Family};
pub use sync::SharedTrie;
pub use table::{CidrTable, DualStackTable};
pub use trie::{Iter, Matches, PrefixTrie};

/// Trie over 32-bit IPv4 keys.
pub type Ipv4Trie<V> = PrefixTrie<u32, V>;

/// Trie over 128-bit IPv6 keys.
pub type Ipv6Trie<V> = PrefixTrie<u128, V>;

/// Configuration for a trie or table.
#[derive(Debug, Clone, Default)]
pub struct TrieConfig {
    /// Number of prefixes to reserve node space for
    pub initial_capacity: usize,
}

/// Memory usage statistics for a trie.
#[derive(Debug, Clone, Default)]
pub struct MemoryStats {
    /// Bytes reserved by the node arena
    pub node_bytes: usize,
    /// Live nodes, including value-less branch points
    pub nodes: usize,
    /// Vacated arena slots awaiting reuse
    pub free_slots: usize,
    /// Number of stored prefixes
    pub prefixes: usize,
    /// Arena bytes per stored prefix
    pub bytes_per_prefix: f64,
}

#[cfg(test)]
mod proptests;
