//! Text-keyed tables over the typed tries.
//!
//! [`CidrTable`] fixes its family at construction and rejects text of the
//! other family. [`DualStackTable`] keeps one trie per family and routes
//! text by its syntax, so IPv4 and IPv6 prefixes never match each other.

use tracing::{debug, trace};

use crate::codec::{parse_addr, parse_prefix};
use crate::error::{FormatError, Result};
use crate::key::{AddressBits, Family};
use crate::trie::PrefixTrie;
use crate::{MemoryStats, TrieConfig};

fn rejected(input: &str, err: FormatError) -> FormatError {
    debug!(input, error = %err, "rejected prefix text");
    err
}

fn insert_text<B: AddressBits, V>(
    trie: &mut PrefixTrie<B, V>,
    prefix: &str,
    value: V,
) -> Result<Option<V>> {
    let key = parse_prefix::<B>(prefix).map_err(|e| rejected(prefix, e))?;
    trace!(%key, "insert");
    Ok(trie.insert(key, value))
}

fn remove_text<B: AddressBits, V>(trie: &mut PrefixTrie<B, V>, prefix: &str) -> Result<Option<V>> {
    let key = parse_prefix::<B>(prefix).map_err(|e| rejected(prefix, e))?;
    let old = trie.remove(&key);
    trace!(%key, removed = old.is_some(), "delete");
    Ok(old)
}

fn exact_text<'a, B: AddressBits, V>(trie: &'a PrefixTrie<B, V>, prefix: &str) -> Result<Option<&'a V>> {
    let key = parse_prefix::<B>(prefix).map_err(|e| rejected(prefix, e))?;
    Ok(trie.get(&key))
}

fn longest_text<'a, B: AddressBits, V>(
    trie: &'a PrefixTrie<B, V>,
    addr: &str,
) -> Result<Option<(String, &'a V)>> {
    let key = parse_addr::<B>(addr).map_err(|e| rejected(addr, e))?;
    Ok(trie
        .longest_match(&key)
        .map(|(prefix, value)| (prefix.to_string(), value)))
}

// =============================================================================
// CidrTable
// =============================================================================

enum Inner<V> {
    V4(PrefixTrie<u32, V>),
    V6(PrefixTrie<u128, V>),
}

/// Dispatch to the family-specific trie.
macro_rules! with_trie {
    ($inner:expr, $trie:ident => $body:expr) => {
        match $inner {
            Inner::V4($trie) => $body,
            Inner::V6($trie) => $body,
        }
    };
}

/// A prefix table for one address family, keyed by text.
pub struct CidrTable<V> {
    inner: Inner<V>,
}

impl<V> CidrTable<V> {
    pub fn new(family: Family) -> Self {
        Self::with_config(family, TrieConfig::default())
    }

    pub fn with_config(family: Family, config: TrieConfig) -> Self {
        debug!(%family, initial_capacity = config.initial_capacity, "creating prefix table");
        let inner = match family {
            Family::V4 => Inner::V4(PrefixTrie::with_config(config)),
            Family::V6 => Inner::V6(PrefixTrie::with_config(config)),
        };
        Self { inner }
    }

    pub fn family(&self) -> Family {
        match self.inner {
            Inner::V4(_) => Family::V4,
            Inner::V6(_) => Family::V6,
        }
    }

    /// Insert or overwrite `prefix` (`address/len`, or a bare address for a
    /// host prefix). Returns the previous value.
    pub fn insert(&mut self, prefix: &str, value: V) -> Result<Option<V>> {
        with_trie!(&mut self.inner, t => insert_text(t, prefix, value))
    }

    /// Remove `prefix` and return its value.
    pub fn remove(&mut self, prefix: &str) -> Result<Option<V>> {
        with_trie!(&mut self.inner, t => remove_text(t, prefix))
    }

    /// Remove `prefix`; `Ok(true)` if it was present.
    pub fn delete(&mut self, prefix: &str) -> Result<bool> {
        self.remove(prefix).map(|old| old.is_some())
    }

    pub fn exact_match(&self, prefix: &str) -> Result<Option<&V>> {
        with_trie!(&self.inner, t => exact_text(t, prefix))
    }

    /// Most specific stored prefix containing `addr`, in canonical text form.
    pub fn longest_match(&self, addr: &str) -> Result<Option<(String, &V)>> {
        with_trie!(&self.inner, t => longest_text(t, addr))
    }

    pub fn longest_match_prefix(&self, addr: &str) -> Result<Option<String>> {
        Ok(self.longest_match(addr)?.map(|(prefix, _)| prefix))
    }

    /// Number of stored prefixes.
    pub fn size(&self) -> usize {
        with_trie!(&self.inner, t => t.len())
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn clear(&mut self) {
        debug!(family = %self.family(), "clearing prefix table");
        with_trie!(&mut self.inner, t => t.clear())
    }

    pub fn memory_usage(&self) -> MemoryStats {
        with_trie!(&self.inner, t => t.memory_usage())
    }

    pub fn shrink_to_fit(&mut self) {
        with_trie!(&mut self.inner, t => t.shrink_to_fit());
        let stats = self.memory_usage();
        debug!(
            node_bytes = stats.node_bytes,
            nodes = stats.nodes,
            "shrunk prefix table"
        );
    }

    /// All entries as canonical prefix text, in bit order.
    pub fn entries(&self) -> Vec<(String, &V)> {
        with_trie!(&self.inner, t => t.iter().map(|(k, v)| (k.to_string(), v)).collect())
    }
}

// =============================================================================
// DualStackTable
// =============================================================================

/// IPv4 and IPv6 prefixes side by side, one trie per family.
pub struct DualStackTable<V> {
    v4: PrefixTrie<u32, V>,
    v6: PrefixTrie<u128, V>,
}

/// Family implied by the text: IPv6 text always contains a ':'.
fn family_of(text: &str) -> Family {
    if text.contains(':') {
        Family::V6
    } else {
        Family::V4
    }
}

impl<V> DualStackTable<V> {
    pub fn new() -> Self {
        debug!("creating dual-stack prefix table");
        Self {
            v4: PrefixTrie::new(),
            v6: PrefixTrie::new(),
        }
    }

    pub fn ipv4(&self) -> &PrefixTrie<u32, V> {
        &self.v4
    }

    pub fn ipv6(&self) -> &PrefixTrie<u128, V> {
        &self.v6
    }

    pub fn insert(&mut self, prefix: &str, value: V) -> Result<Option<V>> {
        match family_of(prefix) {
            Family::V4 => insert_text(&mut self.v4, prefix, value),
            Family::V6 => insert_text(&mut self.v6, prefix, value),
        }
    }

    pub fn remove(&mut self, prefix: &str) -> Result<Option<V>> {
        match family_of(prefix) {
            Family::V4 => remove_text(&mut self.v4, prefix),
            Family::V6 => remove_text(&mut self.v6, prefix),
        }
    }

    pub fn delete(&mut self, prefix: &str) -> Result<bool> {
        self.remove(prefix).map(|old| old.is_some())
    }

    pub fn exact_match(&self, prefix: &str) -> Result<Option<&V>> {
        match family_of(prefix) {
            Family::V4 => exact_text(&self.v4, prefix),
            Family::V6 => exact_text(&self.v6, prefix),
        }
    }

    pub fn longest_match(&self, addr: &str) -> Result<Option<(String, &V)>> {
        match family_of(addr) {
            Family::V4 => longest_text(&self.v4, addr),
            Family::V6 => longest_text(&self.v6, addr),
        }
    }

    /// Stored prefixes across both families.
    pub fn size(&self) -> usize {
        self.v4.len() + self.v6.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

impl<V> Default for DualStackTable<V> {
    fn default() -> Self {
        Self::new()
    }
}
