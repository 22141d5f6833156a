//! Path-compressed binary trie keyed by CIDR prefix.

#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};

use smallvec::SmallVec;

use crate::key::{AddressBits, BitKey};
use crate::node::{Node, NodeArena, NodeId};
use crate::{MemoryStats, TrieConfig};

/// Where a node hangs: the root slot or a parent's child slot.
#[derive(Clone, Copy)]
enum Link {
    Root,
    Child(NodeId, usize),
}

// =============================================================================
// PrefixTrie
// =============================================================================

/// A map from CIDR prefixes to values with longest-prefix-match lookup.
///
/// Every operation visits at most `B::WIDTH + 1` nodes, independent of the
/// number of stored prefixes. The shape of the trie depends only on the set
/// of stored prefixes, not on the order they were inserted in.
pub struct PrefixTrie<B, V> {
    nodes: NodeArena<B, V>,
    root: Option<NodeId>,
    count: usize,

    /// Node visits since the last `take_visits`.
    #[cfg(test)]
    visits: AtomicUsize,
}

impl<B: AddressBits, V> PrefixTrie<B, V> {
    pub fn new() -> Self {
        Self::with_config(TrieConfig::default())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(TrieConfig {
            initial_capacity: capacity,
        })
    }

    pub fn with_config(config: TrieConfig) -> Self {
        Self {
            // A set of n prefixes needs at most 2n - 1 nodes.
            nodes: NodeArena::with_capacity(config.initial_capacity.saturating_mul(2)),
            root: None,
            count: 0,
            #[cfg(test)]
            visits: AtomicUsize::new(0),
        }
    }

    /// Number of stored prefixes.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of live nodes, including value-less branch points.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.live()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.count = 0;
    }

    pub fn memory_usage(&self) -> MemoryStats {
        let node_bytes = self.nodes.capacity_bytes();
        MemoryStats {
            node_bytes,
            nodes: self.nodes.live(),
            free_slots: self.nodes.free_slots(),
            prefixes: self.count,
            bytes_per_prefix: if self.count > 0 {
                node_bytes as f64 / self.count as f64
            } else {
                0.0
            },
        }
    }

    pub fn shrink_to_fit(&mut self) {
        self.nodes.shrink_to_fit();
    }

    #[inline(always)]
    fn touch(&self) {
        #[cfg(test)]
        self.visits.fetch_add(1, Ordering::Relaxed);
    }

    #[cfg(test)]
    pub(crate) fn take_visits(&self) -> usize {
        self.visits.swap(0, Ordering::Relaxed)
    }

    #[inline]
    fn target(&self, link: Link) -> Option<NodeId> {
        match link {
            Link::Root => self.root,
            Link::Child(parent, bit) => self.nodes[parent].child(bit),
        }
    }

    #[inline]
    fn set_target(&mut self, link: Link, target: Option<NodeId>) {
        match link {
            Link::Root => self.root = target,
            Link::Child(parent, bit) => self.nodes[parent].children[bit] = target,
        }
    }

    /// Node whose key equals `key` exactly, if one exists.
    fn find(&self, key: &BitKey<B>) -> Option<NodeId> {
        let mut current = self.root;
        while let Some(id) = current {
            self.touch();
            let node = &self.nodes[id];
            if !node.key.contains(key) {
                return None;
            }
            if node.key.prefix_len() == key.prefix_len() {
                return Some(id);
            }
            current = node.child(key.bit(node.key.prefix_len()));
        }
        None
    }

    /// Node for `key`, splitting an edge or adding a leaf when absent.
    ///
    /// A newly created node carries no value; the caller must set one.
    fn find_or_create(&mut self, key: BitKey<B>) -> NodeId {
        let mut link = Link::Root;
        loop {
            let Some(id) = self.target(link) else {
                let leaf = self.nodes.alloc(Node::new(key));
                self.set_target(link, Some(leaf));
                return leaf;
            };
            self.touch();

            let node_key = self.nodes[id].key;
            let common = node_key.common_prefix_len(&key);

            if common == node_key.prefix_len() {
                if common == key.prefix_len() {
                    return id;
                }
                link = Link::Child(id, key.bit(common));
                continue;
            }

            // The key leaves this node's segment at `common`.
            if common == key.prefix_len() {
                // Key ends inside the segment: it becomes the parent of the old subtree.
                let mut parent = Node::new(key);
                parent.children[node_key.bit(common)] = Some(id);
                let parent = self.nodes.alloc(parent);
                self.set_target(link, Some(parent));
                return parent;
            }

            // Bits disagree at `common`: fork into a value-less branch.
            let leaf = self.nodes.alloc(Node::new(key));
            let mut branch = Node::new(key.truncate(common));
            branch.children[node_key.bit(common)] = Some(id);
            branch.children[key.bit(common)] = Some(leaf);
            let branch = self.nodes.alloc(branch);
            self.set_target(link, Some(branch));
            return leaf;
        }
    }

    /// Value stored for exactly `key`.
    pub fn get(&self, key: &BitKey<B>) -> Option<&V> {
        self.find(key).and_then(|id| self.nodes[id].value.as_ref())
    }

    pub fn get_mut(&mut self, key: &BitKey<B>) -> Option<&mut V> {
        let id = self.find(key)?;
        self.nodes[id].value.as_mut()
    }

    pub fn contains_key(&self, key: &BitKey<B>) -> bool {
        self.get(key).is_some()
    }

    /// Insert or overwrite the value for `key`, returning the previous value.
    pub fn insert(&mut self, key: BitKey<B>, value: V) -> Option<V> {
        let id = self.find_or_create(key);
        let old = self.nodes[id].value.replace(value);
        if old.is_none() {
            self.count += 1;
        }
        old
    }

    /// Apply `on_update` to the value for `key`, or store `on_empty()` if there
    /// is none.
    pub fn upsert(
        &mut self,
        key: BitKey<B>,
        on_empty: impl FnOnce() -> V,
        on_update: impl FnOnce(&mut V),
    ) -> &mut V {
        let id = self.find_or_create(key);
        let slot = &mut self.nodes[id].value;
        match slot {
            Some(value) => on_update(value),
            None => self.count += 1,
        }
        slot.get_or_insert_with(on_empty)
    }

    /// Remove `key`, returning its value.
    ///
    /// A value-less leaf left behind is freed, and a value-less node left with
    /// a single child is spliced out so the trie stays fully compressed.
    pub fn remove(&mut self, key: &BitKey<B>) -> Option<V> {
        let mut parent_link = Link::Root;
        let mut link = Link::Root;
        let mut current = self.root;

        let id = loop {
            let id = current?;
            self.touch();
            let node = &self.nodes[id];
            if !node.key.contains(key) {
                return None;
            }
            let len = node.key.prefix_len();
            if len == key.prefix_len() {
                break id;
            }
            let bit = key.bit(len);
            parent_link = link;
            link = Link::Child(id, bit);
            current = node.child(bit);
        };

        let old = self.nodes[id].value.take()?;
        self.count -= 1;

        match self.nodes[id].child_count() {
            2 => {}
            1 => {
                let child = self.nodes[id].only_child();
                self.set_target(link, child);
                self.nodes.free(id);
            }
            _ => {
                self.set_target(link, None);
                self.nodes.free(id);
                if let Link::Child(parent, _) = link {
                    let parent_node = &self.nodes[parent];
                    if parent_node.value.is_none() {
                        debug_assert_eq!(parent_node.child_count(), 1);
                        let sibling = parent_node.only_child();
                        self.set_target(parent_link, sibling);
                        self.nodes.free(parent);
                    }
                }
            }
        }

        Some(old)
    }

    /// Remove `key`; true if a value was removed.
    pub fn delete(&mut self, key: &BitKey<B>) -> bool {
        self.remove(key).is_some()
    }

    /// Most specific stored prefix containing `key`, with its value.
    ///
    /// `key` is normally a host key. A shorter key only matches prefixes no
    /// longer than itself.
    pub fn longest_match(&self, key: &BitKey<B>) -> Option<(BitKey<B>, &V)> {
        let mut best = None;
        let mut current = self.root;
        while let Some(id) = current {
            self.touch();
            let node = &self.nodes[id];
            if !node.key.contains(key) {
                break;
            }
            if let Some(value) = node.value.as_ref() {
                best = Some((node.key, value));
            }
            let len = node.key.prefix_len();
            if len == key.prefix_len() {
                break;
            }
            current = node.child(key.bit(len));
        }
        best
    }

    /// [`longest_match`](Self::longest_match) for a single address.
    #[inline]
    pub fn longest_match_addr(&self, bits: B) -> Option<(BitKey<B>, &V)> {
        self.longest_match(&BitKey::host(bits))
    }

    /// The matched prefix only.
    pub fn longest_match_prefix(&self, key: &BitKey<B>) -> Option<BitKey<B>> {
        self.longest_match(key).map(|(prefix, _)| prefix)
    }

    /// All stored prefixes containing `key`, least specific first.
    pub fn matches(&self, key: BitKey<B>) -> Matches<'_, B, V> {
        Matches {
            trie: self,
            key,
            current: self.root,
        }
    }

    /// All entries in bit order, each prefix before its more-specifics.
    pub fn iter(&self) -> Iter<'_, B, V> {
        let mut stack = SmallVec::new();
        if let Some(root) = self.root {
            stack.push(root);
        }
        Iter { trie: self, stack }
    }

    #[cfg(test)]
    pub(crate) fn root_id(&self) -> Option<NodeId> {
        self.root
    }

    #[cfg(test)]
    pub(crate) fn node(&self, id: NodeId) -> &Node<B, V> {
        &self.nodes[id]
    }
}

impl<B: AddressBits, V> Default for PrefixTrie<B, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: AddressBits, V: Clone> Clone for PrefixTrie<B, V> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            root: self.root,
            count: self.count,
            #[cfg(test)]
            visits: AtomicUsize::new(0),
        }
    }
}

impl<B: AddressBits, V: std::fmt::Debug> std::fmt::Debug for PrefixTrie<B, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<B: AddressBits, V> FromIterator<(BitKey<B>, V)> for PrefixTrie<B, V> {
    fn from_iter<I: IntoIterator<Item = (BitKey<B>, V)>>(iter: I) -> Self {
        let mut trie = Self::new();
        trie.extend(iter);
        trie
    }
}

impl<B: AddressBits, V> Extend<(BitKey<B>, V)> for PrefixTrie<B, V> {
    fn extend<I: IntoIterator<Item = (BitKey<B>, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<'a, B: AddressBits, V> IntoIterator for &'a PrefixTrie<B, V> {
    type Item = (BitKey<B>, &'a V);
    type IntoIter = Iter<'a, B, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// =============================================================================
// Iterators
// =============================================================================

/// Stored prefixes along the path to a key. See [`PrefixTrie::matches`].
pub struct Matches<'a, B, V> {
    trie: &'a PrefixTrie<B, V>,
    key: BitKey<B>,
    current: Option<NodeId>,
}

impl<'a, B: AddressBits, V> Iterator for Matches<'a, B, V> {
    type Item = (BitKey<B>, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.current.take() {
            self.trie.touch();
            let node = &self.trie.nodes[id];
            if !node.key.contains(&self.key) {
                return None;
            }
            let len = node.key.prefix_len();
            if len < self.key.prefix_len() {
                self.current = node.child(self.key.bit(len));
            }
            if let Some(value) = node.value.as_ref() {
                return Some((node.key, value));
            }
        }
        None
    }
}

/// Pre-order walk over all entries. See [`PrefixTrie::iter`].
pub struct Iter<'a, B, V> {
    trie: &'a PrefixTrie<B, V>,
    stack: SmallVec<[NodeId; 32]>,
}

impl<'a, B: AddressBits, V> Iterator for Iter<'a, B, V> {
    type Item = (BitKey<B>, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            let node = &self.trie.nodes[id];
            for child in node.children.iter().rev().flatten() {
                self.stack.push(*child);
            }
            if let Some(value) = node.value.as_ref() {
                return Some((node.key, value));
            }
        }
        None
    }
}
