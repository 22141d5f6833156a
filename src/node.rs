//! Trie nodes and the arena that owns them.
//!
//! A node stores the full key it represents. Its compressed segment is the
//! run of bits between its parent's prefix length and its own, so chains of
//! single-child nodes never exist. Children are indexed by the bit at the
//! node's prefix length.

use std::num::NonZeroU32;
use std::ops::{Index, IndexMut};

use crate::key::{AddressBits, BitKey};

// =============================================================================
// Node handle
// =============================================================================

/// Handle to a node slot in a [`NodeArena`].
///
/// Stored as `index + 1` so `Option<NodeId>` stays 4 bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub(crate) struct NodeId(NonZeroU32);

impl NodeId {
    /// # Panics
    /// Panics if the arena grows past `u32::MAX - 1` slots.
    #[inline]
    fn from_index(index: usize) -> Self {
        let raw = u32::try_from(index + 1)
            .ok()
            .and_then(NonZeroU32::new)
            .expect("node arena exceeds u32 slots");
        Self(raw)
    }

    #[inline]
    fn index(self) -> usize {
        self.0.get() as usize - 1
    }
}

// =============================================================================
// Node
// =============================================================================

/// One trie node.
///
/// Terminal when `value` is set. A node without a value is a branch point
/// and has both children once the trie is consistent.
#[derive(Clone)]
pub(crate) struct Node<B, V> {
    pub(crate) key: BitKey<B>,
    pub(crate) children: [Option<NodeId>; 2],
    pub(crate) value: Option<V>,
}

impl<B: AddressBits, V> Node<B, V> {
    #[inline]
    pub(crate) fn new(key: BitKey<B>) -> Self {
        Self {
            key,
            children: [None, None],
            value: None,
        }
    }

    #[inline]
    pub(crate) fn child(&self, bit: usize) -> Option<NodeId> {
        self.children[bit]
    }

    #[inline]
    pub(crate) fn child_count(&self) -> usize {
        self.children.iter().filter(|c| c.is_some()).count()
    }

    /// The remaining child of a node known to have exactly one.
    #[inline]
    pub(crate) fn only_child(&self) -> Option<NodeId> {
        match self.children {
            [Some(c), None] | [None, Some(c)] => Some(c),
            _ => None,
        }
    }
}

// =============================================================================
// Node Arena
// =============================================================================

/// Slot arena for nodes with a free list of vacated slots.
#[derive(Clone)]
pub(crate) struct NodeArena<B, V> {
    nodes: Vec<Node<B, V>>,
    free: Vec<NodeId>,
}

impl<B: AddressBits, V> NodeArena<B, V> {
    pub(crate) fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    pub(crate) fn alloc(&mut self, node: Node<B, V>) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.nodes[id.index()] = node;
            return id;
        }
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Return a slot to the free list. The slot's value must already be taken.
    pub(crate) fn free(&mut self, id: NodeId) {
        let node = &mut self.nodes[id.index()];
        debug_assert!(node.value.is_none(), "freeing a node that still holds a value");
        node.children = [None, None];
        node.value = None;
        self.free.push(id);
    }

    /// Number of slots currently holding a reachable node.
    #[inline]
    pub(crate) fn live(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    #[inline]
    pub(crate) fn free_slots(&self) -> usize {
        self.free.len()
    }

    pub(crate) fn capacity_bytes(&self) -> usize {
        self.nodes.capacity() * std::mem::size_of::<Node<B, V>>()
            + self.free.capacity() * std::mem::size_of::<NodeId>()
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        // Trailing free slots can be dropped without renumbering live nodes.
        while let Some(last) = self.nodes.len().checked_sub(1) {
            let Some(pos) = self.free.iter().position(|id| id.index() == last) else {
                break;
            };
            self.free.swap_remove(pos);
            self.nodes.pop();
        }
        self.nodes.shrink_to_fit();
        self.free.shrink_to_fit();
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
    }
}

impl<B, V> Index<NodeId> for NodeArena<B, V> {
    type Output = Node<B, V>;

    #[inline]
    fn index(&self, id: NodeId) -> &Node<B, V> {
        &self.nodes[id.index()]
    }
}

impl<B, V> IndexMut<NodeId> for NodeArena<B, V> {
    #[inline]
    fn index_mut(&mut self, id: NodeId) -> &mut Node<B, V> {
        &mut self.nodes[id.index()]
    }
}
