//! Reader-writer wrapper for sharing a trie across threads.
//!
//! The trie itself has no interior synchronization. Lookups take a shared
//! read lock and run concurrently; mutations take the write lock.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use smallvec::SmallVec;

use crate::key::{AddressBits, BitKey};
use crate::trie::PrefixTrie;
use crate::TrieConfig;

/// A cloneable handle to a trie shared behind a `parking_lot::RwLock`.
pub struct SharedTrie<B, V> {
    inner: Arc<RwLock<PrefixTrie<B, V>>>,
}

impl<B: AddressBits, V: Clone> SharedTrie<B, V> {
    pub fn new() -> Self {
        Self::from_trie(PrefixTrie::new())
    }

    pub fn with_config(config: TrieConfig) -> Self {
        Self::from_trie(PrefixTrie::with_config(config))
    }

    pub fn from_trie(trie: PrefixTrie<B, V>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(trie)),
        }
    }

    pub fn insert(&self, key: BitKey<B>, value: V) -> Option<V> {
        self.inner.write().insert(key, value)
    }

    /// See [`PrefixTrie::upsert`]. Returns a copy of the stored value.
    pub fn upsert(
        &self,
        key: BitKey<B>,
        on_empty: impl FnOnce() -> V,
        on_update: impl FnOnce(&mut V),
    ) -> V {
        self.inner.write().upsert(key, on_empty, on_update).clone()
    }

    pub fn remove(&self, key: &BitKey<B>) -> Option<V> {
        self.inner.write().remove(key)
    }

    pub fn get(&self, key: &BitKey<B>) -> Option<V> {
        self.inner.read().get(key).cloned()
    }

    pub fn longest_match(&self, key: &BitKey<B>) -> Option<(BitKey<B>, V)> {
        self.inner
            .read()
            .longest_match(key)
            .map(|(prefix, value)| (prefix, value.clone()))
    }

    /// All stored prefixes containing `key`, least specific first.
    pub fn matches(&self, key: BitKey<B>) -> SmallVec<[(BitKey<B>, V); 4]> {
        self.inner
            .read()
            .matches(key)
            .map(|(prefix, value)| (prefix, value.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hold the read lock for a batch of lookups.
    pub fn read(&self) -> RwLockReadGuard<'_, PrefixTrie<B, V>> {
        self.inner.read()
    }

    /// Hold the write lock for a batch of updates.
    pub fn write(&self) -> RwLockWriteGuard<'_, PrefixTrie<B, V>> {
        self.inner.write()
    }
}

impl<B, V> Clone for SharedTrie<B, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: AddressBits, V: Clone> Default for SharedTrie<B, V> {
    fn default() -> Self {
        Self::new()
    }
}
