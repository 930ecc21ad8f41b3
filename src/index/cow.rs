// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Copy-on-write containers for the index state.
//!
//! The writer's working state and every published snapshot share their
//! storage through `Arc`s. Cloning a container copies only the outer table
//! of pointers; a write goes through `Arc::make_mut` and copies the one
//! chunk or shard it touches, and only while a snapshot still holds it.
//!
//! - `ChunkedVec`: fixed-size chunks, append and update in place.
//! - `ShardedMap`: hash-sharded map whose shard count grows with its length,
//!   keeping both the pointer table and each shard near `sqrt(len)`.

use std::borrow::Borrow;
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

/// Elements per `ChunkedVec` chunk.
pub const CHUNK_LEN: usize = 256;

/// Shard count of an empty `ShardedMap`.
pub const MIN_SHARDS: usize = 16;

// =============================================================================
// CHUNKED VEC
// =============================================================================

#[derive(Debug, Clone)]
pub struct ChunkedVec<T> {
    // Every chunk but the last holds exactly CHUNK_LEN elements.
    chunks: Vec<Arc<Vec<T>>>,
    len: usize,
}

impl<T> Default for ChunkedVec<T> {
    fn default() -> Self {
        Self {
            chunks: Vec::new(),
            len: 0,
        }
    }
}

impl<T: Clone> ChunkedVec<T> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn push(&mut self, value: T) {
        match self.chunks.last_mut() {
            Some(chunk) if chunk.len() < CHUNK_LEN => Arc::make_mut(chunk).push(value),
            _ => {
                let mut chunk = Vec::with_capacity(CHUNK_LEN);
                chunk.push(value);
                self.chunks.push(Arc::new(chunk));
            }
        }
        self.len += 1;
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.chunks.get(index / CHUNK_LEN)?.get(index % CHUNK_LEN)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index >= self.len {
            return None;
        }
        let chunk = self.chunks.get_mut(index / CHUNK_LEN)?;
        Arc::make_mut(chunk).get_mut(index % CHUNK_LEN)
    }

    /// Chunks stored in the same allocation as `other`'s.
    #[cfg(test)]
    pub fn shared_chunks(&self, other: &Self) -> usize {
        self.chunks
            .iter()
            .zip(&other.chunks)
            .filter(|(a, b)| Arc::ptr_eq(a, b))
            .count()
    }

    #[cfg(test)]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

// =============================================================================
// SHARDED MAP
// =============================================================================

#[derive(Debug, Clone)]
pub struct ShardedMap<K, V> {
    shards: Vec<Arc<HashMap<K, V>>>,
    hasher: RandomState,
    len: usize,
}

impl<K, V> Default for ShardedMap<K, V> {
    fn default() -> Self {
        Self {
            shards: (0..MIN_SHARDS).map(|_| Arc::new(HashMap::new())).collect(),
            hasher: RandomState::new(),
            len: 0,
        }
    }
}

impl<K: Hash + Eq + Clone, V: Clone> ShardedMap<K, V> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn shard_of<Q: Hash + ?Sized>(&self, key: &Q) -> usize {
        // Shard count is a power of two.
        (self.hasher.hash_one(key) as usize) & (self.shards.len() - 1)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.shards[self.shard_of(key)].get(key)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Mutable access; copies the key's shard if a snapshot shares it.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let shard = self.shard_of(key);
        if !self.shards[shard].contains_key(key) {
            return None;
        }
        Arc::make_mut(&mut self.shards[shard]).get_mut(key)
    }

    /// The value of `key`, inserting `make()` first if absent.
    pub fn get_or_insert_with(&mut self, key: K, make: impl FnOnce() -> V) -> &mut V {
        if !self.contains_key(&key) {
            self.len += 1;
            self.maybe_grow();
        }
        let shard = self.shard_of(&key);
        Arc::make_mut(&mut self.shards[shard]).entry(key).or_insert_with(make)
    }

    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let shard = self.shard_of(&key);
        let previous = Arc::make_mut(&mut self.shards[shard]).insert(key, value);
        if previous.is_none() {
            self.len += 1;
            self.maybe_grow();
        }
        previous
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let shard = self.shard_of(key);
        if !self.shards[shard].contains_key(key) {
            return None;
        }
        let removed = Arc::make_mut(&mut self.shards[shard]).remove(key);
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.shards.iter().flat_map(|shard| shard.iter())
    }

    /// Double the shard count once shards grow past the shard count.
    fn maybe_grow(&mut self) {
        let count = self.shards.len();
        if self.len <= count * count {
            return;
        }
        let doubled = count * 2;
        let mut shards: Vec<HashMap<K, V>> = (0..doubled).map(|_| HashMap::new()).collect();
        for shard in std::mem::take(&mut self.shards) {
            let shard = Arc::try_unwrap(shard).unwrap_or_else(|shared| (*shared).clone());
            for (key, value) in shard {
                let target = (self.hasher.hash_one(&key) as usize) & (doubled - 1);
                shards[target].insert(key, value);
            }
        }
        self.shards = shards.into_iter().map(Arc::new).collect();
    }

    /// Shards stored in the same allocation as `other`'s.
    #[cfg(test)]
    pub fn shared_shards(&self, other: &Self) -> usize {
        self.shards
            .iter()
            .zip(&other.shards)
            .filter(|(a, b)| Arc::ptr_eq(a, b))
            .count()
    }

    #[cfg(test)]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }
}
