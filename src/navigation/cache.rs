// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Memoized navigation nodes.
//!
//! Entries are keyed by `(search id, path, index generation)`. The cache
//! only ever holds one generation: the first access at a newer generation
//! drops everything, and lookups from readers pinned to an older generation
//! miss without evicting anything.
//!
//! `clear` also advances an epoch. A caller reads the epoch before it reads
//! the search definition and hands it back on insert, so a node computed
//! from a definition replaced in the meantime is never stored.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use super::NavigationNode;

type Key = (String, String);

#[derive(Debug, Default)]
struct CacheState {
    generation: u64,
    epoch: u64,
    entries: HashMap<Key, Arc<NavigationNode>>,
    /// Insertion order, for FIFO eviction.
    order: VecDeque<Key>,
    hits: u64,
    misses: u64,
}

impl CacheState {
    /// Align with `generation`. Returns false for a stale generation.
    fn advance(&mut self, generation: u64) -> bool {
        if generation > self.generation {
            if !self.entries.is_empty() {
                log::debug!(
                    "navigation cache: dropping {} entries of generation {}",
                    self.entries.len(),
                    self.generation
                );
            }
            self.entries.clear();
            self.order.clear();
            self.generation = generation;
        }
        generation == self.generation
    }
}

/// Hit and miss counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub generation: u64,
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug)]
pub struct NavigationCache {
    state: Mutex<CacheState>,
    capacity: usize,
}

impl NavigationCache {
    /// A cache holding at most `capacity` nodes. Zero disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            capacity,
        }
    }

    pub fn get(&self, search: &str, path: &str, generation: u64) -> Option<Arc<NavigationNode>> {
        let mut state = self.state.lock();
        let found = if state.advance(generation) {
            state
                .entries
                .get(&(search.to_string(), path.to_string()))
                .cloned()
        } else {
            None
        };
        if found.is_some() {
            state.hits += 1;
        } else {
            state.misses += 1;
        }
        found
    }

    /// Current epoch. Read it before the definition the node is built from.
    pub fn epoch(&self) -> u64 {
        self.state.lock().epoch
    }

    /// Store `node` unless the index or the definitions moved on since
    /// `generation` and `epoch` were read.
    pub fn insert(
        &self,
        search: &str,
        path: &str,
        generation: u64,
        epoch: u64,
        node: Arc<NavigationNode>,
    ) {
        if self.capacity == 0 {
            return;
        }
        let mut state = self.state.lock();
        if epoch != state.epoch {
            log::debug!(
                "navigation cache: dropping '{}' node built before a definition change",
                search
            );
            return;
        }
        if !state.advance(generation) {
            return;
        }
        let key = (search.to_string(), path.to_string());
        if state.entries.insert(key.clone(), node).is_none() {
            state.order.push_back(key);
        }
        while state.entries.len() > self.capacity {
            match state.order.pop_front() {
                Some(oldest) => {
                    state.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    /// Drop every entry and refuse inserts prepared before this call.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.order.clear();
        state.epoch += 1;
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            generation: state.generation,
            entries: state.entries.len(),
            hits: state.hits,
            misses: state.misses,
        }
    }
}
