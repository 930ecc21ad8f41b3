// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Posting lists: sorted, duplicate-free document ordinals.
//!
//! # INVARIANTS (DO NOT VIOLATE)
//!
//! 1. **POSTING_LIST_SORTED**: ordinals are strictly increasing, within a
//!    block and across blocks
//! 2. **NO_EMPTY_BLOCKS**: every block holds at least one ordinal
//! 3. **NO_DANGLING**: every ordinal refers to a live document of the
//!    snapshot that owns the list (enforced by `IndexSnapshot`, checked by
//!    `verify::check_snapshot`)
//!
//! Ordinals live in `Arc`-shared blocks so a committed snapshot and the
//! writer's working copy share them; a write copies the one block it lands
//! in. New documents always get the highest ordinal so far, which makes
//! `insert` an append to the last block in practice.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::types::DocOrd;

/// Target ordinals per block. Blocks split at twice this.
pub const BLOCK_LEN: usize = 128;

#[derive(Debug, Clone, Default)]
pub struct PostingList {
    blocks: Vec<Arc<Vec<DocOrd>>>,
    len: usize,
}

impl PartialEq for PostingList {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl Eq for PostingList {}

impl PostingList {
    pub fn new() -> Self {
        Self::default()
    }

    /// First block whose last ordinal is `>= ord`.
    fn block_for(&self, ord: DocOrd) -> usize {
        self.blocks
            .partition_point(|block| block.last().is_some_and(|last| *last < ord))
    }

    /// Insert keeping the list sorted. Returns false if already present.
    pub fn insert(&mut self, ord: DocOrd) -> bool {
        let i = self.block_for(ord);
        if i == self.blocks.len() {
            match self.blocks.last_mut() {
                Some(last) if last.len() < BLOCK_LEN => Arc::make_mut(last).push(ord),
                _ => self.blocks.push(Arc::new(vec![ord])),
            }
            self.len += 1;
            return true;
        }
        let pos = match self.blocks[i].binary_search(&ord) {
            Ok(_) => return false,
            Err(pos) => pos,
        };
        let block = Arc::make_mut(&mut self.blocks[i]);
        block.insert(pos, ord);
        if block.len() >= BLOCK_LEN * 2 {
            let tail = block.split_off(BLOCK_LEN);
            self.blocks.insert(i + 1, Arc::new(tail));
        }
        self.len += 1;
        true
    }

    pub fn remove(&mut self, ord: DocOrd) -> bool {
        let i = self.block_for(ord);
        let Some(Ok(pos)) = self.blocks.get(i).map(|block| block.binary_search(&ord)) else {
            return false;
        };
        let block = Arc::make_mut(&mut self.blocks[i]);
        block.remove(pos);
        if block.is_empty() {
            self.blocks.remove(i);
        }
        self.len -= 1;
        true
    }

    #[inline]
    pub fn contains(&self, ord: DocOrd) -> bool {
        self.blocks
            .get(self.block_for(ord))
            .is_some_and(|block| block.binary_search(&ord).is_ok())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Ordinals, ascending.
    pub fn iter(&self) -> impl Iterator<Item = DocOrd> + '_ {
        self.blocks.iter().flat_map(|block| block.iter().copied())
    }

    pub fn to_vec(&self) -> Vec<DocOrd> {
        let mut out = Vec::with_capacity(self.len);
        out.extend(self.iter());
        out
    }

    /// Whether the blocks are correctly ordered and non-empty.
    pub fn is_well_formed(&self) -> bool {
        let mut previous: Option<DocOrd> = None;
        for block in &self.blocks {
            if block.is_empty() {
                return false;
            }
            for ord in block.iter() {
                if previous.is_some_and(|p| p >= *ord) {
                    return false;
                }
                previous = Some(*ord);
            }
        }
        self.iter().count() == self.len
    }

    #[cfg(test)]
    pub(crate) fn shared_blocks(&self, other: &Self) -> usize {
        self.blocks
            .iter()
            .zip(&other.blocks)
            .filter(|(a, b)| Arc::ptr_eq(a, b))
            .count()
    }

    #[cfg(test)]
    pub(crate) fn block_count(&self) -> usize {
        self.blocks.len()
    }
}

impl FromIterator<DocOrd> for PostingList {
    fn from_iter<I: IntoIterator<Item = DocOrd>>(iter: I) -> Self {
        let mut list = PostingList::new();
        for ord in iter {
            list.insert(ord);
        }
        list
    }
}

/// Intersect posting lists, smallest first.
///
/// The smallest list drives; every other list is checked by block lookup
/// and binary search, so the cost is `O(min * k * log max)`.
pub fn intersect_all(mut lists: Vec<&PostingList>) -> Vec<DocOrd> {
    if lists.is_empty() {
        return Vec::new();
    }
    lists.sort_by_key(|l| l.len());
    let (driver, rest) = lists.split_at(1);
    driver[0]
        .iter()
        .filter(|ord| rest.iter().all(|l| l.contains(*ord)))
        .collect()
}

/// Size of the intersection of a posting list with sorted ordinals.
pub fn intersection_len(list: &PostingList, sorted: &[DocOrd]) -> usize {
    if list.len() * 8 < sorted.len() {
        return list
            .iter()
            .filter(|ord| sorted.binary_search(ord).is_ok())
            .count();
    }
    if sorted.len() * 8 < list.len() {
        return sorted.iter().filter(|ord| list.contains(**ord)).count();
    }
    // Comparable sizes: linear merge.
    let mut left = list.iter().peekable();
    let mut right = sorted.iter().copied().peekable();
    let mut n = 0;
    while let (Some(a), Some(b)) = (left.peek(), right.peek()) {
        match a.cmp(b) {
            Ordering::Less => {
                left.next();
            }
            Ordering::Greater => {
                right.next();
            }
            Ordering::Equal => {
                n += 1;
                left.next();
                right.next();
            }
        }
    }
    n
}
