// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! One consistent state of the index.
//!
//! The writer mutates a private snapshot; `commit` clones it into an `Arc`
//! that readers share. A reader therefore sees either all of a document's
//! fields or none of them, never a mix of old and new.
//!
//! Cloning is cheap: documents, posting lists and the maps over them are
//! copy-on-write containers (see `cow`), so a commit copies pointer tables
//! and the next write copies only the chunks, shards and posting blocks it
//! touches.
//!
//! # Upsert
//!
//! Replacing a node's document first unlinks every posting of the old
//! document (using the old document's own field list), then appends the new
//! document under a fresh ordinal. Facet values that the node no longer has
//! cannot linger, because they are removed from exactly the lists they were
//! added to.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::QueryError;
use crate::types::{DocOrd, FacetKind, IndexedDocument, NodeId};

use super::cow::{ChunkedVec, ShardedMap};
use super::postings::PostingList;

/// What `upsert` did with a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    Inserted,
    Replaced,
    /// Identical to the live document; nothing changed.
    Unchanged,
    /// Older revision than the live document; ignored.
    Stale,
}

impl IndexOutcome {
    pub fn changed(self) -> bool {
        matches!(self, IndexOutcome::Inserted | IndexOutcome::Replaced)
    }
}

#[derive(Debug, Clone)]
struct ValueEntry {
    /// First-seen sequence number within the field.
    seq: u64,
    kind: FacetKind,
    postings: PostingList,
}

/// All values of one facet field, in first-seen order.
///
/// Each value remembers the kind it was first indexed with, so a field that
/// two node types index with different property types still decodes every
/// value correctly.
#[derive(Debug, Clone, Default)]
pub struct FacetValues {
    values: ShardedMap<String, ValueEntry>,
    /// Number of values per kind.
    kinds: Vec<(FacetKind, usize)>,
    next_seq: u64,
    total_postings: usize,
}

impl FacetValues {
    fn add(&mut self, field: &str, value: &str, kind: FacetKind, ord: DocOrd) {
        if !self.values.contains_key(value) {
            self.note_kind(field, kind);
            let seq = self.next_seq;
            self.next_seq += 1;
            self.values.insert(
                value.to_string(),
                ValueEntry {
                    seq,
                    kind,
                    postings: PostingList::new(),
                },
            );
        }
        let Some(entry) = self.values.get_mut(value) else {
            return;
        };
        if entry.kind != kind {
            log::warn!(
                "facet {} value {} indexed as {:?}, already known as {:?}",
                field,
                value,
                kind,
                entry.kind
            );
        }
        if entry.postings.insert(ord) {
            self.total_postings += 1;
        }
    }

    fn note_kind(&mut self, field: &str, kind: FacetKind) {
        match self.kinds.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, n)) => *n += 1,
            None => {
                if let Some((existing, _)) = self.kinds.first() {
                    log::warn!(
                        "facet {} mixes {:?} values with {:?} values",
                        field,
                        kind,
                        existing
                    );
                }
                self.kinds.push((kind, 1));
            }
        }
    }

    fn remove(&mut self, value: &str, ord: DocOrd) {
        let emptied = match self.values.get_mut(value) {
            Some(entry) => {
                if entry.postings.remove(ord) {
                    self.total_postings -= 1;
                }
                entry.postings.is_empty().then_some(entry.kind)
            }
            None => None,
        };
        if let Some(kind) = emptied {
            self.values.remove(value);
            if let Some(i) = self.kinds.iter().position(|(k, _)| *k == kind) {
                self.kinds[i].1 -= 1;
                if self.kinds[i].1 == 0 {
                    self.kinds.remove(i);
                }
            }
        }
    }

    /// `(value, postings)` in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PostingList)> {
        let mut entries: Vec<(&String, &ValueEntry)> = self.values.iter().collect();
        entries.sort_unstable_by_key(|(_, e)| e.seq);
        entries
            .into_iter()
            .map(|(value, e)| (value.as_str(), &e.postings))
    }

    pub fn get(&self, value: &str) -> Option<&PostingList> {
        self.values.get(value).map(|e| &e.postings)
    }

    /// Sort key of `value` in first-seen order.
    pub fn rank(&self, value: &str) -> Option<u64> {
        self.values.get(value).map(|e| e.seq)
    }

    /// The field's kind, when all of its values share one.
    pub fn kind(&self) -> Option<FacetKind> {
        match self.kinds.as_slice() {
            [(kind, _)] => Some(*kind),
            _ => None,
        }
    }

    /// The kind `value` was indexed with.
    pub fn kind_of(&self, value: &str) -> Option<FacetKind> {
        self.values.get(value).map(|e| e.kind)
    }

    pub fn distinct(&self) -> usize {
        self.values.len()
    }

    pub fn total_postings(&self) -> usize {
        self.total_postings
    }

    fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Counters for `inspect` and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub generation: u64,
    pub live_docs: usize,
    pub tombstones: usize,
    pub facet_fields: usize,
    pub distinct_terms: usize,
}

#[derive(Debug, Clone, Default)]
pub struct IndexSnapshot {
    pub(crate) generation: u64,
    docs: ChunkedVec<Option<Arc<IndexedDocument>>>,
    live: ShardedMap<NodeId, DocOrd>,
    all: PostingList,
    facets: HashMap<String, Arc<FacetValues>>,
    terms: ShardedMap<String, PostingList>,
}

impl IndexSnapshot {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn tombstones(&self) -> usize {
        self.docs.len() - self.live.len()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            generation: self.generation,
            live_docs: self.live.len(),
            tombstones: self.tombstones(),
            facet_fields: self.facets.len(),
            distinct_terms: self.terms.len(),
        }
    }

    /// Live ordinals, ascending.
    pub fn all(&self) -> &PostingList {
        &self.all
    }

    pub fn doc(&self, ord: DocOrd) -> Option<&Arc<IndexedDocument>> {
        self.docs.get(ord.as_usize()).and_then(Option::as_ref)
    }

    pub fn ord_of(&self, node: &NodeId) -> Option<DocOrd> {
        self.live.get(node).copied()
    }

    pub fn facet(&self, field: &str) -> Option<&FacetValues> {
        self.facets.get(field).map(Arc::as_ref)
    }

    pub fn facet_names(&self) -> impl Iterator<Item = &str> {
        self.facets.keys().map(String::as_str)
    }

    pub fn term(&self, term: &str) -> Option<&PostingList> {
        self.terms.get(term)
    }

    pub fn terms(&self) -> impl Iterator<Item = (&str, &PostingList)> {
        self.terms.iter().map(|(t, p)| (t.as_str(), p))
    }

    /// Live documents in ordinal (insertion) order.
    pub fn documents(&self) -> impl Iterator<Item = (DocOrd, &Arc<IndexedDocument>)> {
        self.all.iter().filter_map(|ord| self.doc(ord).map(|d| (ord, d)))
    }

    /// Insert or replace the document for `doc.node_id`.
    pub(crate) fn upsert(&mut self, doc: IndexedDocument) -> Result<IndexOutcome, QueryError> {
        let mut outcome = IndexOutcome::Inserted;
        if let Some(ord) = self.ord_of(&doc.node_id) {
            if let Some(existing) = self.doc(ord) {
                if doc.revision < existing.revision {
                    return Ok(IndexOutcome::Stale);
                }
                if **existing == doc {
                    return Ok(IndexOutcome::Unchanged);
                }
            }
            self.unlink(ord);
            outcome = IndexOutcome::Replaced;
        }

        let ord = u32::try_from(self.docs.len())
            .map(DocOrd)
            .map_err(|_| QueryError::Storage("document ordinal space exhausted".to_string()))?;
        self.link(ord, &doc);
        self.live.insert(doc.node_id.clone(), ord);
        self.docs.push(Some(Arc::new(doc)));
        Ok(outcome)
    }

    /// Remove the node's document. Returns false if it was not indexed.
    pub(crate) fn remove(&mut self, node: &NodeId) -> bool {
        match self.ord_of(node) {
            Some(ord) => {
                self.unlink(ord);
                true
            }
            None => false,
        }
    }

    /// Rebuild without tombstones, keeping relative insertion order.
    pub(crate) fn compacted(&self) -> IndexSnapshot {
        let mut fresh = IndexSnapshot {
            generation: self.generation,
            ..IndexSnapshot::default()
        };
        for (_, doc) in self.documents() {
            let ord = DocOrd(fresh.docs.len() as u32);
            fresh.link(ord, doc);
            fresh.live.insert(doc.node_id.clone(), ord);
            fresh.docs.push(Some(Arc::clone(doc)));
        }
        fresh
    }

    /// Chunks, shards and blocks of `before` that `self` no longer shares.
    #[cfg(test)]
    pub(crate) fn copied_pieces(&self, before: &IndexSnapshot) -> usize {
        let mut copied = before.docs.chunk_count() - self.docs.shared_chunks(&before.docs);
        copied += before.live.shard_count() - self.live.shared_shards(&before.live);
        copied += before.terms.shard_count() - self.terms.shared_shards(&before.terms);
        copied += before.all.block_count() - self.all.shared_blocks(&before.all);
        for (name, values) in &before.facets {
            copied += match self.facets.get(name) {
                Some(now) => values.values.shard_count() - now.values.shared_shards(&values.values),
                None => values.values.shard_count(),
            };
        }
        copied
    }

    /// Every chunk, shard and block `copied_pieces` looks at.
    #[cfg(test)]
    pub(crate) fn storage_pieces(&self) -> usize {
        self.docs.chunk_count()
            + self.live.shard_count()
            + self.terms.shard_count()
            + self.all.block_count()
            + self.facets.values().map(|v| v.values.shard_count()).sum::<usize>()
    }

    fn link(&mut self, ord: DocOrd, doc: &IndexedDocument) {
        self.all.insert(ord);
        for field in &doc.facets {
            let values = self.facets.entry(field.name.clone()).or_default();
            Arc::make_mut(values).add(&field.name, &field.value, field.kind, ord);
        }
        for term in &doc.terms {
            self.terms
                .get_or_insert_with(term.clone(), PostingList::new)
                .insert(ord);
        }
    }

    fn unlink(&mut self, ord: DocOrd) {
        let Some(doc) = self.docs.get_mut(ord.as_usize()).and_then(Option::take) else {
            return;
        };
        self.all.remove(ord);
        self.live.remove(&doc.node_id);
        for field in &doc.facets {
            let emptied = match self.facets.get_mut(&field.name) {
                Some(values) => {
                    let values = Arc::make_mut(values);
                    values.remove(&field.value, ord);
                    values.is_empty()
                }
                None => false,
            };
            if emptied {
                self.facets.remove(&field.name);
            }
        }
        for term in &doc.terms {
            let emptied = match self.terms.get_mut(term.as_str()) {
                Some(list) => {
                    list.remove(ord);
                    list.is_empty()
                }
                None => false,
            };
            if emptied {
                self.terms.remove(term.as_str());
            }
        }
    }
}
