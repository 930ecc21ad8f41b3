// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The search index: a self-contained inverted index over facet fields and
//! full-text terms.
//!
//! ```text
//!   writers ──► Mutex<Working> ──commit──► RwLock<Arc<IndexSnapshot>> ──► readers
//!              (private state)             (published, immutable)
//! ```
//!
//! Writers are serialized on the working state. `commit` clones it into a
//! fresh `Arc` and swaps the published pointer, bumping the generation. The
//! clone shares all storage with the working state; later writes copy only
//! what they touch, so a commit costs far less than the index size.
//! Readers clone the `Arc` and keep it for the whole call, so they never
//! observe a half-applied upsert and never block a writer for longer than
//! the swap.
//!
//! With `auto_commit` (the default) every successful write is published
//! immediately. Without it, writes become visible at the next `commit`.
//!
//! Re-indexing leaves a tombstone behind. Once tombstones outnumber
//! `max(COMPACTION_MIN_TOMBSTONES, live documents)`, commit rebuilds the
//! snapshot without them.

mod cow;
mod postings;
mod reader;
mod snapshot;

pub use postings::{intersect_all, intersection_len, PostingList};
pub use reader::{DocBase, FacetConjunction, FacetCount, IndexReader, ResultNode, ResultSet};
pub use snapshot::{FacetValues, IndexOutcome, IndexSnapshot, IndexStats};

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::binary;
use crate::error::{FormatError, IndexError, QueryError};
use crate::indexer::NodeIndexer;
use crate::types::{ContentNode, IndexedDocument, NodeId};

/// Tombstones tolerated before commit compacts the snapshot.
pub const COMPACTION_MIN_TOMBSTONES: usize = 1024;

/// Index behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexOptions {
    /// Order result sets by document order instead of insertion order.
    pub respect_document_order: bool,
    /// Publish every write immediately.
    pub auto_commit: bool,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            respect_document_order: false,
            auto_commit: true,
        }
    }
}

/// Summary of `index_nodes`.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub indexed: usize,
    pub unchanged: usize,
    pub stale: usize,
    pub failed: Vec<IndexError>,
    /// Generation published at the end of the batch.
    pub generation: u64,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Default)]
struct Working {
    state: IndexSnapshot,
    dirty: bool,
}

pub struct SearchIndex {
    options: IndexOptions,
    writer: Mutex<Working>,
    published: RwLock<Arc<IndexSnapshot>>,
    closed: AtomicBool,
}

impl SearchIndex {
    pub fn new(options: IndexOptions) -> Self {
        Self::from_snapshot(IndexSnapshot::default(), options)
    }

    fn from_snapshot(snapshot: IndexSnapshot, options: IndexOptions) -> Self {
        let published = Arc::new(snapshot.clone());
        Self {
            options,
            writer: Mutex::new(Working {
                state: snapshot,
                dirty: false,
            }),
            published: RwLock::new(published),
            closed: AtomicBool::new(false),
        }
    }

    pub fn options(&self) -> IndexOptions {
        self.options
    }

    /// Insert or replace the document of `doc.node_id`.
    pub fn index(&self, doc: IndexedDocument) -> Result<IndexOutcome, QueryError> {
        self.ensure_open()?;
        let mut working = self.writer.lock();
        let outcome = working.state.upsert(doc)?;
        if outcome.changed() {
            working.dirty = true;
            if self.options.auto_commit {
                self.publish(&mut working);
            }
        }
        Ok(outcome)
    }

    /// Remove a node's document. Returns whether it was indexed.
    pub fn remove(&self, node: &NodeId) -> Result<bool, QueryError> {
        self.ensure_open()?;
        let mut working = self.writer.lock();
        let removed = working.state.remove(node);
        if removed {
            working.dirty = true;
            if self.options.auto_commit {
                self.publish(&mut working);
            }
        }
        Ok(removed)
    }

    /// Build and apply documents for many nodes, committing once at the end.
    ///
    /// Documents are built in parallel; applying them is serialized in input
    /// order. A node that fails to build is reported and skipped.
    pub fn index_nodes(
        &self,
        indexer: &NodeIndexer,
        nodes: &[ContentNode],
    ) -> Result<BatchReport, QueryError> {
        self.ensure_open()?;
        let built = indexer.build_documents(nodes);

        let mut report = BatchReport::default();
        let mut working = self.writer.lock();
        for result in built {
            match result {
                Ok(doc) => match working.state.upsert(doc)? {
                    IndexOutcome::Inserted | IndexOutcome::Replaced => {
                        working.dirty = true;
                        report.indexed += 1;
                    }
                    IndexOutcome::Unchanged => report.unchanged += 1,
                    IndexOutcome::Stale => report.stale += 1,
                },
                Err(e) => report.failed.push(e),
            }
        }
        report.generation = if self.options.auto_commit {
            self.publish(&mut working)
        } else {
            working.state.generation()
        };
        log::info!(
            "indexed {} nodes ({} unchanged, {} stale, {} failed)",
            report.indexed,
            report.unchanged,
            report.stale,
            report.failed.len()
        );
        Ok(report)
    }

    /// Publish pending writes. Returns the committed generation.
    pub fn commit(&self) -> Result<u64, QueryError> {
        self.ensure_open()?;
        let mut working = self.writer.lock();
        Ok(self.publish(&mut working))
    }

    /// A reader pinned to the last committed snapshot.
    pub fn reader(&self) -> Result<IndexReader, QueryError> {
        self.ensure_open()?;
        let snapshot = Arc::clone(&self.published.read());
        Ok(IndexReader::new(snapshot, self.options.respect_document_order))
    }

    /// Generation of the last committed snapshot.
    pub fn generation(&self) -> u64 {
        self.published.read().generation()
    }

    /// Refuse all further calls with `QueryError::Unavailable`.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            log::info!("search index closed at generation {}", self.generation());
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Write the last committed snapshot to `path`.
    pub fn save(&self, path: &Path) -> Result<(), FormatError> {
        let snapshot = Arc::clone(&self.published.read());
        binary::write_file(path, &snapshot)?;
        log::debug!(
            "saved generation {} ({} documents) to {}",
            snapshot.generation(),
            snapshot.len(),
            path.display()
        );
        Ok(())
    }

    /// Load an index previously written by `save`.
    pub fn open(path: &Path, options: IndexOptions) -> Result<Self, FormatError> {
        let snapshot = binary::read_file(path)?;
        log::debug!(
            "opened generation {} ({} documents) from {}",
            snapshot.generation(),
            snapshot.len(),
            path.display()
        );
        Ok(Self::from_snapshot(snapshot, options))
    }

    fn ensure_open(&self) -> Result<(), QueryError> {
        if self.is_closed() {
            Err(QueryError::Unavailable("search index is closed".to_string()))
        } else {
            Ok(())
        }
    }

    fn publish(&self, working: &mut Working) -> u64 {
        if !working.dirty {
            return working.state.generation();
        }
        working.state.generation += 1;
        let tombstones = working.state.tombstones();
        if tombstones > COMPACTION_MIN_TOMBSTONES.max(working.state.len()) {
            log::debug!("compacting {} tombstones", tombstones);
            working.state = working.state.compacted();
        }
        working.dirty = false;

        let generation = working.state.generation();
        *self.published.write() = Arc::new(working.state.clone());
        log::debug!(
            "committed generation {} ({} live documents)",
            generation,
            working.state.len()
        );
        generation
    }
}

impl std::fmt::Debug for SearchIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchIndex")
            .field("options", &self.options)
            .field("generation", &self.generation())
            .field("closed", &self.is_closed())
            .finish()
    }
}
