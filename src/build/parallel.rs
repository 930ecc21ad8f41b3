// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Parallel dump loading and batched indexing.
//!
//! Reading and parsing dump files is embarrassingly parallel, and so is
//! building documents (see `NodeIndexer::build_documents`). Applying them to
//! the index is not: `index_in_batches` feeds the writer one batch at a time
//! and commits after each, so readers see progress during long runs.
//!
//! A file that is not valid JSON stops the run. A node whose properties do
//! not convert is reported and skipped.

use std::fs;
use std::path::{Path, PathBuf};
#[cfg(feature = "parallel")]
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "parallel")]
use indicatif::ProgressBar;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{BuildError, IndexError};
use crate::index::{BatchReport, SearchIndex};
use crate::indexer::NodeIndexer;
use crate::types::ContentNode;

use super::{RawDump, RawNode};

/// Nodes ready for indexing, plus the ones that failed to convert.
#[derive(Debug, Default)]
pub struct LoadedNodes {
    pub nodes: Vec<ContentNode>,
    pub failed: Vec<IndexError>,
}

/// Dump files under `input`: the file itself, or every `*.json` of a
/// directory in name order.
pub fn dump_files(input: &Path) -> Result<Vec<PathBuf>, BuildError> {
    let io_error = |source| BuildError::Io {
        path: input.to_path_buf(),
        source,
    };
    let meta = fs::metadata(input).map_err(io_error)?;
    if !meta.is_dir() {
        return Ok(vec![input.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(input).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn read_dump(path: &Path) -> Result<Vec<RawNode>, BuildError> {
    let content = fs::read_to_string(path).map_err(|source| BuildError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let dump: RawDump = serde_json::from_str(&content).map_err(|source| BuildError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(dump.into_nodes())
}

fn convert_all(raw: Vec<Vec<RawNode>>) -> LoadedNodes {
    let mut loaded = LoadedNodes::default();
    for node in raw.into_iter().flatten() {
        match node.into_content_node() {
            Ok(node) => loaded.nodes.push(node),
            Err(e) => {
                log::warn!("skipping node: {}", e);
                loaded.failed.push(e);
            }
        }
    }
    loaded
}

/// Load every dump file, keeping file order and in-file node order.
pub fn load_nodes(files: &[PathBuf]) -> Result<LoadedNodes, BuildError> {
    #[cfg(feature = "parallel")]
    let raw = files
        .par_iter()
        .map(|path| read_dump(path))
        .collect::<Result<Vec<_>, _>>()?;
    #[cfg(not(feature = "parallel"))]
    let raw = files
        .iter()
        .map(|path| read_dump(path))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(convert_all(raw))
}

/// Load every dump file in parallel with progress reporting.
#[cfg(feature = "parallel")]
pub fn load_nodes_with_progress(
    files: &[PathBuf],
    progress: &ProgressBar,
) -> Result<LoadedNodes, BuildError> {
    let counter = AtomicUsize::new(0);
    let total = files.len();

    let raw = files
        .par_iter()
        .map(|path| {
            let nodes = read_dump(path)?;
            let count = counter.fetch_add(1, Ordering::Relaxed) + 1;
            progress.set_position(count as u64);
            if count % 10 == 0 || count == total {
                progress.set_message(format!("{}/{}", count, total));
            }
            Ok(nodes)
        })
        .collect::<Result<Vec<_>, BuildError>>()?;
    Ok(convert_all(raw))
}

/// Non-parallel fallback (no progress).
#[cfg(not(feature = "parallel"))]
pub fn load_nodes_with_progress(files: &[PathBuf]) -> Result<LoadedNodes, BuildError> {
    load_nodes(files)
}

fn merge(total: &mut BatchReport, batch: BatchReport) {
    total.indexed += batch.indexed;
    total.unchanged += batch.unchanged;
    total.stale += batch.stale;
    total.failed.extend(batch.failed);
    total.generation = batch.generation;
}

/// Index `nodes` in batches of `batch_size`, committing after each batch.
pub fn index_in_batches(
    index: &SearchIndex,
    indexer: &NodeIndexer,
    nodes: &[ContentNode],
    batch_size: usize,
) -> Result<BatchReport, BuildError> {
    let mut report = BatchReport::default();
    for chunk in nodes.chunks(batch_size.max(1)) {
        merge(&mut report, index.index_nodes(indexer, chunk)?);
    }
    report.generation = index.commit()?;
    Ok(report)
}

/// `index_in_batches` with a progress bar advanced per batch.
#[cfg(feature = "parallel")]
pub fn index_in_batches_with_progress(
    index: &SearchIndex,
    indexer: &NodeIndexer,
    nodes: &[ContentNode],
    batch_size: usize,
    progress: &ProgressBar,
) -> Result<BatchReport, BuildError> {
    let mut report = BatchReport::default();
    for chunk in nodes.chunks(batch_size.max(1)) {
        merge(&mut report, index.index_nodes(indexer, chunk)?);
        progress.inc(chunk.len() as u64);
    }
    report.generation = index.commit()?;
    Ok(report)
}
