//! Batch indexing: node dumps in, index file out.
//!
//! This is what `facetdex index` runs. Settings decide the namespaces, the
//! facet rules and the index options; the dumps supply the nodes.

pub mod document;
pub mod parallel;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "parallel")]
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::config::Settings;
use crate::error::{BuildError, IndexError};
use crate::index::{IndexStats, SearchIndex};
use crate::indexer::NodeIndexer;

pub use document::*;
pub use parallel::*;

/// Nodes applied to the index per commit.
pub const DEFAULT_BATCH_SIZE: usize = 512;

/// Outcome of a batch run.
#[derive(Debug)]
pub struct BuildSummary {
    pub files: usize,
    pub indexed: usize,
    pub unchanged: usize,
    pub stale: usize,
    /// Conversion and document-build failures, one per skipped node.
    pub failed: Vec<IndexError>,
    pub stats: IndexStats,
    pub elapsed_ms: u128,
}

/// Create a progress style for the main progress bars
#[cfg(feature = "parallel")]
fn create_progress_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {prefix:<12} [{bar:40.cyan/dim}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━━╸")
}

#[cfg(feature = "parallel")]
fn progress_bar(multi: &MultiProgress, len: usize, prefix: &'static str) -> ProgressBar {
    let bar = multi.add(ProgressBar::new(len as u64));
    bar.set_style(create_progress_style());
    bar.set_prefix(prefix);
    bar
}

/// Index every node found under `input` and write the index to `output`.
///
/// If `output` already holds an index it is opened and updated in place;
/// unchanged nodes are then skipped cheaply.
pub fn run_index(
    settings: &Settings,
    input: &Path,
    output: &Path,
    batch_size: usize,
    show_progress: bool,
) -> Result<BuildSummary, BuildError> {
    let started = Instant::now();
    let files = dump_files(input)?;

    #[cfg(feature = "parallel")]
    let multi = if show_progress {
        MultiProgress::new()
    } else {
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
    };
    #[cfg(not(feature = "parallel"))]
    let _ = show_progress;

    // 1. Load dumps
    #[cfg(feature = "parallel")]
    let loaded = {
        let bar = progress_bar(&multi, files.len(), "Loading");
        let loaded = load_nodes_with_progress(&files, &bar)?;
        bar.finish_with_message(format!("loaded {} nodes", loaded.nodes.len()));
        loaded
    };
    #[cfg(not(feature = "parallel"))]
    let loaded = load_nodes_with_progress(&files)?;

    // 2. Open or create the index
    let index = if output.exists() {
        log::info!("updating existing index {}", output.display());
        SearchIndex::open(output, settings.index)?
    } else {
        SearchIndex::new(settings.index)
    };
    let indexer = NodeIndexer::new(
        Arc::new(settings.indexing_config()),
        Arc::new(settings.namespace_registry()),
        settings.indexer,
    );

    // 3. Index
    #[cfg(feature = "parallel")]
    let report = {
        let bar = progress_bar(&multi, loaded.nodes.len(), "Indexing");
        let report =
            index_in_batches_with_progress(&index, &indexer, &loaded.nodes, batch_size, &bar)?;
        bar.finish_with_message(format!("generation {}", report.generation));
        report
    };
    #[cfg(not(feature = "parallel"))]
    let report = index_in_batches(&index, &indexer, &loaded.nodes, batch_size)?;

    // 4. Write
    index.save(output)?;

    let mut failed = loaded.failed;
    failed.extend(report.failed);
    let stats = index.reader()?.stats();
    Ok(BuildSummary {
        files: files.len(),
        indexed: report.indexed,
        unchanged: report.unchanged,
        stale: report.stale,
        failed,
        stats,
        elapsed_ms: started.elapsed().as_millis(),
    })
}
