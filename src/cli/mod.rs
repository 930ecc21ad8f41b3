// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! CLI definitions for the facetdex command-line interface.
//!
//! Four subcommands: `index` builds or updates an index file from node
//! dumps, `inspect` examines one, `query` runs a facet conjunction and/or
//! full-text query against it, and `navigate` walks a facet search.

pub mod display;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "facetdex",
    about = "Faceted node index with exact drill-down counts",
    version
)]
pub struct Cli {
    /// More log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Index JSON node dumps into an index file
    Index {
        /// Settings file (namespaces, indexing rules, searches)
        #[arg(short, long)]
        settings: PathBuf,

        /// Node dump file, or directory of *.json dumps
        #[arg(short, long)]
        input: PathBuf,

        /// Index file to create or update
        #[arg(short, long)]
        output: PathBuf,

        /// Nodes applied per commit
        #[arg(long, default_value_t = facetdex::build::DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// No progress bars
        #[arg(short, long)]
        quiet: bool,
    },

    /// Inspect an index file
    Inspect {
        /// Path to index file
        file: PathBuf,

        /// Values shown per facet field
        #[arg(long, default_value = "5")]
        top: usize,
    },

    /// Query an index file
    Query {
        /// Path to index file
        file: PathBuf,

        /// Settings file, for namespace prefixes and index options
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Facet constraint `name=value` (repeatable, all must match)
        #[arg(short, long = "facet")]
        facets: Vec<String>,

        /// Full-text terms (all must match)
        #[arg(short, long)]
        text: Option<String>,

        /// Only nodes at or below this path
        #[arg(short, long)]
        base: Option<String>,

        /// Maximum number of results to print
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one node of a facet search
    Navigate {
        /// Path to index file
        file: PathBuf,

        /// Settings file defining the facet searches
        #[arg(short, long)]
        settings: PathBuf,

        /// Facet search id
        search: String,

        /// Navigation path, e.g. `demo:type=news/demo:year=2024`
        #[arg(default_value = "")]
        path: String,

        /// Print JSON instead of a tree
        #[arg(long)]
        json: bool,
    },
}
