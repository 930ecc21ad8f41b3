// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy.
//!
//! Four families, each with its own propagation rule:
//!
//! | Error             | Raised by              | Handling                                |
//! |-------------------|------------------------|-----------------------------------------|
//! | `ConfigError`     | settings / rules load  | fail closed (not a facet), logged       |
//! | `IndexError`      | document build         | fails one node, logged with its id      |
//! | `QueryError`      | index reads            | surfaced to caller, maybe retryable     |
//! | `NavigationError` | facet navigation       | caller error vs backend error           |
//!
//! `FormatError` covers the on-disk index file and only surfaces from
//! `SearchIndex::save` and `SearchIndex::open`. `BuildError` wraps all of the
//! above for batch runs.

use std::io;
use std::path::PathBuf;

use crate::types::{NodeId, PropertyType};

/// Loading or validating configuration failed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid indexing rule: {0}")]
    InvalidRule(String),

    #[error("invalid facet search definition '{id}': {reason}")]
    InvalidSearch { id: String, reason: String },
}

/// A qualified name could not be resolved against the namespace registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NamespaceError {
    #[error("unknown namespace prefix '{prefix}' in '{name}'")]
    UnknownPrefix { prefix: String, name: String },

    #[error("malformed name '{0}'")]
    Malformed(String),
}

/// Building the document for a single node failed.
///
/// Never affects other nodes: the index commit is per document.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IndexError {
    #[error("node {node}: cannot resolve property name: {source}")]
    Namespace {
        node: NodeId,
        #[source]
        source: NamespaceError,
    },

    #[error("node {node}: property '{property}' of type {kind} is configured as a facet but cannot be faceted")]
    UnsupportedFacetType {
        node: NodeId,
        property: String,
        kind: PropertyType,
    },

    #[error("node {node}: property '{property}' has unknown type '{type_name}'")]
    UnknownPropertyType {
        node: NodeId,
        property: String,
        type_name: String,
    },

    #[error("node {node}: property '{property}' has an invalid {kind} value: {reason}")]
    InvalidValue {
        node: NodeId,
        property: String,
        kind: PropertyType,
        reason: String,
    },
}

impl IndexError {
    pub fn node(&self) -> &NodeId {
        match self {
            IndexError::Namespace { node, .. }
            | IndexError::UnsupportedFacetType { node, .. }
            | IndexError::UnknownPropertyType { node, .. }
            | IndexError::InvalidValue { node, .. } => node,
        }
    }
}

/// A read or write against the search index failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("search index is unavailable: {0}")]
    Unavailable(String),

    #[error("query cancelled after {elapsed_ms} ms")]
    Cancelled { elapsed_ms: u64 },

    #[error("doc-base node {0} is not indexed")]
    UnknownDocBase(NodeId),

    #[error("storage error: {0}")]
    Storage(String),
}

impl QueryError {
    /// Whether the same call may succeed if retried later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            QueryError::Unavailable(_) | QueryError::Cancelled { .. } | QueryError::Storage(_)
        )
    }
}

/// A navigation request could not be answered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("unknown facet search '{0}'")]
    UnknownSearch(String),

    #[error("facet '{facet}' is not part of facet search '{search}'")]
    UnknownFacet { search: String, facet: String },

    #[error("facet '{facet}' at step {position} is out of order, expected '{expected}'")]
    OutOfOrder {
        facet: String,
        position: usize,
        expected: String,
    },

    #[error("malformed navigation path '{path}': {reason}")]
    MalformedPath { path: String, reason: String },

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl NavigationError {
    /// "Bad request" as opposed to "backend unavailable".
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, NavigationError::Query(_))
    }
}

/// The on-disk index file is unreadable or corrupt.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("bad magic bytes")]
    BadMagic,

    #[error("unsupported format version {found} (expected {expected})")]
    UnsupportedVersion { found: u8, expected: u8 },

    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("corrupt index file: {0}")]
    Corrupt(String),
}

/// A batch indexing run (`facetdex index`) could not complete.
///
/// Per-node problems are not build errors; they are reported and skipped.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid node dump {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Format(#[from] FormatError),
}

impl From<FormatError> for QueryError {
    fn from(err: FormatError) -> Self {
        QueryError::Storage(err.to_string())
    }
}
