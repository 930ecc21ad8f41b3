// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The building blocks of a faceted index.
//!
//! Content nodes come in from the repository, indexed documents go out to the
//! search index. Everything in between is a transformation of one into the
//! other, so the shapes here are plain: owned strings, ordered
//! vectors, no lifetimes.
//!
//! # Invariants
//!
//! - **IndexedDocument**: every `FacetField` carries a `FacetKind`, and there
//!   is no `FacetKind` for binary, reference, path or name values. A document
//!   that faceted one of those cannot be built.
//!
//! - **DocOrd**: ordinals are assigned by the index in insertion order and are
//!   never reused within one index lifetime. A re-indexed node gets a fresh
//!   ordinal; the old one becomes a tombstone.
//!
//! - **ContentNode::position**: sibling indexes from the root. Comparing two
//!   positions lexicographically gives depth-first document order.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// NEWTYPES
// =============================================================================

/// Stable identifier of a content node (usually a UUID string).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        NodeId(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        NodeId(id)
    }
}

/// Internal document ordinal inside one index.
///
/// Prevents mixing up a posting entry with a count or an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct DocOrd(pub u32);

impl DocOrd {
    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for DocOrd {
    fn from(ord: u32) -> Self {
        DocOrd(ord)
    }
}

// =============================================================================
// CONTENT MODEL
// =============================================================================

/// Declared type of a repository property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyType {
    Boolean,
    Date,
    Double,
    Long,
    String,
    Binary,
    Reference,
    Path,
    Name,
    Decimal,
    Uri,
    WeakReference,
}

impl PropertyType {
    /// Parse the repository's type name (`"LONG"`, `"WeakReference"`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name.to_ascii_uppercase().as_str() {
            "BOOLEAN" => PropertyType::Boolean,
            "DATE" => PropertyType::Date,
            "DOUBLE" => PropertyType::Double,
            "LONG" => PropertyType::Long,
            "STRING" => PropertyType::String,
            "BINARY" => PropertyType::Binary,
            "REFERENCE" => PropertyType::Reference,
            "PATH" => PropertyType::Path,
            "NAME" => PropertyType::Name,
            "DECIMAL" => PropertyType::Decimal,
            "URI" => PropertyType::Uri,
            "WEAKREFERENCE" | "WEAK_REFERENCE" => PropertyType::WeakReference,
            _ => return None,
        };
        Some(kind)
    }

    pub fn name(self) -> &'static str {
        match self {
            PropertyType::Boolean => "BOOLEAN",
            PropertyType::Date => "DATE",
            PropertyType::Double => "DOUBLE",
            PropertyType::Long => "LONG",
            PropertyType::String => "STRING",
            PropertyType::Binary => "BINARY",
            PropertyType::Reference => "REFERENCE",
            PropertyType::Path => "PATH",
            PropertyType::Name => "NAME",
            PropertyType::Decimal => "DECIMAL",
            PropertyType::Uri => "URI",
            PropertyType::WeakReference => "WEAKREFERENCE",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One typed property value as committed in the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Boolean(bool),
    Date(DateTime<Utc>),
    Double(f64),
    Long(i64),
    String(String),
    Binary(Vec<u8>),
    Reference(String),
    Path(String),
    Name(String),
    /// Arbitrary precision decimal, kept in its lexical form.
    Decimal(String),
    Uri(String),
    WeakReference(String),
}

impl PropertyValue {
    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertyValue::Boolean(_) => PropertyType::Boolean,
            PropertyValue::Date(_) => PropertyType::Date,
            PropertyValue::Double(_) => PropertyType::Double,
            PropertyValue::Long(_) => PropertyType::Long,
            PropertyValue::String(_) => PropertyType::String,
            PropertyValue::Binary(_) => PropertyType::Binary,
            PropertyValue::Reference(_) => PropertyType::Reference,
            PropertyValue::Path(_) => PropertyType::Path,
            PropertyValue::Name(_) => PropertyType::Name,
            PropertyValue::Decimal(_) => PropertyType::Decimal,
            PropertyValue::Uri(_) => PropertyType::Uri,
            PropertyValue::WeakReference(_) => PropertyType::WeakReference,
        }
    }
}

/// A named property with one or more values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Qualified name as written in the repository (`prefix:local` or `local`).
    pub name: String,
    pub multiple: bool,
    pub values: Vec<PropertyValue>,
}

impl Property {
    pub fn single(name: impl Into<String>, value: PropertyValue) -> Self {
        Self {
            name: name.into(),
            multiple: false,
            values: vec![value],
        }
    }

    pub fn multi(name: impl Into<String>, values: Vec<PropertyValue>) -> Self {
        Self {
            name: name.into(),
            multiple: true,
            values,
        }
    }
}

/// Post-commit snapshot of a content node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentNode {
    pub id: NodeId,
    pub primary_type: String,
    #[serde(default)]
    pub mixin_types: Vec<String>,
    pub path: String,
    /// Sibling indexes from the root, used for document order.
    #[serde(default)]
    pub position: Vec<u32>,
    /// Commit sequence of this snapshot. Older revisions never replace newer ones.
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub properties: Vec<Property>,
}

impl ContentNode {
    /// Last path segment, or the empty string for the root.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or("")
    }
}

// =============================================================================
// INDEXED DOCUMENT
// =============================================================================

/// The facet-eligible subset of property types.
///
/// There is no variant for binary, reference, path or name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FacetKind {
    Boolean,
    Date,
    Double,
    Long,
    String,
}

impl FacetKind {
    pub(crate) fn to_byte(self) -> u8 {
        match self {
            FacetKind::Boolean => 0,
            FacetKind::Date => 1,
            FacetKind::Double => 2,
            FacetKind::Long => 3,
            FacetKind::String => 4,
        }
    }

    pub(crate) fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(FacetKind::Boolean),
            1 => Some(FacetKind::Date),
            2 => Some(FacetKind::Double),
            3 => Some(FacetKind::Long),
            4 => Some(FacetKind::String),
            _ => None,
        }
    }
}

/// An un-analyzed, stored, exact-match field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FacetField {
    /// Expanded property name (see `QualifiedName::expanded`).
    pub name: String,
    /// Sortable encoded token.
    pub value: String,
    pub kind: FacetKind,
    /// Whether term vector metadata should be kept for highlighting.
    pub term_vector: bool,
}

/// One indexed document per content node version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedDocument {
    pub node_id: NodeId,
    pub path: String,
    pub position: Vec<u32>,
    pub primary_type: String,
    pub revision: u64,
    /// Generation of the indexing configuration the document was built with.
    pub config_generation: u64,
    pub facets: Vec<FacetField>,
    /// Normalized full-text terms, deduplicated, in first-seen order.
    pub terms: Vec<String>,
}

impl IndexedDocument {
    /// Encoded values of one facet field, in document order.
    pub fn facet_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.facets
            .iter()
            .filter(move |f| f.name == name)
            .map(|f| f.value.as_str())
    }

    pub fn has_facet(&self, name: &str, value: &str) -> bool {
        self.facets.iter().any(|f| f.name == name && f.value == value)
    }

    /// True when `self.path` equals `base` or lies below it.
    pub fn is_under(&self, base: &str) -> bool {
        is_path_under(&self.path, base)
    }
}

/// Depth-first document order: position first, path as tie-breaker.
pub fn document_order(a: &IndexedDocument, b: &IndexedDocument) -> Ordering {
    a.position
        .cmp(&b.position)
        .then_with(|| a.path.cmp(&b.path))
}

/// Subtree test on `/`-separated absolute paths.
pub fn is_path_under(path: &str, base: &str) -> bool {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        return true;
    }
    match path.strip_prefix(base) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
