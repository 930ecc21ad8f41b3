// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Read side of the index: exact facet queries, distinct-value counts and
//! full-text lookups against one pinned snapshot.
//!
//! Every method answers from the snapshot the reader was created with, so a
//! navigation call that issues several queries sees one consistent state
//! even while writers commit.
//!
//! # Distinct values
//!
//! `distinct_values` has two strategies with identical results:
//!
//! - **scan**: walk the matching documents and count their values. Cheap
//!   when few documents match.
//! - **intersect**: walk the facet's posting lists and intersect each with
//!   the matching set. Cheap when the facet has few values.
//!
//! The cheaper one is picked from the sizes involved. Either way a document
//! counts at most once per value, and values come out in first-seen order.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;
use crate::error::QueryError;
use crate::types::{document_order, is_path_under, DocOrd, FacetKind, IndexedDocument, NodeId};
use crate::utils::tokenize;

use super::postings::{intersect_all, intersection_len, PostingList};
use super::snapshot::{FacetValues, IndexSnapshot, IndexStats};

// =============================================================================
// QUERY TYPES
// =============================================================================

/// Which content nodes take part in a query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocBase {
    #[default]
    All,
    /// Nodes at or below this path.
    Subtree(String),
    /// Nodes at or below the path of this indexed node.
    Node(NodeId),
}

/// Conjunction of exact `(field, token)` constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FacetConjunction {
    terms: Vec<(String, String)>,
}

impl FacetConjunction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(field, value);
        self
    }

    pub fn push(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.terms.push((field.into(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.terms.iter().map(|(f, v)| (f.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl<F: Into<String>, V: Into<String>> FromIterator<(F, V)> for FacetConjunction {
    fn from_iter<I: IntoIterator<Item = (F, V)>>(iter: I) -> Self {
        let mut conjunction = Self::new();
        for (field, value) in iter {
            conjunction.push(field, value);
        }
        conjunction
    }
}

/// One matching content node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultNode {
    pub node_id: NodeId,
    pub path: String,
}

/// Exact, ordered set of matching nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultSet {
    pub nodes: Vec<ResultNode>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, node: &NodeId) -> bool {
        self.nodes.iter().any(|n| &n.node_id == node)
    }

    pub fn ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.iter().map(|n| &n.node_id)
    }

    /// Stable page of the result set; empty past the end.
    pub fn page(&self, offset: usize, limit: usize) -> &[ResultNode] {
        let start = offset.min(self.nodes.len());
        let end = start.saturating_add(limit).min(self.nodes.len());
        &self.nodes[start..end]
    }
}

/// A facet value and the number of distinct documents carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetCount {
    pub value: String,
    pub count: usize,
}

// =============================================================================
// READER
// =============================================================================

/// Queries against one committed snapshot.
#[derive(Debug, Clone)]
pub struct IndexReader {
    snapshot: Arc<IndexSnapshot>,
    respect_document_order: bool,
}

impl IndexReader {
    pub(crate) fn new(snapshot: Arc<IndexSnapshot>, respect_document_order: bool) -> Self {
        Self {
            snapshot,
            respect_document_order,
        }
    }

    pub fn generation(&self) -> u64 {
        self.snapshot.generation()
    }

    pub fn snapshot(&self) -> &IndexSnapshot {
        &self.snapshot
    }

    pub fn stats(&self) -> IndexStats {
        self.snapshot.stats()
    }

    pub fn document(&self, node: &NodeId) -> Option<Arc<IndexedDocument>> {
        let ord = self.snapshot.ord_of(node)?;
        self.snapshot.doc(ord).cloned()
    }

    /// Kind shared by every value of `field`; `None` if unknown or mixed.
    pub fn facet_kind(&self, field: &str) -> Option<FacetKind> {
        self.snapshot.facet(field).and_then(FacetValues::kind)
    }

    /// Kind `value` was indexed with under `field`.
    pub fn value_kind(&self, field: &str, value: &str) -> Option<FacetKind> {
        self.snapshot.facet(field).and_then(|f| f.kind_of(value))
    }

    /// Documents built with a configuration older than `config_generation`.
    pub fn stale_documents(&self, config_generation: u64) -> Vec<NodeId> {
        self.snapshot
            .documents()
            .filter(|(_, d)| d.config_generation < config_generation)
            .map(|(_, d)| d.node_id.clone())
            .collect()
    }

    /// All nodes matching every constraint, within the doc-base.
    pub fn query(
        &self,
        conjunction: &FacetConjunction,
        base: &DocBase,
        token: &CancellationToken,
    ) -> Result<ResultSet, QueryError> {
        let ords = self.matching(conjunction, base, token)?;
        Ok(self.materialize(ords))
    }

    pub fn count(
        &self,
        conjunction: &FacetConjunction,
        base: &DocBase,
        token: &CancellationToken,
    ) -> Result<usize, QueryError> {
        Ok(self.matching(conjunction, base, token)?.len())
    }

    /// Every value of `field` among matching documents, with its count.
    pub fn distinct_values(
        &self,
        field: &str,
        conjunction: &FacetConjunction,
        base: &DocBase,
        token: &CancellationToken,
    ) -> Result<Vec<FacetCount>, QueryError> {
        let Some(values) = self.snapshot.facet(field) else {
            return Ok(Vec::new());
        };
        let matching = self.matching(conjunction, base, token)?;
        if matching.is_empty() {
            return Ok(Vec::new());
        }
        if matching.len() < values.total_postings() / 2 {
            self.count_by_scan(field, values, &matching, token)
        } else {
            count_by_intersection(values, &matching, token)
        }
    }

    /// Nodes containing every term of `text` (after normalization).
    pub fn search_text(
        &self,
        text: &str,
        base: &DocBase,
        token: &CancellationToken,
    ) -> Result<ResultSet, QueryError> {
        let mut lists: Vec<&PostingList> = Vec::new();
        for term in tokenize(text) {
            match self.snapshot.term(&term) {
                Some(list) => lists.push(list),
                None => return Ok(ResultSet::default()),
            }
        }
        if lists.is_empty() {
            return Ok(ResultSet::default());
        }
        let candidates = intersect_all(lists);
        let ords = self.scope(candidates, base, token)?;
        Ok(self.materialize(ords))
    }

    // -------------------------------------------------------------------------

    /// Matching ordinals, ascending.
    pub(crate) fn matching(
        &self,
        conjunction: &FacetConjunction,
        base: &DocBase,
        token: &CancellationToken,
    ) -> Result<Vec<DocOrd>, QueryError> {
        token.check()?;
        let mut lists: Vec<&PostingList> = Vec::with_capacity(conjunction.len());
        for (field, value) in conjunction.iter() {
            match self.snapshot.facet(field).and_then(|f| f.get(value)) {
                Some(list) => lists.push(list),
                None => return Ok(Vec::new()),
            }
        }
        let candidates = if lists.is_empty() {
            self.snapshot.all().to_vec()
        } else {
            intersect_all(lists)
        };
        self.scope(candidates, base, token)
    }

    fn scope(
        &self,
        candidates: Vec<DocOrd>,
        base: &DocBase,
        token: &CancellationToken,
    ) -> Result<Vec<DocOrd>, QueryError> {
        let root = match base {
            DocBase::All => return Ok(candidates),
            DocBase::Subtree(path) => path.clone(),
            DocBase::Node(id) => match self.document(id) {
                Some(doc) => doc.path.clone(),
                None => return Err(QueryError::UnknownDocBase(id.clone())),
            },
        };
        let mut scoped = Vec::with_capacity(candidates.len());
        for (i, ord) in candidates.into_iter().enumerate() {
            token.check_sparse(i)?;
            if let Some(doc) = self.snapshot.doc(ord) {
                if is_path_under(&doc.path, &root) {
                    scoped.push(ord);
                }
            }
        }
        Ok(scoped)
    }

    fn materialize(&self, ords: Vec<DocOrd>) -> ResultSet {
        let mut docs: Vec<&Arc<IndexedDocument>> =
            ords.iter().filter_map(|ord| self.snapshot.doc(*ord)).collect();
        if self.respect_document_order {
            docs.sort_by(|a, b| document_order(a, b));
        }
        ResultSet {
            nodes: docs
                .into_iter()
                .map(|d| ResultNode {
                    node_id: d.node_id.clone(),
                    path: d.path.clone(),
                })
                .collect(),
        }
    }

    fn count_by_scan(
        &self,
        field: &str,
        values: &FacetValues,
        matching: &[DocOrd],
        token: &CancellationToken,
    ) -> Result<Vec<FacetCount>, QueryError> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut seen: Vec<&str> = Vec::new();
        for (i, ord) in matching.iter().enumerate() {
            token.check_sparse(i)?;
            let Some(doc) = self.snapshot.doc(*ord) else {
                continue;
            };
            seen.clear();
            for value in doc.facet_values(field) {
                if !seen.contains(&value) {
                    seen.push(value);
                    *counts.entry(value).or_insert(0) += 1;
                }
            }
        }
        let mut result: Vec<(u64, FacetCount)> = counts
            .into_iter()
            .map(|(value, count)| {
                let rank = values.rank(value).unwrap_or(u64::MAX);
                (
                    rank,
                    FacetCount {
                        value: value.to_string(),
                        count,
                    },
                )
            })
            .collect();
        result.sort_by_key(|(rank, _)| *rank);
        Ok(result.into_iter().map(|(_, c)| c).collect())
    }
}

fn count_by_intersection(
    values: &FacetValues,
    matching: &[DocOrd],
    token: &CancellationToken,
) -> Result<Vec<FacetCount>, QueryError> {
    let mut result = Vec::new();
    for (i, (value, list)) in values.iter().enumerate() {
        token.check_sparse(i)?;
        let count = intersection_len(list, matching);
        if count > 0 {
            result.push(FacetCount {
                value: value.to_string(),
                count,
            });
        }
    }
    Ok(result)
}
