// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use crate::index::{IndexSnapshot, PostingList};
use crate::types::DocOrd;

/// Error type for invariant violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantError {
    /// Posting list is not strictly ascending.
    UnsortedPostings { list: String, position: usize },
    /// Posting refers to an ordinal with no live document.
    DanglingOrdinal { list: String, ord: u32 },
    /// Live map and document table disagree.
    LiveMismatch { node: String, ord: u32 },
    /// Number of live ordinals differs from the number of live nodes.
    LiveCount { postings: usize, nodes: usize },
    /// A posting exists for a value the document does not carry.
    SpuriousPosting { field: String, value: String, ord: u32 },
    /// A document carries a value with no posting for it.
    MissingPosting { field: String, value: String, ord: u32 },
    /// A facet field reports a wrong total posting count.
    PostingTotal {
        field: String,
        claimed: usize,
        actual: usize,
    },
    /// A facet value or term is kept with an empty posting list.
    EmptyPostings { list: String },
    /// Posting blocks are empty or disagree with the list length.
    MalformedBlocks { list: String },
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantError::UnsortedPostings { list, position } => {
                write!(f, "postings of {} not ascending at {}", list, position)
            }
            InvariantError::DanglingOrdinal { list, ord } => {
                write!(f, "postings of {} reference dead ordinal {}", list, ord)
            }
            InvariantError::LiveMismatch { node, ord } => {
                write!(f, "node {} maps to ordinal {} holding another document", node, ord)
            }
            InvariantError::LiveCount { postings, nodes } => {
                write!(f, "{} live ordinals but {} live nodes", postings, nodes)
            }
            InvariantError::SpuriousPosting { field, value, ord } => {
                write!(f, "ordinal {} posted under {}={} without the value", ord, field, value)
            }
            InvariantError::MissingPosting { field, value, ord } => {
                write!(f, "ordinal {} carries {}={} but is not posted", ord, field, value)
            }
            InvariantError::PostingTotal {
                field,
                claimed,
                actual,
            } => {
                write!(f, "{} claims {} postings, has {}", field, claimed, actual)
            }
            InvariantError::EmptyPostings { list } => write!(f, "{} has no postings", list),
            InvariantError::MalformedBlocks { list } => {
                write!(f, "posting blocks of {} are malformed", list)
            }
        }
    }
}

impl std::error::Error for InvariantError {}

fn check_postings(
    snapshot: &IndexSnapshot,
    list: &PostingList,
    name: impl Fn() -> String,
) -> Result<(), InvariantError> {
    let ords = list.to_vec();
    if ords.is_empty() {
        return Err(InvariantError::EmptyPostings { list: name() });
    }
    if let Some(position) = ords.windows(2).position(|w| w[0] >= w[1]) {
        return Err(InvariantError::UnsortedPostings {
            list: name(),
            position: position + 1,
        });
    }
    if let Some(ord) = ords.iter().find(|ord| snapshot.doc(**ord).is_none()) {
        return Err(InvariantError::DanglingOrdinal {
            list: name(),
            ord: ord.get(),
        });
    }
    if !list.is_well_formed() {
        return Err(InvariantError::MalformedBlocks { list: name() });
    }
    Ok(())
}

/// Check that documents, facet postings and term postings agree.
pub fn check_snapshot(snapshot: &IndexSnapshot) -> Result<(), InvariantError> {
    let all = snapshot.all();
    if !all.is_empty() {
        check_postings(snapshot, all, || "<all>".to_string())?;
    }
    if all.len() != snapshot.len() {
        return Err(InvariantError::LiveCount {
            postings: all.len(),
            nodes: snapshot.len(),
        });
    }
    for (ord, doc) in snapshot.documents() {
        if snapshot.ord_of(&doc.node_id) != Some(ord) {
            return Err(InvariantError::LiveMismatch {
                node: doc.node_id.to_string(),
                ord: ord.get(),
            });
        }
    }

    // Postings to documents.
    for field in snapshot.facet_names() {
        let Some(values) = snapshot.facet(field) else {
            continue;
        };
        let mut actual = 0;
        for (value, list) in values.iter() {
            check_postings(snapshot, list, || format!("{}={}", field, value))?;
            for ord in list.iter() {
                let carries = snapshot
                    .doc(ord)
                    .is_some_and(|doc| doc.has_facet(field, value));
                if !carries {
                    return Err(InvariantError::SpuriousPosting {
                        field: field.to_string(),
                        value: value.to_string(),
                        ord: ord.get(),
                    });
                }
            }
            actual += list.len();
        }
        if actual != values.total_postings() {
            return Err(InvariantError::PostingTotal {
                field: field.to_string(),
                claimed: values.total_postings(),
                actual,
            });
        }
    }
    for (term, list) in snapshot.terms() {
        check_postings(snapshot, list, || format!("term '{}'", term))?;
        for ord in list.iter() {
            let carries = snapshot
                .doc(ord)
                .is_some_and(|doc| doc.terms.iter().any(|t| t == term));
            if !carries {
                return Err(InvariantError::SpuriousPosting {
                    field: "<text>".to_string(),
                    value: term.to_string(),
                    ord: ord.get(),
                });
            }
        }
    }

    // Documents to postings.
    for (ord, doc) in snapshot.documents() {
        for facet in &doc.facets {
            let posted = snapshot
                .facet(&facet.name)
                .and_then(|values| values.get(&facet.value))
                .is_some_and(|list| list.contains(ord));
            if !posted {
                return Err(missing(&facet.name, &facet.value, ord));
            }
        }
        for term in &doc.terms {
            if !snapshot.term(term).is_some_and(|list| list.contains(ord)) {
                return Err(missing("<text>", term, ord));
            }
        }
    }
    Ok(())
}

fn missing(field: &str, value: &str, ord: DocOrd) -> InvariantError {
    InvariantError::MissingPosting {
        field: field.to_string(),
        value: value.to_string(),
        ord: ord.get(),
    }
}
