// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Node indexer: one content node in, one indexed document out.
//!
//! For every property the qualified name is resolved first, then the facet
//! policy is consulted, then each value goes through `facet_token`, a single
//! exhaustive match over `PropertyValue`. Three outcomes:
//!
//! | Value type                              | Outcome                        |
//! |-----------------------------------------|--------------------------------|
//! | BOOLEAN, DATE, DOUBLE, LONG, STRING     | one stored, untokenized field  |
//! | BINARY, REFERENCE, PATH, NAME           | never a facet, config or not   |
//! | DECIMAL, URI, WEAKREFERENCE             | document build fails           |
//!
//! The last row is a configuration mismatch: a property flagged as a facet
//! that has no encoding. The whole document fails instead of losing the facet.
//!
//! Failures are per node. `build_documents` runs nodes in parallel and
//! returns one `Result` per node so a bad node never takes its batch down.

use std::collections::HashSet;
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{IndexingConfig, NamespaceRegistry, NodeTypeContext};
use crate::error::IndexError;
use crate::sortable::{encode_boolean, encode_date, encode_double, encode_long};
use crate::types::{ContentNode, FacetField, FacetKind, IndexedDocument, PropertyValue};
use crate::utils::collect_terms;

/// Knobs for document building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexerOptions {
    /// Tokenize STRING values and node names into full-text terms.
    pub fulltext: bool,
    /// Mark facet fields for term vector storage.
    pub term_vectors: bool,
}

impl Default for IndexerOptions {
    fn default() -> Self {
        Self {
            fulltext: true,
            term_vectors: false,
        }
    }
}

/// What a single property value contributes to the facet fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FacetToken {
    Field { kind: FacetKind, token: String },
    /// Binary, reference, path and name values are never faceted.
    Never,
    /// No encoding exists for this type.
    Unsupported,
}

/// Map one value to its facet token.
pub fn facet_token(value: &PropertyValue) -> FacetToken {
    match value {
        PropertyValue::Boolean(b) => FacetToken::Field {
            kind: FacetKind::Boolean,
            token: encode_boolean(*b),
        },
        PropertyValue::Date(d) => FacetToken::Field {
            kind: FacetKind::Date,
            token: encode_date(d),
        },
        PropertyValue::Double(v) => FacetToken::Field {
            kind: FacetKind::Double,
            token: encode_double(*v),
        },
        PropertyValue::Long(v) => FacetToken::Field {
            kind: FacetKind::Long,
            token: encode_long(*v),
        },
        PropertyValue::String(s) => FacetToken::Field {
            kind: FacetKind::String,
            token: s.clone(),
        },
        PropertyValue::Binary(_)
        | PropertyValue::Reference(_)
        | PropertyValue::Path(_)
        | PropertyValue::Name(_) => FacetToken::Never,
        PropertyValue::Decimal(_) | PropertyValue::Uri(_) | PropertyValue::WeakReference(_) => {
            FacetToken::Unsupported
        }
    }
}

/// Builds indexed documents against one configuration snapshot.
#[derive(Debug, Clone)]
pub struct NodeIndexer {
    config: Arc<IndexingConfig>,
    namespaces: Arc<NamespaceRegistry>,
    options: IndexerOptions,
}

impl NodeIndexer {
    pub fn new(
        config: Arc<IndexingConfig>,
        namespaces: Arc<NamespaceRegistry>,
        options: IndexerOptions,
    ) -> Self {
        Self {
            config,
            namespaces,
            options,
        }
    }

    pub fn config(&self) -> &IndexingConfig {
        &self.config
    }

    pub fn namespaces(&self) -> &NamespaceRegistry {
        &self.namespaces
    }

    /// Derive the indexed document for the node's current property state.
    pub fn build_document(&self, node: &ContentNode) -> Result<IndexedDocument, IndexError> {
        let context = NodeTypeContext::from(node);
        let mut facets = Vec::new();
        let mut terms = Vec::new();
        let mut seen_terms = HashSet::new();

        if self.options.fulltext {
            collect_terms(node.name(), &mut terms, &mut seen_terms);
        }

        for property in &node.properties {
            let name = self
                .namespaces
                .resolve(&property.name)
                .map_err(|source| IndexError::Namespace {
                    node: node.id.clone(),
                    source,
                })?;
            let is_facet = self.config.is_facet(&context, &name.jcr_name());
            let field_name = name.expanded();

            for value in &property.values {
                if self.options.fulltext {
                    if let PropertyValue::String(text) = value {
                        collect_terms(text, &mut terms, &mut seen_terms);
                    }
                }
                if !is_facet {
                    continue;
                }
                match facet_token(value) {
                    FacetToken::Field { kind, token } => facets.push(FacetField {
                        name: field_name.clone(),
                        value: token,
                        kind,
                        term_vector: self.options.term_vectors,
                    }),
                    FacetToken::Never => {}
                    FacetToken::Unsupported => {
                        return Err(IndexError::UnsupportedFacetType {
                            node: node.id.clone(),
                            property: property.name.clone(),
                            kind: value.property_type(),
                        });
                    }
                }
            }
        }

        Ok(IndexedDocument {
            node_id: node.id.clone(),
            path: node.path.clone(),
            position: node.position.clone(),
            primary_type: node.primary_type.clone(),
            revision: node.revision,
            config_generation: self.config.generation(),
            facets,
            terms,
        })
    }

    /// Build documents for many nodes, in parallel when available.
    ///
    /// Results line up with `nodes`. Failures are logged here with the node id.
    pub fn build_documents(&self, nodes: &[ContentNode]) -> Vec<Result<IndexedDocument, IndexError>> {
        #[cfg(feature = "parallel")]
        let results: Vec<_> = nodes.par_iter().map(|n| self.build_logged(n)).collect();
        #[cfg(not(feature = "parallel"))]
        let results: Vec<_> = nodes.iter().map(|n| self.build_logged(n)).collect();
        results
    }

    fn build_logged(&self, node: &ContentNode) -> Result<IndexedDocument, IndexError> {
        let result = self.build_document(node);
        if let Err(e) = &result {
            log::warn!("indexing failed for node {} ({}): {}", node.id, node.path, e);
        }
        result
    }
}
