//! Test utilities shared across unit and integration tests.
//!
//! This module is always compiled but hidden from documentation.
//! It provides canonical implementations of test helpers to avoid duplication.

#![doc(hidden)]

use std::error::Error;
use std::sync::Arc;

use crate::config::{IndexingConfig, IndexingConfigFile, IndexingRule, NamespaceRegistry};
use crate::error::ConfigError;
use crate::indexer::{IndexerOptions, NodeIndexer};
use crate::types::{
    ContentNode, FacetField, FacetKind, IndexedDocument, NodeId, Property, PropertyValue,
};

/// Create a test document with STRING facets, stored under `/content/{id}`.
///
/// The id doubles as the document's only full-text term.
pub fn make_doc(id: &str, revision: u64, facets: &[(&str, &str)]) -> IndexedDocument {
    make_doc_at(id, &format!("/content/{}", id), vec![0], revision, facets)
}

/// Create a test document at an explicit path and document position.
pub fn make_doc_at(
    id: &str,
    path: &str,
    position: Vec<u32>,
    revision: u64,
    facets: &[(&str, &str)],
) -> IndexedDocument {
    IndexedDocument {
        node_id: NodeId::from(id),
        path: path.to_string(),
        position,
        primary_type: "demo:doc".into(),
        revision,
        config_generation: 0,
        facets: facets
            .iter()
            .map(|(name, value)| FacetField {
                name: name.to_string(),
                value: value.to_string(),
                kind: FacetKind::String,
                term_vector: false,
            })
            .collect(),
        terms: vec![id.to_lowercase()],
    }
}

/// Create a `demo:doc` content node with the given properties.
pub fn make_node(id: &str, path: &str, properties: Vec<Property>) -> ContentNode {
    ContentNode {
        id: NodeId::from(id),
        primary_type: "demo:doc".into(),
        mixin_types: Vec::new(),
        path: path.to_string(),
        position: Vec::new(),
        revision: 1,
        properties,
    }
}

/// SplitMix64: small, seeded, good enough to spread test data.
#[derive(Debug, Clone)]
pub struct SplitMix {
    state: u64,
}

impl SplitMix {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    /// Uniform-ish value in `0..n`.
    pub fn below(&mut self, n: u64) -> u64 {
        self.next_u64() % n.max(1)
    }
}

/// Facets of the generated scenario, in navigation order.
pub const SCENARIO_FACETS: [&str; 3] = ["x", "y", "z"];

/// Ground truth for one generated node.
///
/// `values[i]` is the LONG value of `SCENARIO_FACETS[i]`: 1 or 2, or 0 when
/// the node lacks the property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioNode {
    pub id: String,
    pub path: String,
    pub position: Vec<u32>,
    pub revision: u64,
    pub values: [u8; 3],
}

impl ScenarioNode {
    /// Value of `facet`, 0 if absent or not a scenario facet.
    pub fn value(&self, facet: &str) -> u8 {
        SCENARIO_FACETS
            .iter()
            .position(|f| *f == facet)
            .map_or(0, |i| self.values[i])
    }

    pub fn to_content_node(&self) -> ContentNode {
        let properties = SCENARIO_FACETS
            .iter()
            .zip(self.values)
            .filter(|(_, value)| *value != 0)
            .map(|(facet, value)| Property::single(*facet, PropertyValue::Long(i64::from(value))))
            .collect();
        let mut node = make_node(&self.id, &self.path, properties);
        node.position = self.position.clone();
        node.revision = self.revision;
        node
    }
}

/// FNV-1a, so each id seeds its own generator.
fn id_seed(id: &str) -> u64 {
    id.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

/// `count` nodes whose `x`, `y` and `z` are drawn from `{0, 1, 2}`.
///
/// Every node's values depend only on `seed` and its own id. Nodes live
/// under `/content/even` or `/content/odd` by index parity.
pub fn scenario(count: usize, seed: u64) -> Vec<ScenarioNode> {
    (0..count)
        .map(|i| {
            let id = format!("n{:04}", i);
            let mut rng = SplitMix::new(seed ^ id_seed(&id));
            let values = [rng.below(3) as u8, rng.below(3) as u8, rng.below(3) as u8];
            let parity = if i % 2 == 0 { "even" } else { "odd" };
            ScenarioNode {
                path: format!("/content/{}/{}", parity, id),
                position: vec![(i % 2) as u32, i as u32],
                revision: 1,
                values,
                id,
            }
        })
        .collect()
}

/// Indexer that facets `x`, `y` and `z` on `demo:doc` nodes.
pub fn scenario_indexer() -> Result<NodeIndexer, ConfigError> {
    let config = IndexingConfig::from_file(IndexingConfigFile {
        rules: vec![IndexingRule {
            node_type: "demo:doc".into(),
            facets: SCENARIO_FACETS.iter().map(|f| f.to_string()).collect(),
            exclude: Vec::new(),
        }],
        ..IndexingConfigFile::default()
    })?;
    Ok(NodeIndexer::new(
        Arc::new(config),
        Arc::new(NamespaceRegistry::with_builtin()),
        IndexerOptions::default(),
    ))
}

/// The scenario's documents, built by `scenario_indexer`.
pub fn scenario_docs(count: usize, seed: u64) -> Result<Vec<IndexedDocument>, Box<dyn Error>> {
    let indexer = scenario_indexer()?;
    let docs = scenario(count, seed)
        .iter()
        .map(|node| indexer.build_document(&node.to_content_node()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(docs)
}

/// Ground-truth count of nodes with every `(facet, value)`.
pub fn scenario_count(nodes: &[ScenarioNode], constraints: &[(&str, u8)]) -> usize {
    nodes
        .iter()
        .filter(|node| constraints.iter().all(|(f, v)| node.value(f) == *v))
        .count()
}

/// Brute-force count of documents carrying every `(field, value)` pair.
pub fn brute_count(docs: &[IndexedDocument], constraints: &[(&str, &str)]) -> usize {
    docs.iter()
        .filter(|doc| constraints.iter().all(|(f, v)| doc.has_facet(f, v)))
        .count()
}
