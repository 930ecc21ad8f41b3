// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Indexing configuration: which properties of which node types are facets.
//!
//! The rules are declarative and resolved per node, not per property name:
//! `title` can be a facet on a news document and plain text on a page. A
//! node is matched against its primary type, then its mixins, then the
//! supertypes of both (breadth first). The first rule that has an opinion
//! about the property decides. No opinion anywhere means "not a facet".
//!
//! # Failure semantics
//!
//! Nothing here ever fails an indexing run. A missing or broken file yields
//! an empty configuration (nothing is a facet) and an `error!` log line.
//! Reloading a broken file keeps the configuration that was already active.
//!
//! # Snapshots
//!
//! `ConfigHandle` hands out `Arc<IndexingConfig>` snapshots. Replacing the
//! configuration swaps the `Arc` and bumps the generation; indexers holding
//! an older snapshot finish with it.

mod namespaces;

pub use namespaces::{NamespaceRegistry, QualifiedName};

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::index::IndexOptions;
use crate::indexer::IndexerOptions;
use crate::navigation::{FacetSearchDefinition, NavigationLimits};
use crate::types::ContentNode;

/// Matches every property of a node type.
pub const ANY_PROPERTY: &str = "*";

// =============================================================================
// RULES
// =============================================================================

/// Facet rule for one node type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingRule {
    pub node_type: String,
    /// Property names indexed as facets, or `*` for all of them.
    #[serde(default)]
    pub facets: Vec<String>,
    /// Property names never indexed as facets. Wins over `facets`.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl IndexingRule {
    /// `Some(decision)` if this rule mentions the property, `None` otherwise.
    fn decide(&self, property: &str) -> Option<bool> {
        if self.exclude.iter().any(|p| p == property) {
            return Some(false);
        }
        if self.facets.iter().any(|p| p == property || p == ANY_PROPERTY) {
            return Some(true);
        }
        None
    }
}

/// Serialized form of an indexing configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingConfigFile {
    #[serde(default)]
    pub rules: Vec<IndexingRule>,
    /// Node type -> direct supertypes.
    #[serde(default)]
    pub supertypes: HashMap<String, Vec<String>>,
}

/// The node-type view of a content node that facet resolution needs.
#[derive(Debug, Clone, Copy)]
pub struct NodeTypeContext<'a> {
    pub primary_type: &'a str,
    pub mixin_types: &'a [String],
}

impl<'a> From<&'a ContentNode> for NodeTypeContext<'a> {
    fn from(node: &'a ContentNode) -> Self {
        Self {
            primary_type: &node.primary_type,
            mixin_types: &node.mixin_types,
        }
    }
}

// =============================================================================
// INDEXING CONFIG
// =============================================================================

/// Immutable facet policy for one configuration generation.
#[derive(Debug, Clone, Default)]
pub struct IndexingConfig {
    rules: HashMap<String, IndexingRule>,
    supertypes: HashMap<String, Vec<String>>,
    generation: u64,
}

impl IndexingConfig {
    /// Configuration under which nothing is a facet.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Validate a parsed file. Duplicate node types are rejected rather than
    /// merged, since the order of two rules for one type is meaningless.
    pub fn from_file(file: IndexingConfigFile) -> Result<Self, ConfigError> {
        let mut rules = HashMap::with_capacity(file.rules.len());
        for rule in file.rules {
            if rule.node_type.trim().is_empty() {
                return Err(ConfigError::InvalidRule(
                    "rule without nodeType".to_string(),
                ));
            }
            if rule.facets.iter().chain(&rule.exclude).any(|p| p.is_empty()) {
                return Err(ConfigError::InvalidRule(format!(
                    "empty property name in rule for '{}'",
                    rule.node_type
                )));
            }
            if rules.contains_key(&rule.node_type) {
                return Err(ConfigError::InvalidRule(format!(
                    "duplicate rule for '{}'",
                    rule.node_type
                )));
            }
            rules.insert(rule.node_type.clone(), rule);
        }
        Ok(Self {
            rules,
            supertypes: file.supertypes,
            generation: 0,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let file: IndexingConfigFile = serde_json::from_str(json)?;
        Self::from_file(file)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Load, or fall back to the empty configuration if anything is wrong.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::error!(
                    "indexing configuration {} unusable, no property will be faceted: {}",
                    path.display(),
                    e
                );
                Self::empty()
            }
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Is `property` (qualified JCR name) a facet on a node of this type?
    ///
    /// Pure and total: unknown types and properties answer `false`.
    pub fn is_facet(&self, node: &NodeTypeContext<'_>, property: &str) -> bool {
        for node_type in self.resolution_order(node) {
            if let Some(decision) = self
                .rules
                .get(node_type)
                .and_then(|rule| rule.decide(property))
            {
                return decision;
            }
        }
        false
    }

    /// Primary type, mixins, then supertypes breadth first, each type once.
    fn resolution_order<'a>(&'a self, node: &NodeTypeContext<'a>) -> Vec<&'a str> {
        let mut order: Vec<&'a str> = Vec::new();
        let mut seen: HashSet<&'a str> = HashSet::new();
        let mut queue: VecDeque<&'a str> = VecDeque::new();

        queue.push_back(node.primary_type);
        queue.extend(node.mixin_types.iter().map(String::as_str));

        while let Some(node_type) = queue.pop_front() {
            if !seen.insert(node_type) {
                continue;
            }
            order.push(node_type);
            if let Some(parents) = self.supertypes.get(node_type) {
                queue.extend(parents.iter().map(String::as_str));
            }
        }
        order
    }
}

// =============================================================================
// HANDLE
// =============================================================================

/// Shared, atomically replaceable configuration.
#[derive(Debug)]
pub struct ConfigHandle {
    current: RwLock<Arc<IndexingConfig>>,
}

impl ConfigHandle {
    pub fn new(config: IndexingConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(config)),
        }
    }

    /// The configuration in force right now. Keep the `Arc` for the whole
    /// unit of work.
    pub fn snapshot(&self) -> Arc<IndexingConfig> {
        Arc::clone(&self.current.read())
    }

    pub fn generation(&self) -> u64 {
        self.current.read().generation
    }

    /// Install a new configuration. Returns its generation.
    pub fn replace(&self, mut config: IndexingConfig) -> u64 {
        let mut current = self.current.write();
        config.generation = current.generation + 1;
        let generation = config.generation;
        *current = Arc::new(config);
        log::info!(
            "indexing configuration generation {} installed; documents built earlier keep their facets until re-indexed",
            generation
        );
        generation
    }

    /// Reload from disk. On failure the active configuration stays in place.
    pub fn reload_from(&self, path: &Path) -> Result<u64, ConfigError> {
        match IndexingConfig::load(path) {
            Ok(config) => Ok(self.replace(config)),
            Err(e) => {
                log::error!(
                    "reloading {} failed, keeping generation {}: {}",
                    path.display(),
                    self.generation(),
                    e
                );
                Err(e)
            }
        }
    }
}

// =============================================================================
// SETTINGS FILE
// =============================================================================

/// Everything the CLI (or an embedding service) configures in one file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub namespaces: NamespaceRegistry,
    #[serde(default)]
    pub indexing: IndexingConfigFile,
    #[serde(default)]
    pub searches: Vec<FacetSearchDefinition>,
    #[serde(default)]
    pub index: IndexOptions,
    #[serde(default)]
    pub indexer: IndexerOptions,
    #[serde(default)]
    pub navigation: NavigationLimits,
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Namespace registry with the builtin prefixes plus the configured ones.
    pub fn namespace_registry(&self) -> NamespaceRegistry {
        let mut registry = NamespaceRegistry::with_builtin();
        for (prefix, uri) in self.namespaces.iter() {
            registry.register(prefix.clone(), uri.clone());
        }
        registry
    }

    /// Build the indexing configuration, failing closed on invalid rules.
    pub fn indexing_config(&self) -> IndexingConfig {
        match IndexingConfig::from_file(self.indexing.clone()) {
            Ok(config) => config,
            Err(e) => {
                log::error!("indexing rules invalid, no property will be faceted: {}", e);
                IndexingConfig::empty()
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut ids = HashSet::new();
        for search in &self.searches {
            search.validate()?;
            if !ids.insert(search.id.as_str()) {
                return Err(ConfigError::InvalidSearch {
                    id: search.id.clone(),
                    reason: "duplicate id".to_string(),
                });
            }
        }
        Ok(())
    }
}
