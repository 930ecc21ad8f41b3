// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Faceted navigation: a virtual tree over the index.
//!
//! A facet search definition names an ordered list of facets and a
//! doc-base. The tree it describes is never stored. Each level assigns a
//! value to the next facet:
//!
//! ```text
//!   /                       count = all nodes in the doc-base
//!   ├── x=a                 count = nodes with x=a
//!   │   ├── x=a/y=1         count = nodes with x=a and y=1
//!   │   └── x=a/y=2
//!   └── x=b
//!       └── ...             (leaf once every facet is assigned)
//! ```
//!
//! Every answer is a pure function of `(search, path, reader)`. Two calls
//! against the same committed generation give the same answer, which is
//! what makes `NavigationCache` sound.
//!
//! # Counting rules
//!
//! - A node is counted once per navigation node, however many values it has.
//! - A multi-valued node appears under each of its values.
//! - Nodes without the next facet appear under no child, so children need not
//!   sum to their parent.

mod cache;
mod path;

pub use cache::{CacheStats, NavigationCache};
pub use path::NavPath;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;
use crate::config::{NamespaceRegistry, Settings};
use crate::error::{ConfigError, NavigationError};
use crate::index::{DocBase, FacetConjunction, IndexReader, ResultSet, SearchIndex};
use crate::sortable;

// =============================================================================
// DEFINITIONS
// =============================================================================

/// How children of a navigation node are ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChildOrder {
    /// Order in which the index first saw each value.
    #[default]
    FirstSeen,
    /// Ascending by encoded token, which is numeric/temporal order.
    Value,
    /// Most documents first; ties keep first-seen order.
    CountDescending,
}

/// A named, ordered list of facets over a doc-base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetSearchDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub doc_base: DocBase,
    /// Qualified property names, in navigation order.
    pub facets: Vec<String>,
    #[serde(default)]
    pub child_order: ChildOrder,
    /// Keep at most this many children per node.
    #[serde(default)]
    pub child_limit: Option<usize>,
}

impl FacetSearchDefinition {
    pub fn new(id: impl Into<String>, facets: Vec<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            doc_base: DocBase::All,
            facets,
            child_order: ChildOrder::FirstSeen,
            child_limit: None,
        }
    }

    pub fn with_doc_base(mut self, doc_base: DocBase) -> Self {
        self.doc_base = doc_base;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidSearch {
            id: self.id.clone(),
            reason: reason.to_string(),
        };
        if self.id.is_empty() {
            return Err(invalid("empty id"));
        }
        let mut seen = HashSet::new();
        for facet in &self.facets {
            if facet.is_empty() {
                return Err(invalid("empty facet name"));
            }
            if !seen.insert(facet.as_str()) {
                return Err(invalid(&format!("facet '{}' listed twice", facet)));
            }
        }
        if self.child_limit == Some(0) {
            return Err(invalid("childLimit must be positive"));
        }
        Ok(())
    }
}

/// A definition with its facet names resolved to index field keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetSearch {
    definition: FacetSearchDefinition,
    fields: Vec<String>,
}

impl FacetSearch {
    pub fn resolve(
        definition: FacetSearchDefinition,
        namespaces: &NamespaceRegistry,
    ) -> Result<Self, ConfigError> {
        definition.validate()?;
        let fields = definition
            .facets
            .iter()
            .map(|facet| {
                namespaces
                    .resolve(facet)
                    .map(|name| name.expanded())
                    .map_err(|e| ConfigError::InvalidSearch {
                        id: definition.id.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { definition, fields })
    }

    pub fn definition(&self) -> &FacetSearchDefinition {
        &self.definition
    }

    pub fn id(&self) -> &str {
        &self.definition.id
    }

    /// Index field key of the facet at `depth`.
    pub fn field(&self, depth: usize) -> Option<&str> {
        self.fields.get(depth).map(String::as_str)
    }

    pub fn depth(&self) -> usize {
        self.fields.len()
    }

    /// Check `path` against the facet order and translate it to a query.
    pub fn conjunction(&self, path: &NavPath) -> Result<FacetConjunction, NavigationError> {
        let facets = &self.definition.facets;
        if path.len() > facets.len() {
            return Err(NavigationError::MalformedPath {
                path: path.to_string(),
                reason: format!(
                    "{} steps but search '{}' has {} facets",
                    path.len(),
                    self.id(),
                    facets.len()
                ),
            });
        }
        let mut conjunction = FacetConjunction::new();
        for (position, (facet, value)) in path.steps().enumerate() {
            if facets[position] != facet {
                if !facets.iter().any(|f| f == facet) {
                    return Err(NavigationError::UnknownFacet {
                        search: self.id().to_string(),
                        facet: facet.to_string(),
                    });
                }
                return Err(NavigationError::OutOfOrder {
                    facet: facet.to_string(),
                    position,
                    expected: facets[position].clone(),
                });
            }
            conjunction.push(self.fields[position].clone(), value);
        }
        Ok(conjunction)
    }
}

// =============================================================================
// RESULTS
// =============================================================================

/// Time budget per navigation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NavigationLimits {
    /// Milliseconds per call; 0 disables the timeout.
    pub timeout_ms: u64,
    /// Navigation nodes kept by the cache; 0 disables caching.
    pub cache_capacity: usize,
}

impl Default for NavigationLimits {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            cache_capacity: 1_024,
        }
    }
}

impl NavigationLimits {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    pub fn token(&self) -> CancellationToken {
        match self.timeout() {
            Some(timeout) => CancellationToken::with_timeout(timeout),
            None => CancellationToken::new(),
        }
    }
}

/// One value of the next facet below a navigation node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetChild {
    pub facet: String,
    /// Encoded token, as it appears in paths.
    pub value: String,
    /// Human readable form of `value`.
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expansion {
    /// Every facet is assigned: the matching nodes themselves.
    Leaf(ResultSet),
    Children(Vec<FacetChild>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationNode {
    pub search: String,
    pub path: String,
    pub count: usize,
    pub next_facet: Option<String>,
    pub children: Vec<FacetChild>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_set: Option<ResultSet>,
}

impl NavigationNode {
    pub fn is_leaf(&self) -> bool {
        self.next_facet.is_none()
    }
}

// =============================================================================
// PURE OPERATIONS
// =============================================================================

/// Number of nodes in the doc-base matching every assignment of `path`.
pub fn count(
    search: &FacetSearch,
    path: &NavPath,
    reader: &IndexReader,
    token: &CancellationToken,
) -> Result<usize, NavigationError> {
    let conjunction = search.conjunction(path)?;
    Ok(reader.count(&conjunction, &search.definition.doc_base, token)?)
}

/// The matching nodes themselves, at any depth.
pub fn result_set(
    search: &FacetSearch,
    path: &NavPath,
    reader: &IndexReader,
    token: &CancellationToken,
) -> Result<ResultSet, NavigationError> {
    let conjunction = search.conjunction(path)?;
    Ok(reader.query(&conjunction, &search.definition.doc_base, token)?)
}

/// Children of `path`, or the result set once every facet is assigned.
pub fn expand(
    search: &FacetSearch,
    path: &NavPath,
    reader: &IndexReader,
    token: &CancellationToken,
) -> Result<Expansion, NavigationError> {
    let conjunction = search.conjunction(path)?;
    let base = &search.definition.doc_base;
    match search.field(path.len()) {
        None => Ok(Expansion::Leaf(reader.query(&conjunction, base, token)?)),
        Some(field) => {
            let facet = &search.definition.facets[path.len()];
            let counts = reader.distinct_values(field, &conjunction, base, token)?;
            let mut children: Vec<FacetChild> = counts
                .into_iter()
                .map(|c| FacetChild {
                    facet: facet.clone(),
                    label: match reader.value_kind(field, &c.value) {
                        Some(kind) => sortable::label(kind, &c.value),
                        None => c.value.clone(),
                    },
                    value: c.value,
                    count: c.count,
                })
                .collect();
            order_children(&mut children, search.definition.child_order);
            if let Some(limit) = search.definition.child_limit {
                children.truncate(limit);
            }
            Ok(Expansion::Children(children))
        }
    }
}

/// Everything about one navigation node in a single answer.
pub fn node(
    search: &FacetSearch,
    path: &NavPath,
    reader: &IndexReader,
    token: &CancellationToken,
) -> Result<NavigationNode, NavigationError> {
    let count = count(search, path, reader, token)?;
    let next_facet = search.definition.facets.get(path.len()).cloned();
    let (children, result_set) = match expand(search, path, reader, token)? {
        Expansion::Leaf(results) => (Vec::new(), Some(results)),
        Expansion::Children(children) => (children, None),
    };
    Ok(NavigationNode {
        search: search.id().to_string(),
        path: path.to_string(),
        count,
        next_facet,
        children,
        result_set,
    })
}

fn order_children(children: &mut [FacetChild], order: ChildOrder) {
    match order {
        ChildOrder::FirstSeen => {}
        ChildOrder::Value => children.sort_by(|a, b| a.value.cmp(&b.value)),
        ChildOrder::CountDescending => children.sort_by(|a, b| b.count.cmp(&a.count)),
    }
}

// =============================================================================
// SERVICE
// =============================================================================

/// Registry of facet searches over one shared index, with caching and a
/// per-call time budget.
#[derive(Debug)]
pub struct FacetedNavigation {
    index: Arc<SearchIndex>,
    namespaces: Arc<NamespaceRegistry>,
    searches: RwLock<HashMap<String, Arc<FacetSearch>>>,
    cache: NavigationCache,
    limits: NavigationLimits,
}

impl FacetedNavigation {
    pub fn new(
        index: Arc<SearchIndex>,
        namespaces: Arc<NamespaceRegistry>,
        limits: NavigationLimits,
    ) -> Self {
        Self {
            index,
            namespaces,
            searches: RwLock::new(HashMap::new()),
            cache: NavigationCache::new(limits.cache_capacity),
            limits,
        }
    }

    /// Service with every search of `settings` registered.
    pub fn from_settings(settings: &Settings, index: Arc<SearchIndex>) -> Result<Self, ConfigError> {
        let navigation = Self::new(
            index,
            Arc::new(settings.namespace_registry()),
            settings.navigation,
        );
        for definition in &settings.searches {
            navigation.register(definition.clone())?;
        }
        Ok(navigation)
    }

    /// Add or replace a facet search definition.
    pub fn register(&self, definition: FacetSearchDefinition) -> Result<(), ConfigError> {
        let search = FacetSearch::resolve(definition, &self.namespaces)?;
        let id = search.id().to_string();
        log::debug!("registered facet search '{}' ({} facets)", id, search.depth());
        self.searches.write().insert(id, Arc::new(search));
        self.cache.clear();
        Ok(())
    }

    pub fn search(&self, id: &str) -> Option<Arc<FacetSearch>> {
        self.searches.read().get(id).cloned()
    }

    pub fn search_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.searches.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn index(&self) -> &Arc<SearchIndex> {
        &self.index
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// The navigation node at `path`, from cache when the index has not
    /// moved since it was computed.
    pub fn node(&self, id: &str, path: &str) -> Result<Arc<NavigationNode>, NavigationError> {
        self.node_with_token(id, path, &self.limits.token())
    }

    /// `node` under a caller-owned token instead of the configured budget.
    /// A cancelled computation leaves nothing in the cache.
    pub fn node_with_token(
        &self,
        id: &str,
        path: &str,
        token: &CancellationToken,
    ) -> Result<Arc<NavigationNode>, NavigationError> {
        // Before the lookup: a `register` from here on makes the insert a no-op.
        let epoch = self.cache.epoch();
        let search = self.lookup(id)?;
        let path = NavPath::parse(path)?;
        let reader = self.index.reader()?;
        let key = path.to_string();
        let generation = reader.generation();
        if let Some(hit) = self.cache.get(id, &key, generation) {
            return Ok(hit);
        }
        let computed = Arc::new(node(&search, &path, &reader, token)?);
        self.cache
            .insert(id, &key, generation, epoch, Arc::clone(&computed));
        Ok(computed)
    }

    pub fn count(&self, id: &str, path: &str) -> Result<usize, NavigationError> {
        Ok(self.node(id, path)?.count)
    }

    pub fn expand(&self, id: &str, path: &str) -> Result<Expansion, NavigationError> {
        let node = self.node(id, path)?;
        Ok(match &node.result_set {
            Some(results) => Expansion::Leaf(results.clone()),
            None => Expansion::Children(node.children.clone()),
        })
    }

    /// Matching nodes at any depth. Not cached above the leaves.
    pub fn result_set(&self, id: &str, path: &str) -> Result<ResultSet, NavigationError> {
        let search = self.lookup(id)?;
        let path = NavPath::parse(path)?;
        if path.len() == search.depth() {
            if let Some(results) = &self.node(id, &path.to_string())?.result_set {
                return Ok(results.clone());
            }
        }
        let reader = self.index.reader()?;
        result_set(&search, &path, &reader, &self.limits.token())
    }

    fn lookup(&self, id: &str) -> Result<Arc<FacetSearch>, NavigationError> {
        self.search(id)
            .ok_or_else(|| NavigationError::UnknownSearch(id.to_string()))
    }
}
