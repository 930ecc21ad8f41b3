// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Faceted full-text indexing with exact drill-down counts.
//!
//! Content nodes are turned into indexed documents whose facet-flagged
//! properties become untokenized, sortable-encoded fields. A facet search
//! names an ordered list of facets; walking it one value at a time yields a
//! navigation tree whose every node carries the exact number of matching
//! nodes below it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌───────────────┐
//! │  config/    │────▶│  indexer.rs  │────▶│    index/     │
//! │ (namespaces,│     │ (ContentNode │     │ (SearchIndex, │
//! │  facet rules│     │  → document) │     │  IndexReader) │
//! └─────────────┘     └──────────────┘     └───────────────┘
//!        │                   │                     │
//!        ▼                   ▼                     ▼
//! ┌─────────────┐     ┌──────────────┐     ┌───────────────┐
//! │ sortable.rs │     │   binary/    │     │  navigation/  │
//! │ (encodings) │     │ (index file) │     │ (counts, tree,│
//! └─────────────┘     └──────────────┘     │  cache)       │
//!                                          └───────────────┘
//! ```
//!
//! | Module       | Responsibility                                        |
//! |--------------|-------------------------------------------------------|
//! | `types`      | Content model, indexed documents, ordinals            |
//! | `sortable`   | Order-preserving LONG/DOUBLE/DATE/BOOLEAN tokens      |
//! | `config`     | Namespace registry, facet rules, settings file        |
//! | `indexer`    | One node in, one document (or a typed error) out      |
//! | `index`      | Writer, committed snapshots, facet and text queries   |
//! | `navigation` | Facet searches, drill-down counts, navigation cache   |
//! | `binary`     | Persisted index format                                |
//! | `build`      | Batch indexing from JSON node dumps                   |
//! | `verify`     | Snapshot consistency checks used by tests             |
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use facetdex::{FacetedNavigation, SearchIndex, Settings};
//!
//! let settings = Settings::load("settings.json".as_ref())?;
//! let index = Arc::new(SearchIndex::open("site.fcdx".as_ref(), settings.index)?);
//! let navigation = FacetedNavigation::from_settings(&settings, index)?;
//!
//! let node = navigation.node("news", "demo:year=2024")?;
//! for child in &node.children {
//!     println!("{} ({})", child.label, child.count);
//! }
//! ```

pub mod binary;
pub mod build;
pub mod cancel;
pub mod config;
pub mod error;
pub mod index;
pub mod indexer;
pub mod navigation;
pub mod sortable;
pub mod testing;
pub mod types;
mod utils;
pub mod verify;

pub use cancel::CancellationToken;
pub use config::{IndexingConfig, NamespaceRegistry, Settings};
pub use error::{BuildError, ConfigError, FormatError, IndexError, NavigationError, QueryError};
pub use index::{
    DocBase, FacetConjunction, FacetCount, IndexOptions, IndexReader, ResultSet, SearchIndex,
};
pub use indexer::{IndexerOptions, NodeIndexer};
pub use navigation::{
    ChildOrder, Expansion, FacetChild, FacetSearch, FacetSearchDefinition, FacetedNavigation,
    NavPath, NavigationLimits, NavigationNode,
};
pub use types::{
    ContentNode, FacetField, FacetKind, IndexedDocument, NodeId, Property, PropertyType,
    PropertyValue,
};
pub use utils::normalize;

#[cfg(test)]
mod tests {
    //! Property tests across index and navigation.
    //!
    //! Every count the navigation layer reports must equal a brute-force
    //! recount over the documents that were indexed.

    use super::*;
    use crate::testing::{brute_count, make_doc};
    use crate::verify::check_snapshot;
    use proptest::prelude::*;

    fn facets_strategy() -> impl Strategy<Value = Vec<(u8, u8)>> {
        // (field 0..3, value 0..4)
        prop::collection::vec((0u8..3, 0u8..4), 0..5)
    }

    fn build(docs: &[IndexedDocument]) -> SearchIndex {
        let index = SearchIndex::new(IndexOptions::default());
        for doc in docs {
            index.index(doc.clone()).unwrap();
        }
        index.commit().unwrap();
        index
    }

    fn to_docs(raw: &[Vec<(u8, u8)>]) -> Vec<IndexedDocument> {
        raw.iter()
            .enumerate()
            .map(|(i, facets)| {
                let owned: Vec<(String, String)> = facets
                    .iter()
                    .map(|(f, v)| (format!("f{}", f), format!("v{}", v)))
                    .collect();
                let pairs: Vec<(&str, &str)> =
                    owned.iter().map(|(f, v)| (f.as_str(), v.as_str())).collect();
                make_doc(&format!("d{}", i), 1, &pairs)
            })
            .collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_distinct_values_match_brute_force(
            raw in prop::collection::vec(facets_strategy(), 0..40),
            filter in prop::option::of(0u8..4),
        ) {
            let docs = to_docs(&raw);
            let index = build(&docs);
            let reader = index.reader().unwrap();
            check_snapshot(reader.snapshot()).unwrap();

            let filter_value = filter.map(|v| format!("v{}", v));
            let mut conjunction = FacetConjunction::new();
            let mut constraints: Vec<(&str, &str)> = Vec::new();
            if let Some(value) = &filter_value {
                conjunction.push("f0", value.clone());
                constraints.push(("f0", value.as_str()));
            }

            let token = CancellationToken::none();
            let counts = reader
                .distinct_values("f1", &conjunction, &DocBase::All, &token)
                .unwrap();
            for FacetCount { value, count } in &counts {
                let mut with_child = constraints.clone();
                with_child.push(("f1", value.as_str()));
                prop_assert_eq!(*count, brute_count(&docs, &with_child));
            }
            let total = reader.count(&conjunction, &DocBase::All, &token).unwrap();
            prop_assert_eq!(total, brute_count(&docs, &constraints));
        }

        #[test]
        fn prop_removal_keeps_snapshot_consistent(
            raw in prop::collection::vec(facets_strategy(), 1..30),
            removals in prop::collection::vec(any::<prop::sample::Index>(), 0..10),
        ) {
            let docs = to_docs(&raw);
            let index = build(&docs);
            for removal in &removals {
                let doc = removal.get(&docs);
                index.remove(&doc.node_id).unwrap();
            }
            index.commit().unwrap();
            let reader = index.reader().unwrap();
            check_snapshot(reader.snapshot()).unwrap();
            prop_assert!(reader.stats().live_docs <= docs.len());
        }
    }
}
