//! Shared test utilities and fixtures.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use facetdex::{
    ContentNode, FacetSearchDefinition, FacetedNavigation, IndexOptions, IndexedDocument,
    NamespaceRegistry, NavigationLimits, NodeIndexer, Property, PropertyValue, SearchIndex, Settings,
};

// Re-export canonical test utilities from facetdex::testing
pub use facetdex::testing::{brute_count, make_doc, make_doc_at, make_node};

/// Namespace URI bound to the `demo` prefix in `NEWS_SETTINGS`.
pub const DEMO_URI: &str = "http://example.com/demo/1.0";

/// A small site: news documents faceted by year, tags and publication date.
pub const NEWS_SETTINGS: &str = r#"{
    "namespaces": {"demo": "http://example.com/demo/1.0"},
    "indexing": {
        "rules": [
            {"nodeType": "demo:document", "facets": ["demo:year", "demo:tags", "demo:date"]},
            {"nodeType": "demo:page", "exclude": ["demo:tags"]}
        ],
        "supertypes": {"demo:news": ["demo:document"], "demo:page": ["demo:document"]}
    },
    "searches": [
        {"id": "news", "name": "News by year", "facets": ["demo:year", "demo:tags"]},
        {"id": "tagged", "name": "By tag", "facets": ["demo:tags"], "childOrder": "countDescending"},
        {"id": "archive", "name": "Archive", "docBase": {"subtree": "/content/archive"},
         "facets": ["demo:year"], "childOrder": "value"}
    ]
}"#;

/// Expanded index field key of a `demo:` property.
pub fn demo_field(local: &str) -> String {
    format!("{{{}}}{}", DEMO_URI, local)
}

pub fn news_settings() -> Settings {
    Settings::from_json(NEWS_SETTINGS).unwrap()
}

pub fn news_indexer(settings: &Settings) -> NodeIndexer {
    NodeIndexer::new(
        Arc::new(settings.indexing_config()),
        Arc::new(settings.namespace_registry()),
        settings.indexer,
    )
}

/// A `demo:news` node published on the first of `month` in `year`.
pub fn news_node(id: &str, path: &str, year: i64, month: u32, tags: &[&str]) -> ContentNode {
    let mut node = make_node(
        id,
        path,
        vec![
            Property::single("demo:year", PropertyValue::Long(year)),
            Property::multi(
                "demo:tags",
                tags.iter().map(|t| PropertyValue::String(t.to_string())).collect(),
            ),
            Property::single(
                "demo:date",
                PropertyValue::Date(Utc.with_ymd_and_hms(year as i32, month, 1, 0, 0, 0).unwrap()),
            ),
            Property::single("demo:title", PropertyValue::String(format!("Story {}", id))),
        ],
    );
    node.primary_type = "demo:news".into();
    node
}

/// Eight news nodes over three years, some under `/content/archive`.
pub fn news_nodes() -> Vec<ContentNode> {
    vec![
        news_node("n1", "/content/news/n1", 2022, 1, &["rust", "release"]),
        news_node("n2", "/content/news/n2", 2023, 3, &["rust"]),
        news_node("n3", "/content/news/n3", 2023, 6, &["events"]),
        news_node("n4", "/content/news/n4", 2024, 2, &["rust", "events"]),
        news_node("n5", "/content/news/n5", 2024, 5, &["release"]),
        news_node("n6", "/content/news/n6", 2024, 9, &[]),
        news_node("a1", "/content/archive/a1", 2019, 4, &["rust"]),
        news_node("a2", "/content/archive/a2", 2020, 4, &["events"]),
    ]
}

/// The news site, indexed and committed.
pub fn news_index() -> Arc<SearchIndex> {
    let settings = news_settings();
    let index = Arc::new(SearchIndex::new(settings.index));
    let report = index.index_nodes(&news_indexer(&settings), &news_nodes()).unwrap();
    assert!(report.is_clean(), "{:?}", report.failed);
    index
}

pub fn news_navigation() -> FacetedNavigation {
    FacetedNavigation::from_settings(&news_settings(), news_index()).unwrap()
}

/// Index `docs` one by one and commit.
pub fn index_docs(docs: &[IndexedDocument], options: IndexOptions) -> Arc<SearchIndex> {
    let index = Arc::new(SearchIndex::new(options));
    for doc in docs {
        index.index(doc.clone()).unwrap();
    }
    index.commit().unwrap();
    index
}

/// Navigation service with one search over facets `x`, `y`, `z`.
pub fn xyz_navigation(index: Arc<SearchIndex>, limits: NavigationLimits) -> FacetedNavigation {
    let navigation = FacetedNavigation::new(index, Arc::new(NamespaceRegistry::with_builtin()), limits);
    navigation
        .register(FacetSearchDefinition::new(
            "xyz",
            vec!["x".into(), "y".into(), "z".into()],
        ))
        .unwrap();
    navigation
}
