//! Reader queries: conjunctions, doc-bases, distinct values and text.

use facetdex::sortable::{encode_long, label};
use facetdex::{
    CancellationToken, DocBase, FacetConjunction, FacetKind, IndexOptions, NodeId, QueryError,
    ResultSet,
};

use super::common::{demo_field, index_docs, make_doc_at, news_index};

fn ids(set: &ResultSet) -> Vec<&str> {
    set.ids().map(NodeId::as_str).collect()
}

#[test]
fn test_conjunction_of_year_and_tag() {
    let reader = news_index().reader().unwrap();
    let token = CancellationToken::none();
    let conjunction = FacetConjunction::new()
        .with(demo_field("year"), encode_long(2024))
        .with(demo_field("tags"), "rust");
    let results = reader.query(&conjunction, &DocBase::All, &token).unwrap();
    assert_eq!(ids(&results), vec!["n4"]);
}

#[test]
fn test_unknown_value_matches_nothing() {
    let reader = news_index().reader().unwrap();
    let token = CancellationToken::none();
    let conjunction = FacetConjunction::new().with(demo_field("tags"), "gardening");
    assert_eq!(reader.count(&conjunction, &DocBase::All, &token).unwrap(), 0);
    let conjunction = FacetConjunction::new().with("no-such-field", "x");
    assert_eq!(reader.count(&conjunction, &DocBase::All, &token).unwrap(), 0);
}

#[test]
fn test_doc_base_scopes_results() {
    let reader = news_index().reader().unwrap();
    let token = CancellationToken::none();
    let all = FacetConjunction::new();

    let archive = DocBase::Subtree("/content/archive".into());
    assert_eq!(reader.count(&all, &archive, &token).unwrap(), 2);

    // A sibling whose name shares the prefix is not below the base.
    let prefix_only = DocBase::Subtree("/content/arch".into());
    assert_eq!(reader.count(&all, &prefix_only, &token).unwrap(), 0);

    let node = DocBase::Node(NodeId::from("n3"));
    let scoped = reader.query(&all, &node, &token).unwrap();
    assert_eq!(ids(&scoped), vec!["n3"]);

    let missing = DocBase::Node(NodeId::from("gone"));
    assert_eq!(
        reader.count(&all, &missing, &token),
        Err(QueryError::UnknownDocBase(NodeId::from("gone")))
    );
}

#[test]
fn test_distinct_values_count_multi_valued_nodes_once_per_value() {
    let reader = news_index().reader().unwrap();
    let token = CancellationToken::none();
    let tags = reader
        .distinct_values(&demo_field("tags"), &FacetConjunction::new(), &DocBase::All, &token)
        .unwrap();
    let pairs: Vec<(&str, usize)> = tags.iter().map(|c| (c.value.as_str(), c.count)).collect();
    // First-seen order: n1 brings rust and release, n3 brings events.
    assert_eq!(pairs, vec![("rust", 4), ("release", 2), ("events", 3)]);
}

#[test]
fn test_distinct_values_under_constraint() {
    let reader = news_index().reader().unwrap();
    let token = CancellationToken::none();
    let rust = FacetConjunction::new().with(demo_field("tags"), "rust");
    let years = reader
        .distinct_values(&demo_field("year"), &rust, &DocBase::All, &token)
        .unwrap();
    let labelled: Vec<(String, usize)> = years
        .iter()
        .map(|c| (label(FacetKind::Long, &c.value), c.count))
        .collect();
    assert_eq!(
        labelled,
        vec![
            ("2022".to_string(), 1),
            ("2023".to_string(), 1),
            ("2024".to_string(), 1),
            ("2019".to_string(), 1),
        ]
    );
}

#[test]
fn test_date_facets_are_sortable_tokens() {
    let reader = news_index().reader().unwrap();
    let token = CancellationToken::none();
    let mut dates: Vec<String> = reader
        .distinct_values(&demo_field("date"), &FacetConjunction::new(), &DocBase::All, &token)
        .unwrap()
        .into_iter()
        .map(|c| c.value)
        .collect();
    dates.sort();
    let labels: Vec<String> = dates.iter().map(|t| label(FacetKind::Date, t)).collect();
    assert!(labels[0].starts_with("2019-04-01"));
    assert!(labels[labels.len() - 1].starts_with("2024-09-01"));
    assert_eq!(reader.facet_kind(&demo_field("date")), Some(FacetKind::Date));
}

#[test]
fn test_text_search() {
    let reader = news_index().reader().unwrap();
    let token = CancellationToken::none();
    let hits = reader.search_text("Story N4", &DocBase::All, &token).unwrap();
    assert_eq!(ids(&hits), vec!["n4"]);

    let hits = reader.search_text("story", &DocBase::Subtree("/content/archive".into()), &token).unwrap();
    assert_eq!(hits.len(), 2);

    assert!(reader.search_text("", &DocBase::All, &token).unwrap().is_empty());
    assert!(reader.search_text("story unicorn", &DocBase::All, &token).unwrap().is_empty());
}

#[test]
fn test_document_order_option() {
    let docs = vec![
        make_doc_at("late", "/content/b", vec![1], 1, &[("x", "1")]),
        make_doc_at("early", "/content/a", vec![0], 1, &[("x", "1")]),
    ];
    let token = CancellationToken::none();
    let x = FacetConjunction::new().with("x", "1");

    let unordered = index_docs(&docs, IndexOptions::default());
    let results = unordered.reader().unwrap().query(&x, &DocBase::All, &token).unwrap();
    assert_eq!(ids(&results), vec!["late", "early"]);

    let ordered = index_docs(
        &docs,
        IndexOptions {
            respect_document_order: true,
            ..IndexOptions::default()
        },
    );
    let results = ordered.reader().unwrap().query(&x, &DocBase::All, &token).unwrap();
    assert_eq!(ids(&results), vec!["early", "late"]);
    assert_eq!(results.page(1, 10).len(), 1);
    assert!(results.page(5, 10).is_empty());
}

#[test]
fn test_cancelled_token_stops_query() {
    let reader = news_index().reader().unwrap();
    let token = CancellationToken::new();
    token.cancel();
    let result = reader.distinct_values(
        &demo_field("tags"),
        &FacetConjunction::new(),
        &DocBase::All,
        &token,
    );
    assert!(matches!(result, Err(QueryError::Cancelled { .. })));
}
