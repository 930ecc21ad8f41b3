//! Drill-down counts over the news site.

use facetdex::sortable::encode_long;
use facetdex::{Expansion, FacetSearchDefinition, NavPath, NodeId};

use super::common::{make_doc, news_navigation};

fn year_path(year: i64) -> String {
    NavPath::root().child("demo:year", encode_long(year)).to_string()
}

#[test]
fn test_root_lists_years_with_counts() {
    let navigation = news_navigation();
    let root = navigation.node("news", "").unwrap();
    assert_eq!(root.count, 8);
    assert_eq!(root.next_facet.as_deref(), Some("demo:year"));
    assert!(!root.is_leaf());

    let children: Vec<(&str, usize)> = root
        .children
        .iter()
        .map(|c| (c.label.as_str(), c.count))
        .collect();
    assert_eq!(
        children,
        vec![("2022", 1), ("2023", 2), ("2024", 3), ("2019", 1), ("2020", 1)]
    );
    assert!(root.children.iter().all(|c| c.facet == "demo:year"));
}

#[test]
fn test_child_counts_equal_drill_down_counts() {
    let navigation = news_navigation();
    let root = navigation.node("news", "").unwrap();
    for child in &root.children {
        let path = NavPath::root().child(&child.facet, &child.value).to_string();
        assert_eq!(navigation.count("news", &path).unwrap(), child.count);
    }
}

#[test]
fn test_second_level_and_leaf() {
    let navigation = news_navigation();
    let y2024 = navigation.node("news", &year_path(2024)).unwrap();
    assert_eq!(y2024.count, 3);
    let tags: Vec<(&str, usize)> = y2024
        .children
        .iter()
        .map(|c| (c.value.as_str(), c.count))
        .collect();
    assert_eq!(tags, vec![("rust", 1), ("release", 1), ("events", 1)]);

    let leaf_path = format!("{}/demo:tags=rust", year_path(2024));
    let leaf = navigation.node("news", &leaf_path).unwrap();
    assert!(leaf.is_leaf());
    assert_eq!(leaf.count, 1);
    assert!(leaf.children.is_empty());
    let results = leaf.result_set.as_ref().unwrap();
    assert!(results.contains(&NodeId::from("n4")));

    match navigation.expand("news", &leaf_path).unwrap() {
        Expansion::Leaf(results) => assert_eq!(results.len(), 1),
        Expansion::Children(_) => panic!("expected a leaf"),
    }
}

#[test]
fn test_multi_valued_node_counted_under_each_value() {
    let navigation = news_navigation();
    let root = navigation.node("tagged", "").unwrap();
    let tags: Vec<(&str, usize)> = root
        .children
        .iter()
        .map(|c| (c.value.as_str(), c.count))
        .collect();
    // Count descending; n4 carries both rust and events.
    assert_eq!(tags, vec![("rust", 4), ("events", 3), ("release", 2)]);
    // n6 has no tags but still belongs to the root.
    assert_eq!(root.count, 8);

    let rust = navigation.result_set("tagged", "demo:tags=rust").unwrap();
    let events = navigation.result_set("tagged", "demo:tags=events").unwrap();
    assert!(rust.contains(&NodeId::from("n4")));
    assert!(events.contains(&NodeId::from("n4")));
}

#[test]
fn test_doc_base_and_value_order() {
    let navigation = news_navigation();
    let root = navigation.node("archive", "").unwrap();
    assert_eq!(root.count, 2);
    let years: Vec<&str> = root.children.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(years, vec!["2019", "2020"]);
}

#[test]
fn test_result_set_at_intermediate_depth() {
    let navigation = news_navigation();
    let results = navigation.result_set("news", &year_path(2023)).unwrap();
    let mut ids: Vec<&str> = results.ids().map(NodeId::as_str).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["n2", "n3"]);
}

#[test]
fn test_child_limit() {
    let navigation = news_navigation();
    let mut definition =
        FacetSearchDefinition::new("top-years", vec!["demo:year".into()]);
    definition.child_limit = Some(2);
    navigation.register(definition).unwrap();
    let root = navigation.node("top-years", "").unwrap();
    assert_eq!(root.children.len(), 2);
    assert_eq!(root.count, 8);
}

#[test]
fn test_cache_hits_until_index_moves() {
    let navigation = news_navigation();
    navigation.node("news", "").unwrap();
    navigation.node("news", "").unwrap();
    let stats = navigation.cache_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);

    navigation.index().index(make_doc("extra", 1, &[])).unwrap();
    let root = navigation.node("news", "").unwrap();
    assert_eq!(root.count, 9);
    assert_eq!(navigation.cache_stats().misses, 2);
}
