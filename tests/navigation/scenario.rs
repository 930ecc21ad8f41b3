//! Randomized recount: 300 generated nodes, three facets valued 0 (absent),
//! 1 or 2, indexed through the node indexer. Every navigation node is
//! checked against the generator's ground truth, before and after updates.

use std::sync::Arc;

use facetdex::sortable::encode_long;
use facetdex::testing::{scenario, scenario_count, scenario_indexer, ScenarioNode, SCENARIO_FACETS};
use facetdex::{
    DocBase, FacetSearchDefinition, FacetedNavigation, IndexOptions, NavPath, NavigationLimits,
    NodeId, SearchIndex,
};

use super::common::xyz_navigation;

fn index_scenario(nodes: &[ScenarioNode]) -> Arc<SearchIndex> {
    let indexer = scenario_indexer().unwrap();
    let content: Vec<_> = nodes.iter().map(ScenarioNode::to_content_node).collect();
    let index = Arc::new(SearchIndex::new(IndexOptions::default()));
    let report = index.index_nodes(&indexer, &content).unwrap();
    assert!(report.is_clean(), "{:?}", report.failed);
    index
}

/// Walk the whole tree below `path`, checking every count. Returns the
/// number of nodes visited.
fn check_tree(
    navigation: &FacetedNavigation,
    search: &str,
    nodes: &[ScenarioNode],
    path: NavPath,
    constraints: &mut Vec<(&'static str, u8)>,
) -> usize {
    let node = navigation.node(search, &path.to_string()).unwrap();
    assert_eq!(node.count, scenario_count(nodes, constraints), "count at '{}'", path);

    if node.is_leaf() {
        assert_eq!(node.result_set.as_ref().map(|r| r.len()), Some(node.count));
        return 1;
    }

    let facet = SCENARIO_FACETS[path.len()];
    // Every value present among matching nodes appears exactly once.
    let mut expected: Vec<u8> = nodes
        .iter()
        .filter(|n| constraints.iter().all(|(f, v)| n.value(f) == *v))
        .map(|n| n.value(facet))
        .filter(|v| *v != 0)
        .collect();
    expected.sort_unstable();
    expected.dedup();
    let mut listed: Vec<u8> = node
        .children
        .iter()
        .map(|c| c.label.parse().unwrap())
        .collect();
    listed.sort_unstable();
    assert_eq!(listed, expected, "children at '{}'", path);

    let mut visited = 1;
    for child in &node.children {
        let value: u8 = child.label.parse().unwrap();
        assert_eq!(child.value, encode_long(i64::from(value)));
        assert!(child.count > 0);
        constraints.push((facet, value));
        visited += check_tree(
            navigation,
            search,
            nodes,
            path.child(facet, child.value.clone()),
            constraints,
        );
        constraints.pop();
    }
    visited
}

fn check_all(navigation: &FacetedNavigation, nodes: &[ScenarioNode]) -> usize {
    check_tree(navigation, "xyz", nodes, NavPath::root(), &mut Vec::new())
}

#[test]
fn test_every_node_matches_brute_force() {
    let nodes = scenario(300, 42);
    let navigation = xyz_navigation(index_scenario(&nodes), NavigationLimits::default());
    let visited = check_all(&navigation, &nodes);
    assert!(visited > 20, "tree too small: {}", visited);
}

#[test]
fn test_root_children_skip_nodes_without_x() {
    let nodes = scenario(300, 42);
    let navigation = xyz_navigation(index_scenario(&nodes), NavigationLimits::default());
    let root = navigation.node("xyz", "").unwrap();
    assert_eq!(root.count, 300);

    let with_x = nodes.iter().filter(|n| n.value("x") != 0).count();
    let children: usize = root.children.iter().map(|c| c.count).sum();
    assert_eq!(children, with_x);
    assert!(children < root.count);
    for value in [1u8, 2] {
        let path = format!("x={}", encode_long(i64::from(value)));
        let node = navigation.node("xyz", &path).unwrap();
        assert_eq!(node.count, scenario_count(&nodes, &[("x", value)]));
    }
}

#[test]
fn test_counts_follow_updates() {
    let mut nodes = scenario(300, 7);
    let index = index_scenario(&nodes);
    let navigation = xyz_navigation(Arc::clone(&index), NavigationLimits::default());
    check_all(&navigation, &nodes);

    // Remove every seventh node; give every fifth x=2 and drop its y.
    let removed: Vec<String> = nodes.iter().step_by(7).map(|n| n.id.clone()).collect();
    for id in &removed {
        index.remove(&NodeId::from(id.as_str())).unwrap();
    }
    nodes.retain(|n| !removed.contains(&n.id));
    let indexer = scenario_indexer().unwrap();
    let mut moved = Vec::new();
    for node in nodes.iter_mut().step_by(5) {
        node.values[0] = 2;
        node.values[1] = 0;
        node.revision += 1;
        moved.push(node.to_content_node());
    }
    index.index_nodes(&indexer, &moved).unwrap();

    // Same service, same cache: nothing stale may be served.
    check_all(&navigation, &nodes);
}

#[test]
fn test_subtree_search_counts_only_its_documents() {
    let nodes = scenario(300, 11);
    let navigation = xyz_navigation(index_scenario(&nodes), NavigationLimits::default());
    navigation
        .register(
            FacetSearchDefinition::new("even", vec!["x".into(), "y".into(), "z".into()])
                .with_doc_base(DocBase::Subtree("/content/even".into())),
        )
        .unwrap();

    let even: Vec<ScenarioNode> = nodes
        .iter()
        .filter(|n| n.path.starts_with("/content/even/"))
        .cloned()
        .collect();
    check_tree(&navigation, "even", &even, NavPath::root(), &mut Vec::new());
}

#[test]
fn test_cache_disabled_gives_same_answers() {
    let nodes = scenario(120, 3);
    let navigation = xyz_navigation(
        index_scenario(&nodes),
        NavigationLimits {
            cache_capacity: 0,
            ..NavigationLimits::default()
        },
    );
    check_all(&navigation, &nodes);
    assert_eq!(navigation.cache_stats().entries, 0);
}
