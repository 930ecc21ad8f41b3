//! Navigation errors: bad paths, bad definitions, unavailable index.

use facetdex::{
    ConfigError, FacetSearchDefinition, NavigationError, QueryError, Settings,
};

use super::common::news_navigation;

#[test]
fn test_unknown_search() {
    let navigation = news_navigation();
    assert_eq!(
        navigation.node("nope", "").unwrap_err(),
        NavigationError::UnknownSearch("nope".into())
    );
}

#[test]
fn test_path_validation_order() {
    let navigation = news_navigation();

    let too_long = "demo:year=a/demo:tags=b/demo:date=c";
    assert!(matches!(
        navigation.node("news", too_long),
        Err(NavigationError::MalformedPath { .. })
    ));

    assert_eq!(
        navigation.node("news", "demo:color=red").unwrap_err(),
        NavigationError::UnknownFacet {
            search: "news".into(),
            facet: "demo:color".into(),
        }
    );

    assert_eq!(
        navigation.node("news", "demo:tags=rust").unwrap_err(),
        NavigationError::OutOfOrder {
            facet: "demo:tags".into(),
            position: 0,
            expected: "demo:year".into(),
        }
    );

    assert!(matches!(
        navigation.node("news", "demo:year"),
        Err(NavigationError::MalformedPath { .. })
    ));
    assert!(navigation.node("news", "demo:year").unwrap_err().is_caller_error());
}

#[test]
fn test_unknown_value_is_an_empty_node_not_an_error() {
    let navigation = news_navigation();
    let node = navigation.node("news", "demo:year=1800").unwrap();
    assert_eq!(node.count, 0);
    assert!(node.children.is_empty());
}

#[test]
fn test_invalid_definitions_are_rejected() {
    let navigation = news_navigation();

    let duplicate = FacetSearchDefinition::new("dup", vec!["demo:year".into(), "demo:year".into()]);
    assert!(matches!(
        navigation.register(duplicate),
        Err(ConfigError::InvalidSearch { .. })
    ));

    let unbound = FacetSearchDefinition::new("unbound", vec!["nope:year".into()]);
    assert!(matches!(
        navigation.register(unbound),
        Err(ConfigError::InvalidSearch { .. })
    ));
    assert!(navigation.search("unbound").is_none());

    let duplicate_ids = r#"{"searches": [
        {"id": "a", "name": "A", "facets": ["x"]},
        {"id": "a", "name": "B", "facets": ["y"]}
    ]}"#;
    assert!(matches!(
        Settings::from_json(duplicate_ids),
        Err(ConfigError::InvalidSearch { .. })
    ));
}

#[test]
fn test_closed_index_is_not_a_caller_error() {
    let navigation = news_navigation();
    navigation.index().close();
    let err = navigation.node("news", "").unwrap_err();
    assert!(matches!(err, NavigationError::Query(QueryError::Unavailable(_))));
    assert!(!err.is_caller_error());
}
