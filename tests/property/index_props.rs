//! Random update sequences against a plain map of live documents.

use std::collections::BTreeMap;

use facetdex::binary::{decode_snapshot, encode_snapshot};
use facetdex::verify::check_snapshot;
use facetdex::{
    CancellationToken, DocBase, FacetConjunction, IndexOptions, IndexReader, IndexedDocument,
    NodeId, SearchIndex,
};
use proptest::prelude::*;

use super::common::{brute_count, make_doc};

#[derive(Debug, Clone)]
enum Op {
    Upsert { node: u8, revision: u8, x: u8, tags: Vec<u8> },
    Remove { node: u8 },
    Commit,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (0u8..12, 0u8..4, 0u8..3, prop::collection::vec(0u8..4, 0..3))
            .prop_map(|(node, revision, x, tags)| Op::Upsert { node, revision, x, tags }),
        2 => (0u8..12).prop_map(|node| Op::Remove { node }),
        1 => Just(Op::Commit),
    ]
}

fn build_doc(node: u8, revision: u8, x: u8, tags: &[u8]) -> IndexedDocument {
    let x = format!("x{}", x);
    let tags: Vec<String> = tags.iter().map(|t| format!("t{}", t)).collect();
    let mut facets: Vec<(&str, &str)> = vec![("x", x.as_str())];
    facets.extend(tags.iter().map(|t| ("tag", t.as_str())));
    make_doc(&format!("n{}", node), u64::from(revision), &facets)
}

fn assert_counts(reader: &IndexReader, live: &[IndexedDocument]) -> Result<(), TestCaseError> {
    let token = CancellationToken::none();
    for x in 0..3 {
        let x = format!("x{}", x);
        let conjunction = FacetConjunction::new().with("x", x.clone());
        let tags = reader
            .distinct_values("tag", &conjunction, &DocBase::All, &token)
            .unwrap();
        for tag in &tags {
            prop_assert_eq!(
                tag.count,
                brute_count(live, &[("x", x.as_str()), ("tag", tag.value.as_str())])
            );
        }
        prop_assert_eq!(
            reader.count(&conjunction, &DocBase::All, &token).unwrap(),
            brute_count(live, &[("x", x.as_str())])
        );
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_index_matches_model(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let index = SearchIndex::new(IndexOptions { auto_commit: false, ..IndexOptions::default() });
        let mut model: BTreeMap<NodeId, IndexedDocument> = BTreeMap::new();

        for op in &ops {
            match op {
                Op::Upsert { node, revision, x, tags } => {
                    let doc = build_doc(*node, *revision, *x, tags);
                    let keep_old = model
                        .get(&doc.node_id)
                        .is_some_and(|old| old.revision > doc.revision);
                    index.index(doc.clone()).unwrap();
                    if !keep_old {
                        model.insert(doc.node_id.clone(), doc);
                    }
                }
                Op::Remove { node } => {
                    let id = NodeId::from(format!("n{}", node).as_str());
                    prop_assert_eq!(index.remove(&id).unwrap(), model.remove(&id).is_some());
                }
                Op::Commit => {
                    index.commit().unwrap();
                }
            }
        }
        index.commit().unwrap();

        let reader = index.reader().unwrap();
        check_snapshot(reader.snapshot()).unwrap();
        prop_assert_eq!(reader.stats().live_docs, model.len());
        for (id, doc) in &model {
            let stored = reader.document(id);
            prop_assert_eq!(stored.as_deref(), Some(doc));
        }
        let live: Vec<IndexedDocument> = model.values().cloned().collect();
        assert_counts(&reader, &live)?;
    }

    #[test]
    fn prop_file_preserves_counts(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let index = SearchIndex::new(IndexOptions::default());
        for op in &ops {
            match op {
                Op::Upsert { node, revision, x, tags } => {
                    index.index(build_doc(*node, *revision, *x, tags)).unwrap();
                }
                Op::Remove { node } => {
                    index.remove(&NodeId::from(format!("n{}", node).as_str())).unwrap();
                }
                Op::Commit => {}
            }
        }
        let reader = index.reader().unwrap();
        let bytes = encode_snapshot(reader.snapshot()).unwrap();
        let decoded = decode_snapshot(&bytes).unwrap();
        check_snapshot(&decoded).unwrap();
        prop_assert_eq!(decoded.generation(), reader.generation());
        prop_assert_eq!(decoded.len(), reader.snapshot().len());

        let live: Vec<IndexedDocument> = reader
            .snapshot()
            .documents()
            .map(|(_, doc)| doc.as_ref().clone())
            .collect();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prop.fcdx");
        index.save(&path).unwrap();
        let reopened = SearchIndex::open(&path, IndexOptions::default()).unwrap();
        assert_counts(&reopened.reader().unwrap(), &live)?;
    }
}
