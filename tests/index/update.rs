//! Index updates: replacement, removal, revisions, commits and concurrency.

use std::sync::Arc;
use std::thread;

use facetdex::config::ConfigHandle;
use facetdex::verify::check_snapshot;
use facetdex::{
    DocBase, FacetConjunction, IndexOptions, NodeId, NodeIndexer, QueryError, SearchIndex,
};
use facetdex::CancellationToken;

use super::common::{make_doc, news_index, news_indexer, news_node, news_settings, demo_field};

fn count(index: &SearchIndex, field: &str, value: &str) -> usize {
    index
        .reader()
        .unwrap()
        .count(
            &FacetConjunction::new().with(field, value),
            &DocBase::All,
            &CancellationToken::none(),
        )
        .unwrap()
}

#[test]
fn test_reindex_moves_node_between_values() {
    let settings = news_settings();
    let indexer = news_indexer(&settings);
    let index = news_index();
    let year = demo_field("year");
    let y2023 = facetdex::sortable::encode_long(2023);
    let y2024 = facetdex::sortable::encode_long(2024);
    assert_eq!(count(&index, &year, &y2023), 2);
    assert_eq!(count(&index, &year, &y2024), 3);

    let mut moved = news_node("n2", "/content/news/n2", 2024, 3, &["rust"]);
    moved.revision = 2;
    let report = index.index_nodes(&indexer, &[moved]).unwrap();
    assert_eq!(report.indexed, 1);

    assert_eq!(count(&index, &year, &y2023), 1);
    assert_eq!(count(&index, &year, &y2024), 4);
    check_snapshot(index.reader().unwrap().snapshot()).unwrap();
}

#[test]
fn test_unchanged_and_stale_are_noops() {
    let settings = news_settings();
    let indexer = news_indexer(&settings);
    let index = news_index();
    let before = index.generation();

    let same = news_node("n1", "/content/news/n1", 2022, 1, &["rust", "release"]);
    let report = index.index_nodes(&indexer, &[same]).unwrap();
    assert_eq!(report.unchanged, 1);
    assert_eq!(index.generation(), before);

    let mut newer = news_node("n1", "/content/news/n1", 2022, 1, &["rust"]);
    newer.revision = 5;
    index.index_nodes(&indexer, &[newer]).unwrap();
    let mut older = news_node("n1", "/content/news/n1", 1999, 1, &[]);
    older.revision = 4;
    let report = index.index_nodes(&indexer, &[older]).unwrap();
    assert_eq!(report.stale, 1);

    let doc = index.reader().unwrap().document(&NodeId::from("n1")).unwrap();
    assert_eq!(doc.revision, 5);
}

#[test]
fn test_stale_documents_after_config_reload() {
    let settings = news_settings();
    let index = news_index();
    let handle = ConfigHandle::new(settings.indexing_config());
    assert_eq!(handle.generation(), 0);
    assert!(index.reader().unwrap().stale_documents(0).is_empty());

    let generation = handle.replace(settings.indexing_config());
    assert_eq!(generation, 1);
    assert_eq!(index.reader().unwrap().stale_documents(generation).len(), 8);

    // Re-indexing under the new configuration clears a node's staleness.
    let indexer = NodeIndexer::new(
        handle.snapshot(),
        Arc::new(settings.namespace_registry()),
        settings.indexer,
    );
    let mut n1 = news_node("n1", "/content/news/n1", 2022, 1, &["rust", "release"]);
    n1.revision = 2;
    assert_eq!(index.index_nodes(&indexer, &[n1]).unwrap().indexed, 1);

    let mut stale = index.reader().unwrap().stale_documents(generation);
    stale.sort();
    assert_eq!(stale.len(), 7);
    assert!(!stale.contains(&NodeId::from("n1")));
    assert_eq!(stale[0], NodeId::from("a1"));
}

#[test]
fn test_remove_drops_node_from_every_count() {
    let index = news_index();
    let tags = demo_field("tags");
    assert_eq!(count(&index, &tags, "rust"), 4);

    assert!(index.remove(&NodeId::from("n4")).unwrap());
    assert!(!index.remove(&NodeId::from("n4")).unwrap());
    assert_eq!(count(&index, &tags, "rust"), 3);
    assert_eq!(count(&index, &tags, "events"), 2);
    check_snapshot(index.reader().unwrap().snapshot()).unwrap();
}

#[test]
fn test_manual_commit_hides_pending_writes() {
    let index = SearchIndex::new(IndexOptions {
        auto_commit: false,
        ..IndexOptions::default()
    });
    index.index(make_doc("a", 1, &[("x", "1")])).unwrap();
    assert_eq!(index.reader().unwrap().stats().live_docs, 0);
    assert_eq!(index.generation(), 0);

    assert_eq!(index.commit().unwrap(), 1);
    assert_eq!(index.reader().unwrap().stats().live_docs, 1);
    // Nothing pending: same generation.
    assert_eq!(index.commit().unwrap(), 1);
}

#[test]
fn test_reader_keeps_its_snapshot() {
    let index = SearchIndex::new(IndexOptions::default());
    index.index(make_doc("a", 1, &[("x", "1")])).unwrap();
    let pinned = index.reader().unwrap();

    index.index(make_doc("b", 1, &[("x", "1")])).unwrap();
    index.remove(&NodeId::from("a")).unwrap();

    let token = CancellationToken::none();
    let conjunction = FacetConjunction::new().with("x", "1");
    let old = pinned.query(&conjunction, &DocBase::All, &token).unwrap();
    let new = index.reader().unwrap().query(&conjunction, &DocBase::All, &token).unwrap();
    assert!(old.contains(&NodeId::from("a")));
    assert!(!new.contains(&NodeId::from("a")));
    assert!(new.contains(&NodeId::from("b")));
}

#[test]
fn test_closed_index_is_unavailable() {
    let index = news_index();
    index.close();
    assert!(index.is_closed());
    assert!(matches!(index.reader(), Err(QueryError::Unavailable(_))));
    assert!(matches!(
        index.index(make_doc("z", 1, &[])),
        Err(QueryError::Unavailable(_))
    ));
    assert!(matches!(index.commit(), Err(QueryError::Unavailable(_))));
}

#[test]
fn test_compaction_keeps_counts() {
    let index = SearchIndex::new(IndexOptions {
        auto_commit: false,
        ..IndexOptions::default()
    });
    for round in 0..3u64 {
        for i in 0..800 {
            let value = format!("v{}", (i + round as usize) % 7);
            index
                .index(make_doc(&format!("d{}", i), round + 1, &[("x", value.as_str())]))
                .unwrap();
        }
        index.commit().unwrap();
    }
    let reader = index.reader().unwrap();
    assert_eq!(reader.stats().live_docs, 800);
    assert!(reader.stats().tombstones <= 1024);
    check_snapshot(reader.snapshot()).unwrap();

    let token = CancellationToken::none();
    let counts = reader
        .distinct_values("x", &FacetConjunction::new(), &DocBase::All, &token)
        .unwrap();
    assert_eq!(counts.iter().map(|c| c.count).sum::<usize>(), 800);
}

#[test]
fn test_concurrent_readers_see_committed_states() {
    let index = Arc::new(SearchIndex::new(IndexOptions::default()));
    let writer = {
        let index = Arc::clone(&index);
        thread::spawn(move || {
            for i in 0..200 {
                index
                    .index(make_doc(&format!("d{}", i), 1, &[("x", "1"), ("y", "1")]))
                    .unwrap();
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let index = Arc::clone(&index);
            thread::spawn(move || {
                let token = CancellationToken::none();
                for _ in 0..50 {
                    let reader = index.reader().unwrap();
                    let x = reader
                        .count(&FacetConjunction::new().with("x", "1"), &DocBase::All, &token)
                        .unwrap();
                    let xy = reader
                        .count(
                            &FacetConjunction::new().with("x", "1").with("y", "1"),
                            &DocBase::All,
                            &token,
                        )
                        .unwrap();
                    // Every document carries both values, in every snapshot.
                    assert_eq!(x, xy);
                    assert_eq!(x, reader.stats().live_docs);
                }
            })
        })
        .collect();
    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(index.reader().unwrap().stats().live_docs, 200);
}
