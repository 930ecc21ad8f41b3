//! The index file: save, open, and rejection of damaged files.

use std::fs;
use std::sync::Arc;

use facetdex::binary::header::IndexHeader;
use facetdex::verify::check_snapshot;
use facetdex::{FacetedNavigation, FormatError, IndexOptions, NodeId, SearchIndex};

use super::common::{news_index, news_settings};

#[test]
fn test_reopened_index_navigates_identically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("site.fcdx");
    let settings = news_settings();

    let original = news_index();
    original.save(&path).unwrap();
    let reopened = Arc::new(SearchIndex::open(&path, IndexOptions::default()).unwrap());
    check_snapshot(reopened.reader().unwrap().snapshot()).unwrap();
    assert_eq!(reopened.generation(), original.generation());

    let before = FacetedNavigation::from_settings(&settings, original).unwrap();
    let after = FacetedNavigation::from_settings(&settings, reopened).unwrap();
    for search in ["news", "tagged", "archive"] {
        let a = before.node(search, "").unwrap();
        let b = after.node(search, "").unwrap();
        assert_eq!(a.count, b.count, "{}", search);
        assert_eq!(a.children, b.children, "{}", search);
    }
}

#[test]
fn test_save_replaces_file_without_leftovers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("site.fcdx");
    let index = news_index();
    index.save(&path).unwrap();
    index.remove(&NodeId::from("n1")).unwrap();
    index.save(&path).unwrap();

    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["site.fcdx".to_string()]);

    let reopened = SearchIndex::open(&path, IndexOptions::default()).unwrap();
    assert!(reopened.reader().unwrap().document(&NodeId::from("n1")).is_none());
    assert_eq!(reopened.reader().unwrap().stats().live_docs, 7);
}

#[test]
fn test_flipped_byte_fails_checksum() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("site.fcdx");
    news_index().save(&path).unwrap();

    let mut bytes = fs::read(&path).unwrap();
    let target = IndexHeader::SIZE + 3;
    bytes[target] ^= 0xff;
    fs::write(&path, &bytes).unwrap();

    assert!(matches!(
        SearchIndex::open(&path, IndexOptions::default()),
        Err(FormatError::ChecksumMismatch { .. })
    ));
}

#[test]
fn test_damaged_files_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("site.fcdx");
    news_index().save(&path).unwrap();
    let bytes = fs::read(&path).unwrap();

    let truncated = dir.path().join("truncated.fcdx");
    fs::write(&truncated, &bytes[..bytes.len() / 2]).unwrap();
    assert!(SearchIndex::open(&truncated, IndexOptions::default()).is_err());

    let mut wrong_magic = bytes.clone();
    wrong_magic[0] = b'Z';
    let bad = dir.path().join("bad.fcdx");
    fs::write(&bad, &wrong_magic).unwrap();
    assert!(matches!(
        SearchIndex::open(&bad, IndexOptions::default()),
        Err(FormatError::BadMagic)
    ));

    let missing = dir.path().join("missing.fcdx");
    assert!(matches!(
        SearchIndex::open(&missing, IndexOptions::default()),
        Err(FormatError::Io(_))
    ));
}
