//! Filesystem-backed synchronization: a snapshot file, real ranking CSVs, and
//! change events flowing through the coordinator.

use asreview_rank::{
    ChangeCoordinator, ChangeEvent, CollectionId, FsStore, ItemAction, ItemId, RankLookup,
    RankResult, RankingCache, RankingConfig, RefreshOutcome, SnapshotLibrary,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

const SCREENING: CollectionId = CollectionId(1);
const X: ItemId = ItemId(10);
const Y: ItemId = ItemId(11);
const Z: ItemId = ItemId(12);
const RANKING: ItemId = ItemId(20);

const LIBRARY: &str = r#"{
  "collections": [{ "id": 1, "name": "Screening" }],
  "items": [
    { "id": 10, "fields": { "title": "X", "DOI": "https://doi.org/10.1/x" }, "collections": [1] },
    { "id": 11, "fields": { "title": "Y", "extra": "tex.ids: y\nDOI: 10.1/y" }, "collections": [1] },
    { "id": 12, "fields": { "title": "Z", "ISSN": "1234-5678" }, "collections": [1] },
    { "id": 20, "kind": "attachment", "fields": { "title": "asreview.csv" },
      "path": "asreview.csv", "collections": [1] }
  ]
}"#;

fn write_library(dir: &Path, json: &str) {
    fs::write(dir.join("library.json"), json).unwrap();
}

/// Write the ranking file and pin its modification time.
fn write_ranking(dir: &Path, content: &[u8], modified: SystemTime) {
    let path = dir.join("asreview.csv");
    fs::write(&path, content).unwrap();
    fs::File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(modified)
        .unwrap();
}

fn base_time() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
}

async fn setup() -> (TempDir, Arc<RankingCache<SnapshotLibrary, FsStore>>) {
    let dir = tempfile::tempdir().unwrap();
    write_library(dir.path(), LIBRARY);
    write_ranking(
        dir.path(),
        b"\xEF\xBB\xBFdoi;issn;asreview_ranking\n10.1/x;;3\n;1234-5678;7\n10.1/y;;1\n",
        base_time(),
    );

    let library = SnapshotLibrary::open(dir.path().join("library.json")).await.unwrap();
    let cache = Arc::new(RankingCache::new(
        Arc::new(library),
        Arc::new(FsStore),
        RankingConfig::default(),
    ));
    (dir, cache)
}

#[tokio::test]
async fn test_startup_scan_ranks_collection() {
    let (_dir, cache) = setup().await;

    assert_eq!(cache.lookup(SCREENING, X), RankResult::Pending);

    cache.initialize().await;

    assert_eq!(cache.lookup(SCREENING, X), RankResult::Ranked(3.0));
    assert_eq!(cache.lookup(SCREENING, Y), RankResult::Ranked(1.0));
    assert_eq!(cache.lookup(SCREENING, Z), RankResult::Ranked(7.0));
    assert_eq!(cache.cell_text(SCREENING, Z), "7");
    assert_eq!(cache.lookup(CollectionId(2), X), RankResult::Unknown);
    assert_eq!(cache.collections(), vec![SCREENING]);
}

#[tokio::test]
async fn test_unchanged_file_is_not_reparsed() {
    let (_dir, cache) = setup().await;
    cache.initialize().await;

    assert_eq!(cache.refresh(SCREENING).await, RefreshOutcome::Unchanged);
    assert_eq!(cache.stats().parses, 1);
}

#[tokio::test]
async fn test_modified_attachment_event_rebuilds_ranking() {
    let (dir, cache) = setup().await;
    let (coordinator, _worker) = ChangeCoordinator::new(Arc::clone(&cache)).spawn();
    cache.initialize().await;

    write_ranking(
        dir.path(),
        b"doi,asreview_ranking\n10.1/y,4\n",
        base_time() + Duration::from_secs(60),
    );
    coordinator
        .notify(ChangeEvent::Items {
            action: ItemAction::Modify,
            ids: vec![RANKING],
        })
        .unwrap();
    coordinator.flush().await.unwrap();

    assert_eq!(cache.lookup(SCREENING, Y), RankResult::Ranked(4.0));
    assert_eq!(cache.lookup(SCREENING, X), RankResult::Unknown);
    assert_eq!(cache.lookup(SCREENING, Z), RankResult::Unknown);
}

#[tokio::test]
async fn test_deleted_file_drops_ranking() {
    let (dir, cache) = setup().await;
    let (coordinator, _worker) = ChangeCoordinator::new(Arc::clone(&cache)).spawn();
    cache.initialize().await;

    fs::remove_file(dir.path().join("asreview.csv")).unwrap();
    coordinator
        .notify(ChangeEvent::Collections { ids: vec![SCREENING] })
        .unwrap();
    coordinator.flush().await.unwrap();

    assert!(cache.ranking(SCREENING).is_none());
    assert_eq!(cache.cell_text(SCREENING, X), "");
}

#[tokio::test]
async fn test_attachment_removed_from_library() {
    let (dir, cache) = setup().await;
    let (coordinator, _worker) = ChangeCoordinator::new(Arc::clone(&cache)).spawn();
    cache.initialize().await;

    write_library(
        dir.path(),
        &LIBRARY.replace(r#""collections": [1] }
  ]"#, r#""collections": [] }
  ]"#),
    );
    cache.library().reload().await.unwrap();

    coordinator
        .notify(ChangeEvent::CollectionItems {
            keys: vec!["1-20".to_string()],
        })
        .unwrap();
    coordinator.flush().await.unwrap();

    assert_eq!(cache.lookup(SCREENING, X), RankResult::Unknown);
    assert_eq!(cache.stats().removals, 1);
}
