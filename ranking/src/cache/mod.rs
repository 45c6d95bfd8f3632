//! Collection Ranking Cache - matched ranks per collection
//!
//! Each collection with a ranking attachment gets a [`CollectionRanking`]
//! stamped with the attachment's modification time. A refresh that finds the
//! same timestamp does nothing; otherwise the file is parsed and matched
//! again and the result replaces the old entry in one assignment, so
//! concurrent lookups see either the old ranking or the new one.

mod ready;

pub use ready::Readiness;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::api::logs::{log_collection, log_collection_warning, log_debug, log_info, log_warning};
use crate::config::RankingConfig;
use crate::error::{RefreshError, RefreshResult};
use crate::host::{FileStore, Item, Library};
use crate::matcher::match_rankings;
use crate::models::{format_number, CollectionId, CollectionRanking, ItemId};
use crate::parser::parse_ranking_table;

/// Shown while the startup scan is still running.
pub const PENDING_MARKER: &str = "\u{231B}";

/// Answer to a point lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RankResult {
    /// Startup scan not finished; nothing can be said yet.
    Pending,
    /// No ranking for this collection, or the item did not match.
    Unknown,
    Ranked(f64),
}

impl RankResult {
    pub fn rank(&self) -> Option<f64> {
        match self {
            RankResult::Ranked(rank) => Some(*rank),
            _ => None,
        }
    }

    /// Display text: hourglass while pending, empty when unknown.
    pub fn text(&self) -> String {
        match self {
            RankResult::Pending => PENDING_MARKER.to_string(),
            RankResult::Unknown => String::new(),
            RankResult::Ranked(rank) => format_number(*rank),
        }
    }
}

/// Point lookups for the display layer.
pub trait RankLookup: Send + Sync {
    fn lookup(&self, collection: CollectionId, item: ItemId) -> RankResult;

    fn cell_text(&self, collection: CollectionId, item: ItemId) -> String {
        self.lookup(collection, item).text()
    }
}

/// What a refresh did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum RefreshOutcome {
    /// Rebuilt from a new version of the ranking file.
    Updated { rows: usize, ranked: usize },
    /// Ranking file unchanged since the last build.
    Unchanged,
    /// Ranking attachment gone or empty; the entry was dropped.
    Removed,
    /// No ranking attachment and nothing cached.
    Absent,
    /// I/O or host failure; the previous entry was kept.
    Failed,
}

/// Counter snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub refreshes: u64,
    pub parses: u64,
    pub removals: u64,
    pub failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    refreshes: AtomicU64,
    parses: AtomicU64,
    removals: AtomicU64,
    failures: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            refreshes: self.refreshes.load(Ordering::Relaxed),
            parses: self.parses.load(Ordering::Relaxed),
            removals: self.removals.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Per-collection ranking cache.
pub struct RankingCache<L, F> {
    library: Arc<L>,
    files: Arc<F>,
    config: RankingConfig,
    entries: RwLock<HashMap<CollectionId, Arc<CollectionRanking>>>,
    ready: Readiness,
    initialized: AtomicBool,
    counters: Counters,
}

impl<L: Library, F: FileStore> RankingCache<L, F> {
    pub fn new(library: Arc<L>, files: Arc<F>, config: RankingConfig) -> Self {
        Self {
            library,
            files,
            config,
            entries: RwLock::new(HashMap::new()),
            ready: Readiness::new(),
            initialized: AtomicBool::new(false),
            counters: Counters::default(),
        }
    }

    pub fn library(&self) -> &Arc<L> {
        &self.library
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    pub fn is_ready(&self) -> bool {
        self.ready.is_ready()
    }

    /// Wait for the startup scan to finish.
    pub async fn wait_ready(&self) {
        self.ready.wait().await
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    /// Current entry for `collection`.
    pub fn ranking(&self, collection: CollectionId) -> Option<Arc<CollectionRanking>> {
        self.entries.read().get(&collection).cloned()
    }

    /// Collections that currently have a ranking, ascending.
    pub fn collections(&self) -> Vec<CollectionId> {
        let mut ids: Vec<CollectionId> = self.entries.read().keys().copied().collect();
        ids.sort();
        ids
    }

    /// Collections whose current ranking was built from attachment `source`.
    pub fn collections_from(&self, source: ItemId) -> Vec<CollectionId> {
        let mut ids: Vec<CollectionId> = self
            .entries
            .read()
            .iter()
            .filter(|(_, ranking)| ranking.source == source)
            .map(|(&collection, _)| collection)
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Startup scan: refresh every collection holding a ranking attachment,
    /// then mark the cache ready. Runs once; later calls only wait for it.
    pub async fn initialize(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            self.wait_ready().await;
            return;
        }

        let collections: BTreeSet<CollectionId> = match self
            .library
            .ranking_attachments(&self.config.attachment_title)
            .await
        {
            Ok(found) => found.into_iter().map(|(collection, _)| collection).collect(),
            Err(e) => {
                log_warning(format!("Startup scan could not list ranking attachments: {}", e));
                BTreeSet::new()
            }
        };

        for &collection in &collections {
            self.refresh(collection).await;
        }

        self.ready.resolve();
        log_info(format!(
            "Ranking cache ready: {} of {} collections ranked",
            self.len(),
            collections.len()
        ));
    }

    /// Bring `collection` in line with its ranking attachment.
    ///
    /// Never fails: errors are logged and leave the previous entry in place,
    /// except a missing file, which drops the entry.
    pub async fn refresh(&self, collection: CollectionId) -> RefreshOutcome {
        Counters::bump(&self.counters.refreshes);

        match self.try_refresh(collection).await {
            Ok(outcome) => {
                match outcome {
                    RefreshOutcome::Updated { rows, ranked } => log_collection(
                        collection,
                        format!("Ranked {} items from {} rows", ranked, rows),
                    ),
                    RefreshOutcome::Removed => log_collection(collection, "Ranking removed"),
                    _ => log_debug(collection, format!("Refresh: {:?}", outcome)),
                }
                outcome
            }
            Err(e) => {
                Counters::bump(&self.counters.failures);
                log_collection_warning(
                    collection,
                    format!("Refresh failed, keeping previous ranking: {}", e),
                );
                RefreshOutcome::Failed
            }
        }
    }

    async fn try_refresh(&self, collection: CollectionId) -> RefreshResult<RefreshOutcome> {
        let items = self.library.collection_items(collection).await?;

        let Some((source, path)) = self.ranking_attachment(&items) else {
            return Ok(self.remove(collection));
        };

        let updated: DateTime<Utc> = match self.files.modified(&path).await {
            Ok(modified) => modified.into(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(self.remove(collection)),
            Err(e) => return Err(io_error(&path, e)),
        };

        if self
            .ranking(collection)
            .is_some_and(|current| current.source == source && current.updated == updated)
        {
            return Ok(RefreshOutcome::Unchanged);
        }

        let bytes = match self.files.read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(self.remove(collection)),
            Err(e) => return Err(io_error(&path, e)),
        };

        Counters::bump(&self.counters.parses);
        let table = parse_ranking_table(&bytes);
        if table.is_empty() {
            return Ok(self.remove(collection));
        }

        let rank = match_rankings(&items, &table, &self.config);
        let outcome = RefreshOutcome::Updated {
            rows: table.len(),
            ranked: rank.len(),
        };

        let ranking = Arc::new(CollectionRanking::new(source, updated, rank));
        self.entries.write().insert(collection, ranking);

        Ok(outcome)
    }

    /// The collection's top-level ranking attachment that has a file; the
    /// highest item id wins when there are several.
    fn ranking_attachment(&self, items: &[Item]) -> Option<(ItemId, PathBuf)> {
        items
            .iter()
            .filter(|item| item.is_ranking_attachment(&self.config.attachment_title) && item.is_top_level())
            .filter_map(|item| item.path.clone().map(|path| (item.id, path)))
            .max_by_key(|(id, _)| *id)
    }

    fn remove(&self, collection: CollectionId) -> RefreshOutcome {
        if self.entries.write().remove(&collection).is_some() {
            Counters::bump(&self.counters.removals);
            RefreshOutcome::Removed
        } else {
            RefreshOutcome::Absent
        }
    }
}

fn io_error(path: &Path, source: io::Error) -> RefreshError {
    RefreshError::Io {
        path: path.display().to_string(),
        source,
    }
}

impl<L: Library, F: FileStore> RankLookup for RankingCache<L, F> {
    fn lookup(&self, collection: CollectionId, item: ItemId) -> RankResult {
        if !self.ready.is_ready() {
            return RankResult::Pending;
        }
        match self.entries.read().get(&collection).and_then(|ranking| ranking.get(item)) {
            Some(rank) => RankResult::Ranked(rank),
            None => RankResult::Unknown,
        }
    }
}
