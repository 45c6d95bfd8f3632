//! JSON library snapshot, a [`Library`] that can live outside the host.
//!
//! ```json
//! {
//!   "collections": [{ "id": 1, "name": "Screening" }],
//!   "items": [
//!     { "id": 10, "fields": { "DOI": "10.1/a" }, "collections": [1] },
//!     { "id": 11, "kind": "attachment", "fields": { "title": "asreview.csv" },
//!       "path": "/data/asreview.csv", "collections": [1] }
//!   ]
//! }
//! ```

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::HostResult;
use crate::host::{Item, Library};
use crate::models::{CollectionId, ItemId};

/// A named collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    #[serde(default)]
    pub name: String,
}

/// Serialized library contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub collections: Vec<Collection>,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Snapshot {
    pub fn from_json(json: &str) -> HostResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Resolve relative attachment paths against `base`.
    fn resolve_paths(&mut self, base: &Path) {
        for item in &mut self.items {
            if let Some(path) = item.path.as_mut() {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        }
    }
}

/// In-memory library, optionally backed by a snapshot file.
#[derive(Debug, Default)]
pub struct SnapshotLibrary {
    source: Option<PathBuf>,
    state: RwLock<Snapshot>,
}

impl SnapshotLibrary {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            source: None,
            state: RwLock::new(snapshot),
        }
    }

    /// Load a snapshot file. Relative attachment paths are taken relative
    /// to the file's directory.
    pub async fn open(path: impl Into<PathBuf>) -> HostResult<Self> {
        let library = Self {
            source: Some(path.into()),
            state: RwLock::new(Snapshot::default()),
        };
        library.reload().await?;
        Ok(library)
    }

    /// Re-read the backing file; a no-op for purely in-memory libraries.
    pub async fn reload(&self) -> HostResult<()> {
        let Some(source) = &self.source else {
            return Ok(());
        };
        let content = tokio::fs::read_to_string(source).await?;
        let mut snapshot = Snapshot::from_json(&content)?;
        if let Some(base) = source.parent() {
            snapshot.resolve_paths(base);
        }
        *self.state.write() = snapshot;
        Ok(())
    }

    /// Add or replace an item.
    pub fn upsert_item(&self, item: Item) {
        let mut state = self.state.write();
        match state.items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item,
            None => state.items.push(item),
        }
    }

    pub fn remove_item(&self, id: ItemId) -> Option<Item> {
        let mut state = self.state.write();
        let index = state.items.iter().position(|item| item.id == id)?;
        Some(state.items.remove(index))
    }

    /// Display name of a collection, empty when unnamed.
    pub fn collection_name(&self, id: CollectionId) -> String {
        self.state
            .read()
            .collections
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Library for SnapshotLibrary {
    async fn collection_items(&self, collection: CollectionId) -> HostResult<Vec<Item>> {
        Ok(self
            .state
            .read()
            .items
            .iter()
            .filter(|item| item.belongs_to(collection))
            .cloned()
            .collect())
    }

    async fn item(&self, id: ItemId) -> HostResult<Option<Item>> {
        Ok(self.state.read().items.iter().find(|item| item.id == id).cloned())
    }

    async fn ranking_attachments(&self, title: &str) -> HostResult<Vec<(CollectionId, ItemId)>> {
        let state = self.state.read();
        let mut latest: BTreeMap<CollectionId, ItemId> = BTreeMap::new();

        for item in &state.items {
            if !item.is_ranking_attachment(title) || !item.is_top_level() {
                continue;
            }
            for &collection in &item.collections {
                let entry = latest.entry(collection).or_insert(item.id);
                if item.id > *entry {
                    *entry = item.id;
                }
            }
        }

        Ok(latest.into_iter().collect())
    }
}
