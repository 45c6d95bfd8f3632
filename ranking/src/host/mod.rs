//! Host capabilities the engine depends on.
//!
//! The reference library is reached only through two traits:
//!
//! - [`Library`] - item and collection queries
//! - [`FileStore`] - attachment file stat and read
//!
//! [`FsStore`] reads the real filesystem; [`MemoryFiles`] keeps files in
//! memory with settable modification times.

mod files;

pub use files::{FsStore, MemoryFiles};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::HostResult;
use crate::models::{CollectionId, ItemId};

/// Free-text item field scanned for `Field: value` lines.
pub const EXTRA_FIELD: &str = "extra";

const TITLE_FIELD: &str = "title";

// =============================================================================
// Items
// =============================================================================

/// What kind of library record an item is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// A bibliographic record.
    #[default]
    Regular,
    /// A file attachment.
    Attachment,
    /// A standalone or child note.
    Note,
}

/// One library item as the host reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    #[serde(default)]
    pub kind: ItemKind,
    /// Structured fields by name (`title`, `DOI`, `ISSN`, `extra`, ...).
    #[serde(default)]
    pub fields: HashMap<String, String>,
    /// Parent record for child attachments and notes.
    #[serde(default)]
    pub parent_item: Option<ItemId>,
    /// Attachment file location.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Collections the item is directly in.
    #[serde(default)]
    pub collections: Vec<CollectionId>,
}

impl Item {
    /// A regular item with no fields.
    pub fn regular(id: u64) -> Self {
        Self {
            id: ItemId(id),
            kind: ItemKind::Regular,
            fields: HashMap::new(),
            parent_item: None,
            path: None,
            collections: Vec::new(),
        }
    }

    /// A top-level attachment titled `title` stored at `path`.
    pub fn attachment(id: u64, title: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            kind: ItemKind::Attachment,
            path: Some(path.into()),
            ..Self::regular(id)
        }
        .with_field(TITLE_FIELD, title)
    }

    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.fields.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_parent(mut self, parent: u64) -> Self {
        self.parent_item = Some(ItemId(parent));
        self
    }

    pub fn in_collection(mut self, collection: u64) -> Self {
        self.collections.push(CollectionId(collection));
        self
    }

    /// Structured field `name`, empty when unset.
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn title(&self) -> &str {
        self.field(TITLE_FIELD)
    }

    /// The free-text notes field.
    pub fn extra(&self) -> &str {
        self.field(EXTRA_FIELD)
    }

    pub fn is_regular(&self) -> bool {
        self.kind == ItemKind::Regular
    }

    pub fn is_attachment(&self) -> bool {
        self.kind == ItemKind::Attachment
    }

    /// Not a child of another item.
    pub fn is_top_level(&self) -> bool {
        self.parent_item.is_none()
    }

    /// An attachment carrying `title`, regardless of where it is filed.
    pub fn is_ranking_attachment(&self, title: &str) -> bool {
        self.is_attachment() && self.title() == title
    }

    pub fn belongs_to(&self, collection: CollectionId) -> bool {
        self.collections.contains(&collection)
    }
}

// =============================================================================
// Capabilities
// =============================================================================

/// Item and collection queries against the reference library.
#[async_trait]
pub trait Library: Send + Sync {
    /// Items filed directly in `collection`; empty for unknown collections.
    async fn collection_items(&self, collection: CollectionId) -> HostResult<Vec<Item>>;

    /// A single item, `None` if it no longer exists.
    async fn item(&self, id: ItemId) -> HostResult<Option<Item>>;

    /// Every top-level attachment titled `title`, paired with each collection
    /// it is filed in. One pair per collection; the highest item id wins.
    async fn ranking_attachments(&self, title: &str) -> HostResult<Vec<(CollectionId, ItemId)>>;
}

/// Attachment file access.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Last modification time. `ErrorKind::NotFound` means the file is gone.
    async fn modified(&self, path: &Path) -> io::Result<SystemTime>;

    /// Full file contents.
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_builder() {
        let item = Item::attachment(5, "asreview.csv", "/tmp/asreview.csv").in_collection(1);

        assert!(item.is_attachment());
        assert!(item.is_top_level());
        assert!(item.is_ranking_attachment("asreview.csv"));
        assert!(!item.is_ranking_attachment("ASReview.csv"));
        assert!(item.belongs_to(CollectionId(1)));
    }

    #[test]
    fn test_missing_field_is_empty() {
        let item = Item::regular(1).with_field("DOI", "10.1/a");
        assert_eq!(item.field("DOI"), "10.1/a");
        assert_eq!(item.field("ISSN"), "");
        assert_eq!(item.extra(), "");
    }

    #[test]
    fn test_item_json_defaults() {
        let item: Item = serde_json::from_str(
            r#"{"id": 3, "kind": "attachment", "parentItem": 2, "fields": {"title": "asreview.csv"}}"#,
        )
        .unwrap();

        assert_eq!(item.id, ItemId(3));
        assert!(!item.is_top_level());
        assert!(item.collections.is_empty());
        assert!(item.path.is_none());
    }
}
