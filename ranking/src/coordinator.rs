//! Change Coordinator - turns library notifications into cache refreshes
//!
//! Events are handled strictly one at a time, in arrival order, and only
//! after the startup scan has finished. Events that arrive earlier are
//! queued, never dropped.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::api::logs::log_warning;
use crate::cache::{RankingCache, RefreshOutcome};
use crate::error::{CoordinatorError, KeyError};
use crate::host::{FileStore, Library};
use crate::models::{CollectionId, ItemId};

/// What happened to the items in an [`ChangeEvent::Items`] notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemAction {
    Add,
    Modify,
    Trash,
    Delete,
    Refresh,
}

/// A library change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChangeEvent {
    /// Items were added, modified or removed.
    Items { action: ItemAction, ids: Vec<ItemId> },
    /// Collections changed.
    Collections { ids: Vec<CollectionId> },
    /// Collection membership changed; keys are `"<collectionID>-<itemID>"`.
    CollectionItems { keys: Vec<String> },
}

/// Collection id encoded at the front of a collection-item key.
pub fn decode_collection_key(key: &str) -> Result<CollectionId, KeyError> {
    key.split('-')
        .next()
        .and_then(|id| id.trim().parse::<u64>().ok())
        .map(CollectionId)
        .ok_or_else(|| KeyError(key.to_string()))
}

/// Dispatches change events to [`RankingCache::refresh`].
pub struct ChangeCoordinator<L, F> {
    cache: Arc<RankingCache<L, F>>,
}

impl<L, F> ChangeCoordinator<L, F>
where
    L: Library + 'static,
    F: FileStore + 'static,
{
    pub fn new(cache: Arc<RankingCache<L, F>>) -> Self {
        Self { cache }
    }

    /// Wait for readiness, then refresh every collection `event` touches,
    /// each once, in ascending id order.
    pub async fn handle(&self, event: &ChangeEvent) -> Vec<(CollectionId, RefreshOutcome)> {
        self.cache.wait_ready().await;

        let mut outcomes = Vec::new();
        for collection in self.affected_collections(event).await {
            outcomes.push((collection, self.cache.refresh(collection).await));
        }
        outcomes
    }

    async fn affected_collections(&self, event: &ChangeEvent) -> BTreeSet<CollectionId> {
        let mut collections = BTreeSet::new();

        match event {
            ChangeEvent::Items { action, ids } => {
                let title = &self.cache.config().attachment_title;
                let removed = matches!(action, ItemAction::Trash | ItemAction::Delete);
                for &id in ids {
                    // A removed attachment is no longer in the library; the
                    // rankings built from it still name it as their source.
                    match self.cache.library().item(id).await {
                        Ok(Some(item)) => {
                            if item.is_ranking_attachment(title) {
                                collections.extend(item.collections.iter().copied());
                            }
                            if removed {
                                collections.extend(self.cache.collections_from(id));
                            }
                        }
                        Ok(None) => collections.extend(self.cache.collections_from(id)),
                        Err(e) => {
                            log_warning(format!("Cannot inspect item {}: {}", id, e));
                            collections.extend(self.cache.collections_from(id));
                        }
                    }
                }
            }
            ChangeEvent::Collections { ids } => collections.extend(ids.iter().copied()),
            ChangeEvent::CollectionItems { keys } => {
                for key in keys {
                    match decode_collection_key(key) {
                        Ok(collection) => {
                            collections.insert(collection);
                        }
                        Err(e) => log_warning(e.to_string()),
                    }
                }
            }
        }

        collections
    }

    /// Start the worker task; events go in through the returned handle.
    pub fn spawn(self) -> (CoordinatorHandle, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

        let task = tokio::spawn(async move {
            self.cache.wait_ready().await;
            while let Some(message) = rx.recv().await {
                match message {
                    Message::Event(event) => {
                        self.handle(&event).await;
                    }
                    Message::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
        });

        (CoordinatorHandle { tx }, task)
    }
}

enum Message {
    Event(ChangeEvent),
    Flush(oneshot::Sender<()>),
}

/// Sending side of a running coordinator.
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::UnboundedSender<Message>,
}

impl CoordinatorHandle {
    /// Queue an event behind everything already queued.
    pub fn notify(&self, event: ChangeEvent) -> Result<(), CoordinatorError> {
        self.tx
            .send(Message::Event(event))
            .map_err(|_| CoordinatorError::Closed)
    }

    /// Wait until every event queued before this call has been handled.
    pub async fn flush(&self) -> Result<(), CoordinatorError> {
        let (done, wait) = oneshot::channel();
        self.tx
            .send(Message::Flush(done))
            .map_err(|_| CoordinatorError::Closed)?;
        wait.await.map_err(|_| CoordinatorError::Closed)
    }
}
