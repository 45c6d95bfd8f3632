//! Engine log entries, streamed to clients via Server-Sent Events (SSE).
//!
//! Every entry goes to `tracing` and is also broadcast to any connected
//! `/api/logs` subscriber.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::models::CollectionId;

/// Log level for streamed entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// A single log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Collection the entry is about, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<CollectionId>,
}

impl LogEntry {
    pub fn debug(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Debug, message: message.into(), collection: None }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Info, message: message.into(), collection: None }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Warning, message: message.into(), collection: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Error, message: message.into(), collection: None }
    }

    pub fn for_collection(mut self, collection: CollectionId) -> Self {
        self.collection = Some(collection);
        self
    }
}

/// Global log broadcaster
pub static LOG_BROADCASTER: Lazy<LogBroadcaster> = Lazy::new(LogBroadcaster::new);

/// Broadcasts log entries to all connected SSE clients
pub struct LogBroadcaster {
    sender: broadcast::Sender<LogEntry>,
}

impl LogBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    /// Emit an entry through `tracing` and to all subscribers
    pub fn log(&self, entry: LogEntry) {
        let collection = entry.collection.map(|c| c.0);
        match entry.level {
            LogLevel::Debug => tracing::debug!(collection, "{}", entry.message),
            LogLevel::Info => tracing::info!(collection, "{}", entry.message),
            LogLevel::Warning => tracing::warn!(collection, "{}", entry.message),
            LogLevel::Error => tracing::error!(collection, "{}", entry.message),
        }

        // No receivers is fine
        let _ = self.sender.send(entry);
    }

    /// Get a receiver for SSE streaming
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

pub fn log_debug(collection: CollectionId, msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::debug(msg).for_collection(collection));
}

pub fn log_info(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::info(msg));
}

pub fn log_collection(collection: CollectionId, msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::info(msg).for_collection(collection));
}

pub fn log_warning(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::warning(msg));
}

pub fn log_collection_warning(collection: CollectionId, msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::warning(msg).for_collection(collection));
}

pub fn log_error(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::error(msg));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_entries() {
        let broadcaster = LogBroadcaster::new();
        let mut rx = broadcaster.subscribe();

        broadcaster.log(LogEntry::info("refreshed").for_collection(CollectionId(4)));

        let entry = rx.recv().await.unwrap();
        assert_eq!(entry.level, LogLevel::Info);
        assert_eq!(entry.message, "refreshed");
        assert_eq!(entry.collection, Some(CollectionId(4)));
    }

    #[test]
    fn test_log_without_subscribers() {
        LogBroadcaster::new().log(LogEntry::error("nobody listening"));
    }

    #[test]
    fn test_entry_json() {
        let json = serde_json::to_value(LogEntry::warning("stale")).unwrap();
        assert_eq!(json["level"], "warning");
        assert!(json.get("collection").is_none());
    }
}
