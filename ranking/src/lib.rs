//! # asreview-rank - ASReview rankings for reference library collections
//!
//! ASReview writes its screening order to a CSV file. Attached to a library
//! collection as `asreview.csv`, that file is matched against the
//! collection's items so every item can show its rank.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌─────────────┐     ┌─────────────┐     ┌──────────────┐
//! │ asreview.csv │────▶│   Parser    │────▶│   Matcher   │────▶│    Cache     │◀── lookup
//! │ (attachment) │     │ (auto-delim)│     │ (DOI, ISSN) │     │ (mtime keyed)│
//! └──────────────┘     └─────────────┘     └─────────────┘     └──────────────┘
//!                                                                     ▲
//!                                        change events ──▶ Coordinator┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use asreview_rank::{RankingCache, RankLookup, FsStore, SnapshotLibrary, RankingConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let library = Arc::new(SnapshotLibrary::open("library.json").await.unwrap());
//!     let cache = RankingCache::new(library, Arc::new(FsStore), RankingConfig::default());
//!     cache.initialize().await;
//!     println!("{}", cache.cell_text(1.into(), 10.into()));
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types
//! - [`models`] - Identifiers, CSV cells, ranking tables
//! - [`config`] - Matching configuration
//! - [`parser`] - CSV parsing with delimiter detection
//! - [`identifier`] - DOI / ISSN extraction
//! - [`matcher`] - Item to row matching
//! - [`host`] - Library and file provider traits
//! - [`snapshot`] - JSON library snapshot
//! - [`cache`] - Per-collection ranking cache
//! - [`coordinator`] - Change notification handling
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing and matching
pub mod identifier;
pub mod matcher;
pub mod parser;

// Host
pub mod host;
pub mod snapshot;

// Cache
pub mod cache;
pub mod coordinator;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Errors
// =============================================================================

pub use error::{CoordinatorError, CsvError, HostError, KeyError, RefreshError, ServerError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{CellValue, CollectionId, CollectionRanking, ItemId, RankingRow, RankingTable};

pub use config::RankingConfig;

// =============================================================================
// Re-exports - Parsing and matching
// =============================================================================

pub use parser::{
    decode_content,
    detect_delimiter,
    parse_ranking_file,
    parse_ranking_table,
    parse_ranking_text,
    write_ranking_table,
};

pub use identifier::{doi, identifier, issn, normalize_doi};

pub use matcher::{match_rankings, match_row};

// =============================================================================
// Re-exports - Host
// =============================================================================

pub use host::{FileStore, FsStore, Item, ItemKind, Library, MemoryFiles};

pub use snapshot::{Snapshot, SnapshotLibrary};

// =============================================================================
// Re-exports - Cache
// =============================================================================

pub use cache::{CacheStats, RankLookup, RankResult, RankingCache, RefreshOutcome};

pub use coordinator::{ChangeCoordinator, ChangeEvent, CoordinatorHandle, ItemAction};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
