//! Error types for the ranking synchronization engine.
//!
//! - [`CsvError`] - CSV decoding errors (never escapes the parser)
//! - [`HostError`] - Item/collection data provider errors
//! - [`RefreshError`] - Failures inside a single collection refresh
//! - [`KeyError`] - Malformed collection-membership keys
//! - [`CoordinatorError`] - Change queue errors
//! - [`ServerError`] - HTTP server errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// CSV Parsing Errors
// =============================================================================

/// Errors during CSV parsing.
///
/// The public parser collapses these into an empty table; they only exist so
/// the failure can be logged with its cause.
#[derive(Debug, Error)]
pub enum CsvError {
    /// The underlying reader rejected the input.
    #[error("Invalid CSV format: {0}")]
    ParseError(#[from] csv::Error),

    /// No header row.
    #[error("CSV file is empty")]
    EmptyFile,
}

// =============================================================================
// Host Errors
// =============================================================================

/// Errors raised by a [`crate::host::Library`] implementation.
#[derive(Debug, Error)]
pub enum HostError {
    /// Library snapshot could not be decoded.
    #[error("Invalid library snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// IO error while loading library data.
    #[error("Library IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Host refused or could not answer the query.
    #[error("Library unavailable: {0}")]
    Unavailable(String),
}

// =============================================================================
// Refresh Errors
// =============================================================================

/// Failure while rebuilding one collection's ranking.
///
/// Caught at the refresh boundary and logged; the previous cache entry stays.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// Item/collection lookup failed.
    #[error("Host error: {0}")]
    Host(#[from] HostError),

    /// Stat or read of the ranking attachment failed.
    #[error("Cannot access '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// =============================================================================
// Event Errors
// =============================================================================

/// A collection-membership key that does not start with a collection id.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Malformed collection item key: '{0}'")]
pub struct KeyError(pub String);

/// Errors from the change coordinator queue.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// The worker task has stopped; the event was not queued.
    #[error("Change coordinator is no longer running")]
    Closed,
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Could not bind the listening socket.
    #[error("Cannot bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Library could not be loaded.
    #[error("Library error: {0}")]
    Host(#[from] HostError),

    /// Serving failed.
    #[error("Server IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for host queries.
pub type HostResult<T> = Result<T, HostError>;

/// Result type for a single refresh.
pub type RefreshResult<T> = Result<T, RefreshError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
