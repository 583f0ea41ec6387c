//! Error types for the interaction layer.

use thiserror::Error;

/// Message reported when the backend answers `false` without raising.
pub const SERVER_OPERATION_FAILED: &str = "Server operation failed";

/// Result type for persistence calls.
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Errors a persistence call can raise.
///
/// The `Display` text is what observers receive as the rollback message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    /// Transport failure (offline, DNS, TLS, dropped connection).
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with an error status.
    #[error("server error: {0}")]
    Server(String),

    /// No authenticated session.
    #[error("not signed in")]
    Unauthorized,

    /// The backend refused the write (row-level policy, constraint).
    #[error("{0}")]
    Rejected(String),
}

/// Result type for reconciliation lookups.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Errors raised while reconciling a realtime event.
///
/// These never escape the reconciler; they are logged and reported in
/// [`ReconcileOutcome::Failed`](crate::ReconcileOutcome::Failed).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// The vote source failed.
    #[error("vote source error: {0}")]
    Source(String),

    /// The vote source did not answer in time.
    #[error("vote source timed out")]
    Timeout,
}
