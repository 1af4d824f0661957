//! Error types shared across the search subsystem.
//!
//! Provider failures are all-or-nothing per call; persistence failures are
//! scoped to a single user record.

use thiserror::Error;
use uuid::Uuid;

/// Failures talking to the embedding provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("embedding request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("embedding provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("embedding provider returned {got} vectors for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },
    #[error("expected {expected}-dimensional embeddings, got {got}")]
    Dimension { expected: usize, got: usize },
    #[error("unknown embedding provider: {0}")]
    UnknownProvider(String),
}

/// Failures reading or writing a single user record.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("user {0} not found")]
    UserNotFound(Uuid),
    #[error("{kind} entry {id} not found")]
    EntryNotFound { kind: &'static str, id: Uuid },
    #[error("username '{0}' is already taken")]
    UsernameTaken(String),
    #[error("embedding has {got} dimensions, store expects {expected}")]
    Dimension { expected: usize, got: usize },
    #[error("failed to write profile snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize profile snapshot: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PersistenceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UserNotFound(_) | Self::EntryNotFound { .. })
    }
}

/// Failures answering a search request.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Index(#[from] anyhow::Error),
}

/// Failures of a whole index builder run. Per-user persistence failures are
/// logged and never surface here.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("embedding step aborted: {0}")]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Index(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("rebuild queue is closed")]
    Closed,
    #[error("no async runtime available to schedule the rebuild")]
    NoRuntime,
}
