//! Unified error type for Gold.
//!
//! Every crate of the workspace has its own error enum; this module folds
//! them into one type with a stable shape for callers.

use gold_concurrency::ContextError;
use gold_storage::StoreError;
use thiserror::Error;

/// All Gold errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A commit, rule or other named entity does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The repository has no commits yet
    #[error("repository has no commits")]
    NoCommits,

    /// The operation was cancelled by its caller
    #[error("cancelled")]
    Cancelled,

    /// The operation ran out of time
    #[error("deadline exceeded")]
    Timeout,

    /// The store is unavailable; retrying the whole operation may succeed
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected the operation
    #[error("storage error: {0}")]
    Storage(String),

    /// Malformed input such as an unparsable trace id
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The version control system failed
    #[error("vcs error: {0}")]
    Vcs(String),

    /// A collaborator (ignore store, changelist reconciler) failed
    #[error("{0}")]
    Collaborator(String),

    /// Configuration is invalid
    #[error("invalid configuration: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (bug or invariant violation)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for Gold operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is retryable.
    ///
    /// Ingestion jobs retry a whole `put` on these.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Unavailable(_) | Error::Timeout)
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::NoCommits)
    }

    /// Check if this is a serious/unrecoverable error.
    pub fn is_serious(&self) -> bool {
        matches!(self, Error::Internal(_))
    }
}

impl From<ContextError> for Error {
    fn from(e: ContextError) -> Self {
        match e {
            ContextError::Cancelled => Error::Cancelled,
            ContextError::DeadlineExceeded => Error::Timeout,
        }
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Context(c) => c.into(),
            StoreError::Unavailable(msg) => Error::Unavailable(msg),
            StoreError::TableNotFound(table) => Error::NotFound(format!("table {}", table)),
            other => Error::Storage(other.to_string()),
        }
    }
}

impl From<gold_core::Error> for Error {
    fn from(e: gold_core::Error) -> Self {
        Error::InvalidInput(e.to_string())
    }
}

impl From<gold_engine::Error> for Error {
    fn from(e: gold_engine::Error) -> Self {
        use gold_engine::Error as E;
        match e {
            E::CommitNotFound(hash) => Error::NotFound(format!("commit {}", hash)),
            E::NoCommits => Error::NoCommits,
            E::Store(s) => s.into(),
            E::Context(c) => c.into(),
            E::Core(c) => c.into(),
            E::Vcs(msg) => Error::Vcs(msg),
            E::Config(msg) => Error::Config(msg),
            E::Internal(msg) => Error::Internal(msg),
        }
    }
}

impl From<gold_tilesource::Error> for Error {
    fn from(e: gold_tilesource::Error) -> Self {
        use gold_tilesource::Error as E;
        match e {
            E::Engine(inner) => inner.into(),
            E::Context(c) => c.into(),
            E::Ignore(msg) => Error::Collaborator(format!("ignore store: {}", msg)),
            E::Reconcile(msg) => Error::Collaborator(format!("reconciler: {}", msg)),
            E::Config(msg) => Error::Config(msg),
        }
    }
}
