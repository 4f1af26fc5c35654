//! Engine errors

use gold_concurrency::ContextError;
use gold_storage::StoreError;
use thiserror::Error;

/// Errors returned by the trace store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The commit could not be resolved, even after refreshing the VCS
    #[error("commit not found: {0}")]
    CommitNotFound(String),

    /// The repository has no commits to build a tile from
    #[error("repository has no commits")]
    NoCommits,

    /// The backing store failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The call was cancelled or ran out of time
    #[error(transparent)]
    Context(#[from] ContextError),

    /// Encoding or decoding of core types failed
    #[error(transparent)]
    Core(#[from] gold_core::Error),

    /// The VCS failed
    #[error("vcs error: {0}")]
    Vcs(String),

    /// Configuration is invalid or could not be loaded
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Tile assembly arithmetic did not add up
    ///
    /// Always a bug in the engine, never a data problem.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for errors the caller may retry with the same request
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Store(e) => e.is_transient(),
            Error::Context(ContextError::DeadlineExceeded) => true,
            _ => false,
        }
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;
