//! Tile source errors

use gold_concurrency::ContextError;
use thiserror::Error;

/// Errors returned by the tile source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The trace store failed
    #[error(transparent)]
    Engine(#[from] gold_engine::Error),

    /// The call was cancelled or ran out of time
    #[error(transparent)]
    Context(#[from] ContextError),

    /// Ignore rules could not be loaded
    #[error("ignore store error: {0}")]
    Ignore(String),

    /// Commit to changelist reconciliation failed
    #[error("reconciliation failed: {0}")]
    Reconcile(String),

    /// Configuration is invalid or could not be loaded
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type for tile source operations
pub type Result<T> = std::result::Result<T, Error>;
