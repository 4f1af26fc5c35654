//! Store errors

use gold_concurrency::ContextError;
use thiserror::Error;

/// Errors returned by a [`BigTable`](crate::BigTable) implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The call's context was cancelled or timed out
    #[error(transparent)]
    Context(#[from] ContextError),

    /// Table does not exist
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// Column family does not exist in the table
    #[error("column family {family} not found in table {table}")]
    FamilyNotFound {
        /// Table name
        table: String,
        /// Missing family
        family: String,
    },

    /// Table or column family already exists
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Rows and mutations passed to a bulk write disagree in length
    #[error("bulk write has {rows} rows but {mutations} mutation lists")]
    BulkMismatch {
        /// Number of row keys
        rows: usize,
        /// Number of mutation lists
        mutations: usize,
    },

    /// Backend unavailable or the request failed in transit
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// True for errors worth retrying with the same request
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Unavailable(_) | StoreError::Context(ContextError::DeadlineExceeded)
        )
    }

    /// True if this is an "already exists" admin error
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists(_))
    }
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
