//! Error types for the core data model

use thiserror::Error;

/// Errors raised while encoding or decoding core types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Param key is not part of the ordered param set
    #[error("unknown param key: {0:?}")]
    UnknownKey(String),

    /// Param value is not part of the ordered param set for its key
    #[error("unknown value {value:?} for key {key:?}")]
    UnknownValue {
        /// Key the value was looked up under
        key: String,
        /// The value that was not found
        value: String,
    },

    /// Encoded params string could not be parsed or references unknown indices
    #[error("malformed encoded params: {0}")]
    MalformedEncoding(String),

    /// Trace id is not in the canonical `,k=v,` form
    #[error("malformed trace id: {0}")]
    MalformedTraceId(String),

    /// Trace slicing out of range
    #[error("invalid range {begin}..{end} for trace of length {len}")]
    InvalidRange {
        /// Start of the requested range
        begin: usize,
        /// End of the requested range (exclusive)
        end: usize,
        /// Length of the trace
        len: usize,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;
