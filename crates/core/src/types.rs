//! Commit types
//!
//! - [`Commit`]: full commit details as shown with a tile
//! - [`IndexCommit`]: a commit's position in the repo history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A commit with data, as attached to a tile
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commit {
    /// VCS hash
    pub hash: String,
    /// Author line
    pub author: String,
    /// First line of the commit message
    pub subject: String,
    /// Time the commit landed
    pub commit_time: DateTime<Utc>,
}

/// A commit hash together with its global repo index
///
/// The index counts from the oldest commit (index 0) and fully determines
/// which tile and offset a commit's data lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexCommit {
    /// Position in history, oldest commit is 0
    pub index: usize,
    /// VCS hash
    pub hash: String,
    /// Time the commit landed
    pub timestamp: DateTime<Utc>,
}
