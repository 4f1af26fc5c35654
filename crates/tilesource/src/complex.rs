//! The tile served to the frontend

use crate::ignore::IgnoreRule;
use gold_core::{Commit, Tile};
use std::sync::Arc;

/// A dense tile with and without ignored traces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexTile {
    /// Every (public) trace
    pub tile_with_ignores: Arc<Tile>,
    /// Traces not matched by any active ignore rule
    pub tile_without_ignores: Arc<Tile>,
    /// Rules that were active when the tile was built
    pub ignore_rules: Vec<IgnoreRule>,
    /// Commits with data, the columns of both tiles
    pub data_commits: Vec<Commit>,
    /// Every commit from the oldest data commit to the newest commit
    pub all_commits: Vec<Commit>,
}

impl ComplexTile {
    /// The tile for a view
    pub fn get_tile(&self, include_ignored: bool) -> &Arc<Tile> {
        if include_ignored {
            &self.tile_with_ignores
        } else {
            &self.tile_without_ignores
        }
    }

    /// True if both tiles cover the same commits
    pub fn from_same_commits(&self, other: &ComplexTile) -> bool {
        self.data_commits == other.data_commits && self.all_commits == other.all_commits
    }

    /// Number of traces hidden by ignore rules
    pub fn ignored_count(&self) -> usize {
        self.tile_with_ignores
            .traces
            .len()
            .saturating_sub(self.tile_without_ignores.traces.len())
    }
}
