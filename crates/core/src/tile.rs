//! Query-time tiles
//!
//! A [`Tile`] is a commit-by-trace matrix assembled from storage. It has no
//! persisted identity; it is a read-only snapshot built per query.

use crate::params::ParamSet;
use crate::trace::{Trace, TraceMap};
use crate::types::Commit;

/// Commits, the traces over them, and the union of the trace params
///
/// Every trace holds exactly `commits.len()` digests, index-aligned with
/// `commits`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tile {
    /// Commits in chronological order
    pub commits: Vec<Commit>,
    /// Traces keyed by trace id
    pub traces: TraceMap,
    /// Union of the params of every trace, normalized
    pub param_set: ParamSet,
}

impl Tile {
    /// Assemble a tile, computing the param set from the traces
    pub fn new(commits: Vec<Commit>, traces: TraceMap) -> Self {
        let mut tile = Tile {
            commits,
            traces,
            param_set: ParamSet::new(),
        };
        tile.recompute_param_set();
        tile
    }

    /// Rebuild the param set from the current traces
    pub fn recompute_param_set(&mut self) {
        let mut ps = ParamSet::new();
        for (_, trace) in &self.traces {
            ps.add_params(trace.keys());
        }
        ps.normalize();
        self.param_set = ps;
    }

    /// True if every trace has one digest per commit
    pub fn is_aligned(&self) -> bool {
        self.traces.is_aligned(self.commits.len())
    }

    /// Offset of the newest commit that has data in any trace
    pub fn last_commit_index(&self) -> Option<usize> {
        self.traces
            .iter()
            .filter_map(|(_, t)| t.last_index_with_data())
            .max()
    }

    /// A copy keeping only the traces accepted by `keep`
    ///
    /// The param set is recomputed from the surviving traces.
    pub fn filtered(&self, mut keep: impl FnMut(&Trace) -> bool) -> Tile {
        let traces = self
            .traces
            .iter()
            .filter(|(_, t)| keep(t))
            .map(|(id, t)| (id.clone(), t.clone()))
            .collect();
        Tile::new(self.commits.clone(), traces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::Digest;
    use crate::params::{Params, TraceId};
    use chrono::{TimeZone, Utc};

    fn commit(hash: &str) -> Commit {
        Commit {
            hash: hash.into(),
            author: "a@example.com".into(),
            subject: "subject".into(),
            commit_time: Utc.timestamp_opt(1_600_000_000, 0).unwrap(),
        }
    }

    fn trace(os: &str, digests: &[&str]) -> (TraceId, Trace) {
        let keys: Params = [("os".to_string(), os.to_string()), ("name".to_string(), "t".to_string())]
            .into_iter()
            .collect();
        (
            TraceId::from_params(&keys),
            Trace::new(keys, digests.iter().map(|d| Digest::new(*d)).collect()),
        )
    }

    #[test]
    fn test_new_computes_param_set() {
        let tile = Tile::new(
            vec![commit("c1"), commit("c2")],
            [trace("mac", &["", "x"]), trace("linux", &["y", ""])].into_iter().collect(),
        );
        assert!(tile.is_aligned());
        assert_eq!(tile.param_set.get("os").unwrap(), &["linux".to_string(), "mac".to_string()]);
        assert_eq!(tile.last_commit_index(), Some(1));
    }

    #[test]
    fn test_filtered_recomputes_param_set() {
        let tile = Tile::new(
            vec![commit("c1")],
            [trace("mac", &["x"]), trace("linux", &["y"])].into_iter().collect(),
        );
        let only_mac = tile.filtered(|t| t.keys()["os"] == "mac");
        assert_eq!(only_mac.traces.len(), 1);
        assert_eq!(only_mac.param_set.get("os").unwrap(), &["mac".to_string()]);
        assert_eq!(only_mac.commits, tile.commits);
    }
}
