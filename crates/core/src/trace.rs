//! Traces and trace maps
//!
//! A [`Trace`] is the digest time series of one param combination. A
//! [`TraceMap`] holds the traces of a tile, all index-aligned: every trace
//! in a map has the same number of digests, one per commit slot.
//!
//! The map utilities here are what the engine uses to condense sparse tiles:
//! - [`TraceMap::commit_indices_with_data`] finds the columns that carry data
//! - [`TraceMap::make_from_commit_indexes`] projects onto those columns
//! - [`TraceMap::prepend_traces`] stitches an older map in front

use crate::digest::Digest;
use crate::error::{Error, Result};
use crate::params::{Params, TraceId};
use std::collections::hash_map::{self, HashMap};

/// Which end of a trace receives the padding when it grows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// Pad at the front (older side)
    Before,
    /// Pad at the back (newer side)
    After,
}

/// Digest time series for one param combination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    keys: Params,
    options: Params,
    digests: Vec<Digest>,
}

impl Trace {
    /// Create a trace from its keys and digests
    pub fn new(keys: Params, digests: Vec<Digest>) -> Self {
        Self {
            keys,
            options: Params::new(),
            digests,
        }
    }

    /// Create a trace of `n` missing digests
    pub fn new_empty(keys: Params, n: usize) -> Self {
        Self::new(keys, vec![Digest::missing(); n])
    }

    /// Identity params
    pub fn keys(&self) -> &Params {
        &self.keys
    }

    /// Options from the most recent write
    pub fn options(&self) -> &Params {
        &self.options
    }

    /// Replace the options
    pub fn set_options(&mut self, options: Params) {
        self.options = options;
    }

    /// Builder-style [`set_options`](Self::set_options)
    pub fn with_options(mut self, options: Params) -> Self {
        self.options = options;
        self
    }

    /// Digests, one per commit slot
    pub fn digests(&self) -> &[Digest] {
        &self.digests
    }

    /// Mutable digests
    pub fn digests_mut(&mut self) -> &mut [Digest] {
        &mut self.digests
    }

    /// Number of commit slots
    pub fn len(&self) -> usize {
        self.digests.len()
    }

    /// True if the trace has no commit slots
    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    /// True if slot `i` is missing or out of range
    pub fn is_missing(&self, i: usize) -> bool {
        self.digests.get(i).map(Digest::is_missing).unwrap_or(true)
    }

    /// True if any slot carries a digest
    pub fn has_data(&self) -> bool {
        self.digests.iter().any(|d| !d.is_missing())
    }

    /// Index of the newest slot that carries a digest
    pub fn last_index_with_data(&self) -> Option<usize> {
        self.digests.iter().rposition(|d| !d.is_missing())
    }

    /// Grow to `new_len` slots, padding with missing digests
    ///
    /// Does nothing if the trace is already at least `new_len` long.
    pub fn grow(&mut self, new_len: usize, fill: Fill) {
        let len = self.digests.len();
        if new_len <= len {
            return;
        }
        let pad = new_len - len;
        match fill {
            Fill::After => self.digests.resize(new_len, Digest::missing()),
            Fill::Before => {
                let mut digests = Vec::with_capacity(new_len);
                digests.resize(pad, Digest::missing());
                digests.append(&mut self.digests);
                self.digests = digests;
            }
        }
    }

    /// Keep only slots `begin..end`
    pub fn trim(&mut self, begin: usize, end: usize) -> Result<()> {
        let len = self.digests.len();
        if begin > end || end > len {
            return Err(Error::InvalidRange { begin, end, len });
        }
        self.digests.truncate(end);
        self.digests.drain(..begin);
        Ok(())
    }
}

/// Traces of a tile keyed by trace id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceMap(HashMap<TraceId, Trace>);

impl TraceMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty map with room for `capacity` traces
    pub fn with_capacity(capacity: usize) -> Self {
        Self(HashMap::with_capacity(capacity))
    }

    /// Insert a trace, returning the previous one
    pub fn insert(&mut self, id: TraceId, trace: Trace) -> Option<Trace> {
        self.0.insert(id, trace)
    }

    /// Look up a trace
    pub fn get(&self, id: &TraceId) -> Option<&Trace> {
        self.0.get(id)
    }

    /// Look up a trace mutably
    pub fn get_mut(&mut self, id: &TraceId) -> Option<&mut Trace> {
        self.0.get_mut(id)
    }

    /// Entry API passthrough
    pub fn entry(&mut self, id: TraceId) -> hash_map::Entry<'_, TraceId, Trace> {
        self.0.entry(id)
    }

    /// Remove a trace
    pub fn remove(&mut self, id: &TraceId) -> Option<Trace> {
        self.0.remove(id)
    }

    /// True if the map holds `id`
    pub fn contains(&self, id: &TraceId) -> bool {
        self.0.contains_key(id)
    }

    /// Number of traces
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the map holds no traces
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over traces
    pub fn iter(&self) -> hash_map::Iter<'_, TraceId, Trace> {
        self.0.iter()
    }

    /// Keep only the traces for which `f` returns true
    pub fn retain(&mut self, f: impl FnMut(&TraceId, &mut Trace) -> bool) {
        self.0.retain(f)
    }

    /// Common length of the traces, 0 for an empty map
    pub fn trace_len(&self) -> usize {
        self.0.values().next().map(Trace::len).unwrap_or(0)
    }

    /// True if every trace has exactly `n` slots
    pub fn is_aligned(&self, n: usize) -> bool {
        self.0.values().all(|t| t.len() == n)
    }

    /// Sorted offsets in `0..total` where at least one trace has a digest
    pub fn commit_indices_with_data(&self, total: usize) -> Vec<usize> {
        let mut has_data = vec![false; total];
        for trace in self.0.values() {
            for (i, d) in trace.digests.iter().take(total).enumerate() {
                if !d.is_missing() {
                    has_data[i] = true;
                }
            }
        }
        has_data
            .into_iter()
            .enumerate()
            .filter_map(|(i, present)| present.then_some(i))
            .collect()
    }

    /// Project every trace onto the given offsets, in the order given
    ///
    /// Offsets past the end of a trace yield missing digests.
    pub fn make_from_commit_indexes(&self, indices: &[usize]) -> TraceMap {
        let traces = self
            .0
            .iter()
            .map(|(id, trace)| {
                let digests = indices
                    .iter()
                    .map(|&i| trace.digests.get(i).cloned().unwrap_or_default())
                    .collect();
                let projected = Trace {
                    keys: trace.keys.clone(),
                    options: trace.options.clone(),
                    digests,
                };
                (id.clone(), projected)
            })
            .collect();
        TraceMap(traces)
    }

    /// Stitch `older` in front of this map
    ///
    /// Lengths are taken from the maps themselves; see
    /// [`prepend_traces_with_len`](Self::prepend_traces_with_len) when either
    /// map may be empty but still spans commits.
    pub fn prepend_traces(&mut self, older: &TraceMap) {
        let older_len = older.trace_len();
        let newer_len = self.trace_len();
        self.prepend_traces_with_len(older, older_len, newer_len);
    }

    /// Stitch `older` (spanning `older_len` slots) in front of this map
    /// (spanning `newer_len` slots)
    ///
    /// Afterwards every trace of either map has `older_len + newer_len`
    /// slots. Traces only in this map are padded at the front, traces only
    /// in `older` are padded at the back. Options of the newer trace win
    /// unless it has none.
    pub fn prepend_traces_with_len(&mut self, older: &TraceMap, older_len: usize, newer_len: usize) {
        let total = older_len + newer_len;
        for (id, trace) in self.0.iter_mut() {
            match older.0.get(id) {
                Some(old) => {
                    let mut digests = Vec::with_capacity(total);
                    digests.extend(old.digests.iter().cloned());
                    digests.resize(older_len, Digest::missing());
                    digests.append(&mut trace.digests);
                    trace.digests = digests;
                    if trace.options.is_empty() {
                        trace.options = old.options.clone();
                    }
                }
                None => trace.grow(total, Fill::Before),
            }
        }
        for (id, old) in older.0.iter() {
            if self.0.contains_key(id) {
                continue;
            }
            let mut trace = old.clone();
            trace.digests.resize(older_len, Digest::missing());
            trace.grow(total, Fill::After);
            self.0.insert(id.clone(), trace);
        }
    }
}

impl FromIterator<(TraceId, Trace)> for TraceMap {
    fn from_iter<I: IntoIterator<Item = (TraceId, Trace)>>(iter: I) -> Self {
        TraceMap(iter.into_iter().collect())
    }
}

impl IntoIterator for TraceMap {
    type Item = (TraceId, Trace);
    type IntoIter = hash_map::IntoIter<TraceId, Trace>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a TraceMap {
    type Item = (&'a TraceId, &'a Trace);
    type IntoIter = hash_map::Iter<'a, TraceId, Trace>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
    const C: &str = "cccccccccccccccccccccccccccccccc";

    fn keys(name: &str) -> Params {
        [("name".to_string(), name.to_string())].into_iter().collect()
    }

    fn trace(name: &str, digests: &[&str]) -> (TraceId, Trace) {
        let k = keys(name);
        let id = TraceId::from_params(&k);
        (id, Trace::new(k, digests.iter().map(|d| Digest::new(*d)).collect()))
    }

    fn digests(tm: &TraceMap, name: &str) -> Vec<String> {
        tm.get(&TraceId::from_params(&keys(name)))
            .unwrap()
            .digests()
            .iter()
            .map(|d| d.to_string())
            .collect()
    }

    #[test]
    fn test_commit_indices_with_data() {
        let tm: TraceMap = [trace("a", &[A, "", "", B]), trace("b", &["", "", C, ""])]
            .into_iter()
            .collect();
        assert_eq!(tm.commit_indices_with_data(4), vec![0, 2, 3]);
        assert_eq!(tm.commit_indices_with_data(3), vec![0, 2]);
        assert!(TraceMap::new().commit_indices_with_data(10).is_empty());
    }

    #[test]
    fn test_make_from_commit_indexes() {
        let tm: TraceMap = [trace("a", &[A, "", "", B]), trace("b", &["", "", C, ""])]
            .into_iter()
            .collect();
        let dense = tm.make_from_commit_indexes(&[0, 2, 3]);
        assert_eq!(digests(&dense, "a"), vec![A, "", B]);
        assert_eq!(digests(&dense, "b"), vec!["", C, ""]);
    }

    #[test]
    fn test_prepend_traces_pads_both_sides() {
        let mut newer: TraceMap = [trace("both", &[B]), trace("new", &[C])].into_iter().collect();
        let older: TraceMap = [trace("both", &[A, A]), trace("old", &[A, ""])].into_iter().collect();
        newer.prepend_traces(&older);

        assert_eq!(newer.len(), 3);
        assert!(newer.is_aligned(3));
        assert_eq!(digests(&newer, "both"), vec![A, A, B]);
        assert_eq!(digests(&newer, "new"), vec!["", "", C]);
        assert_eq!(digests(&newer, "old"), vec![A, "", ""]);
    }

    #[test]
    fn test_prepend_into_empty_map_with_len() {
        let mut newer = TraceMap::new();
        let older: TraceMap = [trace("old", &[A])].into_iter().collect();
        newer.prepend_traces_with_len(&older, 1, 2);
        assert_eq!(digests(&newer, "old"), vec![A, "", ""]);
    }

    #[test]
    fn test_prepend_keeps_newest_options() {
        let opts: Params = [("ext".to_string(), "png".to_string())].into_iter().collect();
        let (id, t) = trace("t", &[A]);
        let older: TraceMap = [(id.clone(), t.clone().with_options(opts.clone()))].into_iter().collect();
        let mut newer: TraceMap = [(id.clone(), t)].into_iter().collect();
        newer.prepend_traces(&older);
        assert_eq!(newer.get(&id).unwrap().options(), &opts);
    }

    #[test]
    fn test_trace_grow_and_trim() {
        let (_, mut t) = trace("t", &[A, B]);
        t.grow(4, Fill::Before);
        assert_eq!(t.digests(), &[Digest::missing(), Digest::missing(), Digest::new(A), Digest::new(B)]);
        t.grow(5, Fill::After);
        assert!(t.is_missing(4));
        assert_eq!(t.last_index_with_data(), Some(3));
        t.trim(2, 4).unwrap();
        assert_eq!(t.digests(), &[Digest::new(A), Digest::new(B)]);
        assert!(t.trim(1, 3).is_err());
        assert!(t.has_data());
    }

    fn arb_trace_map(len: usize) -> impl Strategy<Value = TraceMap> {
        prop::collection::hash_map(
            "[a-e]",
            prop::collection::vec(prop::bool::ANY, len),
            0..5,
        )
        .prop_map(|m| {
            m.into_iter()
                .map(|(name, present)| {
                    let digests = present.iter().map(|p| if *p { A } else { "" }).collect::<Vec<_>>();
                    trace(&name, &digests)
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_prepend_aligns_all_traces(
            (older_len, newer_len, older, mut newer) in (0usize..6, 0usize..6).prop_flat_map(|(o, n)| {
                (Just(o), Just(n), arb_trace_map(o), arb_trace_map(n))
            }),
        ) {
            let before = newer.clone();

            newer.prepend_traces_with_len(&older, older_len, newer_len);

            prop_assert!(newer.is_aligned(older_len + newer_len));
            for (id, t) in &newer {
                match (older.get(id), before.get(id)) {
                    (None, Some(n)) => {
                        prop_assert!((0..older_len).all(|i| t.is_missing(i)));
                        prop_assert_eq!(&t.digests()[older_len..], n.digests());
                    }
                    (Some(o), None) => {
                        prop_assert!((older_len..older_len + newer_len).all(|i| t.is_missing(i)));
                        prop_assert_eq!(&t.digests()[..older_len], o.digests());
                    }
                    (Some(o), Some(n)) => {
                        prop_assert_eq!(&t.digests()[..older_len], o.digests());
                        prop_assert_eq!(&t.digests()[older_len..], n.digests());
                    }
                    (None, None) => prop_assert!(false, "trace appeared from nowhere"),
                }
            }
        }

        #[test]
        fn prop_projection_keeps_only_data_columns(m in arb_trace_map(8)) {
            let idx = m.commit_indices_with_data(8);
            let dense = m.make_from_commit_indexes(&idx);
            prop_assert!(dense.is_aligned(idx.len()));
            prop_assert_eq!(dense.commit_indices_with_data(idx.len()), (0..idx.len()).collect::<Vec<_>>());
        }
    }
}
