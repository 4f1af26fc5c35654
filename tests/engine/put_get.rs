//! Writes read back at the right commit, across tiles and shards.

use crate::common::*;
use goldtrace::gold_engine::keys::NAMESPACE;
use goldtrace::prelude::*;

const NAME_T: &[(&str, &str)] = &[("name", "t"), ("os", "linux")];
const NAME_U: &[(&str, &str)] = &[("name", "u"), ("os", "mac")];

#[test]
fn put_then_tile_returns_digests_in_place() {
    let f = Fixture::new(6, 4, 3);
    f.put(1, &[(A, NAME_T), (B, NAME_U)]);
    f.put(4, &[(C, NAME_T)]);

    let (tile, commits) = f.gold.tile(&f.ctx, 6).unwrap();
    assert_eq!(commits, commits_range(0, 6));
    assert_eq!(tile.commits, commits);
    assert_eq!(digests(&tile, NAME_T), vec!["", A, "", "", C, ""]);
    assert_eq!(digests(&tile, NAME_U), vec!["", B, "", "", "", ""]);
    assert!(tile.param_set.contains("os", "mac"));
}

#[test]
fn tile_window_drops_traces_without_data() {
    let f = Fixture::new(10, 4, 2);
    f.put(0, &[(A, NAME_U)]);
    f.put(9, &[(B, NAME_T)]);

    let (tile, commits) = f.gold.tile(&f.ctx, 3).unwrap();
    assert_eq!(commits, commits_range(7, 10));
    assert_eq!(tile.traces.len(), 1);
    assert_eq!(digests(&tile, NAME_T), vec!["", "", B]);
}

#[test]
fn later_timestamp_wins_regardless_of_order() {
    let f = Fixture::new(2, 4, 1);
    let hash = commit(1).hash;
    let entry = |d: &str| vec![Entry::new(d, params(NAME_T))];
    f.gold.put(&f.ctx, &hash, &entry(B), ts(100)).unwrap();
    f.gold.put(&f.ctx, &hash, &entry(A), ts(50)).unwrap();
    f.gold.put(&f.ctx, &hash, &entry(C), ts(50)).unwrap();

    let (tile, _) = f.gold.tile(&f.ctx, 2).unwrap();
    assert_eq!(digests(&tile, NAME_T), vec!["", B]);
}

#[test]
fn new_commits_are_picked_up_after_vcs_update() {
    let f = Fixture::new(2, 4, 1);
    f.vcs.push(commit(2));
    f.put(2, &[(A, NAME_T)]);

    let (tile, commits) = f.gold.tile(&f.ctx, 1).unwrap();
    assert_eq!(commits, vec![commit(2)]);
    assert_eq!(digests(&tile, NAME_T), vec![A]);
}

#[test]
fn unknown_commit_is_not_found() {
    let f = Fixture::new(2, 4, 1);
    let err = f
        .gold
        .put(&f.ctx, "deadbeef", &[Entry::new(A, params(NAME_T))], ts(0))
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn rows_are_sharded_and_dictionaries_unsharded() {
    let f = Fixture::new(1, 4, 5);
    let rows: Vec<(String, Vec<(&str, &str)>)> = (0..40)
        .map(|i| (format!("test_{}", i), vec![("os", "linux")]))
        .collect();
    let entries: Vec<Entry> = rows
        .iter()
        .map(|(name, rest)| {
            let mut p = params(rest);
            p.insert("name".into(), name.clone());
            Entry::new(A, p)
        })
        .collect();
    f.gold.put(&f.ctx, &commit(0).hash, &entries, ts(0)).unwrap();

    let keys = f.store.row_keys(&f.gold.config().trace_store.table);
    let ops: Vec<&String> = keys.iter().filter(|k| k.starts_with(':')).collect();
    assert_eq!(ops.len(), 1);
    assert!(ops[0].starts_with(&format!(":{}:", NAMESPACE)));

    let shards: std::collections::BTreeSet<&str> =
        keys.iter().filter(|k| !k.starts_with(':')).map(|k| &k[..2]).collect();
    assert!(shards.len() > 1);
    assert!(shards.iter().all(|s| s.parse::<u32>().unwrap() < 5));

    let (tile, _) = f.gold.tile(&f.ctx, 1).unwrap();
    assert_eq!(tile.traces.len(), 40);
}

#[test]
fn failed_put_is_reported_and_retryable() {
    let f = Fixture::new(1, 4, 1);
    f.store.fail_next_writes(1);
    let err = f
        .gold
        .put(&f.ctx, &commit(0).hash, &[Entry::new(A, params(NAME_T))], ts(0))
        .unwrap_err();
    assert!(err.is_retryable());

    f.put(0, &[(A, NAME_T)]);
    let (tile, _) = f.gold.tile(&f.ctx, 1).unwrap();
    assert_eq!(digests(&tile, NAME_T), vec![A]);
}

fn commits_range(begin: usize, end: usize) -> Vec<Commit> {
    (begin..end).map(commit).collect()
}
