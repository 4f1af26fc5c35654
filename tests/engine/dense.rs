//! Dense tiles: the newest commits that carry data, wherever they live.

use crate::common::*;
use goldtrace::prelude::*;
use proptest::prelude::*;
use std::collections::BTreeSet;

const T: &[(&str, &str)] = &[("name", "t")];

#[test]
fn dense_tile_spans_storage_tiles() {
    let f = Fixture::new(20, 4, 2);
    for i in [2, 3, 9, 17] {
        f.put(i, &[(A, T)]);
    }

    let (tile, all) = f.gold.dense_tile(&f.ctx, 3).unwrap();
    assert_eq!(tile.commits, vec![commit(3), commit(9), commit(17)]);
    assert_eq!(digests(&tile, T), vec![A, A, A]);
    assert_eq!(all, (3..20).map(commit).collect::<Vec<_>>());
}

#[test]
fn fewer_data_commits_than_requested() {
    let f = Fixture::new(12, 4, 1);
    f.put(5, &[(B, T)]);

    let (tile, all) = f.gold.dense_tile(&f.ctx, 10).unwrap();
    assert_eq!(tile.commits, vec![commit(5)]);
    assert_eq!(all.len(), 7);
}

#[test]
fn no_data_gives_empty_tile() {
    let f = Fixture::new(12, 4, 1);
    let (tile, all) = f.gold.dense_tile(&f.ctx, 5).unwrap();
    assert!(tile.commits.is_empty());
    assert!(tile.traces.is_empty());
    assert!(all.is_empty());
}

#[test]
fn empty_history_is_an_error() {
    let f = Fixture::new(0, 4, 1);
    let err = f.gold.dense_tile(&f.ctx, 5).unwrap_err();
    assert!(matches!(err, Error::NoCommits));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// The dense tile holds exactly the newest `n` commits with data, each
    /// digest lands in its own column, and the span runs to the newest commit.
    #[test]
    fn dense_tile_matches_placement(
        (total, data) in (1usize..30).prop_flat_map(|total| {
            (Just(total), proptest::collection::btree_set(0..total, 0..=total.min(12)))
        }),
        n in 1usize..8,
        tile_size in 1usize..6,
    ) {
        let f = Fixture::new(total, tile_size, 3);
        let data: BTreeSet<usize> = data;
        for &i in &data {
            let digest = if i % 2 == 0 { A } else { B };
            f.put(i, &[(digest, T)]);
        }

        let (tile, all) = f.gold.dense_tile(&f.ctx, n).unwrap();
        let expected: Vec<usize> = data.iter().rev().take(n).rev().copied().collect();
        prop_assert_eq!(&tile.commits, &expected.iter().map(|&i| commit(i)).collect::<Vec<_>>());

        let want: Vec<String> = expected
            .iter()
            .map(|&i| (if i % 2 == 0 { A } else { B }).to_string())
            .collect();
        if expected.is_empty() {
            prop_assert!(tile.traces.is_empty());
            prop_assert!(all.is_empty());
        } else {
            prop_assert_eq!(digests(&tile, T), want);
            prop_assert_eq!(all, (expected[0]..total).map(commit).collect::<Vec<_>>());
        }
    }
}
