//! Concurrent ingestion into shared tiles.

use crate::common::*;
use goldtrace::prelude::*;
use std::sync::Barrier;
use std::thread;

const T: &[(&str, &str)] = &[("name", "t")];

#[test]
fn concurrent_puts_share_one_dictionary() {
    const WRITERS: usize = 8;
    let f = Arc::new(Fixture::new(WRITERS, 16, 4));
    let barrier = Arc::new(Barrier::new(WRITERS));

    let handles: Vec<_> = (0..WRITERS)
        .map(|w| {
            let f = Arc::clone(&f);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let name = format!("writer_{}", w);
                let entries = vec![
                    Entry::new(A, params(&[("name", name.as_str()), ("os", "linux")])),
                    Entry::new(B, params(&[("name", "shared"), ("os", "linux")])),
                ];
                barrier.wait();
                f.gold.put(&f.ctx, &commit(w).hash, &entries, ts(w as i64)).unwrap();
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let (tile, _) = f.gold.tile(&f.ctx, WRITERS).unwrap();
    assert_eq!(tile.traces.len(), WRITERS + 1);
    assert_eq!(digests(&tile, &[("name", "shared"), ("os", "linux")]), vec![B; WRITERS]);
    for w in 0..WRITERS {
        let name = format!("writer_{}", w);
        let row = digests(&tile, &[("name", name.as_str()), ("os", "linux")]);
        assert_eq!(row[w], A);
        assert_eq!(row.iter().filter(|d| !d.is_empty()).count(), 1);
    }

    // A second reader with no cached dictionary sees the same tile.
    let fresh = goldtrace::gold_engine::BtTraceStore::new(
        f.gold.config().trace_store.clone(),
        Arc::clone(f.gold.store()),
        Arc::clone(f.gold.vcs()),
    )
    .unwrap();
    let (again, _) = fresh.get_tile(&f.ctx, WRITERS).unwrap();
    assert_eq!(again, tile);
}

#[test]
fn readers_run_alongside_writers() {
    let f = Arc::new(Fixture::new(40, 8, 4));
    let writer = {
        let f = Arc::clone(&f);
        thread::spawn(move || {
            for i in 0..40 {
                f.put(i, &[(C, T)]);
            }
        })
    };
    let readers: Vec<_> = (0..3)
        .map(|_| {
            let f = Arc::clone(&f);
            thread::spawn(move || {
                for _ in 0..20 {
                    let (tile, _) = f.gold.dense_tile(&f.ctx, 5).unwrap();
                    assert!(tile.is_aligned());
                }
            })
        })
        .collect();
    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }

    let (tile, _) = f.gold.dense_tile(&f.ctx, 5).unwrap();
    assert_eq!(tile.commits, (35..40).map(commit).collect::<Vec<_>>());
}
