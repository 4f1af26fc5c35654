//! Served tiles: ignore rules, public filtering, caching and refresh.
//!
//! ```bash
//! cargo test --test tilesource
//! ```

#[path = "../common/mod.rs"]
mod common;

use common::*;
use chrono::Duration as ChronoDuration;
use goldtrace::gold_storage::BigTable;
use goldtrace::gold_tilesource::{ChangelistReconciler, IgnoreStore};
use goldtrace::prelude::*;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

const LINUX: &[(&str, &str)] = &[("name", "t"), ("os", "linux")];
const MAC: &[(&str, &str)] = &[("name", "t"), ("os", "mac")];

fn rule(id: &str, key: &str, value: &str, expires_in: ChronoDuration) -> IgnoreRule {
    IgnoreRule {
        id: id.to_string(),
        query: [(key.to_string(), vec![value.to_string()])].into_iter().collect(),
        expires: Utc::now() + expires_in,
        note: String::new(),
    }
}

fn wait_for(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    done()
}

#[test]
fn complex_tile_hides_ignored_traces() {
    let f = Fixture::new(6, 4, 2);
    f.put(2, &[(A, LINUX), (B, MAC)]);
    f.put(5, &[(C, LINUX)]);
    f.ignores.create(rule("r1", "os", "mac", ChronoDuration::hours(1)));
    f.ignores.create(rule("r2", "os", "linux", ChronoDuration::hours(-1)));

    let tile = f.gold.complex_tile(&f.ctx).unwrap();
    assert_eq!(tile.data_commits, vec![commit(2), commit(5)]);
    assert_eq!(tile.all_commits, (2..6).map(commit).collect::<Vec<_>>());
    assert_eq!(tile.get_tile(true).traces.len(), 2);
    assert_eq!(tile.get_tile(false).traces.len(), 1);
    assert_eq!(digests(tile.get_tile(false), LINUX), vec![A, C]);
    assert_eq!(tile.ignore_rules.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["r1"]);
    assert_eq!(tile.ignored_count(), 1);
}

#[test]
fn public_params_limit_both_views() {
    let config = GoldConfig::from_toml_str(
        r#"
        [trace_store]
        tile_size = 4
        shards = 2

        [[tile_source.public_params]]
        os = ["linux"]
        "#,
    )
    .unwrap();
    let f = Fixture::with_config(3, config);
    f.put(1, &[(A, LINUX), (B, MAC)]);

    let tile = f.gold.complex_tile(&f.ctx).unwrap();
    assert_eq!(tile.get_tile(true).traces.len(), 1);
    assert!(tile.get_tile(true).traces.contains(&trace_id(LINUX)));
    assert!(!tile.get_tile(true).param_set.contains("os", "mac"));
}

#[test]
fn tile_is_cached_until_refreshed() {
    let f = Fixture::new(4, 4, 1);
    f.put(0, &[(A, LINUX)]);
    let first = f.gold.complex_tile(&f.ctx).unwrap();

    f.put(3, &[(B, LINUX)]);
    let cached = f.gold.complex_tile(&f.ctx).unwrap();
    assert!(Arc::ptr_eq(&first, &cached));

    let refreshed = f.gold.refresh(&f.ctx).unwrap();
    assert_eq!(refreshed.data_commits, vec![commit(0), commit(3)]);
    assert!(!refreshed.from_same_commits(&first));
    assert!(Arc::ptr_eq(&refreshed, &f.gold.complex_tile(&f.ctx).unwrap()));
}

#[test]
fn background_refresh_picks_up_new_data() {
    let f = Fixture::new(4, 4, 1);
    f.put(0, &[(A, LINUX)]);
    f.gold.complex_tile(&f.ctx).unwrap();

    let handle = f.gold.start_background_refresh(Duration::from_millis(20)).unwrap();
    f.put(2, &[(B, LINUX)]);
    let seen = wait_for(Duration::from_secs(5), || {
        f.gold
            .tiles()
            .last_tile()
            .map_or(false, |t| t.data_commits.len() == 2)
    });
    handle.stop();
    assert!(seen);
}

#[test]
fn reconciler_sees_every_spanned_commit() {
    struct Recorder(Mutex<Vec<Vec<Commit>>>);

    impl ChangelistReconciler for Recorder {
        fn reconcile(&self, _ctx: &Context, commits: &[Commit]) -> goldtrace::gold_tilesource::Result<()> {
            self.0.lock().unwrap().push(commits.to_vec());
            Ok(())
        }
    }

    let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
    let store = Arc::new(goldtrace::gold_storage::InMemoryBigTable::new());
    let gold = Gold::builder()
        .tile_size(4)
        .shards(1)
        .store(Arc::clone(&store) as Arc<dyn BigTable>)
        .vcs(Arc::new(InMemoryVcs::with_commits(commits(5))))
        .ignore_store(Arc::new(InMemoryIgnoreStore::new()) as Arc<dyn IgnoreStore>)
        .reconciler(Arc::clone(&recorder) as Arc<dyn ChangelistReconciler>)
        .build()
        .unwrap();
    let ctx = Context::background();
    gold.put(&ctx, &commit(1).hash, &[Entry::new(A, params(LINUX))], ts(1)).unwrap();
    gold.complex_tile(&ctx).unwrap();

    assert!(wait_for(Duration::from_secs(5), || !recorder.0.lock().unwrap().is_empty()));
    assert_eq!(recorder.0.lock().unwrap()[0], (1..5).map(commit).collect::<Vec<_>>());
}

#[test]
fn failed_refresh_keeps_previous_tile() {
    let f = Fixture::new(2, 4, 1);
    f.put(1, &[(A, LINUX)]);
    let before = f.gold.refresh(&f.ctx).unwrap();

    let cancelled = f.ctx.with_cancel();
    cancelled.cancel();
    let err = f.gold.refresh(&cancelled).unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert!(Arc::ptr_eq(&before, &f.gold.tiles().last_tile().unwrap()));
}
