//! Synthetic ingestion.
//!
//! Generates a commit history where some commits produce no data, writes
//! random digests for a fixed set of traces, then reads the served tile
//! back. Everything runs against the in-memory store.

use crate::parse::SimulateArgs;
use chrono::{Duration, TimeZone};
use goldtrace::gold_tilesource::IgnoreStore;
use goldtrace::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

const OSES: &[&str] = &["android", "linux", "mac", "win"];
const CONFIGS: &[&str] = &["8888", "gles", "pdf"];
const DIGESTS_PER_TRACE: usize = 4;
const PRESENT_PROBABILITY: f64 = 0.7;

/// What the simulator wrote and read back.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub commits: usize,
    pub commits_with_data: usize,
    pub entries_written: usize,
    pub dense_commits: usize,
    pub spanned_commits: usize,
    pub first_dense_commit: Option<String>,
    pub last_dense_commit: Option<String>,
    pub traces: usize,
    pub traces_without_ignored: usize,
    pub ignore_rules: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dump: Vec<TraceDump>,
}

/// One row of the dense tile.
#[derive(Debug, Clone, Serialize)]
pub struct TraceDump {
    pub id: String,
    pub ignored: bool,
    pub digests: Vec<String>,
}

struct SyntheticTrace {
    params: Params,
    digests: Vec<Digest>,
}

fn synthetic_commits(n: usize) -> Vec<Commit> {
    let start = Utc.timestamp_opt(1_600_000_000, 0).single().unwrap_or_else(Utc::now);
    (0..n)
        .map(|i| Commit {
            hash: format!("{:040x}", i + 1),
            author: format!("dev{}@example.com", i % 5),
            subject: format!("Change #{}", i + 1),
            commit_time: start + Duration::minutes(i as i64 * 10),
        })
        .collect()
}

fn synthetic_traces(rng: &mut StdRng, n: usize) -> Vec<SyntheticTrace> {
    (0..n)
        .map(|i| {
            let mut params = Params::new();
            params.insert("name".to_string(), format!("test_{:03}", i));
            params.insert("os".to_string(), OSES.choose(rng).copied().unwrap_or("linux").to_string());
            params.insert("config".to_string(), CONFIGS.choose(rng).copied().unwrap_or("8888").to_string());
            let digests = (0..DIGESTS_PER_TRACE)
                .map(|_| Digest::new(format!("{:032x}", rng.gen::<u128>())))
                .collect();
            SyntheticTrace { params, digests }
        })
        .collect()
}

fn ignore_rules(pairs: &[(String, String)]) -> Vec<IgnoreRule> {
    let expires = Utc::now() + Duration::days(1);
    pairs
        .iter()
        .enumerate()
        .map(|(i, (key, value))| IgnoreRule {
            id: format!("cli-{}", i),
            query: [(key.clone(), vec![value.clone()])].into_iter().collect(),
            expires,
            note: "added from the command line".to_string(),
        })
        .collect()
}

/// Run the simulation described by `args`.
pub fn run(config: GoldConfig, args: &SimulateArgs) -> Result<SimulationReport> {
    let mut rng = StdRng::seed_from_u64(args.seed);
    let commits = synthetic_commits(args.commits);
    let traces = synthetic_traces(&mut rng, args.traces);

    let ignores = Arc::new(InMemoryIgnoreStore::new());
    let rules = ignore_rules(&args.ignore);
    for rule in &rules {
        ignores.create(rule.clone());
    }

    let mut builder = Gold::builder()
        .config(config)
        .vcs(Arc::new(InMemoryVcs::with_commits(commits.clone())))
        .ignore_store(ignores as Arc<dyn IgnoreStore>);
    if let Some(n) = args.n_commits {
        builder = builder.n_commits(n);
    }
    let gold = builder.build()?;
    let ctx = Context::background();

    let mut commits_with_data = 0;
    let mut entries_written = 0;
    for (i, commit) in commits.iter().enumerate() {
        if args.empty_every > 0 && i % args.empty_every == 0 {
            continue;
        }
        let mut entries = Vec::new();
        for t in &traces {
            if rng.gen_bool(PRESENT_PROBABILITY) {
                let digest = t.digests[rng.gen_range(0..t.digests.len())].clone();
                entries.push(Entry::new(digest, t.params.clone()));
            }
        }
        if entries.is_empty() {
            continue;
        }
        gold.put(&ctx, &commit.hash, &entries, Utc::now())?;
        debug!(commit = %commit.hash, entries = entries.len(), "ingested");
        commits_with_data += 1;
        entries_written += entries.len();
    }
    info!(commits_with_data, entries_written, "ingestion done");

    let complex = gold.complex_tile(&ctx)?;
    let with = complex.get_tile(true);
    let without = complex.get_tile(false);

    let mut dump: Vec<TraceDump> = Vec::new();
    if args.dump {
        dump = with
            .traces
            .iter()
            .map(|(id, trace)| TraceDump {
                id: id.to_string(),
                ignored: !without.traces.contains(id),
                digests: trace.digests().iter().map(|d| d.to_string()).collect(),
            })
            .collect();
        dump.sort_by(|a, b| a.id.cmp(&b.id));
    }

    Ok(SimulationReport {
        commits: commits.len(),
        commits_with_data,
        entries_written,
        dense_commits: complex.data_commits.len(),
        spanned_commits: complex.all_commits.len(),
        first_dense_commit: complex.data_commits.first().map(|c| c.hash.clone()),
        last_dense_commit: complex.data_commits.last().map(|c| c.hash.clone()),
        traces: with.traces.len(),
        traces_without_ignored: without.traces.len(),
        ignore_rules: complex.ignore_rules.len(),
        dump,
    })
}
