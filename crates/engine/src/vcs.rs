//! Version control access
//!
//! The engine only needs a linear view of history: commit hashes with their
//! global index (oldest commit is 0) and the details shown with a tile.

use crate::error::{Error, Result};
use gold_concurrency::Context;
use gold_core::{Commit, IndexCommit};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Linear commit history
pub trait Vcs: Send + Sync {
    /// Pull new commits from upstream
    fn update(&self, ctx: &Context) -> Result<()>;

    /// Global index of a commit, `None` if unknown
    fn index_of(&self, ctx: &Context, hash: &str) -> Result<Option<usize>>;

    /// The newest `n` commits, oldest first
    fn last_n_index(&self, ctx: &Context, n: usize) -> Result<Vec<IndexCommit>>;

    /// Commits with index in `begin..end`, oldest first
    fn range(&self, ctx: &Context, begin: usize, end: usize) -> Result<Vec<IndexCommit>>;

    /// Full details of the given commits, in the order given
    ///
    /// Fails if any hash is unknown.
    fn details(&self, ctx: &Context, hashes: &[String]) -> Result<Vec<Commit>>;
}

impl<T: Vcs + ?Sized> Vcs for std::sync::Arc<T> {
    fn update(&self, ctx: &Context) -> Result<()> {
        (**self).update(ctx)
    }

    fn index_of(&self, ctx: &Context, hash: &str) -> Result<Option<usize>> {
        (**self).index_of(ctx, hash)
    }

    fn last_n_index(&self, ctx: &Context, n: usize) -> Result<Vec<IndexCommit>> {
        (**self).last_n_index(ctx, n)
    }

    fn range(&self, ctx: &Context, begin: usize, end: usize) -> Result<Vec<IndexCommit>> {
        (**self).range(ctx, begin, end)
    }

    fn details(&self, ctx: &Context, hashes: &[String]) -> Result<Vec<Commit>> {
        (**self).details(ctx, hashes)
    }
}

#[derive(Debug, Default)]
struct History {
    commits: Vec<Commit>,
    index: HashMap<String, usize>,
    staged: Vec<Commit>,
}

impl History {
    fn append(&mut self, commit: Commit) {
        self.index.insert(commit.hash.clone(), self.commits.len());
        self.commits.push(commit);
    }
}

/// In-process history for tests and simulation
///
/// Commits added with [`push`](Self::push) are staged and only become
/// visible after [`Vcs::update`], like commits landing upstream between
/// two pulls.
#[derive(Debug, Default)]
pub struct InMemoryVcs {
    history: RwLock<History>,
    updates: AtomicUsize,
}

impl InMemoryVcs {
    /// An empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// A history whose commits are visible immediately
    pub fn with_commits(commits: impl IntoIterator<Item = Commit>) -> Self {
        let vcs = Self::new();
        for commit in commits {
            vcs.push_visible(commit);
        }
        vcs
    }

    /// Stage a commit for the next update
    pub fn push(&self, commit: Commit) {
        self.history.write().staged.push(commit);
    }

    /// Append a commit that is visible right away
    pub fn push_visible(&self, commit: Commit) {
        self.history.write().append(commit);
    }

    /// Number of visible commits
    pub fn len(&self) -> usize {
        self.history.read().commits.len()
    }

    /// True if no commit is visible
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of times [`Vcs::update`] ran
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::Relaxed)
    }
}

fn index_commit(index: usize, commit: &Commit) -> IndexCommit {
    IndexCommit {
        index,
        hash: commit.hash.clone(),
        timestamp: commit.commit_time,
    }
}

impl Vcs for InMemoryVcs {
    fn update(&self, ctx: &Context) -> Result<()> {
        ctx.check()?;
        let mut history = self.history.write();
        let staged = std::mem::take(&mut history.staged);
        for commit in staged {
            history.append(commit);
        }
        self.updates.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn index_of(&self, ctx: &Context, hash: &str) -> Result<Option<usize>> {
        ctx.check()?;
        Ok(self.history.read().index.get(hash).copied())
    }

    fn last_n_index(&self, ctx: &Context, n: usize) -> Result<Vec<IndexCommit>> {
        ctx.check()?;
        let history = self.history.read();
        let begin = history.commits.len().saturating_sub(n);
        Ok(history.commits[begin..]
            .iter()
            .enumerate()
            .map(|(i, c)| index_commit(begin + i, c))
            .collect())
    }

    fn range(&self, ctx: &Context, begin: usize, end: usize) -> Result<Vec<IndexCommit>> {
        ctx.check()?;
        let history = self.history.read();
        let end = end.min(history.commits.len());
        if begin >= end {
            return Ok(Vec::new());
        }
        Ok(history.commits[begin..end]
            .iter()
            .enumerate()
            .map(|(i, c)| index_commit(begin + i, c))
            .collect())
    }

    fn details(&self, ctx: &Context, hashes: &[String]) -> Result<Vec<Commit>> {
        ctx.check()?;
        let history = self.history.read();
        hashes
            .iter()
            .map(|h| {
                history
                    .index
                    .get(h)
                    .map(|&i| history.commits[i].clone())
                    .ok_or_else(|| Error::Vcs(format!("unknown commit {}", h)))
            })
            .collect()
    }
}
