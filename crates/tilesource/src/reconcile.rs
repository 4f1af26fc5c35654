//! Commit to changelist reconciliation
//!
//! After every refresh the commits of the new tile are handed to a
//! reconciler, which links them to the code-review changelists that landed
//! them. It runs on its own thread; the tile is served without waiting and
//! failures are only logged.

use crate::error::Result;
use gold_concurrency::Context;
use gold_core::Commit;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error};

/// Links landed commits to their changelists
pub trait ChangelistReconciler: Send + Sync {
    /// Reconcile the given commits, oldest first
    fn reconcile(&self, ctx: &Context, commits: &[Commit]) -> Result<()>;
}

/// Run `reconciler` over `commits` on a detached thread
pub fn spawn_reconcile(
    reconciler: Arc<dyn ChangelistReconciler>,
    ctx: Context,
    commits: Vec<Commit>,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("gold-reconcile".into())
        .spawn(move || match reconciler.reconcile(&ctx, &commits) {
            Ok(()) => debug!(commits = commits.len(), "reconciled commits"),
            Err(e) => error!(error = %e, commits = commits.len(), "reconciling commits failed"),
        })
}
