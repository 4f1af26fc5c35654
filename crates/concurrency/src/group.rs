//! Fail-fast fan-out over scoped threads
//!
//! [`TaskGroup`] runs independent tasks concurrently and waits for all of
//! them. The first task to fail cancels the group context, tasks that have
//! not started yet are skipped, and that first error is what the caller
//! sees. Results come back in submission order.
//!
//! ```ignore
//! let rows = TaskGroup::new(&ctx).run(
//!     (0..shards).map(|shard| move |ctx: &Context| read_shard(ctx, shard)).collect(),
//! )?;
//! ```

use crate::context::{Context, ContextError};
use parking_lot::Mutex;
use tracing::debug;

/// A fan-out/fan-in group bound to a parent context
#[derive(Debug, Clone)]
pub struct TaskGroup {
    ctx: Context,
    limit: Option<usize>,
}

impl TaskGroup {
    /// Create a group whose tasks observe a child of `ctx`
    pub fn new(ctx: &Context) -> Self {
        Self {
            ctx: ctx.clone(),
            limit: None,
        }
    }

    /// Run at most `limit` tasks at a time
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit.max(1));
        self
    }

    /// Run every task and collect the results in order
    ///
    /// Returns the first error produced by any task. A panic in a task is
    /// propagated to the caller.
    pub fn run<T, E, F>(self, tasks: Vec<F>) -> Result<Vec<T>, E>
    where
        F: FnOnce(&Context) -> Result<T, E> + Send,
        T: Send,
        E: From<ContextError> + Send,
    {
        self.ctx.check()?;
        if tasks.is_empty() {
            return Ok(Vec::new());
        }

        let group_ctx = self.ctx.with_cancel();
        let workers = self.limit.unwrap_or(tasks.len()).min(tasks.len());
        let n = tasks.len();

        let queue = Mutex::new(tasks.into_iter().enumerate());
        let results: Mutex<Vec<Option<T>>> = Mutex::new((0..n).map(|_| None).collect());
        let first_error: Mutex<Option<E>> = Mutex::new(None);

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    let (queue, results, first_error, ctx) = (&queue, &results, &first_error, &group_ctx);
                    scope.spawn(move || loop {
                        let next = queue.lock().next();
                        let Some((idx, task)) = next else { break };
                        if ctx.is_cancelled() {
                            break;
                        }
                        match task(ctx) {
                            Ok(value) => results.lock()[idx] = Some(value),
                            Err(e) => {
                                debug!(task = idx, "task failed, cancelling group");
                                let mut slot = first_error.lock();
                                if slot.is_none() {
                                    *slot = Some(e);
                                }
                                ctx.cancel();
                                break;
                            }
                        }
                    })
                })
                .collect();

            for handle in handles {
                if let Err(panic) = handle.join() {
                    std::panic::resume_unwind(panic);
                }
            }
        });

        if let Some(e) = first_error.into_inner() {
            return Err(e);
        }
        // Every task completed unless the parent was cancelled mid-flight.
        self.ctx.check()?;
        results
            .into_inner()
            .into_iter()
            .map(|r| r.ok_or_else(|| E::from(ContextError::Cancelled)))
            .collect()
    }
}

/// Run two differently-typed tasks concurrently, failing fast like [`TaskGroup`]
pub fn join<A, B, E, FA, FB>(ctx: &Context, fa: FA, fb: FB) -> Result<(A, B), E>
where
    FA: FnOnce(&Context) -> Result<A, E> + Send,
    FB: FnOnce(&Context) -> Result<B, E> + Send,
    A: Send,
    B: Send,
    E: From<ContextError> + Send,
{
    ctx.check()?;
    let group_ctx = ctx.with_cancel();
    let first_error: Mutex<Option<E>> = Mutex::new(None);

    let fail = |e: E| {
        let mut slot = first_error.lock();
        if slot.is_none() {
            *slot = Some(e);
        }
        group_ctx.cancel();
    };

    let (a, b) = std::thread::scope(|scope| {
        let handle = scope.spawn(|| fa(&group_ctx).map_err(&fail).ok());
        let b = fb(&group_ctx).map_err(&fail).ok();
        match handle.join() {
            Ok(a) => (a, b),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    });

    if let Some(e) = first_error.into_inner() {
        return Err(e);
    }
    match (a, b) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(E::from(ContextError::Cancelled)),
    }
}

/// Shorthand for `TaskGroup::new(ctx).run(tasks)`
pub fn fan_out<T, E, F>(ctx: &Context, tasks: Vec<F>) -> Result<Vec<T>, E>
where
    F: FnOnce(&Context) -> Result<T, E> + Send,
    T: Send,
    E: From<ContextError> + Send,
{
    TaskGroup::new(ctx).run(tasks)
}
