//! Fixed pool of exclusive execution contexts.
//!
//! The pool owns one [`ExecutorHandle`] per configured worker. [`WorkerPool::checkout`]
//! waits (without a timeout; admission control bounds waiting upstream) until
//! a handle is idle, resets it, and lends it out as a [`PooledExecutor`].
//! Dropping the guard returns the handle. A handle is therefore owned by
//! exactly one request at a time and is never destroyed mid-request, even
//! when its task fails.
//!
//! Internally a semaphore with one permit per handle gates a free list of
//! handle indices. An index goes back on the free list before its permit is
//! released, so a permit holder always finds an idle handle.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use shard::{ExecutionError, ExecutorIndex, TaskExecutor, TaskResult};
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, OwnedSemaphorePermit, Semaphore};
use tracing::debug;

// ---------------------------------------------------------------------------
// Executor handle
// ---------------------------------------------------------------------------

/// One execution context plus the output buffer it writes into.
pub struct ExecutorHandle {
    index: ExecutorIndex,
    executor: Box<dyn TaskExecutor>,
    output: String,
}

impl ExecutorHandle {
    /// Wraps an execution context at position `index` in the pool.
    pub fn new(index: ExecutorIndex, executor: Box<dyn TaskExecutor>) -> Self {
        Self {
            index,
            executor,
            output: String::new(),
        }
    }

    /// Position of this handle in the pool.
    pub fn index(&self) -> ExecutorIndex {
        self.index
    }

    /// Output of the most recent task, empty after a reset.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Discards all state from the previous call.
    pub fn reset(&mut self) {
        self.output.clear();
        self.executor.reset();
    }

    /// Runs one task on this context.
    ///
    /// A non-zero engine status becomes [`ExecutionError::Failed`] carrying
    /// whatever partial output the engine produced.
    pub async fn run(&mut self, task: &str) -> Result<TaskResult, ExecutionError> {
        let raw = self.executor.execute(task).await?;
        self.output.clear();
        self.output.push_str(&raw.output);

        if !raw.is_success() {
            return Err(ExecutionError::Failed {
                code: raw.error_code,
                partial_output: raw.output,
            });
        }
        Ok(TaskResult {
            output: raw.output,
            phase: raw.phase,
        })
    }
}

impl std::fmt::Debug for ExecutorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorHandle")
            .field("index", &self.index)
            .field("output_len", &self.output.len())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Pool
// ---------------------------------------------------------------------------

/// Errors from constructing or using a [`WorkerPool`].
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum PoolError {
    /// A pool must own at least one execution context.
    #[error("Worker pool needs at least one executor")]
    Empty,

    /// The pool was closed for shutdown.
    #[error("Worker pool is closed")]
    Closed,
}

struct PoolInner {
    handles: Vec<Arc<AsyncMutex<ExecutorHandle>>>,
    idle: Mutex<Vec<usize>>,
    permits: Arc<Semaphore>,
}

impl PoolInner {
    fn idle(&self) -> MutexGuard<'_, Vec<usize>> {
        // Only indices move in and out under the lock, so a poisoned list is
        // still consistent.
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// An index popped from the idle list, pushed back on drop unless claimed.
struct IdleSlot<'a> {
    pool: &'a PoolInner,
    index: usize,
    claimed: bool,
}

impl<'a> IdleSlot<'a> {
    fn take(pool: &'a PoolInner) -> Option<Self> {
        let index = pool.idle().pop()?;
        Some(Self {
            pool,
            index,
            claimed: false,
        })
    }

    fn claim(mut self) {
        self.claimed = true;
    }
}

impl Drop for IdleSlot<'_> {
    fn drop(&mut self) {
        if !self.claimed {
            self.pool.idle().push(self.index);
        }
    }
}

/// Bounded pool of exclusive execution contexts. Cloning shares the pool.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

impl WorkerPool {
    /// Builds a pool that owns `executors`, one handle each.
    ///
    /// The pool size is fixed for the lifetime of the pool.
    pub fn new(executors: Vec<Box<dyn TaskExecutor>>) -> Result<Self, PoolError> {
        if executors.is_empty() {
            return Err(PoolError::Empty);
        }
        let size = executors.len();
        let handles = executors
            .into_iter()
            .enumerate()
            .map(|(i, executor)| {
                Arc::new(AsyncMutex::new(ExecutorHandle::new(ExecutorIndex::new(i), executor)))
            })
            .collect();

        Ok(Self {
            inner: Arc::new(PoolInner {
                handles,
                // Reversed so the first checkout gets handle #0.
                idle: Mutex::new((0..size).rev().collect()),
                permits: Arc::new(Semaphore::new(size)),
            }),
        })
    }

    /// Number of handles owned by the pool.
    pub fn size(&self) -> usize {
        self.inner.handles.len()
    }

    /// Number of handles currently checked out.
    pub fn in_use(&self) -> usize {
        self.size() - self.inner.permits.available_permits()
    }

    /// Waits for an idle handle, resets it, and lends it to the caller.
    pub async fn checkout(&self) -> Result<PooledExecutor, PoolError> {
        let permit = self
            .inner
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;
        let slot = IdleSlot::take(&self.inner).ok_or(PoolError::Closed)?;
        // The previous holder may still be releasing the lock; the slot puts the
        // index back if this future is dropped while waiting.
        let mut handle = Arc::clone(&self.inner.handles[slot.index]).lock_owned().await;
        slot.claim();
        handle.reset();
        debug!(executor = %handle.index(), in_use = self.in_use(), "Executor checked out");

        Ok(PooledExecutor {
            handle,
            pool: Arc::clone(&self.inner),
            _permit: permit,
        })
    }

    /// Stops lending handles; pending and future checkouts fail with
    /// [`PoolError::Closed`]. Handles already lent out are still returned.
    pub fn close(&self) {
        self.inner.permits.close();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("size", &self.size())
            .field("in_use", &self.in_use())
            .finish()
    }
}

/// A handle on loan from the pool; returned when dropped.
pub struct PooledExecutor {
    handle: OwnedMutexGuard<ExecutorHandle>,
    pool: Arc<PoolInner>,
    // Declared last: released only after the handle's lock is.
    _permit: OwnedSemaphorePermit,
}

impl Deref for PooledExecutor {
    type Target = ExecutorHandle;

    fn deref(&self) -> &ExecutorHandle {
        &self.handle
    }
}

impl DerefMut for PooledExecutor {
    fn deref_mut(&mut self) -> &mut ExecutorHandle {
        &mut self.handle
    }
}

impl std::fmt::Debug for PooledExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledExecutor")
            .field("handle", &*self.handle)
            .finish()
    }
}

impl Drop for PooledExecutor {
    fn drop(&mut self) {
        let index = self.handle.index();
        debug!(executor = %index, "Executor returned");
        self.pool.idle().push(index.as_usize());
    }
}
