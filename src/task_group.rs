use std::sync::{Arc, Condvar, Mutex};

use crate::{Result, ThreadPool};

/// Completion state shared by a group and its in-flight tasks.
struct Inner {
    pending: Mutex<usize>,
    done: Condvar,
}

/// Tracks completion of a batch of submitted tasks.
///
/// Each submission through the group increments a pending counter and
/// wraps the job so the counter is decremented after the job finishes,
/// even if it panics. [`wait`](Self::wait) blocks until the counter
/// reaches zero, after which the group can be reused for a new batch.
///
/// Clones share the same counter, so a group can be handed to several
/// submitting threads while another thread waits.
///
/// # Example
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use taskpool::{TaskGroup, ThreadPool};
///
/// let mut pool = ThreadPool::new(2)?;
/// pool.start()?;
///
/// let group = TaskGroup::new();
/// let counter = Arc::new(AtomicUsize::new(0));
/// for _ in 0..10 {
///     let counter = Arc::clone(&counter);
///     group.submit(&pool, move || {
///         counter.fetch_add(1, Ordering::Relaxed);
///     })?;
/// }
/// group.wait();
/// assert_eq!(counter.load(Ordering::Relaxed), 10);
/// # Ok::<(), taskpool::PoolError>(())
/// ```
#[derive(Clone)]
pub struct TaskGroup {
    inner: Arc<Inner>,
}

impl TaskGroup {
    /// Creates an empty group.
    pub fn new() -> Self {
        TaskGroup {
            inner: Arc::new(Inner {
                pending: Mutex::new(0),
                done: Condvar::new(),
            }),
        }
    }

    /// Submits a job to `pool`, tracking it in this group.
    ///
    /// # Errors
    ///
    /// Forwards the pool's error if the submission is rejected; the
    /// pending count is rolled back so a later [`wait`](Self::wait)
    /// does not block on a job that was never queued.
    pub fn submit<F>(&self, pool: &ThreadPool, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let completion = CompletionGuard::new(Arc::clone(&self.inner));
        // If the pool rejects the job, the closure is dropped and the
        // guard rolls the count back.
        pool.submit(move || {
            let _completion = completion;
            job();
        })
    }

    /// Submits a job that takes ownership of a typed context value,
    /// tracking it in this group.
    pub fn submit_with<T, F>(&self, pool: &ThreadPool, value: T, func: F) -> Result<()>
    where
        T: Send + 'static,
        F: FnOnce(T) + Send + 'static,
    {
        self.submit(pool, move || func(value))
    }

    /// Blocks until every task submitted through this group has
    /// finished running.
    ///
    /// Returns immediately if no tasks are outstanding. Afterwards
    /// the group tracks only tasks submitted for the next batch.
    pub fn wait(&self) {
        let mut pending = self.inner.pending.lock().unwrap();
        while *pending > 0 {
            pending = self.inner.done.wait(pending).unwrap();
        }
    }

    /// The number of tasks submitted through this group that have not
    /// yet finished.
    pub fn pending(&self) -> usize {
        *self.inner.pending.lock().unwrap()
    }
}

impl Default for TaskGroup {
    fn default() -> Self {
        Self::new()
    }
}

/// Increments the group's pending count on creation and decrements it
/// on drop. Captured by the wrapped task, so completion is signaled
/// whether the job returns, panics, or is never queued at all.
struct CompletionGuard {
    inner: Arc<Inner>,
}

impl CompletionGuard {
    fn new(inner: Arc<Inner>) -> Self {
        *inner.pending.lock().unwrap() += 1;
        CompletionGuard { inner }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        let mut pending = self.inner.pending.lock().unwrap();
        *pending -= 1;
        if *pending == 0 {
            self.inner.done.notify_all();
        }
    }
}
