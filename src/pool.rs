use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use log::{debug, error};

use crate::{PoolError, Result};

/// A type-erased unit of work. Submission boxes the caller's closure,
/// which owns whatever context the task needs.
pub(crate) type Task = Box<dyn FnOnce() + Send + 'static>;

/// State shared between the pool handle and its workers.
struct Shared {
    /// Pending tasks in submission order. All mutation happens under
    /// this lock.
    queue: Mutex<VecDeque<Task>>,
    /// Signaled once per submission (`notify_one`) and on shutdown
    /// (`notify_all`).
    available: Condvar,
    /// Written under the queue lock; readable lock-free on the submit
    /// fast path. Workers re-check it under the lock before exiting.
    shutdown: AtomicBool,
}

/// A thread pool with a fixed number of workers pulling from a shared
/// FIFO queue.
///
/// Tasks are dequeued in submission order, though completion order
/// across workers is not guaranteed. Shutdown drains the queue: every
/// task accepted before shutdown runs to completion before the worker
/// threads are joined. A task that panics is contained and logged;
/// its worker keeps processing subsequent tasks.
///
/// # Example
///
/// ```
/// use taskpool::ThreadPool;
///
/// let mut pool = ThreadPool::new(4)?;
/// pool.start()?;
/// pool.submit(|| println!("hello from a worker"))?;
/// pool.shutdown()?;
/// # Ok::<(), taskpool::PoolError>(())
/// ```
pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
    threads: u32,
    started: bool,
    shut_down: bool,
}

impl ThreadPool {
    /// Creates a pool that will run `threads` worker threads.
    ///
    /// Does not spawn any threads; call [`start`](Self::start) for
    /// that. Tasks may be submitted before `start` and are held in
    /// the queue until workers come up.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::ZeroThreads`] if `threads` is zero.
    pub fn new(threads: u32) -> Result<Self> {
        if threads == 0 {
            return Err(PoolError::ZeroThreads);
        }

        Ok(ThreadPool {
            shared: Arc::new(Shared {
                queue: Mutex::new(VecDeque::new()),
                available: Condvar::new(),
                shutdown: AtomicBool::new(false),
            }),
            workers: Vec::new(),
            threads,
            started: false,
            shut_down: false,
        })
    }

    /// Creates a pool sized to the number of logical CPUs, as
    /// reported by `num_cpus`.
    pub fn with_num_cpus() -> Result<Self> {
        Self::new(num_cpus::get() as u32)
    }

    /// Spawns the worker threads.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::AlreadyStarted`] if called twice, or
    /// [`PoolError::Spawn`] if the OS refuses to create a thread. On
    /// a spawn failure, workers spawned so far keep running; the
    /// caller must still shut the pool down (or drop it).
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(PoolError::AlreadyStarted);
        }
        if self.shut_down {
            return Err(PoolError::ShuttingDown);
        }
        self.started = true;

        for id in 0..self.threads {
            let shared = Arc::clone(&self.shared);
            let handle = thread::Builder::new()
                .name(format!("pool-worker-{id}"))
                .spawn(move || run_worker(id, &shared))?;
            self.workers.push(handle);
        }

        Ok(())
    }

    /// Queues a job for execution by one of the workers.
    ///
    /// Returns once the job is queued, not once it runs. Wakes a
    /// single waiting worker.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::ShuttingDown`] if shutdown has begun;
    /// rejected jobs are never silently dropped into the queue.
    pub fn submit<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        // Fast path; authoritative check happens under the lock.
        if self.shared.shutdown.load(Ordering::Acquire) {
            return Err(PoolError::ShuttingDown);
        }

        {
            let mut queue = self.shared.queue.lock().unwrap();
            if self.shared.shutdown.load(Ordering::Acquire) {
                return Err(PoolError::ShuttingDown);
            }
            queue.push_back(Box::new(job));
        }
        self.shared.available.notify_one();

        Ok(())
    }

    /// Queues a job that takes ownership of a typed context value.
    ///
    /// Convenience over [`submit`](Self::submit) for callers holding
    /// a value and a function separately; `value` is moved into the
    /// task and handed to `func` on a worker thread.
    pub fn submit_with<T, F>(&self, value: T, func: F) -> Result<()>
    where
        T: Send + 'static,
        F: FnOnce(T) + Send + 'static,
    {
        self.submit(move || func(value))
    }

    /// The number of worker threads this pool was configured with.
    pub fn threads(&self) -> u32 {
        self.threads
    }

    /// The number of tasks currently queued and not yet dequeued.
    pub fn pending_tasks(&self) -> usize {
        self.shared.queue.lock().unwrap().len()
    }

    /// Shuts the pool down, draining the queue.
    ///
    /// Rejects new submissions, wakes every worker, and blocks until
    /// all queued tasks have run and all worker threads have been
    /// joined. If the pool was never started, any queued tasks are
    /// run on the calling thread before this returns, so accepted
    /// work is never silently dropped.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::ShuttingDown`] if the pool was already
    /// shut down.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.shut_down {
            return Err(PoolError::ShuttingDown);
        }
        self.shutdown_and_join();
        Ok(())
    }

    /// Sets the shutdown flag, wakes all workers, and joins them.
    fn shutdown_and_join(&mut self) {
        {
            // Holding the lock while setting the flag means no worker
            // can decide to wait between the flag store and the
            // broadcast below.
            let _queue = self.shared.queue.lock().unwrap();
            self.shared.shutdown.store(true, Ordering::Release);
        }
        self.shared.available.notify_all();

        if !self.started {
            // No workers were ever spawned; honor the drain guarantee
            // by running whatever was queued on the calling thread.
            loop {
                let task = self.shared.queue.lock().unwrap().pop_front();
                match task {
                    Some(task) => {
                        if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                            error!("Queued task panicked during shutdown, continuing");
                        }
                    }
                    None => break,
                }
            }
        }

        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("Worker thread panicked outside a task");
            }
        }
        self.shut_down = true;
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        // Same drain semantics as an explicit shutdown, so a dropped
        // pool never leaks threads or queued tasks.
        if !self.shut_down {
            self.shutdown_and_join();
        }
    }
}

/// Worker loop: pop one task under the lock, run it outside the lock,
/// repeat. Exits once the queue is empty and shutdown is set.
fn run_worker(id: u32, shared: &Shared) {
    debug!("Worker {id} started");
    loop {
        let task = {
            let mut queue = shared.queue.lock().unwrap();
            loop {
                if let Some(task) = queue.pop_front() {
                    break task;
                }
                if shared.shutdown.load(Ordering::Acquire) {
                    debug!("Worker {id}: queue drained, exiting");
                    return;
                }
                queue = shared.available.wait(queue).unwrap();
            }
        };

        debug!("Worker {id} executing task");
        // Catch panics so the worker loop continues
        if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
            error!("Worker {id} task panicked, continuing");
        }
    }
}
