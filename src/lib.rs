#![deny(missing_docs)]

//! A fixed-size worker thread pool with a shared FIFO task queue.
//!
//! Workers pull type-erased tasks from a single mutex-guarded queue,
//! run them outside the lock, and exit only once the queue is drained
//! and shutdown has been signaled. A [`TaskGroup`] lets callers block
//! until a whole batch of submissions has finished executing.

mod error;
mod pool;
mod task_group;

pub use error::{PoolError, Result};
pub use pool::ThreadPool;
pub use task_group::TaskGroup;
