use std::io;
use thiserror::Error;

/// Error type for thread pool operations.
#[derive(Error, Debug)]
pub enum PoolError {
    /// A pool must have at least one worker thread.
    #[error("thread pool requires at least one worker thread")]
    ZeroThreads,

    /// `start` was called on a pool whose workers are already running.
    #[error("worker threads have already been started")]
    AlreadyStarted,

    /// The operation was attempted after shutdown began. Submissions
    /// are rejected rather than silently dropped.
    #[error("thread pool is shutting down")]
    ShuttingDown,

    /// The OS refused to spawn a worker thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),
}

/// Result type alias for thread pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;
