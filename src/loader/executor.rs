//! Where the background half of a loader runs

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Boxed unit of background work
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs loader jobs off the control thread
pub trait Executor: Send + Sync {
    fn spawn(&self, job: Job);
}

/// Executor backed by a dedicated rayon thread pool
pub struct RayonExecutor {
    pool: rayon::ThreadPool,
}

impl RayonExecutor {
    /// Build a pool with `threads` named worker threads
    ///
    /// # Errors
    ///
    /// Returns an error if the operating system refuses to spawn the threads.
    pub fn new(threads: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|index| format!("treeviewer-loader-{index}"))
            .build()?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl Executor for RayonExecutor {
    fn spawn(&self, job: Job) {
        self.pool.spawn(job);
    }
}

/// Executor that only queues jobs until the caller runs them
///
/// Clones share one queue, so a test can keep a handle after giving the
/// executor to a viewer.
#[derive(Clone, Default)]
pub struct ManualExecutor {
    queue: Arc<Mutex<VecDeque<Job>>>,
}

impl ManualExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<Job>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of queued jobs
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue().len()
    }

    /// Run the oldest queued job; returns false if none was queued
    pub fn run_next(&self) -> bool {
        // Pop before running so a job may spawn further jobs
        let job = self.queue().pop_front();
        match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Run queued jobs until the queue is empty, returning how many ran
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }
}

impl Executor for ManualExecutor {
    fn spawn(&self, job: Job) {
        self.queue().push_back(job);
    }
}
