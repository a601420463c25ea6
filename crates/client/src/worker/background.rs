//! Detached work that outlives the request that started it.
//!
//! Cache writes after a response has been returned run here. Nothing orders
//! them relative to the response or to each other; `settle` is the only way
//! to observe that they finished.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::{JoinError, JoinSet};

/// Background tasks spawned by the worker.
///
/// Finished tasks are reaped whenever a new one is spawned, so a worker that
/// never settles holds only the tasks still running.
#[derive(Clone, Default)]
pub struct Background {
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl Background {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a fire-and-forget task on the current runtime.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.lock();
        reap(&mut tasks);
        tasks.spawn(task);
    }

    /// Number of tasks still running.
    pub fn pending(&self) -> usize {
        let mut tasks = self.lock();
        reap(&mut tasks);
        tasks.len()
    }

    /// Wait for every spawned task, including ones spawned while waiting.
    ///
    /// Returns how many tasks were awaited.
    pub async fn settle(&self) -> usize {
        let mut settled = 0;
        loop {
            let mut batch = std::mem::take(&mut *self.lock());
            if batch.is_empty() {
                return settled;
            }
            while let Some(result) = batch.join_next().await {
                log_failure(result);
                settled += 1;
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn reap(tasks: &mut JoinSet<()>) {
    while let Some(result) = tasks.try_join_next() {
        log_failure(result);
    }
}

fn log_failure(result: Result<(), JoinError>) {
    if let Err(e) = result {
        tracing::warn!("background task failed: {e}");
    }
}
