// ABOUTME: Bounded-concurrency worker pool for batches of per-item operations.
// ABOUTME: Runs every item to completion and collects one outcome per item id.

use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::future::Future;
use tracing::{debug, warn};

/// Kind of batch, used to choose a default worker count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    /// Container removal (`rm`).
    RemoveContainers,
    /// Image removal (`rmi`).
    RemoveImages,
}

/// One unit of work: an identifier and the value the operation runs on.
#[derive(Debug, Clone)]
pub struct WorkItem<V> {
    pub id: String,
    pub input: V,
}

impl<V> WorkItem<V> {
    pub fn new(id: impl Into<String>, input: V) -> Self {
        Self {
            id: id.into(),
            input,
        }
    }
}

/// Outcomes of one batch, keyed by item id. Unordered.
#[derive(Debug)]
pub struct PoolReport<T, E> {
    pub results: HashMap<String, Result<T, E>>,
    pub failures: usize,
}

impl<T, E> PoolReport<T, E> {
    pub fn is_success(&self) -> bool {
        self.failures == 0
    }

    /// Remove and return the outcome for `id`.
    pub fn take(&mut self, id: &str) -> Option<Result<T, E>> {
        self.results.remove(id)
    }
}

/// Default worker count for `job` on a machine with `cpus` CPUs.
fn default_for_cpus(job: Job, cpus: usize) -> usize {
    let cpus = cpus.max(1);
    match job {
        Job::RemoveContainers if cpus <= 3 => cpus * 3,
        Job::RemoveContainers => cpus * 4,
        Job::RemoveImages => cpus * 3,
    }
}

/// Default worker count for `job` on this machine.
pub fn default_workers(job: Job) -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    default_for_cpus(job, cpus)
}

/// Runs at most `max_workers` operations at a time.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    max_workers: usize,
}

impl WorkerPool {
    /// Pool with an explicit bound. Zero is treated as one.
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
        }
    }

    /// Pool for `job`; `None` or zero selects the job's default.
    pub fn for_job(job: Job, requested: Option<usize>) -> Self {
        let max_workers = match requested {
            Some(n) if n > 0 => n,
            _ => default_workers(job),
        };
        debug!(?job, max_workers, "setting maximum workers");
        Self::new(max_workers)
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Apply `op` to every item's input with bounded concurrency.
    ///
    /// As one operation finishes the next starts; there is no per-operation
    /// timeout. If two items share an id, the outcome that completes last
    /// replaces the other.
    pub async fn execute<V, T, E, F, Fut>(&self, items: Vec<WorkItem<V>>, op: F) -> PoolReport<T, E>
    where
        F: Fn(V) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let total = items.len();
        let workers = self.max_workers.min(total).max(1);
        debug!(workers, total, "executing batch");

        let outcomes: Vec<(String, Result<T, E>)> = stream::iter(items)
            .map(|WorkItem { id, input }| {
                let fut = op(input);
                async move {
                    debug!(%id, "dispatching work item");
                    (id, fut.await)
                }
            })
            .buffer_unordered(workers)
            .collect()
            .await;

        let mut results = HashMap::with_capacity(total);
        for (id, outcome) in outcomes {
            if results.contains_key(&id) {
                warn!(%id, "duplicate work item id, earlier outcome replaced");
            }
            results.insert(id, outcome);
        }
        let failures = results.values().filter(|r| r.is_err()).count();

        PoolReport { results, failures }
    }
}
