//! Bounded-concurrency fan-out

use futures::stream::{self, StreamExt};
use std::future::Future;

/// Runs one async worker per unit with a cap on how many are in flight
///
/// Results come back in completion order, not input order. Workers are
/// infallible by contract: each one folds its own failures into its result.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    concurrency: usize,
}

impl WorkerPool {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Applies `worker` to every unit and collects all results
    pub async fn run_all<T, R, F, Fut>(&self, units: Vec<T>, worker: F) -> Vec<R>
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = R>,
    {
        if units.is_empty() {
            return Vec::new();
        }

        stream::iter(units)
            .map(worker)
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }
}
