//! Attempt many independent operations and collect the failures.
//!
//! Nothing short-circuits: every key is attempted exactly once no matter how
//! many of its siblings fail.

use std::future::Future;

use futures::{StreamExt, stream};

/// A single key whose operation returned an error.
#[derive(Debug)]
pub struct Failure<K, E> {
    pub key: K,
    pub error: E,
}

/// Outcome of an [`attempt_all`] run.
#[derive(Debug)]
pub struct FanOutReport<K, E> {
    pub attempted: usize,
    /// Failures in completion order.
    pub failures: Vec<Failure<K, E>>,
}

impl<K, E> FanOutReport<K, E> {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.attempted - self.failures.len()
    }
}

/// Run `op` once for every key, at most `concurrency` at a time.
pub async fn attempt_all<K, T, E, F, Fut>(
    keys: impl IntoIterator<Item = K>,
    concurrency: usize,
    op: F,
) -> FanOutReport<K, E>
where
    K: Clone,
    F: Fn(K) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let results: Vec<(K, Result<T, E>)> = stream::iter(keys)
        .map(|key| {
            let fut = op(key.clone());
            async move { (key, fut.await) }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let attempted = results.len();
    let failures = results
        .into_iter()
        .filter_map(|(key, result)| result.err().map(|error| Failure { key, error }))
        .collect();

    FanOutReport {
        attempted,
        failures,
    }
}
