//! Concurrent per-entity series fetching.
//!
//! Fans out one fetch per entity (location or parameter), runs at most
//! `max_in_flight` at a time and merges the results into a map keyed by
//! entity. A failing or hanging entity degrades to an empty value (an empty
//! series or page); it never fails the aggregation as a whole.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::Duration;

use futures::stream::{self, StreamExt};

use crate::errors::AppError;

/// Default cap on concurrent fetches.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 20;
/// Default per-attempt timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);
/// Default number of extra attempts for transient failures.
pub const DEFAULT_FETCH_RETRIES: u32 = 1;
/// Base delay between retries; attempt `n` waits `n * base`.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Tuning for one aggregation call.
#[derive(Debug, Clone)]
pub struct AggregateOptions {
    pub max_in_flight: usize,
    pub timeout: Duration,
    /// Extra attempts for transient failures
    pub retries: u32,
    pub retry_backoff: Duration,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            timeout: DEFAULT_FETCH_TIMEOUT,
            retries: DEFAULT_FETCH_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

/// Why one entity's series came back empty.
#[derive(Debug, Clone)]
pub enum FetchFailure {
    Upstream(AppError),
    TimedOut(Duration),
}

impl FetchFailure {
    fn is_transient(&self) -> bool {
        match self {
            FetchFailure::Upstream(e) => e.is_transient(),
            FetchFailure::TimedOut(_) => true,
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFailure::Upstream(e) => write!(f, "{}", e),
            FetchFailure::TimedOut(after) => write!(f, "timed out after {:?}", after),
        }
    }
}

/// Receives per-entity outcomes of an aggregation.
pub trait FetchObserver<K>: Send + Sync {
    fn on_success(&self, _key: &K) {}
    fn on_failure(&self, key: &K, failure: &FetchFailure);
}

/// Logs outcomes through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl<K: fmt::Debug> FetchObserver<K> for TracingObserver {
    fn on_success(&self, key: &K) {
        tracing::debug!("series {:?} loaded", key);
    }

    fn on_failure(&self, key: &K, failure: &FetchFailure) {
        tracing::warn!("series {:?} unavailable: {}", key, failure);
    }
}

/// Logs like [`TracingObserver`] and remembers which keys failed.
#[derive(Debug)]
pub struct RecordingObserver<K> {
    failed: Mutex<Vec<K>>,
}

impl<K> Default for RecordingObserver<K> {
    fn default() -> Self {
        Self {
            failed: Mutex::new(Vec::new()),
        }
    }
}

impl<K: Clone> RecordingObserver<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys whose fetch failed, in completion order.
    pub fn failed_keys(&self) -> Vec<K> {
        match self.failed.lock() {
            Ok(failed) => failed.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl<K: Clone + fmt::Debug + Send> FetchObserver<K> for RecordingObserver<K> {
    fn on_success(&self, key: &K) {
        TracingObserver.on_success(key);
    }

    fn on_failure(&self, key: &K, failure: &FetchFailure) {
        TracingObserver.on_failure(key, failure);
        match self.failed.lock() {
            Ok(mut failed) => failed.push(key.clone()),
            Err(poisoned) => poisoned.into_inner().push(key.clone()),
        }
    }
}

/// Fetch a series for every entity and merge them by key.
///
/// Resolves only after every fetch has settled. The result holds exactly one
/// entry per distinct key; failed or timed-out entities map to `T::default()`
/// (an empty series) and are reported to `observer`. If two entities share a key, a
/// successful series wins over a failed one. Empty input returns an empty
/// map without calling `fetch_one`.
pub async fn aggregate<E, K, T, KF, F, Fut>(
    entities: &[E],
    key_fn: KF,
    fetch_one: F,
    options: &AggregateOptions,
    observer: &dyn FetchObserver<K>,
) -> HashMap<K, T>
where
    K: Eq + Hash + Clone,
    T: Default,
    KF: Fn(&E) -> K,
    F: Fn(&E) -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    if entities.is_empty() {
        return HashMap::new();
    }

    let fetch_one = &fetch_one;
    let fetches: Vec<_> = entities
        .iter()
        .map(|entity| {
            let key = key_fn(entity);
            async move { (key, fetch_with_retry(entity, fetch_one, options).await) }
        })
        .collect();
    let outcomes: Vec<(K, Result<T, FetchFailure>)> = stream::iter(fetches)
        .buffer_unordered(options.max_in_flight.max(1))
        .collect()
        .await;

    let mut merged = HashMap::with_capacity(outcomes.len());
    for (key, outcome) in outcomes {
        match outcome {
            Ok(value) => {
                observer.on_success(&key);
                merged.insert(key, value);
            }
            Err(failure) => {
                observer.on_failure(&key, &failure);
                merged.entry(key).or_default();
            }
        }
    }
    merged
}

async fn fetch_with_retry<E, T, F, Fut>(
    entity: &E,
    fetch_one: &F,
    options: &AggregateOptions,
) -> Result<T, FetchFailure>
where
    F: Fn(&E) -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut attempt: u32 = 0;
    loop {
        let failure = match tokio::time::timeout(options.timeout, fetch_one(entity)).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => FetchFailure::Upstream(e),
            Err(_) => FetchFailure::TimedOut(options.timeout),
        };

        if attempt >= options.retries || !failure.is_transient() {
            return Err(failure);
        }
        attempt += 1;
        tracing::debug!("retrying after '{}' (attempt {})", failure, attempt);
        tokio::time::sleep(options.retry_backoff * attempt).await;
    }
}
