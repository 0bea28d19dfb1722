//! Rotating proxy pool with failure-based eviction
//!
//! The pool holds the active outbound endpoints and a failure counter per
//! endpoint. Fetchers draw random endpoints and report failures; an endpoint
//! that fails `eviction_threshold` times since the last refresh leaves the
//! active set at once. A background task replaces the whole set periodically.

use crate::proxy::source::ProxySource;
use crate::HarvestError;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Default number of failures that evicts an endpoint
pub const DEFAULT_EVICTION_THRESHOLD: u32 = 3;

/// State guarded by the pool lock
#[derive(Debug, Default)]
struct PoolState {
    /// Active endpoints, unique, in the order the source listed them
    active: Vec<String>,

    /// Failures per endpoint since the last successful refresh
    failures: HashMap<String, u32>,

    /// When the active set was last replaced
    last_refresh: Option<DateTime<Utc>>,
}

/// A point-in-time view of the pool, for logging and tests
#[derive(Debug, Clone)]
pub struct PoolSnapshot {
    pub active: Vec<String>,
    pub failures: HashMap<String, u32>,
    pub last_refresh: Option<DateTime<Utc>>,
}

/// Shared pool of outbound proxy endpoints
///
/// Every read and write of the endpoint set and counters goes through one
/// mutex. Construct it once and hand the `Arc` to every fetcher.
pub struct ProxyPool {
    state: Mutex<PoolState>,
    ready: Notify,
    eviction_threshold: u32,
}

impl ProxyPool {
    /// Creates an empty pool
    pub fn new(eviction_threshold: u32) -> Self {
        Self {
            state: Mutex::new(PoolState::default()),
            ready: Notify::new(),
            eviction_threshold: eviction_threshold.max(1),
        }
    }

    /// Creates a pool already holding `endpoints`
    pub fn with_endpoints<I, S>(eviction_threshold: u32, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pool = Self::new(eviction_threshold);
        pool.replace(endpoints.into_iter().map(Into::into).collect());
        pool
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        // Every mutation is a single assignment or map operation, so a
        // poisoned lock still guards consistent state.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Atomically replaces the active set and clears every failure counter
    ///
    /// An empty list is ignored and the current set is kept. Returns the
    /// number of endpoints now active, or `None` when nothing changed.
    pub fn replace(&self, endpoints: Vec<String>) -> Option<usize> {
        let mut seen = HashSet::new();
        let unique: Vec<String> = endpoints
            .into_iter()
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty() && seen.insert(e.clone()))
            .collect();

        if unique.is_empty() {
            return None;
        }

        let count = unique.len();
        {
            let mut state = self.lock();
            state.active = unique;
            state.failures.clear();
            state.last_refresh = Some(Utc::now());
        }
        self.ready.notify_waiters();
        Some(count)
    }

    /// Returns a uniformly random active endpoint
    ///
    /// # Errors
    ///
    /// `HarvestError::ProxyPoolEmpty` if no endpoint is active.
    pub fn get_random(&self) -> Result<String, HarvestError> {
        let state = self.lock();
        state
            .active
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or(HarvestError::ProxyPoolEmpty)
    }

    /// Records one failure for `endpoint`, evicting it at the threshold
    ///
    /// Returns `true` if this call removed the endpoint from the active set.
    pub fn report_failure(&self, endpoint: &str) -> bool {
        let mut state = self.lock();
        let count = state.failures.entry(endpoint.to_string()).or_insert(0);
        *count += 1;

        if *count < self.eviction_threshold {
            return false;
        }

        let before = state.active.len();
        state.active.retain(|e| e != endpoint);
        let evicted = state.active.len() < before;
        if evicted {
            tracing::info!(
                "Evicted proxy {} after {} failures ({} left)",
                endpoint,
                self.eviction_threshold,
                state.active.len()
            );
        }
        evicted
    }

    /// Number of active endpoints
    pub fn len(&self) -> usize {
        self.lock().active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Failure count recorded for `endpoint` since the last refresh
    pub fn failure_count(&self, endpoint: &str) -> u32 {
        self.lock().failures.get(endpoint).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        let state = self.lock();
        PoolSnapshot {
            active: state.active.clone(),
            failures: state.failures.clone(),
            last_refresh: state.last_refresh,
        }
    }

    /// Waits until at least one endpoint is active
    pub async fn wait_until_ready(&self) {
        loop {
            let notified = self.ready.notified();
            tokio::pin!(notified);
            // Register before checking so a refresh between the check and
            // the await still wakes us.
            notified.as_mut().enable();

            if !self.is_empty() {
                return;
            }
            notified.await;
        }
    }

    /// Like [`wait_until_ready`](Self::wait_until_ready), giving up after `limit`
    ///
    /// Returns `true` if the pool became ready in time.
    pub async fn wait_ready_for(&self, limit: Duration) -> bool {
        tokio::time::timeout(limit, self.wait_until_ready())
            .await
            .is_ok()
    }

    /// Fetches a fresh list from `source` and swaps it in
    ///
    /// The network call happens without the lock held. On a source error or
    /// an empty list the current set is left untouched.
    pub async fn refresh(&self, source: &dyn ProxySource) -> Result<usize, HarvestError> {
        let fresh = source.fetch_endpoints().await?;
        self.replace(fresh).ok_or_else(|| {
            HarvestError::ProxySource("proxy source returned no endpoints".to_string())
        })
    }

    /// Spawns the refresh task, running every `interval` for the process lifetime
    ///
    /// The first refresh starts immediately.
    pub fn spawn_refresh(
        self: &Arc<Self>,
        source: Arc<dyn ProxySource>,
        interval: Duration,
    ) -> JoinHandle<()> {
        let pool = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match pool.refresh(source.as_ref()).await {
                    Ok(count) => tracing::info!("Refreshed {} proxies", count),
                    Err(e) => tracing::warn!(
                        "Failed to refresh proxies, keeping {} current: {}",
                        pool.len(),
                        e
                    ),
                }
            }
        })
    }
}

impl Default for ProxyPool {
    fn default() -> Self {
        Self::new(DEFAULT_EVICTION_THRESHOLD)
    }
}
