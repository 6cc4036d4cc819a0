// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Retry logic with exponential backoff.
//!
//! Two levels of retry are provided:
//!
//! - [`retry_api_call`] retries a single cluster API call on transient errors (429,
//!   5xx, transport) and fails fast on everything else.
//! - [`BackoffTracker`] counts consecutive failed reconciliation passes per custom
//!   resource and computes how long the controller waits before the next pass.

use crate::constants::{ERROR_REQUEUE_BASE_SECS, ERROR_REQUEUE_JITTER, ERROR_REQUEUE_MAX_SECS};
use crate::errors::StoreError;
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Maximum total time to spend retrying (5 minutes)
const MAX_ELAPSED_TIME_SECS: u64 = 300;

/// Initial retry interval (100ms)
const INITIAL_INTERVAL_MILLIS: u64 = 100;

/// Maximum interval between retries (30 seconds)
const MAX_INTERVAL_SECS: u64 = 30;

/// Backoff multiplier (exponential growth factor)
const BACKOFF_MULTIPLIER: f64 = 2.0;

/// Randomization factor to prevent thundering herd (±10%)
const RANDOMIZATION_FACTOR: f64 = 0.1;

/// Simple exponential backoff implementation.
///
/// Provides exponential backoff with randomization (jitter) to prevent thundering herd.
pub struct ExponentialBackoff {
    /// Current interval duration
    pub current_interval: Duration,
    /// Initial interval duration
    pub initial_interval: Duration,
    /// Maximum interval duration
    pub max_interval: Duration,
    /// Maximum total elapsed time
    pub max_elapsed_time: Option<Duration>,
    /// Backoff multiplier (typically 2.0 for doubling)
    pub multiplier: f64,
    /// Randomization factor (e.g., 0.1 for ±10%)
    pub randomization_factor: f64,
    /// Start time for tracking total elapsed time
    start_time: Instant,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff with specified parameters.
    #[must_use]
    pub fn new(
        initial_interval: Duration,
        max_interval: Duration,
        max_elapsed_time: Option<Duration>,
        multiplier: f64,
        randomization_factor: f64,
    ) -> Self {
        Self {
            current_interval: initial_interval,
            initial_interval,
            max_interval,
            max_elapsed_time,
            multiplier,
            randomization_factor,
            start_time: Instant::now(),
        }
    }

    /// Get the next backoff interval, or None if max elapsed time exceeded.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if let Some(max_elapsed) = self.max_elapsed_time {
            if self.start_time.elapsed() >= max_elapsed {
                return None;
            }
        }

        let interval = self.current_interval;
        let jittered = apply_jitter(interval, self.randomization_factor);

        let next = interval.as_secs_f64() * self.multiplier;
        self.current_interval = Duration::from_secs_f64(next).min(self.max_interval);

        Some(jittered)
    }
}

/// Apply ±`factor` randomization to an interval.
fn apply_jitter(interval: Duration, factor: f64) -> Duration {
    if factor == 0.0 {
        return interval;
    }

    let secs = interval.as_secs_f64();
    let delta = secs * factor;

    let mut rng = rand::thread_rng();
    let jittered = rng.gen_range((secs - delta)..=(secs + delta));

    Duration::from_secs_f64(jittered.max(0.0))
}

/// Create default exponential backoff configuration for cluster API retries.
///
/// # Configuration
///
/// - **Initial interval**: 100ms
/// - **Max interval**: 30 seconds
/// - **Max elapsed time**: 5 minutes total
/// - **Multiplier**: 2.0 (exponential growth)
/// - **Randomization**: ±10% (prevents thundering herd)
///
/// # Retry Schedule
///
/// With these settings, retries occur at approximately:
///
/// 1. 100ms
/// 2. 200ms
/// 3. 400ms
/// 4. 800ms
/// 5. 1.6s
/// 6. 3.2s
/// 7. 6.4s
/// 8. 12.8s
/// 9. 25.6s
/// 10. 30s (capped at max interval)
///     11-30. 30s intervals until 5 minutes elapsed
#[must_use]
pub fn default_backoff() -> ExponentialBackoff {
    ExponentialBackoff::new(
        Duration::from_millis(INITIAL_INTERVAL_MILLIS),
        Duration::from_secs(MAX_INTERVAL_SECS),
        Some(Duration::from_secs(MAX_ELAPSED_TIME_SECS)),
        BACKOFF_MULTIPLIER,
        RANDOMIZATION_FACTOR,
    )
}

/// Retry a cluster API call with exponential backoff.
///
/// Automatically retries on transient errors (HTTP 429, 5xx, transport failures) and
/// fails immediately on everything else, including conflicts: a write rejected for a
/// stale `resourceVersion` must be recomputed by a new pass, not replayed.
///
/// # Errors
///
/// Returns the last error if it is not retryable or the retry budget is exhausted.
///
/// # Example
///
/// ```no_run
/// use kube::{Api, Client};
/// use k8s_openapi::api::core::v1::ConfigMap;
/// use statichost::errors::StoreError;
/// use statichost::reconcilers::retry::retry_api_call;
///
/// # async fn example() -> Result<(), StoreError> {
/// # let client = Client::try_default().await.map_err(|e| StoreError::Transport(e.to_string()))?;
/// let api: Api<ConfigMap> = Api::namespaced(client, "default");
///
/// let cm = retry_api_call(
///     || async {
///         api.get("site-statichost-nginx")
///             .await
///             .map_err(|e| StoreError::from_kube(e, "ConfigMap", "default", "site-statichost-nginx"))
///     },
///     "get ConfigMap default/site-statichost-nginx",
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn retry_api_call<T, F, Fut>(
    mut operation: F,
    operation_name: &str,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, StoreError>>,
{
    let mut backoff = default_backoff();
    let start_time = Instant::now();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt,
                        elapsed = ?start_time.elapsed(),
                        "Cluster API call succeeded after retries"
                    );
                }
                return Ok(value);
            }
            Err(e) => {
                if !is_retryable_error(&e) {
                    return Err(e);
                }

                if let Some(duration) = backoff.next_backoff() {
                    warn!(
                        operation = operation_name,
                        attempt = attempt,
                        retry_after = ?duration,
                        error = %e,
                        "Retryable cluster API error, will retry"
                    );
                    tokio::time::sleep(duration).await;
                } else {
                    error!(
                        operation = operation_name,
                        attempt = attempt,
                        elapsed = ?start_time.elapsed(),
                        error = %e,
                        "Backoff exhausted, giving up"
                    );
                    return Err(e);
                }
            }
        }
    }
}

/// Determine if a single API call should be retried in place.
///
/// Rate limiting (429), server errors (5xx) and transport failures are retried.
/// Conflicts are transient for the reconciliation pass but not for the call.
#[must_use]
pub fn is_retryable_error(err: &StoreError) -> bool {
    match err {
        StoreError::Transport(_) => true,
        StoreError::Api { code, .. } => *code == 429 || (500..600).contains(code),
        StoreError::NotFound { .. }
        | StoreError::Conflict { .. }
        | StoreError::Serialization(_) => false,
    }
}

/// Per-resource count of consecutive failed reconciliation passes.
///
/// The delay before the next pass grows as `base * 2^(n-1)` up to `max`, with jitter.
/// A successful pass resets the count.
#[derive(Debug)]
pub struct BackoffTracker {
    base: Duration,
    max: Duration,
    jitter: f64,
    failures: Mutex<HashMap<String, u32>>,
}

impl Default for BackoffTracker {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(ERROR_REQUEUE_BASE_SECS),
            Duration::from_secs(ERROR_REQUEUE_MAX_SECS),
            ERROR_REQUEUE_JITTER,
        )
    }
}

impl BackoffTracker {
    #[must_use]
    pub fn new(base: Duration, max: Duration, jitter: f64) -> Self {
        Self {
            base,
            max,
            jitter,
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Record a failed pass for `key` and return the new consecutive failure count.
    pub fn record_failure(&self, key: &str) -> u32 {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        let count = failures.entry(key.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// Forget the failures of `key` after a successful pass.
    pub fn reset(&self, key: &str) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    /// Current consecutive failure count of `key`.
    #[must_use]
    pub fn failures(&self, key: &str) -> u32 {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    /// Delay after `failures` consecutive failures, without jitter.
    #[must_use]
    pub fn base_delay(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(31);
        self.base
            .checked_mul(1u32 << exponent)
            .map_or(self.max, |d| d.min(self.max))
    }

    /// Jittered delay before the next pass of `key`.
    #[must_use]
    pub fn delay(&self, key: &str) -> Duration {
        let failures = self.failures(key).max(1);
        apply_jitter(self.base_delay(failures), self.jitter)
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
