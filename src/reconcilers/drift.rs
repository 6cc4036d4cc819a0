// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Drift correction rate limiting.
//!
//! A generated object that differs from a desired state the operator already applied
//! was changed by someone else. Correcting it immediately is right once, but a
//! controller fighting another writer would otherwise rewrite the object on every
//! watch event. [`DriftLimiter`] allows one correction per interval per custom
//! resource and tells the caller how long to wait otherwise.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct DriftLimiter {
    interval: Duration,
    last_correction: Mutex<HashMap<String, Instant>>,
}

impl DriftLimiter {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_correction: Mutex::new(HashMap::new()),
        }
    }

    /// Claim a drift correction for `key`.
    ///
    /// # Errors
    ///
    /// Returns the remaining wait if `key` was corrected less than one interval ago.
    pub fn try_acquire(&self, key: &str) -> Result<(), Duration> {
        self.try_acquire_at(key, Instant::now())
    }

    fn try_acquire_at(&self, key: &str, now: Instant) -> Result<(), Duration> {
        let mut last = self
            .last_correction
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(previous) = last.get(key) {
            let elapsed = now.saturating_duration_since(*previous);
            if elapsed < self.interval {
                return Err(self.interval - elapsed);
            }
        }
        last.insert(key.to_string(), now);
        Ok(())
    }

    /// Forget `key`, typically once its custom resource is gone.
    pub fn forget(&self, key: &str) {
        self.last_correction
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

#[cfg(test)]
#[path = "drift_tests.rs"]
mod drift_tests;
