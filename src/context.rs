// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for the controllers.
//!
//! Both controllers receive an `Arc<Context<S>>` built once in `main`:
//! - the cluster state store used for every read and write
//! - the operator settings
//! - the per-resource failure tracker and drift limiter
//!
//! The tracker and limiter are keyed by `kind/namespace/name`, so the two controllers
//! share them without ever touching each other's entries.

use crate::config::OperatorConfig;
use crate::reconcilers::drift::DriftLimiter;
use crate::reconcilers::retry::BackoffTracker;
use crate::store::ClusterStore;

/// Shared context passed to the reconcilers.
pub struct Context<S: ClusterStore> {
    /// Cluster state store
    pub store: S,

    /// Operator settings
    pub config: OperatorConfig,

    /// Consecutive failed passes per custom resource
    pub backoff: BackoffTracker,

    /// Drift correction rate limiting per custom resource
    pub drift: DriftLimiter,
}

impl<S: ClusterStore> Context<S> {
    #[must_use]
    pub fn new(store: S, config: OperatorConfig) -> Self {
        let drift = DriftLimiter::new(config.drift_interval);
        Self {
            store,
            config,
            backoff: BackoffTracker::default(),
            drift,
        }
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
