// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition helpers for static host resources.
//!
//! # Condition Format
//!
//! Kubernetes conditions follow a standard format:
//! - `type`: The aspect of the resource being reported (`Ready`, `Degraded`)
//! - `status`: "True", "False", or "Unknown"
//! - `reason`: A programmatic identifier (CamelCase)
//! - `message`: A human-readable explanation
//! - `lastTransitionTime`: RFC3339 timestamp when the condition changed
//!
//! # Example
//!
//! ```rust,no_run
//! use statichost::reconcilers::status::create_condition;
//!
//! let condition = create_condition(
//!     "Ready",
//!     "True",
//!     "Reconciled",
//!     "ConfigMap and Ingress are up to date"
//! );
//! ```

use crate::crd::{Condition, StaticHostStatus};
use crate::errors::StoreError;
use crate::host_resource::HostResource;
use crate::status_reasons::{CONDITION_TYPE_DEGRADED, CONDITION_TYPE_READY};
use crate::store::ClusterStore;
use chrono::Utc;
use kube::ResourceExt;
use std::fmt;
use tracing::debug;

/// Lifecycle phase of a static host, reported in `status.phase`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilePhase {
    Pending,
    Applying,
    Ready,
    Degraded,
    Deleting,
    /// Terminal: the resource is gone. Never written to status.
    Removed,
}

impl ReconcilePhase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Applying => "Applying",
            Self::Ready => "Ready",
            Self::Degraded => "Degraded",
            Self::Deleting => "Deleting",
            Self::Removed => "Removed",
        }
    }

    /// Phase recorded in `status`, `Pending` if none was written yet.
    #[must_use]
    pub fn of(status: Option<&StaticHostStatus>) -> Self {
        match status.and_then(|s| s.phase.as_deref()) {
            Some("Applying") => Self::Applying,
            Some("Ready") => Self::Ready,
            Some("Degraded") => Self::Degraded,
            Some("Deleting") => Self::Deleting,
            _ => Self::Pending,
        }
    }
}

impl fmt::Display for ReconcilePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Create a new condition with the current timestamp.
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// Find a condition by type in a list of conditions.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Update or add a condition in a mutable conditions list (in-memory, no API call).
///
/// The `lastTransitionTime` is preserved when the status value does not change.
pub fn update_condition_in_memory(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition_type) {
        let last_transition_time = if existing.status == status {
            existing
                .last_transition_time
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339())
        } else {
            Utc::now().to_rfc3339()
        };

        existing.status = status.to_string();
        existing.reason = Some(reason.to_string());
        existing.message = Some(message.to_string());
        existing.last_transition_time = Some(last_transition_time);
    } else {
        conditions.push(create_condition(condition_type, status, reason, message));
    }
}

/// Compare two condition lists, ignoring `lastTransitionTime`.
#[must_use]
pub fn conditions_equal(current: &[Condition], new: &[Condition]) -> bool {
    if current.len() != new.len() {
        return false;
    }

    new.iter().all(|new_cond| {
        current.iter().any(|curr| {
            curr.r#type == new_cond.r#type
                && curr.status == new_cond.status
                && curr.reason == new_cond.reason
                && curr.message == new_cond.message
        })
    })
}

/// Compare two statuses, ignoring condition `lastTransitionTime`.
#[must_use]
pub fn status_equivalent(current: &StaticHostStatus, new: &StaticHostStatus) -> bool {
    current.observed_generation == new.observed_generation
        && current.last_applied_hash == new.last_applied_hash
        && current.phase == new.phase
        && current.config_map == new.config_map
        && current.config_key == new.config_key
        && current.ingress == new.ingress
        && current.origin_host == new.origin_host
        && conditions_equal(&current.conditions, &new.conditions)
}

/// Collects status changes for one static host and writes them in a single patch.
///
/// Writing is skipped when the new status is equivalent to the last written one, so
/// a pass over an unchanged resource issues no status write.
pub struct StatusUpdater {
    kind: &'static str,
    namespace: String,
    name: String,
    current_status: Option<StaticHostStatus>,
    new_status: StaticHostStatus,
}

impl StatusUpdater {
    #[must_use]
    pub fn new<H: HostResource>(host: &H) -> Self {
        let current_status = host.host_status().cloned();
        let new_status = current_status.clone().unwrap_or_default();

        Self {
            kind: H::KIND,
            namespace: host.namespace().unwrap_or_default(),
            name: host.name_any(),
            current_status,
            new_status,
        }
    }

    /// Status as last read or written.
    #[must_use]
    pub fn current(&self) -> Option<&StaticHostStatus> {
        self.current_status.as_ref()
    }

    /// Status as it will be written by the next [`apply`](Self::apply).
    #[must_use]
    pub fn pending(&self) -> &StaticHostStatus {
        &self.new_status
    }

    pub fn set_condition(
        &mut self,
        condition_type: &str,
        status: &str,
        reason: &str,
        message: &str,
    ) {
        update_condition_in_memory(
            &mut self.new_status.conditions,
            condition_type,
            status,
            reason,
            message,
        );
    }

    pub fn set_phase(&mut self, phase: ReconcilePhase) {
        self.new_status.phase = Some(phase.as_str().to_string());
    }

    pub fn set_observed_generation(&mut self, generation: Option<i64>) {
        self.new_status.observed_generation = generation;
    }

    /// Record the objects and content hash of a successful apply.
    pub fn set_applied(
        &mut self,
        config_map: &str,
        config_key: &str,
        ingress: &str,
        origin_host: &str,
        hash: &str,
    ) {
        self.new_status.config_map = Some(config_map.to_string());
        self.new_status.config_key = Some(config_key.to_string());
        self.new_status.ingress = Some(ingress.to_string());
        self.new_status.origin_host = Some(origin_host.to_string());
        self.new_status.last_applied_hash = Some(hash.to_string());
    }

    /// `Ready=True`, `Degraded=False`.
    pub fn mark_ready(&mut self, reason: &str, message: &str) {
        self.set_phase(ReconcilePhase::Ready);
        self.set_condition(CONDITION_TYPE_READY, "True", reason, message);
        self.set_condition(CONDITION_TYPE_DEGRADED, "False", reason, "");
    }

    /// `Ready=False`, `Degraded=True` with the failure detail.
    pub fn mark_degraded(&mut self, reason: &str, message: &str) {
        self.set_phase(ReconcilePhase::Degraded);
        self.set_condition(CONDITION_TYPE_READY, "False", reason, message);
        self.set_condition(CONDITION_TYPE_DEGRADED, "True", reason, message);
    }

    /// `Ready=False` while a change is in progress; `Degraded` is left as is.
    pub fn mark_progressing(&mut self, phase: ReconcilePhase, reason: &str, message: &str) {
        self.set_phase(phase);
        self.set_condition(CONDITION_TYPE_READY, "False", reason, message);
    }

    /// Returns true if the pending status differs from the current one.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        match &self.current_status {
            None => true,
            Some(current) => !status_equivalent(current, &self.new_status),
        }
    }

    /// Write the pending status if it changed. Returns whether a write was issued.
    ///
    /// # Errors
    ///
    /// Returns an error if the status cannot be serialized or the patch fails.
    pub async fn apply<H: HostResource, S: ClusterStore>(
        &mut self,
        store: &S,
    ) -> Result<bool, StoreError> {
        if !self.has_changes() {
            debug!(
                "{} {}/{} status unchanged, skipping update",
                self.kind, self.namespace, self.name
            );
            return Ok(false);
        }

        let status = serde_json::to_value(&self.new_status)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        store
            .patch_status::<H>(&self.namespace, &self.name, &status)
            .await?;

        debug!(
            "Updated {} {}/{} status: phase={}",
            self.kind,
            self.namespace,
            self.name,
            self.new_status.phase.as_deref().unwrap_or_default()
        );
        self.current_status = Some(self.new_status.clone());
        Ok(true)
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
