// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation of `StaticHost` and `AzureStaticHost` resources.
//!
//! One pass brings the generated `ConfigMap` and `Ingress` of a custom resource in
//! line with its spec:
//!
//! 1. A resource being deleted has its objects removed and its finalizer released
//! 2. The finalizer is added
//! 3. The spec is resolved into a backend; an invalid spec is reported and nothing is written
//! 4. The desired objects are rendered and compared with what exists
//! 5. Missing objects are created, drifted ones replaced, `ConfigMap` before `Ingress`
//! 6. The status records the applied hash and the `Ready` condition
//!
//! A pass over an unchanged resource issues no writes at all.

use crate::context::Context;
use crate::errors::ReconcileError;
use crate::host_resource::{HostResource, OwnerIdentity};
use crate::metrics;
use crate::proxy_resources::build_desired_set;
use crate::reconcilers::diff::{
    config_map_needs_update, ingress_needs_update, is_externally_managed, merge_metadata,
    verify_ownership, Ownership,
};
use crate::reconcilers::finalizers::{ensure_finalizer, handle_deletion};
use crate::reconcilers::status::{ReconcilePhase, StatusUpdater};
use crate::resolver::resolve;
use crate::status_reasons::{
    REASON_APPLYING, REASON_DELETING, REASON_RECONCILED, REASON_TRANSIENT_CLUSTER_ERROR,
};
use crate::store::{ClusterStore, StoreObject};
use kube::ResourceExt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Result of a reconciliation pass that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Generated objects match the spec. `changes` counts the objects written.
    Ready { changes: usize },

    /// The resource cannot be reconciled until it changes (invalid spec or an object
    /// owned by someone else). The reason is on the status.
    Degraded { reason: &'static str },

    /// External drift was detected but corrected too recently; retry after the delay.
    DriftDeferred(Duration),

    /// The resource was being deleted and has been released.
    Removed,
}

/// What to do with one generated object.
enum Plan<K> {
    Create { recreate: bool },
    Replace { observed: K, drift: bool },
    InSync,
}

impl<K> Plan<K> {
    fn is_write(&self) -> bool {
        !matches!(self, Self::InSync)
    }

    fn is_drift(&self) -> bool {
        matches!(self, Self::Replace { drift: true, .. })
    }

    fn defer_drift(self) -> Self {
        if self.is_drift() {
            Self::InSync
        } else {
            self
        }
    }
}

/// Run one reconciliation pass for `host`.
///
/// Transient failures are counted per resource. Once a resource has failed
/// `retry_budget` passes in a row its status is switched to `Degraded` with reason
/// `TransientClusterError`, while retries continue.
///
/// # Errors
///
/// Returns the first store or cleanup failure. Invalid specs and ownership conflicts
/// are not errors: they are reported on the status and returned as
/// [`ReconcileOutcome::Degraded`].
pub async fn reconcile_host<H: HostResource, S: ClusterStore>(
    host: &H,
    ctx: &Context<S>,
) -> Result<ReconcileOutcome, ReconcileError> {
    match reconcile_pass(host, ctx).await {
        Ok(outcome) => {
            if let Ok(owner) = OwnerIdentity::of(host) {
                ctx.backoff.reset(&owner.key());
            }
            Ok(outcome)
        }
        Err(e) => {
            report_failure(host, ctx, &e).await;
            Err(e)
        }
    }
}

async fn report_failure<H: HostResource, S: ClusterStore>(
    host: &H,
    ctx: &Context<S>,
    err: &ReconcileError,
) {
    let key = format!(
        "{}/{}/{}",
        H::KIND,
        host.namespace().unwrap_or_default(),
        host.name_any()
    );
    metrics::record_error(H::KIND, err.error_type());

    let failures = ctx.backoff.record_failure(&key);
    error!("Reconciliation of {} failed (attempt {}): {}", key, failures, err);

    if failures < ctx.config.retry_budget || host.meta().deletion_timestamp.is_some() {
        return;
    }

    let mut status = StatusUpdater::new(host);
    status.mark_degraded(REASON_TRANSIENT_CLUSTER_ERROR, &err.to_string());
    if let Err(e) = status.apply::<H, S>(&ctx.store).await {
        warn!("Failed to report degraded status for {}: {}", key, e);
    }
}

async fn reconcile_pass<H: HostResource, S: ClusterStore>(
    host: &H,
    ctx: &Context<S>,
) -> Result<ReconcileOutcome, ReconcileError> {
    let owner = OwnerIdentity::of(host)?;
    let key = owner.key();
    let store = &ctx.store;

    info!("Reconciling {}", key);
    debug!(
        kind = H::KIND,
        namespace = %owner.namespace,
        name = %owner.name,
        generation = ?host.meta().generation,
        phase = %ReconcilePhase::of(host.host_status()),
        "Starting reconciliation"
    );

    if host.meta().deletion_timestamp.is_some() {
        return reconcile_deletion(host, ctx, &owner).await;
    }

    ensure_finalizer(store, host).await?;

    let mut status = StatusUpdater::new(host);
    status.set_observed_generation(host.meta().generation);

    let backend = match resolve(
        &host.static_host_spec(),
        H::PROVIDERS,
        &ctx.config.default_proxy_service,
    ) {
        Ok(backend) => backend,
        Err(invalid) => {
            let err = ReconcileError::from(invalid);
            return degrade::<H, S>(&mut status, store, &key, &err).await;
        }
    };
    debug!(
        hostname = %backend.hostname,
        origin = %backend.origin_url(),
        proxy_service = %backend.proxy_service,
        "Resolved backend"
    );

    let desired = build_desired_set(&owner, &backend, &ctx.config)?;
    let namespace = owner.namespace.as_str();
    let previously_applied =
        status.current().and_then(|s| s.last_applied_hash.as_deref()) == Some(desired.hash.as_str());

    let config_map_plan = match plan_object(
        store,
        &owner,
        &desired.names.config_map,
        &desired.config_map,
        previously_applied,
        config_map_needs_update,
    )
    .await
    {
        Ok(plan) => plan,
        Err(err @ ReconcileError::OwnedResourceConflict { .. }) => {
            return degrade::<H, S>(&mut status, store, &key, &err).await;
        }
        Err(err) => return Err(err),
    };
    let ingress_plan = match plan_object(
        store,
        &owner,
        &desired.names.ingress,
        &desired.ingress,
        previously_applied,
        ingress_needs_update,
    )
    .await
    {
        Ok(plan) => plan,
        Err(err @ ReconcileError::OwnedResourceConflict { .. }) => {
            return degrade::<H, S>(&mut status, store, &key, &err).await;
        }
        Err(err) => return Err(err),
    };

    // Recreating a deleted object is never deferred, only updates are.
    let mut deferred = None;
    if config_map_plan.is_drift() || ingress_plan.is_drift() {
        if let Err(wait) = ctx.drift.try_acquire(&key) {
            info!(
                "{} drifted but was corrected recently, deferring for {:?}",
                key, wait
            );
            deferred = Some(wait);
        }
    }
    let (config_map_plan, ingress_plan) = if deferred.is_some() {
        (config_map_plan.defer_drift(), ingress_plan.defer_drift())
    } else {
        (config_map_plan, ingress_plan)
    };

    if (config_map_plan.is_write() || ingress_plan.is_write()) && !previously_applied {
        status.mark_progressing(
            ReconcilePhase::Applying,
            REASON_APPLYING,
            "Applying ConfigMap and Ingress",
        );
        status
            .apply::<H, S>(store)
            .await
            .map_err(|e| ReconcileError::store(format!("update status of {key}"), e))?;
    }

    let mut changes = 0;
    changes += apply_plan(store, namespace, &desired.config_map, config_map_plan).await?;
    changes += apply_plan(store, namespace, &desired.ingress, ingress_plan).await?;

    if let Some(wait) = deferred {
        return Ok(ReconcileOutcome::DriftDeferred(wait));
    }

    status.set_applied(
        &desired.names.config_map,
        &desired.names.config_key,
        &desired.names.ingress,
        &backend.origin_host,
        &desired.hash,
    );
    status.mark_ready(
        REASON_RECONCILED,
        &format!("Serving {} from {}", backend.hostname, backend.origin_url()),
    );
    status
        .apply::<H, S>(store)
        .await
        .map_err(|e| ReconcileError::store(format!("update status of {key}"), e))?;

    if changes > 0 {
        info!("Reconciled {}: {} object(s) written", key, changes);
    } else {
        debug!("{} already up to date", key);
    }
    Ok(ReconcileOutcome::Ready { changes })
}

async fn reconcile_deletion<H: HostResource, S: ClusterStore>(
    host: &H,
    ctx: &Context<S>,
    owner: &OwnerIdentity,
) -> Result<ReconcileOutcome, ReconcileError> {
    let key = owner.key();

    if host.finalizers().iter().any(|f| f == H::FINALIZER) {
        let mut status = StatusUpdater::new(host);
        status.mark_progressing(
            ReconcilePhase::Deleting,
            REASON_DELETING,
            "Deleting generated Ingress and ConfigMap",
        );
        status
            .apply::<H, S>(&ctx.store)
            .await
            .map_err(|e| ReconcileError::store(format!("update status of {key}"), e))?;
    }

    let report = handle_deletion(&ctx.store, host).await?;
    info!(
        "Released {}: deleted {} Ingress(es) and {} ConfigMap(s)",
        key,
        report.ingresses.len(),
        report.config_maps.len()
    );

    ctx.drift.forget(&key);
    Ok(ReconcileOutcome::Removed)
}

/// Report a terminal error on the status and stop without touching any object.
async fn degrade<H: HostResource, S: ClusterStore>(
    status: &mut StatusUpdater,
    store: &S,
    key: &str,
    err: &ReconcileError,
) -> Result<ReconcileOutcome, ReconcileError> {
    let reason = err.status_reason();
    warn!("{} is degraded ({}): {}", key, reason, err);
    metrics::record_error(H::KIND, err.error_type());

    status.mark_degraded(reason, &err.to_string());
    status
        .apply::<H, S>(store)
        .await
        .map_err(|e| ReconcileError::store(format!("update status of {key}"), e))?;
    Ok(ReconcileOutcome::Degraded { reason })
}

async fn plan_object<K: StoreObject, S: ClusterStore>(
    store: &S,
    owner: &OwnerIdentity,
    name: &str,
    desired: &K,
    previously_applied: bool,
    needs_update: fn(&K, &K) -> bool,
) -> Result<Plan<K>, ReconcileError> {
    let kind = K::kind(&()).to_string();
    let namespace = owner.namespace.as_str();

    let observed = store
        .get::<K>(namespace, name)
        .await
        .map_err(|e| ReconcileError::store(format!("get {kind} {namespace}/{name}"), e))?;
    let Some(observed) = observed else {
        return Ok(Plan::Create {
            recreate: previously_applied,
        });
    };

    let adopt = match verify_ownership(observed.meta(), owner) {
        Ownership::Owned => false,
        Ownership::Adoptable => true,
        Ownership::Foreign(controller) => {
            return Err(ReconcileError::OwnedResourceConflict {
                kind,
                namespace: namespace.to_string(),
                name: name.to_string(),
                owner: controller,
            });
        }
    };

    if is_externally_managed(observed.meta()) {
        debug!(
            "{} {}/{} is externally managed, leaving it alone",
            kind, namespace, name
        );
        return Ok(Plan::InSync);
    }

    if adopt {
        info!("Adopting {} {}/{}", kind, namespace, name);
        return Ok(Plan::Replace {
            observed,
            drift: false,
        });
    }
    if needs_update(&observed, desired) {
        return Ok(Plan::Replace {
            observed,
            drift: previously_applied,
        });
    }
    Ok(Plan::InSync)
}

/// Execute `plan`. Returns the number of writes issued (0 or 1).
async fn apply_plan<K: StoreObject, S: ClusterStore>(
    store: &S,
    namespace: &str,
    desired: &K,
    plan: Plan<K>,
) -> Result<usize, ReconcileError> {
    let kind = K::kind(&()).to_string();
    let name = desired.meta().name.clone().unwrap_or_default();

    match plan {
        Plan::InSync => Ok(0),
        Plan::Create { recreate } => {
            if recreate {
                warn!("{} {}/{} disappeared, recreating it", kind, namespace, name);
                metrics::record_drift_correction(&kind, "recreated");
            } else {
                info!("Creating {} {}/{}", kind, namespace, name);
            }
            store
                .create(namespace, desired)
                .await
                .map_err(|e| ReconcileError::store(format!("create {kind} {namespace}/{name}"), e))?;
            metrics::record_resource_created(&kind);
            Ok(1)
        }
        Plan::Replace { observed, drift } => {
            if drift {
                warn!(
                    "{} {}/{} was modified outside the operator, restoring it",
                    kind, namespace, name
                );
                metrics::record_drift_correction(&kind, "updated");
            } else {
                info!("Updating {} {}/{}", kind, namespace, name);
            }
            let mut object = desired.clone();
            *object.meta_mut() = merge_metadata(observed.meta(), desired.meta());
            store
                .replace(namespace, &name, &object)
                .await
                .map_err(|e| ReconcileError::store(format!("replace {kind} {namespace}/{name}"), e))?;
            metrics::record_resource_updated(&kind);
            Ok(1)
        }
    }
}

#[cfg(test)]
#[path = "statichost_tests.rs"]
mod statichost_tests;
