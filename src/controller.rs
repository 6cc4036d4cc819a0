// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Controller runtime wiring for `StaticHost` and `AzureStaticHost`.
//!
//! Each kind gets its own `kube::runtime::Controller`, watching the custom resource
//! and the `ConfigMap`s and `Ingress`es the operator generated. An update to or
//! deletion of a generated object is mapped back to its owner through the controller
//! owner reference, so drift is noticed without polling.

use crate::context::Context;
use crate::errors::ReconcileError;
use crate::host_resource::HostResource;
use crate::metrics;
use crate::proxy_resources::managed_selector;
use crate::reconcilers::{reconcile_host, ReconcileOutcome};
use crate::store::KubeStore;
use anyhow::{Context as _, Result};
use futures::StreamExt;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::ListParams;
use kube::runtime::controller::{self, Action};
use kube::runtime::{watcher, Controller};
use kube::{Api, Client, Resource, ResourceExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

fn scoped_api<K>(client: Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<DynamicType = (), Scope = kube::core::NamespaceResourceScope>,
{
    match namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    }
}

/// Map the outcome of a pass to the controller's next action.
#[must_use]
pub fn next_action(outcome: &ReconcileOutcome, resync: std::time::Duration) -> Action {
    match outcome {
        ReconcileOutcome::Ready { .. } => Action::requeue(resync),
        ReconcileOutcome::DriftDeferred(wait) => Action::requeue(*wait),
        ReconcileOutcome::Degraded { .. } | ReconcileOutcome::Removed => Action::await_change(),
    }
}

/// Map a failed pass to the controller's next action.
///
/// Transient errors retry after `delay`. Spec and ownership errors wait for the
/// resource to change.
#[must_use]
pub fn error_action(err: &ReconcileError, delay: std::time::Duration) -> Action {
    if err.is_transient() {
        Action::requeue(delay)
    } else {
        Action::await_change()
    }
}

async fn reconcile<H: HostResource>(
    host: Arc<H>,
    ctx: Arc<Context<KubeStore>>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();

    match reconcile_host(host.as_ref(), &ctx).await {
        Ok(outcome) => {
            debug!(
                "{} {}/{} reconciled: {:?}",
                H::KIND,
                host.namespace().unwrap_or_default(),
                host.name_any(),
                outcome
            );
            metrics::record_reconciliation_success(H::KIND, start.elapsed());
            if let ReconcileOutcome::DriftDeferred(_) = outcome {
                metrics::record_reconciliation_requeue(H::KIND, "drift_deferred");
            }
            Ok(next_action(&outcome, ctx.config.resync_interval))
        }
        Err(e) => {
            metrics::record_reconciliation_error(H::KIND, start.elapsed());
            Err(e)
        }
    }
}

fn error_policy<H: HostResource>(
    host: Arc<H>,
    err: &ReconcileError,
    ctx: Arc<Context<KubeStore>>,
) -> Action {
    let key = format!(
        "{}/{}/{}",
        H::KIND,
        host.namespace().unwrap_or_default(),
        host.name_any()
    );
    if !err.is_transient() {
        warn!("{} waits for a change after error: {}", key, err);
        return Action::await_change();
    }
    let delay = ctx.backoff.delay(&key);
    warn!("Requeueing {} in {:?} after error: {}", key, delay, err);
    metrics::record_reconciliation_requeue(H::KIND, err.error_type());
    error_action(err, delay)
}

/// Run the controller for kind `H` until the watch streams end.
///
/// # Errors
///
/// Returns an error if the custom resource definition is not installed.
pub async fn run_host_controller<H: HostResource>(
    client: Client,
    ctx: Arc<Context<KubeStore>>,
) -> Result<()> {
    info!("Starting {} controller", H::KIND);

    let namespace = ctx.config.namespace.clone();
    let namespace = namespace.as_deref();
    let hosts = scoped_api::<H>(client.clone(), namespace);
    hosts
        .list(&ListParams::default().limit(1))
        .await
        .with_context(|| format!("{} is not queryable. Is the CRD installed?", H::KIND))?;

    let selector = managed_selector();
    let owned = watcher::Config::default().labels(&selector);
    debug!(
        "{} controller watching owned objects with selector {}",
        H::KIND,
        selector
    );

    Controller::new(hosts, watcher::Config::default())
        .owns(scoped_api::<ConfigMap>(client.clone(), namespace), owned.clone())
        .owns(scoped_api::<Ingress>(client, namespace), owned)
        .with_config(
            controller::Config::default()
                .debounce(ctx.config.debounce)
                .concurrency(ctx.config.concurrency),
        )
        .shutdown_on_signal()
        .run(reconcile::<H>, error_policy::<H>, ctx)
        .for_each(|result| async move {
            if let Err(e) = result {
                debug!("{} controller event: {}", H::KIND, e);
            }
        })
        .await;

    info!("{} controller stopped", H::KIND);
    Ok(())
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod controller_tests;
