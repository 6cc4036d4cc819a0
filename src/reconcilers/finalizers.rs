// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Finalizer management for static host resources.
//!
//! The finalizer keeps a deleted custom resource around until its generated
//! `Ingress` and `ConfigMap` are confirmed gone. Owner references would let the
//! garbage collector do this eventually; the finalizer makes it ordered and
//! observable.
//!
//! # Example
//!
//! ```rust,ignore
//! use statichost::reconcilers::finalizers::{ensure_finalizer, handle_deletion};
//!
//! async fn reconcile<S: ClusterStore>(store: &S, host: StaticHost) -> Result<(), ReconcileError> {
//!     if host.metadata.deletion_timestamp.is_some() {
//!         return handle_deletion(store, &host).await.map(|_| ());
//!     }
//!
//!     ensure_finalizer(store, &host).await?;
//!
//!     // Normal reconciliation logic...
//!     Ok(())
//! }
//! ```

use crate::errors::ReconcileError;
use crate::host_resource::{HostResource, OwnerIdentity};
use crate::proxy_resources::ResourceNames;
use crate::reconcilers::cleanup::{cleanup_owned_resources, CleanupReport};
use crate::store::ClusterStore;
use kube::ResourceExt;
use tracing::info;

fn has_finalizer<H: HostResource>(host: &H) -> bool {
    host.finalizers().iter().any(|f| f == H::FINALIZER)
}

/// Add the kind's finalizer if not already present.
///
/// Returns `true` if a write was issued.
///
/// # Errors
///
/// Returns an error if the patch fails.
pub async fn ensure_finalizer<H: HostResource, S: ClusterStore>(
    store: &S,
    host: &H,
) -> Result<bool, ReconcileError> {
    if has_finalizer(host) {
        return Ok(false);
    }

    let namespace = host.namespace().unwrap_or_default();
    let name = host.name_any();
    info!(
        "Adding finalizer {} to {} {}/{}",
        H::FINALIZER,
        H::KIND,
        namespace,
        name
    );

    let mut finalizers = host.finalizers().to_vec();
    finalizers.push(H::FINALIZER.to_string());
    store
        .set_finalizers::<H>(&namespace, &name, finalizers)
        .await
        .map_err(|e| ReconcileError::store(format!("add finalizer to {namespace}/{name}"), e))?;

    Ok(true)
}

/// Remove the kind's finalizer if present.
///
/// Returns `true` if a write was issued.
///
/// # Errors
///
/// Returns an error if the patch fails.
pub async fn remove_finalizer<H: HostResource, S: ClusterStore>(
    store: &S,
    host: &H,
) -> Result<bool, ReconcileError> {
    if !has_finalizer(host) {
        return Ok(false);
    }

    let namespace = host.namespace().unwrap_or_default();
    let name = host.name_any();
    info!(
        "Removing finalizer {} from {} {}/{}",
        H::FINALIZER,
        H::KIND,
        namespace,
        name
    );

    let finalizers: Vec<String> = host
        .finalizers()
        .iter()
        .filter(|f| *f != H::FINALIZER)
        .cloned()
        .collect();
    store
        .set_finalizers::<H>(&namespace, &name, finalizers)
        .await
        .map_err(|e| {
            ReconcileError::store(format!("remove finalizer from {namespace}/{name}"), e)
        })?;

    Ok(true)
}

/// Clean up the generated objects of a deleted custom resource, then release it.
///
/// Nothing is done when the finalizer is already gone. If cleanup fails the
/// finalizer stays and deletion is retried on the next pass.
///
/// # Errors
///
/// Returns an error if cleanup or the finalizer removal fails.
pub async fn handle_deletion<H: HostResource, S: ClusterStore>(
    store: &S,
    host: &H,
) -> Result<CleanupReport, ReconcileError> {
    let owner = OwnerIdentity::of(host)?;
    info!("{} is being deleted", owner.key());

    if !has_finalizer(host) {
        return Ok(CleanupReport::default());
    }

    info!("Running cleanup for {}", owner.key());
    let names = ResourceNames::for_owner(&owner);
    let report = cleanup_owned_resources(store, &owner, &names).await?;

    remove_finalizer(store, host).await?;
    Ok(report)
}

#[cfg(test)]
#[path = "finalizers_tests.rs"]
mod finalizers_tests;
