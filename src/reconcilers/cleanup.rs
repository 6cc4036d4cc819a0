// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cleanup of the objects generated for a static host.
//!
//! The `Ingress` goes first so that traffic stops being routed to the proxy before
//! its server block disappears. Each kind is deleted by its deterministic name and
//! then by the owner UID label, which also catches objects left behind under an older
//! name. Objects controlled by anything else are never touched.

use crate::errors::ReconcileError;
use crate::host_resource::OwnerIdentity;
use crate::metrics;
use crate::proxy_resources::{owner_selector, ResourceNames};
use crate::reconcilers::diff::{verify_ownership, Ownership};
use crate::store::{ClusterStore, StoreObject};
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::api::networking::v1::Ingress;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Objects deleted by one cleanup.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub ingresses: Vec<String>,
    pub config_maps: Vec<String>,
}

/// Delete every `Ingress`, then every `ConfigMap`, generated for `owner`.
///
/// # Errors
///
/// Returns [`ReconcileError::DeletionPending`] if a deleted object is still present
/// afterwards, or a store error. In both cases the caller must keep its finalizer.
pub async fn cleanup_owned_resources<S: ClusterStore>(
    store: &S,
    owner: &OwnerIdentity,
    names: &ResourceNames,
) -> Result<CleanupReport, ReconcileError> {
    let ingresses = cleanup_kind::<Ingress, S>(store, owner, &names.ingress).await?;
    let config_maps = cleanup_kind::<ConfigMap, S>(store, owner, &names.config_map).await?;

    Ok(CleanupReport {
        ingresses,
        config_maps,
    })
}

async fn cleanup_kind<K: StoreObject, S: ClusterStore>(
    store: &S,
    owner: &OwnerIdentity,
    name: &str,
) -> Result<Vec<String>, ReconcileError> {
    let kind = K::kind(&()).to_string();
    let namespace = owner.namespace.as_str();
    let mut targets = BTreeSet::new();

    let named = store
        .get::<K>(namespace, name)
        .await
        .map_err(|e| ReconcileError::store(format!("get {kind} {namespace}/{name}"), e))?;
    let labelled = store
        .list::<K>(namespace, &owner_selector(owner))
        .await
        .map_err(|e| ReconcileError::store(format!("list {kind} in {namespace}"), e))?;

    for object in named.iter().chain(labelled.iter()) {
        let object_name = object.meta().name.clone().unwrap_or_default();
        match verify_ownership(object.meta(), owner) {
            Ownership::Owned | Ownership::Adoptable => {
                targets.insert(object_name);
            }
            Ownership::Foreign(detail) => {
                warn!(
                    owner = %owner.key(),
                    kind = %kind,
                    name = %object_name,
                    detail = %detail,
                    "Leaving object not owned by this resource in place"
                );
            }
        }
    }

    for target in &targets {
        store
            .delete::<K>(namespace, target)
            .await
            .map_err(|e| ReconcileError::store(format!("delete {kind} {namespace}/{target}"), e))?;
        info!(owner = %owner.key(), "Deleted {} {}/{}", kind, namespace, target);
        metrics::record_resource_deleted(&kind);
    }

    for target in &targets {
        let still_present = store
            .get::<K>(namespace, target)
            .await
            .map_err(|e| ReconcileError::store(format!("get {kind} {namespace}/{target}"), e))?
            .is_some();
        if still_present {
            debug!(kind = %kind, name = %target, "Object still terminating");
            return Err(ReconcileError::DeletionPending {
                kind,
                namespace: namespace.to_string(),
                name: target.clone(),
            });
        }
    }

    Ok(targets.into_iter().collect())
}

#[cfg(test)]
#[path = "cleanup_tests.rs"]
mod cleanup_tests;
