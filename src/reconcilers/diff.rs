// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Comparison of observed and desired proxy objects.
//!
//! Only fields the operator manages are compared. Server-populated metadata
//! (`resourceVersion`, `uid`, `managedFields`, timestamps) and labels or annotations
//! added by other controllers never count as drift.

use crate::host_resource::OwnerIdentity;
use crate::labels::{
    EXTERNALLY_MANAGED_ANNOTATION, K8S_MANAGED_BY, MANAGED_BY_STATICHOST_OPERATOR,
    OPERATOR_ANNOTATIONS, OWNER_UID_LABEL,
};
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use std::collections::BTreeMap;

/// Relationship between an existing object and the custom resource that wants it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ownership {
    /// Controlled by this custom resource.
    Owned,
    /// No controller, but labelled as generated for this custom resource (for example
    /// after the owner reference was stripped by a backup restore). Safe to take back.
    Adoptable,
    /// Controlled by something else, or not ours at all.
    Foreign(String),
}

fn controller_ref(meta: &ObjectMeta) -> Option<&OwnerReference> {
    meta.owner_references
        .as_ref()?
        .iter()
        .find(|r| r.controller == Some(true))
}

/// Decide whether `meta` may be managed on behalf of `owner`.
#[must_use]
pub fn verify_ownership(meta: &ObjectMeta, owner: &OwnerIdentity) -> Ownership {
    if let Some(controller) = controller_ref(meta) {
        if controller.uid == owner.uid {
            return Ownership::Owned;
        }
        return Ownership::Foreign(format!(
            "controlled by {} {} (uid {})",
            controller.kind, controller.name, controller.uid
        ));
    }

    let labels = meta.labels.as_ref();
    let label = |key: &str| labels.and_then(|l| l.get(key)).map(String::as_str);
    if label(K8S_MANAGED_BY) == Some(MANAGED_BY_STATICHOST_OPERATOR)
        && label(OWNER_UID_LABEL) == Some(owner.uid.as_str())
    {
        Ownership::Adoptable
    } else {
        Ownership::Foreign("no controller".to_string())
    }
}

/// Returns true if the object must not be updated by the operator.
#[must_use]
pub fn is_externally_managed(meta: &ObjectMeta) -> bool {
    meta.annotations
        .as_ref()
        .and_then(|a| a.get(EXTERNALLY_MANAGED_ANNOTATION))
        .is_some_and(|v| v == "true")
}

fn is_subset(desired: Option<&BTreeMap<String, String>>, observed: Option<&BTreeMap<String, String>>) -> bool {
    let Some(desired) = desired else {
        return true;
    };
    desired
        .iter()
        .all(|(k, v)| observed.and_then(|o| o.get(k)) == Some(v))
}

/// True for an operator annotation `desired` no longer carries.
fn is_stale_annotation(key: &str, desired: &ObjectMeta) -> bool {
    OPERATOR_ANNOTATIONS.contains(&key)
        && !desired
            .annotations
            .as_ref()
            .is_some_and(|wanted| wanted.contains_key(key))
}

/// Returns true if owned labels, annotations or the controller reference drifted.
///
/// An operator annotation left over from an earlier desired state also counts.
#[must_use]
pub fn metadata_needs_update(observed: &ObjectMeta, desired: &ObjectMeta) -> bool {
    if !is_subset(desired.labels.as_ref(), observed.labels.as_ref())
        || !is_subset(desired.annotations.as_ref(), observed.annotations.as_ref())
        || observed
            .annotations
            .iter()
            .flatten()
            .any(|(key, _)| is_stale_annotation(key, desired))
    {
        return true;
    }

    match (controller_ref(desired), controller_ref(observed)) {
        (Some(want), Some(have)) => want.uid != have.uid,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

/// Returns true if the observed `ConfigMap` differs from the desired one.
#[must_use]
pub fn config_map_needs_update(observed: &ConfigMap, desired: &ConfigMap) -> bool {
    observed.data != desired.data || metadata_needs_update(&observed.metadata, &desired.metadata)
}

/// Returns true if the observed `Ingress` differs from the desired one.
#[must_use]
pub fn ingress_needs_update(observed: &Ingress, desired: &Ingress) -> bool {
    if metadata_needs_update(&observed.metadata, &desired.metadata) {
        return true;
    }

    let (Some(have), Some(want)) = (observed.spec.as_ref(), desired.spec.as_ref()) else {
        return observed.spec.is_none() != desired.spec.is_none();
    };

    have.rules != want.rules
        || have.tls != want.tls
        || have.default_backend != want.default_backend
        || (want.ingress_class_name.is_some() && have.ingress_class_name != want.ingress_class_name)
}

/// Metadata for replacing `observed` with desired content.
///
/// Keeps the observed `resourceVersion` (optimistic concurrency), finalizers, and the
/// labels, annotations and non-controller owner references added by others. Operator
/// annotations missing from `desired` are dropped.
#[must_use]
pub fn merge_metadata(observed: &ObjectMeta, desired: &ObjectMeta) -> ObjectMeta {
    let merge_maps = |have: Option<&BTreeMap<String, String>>,
                      want: Option<&BTreeMap<String, String>>| {
        let mut merged = have.cloned().unwrap_or_default();
        if let Some(want) = want {
            merged.extend(want.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        (!merged.is_empty()).then_some(merged)
    };

    let mut annotations = observed.annotations.clone();
    if let Some(have) = annotations.as_mut() {
        have.retain(|key, _| !is_stale_annotation(key, desired));
    }

    let mut owner_references: Vec<OwnerReference> = observed
        .owner_references
        .iter()
        .flatten()
        .filter(|r| r.controller != Some(true))
        .cloned()
        .collect();
    for wanted in desired.owner_references.iter().flatten() {
        owner_references.retain(|r| r.uid != wanted.uid);
        owner_references.push(wanted.clone());
    }

    ObjectMeta {
        name: desired.name.clone(),
        namespace: desired.namespace.clone(),
        resource_version: observed.resource_version.clone(),
        labels: merge_maps(observed.labels.as_ref(), desired.labels.as_ref()),
        annotations: merge_maps(annotations.as_ref(), desired.annotations.as_ref()),
        owner_references: (!owner_references.is_empty()).then_some(owner_references),
        finalizers: observed.finalizers.clone(),
        ..Default::default()
    }
}

#[cfg(test)]
#[path = "diff_tests.rs"]
mod diff_tests;
