// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Abstraction over the custom resource kinds handled by the operator.
//!
//! `StaticHost` and the legacy `AzureStaticHost` share one reconciliation engine. This
//! trait exposes what the engine needs from each kind, so a single generic controller
//! implementation drives both.

use crate::constants::{
    KIND_AZURE_STATIC_HOST, KIND_STATIC_HOST, SLUG_AZURE_STATIC_HOST, SLUG_STATIC_HOST,
};
use crate::crd::{AzureStaticHost, StaticHost, StaticHostSpec, StaticHostStatus};
use crate::errors::ReconcileError;
use crate::labels::{FINALIZER_AZURE_STATIC_HOST, FINALIZER_STATIC_HOST};
use crate::resolver::Provider;
use kube::core::NamespaceResourceScope;
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Trait for custom resource kinds reconciled into a proxy `ConfigMap` and `Ingress`.
pub trait HostResource:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + DeserializeOwned
    + Serialize
    + Send
    + Sync
    + 'static
{
    /// The kind (e.g., `StaticHost`)
    const KIND: &'static str;

    /// Lowercase slug embedded in generated object names
    const SLUG: &'static str;

    /// The finalizer guarding cleanup of generated objects
    const FINALIZER: &'static str;

    /// Providers this kind may use
    const PROVIDERS: &'static [Provider];

    /// The spec in the current `StaticHost` form.
    fn static_host_spec(&self) -> StaticHostSpec;

    /// The current status, if any.
    fn host_status(&self) -> Option<&StaticHostStatus>;
}

impl HostResource for StaticHost {
    const KIND: &'static str = KIND_STATIC_HOST;
    const SLUG: &'static str = SLUG_STATIC_HOST;
    const FINALIZER: &'static str = FINALIZER_STATIC_HOST;
    const PROVIDERS: &'static [Provider] = &[Provider::Azure, Provider::Aws];

    fn static_host_spec(&self) -> StaticHostSpec {
        self.spec.clone()
    }

    fn host_status(&self) -> Option<&StaticHostStatus> {
        self.status.as_ref()
    }
}

impl HostResource for AzureStaticHost {
    const KIND: &'static str = KIND_AZURE_STATIC_HOST;
    const SLUG: &'static str = SLUG_AZURE_STATIC_HOST;
    const FINALIZER: &'static str = FINALIZER_AZURE_STATIC_HOST;
    const PROVIDERS: &'static [Provider] = &[Provider::Azure];

    fn static_host_spec(&self) -> StaticHostSpec {
        self.spec.to_static_host_spec()
    }

    fn host_status(&self) -> Option<&StaticHostStatus> {
        self.status.as_ref()
    }
}

/// Identity of a custom resource, as needed to own generated objects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerIdentity {
    pub api_version: String,
    pub kind: String,
    /// Name slug of the kind (see [`HostResource::SLUG`])
    pub slug: String,
    pub name: String,
    pub namespace: String,
    pub uid: String,
}

impl OwnerIdentity {
    /// Extract the identity of `host`.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::MissingMetadata`] if the resource has no namespace or UID,
    /// which only happens for objects that were never persisted.
    pub fn of<H: HostResource>(host: &H) -> Result<Self, ReconcileError> {
        let namespace = host
            .namespace()
            .ok_or_else(|| ReconcileError::MissingMetadata {
                kind: H::KIND.to_string(),
                field: "namespace",
            })?;
        let uid = host.uid().ok_or_else(|| ReconcileError::MissingMetadata {
            kind: H::KIND.to_string(),
            field: "uid",
        })?;

        Ok(Self {
            api_version: H::api_version(&()).to_string(),
            kind: H::KIND.to_string(),
            slug: H::SLUG.to_string(),
            name: host.name_any(),
            namespace,
            uid,
        })
    }

    /// `kind/namespace/name` key used for logs and per-resource bookkeeping.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}/{}/{}", self.kind, self.namespace, self.name)
    }
}
