// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cluster state store seam.
//!
//! The reconcile engine reads and writes cluster objects only through
//! [`ClusterStore`]. [`KubeStore`] is the production implementation backed by the
//! Kubernetes API; unit tests use an in-memory fake.
//!
//! All operations are namespaced. Deleting an absent object succeeds, and reading one
//! returns `Ok(None)`, so callers never have to special-case `404`.

use crate::constants::FIELD_MANAGER;
use crate::errors::StoreError;
use crate::reconcilers::retry::retry_api_call;
use async_trait::async_trait;
use kube::api::{DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::fmt::Debug;
use tracing::debug;

/// Objects the store can handle: any namespaced, serializable resource.
pub trait StoreObject:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<T> StoreObject for T where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Read/write access to cluster objects.
#[async_trait]
pub trait ClusterStore: Send + Sync + 'static {
    /// Fetch an object, `None` if it does not exist.
    async fn get<K: StoreObject>(&self, namespace: &str, name: &str)
        -> Result<Option<K>, StoreError>;

    /// List objects matching a `key=value[,key=value]` label selector.
    async fn list<K: StoreObject>(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<K>, StoreError>;

    /// Create an object. Fails with [`StoreError::Conflict`] if it already exists.
    async fn create<K: StoreObject>(&self, namespace: &str, object: &K) -> Result<K, StoreError>;

    /// Replace an object. `object` must carry the `resourceVersion` it was based on.
    async fn replace<K: StoreObject>(
        &self,
        namespace: &str,
        name: &str,
        object: &K,
    ) -> Result<K, StoreError>;

    /// Delete an object. Deleting an absent object succeeds.
    async fn delete<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<(), StoreError>;

    /// Overwrite `metadata.finalizers` of an object.
    async fn set_finalizers<K: StoreObject>(
        &self,
        namespace: &str,
        name: &str,
        finalizers: Vec<String>,
    ) -> Result<(), StoreError>;

    /// Merge `status` into the status subresource of an object.
    async fn patch_status<K: StoreObject>(
        &self,
        namespace: &str,
        name: &str,
        status: &serde_json::Value,
    ) -> Result<(), StoreError>;
}

/// [`ClusterStore`] backed by the Kubernetes API.
///
/// Every call is retried in place on rate limiting, server errors and transport
/// failures (see [`retry_api_call`]).
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K: StoreObject>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn kind_of<K: StoreObject>() -> String {
    K::kind(&()).to_string()
}

fn post_params() -> PostParams {
    PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    }
}

fn patch_params() -> PatchParams {
    PatchParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    }
}

#[async_trait]
impl ClusterStore for KubeStore {
    async fn get<K: StoreObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, StoreError> {
        let api = self.api::<K>(namespace);
        let kind = kind_of::<K>();
        retry_api_call(
            || async {
                api.get_opt(name)
                    .await
                    .map_err(|e| StoreError::from_kube(e, &kind, namespace, name))
            },
            &format!("get {kind} {namespace}/{name}"),
        )
        .await
    }

    async fn list<K: StoreObject>(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<K>, StoreError> {
        let api = self.api::<K>(namespace);
        let kind = kind_of::<K>();
        let params = ListParams::default().labels(label_selector);
        let list = retry_api_call(
            || async {
                api.list(&params)
                    .await
                    .map_err(|e| StoreError::from_kube(e, &kind, namespace, label_selector))
            },
            &format!("list {kind} in {namespace} ({label_selector})"),
        )
        .await?;
        Ok(list.items)
    }

    async fn create<K: StoreObject>(&self, namespace: &str, object: &K) -> Result<K, StoreError> {
        let api = self.api::<K>(namespace);
        let kind = kind_of::<K>();
        let name = object.meta().name.clone().unwrap_or_default();
        debug!(kind = %kind, namespace = %namespace, name = %name, "Creating object");
        retry_api_call(
            || async {
                api.create(&post_params(), object)
                    .await
                    .map_err(|e| StoreError::from_kube(e, &kind, namespace, &name))
            },
            &format!("create {kind} {namespace}/{name}"),
        )
        .await
    }

    async fn replace<K: StoreObject>(
        &self,
        namespace: &str,
        name: &str,
        object: &K,
    ) -> Result<K, StoreError> {
        let api = self.api::<K>(namespace);
        let kind = kind_of::<K>();
        debug!(kind = %kind, namespace = %namespace, name = %name, "Replacing object");
        retry_api_call(
            || async {
                api.replace(name, &post_params(), object)
                    .await
                    .map_err(|e| StoreError::from_kube(e, &kind, namespace, name))
            },
            &format!("replace {kind} {namespace}/{name}"),
        )
        .await
    }

    async fn delete<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        let api = self.api::<K>(namespace);
        let kind = kind_of::<K>();
        debug!(kind = %kind, namespace = %namespace, name = %name, "Deleting object");
        let result = retry_api_call(
            || async {
                api.delete(name, &DeleteParams::default())
                    .await
                    .map(|_| ())
                    .map_err(|e| StoreError::from_kube(e, &kind, namespace, name))
            },
            &format!("delete {kind} {namespace}/{name}"),
        )
        .await;

        match result {
            Ok(()) | Err(StoreError::NotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn set_finalizers<K: StoreObject>(
        &self,
        namespace: &str,
        name: &str,
        finalizers: Vec<String>,
    ) -> Result<(), StoreError> {
        let api = self.api::<K>(namespace);
        let kind = kind_of::<K>();
        let patch = json!({ "metadata": { "finalizers": finalizers } });
        retry_api_call(
            || async {
                api.patch(name, &patch_params(), &Patch::Merge(&patch))
                    .await
                    .map(|_| ())
                    .map_err(|e| StoreError::from_kube(e, &kind, namespace, name))
            },
            &format!("patch finalizers of {kind} {namespace}/{name}"),
        )
        .await
    }

    async fn patch_status<K: StoreObject>(
        &self,
        namespace: &str,
        name: &str,
        status: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let api = self.api::<K>(namespace);
        let kind = kind_of::<K>();
        let patch = json!({ "status": status });
        retry_api_call(
            || async {
                api.patch_status(name, &patch_params(), &Patch::Merge(&patch))
                    .await
                    .map(|_| ())
                    .map_err(|e| StoreError::from_kube(e, &kind, namespace, name))
            },
            &format!("patch status of {kind} {namespace}/{name}"),
        )
        .await
    }
}
