// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

// Common test utilities for integration tests

#![allow(dead_code)]

use k8s_openapi::api::core::v1::Namespace;
use kube::{
    api::{Api, DeleteParams, PostParams},
    client::Client,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use statichost::crd::StaticHost;
use std::fmt::Debug;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Get a Kubernetes client or skip the test if not in a cluster
pub async fn get_kube_client_or_skip() -> Option<Client> {
    match Client::try_default().await {
        Ok(client) => {
            println!("✓ Successfully connected to Kubernetes cluster");
            Some(client)
        }
        Err(e) => {
            eprintln!("⊘ Skipping integration test: not running in Kubernetes cluster: {e}");
            None
        }
    }
}

/// Create a test namespace
pub async fn create_test_namespace(
    client: &Client,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let namespaces: Api<Namespace> = Api::all(client.clone());

    let ns = serde_json::from_value(json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": name,
            "labels": {
                "test": "integration",
                "managed-by": "statichost-test"
            }
        }
    }))?;

    match namespaces.create(&PostParams::default(), &ns).await {
        Ok(_) => {
            println!("✓ Created test namespace: {name}");
            Ok(())
        }
        Err(kube::Error::Api(ae)) if ae.code == 409 => {
            println!("  Test namespace already exists: {name}");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

/// Cleanup test namespace
pub async fn cleanup_test_namespace(client: &Client, name: &str) {
    let namespaces: Api<Namespace> = Api::all(client.clone());

    match namespaces.delete(name, &DeleteParams::default()).await {
        Ok(_) => println!("✓ Deleted test namespace: {name}"),
        Err(kube::Error::Api(ae)) if ae.code == 404 => {
            println!("  Test namespace already deleted: {name}");
        }
        Err(e) => eprintln!("⚠ Failed to delete test namespace {name}: {e}"),
    }
}

/// Create a `StaticHost` from a JSON spec
pub async fn create_static_host(
    client: &Client,
    namespace: &str,
    name: &str,
    spec: serde_json::Value,
) -> Result<StaticHost, Box<dyn std::error::Error>> {
    let hosts: Api<StaticHost> = Api::namespaced(client.clone(), namespace);

    let host: StaticHost = serde_json::from_value(json!({
        "apiVersion": "asterius.fr/v1",
        "kind": "StaticHost",
        "metadata": { "name": name, "namespace": namespace },
        "spec": spec
    }))?;

    let created = hosts.create(&PostParams::default(), &host).await?;
    println!("✓ Created StaticHost {namespace}/{name}");
    Ok(created)
}

/// Poll `name` until `check` accepts it or `timeout` elapses.
///
/// Returns the last object seen that satisfied `check`, or `None` on timeout.
pub async fn wait_for<K, F>(api: &Api<K>, name: &str, timeout: Duration, check: F) -> Option<K>
where
    K: Clone + DeserializeOwned + Debug,
    F: Fn(Option<&K>) -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        let current = api.get_opt(name).await.ok().flatten();
        if check(current.as_ref()) {
            return current;
        }
        if Instant::now() >= deadline {
            eprintln!("⚠ Timed out waiting for {name}");
            return None;
        }
        sleep(Duration::from_millis(500)).await;
    }
}

/// Wait until `name` no longer exists. Returns false on timeout.
pub async fn wait_for_absent<K>(api: &Api<K>, name: &str, timeout: Duration) -> bool
where
    K: Clone + DeserializeOwned + Debug,
{
    let deadline = Instant::now() + timeout;
    loop {
        if matches!(api.get_opt(name).await, Ok(None)) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(Duration::from_millis(500)).await;
    }
}
