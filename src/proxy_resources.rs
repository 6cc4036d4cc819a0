// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Proxy resource builders
//!
//! This module renders the Nginx server block for a resolved backend and wraps it,
//! together with the routing `Ingress`, into the [`DesiredResourceSet`] of one custom
//! resource. All functions are pure and easily testable.

use crate::config::OperatorConfig;
use crate::constants::{
    INGRESS_PATH_TYPE, INGRESS_ROOT_PATH, MAX_OBJECT_NAME_LEN, NAME_DIGEST_LEN, PROXY_LISTEN_PORT,
};
use crate::host_resource::OwnerIdentity;
use crate::labels::{
    APP_NAME_NGINX_PROXY, CERT_MANAGER_CLUSTER_ISSUER_ANNOTATION, COMPONENT_PROXY_CONFIG,
    COMPONENT_PROXY_ROUTE, INGRESS_CLASS_ANNOTATION, K8S_COMPONENT, K8S_MANAGED_BY, K8S_NAME,
    K8S_PART_OF, MANAGED_BY_STATICHOST_OPERATOR, OWNER_KIND_LABEL, OWNER_UID_LABEL,
    PART_OF_STATICHOST,
};
use crate::resolver::BackendDescriptor;
use anyhow::{Context as _, Result};
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::debug;

// Embed the server block template at compile time
const SERVER_BLOCK_TEMPLATE: &str = include_str!("../templates/server-block.conf.tmpl");

/// Deterministic names of the objects generated for one custom resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNames {
    /// `<name>-<slug>-nginx`
    pub config_map: String,
    /// `<name>-<slug>`
    pub ingress: String,
    /// `<name>-<slug>-tls`
    pub tls_secret: String,
    /// `<namespace>_<name>.<slug>.conf`, unique across namespaces and kinds so that
    /// every server block can be mounted into one proxy directory.
    pub config_key: String,
}

impl ResourceNames {
    #[must_use]
    pub fn for_owner(owner: &OwnerIdentity) -> Self {
        let base = format!("{}-{}", owner.name, owner.slug);
        Self {
            config_map: bounded_name(&format!("{base}-nginx")),
            ingress: bounded_name(&base),
            tls_secret: bounded_name(&format!("{base}-tls")),
            config_key: bounded_name(&format!(
                "{}_{}.{}.conf",
                owner.namespace, owner.name, owner.slug
            )),
        }
    }
}

/// Shorten `name` to the Kubernetes name limit, keeping it unique.
///
/// Names that fit are returned unchanged. Longer names are cut and suffixed with the
/// first hex digits of the SHA-256 of the full name.
#[must_use]
pub fn bounded_name(name: &str) -> String {
    if name.len() <= MAX_OBJECT_NAME_LEN {
        return name.to_string();
    }

    let digest = format!("{:x}", Sha256::digest(name.as_bytes()));
    let keep = MAX_OBJECT_NAME_LEN - NAME_DIGEST_LEN - 1;
    let prefix = name[..keep].trim_end_matches(['-', '.', '_']);
    format!("{prefix}-{}", &digest[..NAME_DIGEST_LEN])
}

/// Everything the operator wants to exist for one custom resource.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredResourceSet {
    pub names: ResourceNames,
    /// Rendered Nginx server block
    pub config_text: String,
    pub config_map: ConfigMap,
    pub ingress: Ingress,
    /// SHA-256 (hex) of the content above
    pub hash: String,
}

/// Build labels for generated objects.
///
/// Labels tie an object to its owner by UID so that leftovers can be found by
/// selector even after the owner's name has been reused.
#[must_use]
pub fn build_labels(owner: &OwnerIdentity, component: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(K8S_NAME.into(), APP_NAME_NGINX_PROXY.into());
    labels.insert(K8S_COMPONENT.into(), component.into());
    labels.insert(K8S_PART_OF.into(), PART_OF_STATICHOST.into());
    labels.insert(K8S_MANAGED_BY.into(), MANAGED_BY_STATICHOST_OPERATOR.into());
    labels.insert(OWNER_KIND_LABEL.into(), owner.slug.clone());
    labels.insert(OWNER_UID_LABEL.into(), owner.uid.clone());
    labels
}

/// Label selector matching every object generated for `owner`.
#[must_use]
pub fn owner_selector(owner: &OwnerIdentity) -> String {
    format!(
        "{K8S_MANAGED_BY}={MANAGED_BY_STATICHOST_OPERATOR},{OWNER_UID_LABEL}={}",
        owner.uid
    )
}

/// Label selector matching every object generated by this operator.
#[must_use]
pub fn managed_selector() -> String {
    format!("{K8S_MANAGED_BY}={MANAGED_BY_STATICHOST_OPERATOR}")
}

/// Build the controller owner reference pointing at `owner`.
#[must_use]
pub fn build_owner_reference(owner: &OwnerIdentity) -> OwnerReference {
    OwnerReference {
        api_version: owner.api_version.clone(),
        kind: owner.kind.clone(),
        name: owner.name.clone(),
        uid: owner.uid.clone(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

/// Render the Nginx server block proxying `backend.hostname` to the storage origin.
///
/// The outbound `Host` header is always the origin host: storage website endpoints
/// route on it and reject the public hostname. HTTPS origins also get SNI set to the
/// origin host.
#[must_use]
pub fn render_server_block(owner: &OwnerIdentity, backend: &BackendDescriptor) -> String {
    let tls_directives = if backend.tls {
        format!(
            "        proxy_ssl_server_name on;\n        proxy_ssl_name {};\n",
            backend.origin_host
        )
    } else {
        String::new()
    };

    SERVER_BLOCK_TEMPLATE
        .replace(
            "{{OWNER}}",
            &format!("{} {}/{}", owner.kind, owner.namespace, owner.name),
        )
        .replace("{{LISTEN_PORT}}", &PROXY_LISTEN_PORT.to_string())
        .replace("{{SERVER_NAME}}", &backend.hostname)
        .replace("{{ORIGIN_URL}}", &backend.origin_url())
        .replace("{{ORIGIN_HOST}}", &backend.origin_host)
        .replace("{{TLS_DIRECTIVES}}", &tls_directives)
}

/// Build the `ConfigMap` carrying the server block under `names.config_key`.
#[must_use]
pub fn build_config_map(owner: &OwnerIdentity, names: &ResourceNames, config_text: &str) -> ConfigMap {
    let mut data = BTreeMap::new();
    data.insert(names.config_key.clone(), config_text.to_string());

    ConfigMap {
        metadata: ObjectMeta {
            name: Some(names.config_map.clone()),
            namespace: Some(owner.namespace.clone()),
            labels: Some(build_labels(owner, COMPONENT_PROXY_CONFIG)),
            owner_references: Some(vec![build_owner_reference(owner)]),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    }
}

/// Build the `Ingress` routing `backend.hostname` to the proxy Service.
///
/// When a cluster issuer is configured, the `Ingress` also requests a certificate for
/// the hostname from cert-manager.
#[must_use]
pub fn build_ingress(
    owner: &OwnerIdentity,
    names: &ResourceNames,
    backend: &BackendDescriptor,
    config: &OperatorConfig,
) -> Ingress {
    let mut annotations = BTreeMap::new();
    annotations.insert(
        INGRESS_CLASS_ANNOTATION.to_string(),
        config.ingress_class.clone(),
    );

    let tls = config.cluster_issuer.as_ref().map(|issuer| {
        annotations.insert(
            CERT_MANAGER_CLUSTER_ISSUER_ANNOTATION.to_string(),
            issuer.clone(),
        );
        vec![IngressTLS {
            hosts: Some(vec![backend.hostname.clone()]),
            secret_name: Some(names.tls_secret.clone()),
        }]
    });

    let path = HTTPIngressPath {
        path: Some(INGRESS_ROOT_PATH.to_string()),
        path_type: INGRESS_PATH_TYPE.to_string(),
        backend: IngressBackend {
            service: Some(IngressServiceBackend {
                name: backend.proxy_service.clone(),
                port: Some(ServiceBackendPort {
                    number: Some(config.proxy_service_port),
                    ..Default::default()
                }),
            }),
            ..Default::default()
        },
    };

    Ingress {
        metadata: ObjectMeta {
            name: Some(names.ingress.clone()),
            namespace: Some(owner.namespace.clone()),
            labels: Some(build_labels(owner, COMPONENT_PROXY_ROUTE)),
            annotations: Some(annotations),
            owner_references: Some(vec![build_owner_reference(owner)]),
            ..Default::default()
        },
        spec: Some(IngressSpec {
            rules: Some(vec![IngressRule {
                host: Some(backend.hostname.clone()),
                http: Some(HTTPIngressRuleValue { paths: vec![path] }),
            }]),
            tls,
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[derive(Serialize)]
struct HashInput<'a> {
    config_map: &'a ConfigMap,
    ingress: &'a Ingress,
}

/// SHA-256 (hex) of the canonical JSON of both generated objects.
///
/// # Errors
///
/// Returns an error if the objects cannot be serialized.
pub fn content_hash(config_map: &ConfigMap, ingress: &Ingress) -> Result<String> {
    let canonical = serde_json::to_vec(&HashInput {
        config_map,
        ingress,
    })
    .context("failed to serialize desired objects for hashing")?;
    Ok(format!("{:x}", Sha256::digest(&canonical)))
}

/// Assemble the full desired state of `owner` from its resolved backend.
///
/// # Errors
///
/// Returns an error if the content hash cannot be computed.
pub fn build_desired_set(
    owner: &OwnerIdentity,
    backend: &BackendDescriptor,
    config: &OperatorConfig,
) -> Result<DesiredResourceSet> {
    let names = ResourceNames::for_owner(owner);
    debug!(
        owner = %owner.key(),
        config_map = %names.config_map,
        ingress = %names.ingress,
        "Building desired proxy resources"
    );

    let config_text = render_server_block(owner, backend);
    let config_map = build_config_map(owner, &names, &config_text);
    let ingress = build_ingress(owner, &names, backend, config);
    let hash = content_hash(&config_map, &ingress)?;

    Ok(DesiredResourceSet {
        names,
        config_text,
        config_map,
        ingress,
        hash,
    })
}

#[cfg(test)]
#[path = "proxy_resources_tests.rs"]
mod proxy_resources_tests;
