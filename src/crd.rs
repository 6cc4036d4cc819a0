// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for static website routing.
//!
//! # Resource Types
//!
//! - [`StaticHost`] (`asterius.fr/v1`) - routes a hostname to an Azure Blob or AWS S3
//!   static website through the shared Nginx proxy
//! - [`AzureStaticHost`] (`stp.operator.com/v1alpha1`) - legacy kind, Azure only
//!
//! Both kinds report the same [`StaticHostStatus`].
//!
//! # Example: Azure static website
//!
//! ```rust
//! use statichost::crd::{AzureSource, StaticHostSpec};
//!
//! let spec = StaticHostSpec {
//!     provider: "azure".to_string(),
//!     ingress: "site.example.com".to_string(),
//!     azure: Some(AzureSource {
//!         account_name: Some("mysite".to_string()),
//!         dns_zone_id: Some("6".to_string()),
//!         subpath: Some("/".to_string()),
//!     }),
//!     aws: None,
//!     proxy: None,
//! };
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Azure Blob static website origin.
///
/// Fields are optional in the schema so that an incomplete sub-spec is reported
/// in status as `InvalidSpec` rather than rejected at admission.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AzureSource {
    /// Storage account name (3-24 lowercase letters and digits).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,

    /// DNS zone partition of the account's web endpoint (`6` or `z6`).
    ///
    /// Accounts created with Azure DNS zone endpoints are served from
    /// `<account>.z<zone>.web.core.windows.net`. Omit for the classic endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_zone_id: Option<String>,

    /// Path inside the `$web` container to serve (e.g. `/docs`). Defaults to the root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subpath: Option<String>,
}

/// AWS S3 website endpoint origin.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AwsSource {
    /// Bucket name configured for static website hosting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket_name: Option<String>,

    /// AWS region of the bucket (e.g. `eu-west-3`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Key prefix inside the bucket to serve. Defaults to the bucket root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

/// Override of the proxy Service the `Ingress` routes to.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProxyOverride {
    /// Name of a Service in the same namespace fronting the Nginx proxy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

/// `StaticHost` routes an external hostname to an object-storage static website.
///
/// The operator renders an Nginx server block into a `ConfigMap` and creates an
/// `Ingress` sending the hostname to the shared proxy Service.
///
/// # Example
///
/// ```yaml
/// apiVersion: asterius.fr/v1
/// kind: StaticHost
/// metadata:
///   name: docs
///   namespace: web
/// spec:
///   provider: aws
///   ingress: docs.example.com
///   aws:
///     bucketName: docs-example-com
///     region: eu-west-3
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "asterius.fr",
    version = "v1",
    kind = "StaticHost",
    namespaced,
    shortname = "sth",
    doc = "StaticHost routes an external hostname to an Azure Blob or AWS S3 static website through the shared Nginx proxy.",
    printcolumn = r#"{"name":"Ingress","type":"string","jsonPath":".spec.ingress"}"#,
    printcolumn = r#"{"name":"Provider","type":"string","jsonPath":".spec.provider"}"#,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[kube(status = "StaticHostStatus")]
#[serde(rename_all = "camelCase")]
pub struct StaticHostSpec {
    /// Storage provider: `azure` or `aws` (case-insensitive).
    pub provider: String,

    /// Public hostname served by the `Ingress` (e.g. `site.example.com`).
    pub ingress: String,

    /// Azure origin. Required when `provider` is `azure`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure: Option<AzureSource>,

    /// AWS origin. Required when `provider` is `aws`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<AwsSource>,

    /// Proxy Service override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyOverride>,
}

/// Legacy Azure-only static host.
///
/// Accepts the older `host` field as a synonym of `ingress`.
#[derive(
    CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq,
)]
#[kube(
    group = "stp.operator.com",
    version = "v1alpha1",
    kind = "AzureStaticHost",
    namespaced,
    doc = "AzureStaticHost is the legacy Azure-only form of StaticHost.",
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#
)]
#[kube(status = "StaticHostStatus")]
#[serde(rename_all = "camelCase")]
pub struct AzureStaticHostSpec {
    /// Public hostname served by the `Ingress`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress: Option<String>,

    /// Deprecated spelling of `ingress`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Only `azure` is accepted. Defaults to `azure`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Azure origin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure: Option<AzureSource>,

    /// Proxy Service override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyOverride>,
}

impl AzureStaticHostSpec {
    /// View this legacy spec through the current `StaticHost` schema.
    ///
    /// `ingress` wins over `host` when both are set. A missing hostname becomes an
    /// empty string and is rejected by the resolver.
    #[must_use]
    pub fn to_static_host_spec(&self) -> StaticHostSpec {
        StaticHostSpec {
            provider: self
                .provider
                .clone()
                .unwrap_or_else(|| "azure".to_string()),
            ingress: self
                .ingress
                .clone()
                .or_else(|| self.host.clone())
                .unwrap_or_default(),
            azure: self.azure.clone(),
            aws: None,
            proxy: self.proxy.clone(),
        }
    }
}

/// Condition represents an observation of a resource's current state.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition: `Ready` or `Degraded`.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// Status shared by `StaticHost` and `AzureStaticHost`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StaticHostStatus {
    /// `Ready` and `Degraded` conditions.
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Generation of the spec last processed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Content hash of the last successfully applied `ConfigMap` and `Ingress`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_applied_hash: Option<String>,

    /// Lifecycle phase: Pending, Applying, Ready, Degraded or Deleting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,

    /// Name of the generated `ConfigMap`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_map: Option<String>,

    /// Key of the server block inside the `ConfigMap`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_key: Option<String>,

    /// Name of the generated `Ingress`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingress: Option<String>,

    /// Storage endpoint requests are proxied to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_host: Option<String>,
}
