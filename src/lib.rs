// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # statichost - static website routing operator for Kubernetes
//!
//! The operator turns `StaticHost` (`asterius.fr/v1`) and legacy `AzureStaticHost`
//! (`stp.operator.com/v1alpha1`) custom resources into the two objects a shared Nginx
//! proxy needs to serve an object-storage static website under a public hostname:
//!
//! - a `ConfigMap` holding an Nginx server block that proxies to the Azure Blob or
//!   AWS S3 website endpoint, rewriting the `Host` header
//! - an `Ingress` routing the hostname to the proxy Service
//!
//! ## Modules
//!
//! - [`crd`] - Custom Resource Definition types
//! - [`resolver`] - spec validation into a backend descriptor
//! - [`proxy_resources`] - rendering of the desired `ConfigMap` and `Ingress`
//! - [`reconcilers`] - reconciliation, cleanup, drift and retry logic
//! - [`controller`] - `kube::runtime` controllers for both kinds
//! - [`store`] - cluster state store seam
//! - [`config`] - operator settings
//! - [`metrics`] - Prometheus metrics and the metrics server
//!
//! ## Example
//!
//! ```rust
//! use statichost::crd::{AzureSource, StaticHostSpec};
//! use statichost::resolver::{resolve, Provider};
//!
//! let spec = StaticHostSpec {
//!     provider: "azure".to_string(),
//!     ingress: "site.example.com".to_string(),
//!     azure: Some(AzureSource {
//!         account_name: Some("test".to_string()),
//!         dns_zone_id: None,
//!         subpath: Some("/".to_string()),
//!     }),
//!     aws: None,
//!     proxy: None,
//! };
//!
//! let backend = resolve(&spec, &[Provider::Azure, Provider::Aws], "nginx-proxy").unwrap();
//! assert_eq!(backend.origin_host, "test.web.core.windows.net");
//! ```

pub mod config;
pub mod constants;
pub mod context;
pub mod controller;
pub mod crd;
pub mod errors;
pub mod host_resource;
pub mod labels;
pub mod metrics;
pub mod proxy_resources;
pub mod reconcilers;
pub mod resolver;
pub mod status_reasons;
pub mod store;

#[cfg(test)]
pub mod fake_store;
