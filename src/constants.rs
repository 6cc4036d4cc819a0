// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the static host operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// Fully qualified API version (group/version) for `StaticHost`
pub const API_GROUP_VERSION: &str = "asterius.fr/v1";

/// Fully qualified API version (group/version) for `AzureStaticHost`
pub const LEGACY_API_GROUP_VERSION: &str = "stp.operator.com/v1alpha1";

/// Kind name for `StaticHost` resource
pub const KIND_STATIC_HOST: &str = "StaticHost";

/// Kind name for `AzureStaticHost` resource
pub const KIND_AZURE_STATIC_HOST: &str = "AzureStaticHost";

/// Name slug embedded in generated object names for `StaticHost`
pub const SLUG_STATIC_HOST: &str = "statichost";

/// Name slug embedded in generated object names for `AzureStaticHost`
pub const SLUG_AZURE_STATIC_HOST: &str = "azurestatichost";

// ============================================================================
// Storage Endpoint Constants
// ============================================================================

/// Domain suffix of Azure Blob static website endpoints
pub const AZURE_STATIC_WEBSITE_SUFFIX: &str = "web.core.windows.net";

/// Domain suffix of AWS S3 website endpoints
pub const AWS_S3_WEBSITE_SUFFIX: &str = "amazonaws.com";

/// Regions whose S3 website endpoint uses the `s3-website-<region>` dash form
pub const AWS_LEGACY_DASH_REGIONS: &[&str] = &[
    "us-east-1",
    "us-west-1",
    "us-west-2",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-northeast-1",
    "eu-west-1",
    "sa-east-1",
    "us-gov-west-1",
];

// ============================================================================
// Proxy Constants
// ============================================================================

/// Default Service fronting the shared Nginx proxy deployment
pub const DEFAULT_PROXY_SERVICE: &str = "nginx-proxy";

/// Port the Ingress backend targets on the proxy Service
pub const PROXY_SERVICE_PORT: i32 = 80;

/// Port the generated server block listens on
pub const PROXY_LISTEN_PORT: u16 = 80;

/// Default ingress class selecting the edge controller
pub const DEFAULT_INGRESS_CLASS: &str = "nginx";

/// Default cert-manager cluster issuer for Ingress TLS
pub const DEFAULT_CLUSTER_ISSUER: &str = "letsencrypt-prod";

/// Ingress path routed to the proxy
pub const INGRESS_ROOT_PATH: &str = "/";

/// Path type of the single Ingress rule
pub const INGRESS_PATH_TYPE: &str = "Prefix";

/// Maximum length of a Kubernetes object name
pub const MAX_OBJECT_NAME_LEN: usize = 253;

/// Number of hex characters of the digest appended to shortened names
pub const NAME_DIGEST_LEN: usize = 8;

// ============================================================================
// Controller Error Handling Constants
// ============================================================================

/// Base delay for per-resource exponential requeue (5 seconds)
pub const ERROR_REQUEUE_BASE_SECS: u64 = 5;

/// Ceiling for per-resource exponential requeue (5 minutes)
pub const ERROR_REQUEUE_MAX_SECS: u64 = 300;

/// Jitter applied to error requeues (±10%)
pub const ERROR_REQUEUE_JITTER: f64 = 0.1;

/// Consecutive failed passes tolerated before a transient error is surfaced as `Degraded`
pub const DEFAULT_RETRY_BUDGET: u32 = 5;

/// Periodic resync interval for ready resources (5 minutes)
pub const READY_REQUEUE_SECS: u64 = 300;

/// Minimum interval between two drift corrections of one resource (10 seconds)
pub const DEFAULT_DRIFT_INTERVAL_SECS: u64 = 10;

/// Debounce window collapsing bursts of watch events (1 second)
pub const DEFAULT_DEBOUNCE_SECS: u64 = 1;

/// Maximum number of resources reconciled concurrently per controller
pub const DEFAULT_CONCURRENCY: u16 = 8;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Field manager name used for API writes
pub const FIELD_MANAGER: &str = "statichost-operator";

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Port for Prometheus metrics HTTP server
pub const METRICS_SERVER_PORT: u16 = 8080;

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Bind address for metrics HTTP server
pub const METRICS_SERVER_BIND_ADDRESS: &str = "0.0.0.0";
