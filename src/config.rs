// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator configuration.
//!
//! Every setting has a default from [`crate::constants`] and can be overridden by a
//! `STATICHOST_*` environment variable or the matching command-line flag:
//!
//! | Flag | Environment | Default |
//! |------|-------------|---------|
//! | `--namespace` | `STATICHOST_NAMESPACE` | all namespaces |
//! | `--default-proxy-service` | `STATICHOST_DEFAULT_PROXY_SERVICE` | `nginx-proxy` |
//! | `--ingress-class` | `STATICHOST_INGRESS_CLASS` | `nginx` |
//! | `--cluster-issuer` | `STATICHOST_CLUSTER_ISSUER` | `letsencrypt-prod` (empty disables TLS) |
//! | `--concurrency` | `STATICHOST_CONCURRENCY` | `8` |
//! | `--debounce-secs` | `STATICHOST_DEBOUNCE_SECS` | `1` |
//! | `--drift-interval-secs` | `STATICHOST_DRIFT_INTERVAL_SECS` | `10` |
//! | `--retry-budget` | `STATICHOST_RETRY_BUDGET` | `5` |
//! | `--resync-secs` | `STATICHOST_RESYNC_SECS` | `300` |
//! | `--metrics-addr` | `STATICHOST_METRICS_ADDR` | `0.0.0.0:8080` |

use crate::constants::{
    DEFAULT_CLUSTER_ISSUER, DEFAULT_CONCURRENCY, DEFAULT_DEBOUNCE_SECS,
    DEFAULT_DRIFT_INTERVAL_SECS, DEFAULT_INGRESS_CLASS, DEFAULT_PROXY_SERVICE,
    DEFAULT_RETRY_BUDGET, METRICS_SERVER_BIND_ADDRESS, METRICS_SERVER_PORT, PROXY_SERVICE_PORT,
    READY_REQUEUE_SECS,
};
use anyhow::{bail, Context as _, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

/// Command-line interface of the operator binary.
#[derive(Parser, Debug, Clone)]
#[command(name = "statichost-operator")]
#[command(about = "Routes Ingress traffic to Azure Blob and AWS S3 static websites")]
#[command(version)]
pub struct Cli {
    /// Namespace to watch (empty for cluster-wide)
    #[arg(long, env = "STATICHOST_NAMESPACE", default_value = "")]
    pub namespace: String,

    /// Proxy Service used when a resource sets no `proxy.service`
    #[arg(long, env = "STATICHOST_DEFAULT_PROXY_SERVICE", default_value = DEFAULT_PROXY_SERVICE)]
    pub default_proxy_service: String,

    /// Value of the `kubernetes.io/ingress.class` annotation on generated Ingresses
    #[arg(long, env = "STATICHOST_INGRESS_CLASS", default_value = DEFAULT_INGRESS_CLASS)]
    pub ingress_class: String,

    /// cert-manager ClusterIssuer for Ingress TLS (empty disables TLS)
    #[arg(long, env = "STATICHOST_CLUSTER_ISSUER", default_value = DEFAULT_CLUSTER_ISSUER)]
    pub cluster_issuer: String,

    /// Maximum resources reconciled concurrently per kind
    #[arg(long, env = "STATICHOST_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: u16,

    /// Seconds to wait for further events before reconciling
    #[arg(long, env = "STATICHOST_DEBOUNCE_SECS", default_value_t = DEFAULT_DEBOUNCE_SECS)]
    pub debounce_secs: u64,

    /// Minimum seconds between two drift corrections of one resource
    #[arg(long, env = "STATICHOST_DRIFT_INTERVAL_SECS", default_value_t = DEFAULT_DRIFT_INTERVAL_SECS)]
    pub drift_interval_secs: u64,

    /// Failed passes tolerated before a transient error is reported as Degraded
    #[arg(long, env = "STATICHOST_RETRY_BUDGET", default_value_t = DEFAULT_RETRY_BUDGET)]
    pub retry_budget: u32,

    /// Seconds between periodic resyncs of ready resources
    #[arg(long, env = "STATICHOST_RESYNC_SECS", default_value_t = READY_REQUEUE_SECS)]
    pub resync_secs: u64,

    /// Address of the Prometheus metrics server
    #[arg(long, env = "STATICHOST_METRICS_ADDR", default_value_t = default_metrics_addr())]
    pub metrics_addr: SocketAddr,
}

fn default_metrics_addr() -> SocketAddr {
    SocketAddr::new(
        METRICS_SERVER_BIND_ADDRESS
            .parse()
            .unwrap_or(std::net::Ipv4Addr::UNSPECIFIED.into()),
        METRICS_SERVER_PORT,
    )
}

/// Validated operator settings shared by every reconciler.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorConfig {
    /// Namespace to watch, or `None` for all namespaces.
    pub namespace: Option<String>,
    pub default_proxy_service: String,
    pub ingress_class: String,
    /// `None` disables the cert-manager annotation and the Ingress TLS block.
    pub cluster_issuer: Option<String>,
    pub proxy_service_port: i32,
    pub concurrency: u16,
    pub debounce: Duration,
    pub drift_interval: Duration,
    pub retry_budget: u32,
    pub resync_interval: Duration,
    pub metrics_addr: SocketAddr,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            default_proxy_service: DEFAULT_PROXY_SERVICE.to_string(),
            ingress_class: DEFAULT_INGRESS_CLASS.to_string(),
            cluster_issuer: Some(DEFAULT_CLUSTER_ISSUER.to_string()),
            proxy_service_port: PROXY_SERVICE_PORT,
            concurrency: DEFAULT_CONCURRENCY,
            debounce: Duration::from_secs(DEFAULT_DEBOUNCE_SECS),
            drift_interval: Duration::from_secs(DEFAULT_DRIFT_INTERVAL_SECS),
            retry_budget: DEFAULT_RETRY_BUDGET,
            resync_interval: Duration::from_secs(READY_REQUEUE_SECS),
            metrics_addr: default_metrics_addr(),
        }
    }
}

impl TryFrom<Cli> for OperatorConfig {
    type Error = anyhow::Error;

    fn try_from(cli: Cli) -> Result<Self> {
        let default_proxy_service = cli.default_proxy_service.trim().to_string();
        crate::resolver::validate_service_name(&default_proxy_service)
            .context("invalid --default-proxy-service")?;

        let ingress_class = cli.ingress_class.trim().to_string();
        if ingress_class.is_empty() {
            bail!("--ingress-class must not be empty");
        }
        if cli.concurrency == 0 {
            bail!("--concurrency must be at least 1");
        }
        if cli.retry_budget == 0 {
            bail!("--retry-budget must be at least 1");
        }
        if cli.resync_secs == 0 {
            bail!("--resync-secs must be at least 1");
        }

        let namespace = Some(cli.namespace.trim().to_string()).filter(|ns| !ns.is_empty());
        let cluster_issuer =
            Some(cli.cluster_issuer.trim().to_string()).filter(|issuer| !issuer.is_empty());

        Ok(Self {
            namespace,
            default_proxy_service,
            ingress_class,
            cluster_issuer,
            proxy_service_port: PROXY_SERVICE_PORT,
            concurrency: cli.concurrency,
            debounce: Duration::from_secs(cli.debounce_secs),
            drift_interval: Duration::from_secs(cli.drift_interval_secs),
            retry_budget: cli.retry_budget,
            resync_interval: Duration::from_secs(cli.resync_secs),
            metrics_addr: cli.metrics_addr,
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
