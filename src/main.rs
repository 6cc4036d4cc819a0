// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use clap::Parser;
use kube::Client;
use statichost::{
    config::{Cli, OperatorConfig},
    constants::TOKIO_WORKER_THREADS,
    context::Context,
    controller::run_host_controller,
    crd::{AzureStaticHost, StaticHost},
    metrics::serve_metrics,
    store::KubeStore,
};
use std::sync::Arc;
use tracing::{debug, error, info};

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("statichost-operator")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

fn init_tracing() {
    // Respects RUST_LOG (default: info) and RUST_LOG_FORMAT=json|text
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main() -> Result<()> {
    init_tracing();

    let config = OperatorConfig::try_from(Cli::parse())?;
    info!("Starting StaticHost operator");
    debug!(?config, "Loaded operator configuration");

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let metrics_addr = config.metrics_addr;
    let ctx = Arc::new(Context::new(KubeStore::new(client.clone()), config));

    info!("Starting all controllers");

    // Controllers should never exit - if one does, log it and exit the process
    tokio::select! {
        result = serve_metrics(metrics_addr) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("metrics server exited unexpectedly without error")
        }
        result = run_host_controller::<StaticHost>(client.clone(), ctx.clone()) => {
            error!("CRITICAL: StaticHost controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("StaticHost controller exited unexpectedly without error")
        }
        result = run_host_controller::<AzureStaticHost>(client, ctx) => {
            error!("CRITICAL: AzureStaticHost controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("AzureStaticHost controller exited unexpectedly without error")
        }
    }
}
