// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation of static host resources.
//!
//! `StaticHost` and `AzureStaticHost` share one engine, [`reconcile_host`], generic
//! over the kind (see [`HostResource`](crate::host_resource::HostResource)) and over
//! the cluster state store.
//!
//! # Reconciliation Architecture
//!
//! 1. **Resolve** - validate the spec into a backend descriptor
//! 2. **Render** - build the desired `ConfigMap` and `Ingress`
//! 3. **Compare** - diff against what exists, checking ownership
//! 4. **Apply** - create or replace what differs, then report status
//!
//! # Modules
//!
//! - [`statichost`] - the reconciliation pass
//! - [`diff`] - ownership checks and drift detection
//! - [`cleanup`] - ordered deletion of generated objects
//! - [`finalizers`] - finalizer handling around cleanup
//! - [`status`] - condition and status management
//! - [`retry`] - API retries and per-resource backoff
//! - [`drift`] - rate limiting of drift corrections
//!
//! # Example
//!
//! ```rust,no_run
//! use statichost::config::OperatorConfig;
//! use statichost::context::Context;
//! use statichost::crd::StaticHost;
//! use statichost::reconcilers::reconcile_host;
//! use statichost::store::KubeStore;
//!
//! async fn reconcile(client: kube::Client, host: StaticHost) -> anyhow::Result<()> {
//!     let ctx = Context::new(KubeStore::new(client), OperatorConfig::default());
//!     let outcome = reconcile_host(&host, &ctx).await?;
//!     println!("{outcome:?}");
//!     Ok(())
//! }
//! ```

pub mod cleanup;
pub mod diff;
pub mod drift;
pub mod finalizers;
pub mod retry;
pub mod statichost;
pub mod status;

pub use statichost::{reconcile_host, ReconcileOutcome};
