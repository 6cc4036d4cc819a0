// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the static host operator.
//!
//! - [`StoreError`] - failures talking to the cluster state store
//! - [`InvalidSpec`] - a spec that cannot be resolved into a backend
//! - [`ReconcileError`] - everything a reconciliation pass can fail with
//!
//! Each reconcile error knows whether it is transient (retried with backoff) and which
//! status reason it is reported under.

use crate::status_reasons::{
    REASON_INVALID_SPEC, REASON_OWNED_RESOURCE_CONFLICT, REASON_TRANSIENT_CLUSTER_ERROR,
};
use thiserror::Error;

/// Errors returned by a [`ClusterStore`](crate::store::ClusterStore).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The object does not exist (HTTP 404).
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: String,
        namespace: String,
        name: String,
    },

    /// Optimistic concurrency conflict or already-exists (HTTP 409).
    #[error("conflict on {kind} {namespace}/{name}: {message}")]
    Conflict {
        kind: String,
        namespace: String,
        name: String,
        message: String,
    },

    /// Any other API server response.
    #[error("API error {code} ({reason}): {message}")]
    Api {
        code: u16,
        reason: String,
        message: String,
    },

    /// The request never got an answer (connection refused, timeout, TLS).
    #[error("transport error: {0}")]
    Transport(String),

    /// The object could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Returns true if retrying the same request later may succeed.
    ///
    /// Conflicts, throttling (429), server errors (5xx) and transport failures are
    /// transient. Everything else is a permanent client error.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Conflict { .. } | Self::Transport(_) => true,
            Self::Api { code, .. } => *code == 429 || (500..600).contains(code),
            Self::NotFound { .. } | Self::Serialization(_) => false,
        }
    }

    /// Convert a `kube::Error` for an operation on `kind` `namespace/name`.
    #[must_use]
    pub fn from_kube(err: kube::Error, kind: &str, namespace: &str, name: &str) -> Self {
        match err {
            kube::Error::Api(resp) if resp.code == 404 => Self::NotFound {
                kind: kind.to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
            kube::Error::Api(resp) if resp.code == 409 => Self::Conflict {
                kind: kind.to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
                message: resp.message,
            },
            kube::Error::Api(resp) => Self::Api {
                code: resp.code,
                reason: resp.reason,
                message: resp.message,
            },
            other => Self::Transport(other.to_string()),
        }
    }
}

/// A spec field that failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct InvalidSpec {
    /// JSON path of the offending field (e.g. `spec.azure.accountName`).
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl InvalidSpec {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors produced by a reconciliation pass.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// The spec cannot be resolved. Terminal until the spec changes.
    #[error("invalid spec: {0}")]
    InvalidSpec(#[from] InvalidSpec),

    /// A target object exists and is controlled by someone else. Terminal.
    #[error("{kind} {namespace}/{name} already exists and is not owned by this resource ({owner})")]
    OwnedResourceConflict {
        kind: String,
        namespace: String,
        name: String,
        /// Description of the current controller, or `no controller`.
        owner: String,
    },

    /// A deleted object is still present (foreground deletion or foreign finalizer).
    #[error("{kind} {namespace}/{name} is still terminating")]
    DeletionPending {
        kind: String,
        namespace: String,
        name: String,
    },

    /// The custom resource lacks metadata the operator relies on.
    #[error("{kind} is missing metadata.{field}")]
    MissingMetadata { kind: String, field: &'static str },

    /// The cluster state store failed.
    #[error("{operation} failed: {source}")]
    Store {
        operation: String,
        #[source]
        source: StoreError,
    },

    /// Anything else.
    #[error(transparent)]
    Fatal(#[from] anyhow::Error),
}

impl ReconcileError {
    /// Wrap a store error with the operation that produced it.
    pub fn store(operation: impl Into<String>, source: StoreError) -> Self {
        Self::Store {
            operation: operation.into(),
            source,
        }
    }

    /// Returns true if the pass should be retried with backoff.
    ///
    /// Every store failure is retried, including permanent API rejections such as a
    /// 422 from an admission webhook or a quota. Only spec and ownership errors wait
    /// for the resource to change.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::InvalidSpec(_) | Self::OwnedResourceConflict { .. } => false,
            Self::DeletionPending { .. }
            | Self::MissingMetadata { .. }
            | Self::Store { .. }
            | Self::Fatal(_) => true,
        }
    }

    /// Returns the status condition reason this error is reported under.
    #[must_use]
    pub fn status_reason(&self) -> &'static str {
        match self {
            Self::InvalidSpec(_) => REASON_INVALID_SPEC,
            Self::OwnedResourceConflict { .. } => REASON_OWNED_RESOURCE_CONFLICT,
            _ => REASON_TRANSIENT_CLUSTER_ERROR,
        }
    }

    /// Short category used as the `error_type` metric label.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::InvalidSpec(_) => "invalid_spec",
            Self::OwnedResourceConflict { .. } => "owned_resource_conflict",
            Self::DeletionPending { .. } => "deletion_pending",
            Self::MissingMetadata { .. } => "missing_metadata",
            Self::Store { source, .. } if source.is_transient() => "transient_api_error",
            Self::Store { .. } => "api_error",
            Self::Fatal(_) => "internal_error",
        }
    }
}
