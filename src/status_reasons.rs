// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Standard Kubernetes status condition reasons for static host resources.
//!
//! Reasons are programmatic identifiers in CamelCase that explain why a condition has
//! a particular status. Every `StaticHost` and `AzureStaticHost` carries two conditions:
//!
//! - **`Ready`** - the generated `ConfigMap` and `Ingress` match the spec
//! - **`Degraded`** - the last pass failed and needs attention
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   phase: Degraded
//!   conditions:
//!     - type: Ready
//!       status: "False"
//!       reason: InvalidSpec
//!       message: "spec.provider: unsupported provider 'gcp' (expected one of: azure, aws)"
//!     - type: Degraded
//!       status: "True"
//!       reason: InvalidSpec
//!       message: "spec.provider: unsupported provider 'gcp' (expected one of: azure, aws)"
//! ```

// ============================================================================
// Condition Types
// ============================================================================

/// Condition type reporting that desired and observed state match.
pub const CONDITION_TYPE_READY: &str = "Ready";

/// Condition type reporting that the last reconciliation failed.
pub const CONDITION_TYPE_DEGRADED: &str = "Degraded";

// ============================================================================
// Success Reasons
// ============================================================================

/// Generated objects match the desired state.
pub const REASON_RECONCILED: &str = "Reconciled";

/// Generated objects are being created or updated.
pub const REASON_APPLYING: &str = "Applying";

/// The custom resource is being deleted and its objects are being removed.
pub const REASON_DELETING: &str = "Deleting";

// ============================================================================
// Failure Reasons
// ============================================================================

/// The spec cannot be resolved into a backend (unknown provider, missing sub-spec, bad value).
///
/// Terminal until the spec is edited.
pub const REASON_INVALID_SPEC: &str = "InvalidSpec";

/// A target object exists but is controlled by something else.
///
/// Terminal. The operator never adopts another controller's object.
pub const REASON_OWNED_RESOURCE_CONFLICT: &str = "OwnedResourceConflict";

/// The API server kept failing (timeouts, conflicts, throttling) past the retry budget.
pub const REASON_TRANSIENT_CLUSTER_ERROR: &str = "TransientClusterError";

