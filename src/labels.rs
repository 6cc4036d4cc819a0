// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label and annotation constants used across all reconcilers.
//!
//! This module defines standard Kubernetes labels and operator-specific labels/annotations
//! to ensure consistency across all resources created by the controller.

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the component name within the architecture (e.g., "proxy-config")
pub const K8S_COMPONENT: &str = "app.kubernetes.io/component";

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for the name of the application
pub const K8S_NAME: &str = "app.kubernetes.io/name";

/// Standard label for the name of a higher-level application this one is part of
pub const K8S_PART_OF: &str = "app.kubernetes.io/part-of";

// ============================================================================
// Kubernetes Standard Label Values
// ============================================================================

/// Value for `app.kubernetes.io/managed-by` on every generated object
pub const MANAGED_BY_STATICHOST_OPERATOR: &str = "statichost-operator";

/// Value for `app.kubernetes.io/part-of`
pub const PART_OF_STATICHOST: &str = "statichost";

/// Application name for generated objects
pub const APP_NAME_NGINX_PROXY: &str = "nginx-proxy";

/// Component value for the generated server-block `ConfigMap`
pub const COMPONENT_PROXY_CONFIG: &str = "proxy-config";

/// Component value for the generated `Ingress`
pub const COMPONENT_PROXY_ROUTE: &str = "proxy-route";

// ============================================================================
// Operator-Specific Labels
// ============================================================================

/// Label carrying the kind of the owning custom resource
pub const OWNER_KIND_LABEL: &str = "asterius.fr/owner-kind";

/// Label carrying the UID of the owning custom resource
pub const OWNER_UID_LABEL: &str = "asterius.fr/owner-uid";

// ============================================================================
// Annotations
// ============================================================================

/// Annotation selecting the ingress controller for an `Ingress`
pub const INGRESS_CLASS_ANNOTATION: &str = "kubernetes.io/ingress.class";

/// Annotation requesting a certificate from a cert-manager `ClusterIssuer`
pub const CERT_MANAGER_CLUSTER_ISSUER_ANNOTATION: &str = "cert-manager.io/cluster-issuer";

/// Annotations the operator writes on generated objects.
///
/// One of these on an observed object but absent from the desired object is stale and
/// gets removed on the next replace.
pub const OPERATOR_ANNOTATIONS: &[&str] = &[
    INGRESS_CLASS_ANNOTATION,
    CERT_MANAGER_CLUSTER_ISSUER_ANNOTATION,
];

/// Annotation on a generated object telling the operator to leave its content alone.
///
/// Objects carrying `"true"` are still created when missing and still deleted with
/// their owner, but drift on them is never corrected.
pub const EXTERNALLY_MANAGED_ANNOTATION: &str = "asterius.fr/externally-managed";

// ============================================================================
// Finalizers
// ============================================================================

/// Finalizer for `StaticHost` resources
pub const FINALIZER_STATIC_HOST: &str = "asterius.fr/statichost";

/// Finalizer for `AzureStaticHost` resources
pub const FINALIZER_AZURE_STATIC_HOST: &str = "stp.operator.com/azurestatichost";
