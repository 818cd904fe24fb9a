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

/// Standard label for the component name within the architecture
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

/// Value for `app.kubernetes.io/part-of`
pub const PART_OF_ARGOCD: &str = "argocd";

/// Value for `app.kubernetes.io/managed-by`
pub const MANAGED_BY_OPERATOR: &str = "argocd-operator";

// ============================================================================
// Ownership Labels (cluster-scoped objects cannot carry namespaced owner references)
// ============================================================================

/// Name of the owning `ArgoCD` instance
pub const OWNER_NAME_LABEL: &str = "argocd.argoproj.io/owner-name";

/// Namespace of the owning `ArgoCD` instance
pub const OWNER_NAMESPACE_LABEL: &str = "argocd.argoproj.io/owner-namespace";

// ============================================================================
// Annotations
// ============================================================================

/// Completion marker for the one-time keycloak realm configuration
pub const REALM_CREATED_ANNOTATION: &str = "argocd.argoproj.io/realm-created";

/// SHA-256 fingerprint of the root certificate that signed a leaf
pub const ISSUER_FINGERPRINT_ANNOTATION: &str = "argocd.argoproj.io/issuer-fingerprint";

/// Makes the platform issue a serving certificate for a service
pub const SERVING_CERT_ANNOTATION: &str = "service.beta.openshift.io/serving-cert-secret-name";

// ============================================================================
// Rollout Trigger Labels (pod template)
// ============================================================================

/// `argocd-secret` content changed
pub const ROLLOUT_SECRET_CHANGED: &str = "argocd.argoproj.io/secret-changed";

/// Serving certificate reissued
pub const ROLLOUT_TLS_CHANGED: &str = "argocd.argoproj.io/tls-changed";

/// Repo server certificate reissued
pub const ROLLOUT_REPO_TLS_CHANGED: &str = "argocd.argoproj.io/repo-tls-changed";

// ============================================================================
// Finalizers
// ============================================================================

/// Deletion guard for `ArgoCD` resources
pub const FINALIZER_ARGOCD: &str = "argoproj.io/finalizer";
