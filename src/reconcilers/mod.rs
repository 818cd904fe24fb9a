// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation logic for `ArgoCD` instances.
//!
//! # Reconciliation Architecture
//!
//! The operator follows the standard Kubernetes controller pattern:
//!
//! 1. **Watch** - `ArgoCD` instances and the objects they own
//! 2. **Reconcile** - Drive every dependent object toward its desired state
//! 3. **Status** - Report component and instance phases back to the instance
//!
//! # Modules
//!
//! - [`argocd`] - One full pass over an instance, stage by stage
//! - [`converge`] - Create/update/delete of a single dependent object
//! - [`certificates`] - Internal CA and leaf certificates
//! - [`rollout`] - Forced restarts after a secret or certificate change
//! - [`sso`] - Keycloak broker and realm bootstrap
//! - [`finalizers`] - Cleanup of cluster-scoped dependents on deletion
//! - [`status`] - Component and instance phases
//!
//! # Example
//!
//! ```rust,ignore
//! use argocd_operator::cluster::KubeClusterApi;
//! use argocd_operator::reconcilers::{reconcile_argocd, ReconcileSettings};
//! use argocd_operator::reconcilers::sso::keycloak::KeycloakAdminClient;
//!
//! async fn reconcile(api: &KubeClusterApi, settings: &ReconcileSettings, instance: &ArgoCD) -> anyhow::Result<()> {
//!     let report = reconcile_argocd(api, &KeycloakAdminClient::new(), settings, instance).await?;
//!     println!("requeue in {:?}", report.requeue_after());
//!     Ok(())
//! }
//! ```

use rand::distributions::Alphanumeric;
use rand::Rng;

pub mod argocd;
pub mod certificates;
pub mod converge;
pub mod finalizers;
pub mod rollout;
pub mod sso;
pub mod status;

pub use argocd::{reconcile_argocd, PassReport, ReconcileSettings};

/// Random alphanumeric string for generated passwords, keys and client secrets.
#[must_use]
pub fn generate_secret(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod mod_tests;
