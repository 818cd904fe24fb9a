// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Finalizer management for Argo CD instances.
//!
//! Namespaced dependents carry an owner reference and are garbage collected
//! with their instance. Cluster-scoped dependents (cluster roles, cluster role
//! bindings, the keycloak OAuth client) cannot reference a namespaced owner, so
//! the instance holds a finalizer until they have been removed.
//!
//! # Example
//!
//! ```rust,ignore
//! use argocd_operator::reconcilers::finalizers::{ensure_finalizer, handle_deletion};
//! use argocd_operator::labels::FINALIZER_ARGOCD;
//!
//! async fn reconcile(api: &KubeClusterApi, instance: ArgoCD) -> Result<()> {
//!     if instance.metadata.deletion_timestamp.is_some() {
//!         return handle_deletion(api, &instance, FINALIZER_ARGOCD).await;
//!     }
//!     ensure_finalizer(api, &instance, FINALIZER_ARGOCD).await?;
//!     // Normal reconciliation...
//!     Ok(())
//! }
//! ```

use anyhow::Result;
use async_trait::async_trait;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding};
use kube::ResourceExt;
use serde_json::json;
use tracing::info;

use crate::argocd_resources::instance_namespace;
use crate::cluster::{ClusterApi, ClusterObject};
use crate::crd::{ArgoCD, OAuthClient};
use crate::labels::{OWNER_NAMESPACE_LABEL, OWNER_NAME_LABEL};
use crate::metrics;

/// Resources that must clean up before their finalizer is removed.
#[async_trait]
pub trait FinalizerCleanup: ClusterObject {
    /// Removes everything the resource owns that garbage collection will not.
    ///
    /// If this returns an error the finalizer stays in place and deletion is
    /// retried on the next reconciliation.
    ///
    /// # Errors
    ///
    /// Returns an error if a dependent cannot be listed or deleted.
    async fn cleanup<A: ClusterApi>(&self, api: &A) -> Result<()>;
}

fn has_finalizer<K: ClusterObject>(resource: &K, finalizer: &str) -> bool {
    resource.finalizers().iter().any(|f| f == finalizer)
}

/// Adds `finalizer` if missing. Returns `true` if the resource was patched.
///
/// # Errors
///
/// Returns an error if the patch fails.
pub async fn ensure_finalizer<A, K>(api: &A, resource: &K, finalizer: &str) -> Result<bool>
where
    A: ClusterApi,
    K: ClusterObject,
{
    if has_finalizer(resource, finalizer) {
        return Ok(false);
    }
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();

    let mut finalizers = resource.finalizers().to_vec();
    finalizers.push(finalizer.to_string());
    let patch = json!({ "metadata": { "finalizers": finalizers } });
    api.patch_merge::<K>(&namespace, &name, &patch).await?;

    info!(
        "Added finalizer {} to {}/{} {}",
        finalizer,
        namespace,
        name,
        K::kind(&())
    );
    Ok(true)
}

/// Removes `finalizer` if present.
///
/// # Errors
///
/// Returns an error if the patch fails.
pub async fn remove_finalizer<A, K>(api: &A, resource: &K, finalizer: &str) -> Result<()>
where
    A: ClusterApi,
    K: ClusterObject,
{
    if !has_finalizer(resource, finalizer) {
        return Ok(());
    }
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();

    let finalizers: Vec<String> = resource
        .finalizers()
        .iter()
        .filter(|f| *f != finalizer)
        .cloned()
        .collect();
    let patch = json!({ "metadata": { "finalizers": finalizers } });
    api.patch_merge::<K>(&namespace, &name, &patch).await?;

    info!(
        "Removed finalizer {} from {}/{} {}",
        finalizer,
        namespace,
        name,
        K::kind(&())
    );
    Ok(())
}

/// Runs cleanup and then releases the finalizer.
///
/// Does nothing if the finalizer is already gone.
///
/// # Errors
///
/// Returns an error if cleanup or the finalizer removal fails; the finalizer
/// then stays in place.
pub async fn handle_deletion<A, K>(api: &A, resource: &K, finalizer: &str) -> Result<()>
where
    A: ClusterApi,
    K: FinalizerCleanup,
{
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    info!("{} {}/{} is being deleted", K::kind(&()), namespace, name);

    if has_finalizer(resource, finalizer) {
        resource.cleanup(api).await?;
        remove_finalizer(api, resource, finalizer).await?;
    }
    Ok(())
}

/// Deletes every `K` labelled as owned by `instance`. Returns the number deleted.
async fn delete_owned<A, K>(api: &A, instance: &ArgoCD) -> Result<usize>
where
    A: ClusterApi,
    K: ClusterObject,
{
    let selector = format!(
        "{OWNER_NAME_LABEL}={},{OWNER_NAMESPACE_LABEL}={}",
        instance.name_any(),
        instance_namespace(instance)
    );
    let owned = api.list::<K>("", &selector).await?;
    for object in &owned {
        let name = object.name_any();
        api.delete::<K>("", &name).await?;
        metrics::record_object_write(&K::kind(&()), "deleted");
        info!(name = %name, kind = %K::kind(&()), "Deleted cluster-scoped dependent");
    }
    Ok(owned.len())
}

#[async_trait]
impl FinalizerCleanup for ArgoCD {
    async fn cleanup<A: ClusterApi>(&self, api: &A) -> Result<()> {
        let deleted = delete_owned::<A, ClusterRoleBinding>(api, self).await?
            + delete_owned::<A, ClusterRole>(api, self).await?
            + delete_owned::<A, OAuthClient>(api, self).await?;
        info!(
            namespace = %instance_namespace(self),
            name = %self.name_any(),
            deleted,
            "Cleaned up cluster-scoped dependents"
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "finalizers_tests.rs"]
mod finalizers_tests;
