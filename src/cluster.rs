// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cluster API access for reconcilers.
//!
//! Reconcilers never hold a [`kube::Client`] directly. They talk to the cluster
//! through [`ClusterApi`], which offers typed get/create/replace/delete/list/patch
//! over every object kind the operator manages, regardless of scope. This keeps
//! the convergence logic free of scope-specific `Api` construction and lets unit
//! tests run against an in-memory cluster.
//!
//! # Object kinds
//!
//! Every kind implements [`ClusterObject`], which records whether it is
//! cluster-scoped and how to build a `kube::Api` for it.
//!
//! # Example
//!
//! ```rust,no_run
//! use argocd_operator::cluster::{ClusterApi, KubeClusterApi};
//! use k8s_openapi::api::core::v1::ConfigMap;
//! use kube::Client;
//! use anyhow::Result;
//!
//! async fn example(client: Client) -> Result<()> {
//!     let api = KubeClusterApi::new(client);
//!     if let Some(cm) = api.get::<ConfigMap>("argocd", "argocd-cm").await? {
//!         println!("found {:?}", cm.data);
//!     }
//!     Ok(())
//! }
//! ```

pub mod capabilities;
#[cfg(test)]
pub mod fake;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service, ServiceAccount};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use kube::api::{DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use tracing::debug;

use crate::constants::FIELD_MANAGER;
use crate::crd::{ArgoCD, DeploymentConfig, OAuthClient, Route, TemplateInstance};

pub use capabilities::PlatformCapabilities;

/// An object kind the operator reads or writes.
pub trait ClusterObject:
    Resource<DynamicType = ()> + Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// True for kinds without a namespace (roles, OAuth clients).
    const CLUSTER_SCOPED: bool;

    /// Builds a typed API handle. `namespace` is ignored for cluster-scoped kinds.
    fn api(client: Client, namespace: &str) -> Api<Self>;
}

macro_rules! namespaced_objects {
    ($($kind:ty),* $(,)?) => {
        $(
            impl ClusterObject for $kind {
                const CLUSTER_SCOPED: bool = false;

                fn api(client: Client, namespace: &str) -> Api<Self> {
                    Api::namespaced(client, namespace)
                }
            }
        )*
    };
}

macro_rules! cluster_scoped_objects {
    ($($kind:ty),* $(,)?) => {
        $(
            impl ClusterObject for $kind {
                const CLUSTER_SCOPED: bool = true;

                fn api(client: Client, _namespace: &str) -> Api<Self> {
                    Api::all(client)
                }
            }
        )*
    };
}

namespaced_objects!(
    ArgoCD,
    Deployment,
    StatefulSet,
    Service,
    ServiceAccount,
    ConfigMap,
    Secret,
    Role,
    RoleBinding,
    HorizontalPodAutoscaler,
    Ingress,
    Route,
    TemplateInstance,
    DeploymentConfig,
);

cluster_scoped_objects!(ClusterRole, ClusterRoleBinding, OAuthClient);

/// Typed cluster operations used by every reconciler.
///
/// `get` distinguishes "absent" (`Ok(None)`) from every other failure,
/// `delete` treats an already-absent object as success, and `list` of a kind
/// the API server does not serve is empty. All other errors are returned to
/// the caller unchanged apart from added context.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Fetches an object, returning `Ok(None)` when it does not exist.
    async fn get<K: ClusterObject>(&self, namespace: &str, name: &str) -> Result<Option<K>>;

    /// Creates an object.
    async fn create<K: ClusterObject>(&self, namespace: &str, object: &K) -> Result<K>;

    /// Replaces an existing object with `object`.
    async fn replace<K: ClusterObject>(&self, namespace: &str, object: &K) -> Result<K>;

    /// Deletes an object. Deleting an absent object succeeds.
    async fn delete<K: ClusterObject>(&self, namespace: &str, name: &str) -> Result<()>;

    /// Lists objects matching an equality label selector (`k=v,k2=v2`).
    async fn list<K: ClusterObject>(&self, namespace: &str, label_selector: &str)
        -> Result<Vec<K>>;

    /// Applies a JSON merge patch to an object.
    async fn patch_merge<K: ClusterObject>(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<K>;

    /// Applies a JSON merge patch to the status subresource.
    async fn patch_status<K: ClusterObject>(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<K>;
}

/// [`ClusterApi`] backed by a live API server.
#[derive(Clone)]
pub struct KubeClusterApi {
    client: Client,
}

impl KubeClusterApi {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Underlying client, for watches and discovery.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Human-readable location of an object for error context.
fn describe<K: ClusterObject>(namespace: &str, name: &str) -> String {
    if K::CLUSTER_SCOPED {
        format!("{} {}", K::kind(&()), name)
    } else {
        format!("{} {}/{}", K::kind(&()), namespace, name)
    }
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn get<K: ClusterObject>(&self, namespace: &str, name: &str) -> Result<Option<K>> {
        let api = K::api(self.client.clone(), namespace);
        match api.get(name).await {
            Ok(object) => Ok(Some(object)),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(None),
            Err(e) => {
                Err(e).with_context(|| format!("failed to get {}", describe::<K>(namespace, name)))
            }
        }
    }

    async fn create<K: ClusterObject>(&self, namespace: &str, object: &K) -> Result<K> {
        let api = K::api(self.client.clone(), namespace);
        api.create(&PostParams::default(), object)
            .await
            .with_context(|| {
                format!(
                    "failed to create {}",
                    describe::<K>(namespace, &object.name_any())
                )
            })
    }

    async fn replace<K: ClusterObject>(&self, namespace: &str, object: &K) -> Result<K> {
        let name = object.name_any();
        let api = K::api(self.client.clone(), namespace);
        api.replace(&name, &PostParams::default(), object)
            .await
            .with_context(|| format!("failed to update {}", describe::<K>(namespace, &name)))
    }

    async fn delete<K: ClusterObject>(&self, namespace: &str, name: &str) -> Result<()> {
        let api = K::api(self.client.clone(), namespace);
        match api.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                debug!(
                    namespace = %namespace,
                    name = %name,
                    kind = %K::kind(&()),
                    "Object already deleted"
                );
                Ok(())
            }
            Err(e) => {
                Err(e).with_context(|| format!("failed to delete {}", describe::<K>(namespace, name)))
            }
        }
    }

    async fn list<K: ClusterObject>(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<K>> {
        let api = K::api(self.client.clone(), namespace);
        match api.list(&ListParams::default().labels(label_selector)).await {
            Ok(list) => Ok(list.items),
            // API group not served (e.g. OpenShift kinds on vanilla Kubernetes)
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                debug!(kind = %K::kind(&()), "Kind not served, nothing to list");
                Ok(Vec::new())
            }
            Err(e) => Err(e)
                .with_context(|| format!("failed to list {} with {label_selector}", K::kind(&()))),
        }
    }

    async fn patch_merge<K: ClusterObject>(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<K> {
        let api = K::api(self.client.clone(), namespace);
        let params = PatchParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        api.patch(name, &params, &Patch::Merge(patch))
            .await
            .with_context(|| format!("failed to patch {}", describe::<K>(namespace, name)))
    }

    async fn patch_status<K: ClusterObject>(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<K> {
        let api = K::api(self.client.clone(), namespace);
        api.patch_status(name, &PatchParams::default(), &Patch::Merge(patch))
            .await
            .with_context(|| {
                format!("failed to patch status of {}", describe::<K>(namespace, name))
            })
    }
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod cluster_tests;
