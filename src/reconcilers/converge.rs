// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Declarative convergence of owned objects.
//!
//! Every object an [`ArgoCD`] instance owns goes through the same contract:
//!
//! | Existing | Enabled | Action |
//! |----------|---------|--------|
//! | absent   | no      | nothing ([`Outcome::Skipped`]) |
//! | absent   | yes     | stamp ownership, create ([`Outcome::Created`]) |
//! | present  | no      | delete ([`Outcome::Deleted`]); cluster-scoped only if owned |
//! | present  | yes     | merge the kind's allow-listed fields, update only if they changed |
//!
//! A cluster-scoped object whose owner labels name another instance is never
//! updated or deleted ([`Outcome::Skipped`]). Unlabelled ones are adopted.
//!
//! Updates never replace an object wholesale: [`ManagedObject::merge_from`] copies
//! only the fields the operator owns onto the live object, so fields set by other
//! controllers or users survive. Kinds with immutable fields (role bindings)
//! report [`ManagedObject::requires_recreate`] and are deleted and recreated.
//!
//! Errors from the cluster are returned unchanged. Retrying is left to the
//! controller's requeue.
//!
//! # Example
//!
//! ```rust,no_run
//! use argocd_operator::argocd_resources::config::build_rbac_cm;
//! use argocd_operator::argocd_resources::config::SsoSettings;
//! use argocd_operator::cluster::KubeClusterApi;
//! use argocd_operator::crd::ArgoCD;
//! use argocd_operator::reconcilers::converge::{converge, Outcome};
//! use anyhow::Result;
//!
//! async fn example(api: &KubeClusterApi, instance: &ArgoCD) -> Result<()> {
//!     let desired = build_rbac_cm(instance, &SsoSettings::default());
//!     let outcome = converge(api, instance, true, desired).await?;
//!     assert_ne!(outcome, Outcome::Skipped);
//!     Ok(())
//! }
//! ```

mod merge;

use anyhow::Result;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service, ServiceAccount};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use kube::ResourceExt;
use tracing::{debug, info, warn};

use crate::argocd_resources::{build_owner_references, instance_namespace};
use crate::cluster::{ClusterApi, ClusterObject};
use crate::config::NamespaceAllowList;
use crate::crd::{ArgoCD, OAuthClient, Route, TemplateInstance};
use crate::labels::{OWNER_NAMESPACE_LABEL, OWNER_NAME_LABEL};
use crate::metrics;

/// A kind whose live objects the operator keeps converged.
pub trait ManagedObject: ClusterObject {
    /// Copies the operator-owned fields of `desired` onto `self`.
    ///
    /// Returns `true` if anything changed.
    fn merge_from(&mut self, desired: &Self) -> bool;

    /// True when `desired` differs from `self` in a field the API server
    /// refuses to update.
    fn requires_recreate(&self, _desired: &Self) -> bool {
        false
    }
}

/// What a convergence step did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Disabled and absent
    Skipped,
    /// Present and already converged
    Unchanged,
    Created,
    Updated,
    /// Deleted and created again because an immutable field changed
    Recreated,
    /// Deleted because its feature is disabled
    Deleted,
}

impl Outcome {
    /// True if the step wrote to the cluster.
    #[must_use]
    pub fn is_write(self) -> bool {
        !matches!(self, Self::Skipped | Self::Unchanged)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Unchanged => "unchanged",
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Recreated => "recreated",
            Self::Deleted => "deleted",
        }
    }
}

/// Records the owner on `object`. Returns `true` if the object changed.
///
/// Namespaced objects get a controller owner reference so they are garbage
/// collected with the instance. Cluster-scoped objects cannot reference a
/// namespaced owner, so they carry owner labels that the deletion guard uses
/// to find them.
pub(crate) fn stamp_ownership<K: ClusterObject>(object: &mut K, owner: &ArgoCD) -> bool {
    let meta = object.meta_mut();
    if K::CLUSTER_SCOPED {
        let labels = meta.labels.get_or_insert_with(Default::default);
        let mut changed = false;
        for (key, value) in [
            (OWNER_NAME_LABEL, owner.name_any()),
            (OWNER_NAMESPACE_LABEL, instance_namespace(owner)),
        ] {
            if labels.get(key) != Some(&value) {
                labels.insert(key.to_string(), value);
                changed = true;
            }
        }
        return changed;
    }

    let Some(uid) = owner.metadata.uid.as_deref() else {
        return false;
    };
    let references = meta.owner_references.get_or_insert_with(Vec::new);
    if references.iter().any(|r| r.uid == uid) {
        return false;
    }
    references.retain(|r| r.controller != Some(true));
    references.extend(build_owner_references(owner));
    true
}

/// True if a cluster-scoped object carries `owner`'s owner labels.
fn owned_by<K: ClusterObject>(object: &K, owner: &ArgoCD) -> bool {
    let labels = object.labels();
    labels.get(OWNER_NAME_LABEL) == Some(&owner.name_any())
        && labels.get(OWNER_NAMESPACE_LABEL) == Some(&instance_namespace(owner))
}

/// True if a cluster-scoped object carries owner labels naming a different instance.
fn owned_elsewhere<K: ClusterObject>(object: &K, owner: &ArgoCD) -> bool {
    let labels = object.labels();
    let claimed =
        labels.contains_key(OWNER_NAME_LABEL) || labels.contains_key(OWNER_NAMESPACE_LABEL);
    claimed && !owned_by(object, owner)
}

fn log_write<K: ClusterObject>(namespace: &str, name: &str, outcome: Outcome) {
    let kind = K::kind(&());
    metrics::record_object_write(&kind, outcome.as_str());
    info!(
        namespace = %namespace,
        name = %name,
        kind = %kind,
        outcome = outcome.as_str(),
        "Converged object"
    );
}

/// Drives one object toward `desired`.
///
/// # Arguments
///
/// * `api` - Cluster access
/// * `owner` - Instance owning the object; its namespace is used for namespaced kinds
/// * `enabled` - Whether the object should exist
/// * `desired` - Freshly built desired object
///
/// # Errors
///
/// Returns the first cluster error unchanged.
pub async fn converge<A, K>(api: &A, owner: &ArgoCD, enabled: bool, desired: K) -> Result<Outcome>
where
    A: ClusterApi,
    K: ManagedObject,
{
    let namespace = instance_namespace(owner);
    let name = desired.name_any();

    debug!(
        namespace = %namespace,
        name = %name,
        kind = %K::kind(&()),
        enabled,
        "Converging object"
    );

    let outcome = match (api.get::<K>(&namespace, &name).await?, enabled) {
        (None, false) => Outcome::Skipped,
        (None, true) => {
            let mut desired = desired;
            stamp_ownership(&mut desired, owner);
            api.create(&namespace, &desired).await?;
            Outcome::Created
        }
        // Cluster-scoped names can be shared; only remove what this instance created
        (Some(current), false) if K::CLUSTER_SCOPED && !owned_by(&current, owner) => {
            Outcome::Skipped
        }
        (Some(_), false) => {
            api.delete::<K>(&namespace, &name).await?;
            Outcome::Deleted
        }
        (Some(current), true) if K::CLUSTER_SCOPED && owned_elsewhere(&current, owner) => {
            warn!(
                name = %name,
                kind = %K::kind(&()),
                owner = ?current.labels().get(OWNER_NAME_LABEL),
                owner_namespace = ?current.labels().get(OWNER_NAMESPACE_LABEL),
                "Cluster-scoped object belongs to another instance, leaving it alone"
            );
            Outcome::Skipped
        }
        (Some(current), true) if current.requires_recreate(&desired) => {
            api.delete::<K>(&namespace, &name).await?;
            let mut desired = desired;
            stamp_ownership(&mut desired, owner);
            api.create(&namespace, &desired).await?;
            Outcome::Recreated
        }
        (Some(mut current), true) => {
            let merged = current.merge_from(&desired);
            let stamped = stamp_ownership(&mut current, owner);
            if merged || stamped {
                api.replace(&namespace, &current).await?;
                Outcome::Updated
            } else {
                Outcome::Unchanged
            }
        }
    };

    if outcome.is_write() {
        log_write::<K>(&namespace, &name, outcome);
    }
    Ok(outcome)
}

/// Creates `desired` if absent and never touches it afterwards.
///
/// # Errors
///
/// Returns the first cluster error unchanged.
pub async fn ensure_created<A, K>(api: &A, owner: &ArgoCD, desired: K) -> Result<Outcome>
where
    A: ClusterApi,
    K: ClusterObject,
{
    let namespace = instance_namespace(owner);
    let name = desired.name_any();
    if api.get::<K>(&namespace, &name).await?.is_some() {
        return Ok(Outcome::Unchanged);
    }
    let mut desired = desired;
    stamp_ownership(&mut desired, owner);
    api.create(&namespace, &desired).await?;
    log_write::<K>(&namespace, &name, Outcome::Created);
    Ok(Outcome::Created)
}

/// [`converge`] for cluster-scoped kinds, additionally gated by the namespace allow-list.
///
/// Removing the instance's namespace from the allow-list therefore deletes its
/// cluster-scoped objects on the next pass.
///
/// # Errors
///
/// Returns the first cluster error unchanged.
pub async fn converge_cluster_scoped<A, K>(
    api: &A,
    owner: &ArgoCD,
    allow_list: &NamespaceAllowList,
    enabled: bool,
    desired: K,
) -> Result<Outcome>
where
    A: ClusterApi,
    K: ManagedObject,
{
    let allowed = allow_list.allows(&instance_namespace(owner));
    converge(api, owner, enabled && allowed, desired).await
}

macro_rules! desired_objects {
    ($($variant:ident => $kind:ty),* $(,)?) => {
        /// A desired object of any kind the operator manages.
        #[derive(Clone, Debug)]
        pub enum DesiredObject {
            $($variant($kind)),*
        }

        $(
            impl From<$kind> for DesiredObject {
                fn from(object: $kind) -> Self {
                    Self::$variant(object)
                }
            }
        )*

        impl DesiredObject {
            #[must_use]
            pub fn kind(&self) -> String {
                match self {
                    $(Self::$variant(_) => <$kind as kube::Resource>::kind(&()).to_string()),*
                }
            }

            #[must_use]
            pub fn name(&self) -> String {
                match self {
                    $(Self::$variant(object) => object.name_any()),*
                }
            }

            async fn apply<A: ClusterApi>(
                self,
                api: &A,
                owner: &ArgoCD,
                allow_list: &NamespaceAllowList,
                step: StepMode,
            ) -> Result<Outcome> {
                match self {
                    $(Self::$variant(object) => dispatch(api, owner, allow_list, step, object).await),*
                }
            }
        }
    };
}

desired_objects! {
    ServiceAccount => ServiceAccount,
    Role => Role,
    RoleBinding => RoleBinding,
    ClusterRole => ClusterRole,
    ClusterRoleBinding => ClusterRoleBinding,
    ConfigMap => ConfigMap,
    Secret => Secret,
    Service => Service,
    Deployment => Deployment,
    StatefulSet => StatefulSet,
    HorizontalPodAutoscaler => HorizontalPodAutoscaler,
    Ingress => Ingress,
    Route => Route,
    OAuthClient => OAuthClient,
    TemplateInstance => TemplateInstance,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StepMode {
    Converge { enabled: bool },
    CreateOnly { enabled: bool },
}

async fn dispatch<A, K>(
    api: &A,
    owner: &ArgoCD,
    allow_list: &NamespaceAllowList,
    mode: StepMode,
    object: K,
) -> Result<Outcome>
where
    A: ClusterApi,
    K: ManagedObject,
{
    match mode {
        StepMode::CreateOnly { enabled: false } => Ok(Outcome::Skipped),
        StepMode::CreateOnly { enabled: true } => ensure_created(api, owner, object).await,
        StepMode::Converge { enabled } if K::CLUSTER_SCOPED => {
            converge_cluster_scoped(api, owner, allow_list, enabled, object).await
        }
        StepMode::Converge { enabled } => converge(api, owner, enabled, object).await,
    }
}

/// One row of a convergence table: a desired object and whether it should exist.
#[derive(Clone, Debug)]
pub struct Step {
    mode: StepMode,
    object: DesiredObject,
}

impl Step {
    /// An object that should always exist.
    pub fn always(object: impl Into<DesiredObject>) -> Self {
        Self::when(true, object)
    }

    /// An object that should exist only while `enabled`.
    pub fn when(enabled: bool, object: impl Into<DesiredObject>) -> Self {
        Self {
            mode: StepMode::Converge { enabled },
            object: object.into(),
        }
    }

    /// An object created once and then left to users.
    pub fn create_only(object: impl Into<DesiredObject>) -> Self {
        Self {
            mode: StepMode::CreateOnly { enabled: true },
            object: object.into(),
        }
    }

    #[must_use]
    pub fn object(&self) -> &DesiredObject {
        &self.object
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        match self.mode {
            StepMode::Converge { enabled } | StepMode::CreateOnly { enabled } => enabled,
        }
    }
}

/// Result of one [`Step`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepReport {
    pub kind: String,
    pub name: String,
    pub outcome: Outcome,
}

/// Runs every step in order, stopping at the first error.
///
/// # Errors
///
/// Returns the first cluster error unchanged; steps after it are not run.
pub async fn converge_steps<A: ClusterApi>(
    api: &A,
    owner: &ArgoCD,
    allow_list: &NamespaceAllowList,
    steps: Vec<Step>,
) -> Result<Vec<StepReport>> {
    let mut reports = Vec::with_capacity(steps.len());
    for step in steps {
        let kind = step.object.kind();
        let name = step.object.name();
        let outcome = step.object.apply(api, owner, allow_list, step.mode).await?;
        reports.push(StepReport {
            kind,
            name,
            outcome,
        });
    }
    Ok(reports)
}

/// Number of reports that wrote to the cluster.
#[must_use]
pub fn write_count(reports: &[StepReport]) -> usize {
    reports.iter().filter(|r| r.outcome.is_write()).count()
}

/// True if the named object existed and was updated in place by one of the steps.
#[must_use]
pub fn was_updated(reports: &[StepReport], kind: &str, name: &str) -> bool {
    reports
        .iter()
        .any(|r| r.kind == kind && r.name == name && r.outcome == Outcome::Updated)
}

#[cfg(test)]
#[path = "converge_tests.rs"]
mod converge_tests;
