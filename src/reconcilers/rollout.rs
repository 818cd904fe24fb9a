// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Forced rollouts after configuration changes.
//!
//! Argo CD components read `argocd-secret` and their TLS material only at start-up.
//! When one of those inputs changes, the consumers are restarted by writing a
//! timestamp into a pod template label. The new template hash makes the workload
//! controller replace the pods with its normal rollout strategy.

use anyhow::Result;
use chrono::Utc;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::PodTemplateSpec;
use tracing::{debug, info};

use crate::argocd_resources::resource_name;
use crate::cluster::{ClusterApi, ClusterObject};
use crate::constants::{COMPONENT_APPLICATION_CONTROLLER, COMPONENT_REPO_SERVER, COMPONENT_SERVER};
use crate::crd::ArgoCD;
use crate::metrics;

/// Timestamp format safe for label values.
const ROLLOUT_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S%.3f";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
}

/// A workload that can be restarted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkloadRef {
    pub kind: WorkloadKind,
    pub name: String,
}

impl WorkloadRef {
    #[must_use]
    pub fn deployment(name: impl Into<String>) -> Self {
        Self {
            kind: WorkloadKind::Deployment,
            name: name.into(),
        }
    }

    #[must_use]
    pub fn stateful_set(name: impl Into<String>) -> Self {
        Self {
            kind: WorkloadKind::StatefulSet,
            name: name.into(),
        }
    }
}

/// Workloads that read `argocd-secret`.
#[must_use]
pub fn argocd_secret_consumers(instance: &ArgoCD) -> Vec<WorkloadRef> {
    vec![
        WorkloadRef::deployment(resource_name(instance, COMPONENT_SERVER)),
        WorkloadRef::deployment(resource_name(instance, COMPONENT_REPO_SERVER)),
        WorkloadRef::stateful_set(resource_name(instance, COMPONENT_APPLICATION_CONTROLLER)),
    ]
}

/// Workloads serving the server's leaf certificate.
#[must_use]
pub fn server_tls_consumers(instance: &ArgoCD) -> Vec<WorkloadRef> {
    vec![WorkloadRef::deployment(resource_name(instance, COMPONENT_SERVER))]
}

/// Workloads on either end of the repo server's mTLS connections.
#[must_use]
pub fn repo_tls_consumers(instance: &ArgoCD) -> Vec<WorkloadRef> {
    vec![
        WorkloadRef::deployment(resource_name(instance, COMPONENT_REPO_SERVER)),
        WorkloadRef::deployment(resource_name(instance, COMPONENT_SERVER)),
        WorkloadRef::stateful_set(resource_name(instance, COMPONENT_APPLICATION_CONTROLLER)),
    ]
}

/// Current time as a rollout label value.
#[must_use]
pub fn rollout_timestamp() -> String {
    Utc::now().format(ROLLOUT_TIMESTAMP_FORMAT).to_string()
}

trait PodTemplateOwner: ClusterObject {
    fn pod_template_mut(&mut self) -> Option<&mut PodTemplateSpec>;
}

impl PodTemplateOwner for Deployment {
    fn pod_template_mut(&mut self) -> Option<&mut PodTemplateSpec> {
        self.spec.as_mut().map(|s| &mut s.template)
    }
}

impl PodTemplateOwner for StatefulSet {
    fn pod_template_mut(&mut self) -> Option<&mut PodTemplateSpec> {
        self.spec.as_mut().map(|s| &mut s.template)
    }
}

async fn restart<A, K>(api: &A, namespace: &str, name: &str, key: &str) -> Result<bool>
where
    A: ClusterApi,
    K: PodTemplateOwner,
{
    let Some(mut workload) = api.get::<K>(namespace, name).await? else {
        debug!(
            namespace = %namespace,
            name = %name,
            kind = %K::kind(&()),
            "Workload absent, nothing to restart"
        );
        return Ok(false);
    };
    let Some(template) = workload.pod_template_mut() else {
        return Ok(false);
    };
    template
        .metadata
        .get_or_insert_with(Default::default)
        .labels
        .get_or_insert_with(Default::default)
        .insert(key.to_string(), rollout_timestamp());
    api.replace(namespace, &workload).await?;

    metrics::record_rollout(name, key);
    info!(
        namespace = %namespace,
        name = %name,
        kind = %K::kind(&()),
        trigger = %key,
        "Triggered rollout"
    );
    Ok(true)
}

/// Restarts one workload by stamping `key` on its pod template.
///
/// Returns `false` when the workload does not exist yet.
///
/// # Errors
///
/// Returns an error if the workload cannot be read or updated.
pub async fn trigger_rollout<A: ClusterApi>(
    api: &A,
    namespace: &str,
    workload: &WorkloadRef,
    key: &str,
) -> Result<bool> {
    match workload.kind {
        WorkloadKind::Deployment => restart::<A, Deployment>(api, namespace, &workload.name, key).await,
        WorkloadKind::StatefulSet => {
            restart::<A, StatefulSet>(api, namespace, &workload.name, key).await
        }
    }
}

/// Restarts every workload in `workloads`, returning how many were restarted.
///
/// # Errors
///
/// Stops at the first workload that cannot be restarted.
pub async fn trigger_rollouts<A: ClusterApi>(
    api: &A,
    namespace: &str,
    workloads: &[WorkloadRef],
    key: &str,
) -> Result<usize> {
    let mut restarted = 0;
    for workload in workloads {
        if trigger_rollout(api, namespace, workload, key).await? {
            restarted += 1;
        }
    }
    Ok(restarted)
}

#[cfg(test)]
#[path = "rollout_tests.rs"]
mod rollout_tests;
