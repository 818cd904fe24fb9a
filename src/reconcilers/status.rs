// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Instance status derivation.
//!
//! Component phases are read from the owning workloads:
//!
//! | Workload | Phase |
//! |----------|-------|
//! | absent | `Unknown` |
//! | `readyReplicas >= replicas`, `replicas >= 1` | `Running` |
//! | otherwise | `Pending` |
//!
//! The instance is `Available` once the server, repo server, application
//! controller and (when enabled) redis are all `Running`. The status
//! subresource is only patched when the computed status differs from the live
//! one, so a converged instance produces no status writes.

use anyhow::Result;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::networking::v1::Ingress;
use kube::ResourceExt;
use serde_json::json;
use tracing::debug;

use crate::argocd_resources::{instance_namespace, resource_name, service_fqdn};
use crate::cluster::ClusterApi;
use crate::constants::{
    COMPONENT_APPLICATION_CONTROLLER, COMPONENT_DEX_SERVER, COMPONENT_REDIS,
    COMPONENT_REPO_SERVER, COMPONENT_SERVER,
};
use crate::crd::{ArgoCD, ArgoCDStatus, ComponentPhase, InstancePhase, Route};
use crate::reconcilers::sso::SsoState;

/// Phase of a workload from its desired and ready replica counts.
#[must_use]
pub fn workload_phase(desired: i32, ready: i32) -> ComponentPhase {
    if desired >= 1 && ready >= desired {
        ComponentPhase::Running
    } else {
        ComponentPhase::Pending
    }
}

fn deployment_phase(deployment: Option<&Deployment>) -> ComponentPhase {
    deployment.map_or(ComponentPhase::Unknown, |d| {
        workload_phase(
            d.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1),
            d.status.as_ref().and_then(|s| s.ready_replicas).unwrap_or(0),
        )
    })
}

fn stateful_set_phase(stateful_set: Option<&StatefulSet>) -> ComponentPhase {
    stateful_set.map_or(ComponentPhase::Unknown, |s| {
        workload_phase(
            s.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1),
            s.status.as_ref().and_then(|s| s.ready_replicas).unwrap_or(0),
        )
    })
}

/// Aggregate phase from component phases.
#[must_use]
pub fn instance_phase(status: &ArgoCDStatus, redis_enabled: bool) -> InstancePhase {
    let running = [
        status.server,
        status.repo,
        status.application_controller,
    ]
    .into_iter()
    .all(|p| p == ComponentPhase::Running);
    if running && (!redis_enabled || status.redis == ComponentPhase::Running) {
        InstancePhase::Available
    } else {
        InstancePhase::Pending
    }
}

async fn deployment<A: ClusterApi>(api: &A, instance: &ArgoCD, component: &str) -> Result<ComponentPhase> {
    let found = api
        .get::<Deployment>(&instance_namespace(instance), &resource_name(instance, component))
        .await?;
    Ok(deployment_phase(found.as_ref()))
}

/// External host of the server: route, then ingress, then the service name.
async fn observed_host<A: ClusterApi>(api: &A, instance: &ArgoCD, routes: bool) -> Result<String> {
    let namespace = instance_namespace(instance);
    let name = resource_name(instance, COMPONENT_SERVER);

    if routes {
        if let Some(host) = api
            .get::<Route>(&namespace, &name)
            .await?
            .and_then(|r| r.admitted_host())
        {
            return Ok(host);
        }
    }
    if instance.spec.server.ingress.enabled {
        let host = api
            .get::<Ingress>(&namespace, &name)
            .await?
            .and_then(|i| i.spec?.rules?.into_iter().find_map(|rule| rule.host));
        if let Some(host) = host {
            return Ok(host);
        }
    }
    Ok(service_fqdn(instance, COMPONENT_SERVER))
}

/// Computes the status from the cluster.
///
/// # Arguments
///
/// * `sso` - SSO state from this pass, or `None` to keep the reported SSO phase
/// * `routes` - Whether the route API is available
///
/// # Errors
///
/// Returns an error if a cluster read fails.
pub async fn compute_status<A: ClusterApi>(
    api: &A,
    instance: &ArgoCD,
    sso: Option<SsoState>,
    routes: bool,
) -> Result<ArgoCDStatus> {
    let namespace = instance_namespace(instance);
    let redis_enabled = instance.spec.redis.is_enabled();

    let controller = api
        .get::<StatefulSet>(
            &namespace,
            &resource_name(instance, COMPONENT_APPLICATION_CONTROLLER),
        )
        .await?;

    let redis = if redis_enabled {
        deployment(api, instance, COMPONENT_REDIS).await?
    } else {
        ComponentPhase::Unknown
    };

    let sso = if instance.spec.dex_enabled() {
        deployment(api, instance, COMPONENT_DEX_SERVER).await?
    } else if instance.spec.keycloak_requested() {
        match sso {
            Some(state) => state.phase(),
            None => instance.status.as_ref().map_or(ComponentPhase::Unknown, |s| s.sso),
        }
    } else {
        ComponentPhase::Unknown
    };

    let mut status = ArgoCDStatus {
        phase: InstancePhase::Pending,
        application_controller: stateful_set_phase(controller.as_ref()),
        server: deployment(api, instance, COMPONENT_SERVER).await?,
        repo: deployment(api, instance, COMPONENT_REPO_SERVER).await?,
        redis,
        sso,
        host: Some(observed_host(api, instance, routes).await?),
        observed_generation: instance.metadata.generation,
    };
    status.phase = instance_phase(&status, redis_enabled);
    Ok(status)
}

/// Patches the status subresource if it differs from the live status.
///
/// Returns the status now recorded and whether a patch was sent.
///
/// # Errors
///
/// Returns an error if a cluster call fails.
pub async fn update_status<A: ClusterApi>(
    api: &A,
    instance: &ArgoCD,
    sso: Option<SsoState>,
    routes: bool,
) -> Result<(ArgoCDStatus, bool)> {
    let namespace = instance_namespace(instance);
    let name = instance.name_any();

    // Compare against the live object; the copy handed to the pass may be stale
    let live = api
        .get::<ArgoCD>(&namespace, &name)
        .await?
        .unwrap_or_else(|| instance.clone());
    let status = compute_status(api, &live, sso, routes).await?;

    if live.status.as_ref() == Some(&status) {
        debug!(namespace = %namespace, name = %name, "Status unchanged");
        return Ok((status, false));
    }

    api.patch_status::<ArgoCD>(&namespace, &name, &json!({ "status": status }))
        .await?;
    debug!(
        namespace = %namespace,
        name = %name,
        phase = ?status.phase,
        "Updated status"
    );
    Ok((status, true))
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
