// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `ArgoCD` instance reconciliation.
//!
//! One pass converges every dependent object in dependency order:
//!
//! 1. status (so a new instance reports `Pending` straight away)
//! 2. service accounts, roles and bindings
//! 3. certificate authority and leaf certificates
//! 4. secrets
//! 5. config maps
//! 6. services
//! 7. workloads
//! 8. autoscaler, ingresses and routes
//! 9. forced rollouts for changed secrets and reissued certificates
//! 10. keycloak SSO bootstrap
//! 11. status again, now carrying the SSO phase
//!
//! A stage that fails stops the pass; the controller requeues and the next
//! pass starts again from the top. Every stage is idempotent, so a converged
//! instance produces no writes.

use anyhow::Result;
use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use std::time::Duration;
use tracing::{debug, info};

use crate::argocd_resources::config::{
    build_argocd_cm, build_argocd_secret, build_cluster_secret, build_gpg_keys_cm,
    build_known_hosts_cm, build_rbac_cm, build_tls_certs_cm, server_tls_secret_name, SsoSettings,
};
use crate::argocd_resources::identity::{
    build_cluster_role, build_cluster_role_binding, build_role, build_role_binding,
    build_service_account, component_enabled, CLUSTER_COMPONENTS, IDENTITY_COMPONENTS,
};
use crate::argocd_resources::network::{
    build_controller_metrics_service, build_dex_service, build_grpc_ingress,
    build_redis_service, build_repo_server_service, build_server_hpa, build_server_ingress,
    build_server_metrics_service, build_server_route, build_server_service,
};
use crate::argocd_resources::workloads::{
    build_application_controller, build_dex_deployment, build_redis_deployment,
    build_repo_server_deployment, build_server_deployment,
};
use crate::argocd_resources::{instance_namespace, resource_name};
use crate::cluster::{ClusterApi, PlatformCapabilities};
use crate::config::NamespaceAllowList;
use crate::constants::{
    ARGOCD_SECRET_NAME, COMPONENT_SERVER, GENERATED_SECRET_LENGTH, REQUEUE_PENDING_SECS,
    REQUEUE_READY_SECS, SERVER_SECRET_KEY, TLS_CERT_KEY, TLS_PRIVATE_KEY,
};
use crate::crd::{ArgoCD, InstancePhase, Route};
use crate::labels::{FINALIZER_ARGOCD, ROLLOUT_SECRET_CHANGED};
use crate::reconcilers::certificates::reconcile_certificates;
use crate::reconcilers::converge::{converge_steps, was_updated, write_count, Step};
use crate::reconcilers::finalizers::{ensure_finalizer, handle_deletion};
use crate::reconcilers::generate_secret;
use crate::reconcilers::rollout::{argocd_secret_consumers, trigger_rollouts};
use crate::reconcilers::sso::keycloak::RealmConfigurator;
use crate::reconcilers::sso::{reconcile_sso, resolve_sso_settings, SsoState};
use crate::reconcilers::status::update_status;

/// Process-wide inputs shared by every pass.
#[derive(Clone, Debug)]
pub struct ReconcileSettings {
    pub capabilities: PlatformCapabilities,
    pub allow_list: NamespaceAllowList,
    /// API server URL handed to the keycloak identity provider and dex
    pub cluster_api_url: String,
}

/// Summary of one pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassReport {
    /// Cluster writes performed by the pass
    pub writes: usize,
    pub sso_state: SsoState,
    /// Instance phase is `Available`
    pub available: bool,
    /// The pass ran the deletion protocol
    pub deleted: bool,
}

impl PassReport {
    /// Requeue interval: long once the instance is available and SSO settled.
    #[must_use]
    pub fn requeue_after(&self) -> Duration {
        if self.deleted || (self.available && self.sso_state.is_settled()) {
            Duration::from_secs(REQUEUE_READY_SECS)
        } else {
            Duration::from_secs(REQUEUE_PENDING_SECS)
        }
    }
}

fn secret_bytes(secret: &Secret, key: &str) -> Option<Vec<u8>> {
    secret
        .data
        .as_ref()?
        .get(key)
        .map(|v| v.0.clone())
        .filter(|v| !v.is_empty())
}

fn identity_steps(instance: &ArgoCD) -> Vec<Step> {
    let mut steps = Vec::new();
    for component in IDENTITY_COMPONENTS {
        let enabled = component_enabled(instance, component);
        steps.push(Step::when(enabled, build_service_account(instance, component)));
        steps.push(Step::when(enabled, build_role(instance, component)));
        steps.push(Step::when(enabled, build_role_binding(instance, component)));
    }
    for component in CLUSTER_COMPONENTS {
        steps.push(Step::always(build_cluster_role(instance, component)));
        steps.push(Step::always(build_cluster_role_binding(instance, component)));
    }
    steps
}

async fn secret_steps<A: ClusterApi>(
    api: &A,
    instance: &ArgoCD,
    sso: &SsoSettings,
) -> Result<Vec<Step>> {
    let namespace = instance_namespace(instance);

    // The session key is generated once and then carried over
    let existing = api.get::<Secret>(&namespace, ARGOCD_SECRET_NAME).await?;
    let server_key = existing
        .as_ref()
        .and_then(|s| secret_bytes(s, SERVER_SECRET_KEY))
        .and_then(|v| String::from_utf8(v).ok())
        .unwrap_or_else(|| generate_secret(GENERATED_SECRET_LENGTH));

    let server_tls = api
        .get::<Secret>(&namespace, &server_tls_secret_name(instance))
        .await?
        .and_then(|s| {
            Some((
                secret_bytes(&s, TLS_CERT_KEY)?,
                secret_bytes(&s, TLS_PRIVATE_KEY)?,
            ))
        });

    Ok(vec![
        Step::create_only(build_cluster_secret(
            instance,
            &generate_secret(GENERATED_SECRET_LENGTH),
        )),
        Step::always(build_argocd_secret(
            instance,
            &server_key,
            server_tls
                .as_ref()
                .map(|(cert, key)| (cert.as_slice(), key.as_slice())),
            sso,
        )),
    ])
}

fn config_steps(instance: &ArgoCD, sso: &SsoSettings, cluster_api_url: &str) -> Vec<Step> {
    vec![
        Step::always(build_argocd_cm(instance, sso, cluster_api_url)),
        Step::always(build_rbac_cm(instance, sso)),
        Step::always(build_known_hosts_cm(instance)),
        Step::create_only(build_tls_certs_cm(instance)),
        Step::create_only(build_gpg_keys_cm(instance)),
    ]
}

fn service_steps(instance: &ArgoCD) -> Vec<Step> {
    let redis = instance.spec.redis.is_enabled();
    let dex = instance.spec.dex_enabled();
    vec![
        Step::always(build_server_service(instance)),
        Step::always(build_server_metrics_service(instance)),
        Step::always(build_repo_server_service(instance)),
        Step::always(build_controller_metrics_service(instance)),
        Step::when(redis, build_redis_service(instance)),
        Step::when(dex, build_dex_service(instance)),
    ]
}

fn workload_steps(instance: &ArgoCD) -> Vec<Step> {
    let redis = instance.spec.redis.is_enabled();
    let dex = instance.spec.dex_enabled();
    vec![
        Step::always(build_server_deployment(instance)),
        Step::always(build_repo_server_deployment(instance)),
        Step::when(redis, build_redis_deployment(instance)),
        Step::when(dex, build_dex_deployment(instance)),
        Step::always(build_application_controller(instance)),
    ]
}

fn exposure_steps(instance: &ArgoCD, capabilities: &PlatformCapabilities) -> Vec<Step> {
    let server = &instance.spec.server;
    let mut steps = vec![
        Step::when(server.autoscale.enabled, build_server_hpa(instance)),
        Step::when(server.ingress.enabled, build_server_ingress(instance)),
        Step::when(server.grpc.ingress.enabled, build_grpc_ingress(instance)),
    ];
    if capabilities.routes {
        steps.push(Step::when(server.route.enabled, build_server_route(instance)));
    }
    steps
}

/// Reconciles one `ArgoCD` instance.
///
/// # Arguments
///
/// * `api` - Cluster access
/// * `realm` - Keycloak admin API used by the SSO bootstrap
/// * `settings` - Process-wide settings
/// * `instance` - Instance as delivered by the watch
///
/// # Errors
///
/// Returns the first error from any stage. Later stages are not run.
pub async fn reconcile_argocd<A: ClusterApi>(
    api: &A,
    realm: &dyn RealmConfigurator,
    settings: &ReconcileSettings,
    instance: &ArgoCD,
) -> Result<PassReport> {
    let namespace = instance_namespace(instance);
    let name = instance.name_any();
    let capabilities = &settings.capabilities;

    if instance.metadata.deletion_timestamp.is_some() {
        handle_deletion(api, instance, FINALIZER_ARGOCD).await?;
        return Ok(PassReport {
            writes: 0,
            sso_state: SsoState::NotRequested,
            available: false,
            deleted: true,
        });
    }

    info!(namespace = %namespace, name = %name, "Reconciling ArgoCD");
    let mut writes = usize::from(ensure_finalizer(api, instance, FINALIZER_ARGOCD).await?);

    let (_, patched) = update_status(api, instance, None, capabilities.routes).await?;
    writes += usize::from(patched);

    let mut reports =
        converge_steps(api, instance, &settings.allow_list, identity_steps(instance)).await?;

    let route_host = if capabilities.routes {
        api.get::<Route>(&namespace, &resource_name(instance, COMPONENT_SERVER))
            .await?
            .and_then(|r| r.admitted_host())
    } else {
        None
    };
    let certificates = reconcile_certificates(api, instance, route_host.as_deref()).await?;
    writes += usize::from(certificates.authority.is_write());
    writes += certificates
        .leaves
        .iter()
        .filter(|(_, outcome)| outcome.is_write())
        .count();

    // Settings from a realm configured on an earlier pass
    let sso_settings = resolve_sso_settings(api, instance).await?;
    let mut steps = secret_steps(api, instance, &sso_settings).await?;
    steps.extend(config_steps(instance, &sso_settings, &settings.cluster_api_url));
    steps.extend(service_steps(instance));
    steps.extend(workload_steps(instance));
    steps.extend(exposure_steps(instance, capabilities));
    reports.extend(converge_steps(api, instance, &settings.allow_list, steps).await?);
    writes += write_count(&reports);

    if was_updated(&reports, "Secret", ARGOCD_SECRET_NAME) {
        writes += trigger_rollouts(
            api,
            &namespace,
            &argocd_secret_consumers(instance),
            ROLLOUT_SECRET_CHANGED,
        )
        .await?;
    }
    for purpose in certificates.reissued() {
        writes += trigger_rollouts(
            api,
            &namespace,
            &purpose.consumers(instance),
            purpose.rollout_key(),
        )
        .await?;
    }

    let sso = reconcile_sso(
        api,
        realm,
        instance,
        capabilities,
        &settings.cluster_api_url,
    )
    .await?;
    if sso.argocd_secret_changed {
        writes += trigger_rollouts(
            api,
            &namespace,
            &argocd_secret_consumers(instance),
            ROLLOUT_SECRET_CHANGED,
        )
        .await?;
    }

    let (status, patched) =
        update_status(api, instance, Some(sso.state), capabilities.routes).await?;
    writes += usize::from(patched);

    debug!(
        namespace = %namespace,
        name = %name,
        writes,
        sso = sso.state.as_str(),
        phase = ?status.phase,
        "Reconciliation pass complete"
    );
    Ok(PassReport {
        writes,
        sso_state: sso.state,
        available: status.phase == InstancePhase::Available,
        deleted: false,
    })
}

#[cfg(test)]
#[path = "argocd_tests.rs"]
mod argocd_tests;
