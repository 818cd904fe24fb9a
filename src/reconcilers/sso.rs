// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Keycloak SSO bootstrap.
//!
//! The broker is deployed from an OpenShift template, so the whole flow only
//! runs where the template service is available. Each pass re-enters the state
//! machine from the cluster state alone:
//!
//! ```text
//! NotRequested ──request──▶ BrokerDeploying ──ready──▶ RealmPending ──realm call──▶ RealmConfigured
//! ```
//!
//! Progress is recorded in two places:
//!
//! - the intent record, Secret `<name>-keycloak-realm`, holds the client
//!   secrets generated for the realm and is created before the realm call so a
//!   retry sends the same credentials
//! - the completion marker, annotation `argocd.argoproj.io/realm-created` on the
//!   broker's DeploymentConfig, is committed right after the realm call succeeds
//!
//! Once the marker is set the realm call is never issued again. Everything
//! after it (client secret in `argocd-secret`, OAuth client, `oidc.config`,
//! RBAC scopes) is derived from the intent record and re-applied on every
//! pass, so a failure there heals on the next reconciliation.

pub mod keycloak;
pub mod realm;

use anyhow::{bail, Context as _, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::ResourceExt;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::argocd_resources::config::{build_argocd_cm, build_rbac_cm, SsoSettings};
use crate::argocd_resources::sso::{
    broker_client_name, build_keycloak_template_instance, build_oauth_client,
    build_realm_credentials_secret, oidc_config_yaml, realm_credentials_secret_name, KEYCLOAK_RBAC_SCOPES,
};
use crate::argocd_resources::{instance_namespace, resource_name, server_host};
use crate::cluster::{ClusterApi, PlatformCapabilities};
use crate::constants::{
    ARGOCD_CM_NAME, ARGOCD_RBAC_CM_NAME, ARGOCD_SECRET_NAME, COMPONENT_SERVER,
    GENERATED_SECRET_LENGTH, KEYCLOAK_ADMIN_PASSWORD_KEY, KEYCLOAK_ADMIN_SECRET_NAME,
    KEYCLOAK_ADMIN_USERNAME_KEY, KEYCLOAK_CLIENT_SECRET_KEY, KEYCLOAK_NAME,
    KEYCLOAK_SERVING_CERT_SECRET_NAME, REALM_BROKER_CLIENT_SECRET_KEY, REALM_CLIENT_SECRET_KEY,
    TLS_CERT_KEY,
};
use crate::crd::{ArgoCD, ComponentPhase, DeploymentConfig, Route};
use crate::errors::SsoError;
use crate::labels::REALM_CREATED_ANNOTATION;
use crate::metrics;
use crate::reconcilers::converge::{converge, ensure_created};
use crate::reconcilers::generate_secret;

use keycloak::{RealmConfigurator, RealmRequest};
use realm::{realm_definition, RealmParameters};

/// Where an instance is in the keycloak bootstrap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SsoState {
    /// Keycloak not selected, or the platform cannot deploy the broker
    NotRequested,
    /// Broker requested but not ready yet
    BrokerDeploying,
    /// Broker ready, realm not configured yet
    RealmPending,
    /// Realm created and Argo CD pointed at it
    RealmConfigured,
}

impl SsoState {
    /// Status phase reported for the `sso` component.
    #[must_use]
    pub fn phase(self) -> ComponentPhase {
        match self {
            Self::NotRequested => ComponentPhase::Unknown,
            Self::BrokerDeploying | Self::RealmPending => ComponentPhase::Pending,
            Self::RealmConfigured => ComponentPhase::Running,
        }
    }

    /// True when no further SSO progress is expected without a spec change.
    #[must_use]
    pub fn is_settled(self) -> bool {
        matches!(self, Self::NotRequested | Self::RealmConfigured)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotRequested => "NotRequested",
            Self::BrokerDeploying => "BrokerDeploying",
            Self::RealmPending => "RealmPending",
            Self::RealmConfigured => "RealmConfigured",
        }
    }
}

/// Result of one SSO pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SsoOutcome {
    pub state: SsoState,
    /// `argocd-secret` was patched, so its consumers need a restart
    pub argocd_secret_changed: bool,
}

impl SsoOutcome {
    fn state(state: SsoState) -> Self {
        Self {
            state,
            argocd_secret_changed: false,
        }
    }
}

/// Values the realm was configured with, read back from the cluster.
struct RealmInputs {
    broker_host: String,
    client_secret: String,
    broker_client_secret: String,
    broker_certificate: Option<String>,
}

fn secret_value(secret: &Secret, key: &str) -> Option<String> {
    secret
        .data
        .as_ref()?
        .get(key)
        .and_then(|v| String::from_utf8(v.0.clone()).ok())
        .filter(|s| !s.is_empty())
}

fn realm_marked(deployment_config: &DeploymentConfig) -> bool {
    deployment_config
        .annotations()
        .get(REALM_CREATED_ANNOTATION)
        .is_some_and(|v| v == "true")
}

fn broker_ready(deployment_config: &DeploymentConfig) -> bool {
    let desired = deployment_config.spec.replicas;
    let available = deployment_config
        .status
        .as_ref()
        .map_or(0, |s| s.available_replicas);
    desired >= 1 && available >= desired
}

async fn route_host<A: ClusterApi>(api: &A, namespace: &str, name: &str) -> Result<Option<String>> {
    Ok(api
        .get::<Route>(namespace, name)
        .await?
        .and_then(|route| route.admitted_host()))
}

/// Root CA advertised to Argo CD: the configured one, else the broker certificate.
fn trusted_root(instance: &ArgoCD, broker_certificate: Option<&str>) -> Option<String> {
    instance
        .spec
        .keycloak()
        .root_ca
        .clone()
        .filter(|ca| !ca.trim().is_empty())
        .or_else(|| broker_certificate.map(str::to_string))
}

async fn load_realm_inputs<A: ClusterApi>(api: &A, instance: &ArgoCD) -> Result<Option<RealmInputs>> {
    let namespace = instance_namespace(instance);
    let Some(broker_host) = route_host(api, &namespace, KEYCLOAK_NAME).await? else {
        return Ok(None);
    };
    let Some(record) = api
        .get::<Secret>(&namespace, &realm_credentials_secret_name(instance))
        .await?
    else {
        return Ok(None);
    };
    let (Some(client_secret), Some(broker_client_secret)) = (
        secret_value(&record, REALM_CLIENT_SECRET_KEY),
        secret_value(&record, REALM_BROKER_CLIENT_SECRET_KEY),
    ) else {
        return Ok(None);
    };
    let broker_certificate = api
        .get::<Secret>(&namespace, KEYCLOAK_SERVING_CERT_SECRET_NAME)
        .await?
        .and_then(|s| secret_value(&s, TLS_CERT_KEY));
    Ok(Some(RealmInputs {
        broker_host,
        client_secret,
        broker_client_secret,
        broker_certificate,
    }))
}

fn settings_from(instance: &ArgoCD, inputs: &RealmInputs) -> SsoSettings {
    let root_ca = if instance.spec.keycloak().verify_tls() {
        trusted_root(instance, inputs.broker_certificate.as_deref())
    } else {
        None
    };
    SsoSettings {
        oidc_config: Some(oidc_config_yaml(&inputs.broker_host, root_ca.as_deref())),
        rbac_scopes: Some(KEYCLOAK_RBAC_SCOPES.to_string()),
        keycloak_client_secret: Some(inputs.client_secret.clone()),
    }
}

/// Resolves the SSO values the config stage builds `argocd-cm`,
/// `argocd-rbac-cm` and `argocd-secret` with.
///
/// Read-only. Returns defaults until the realm is configured.
///
/// # Errors
///
/// Returns an error if a cluster read fails.
pub async fn resolve_sso_settings<A: ClusterApi>(api: &A, instance: &ArgoCD) -> Result<SsoSettings> {
    if !instance.spec.keycloak_requested() {
        return Ok(SsoSettings::default());
    }
    let namespace = instance_namespace(instance);
    let configured = api
        .get::<DeploymentConfig>(&namespace, KEYCLOAK_NAME)
        .await?
        .is_some_and(|dc| realm_marked(&dc));
    if !configured {
        return Ok(SsoSettings::default());
    }
    Ok(load_realm_inputs(api, instance)
        .await?
        .map(|inputs| settings_from(instance, &inputs))
        .unwrap_or_default())
}

/// Sets one config map entry if it differs. Absent config maps are left to the config stage.
async fn patch_config_entry<A: ClusterApi>(
    api: &A,
    namespace: &str,
    name: &str,
    key: &str,
    value: Option<&String>,
) -> Result<bool> {
    let Some(value) = value else {
        return Ok(false);
    };
    let Some(current) = api.get::<ConfigMap>(namespace, name).await? else {
        return Ok(false);
    };
    if current.data.as_ref().and_then(|d| d.get(key)) == Some(value) {
        return Ok(false);
    }
    api.patch_merge::<ConfigMap>(namespace, name, &json!({ "data": { key: value } }))
        .await?;
    info!(namespace = %namespace, name = %name, key = %key, "Updated SSO configuration entry");
    Ok(true)
}

/// Points Argo CD at the configured realm. Returns whether `argocd-secret` changed.
async fn propagate<A: ClusterApi>(api: &A, instance: &ArgoCD, cluster_api_url: &str) -> Result<bool> {
    let namespace = instance_namespace(instance);
    let Some(inputs) = load_realm_inputs(api, instance).await? else {
        warn!(
            namespace = %namespace,
            name = %instance.name_any(),
            "Realm is configured but its route or credentials are missing, skipping propagation"
        );
        return Ok(false);
    };
    let settings = settings_from(instance, &inputs);

    let mut secret_changed = false;
    if let Some(secret) = api.get::<Secret>(&namespace, ARGOCD_SECRET_NAME).await? {
        if secret_value(&secret, KEYCLOAK_CLIENT_SECRET_KEY).as_deref()
            != Some(inputs.client_secret.as_str())
        {
            let patch = json!({
                "data": { KEYCLOAK_CLIENT_SECRET_KEY: BASE64.encode(&inputs.client_secret) }
            });
            api.patch_merge::<Secret>(&namespace, ARGOCD_SECRET_NAME, &patch)
                .await?;
            info!(namespace = %namespace, "Stored keycloak client secret in argocd-secret");
            secret_changed = true;
        }
    }

    // Same values the config stage would render, so the two never fight
    let argocd_cm = build_argocd_cm(instance, &settings, cluster_api_url);
    patch_config_entry(
        api,
        &namespace,
        ARGOCD_CM_NAME,
        "oidc.config",
        argocd_cm.data.as_ref().and_then(|d| d.get("oidc.config")),
    )
    .await?;
    let rbac_cm = build_rbac_cm(instance, &settings);
    patch_config_entry(
        api,
        &namespace,
        ARGOCD_RBAC_CM_NAME,
        "scopes",
        rbac_cm.data.as_ref().and_then(|d| d.get("scopes")),
    )
    .await?;

    converge(
        api,
        instance,
        true,
        build_oauth_client(instance, &inputs.broker_client_secret, &inputs.broker_host),
    )
    .await?;
    Ok(secret_changed)
}

/// Removes every broker object owned by the instance.
async fn tear_down<A: ClusterApi>(api: &A, instance: &ArgoCD) -> Result<()> {
    converge(api, instance, false, build_keycloak_template_instance(instance)).await?;
    converge(api, instance, false, build_oauth_client(instance, "", "")).await?;
    converge(api, instance, false, build_realm_credentials_secret(instance, "", "")).await?;
    Ok(())
}

/// Advances the keycloak bootstrap by at most one realm call.
///
/// # Arguments
///
/// * `api` - Cluster access
/// * `configurator` - Broker admin API
/// * `instance` - Instance being reconciled
/// * `capabilities` - Discovered platform capabilities
/// * `cluster_api_url` - OpenShift API URL used by the realm's identity provider
///
/// # Errors
///
/// Returns an error if a cluster call or the realm call fails. A failed realm
/// call leaves the completion marker unset so the next pass retries it.
pub async fn reconcile_sso<A: ClusterApi>(
    api: &A,
    configurator: &dyn RealmConfigurator,
    instance: &ArgoCD,
    capabilities: &PlatformCapabilities,
    cluster_api_url: &str,
) -> Result<SsoOutcome> {
    let namespace = instance_namespace(instance);
    let name = instance.name_any();

    if !instance.spec.keycloak_requested() || !capabilities.templates {
        if instance.spec.keycloak_requested() {
            warn!(
                namespace = %namespace,
                name = %name,
                "Keycloak SSO requested but the template API is not available"
            );
        }
        tear_down(api, instance).await?;
        return Ok(SsoOutcome::state(SsoState::NotRequested));
    }

    converge(api, instance, true, build_keycloak_template_instance(instance)).await?;

    let Some(deployment_config) = api.get::<DeploymentConfig>(&namespace, KEYCLOAK_NAME).await? else {
        debug!(namespace = %namespace, name = %name, "Keycloak broker not instantiated yet");
        return Ok(SsoOutcome::state(SsoState::BrokerDeploying));
    };

    if realm_marked(&deployment_config) {
        let argocd_secret_changed = propagate(api, instance, cluster_api_url).await?;
        return Ok(SsoOutcome {
            state: SsoState::RealmConfigured,
            argocd_secret_changed,
        });
    }

    if !broker_ready(&deployment_config) {
        debug!(namespace = %namespace, name = %name, "Keycloak broker not ready yet");
        return Ok(SsoOutcome::state(SsoState::BrokerDeploying));
    }

    let Some(broker_host) = route_host(api, &namespace, KEYCLOAK_NAME).await? else {
        warn!(namespace = %namespace, name = %name, "Keycloak route has no host yet");
        return Ok(SsoOutcome::state(SsoState::RealmPending));
    };
    let platform_host = route_host(api, &namespace, &resource_name(instance, COMPONENT_SERVER))
        .await?
        .unwrap_or_else(|| server_host(instance));

    let Some(admin) = api.get::<Secret>(&namespace, KEYCLOAK_ADMIN_SECRET_NAME).await? else {
        warn!(namespace = %namespace, name = %name, "Keycloak admin secret not found");
        return Ok(SsoOutcome::state(SsoState::RealmPending));
    };
    let username = secret_value(&admin, KEYCLOAK_ADMIN_USERNAME_KEY);
    let password = secret_value(&admin, KEYCLOAK_ADMIN_PASSWORD_KEY);
    let (Some(username), Some(password)) = (username.clone(), password) else {
        let key = if username.is_none() {
            KEYCLOAK_ADMIN_USERNAME_KEY
        } else {
            KEYCLOAK_ADMIN_PASSWORD_KEY
        };
        let error = SsoError::MissingCredentials {
            secret: KEYCLOAK_ADMIN_SECRET_NAME.to_string(),
            key: key.to_string(),
        };
        warn!(namespace = %namespace, name = %name, error = %error, "Deferring realm configuration");
        return Ok(SsoOutcome::state(SsoState::RealmPending));
    };
    let broker_certificate = api
        .get::<Secret>(&namespace, KEYCLOAK_SERVING_CERT_SECRET_NAME)
        .await?
        .and_then(|s| secret_value(&s, TLS_CERT_KEY));

    // Intent record; create-only so a retried call reuses the same secrets
    ensure_created(
        api,
        instance,
        build_realm_credentials_secret(
            instance,
            &generate_secret(GENERATED_SECRET_LENGTH),
            &generate_secret(GENERATED_SECRET_LENGTH),
        ),
    )
    .await?;
    let record_name = realm_credentials_secret_name(instance);
    let Some(record) = api.get::<Secret>(&namespace, &record_name).await? else {
        bail!("realm credentials secret {namespace}/{record_name} disappeared");
    };
    let (Some(client_secret), Some(broker_client_secret)) = (
        secret_value(&record, REALM_CLIENT_SECRET_KEY),
        secret_value(&record, REALM_BROKER_CLIENT_SECRET_KEY),
    ) else {
        bail!("realm credentials secret {namespace}/{record_name} is incomplete");
    };

    let keycloak = instance.spec.keycloak();
    let request = RealmRequest {
        base_url: format!("https://{broker_host}"),
        username,
        password,
        trust_certificate: trusted_root(instance, broker_certificate.as_deref()),
        verify_tls: keycloak.verify_tls(),
        realm: realm_definition(&RealmParameters {
            platform_host,
            client_secret,
            broker_client_id: broker_client_name(instance),
            broker_client_secret,
            cluster_api_url: cluster_api_url.to_string(),
        }),
    };

    match configurator.create_realm(&request).await {
        Ok(creation) => metrics::record_realm_configuration(creation.as_str()),
        Err(e) => {
            metrics::record_realm_configuration("error");
            return Err(e).with_context(|| {
                format!("failed to configure keycloak realm for {namespace}/{name}")
            });
        }
    }

    let marker = json!({ "metadata": { "annotations": { REALM_CREATED_ANNOTATION: "true" } } });
    api.patch_merge::<DeploymentConfig>(&namespace, KEYCLOAK_NAME, &marker)
        .await?;
    info!(namespace = %namespace, name = %name, broker = %broker_host, "Keycloak realm configured");

    let argocd_secret_changed = propagate(api, instance, cluster_api_url).await?;
    Ok(SsoOutcome {
        state: SsoState::RealmConfigured,
        argocd_secret_changed,
    })
}

#[cfg(test)]
#[path = "sso_tests.rs"]
mod sso_tests;
