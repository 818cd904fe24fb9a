// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Config maps and secrets consumed by Argo CD components.

use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::ByteString;
use std::collections::BTreeMap;

use super::identity::service_account_name;
use super::{build_metadata, instance_namespace, resource_name, server_host};
use crate::constants::{
    ADMIN_PASSWORD_KEY, ARGOCD_CM_NAME, ARGOCD_GPG_KEYS_CM_NAME, ARGOCD_KNOWN_HOSTS_CM_NAME,
    ARGOCD_RBAC_CM_NAME, ARGOCD_SECRET_NAME, ARGOCD_TLS_CERTS_CM_NAME, CA_CERT_KEY,
    COMPONENT_DEX_SERVER, COMPONENT_SERVER, KEYCLOAK_CLIENT_SECRET_KEY, SECRET_TYPE_OPAQUE,
    SECRET_TYPE_TLS, SERVER_SECRET_KEY, TLS_CERT_KEY, TLS_PRIVATE_KEY,
};
use crate::crd::ArgoCD;
use crate::labels::ISSUER_FINGERPRINT_ANNOTATION;
use crate::pki::{CertificateAuthority, LeafCertificate};

/// Component label for configuration objects shared by every component.
const COMPONENT_CONFIG: &str = "config";

const DEFAULT_INSTANCE_LABEL_KEY: &str = "app.kubernetes.io/instance";
const DEFAULT_RBAC_POLICY: &str = "role:readonly";
const DEFAULT_RBAC_SCOPES: &str = "[groups]";
const DEFAULT_POLICY_MATCH_MODE: &str = "glob";

const DEFAULT_KNOWN_HOSTS: &str = "\
github.com ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIOMqqnkVzrm0SdG6UOoqKLsabgH5C9okWi0dh2l9GKJl
gitlab.com ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIAfuCHKVTjquxvt6CM6tdG4SLp1Btn/nOeHHE5UOzRdf
";

/// SSO-derived settings threaded into the Argo CD configuration.
///
/// Resolved once per pass before the config stage so that the config maps and
/// `argocd-secret` are built with their final values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SsoSettings {
    /// `oidc.config` pointing at the keycloak realm
    pub oidc_config: Option<String>,
    /// `scopes` override for `argocd-rbac-cm`
    pub rbac_scopes: Option<String>,
    /// Client secret stored as `oidc.keycloak.clientSecret`
    pub keycloak_client_secret: Option<String>,
}

/// Name of the authority secret: `spec.tls.ca.secretName` or `<name>-ca`.
#[must_use]
pub fn ca_secret_name(instance: &ArgoCD) -> String {
    instance
        .spec
        .tls
        .ca
        .secret_name
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| resource_name(instance, "ca"))
}

/// Name of the server's serving certificate secret.
#[must_use]
pub fn server_tls_secret_name(instance: &ArgoCD) -> String {
    resource_name(instance, "tls")
}

fn bytes(value: &str) -> ByteString {
    ByteString(value.as_bytes().to_vec())
}

fn config_map(instance: &ArgoCD, name: &str, data: BTreeMap<String, String>) -> ConfigMap {
    ConfigMap {
        metadata: build_metadata(instance, name, COMPONENT_CONFIG),
        data: Some(data),
        ..Default::default()
    }
}

/// Authority secret holding the root certificate and key.
#[must_use]
pub fn build_ca_secret(instance: &ArgoCD, ca: &CertificateAuthority) -> Secret {
    Secret {
        metadata: build_metadata(instance, &ca_secret_name(instance), COMPONENT_CONFIG),
        type_: Some(SECRET_TYPE_TLS.to_string()),
        data: Some(BTreeMap::from([
            (TLS_CERT_KEY.to_string(), bytes(ca.cert_pem())),
            (TLS_PRIVATE_KEY.to_string(), bytes(ca.key_pem())),
        ])),
        ..Default::default()
    }
}

/// Public half of the authority, published for clients that need to trust it.
#[must_use]
pub fn build_ca_config_map(instance: &ArgoCD, ca_cert_pem: &str) -> ConfigMap {
    config_map(
        instance,
        &resource_name(instance, "ca"),
        BTreeMap::from([(CA_CERT_KEY.to_string(), ca_cert_pem.to_string())]),
    )
}

/// Leaf certificate secret, annotated with the fingerprint of the signing root.
#[must_use]
pub fn build_tls_secret(
    instance: &ArgoCD,
    name: &str,
    component: &str,
    leaf: &LeafCertificate,
    issuer_fingerprint: &str,
) -> Secret {
    let mut metadata = build_metadata(instance, name, component);
    metadata.annotations = Some(BTreeMap::from([(
        ISSUER_FINGERPRINT_ANNOTATION.to_string(),
        issuer_fingerprint.to_string(),
    )]));
    Secret {
        metadata,
        type_: Some(SECRET_TYPE_TLS.to_string()),
        data: Some(BTreeMap::from([
            (TLS_CERT_KEY.to_string(), bytes(&leaf.cert_pem)),
            (TLS_PRIVATE_KEY.to_string(), bytes(&leaf.key_pem)),
        ])),
        ..Default::default()
    }
}

/// `<name>-cluster`, holding the generated admin password.
#[must_use]
pub fn build_cluster_secret(instance: &ArgoCD, admin_password: &str) -> Secret {
    Secret {
        metadata: build_metadata(instance, &resource_name(instance, "cluster"), COMPONENT_CONFIG),
        type_: Some(SECRET_TYPE_OPAQUE.to_string()),
        data: Some(BTreeMap::from([(
            ADMIN_PASSWORD_KEY.to_string(),
            bytes(admin_password),
        )])),
        ..Default::default()
    }
}

/// `argocd-secret`, the credential store read by every Argo CD component.
///
/// # Arguments
///
/// * `server_secret_key` - Session signing key, reused once generated
/// * `server_tls` - Serving certificate copied from `<name>-tls`, when issued
/// * `sso` - Resolved SSO settings
#[must_use]
pub fn build_argocd_secret(
    instance: &ArgoCD,
    server_secret_key: &str,
    server_tls: Option<(&[u8], &[u8])>,
    sso: &SsoSettings,
) -> Secret {
    let mut data = BTreeMap::from([(SERVER_SECRET_KEY.to_string(), bytes(server_secret_key))]);
    if let Some((cert, key)) = server_tls {
        data.insert(TLS_CERT_KEY.to_string(), ByteString(cert.to_vec()));
        data.insert(TLS_PRIVATE_KEY.to_string(), ByteString(key.to_vec()));
    }
    if let Some(client_secret) = &sso.keycloak_client_secret {
        data.insert(KEYCLOAK_CLIENT_SECRET_KEY.to_string(), bytes(client_secret));
    }
    Secret {
        metadata: build_metadata(instance, ARGOCD_SECRET_NAME, COMPONENT_SERVER),
        type_: Some(SECRET_TYPE_OPAQUE.to_string()),
        data: Some(data),
        ..Default::default()
    }
}

/// Generated `dex.config` for the OpenShift OAuth connector.
fn openshift_dex_config(instance: &ArgoCD, cluster_api_url: &str) -> String {
    let config = serde_json::json!({
        "connectors": [{
            "type": "openshift",
            "id": "openshift",
            "name": "OpenShift",
            "config": {
                "issuer": cluster_api_url,
                "clientID": format!(
                    "system:serviceaccount:{}:{}",
                    instance_namespace(instance),
                    service_account_name(instance, COMPONENT_DEX_SERVER)
                ),
                "clientSecret": "$oidc.dex.clientSecret",
                "redirectURI": format!("https://{}/api/dex/callback", server_host(instance)),
                "insecureCA": true,
            },
        }],
    });
    serde_yaml::to_string(&config).unwrap_or_default()
}

/// `argocd-cm`, the main Argo CD configuration.
#[must_use]
pub fn build_argocd_cm(instance: &ArgoCD, sso: &SsoSettings, cluster_api_url: &str) -> ConfigMap {
    let spec = &instance.spec;
    let mut data = BTreeMap::new();
    data.insert(
        "application.instanceLabelKey".to_string(),
        spec.application_instance_label_key
            .clone()
            .unwrap_or_else(|| DEFAULT_INSTANCE_LABEL_KEY.to_string()),
    );
    data.insert("admin.enabled".to_string(), (!spec.disable_admin).to_string());
    data.insert(
        "statusbadge.enabled".to_string(),
        spec.status_badge_enabled.to_string(),
    );
    data.insert(
        "users.anonymous.enabled".to_string(),
        spec.users_anonymous_enabled.to_string(),
    );
    data.insert("url".to_string(), format!("https://{}", server_host(instance)));

    if spec.dex_enabled() {
        let dex = spec.dex();
        let dex_config = match &dex.config {
            Some(config) => config.clone(),
            None if dex.open_shift_oauth => openshift_dex_config(instance, cluster_api_url),
            None => String::new(),
        };
        if !dex_config.is_empty() {
            data.insert("dex.config".to_string(), dex_config);
        }
    }

    if let Some(oidc) = sso.oidc_config.as_ref().or(spec.oidc_config.as_ref()) {
        data.insert("oidc.config".to_string(), oidc.clone());
    }

    if let Some(extra) = &spec.extra_config {
        data.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    config_map(instance, ARGOCD_CM_NAME, data)
}

/// `argocd-rbac-cm`
#[must_use]
pub fn build_rbac_cm(instance: &ArgoCD, sso: &SsoSettings) -> ConfigMap {
    let rbac = &instance.spec.rbac;
    let data = BTreeMap::from([
        (
            "policy.default".to_string(),
            rbac.default_policy
                .clone()
                .unwrap_or_else(|| DEFAULT_RBAC_POLICY.to_string()),
        ),
        (
            "policy.csv".to_string(),
            rbac.policy.clone().unwrap_or_default(),
        ),
        (
            "scopes".to_string(),
            sso.rbac_scopes
                .clone()
                .or_else(|| rbac.scopes.clone())
                .unwrap_or_else(|| DEFAULT_RBAC_SCOPES.to_string()),
        ),
        (
            "policy.matchMode".to_string(),
            rbac.policy_matcher_mode
                .clone()
                .unwrap_or_else(|| DEFAULT_POLICY_MATCH_MODE.to_string()),
        ),
    ]);
    config_map(instance, ARGOCD_RBAC_CM_NAME, data)
}

/// `argocd-ssh-known-hosts-cm`
#[must_use]
pub fn build_known_hosts_cm(instance: &ArgoCD) -> ConfigMap {
    let hosts = &instance.spec.initial_ssh_known_hosts;
    let mut known_hosts = String::new();
    if !hosts.exclude_default_hosts {
        known_hosts.push_str(DEFAULT_KNOWN_HOSTS);
    }
    if let Some(keys) = &hosts.keys {
        known_hosts.push_str(keys.trim_end());
        known_hosts.push('\n');
    }
    config_map(
        instance,
        ARGOCD_KNOWN_HOSTS_CM_NAME,
        BTreeMap::from([("ssh_known_hosts".to_string(), known_hosts)]),
    )
}

/// `argocd-tls-certs-cm`. Users add entries; the operator only creates it.
#[must_use]
pub fn build_tls_certs_cm(instance: &ArgoCD) -> ConfigMap {
    config_map(instance, ARGOCD_TLS_CERTS_CM_NAME, BTreeMap::new())
}

/// `argocd-gpg-keys-cm`. Users add entries; the operator only creates it.
#[must_use]
pub fn build_gpg_keys_cm(instance: &ArgoCD) -> ConfigMap {
    config_map(instance, ARGOCD_GPG_KEYS_CM_NAME, BTreeMap::new())
}
