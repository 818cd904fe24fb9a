// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Keycloak broker template, realm credentials and OAuth client registration.
//!
//! The broker itself is never built object by object. It is requested as one
//! OpenShift template instantiation whose objects (`keycloak-secret`, the
//! `keycloak` service, route and deployment config) are expanded by the
//! platform, which also generates the admin credentials.

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::ResourceExt;
use serde_json::json;
use std::collections::BTreeMap;

use super::{build_cluster_metadata, build_labels, build_metadata, instance_namespace, resource_name};
use crate::constants::{
    KEYCLOAK_ADMIN_PASSWORD_KEY, KEYCLOAK_ADMIN_SECRET_NAME, KEYCLOAK_ADMIN_USERNAME_KEY,
    KEYCLOAK_ARGOCD_CLIENT_ID, KEYCLOAK_BROKER_CLIENT_ID, KEYCLOAK_HTTPS_PORT,
    KEYCLOAK_IDENTITY_PROVIDER, KEYCLOAK_NAME, KEYCLOAK_REALM, KEYCLOAK_SERVING_CERT_SECRET_NAME,
    KEYCLOAK_TEMPLATE_INSTANCE_NAME, REALM_BROKER_CLIENT_SECRET_KEY, REALM_CLIENT_SECRET_KEY,
    SECRET_TYPE_OPAQUE,
};
use crate::crd::{ArgoCD, OAuthClient, Template, TemplateInstance, TemplateInstanceSpec, TemplateParameter};
use crate::labels::SERVING_CERT_ANNOTATION;

/// Component label for SSO objects.
pub const COMPONENT_SSO: &str = "sso";

/// Scopes written to `argocd-rbac-cm` once the realm exists.
pub const KEYCLOAK_RBAC_SCOPES: &str = "[groups,email]";

const GRANT_METHOD_PROMPT: &str = "prompt";

/// `<name>-keycloak-realm`, the record of credentials generated for the realm.
#[must_use]
pub fn realm_credentials_secret_name(instance: &ArgoCD) -> String {
    resource_name(instance, "keycloak-realm")
}

/// `<name>-<namespace>-keycloak-broker`, the cluster-wide OAuth client name.
///
/// OAuth clients are cluster-scoped, so the name must not collide between
/// instances in different namespaces.
#[must_use]
pub fn broker_client_name(instance: &ArgoCD) -> String {
    format!(
        "{}-{}-{KEYCLOAK_BROKER_CLIENT_ID}",
        instance.name_any(),
        instance_namespace(instance)
    )
}

/// Issuer URL of the argocd realm on the broker.
#[must_use]
pub fn realm_issuer(broker_host: &str) -> String {
    format!("https://{broker_host}/auth/realms/{KEYCLOAK_REALM}")
}

/// Callback URL the broker registers with the OpenShift OAuth server.
#[must_use]
pub fn broker_redirect_uri(broker_host: &str) -> String {
    format!(
        "{}/broker/{KEYCLOAK_IDENTITY_PROVIDER}/endpoint",
        realm_issuer(broker_host)
    )
}

fn template_parameter(name: &str, generate: Option<&str>, value: Option<&str>) -> TemplateParameter {
    TemplateParameter {
        name: name.to_string(),
        value: value.map(str::to_string),
        from: generate.map(str::to_string),
        generate: generate.map(|_| "expression".to_string()),
    }
}

fn template_objects(instance: &ArgoCD) -> Vec<serde_json::Value> {
    let keycloak = instance.spec.keycloak();
    let labels = build_labels(instance, COMPONENT_SSO);
    let selector = json!({ "deploymentConfig": KEYCLOAK_NAME });

    let admin_secret = json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": { "name": KEYCLOAK_ADMIN_SECRET_NAME, "labels": labels },
        "type": SECRET_TYPE_OPAQUE,
        "stringData": {
            KEYCLOAK_ADMIN_USERNAME_KEY: format!("${{{KEYCLOAK_ADMIN_USERNAME_KEY}}}"),
            KEYCLOAK_ADMIN_PASSWORD_KEY: format!("${{{KEYCLOAK_ADMIN_PASSWORD_KEY}}}"),
        },
    });

    let service = json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": {
            "name": KEYCLOAK_NAME,
            "labels": labels,
            "annotations": { SERVING_CERT_ANNOTATION: KEYCLOAK_SERVING_CERT_SECRET_NAME },
        },
        "spec": {
            "selector": selector,
            "ports": [{ "name": "https", "port": KEYCLOAK_HTTPS_PORT, "targetPort": KEYCLOAK_HTTPS_PORT }],
        },
    });

    let route = json!({
        "apiVersion": "route.openshift.io/v1",
        "kind": "Route",
        "metadata": { "name": KEYCLOAK_NAME, "labels": labels },
        "spec": {
            "to": { "kind": "Service", "name": KEYCLOAK_NAME },
            "tls": { "termination": "reencrypt" },
        },
    });

    let secret_env = |name: &str, key: &str| {
        json!({
            "name": name,
            "valueFrom": { "secretKeyRef": { "name": KEYCLOAK_ADMIN_SECRET_NAME, "key": key } },
        })
    };
    let mut container = json!({
        "name": KEYCLOAK_NAME,
        "image": keycloak.image_ref(),
        "env": [
            secret_env("SSO_ADMIN_USERNAME", KEYCLOAK_ADMIN_USERNAME_KEY),
            secret_env("SSO_ADMIN_PASSWORD", KEYCLOAK_ADMIN_PASSWORD_KEY),
            { "name": "SSO_HOSTNAME", "value": "" },
            { "name": "X509_CA_BUNDLE", "value": "/var/run/secrets/kubernetes.io/serviceaccount/*.crt" },
        ],
        "ports": [{ "name": "https", "containerPort": KEYCLOAK_HTTPS_PORT, "protocol": "TCP" }],
        "readinessProbe": {
            "httpGet": { "path": "/auth/realms/master", "port": KEYCLOAK_HTTPS_PORT, "scheme": "HTTPS" },
            "initialDelaySeconds": 60,
        },
        "volumeMounts": [{ "name": "sso-x509-https-volume", "mountPath": "/etc/x509/https", "readOnly": true }],
    });
    if let Some(resources) = &keycloak.resources {
        container["resources"] = serde_json::to_value(resources).unwrap_or_default();
    }

    let deployment_config = json!({
        "apiVersion": "apps.openshift.io/v1",
        "kind": "DeploymentConfig",
        "metadata": { "name": KEYCLOAK_NAME, "labels": labels },
        "spec": {
            "replicas": 1,
            "selector": selector,
            "strategy": { "type": "Recreate" },
            "template": {
                "metadata": { "labels": selector },
                "spec": {
                    "containers": [container],
                    "volumes": [{
                        "name": "sso-x509-https-volume",
                        "secret": { "secretName": KEYCLOAK_SERVING_CERT_SECRET_NAME },
                    }],
                },
            },
            "triggers": [{ "type": "ConfigChange" }],
        },
    });

    vec![admin_secret, service, route, deployment_config]
}

/// `rhsso` template instance requesting the keycloak broker.
#[must_use]
pub fn build_keycloak_template_instance(instance: &ArgoCD) -> TemplateInstance {
    let mut template_instance = TemplateInstance::new(
        KEYCLOAK_TEMPLATE_INSTANCE_NAME,
        TemplateInstanceSpec {
            template: Template {
                metadata: ObjectMeta {
                    name: Some(KEYCLOAK_TEMPLATE_INSTANCE_NAME.to_string()),
                    namespace: Some(instance_namespace(instance)),
                    ..Default::default()
                },
                objects: template_objects(instance),
                parameters: vec![
                    template_parameter(KEYCLOAK_ADMIN_USERNAME_KEY, Some("[a-zA-Z0-9]{8}"), None),
                    template_parameter(KEYCLOAK_ADMIN_PASSWORD_KEY, Some("[a-zA-Z0-9]{32}"), None),
                ],
            },
        },
    );
    template_instance.metadata = build_metadata(instance, KEYCLOAK_TEMPLATE_INSTANCE_NAME, COMPONENT_SSO);
    template_instance
}

/// Secret recording the client secrets generated for the realm.
#[must_use]
pub fn build_realm_credentials_secret(
    instance: &ArgoCD,
    client_secret: &str,
    broker_client_secret: &str,
) -> Secret {
    Secret {
        metadata: build_metadata(instance, &realm_credentials_secret_name(instance), COMPONENT_SSO),
        type_: Some(SECRET_TYPE_OPAQUE.to_string()),
        data: Some(BTreeMap::from([
            (
                REALM_CLIENT_SECRET_KEY.to_string(),
                ByteString(client_secret.as_bytes().to_vec()),
            ),
            (
                REALM_BROKER_CLIENT_SECRET_KEY.to_string(),
                ByteString(broker_client_secret.as_bytes().to_vec()),
            ),
        ])),
        ..Default::default()
    }
}

/// OAuth client letting the realm log users in through OpenShift.
#[must_use]
pub fn build_oauth_client(instance: &ArgoCD, secret: &str, broker_host: &str) -> OAuthClient {
    let name = broker_client_name(instance);
    let mut client = OAuthClient::new(&name);
    client.metadata = build_cluster_metadata(instance, &name, COMPONENT_SSO);
    client.secret = Some(secret.to_string());
    client.redirect_uris = vec![broker_redirect_uri(broker_host)];
    client.grant_method = Some(GRANT_METHOD_PROMPT.to_string());
    client
}

/// `oidc.config` entry for `argocd-cm` pointing at the argocd realm.
///
/// `root_ca` is included only when the broker certificate should be verified.
#[must_use]
pub fn oidc_config_yaml(broker_host: &str, root_ca: Option<&str>) -> String {
    let mut config = json!({
        "name": "Keycloak",
        "issuer": realm_issuer(broker_host),
        "clientID": KEYCLOAK_ARGOCD_CLIENT_ID,
        "clientSecret": "$oidc.keycloak.clientSecret",
        "requestedScopes": ["openid", "profile", "email", "groups"],
    });
    if let Some(ca) = root_ca.filter(|ca| !ca.trim().is_empty()) {
        config["rootCA"] = json!(ca);
    }
    serde_yaml::to_string(&config).unwrap_or_default()
}
