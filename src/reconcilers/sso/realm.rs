// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Keycloak realm definition for Argo CD.
//!
//! The realm holds one confidential OIDC client for Argo CD, a `groups` client
//! scope so group membership reaches Argo CD RBAC, and an identity provider
//! that lets users log in with their OpenShift accounts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::{KEYCLOAK_ARGOCD_CLIENT_ID, KEYCLOAK_IDENTITY_PROVIDER, KEYCLOAK_REALM};

const GROUPS_SCOPE: &str = "groups";
const FIRST_BROKER_LOGIN_FLOW: &str = "first broker login";

/// Inputs needed to build the realm.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RealmParameters {
    /// External host of the Argo CD server
    pub platform_host: String,
    /// Secret of the Argo CD OIDC client
    pub client_secret: String,
    /// Name of the OpenShift OAuth client the identity provider logs in with
    pub broker_client_id: String,
    /// Secret shared with the OpenShift OAuth client
    pub broker_client_secret: String,
    /// OpenShift API server URL used by the identity provider
    pub cluster_api_url: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RealmRepresentation {
    pub realm: String,
    pub enabled: bool,
    pub ssl_required: String,
    pub clients: Vec<ClientRepresentation>,
    pub client_scopes: Vec<ClientScopeRepresentation>,
    pub identity_providers: Vec<IdentityProviderRepresentation>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientRepresentation {
    pub client_id: String,
    pub name: String,
    pub enabled: bool,
    pub public_client: bool,
    pub client_authenticator_type: String,
    pub secret: String,
    pub root_url: String,
    pub admin_url: String,
    pub base_url: String,
    pub redirect_uris: Vec<String>,
    pub web_origins: Vec<String>,
    pub standard_flow_enabled: bool,
    pub default_client_scopes: Vec<String>,
    pub optional_client_scopes: Vec<String>,
    pub protocol_mappers: Vec<ProtocolMapperRepresentation>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientScopeRepresentation {
    pub name: String,
    pub protocol: String,
    pub protocol_mappers: Vec<ProtocolMapperRepresentation>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolMapperRepresentation {
    pub name: String,
    pub protocol: String,
    pub protocol_mapper: String,
    pub config: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IdentityProviderRepresentation {
    pub alias: String,
    pub display_name: String,
    pub provider_id: String,
    pub enabled: bool,
    pub trust_email: bool,
    pub first_broker_login_flow_alias: String,
    pub config: BTreeMap<String, String>,
}

fn groups_mapper() -> ProtocolMapperRepresentation {
    ProtocolMapperRepresentation {
        name: GROUPS_SCOPE.to_string(),
        protocol: "openid-connect".to_string(),
        protocol_mapper: "oidc-group-membership-mapper".to_string(),
        config: BTreeMap::from([
            ("full.path".to_string(), "false".to_string()),
            ("id.token.claim".to_string(), "true".to_string()),
            ("access.token.claim".to_string(), "true".to_string()),
            ("userinfo.token.claim".to_string(), "true".to_string()),
            ("claim.name".to_string(), GROUPS_SCOPE.to_string()),
        ]),
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// Builds the `argocd` realm.
#[must_use]
pub fn realm_definition(params: &RealmParameters) -> RealmRepresentation {
    let platform_url = format!("https://{}", params.platform_host);

    let argocd_client = ClientRepresentation {
        client_id: KEYCLOAK_ARGOCD_CLIENT_ID.to_string(),
        name: "Argo CD".to_string(),
        enabled: true,
        public_client: false,
        client_authenticator_type: "client-secret".to_string(),
        secret: params.client_secret.clone(),
        root_url: platform_url.clone(),
        admin_url: platform_url.clone(),
        base_url: "/applications".to_string(),
        redirect_uris: vec![format!("{platform_url}/auth/callback")],
        web_origins: vec![platform_url],
        standard_flow_enabled: true,
        default_client_scopes: strings(&["web-origins", "role_list", "roles", "profile", GROUPS_SCOPE, "email"]),
        optional_client_scopes: strings(&["address", "phone", "offline_access", "microprofile-jwt"]),
        protocol_mappers: vec![groups_mapper()],
    };

    let groups_scope = ClientScopeRepresentation {
        name: GROUPS_SCOPE.to_string(),
        protocol: "openid-connect".to_string(),
        protocol_mappers: vec![groups_mapper()],
    };

    let openshift = IdentityProviderRepresentation {
        alias: KEYCLOAK_IDENTITY_PROVIDER.to_string(),
        display_name: "Login with OpenShift".to_string(),
        provider_id: KEYCLOAK_IDENTITY_PROVIDER.to_string(),
        enabled: true,
        trust_email: false,
        first_broker_login_flow_alias: FIRST_BROKER_LOGIN_FLOW.to_string(),
        config: BTreeMap::from([
            ("baseUrl".to_string(), params.cluster_api_url.clone()),
            ("clientId".to_string(), params.broker_client_id.clone()),
            ("clientSecret".to_string(), params.broker_client_secret.clone()),
            ("defaultScope".to_string(), "user:full".to_string()),
            ("syncMode".to_string(), "FORCE".to_string()),
        ]),
    };

    RealmRepresentation {
        realm: KEYCLOAK_REALM.to_string(),
        enabled: true,
        ssl_required: "external".to_string(),
        clients: vec![argocd_client],
        client_scopes: vec![groups_scope],
        identity_providers: vec![openshift],
    }
}
