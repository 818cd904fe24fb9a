// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Keycloak admin API client.
//!
//! Realm creation is two calls: a password-grant token request against the
//! master realm with the `admin-cli` client, then `POST /auth/admin/realms`.
//! A realm that already exists (`409 Conflict`) counts as success, so repeating
//! the call after a lost completion marker is harmless.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::realm::RealmRepresentation;
use crate::errors::SsoError;

const TOKEN_PATH: &str = "/auth/realms/master/protocol/openid-connect/token";
const REALMS_PATH: &str = "/auth/admin/realms";
const ADMIN_CLIENT_ID: &str = "admin-cli";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything needed for one realm creation call.
#[derive(Clone, Debug)]
pub struct RealmRequest {
    /// Broker base URL, e.g. `https://keycloak-argocd.apps.example.com`
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// PEM certificate to trust in addition to the system roots
    pub trust_certificate: Option<String>,
    /// When false, the broker certificate is not validated
    pub verify_tls: bool,
    pub realm: RealmRepresentation,
}

/// Successful realm creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RealmCreation {
    Created,
    AlreadyExists,
}

impl RealmCreation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::AlreadyExists => "exists",
        }
    }
}

/// Creates the Argo CD realm on a broker.
#[async_trait]
pub trait RealmConfigurator: Send + Sync {
    /// Issues the realm creation call.
    ///
    /// # Errors
    ///
    /// Returns an [`SsoError`] when the broker rejects the login or the realm,
    /// or cannot be reached.
    async fn create_realm(&self, request: &RealmRequest) -> Result<RealmCreation, SsoError>;
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// [`RealmConfigurator`] talking to the keycloak admin REST API.
#[derive(Clone, Debug)]
pub struct KeycloakAdminClient {
    timeout: Duration,
}

impl Default for KeycloakAdminClient {
    fn default() -> Self {
        Self {
            timeout: REQUEST_TIMEOUT,
        }
    }
}

impl KeycloakAdminClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn http_client(&self, request: &RealmRequest) -> Result<reqwest::Client, SsoError> {
        let mut builder = reqwest::Client::builder().timeout(self.timeout);
        if request.verify_tls {
            if let Some(pem) = &request.trust_certificate {
                let certificate = reqwest::Certificate::from_pem(pem.as_bytes())
                    .map_err(|e| SsoError::InvalidTrustCertificate(e.to_string()))?;
                builder = builder.add_root_certificate(certificate);
            }
        } else {
            builder = builder.danger_accept_invalid_certs(true);
        }
        Ok(builder.build()?)
    }

    async fn token(&self, client: &reqwest::Client, request: &RealmRequest) -> Result<String, SsoError> {
        let url = format!("{}{TOKEN_PATH}", request.base_url.trim_end_matches('/'));
        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "password")
            .append_pair("client_id", ADMIN_CLIENT_ID)
            .append_pair("username", &request.username)
            .append_pair("password", &request.password)
            .finish();

        debug!(url = %url, "Requesting keycloak admin token");
        let response = client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SsoError::TokenRejected {
                url,
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<TokenResponse>().await?.access_token)
    }
}

#[async_trait]
impl RealmConfigurator for KeycloakAdminClient {
    async fn create_realm(&self, request: &RealmRequest) -> Result<RealmCreation, SsoError> {
        let client = self.http_client(request)?;
        let token = self.token(&client, request).await?;

        let url = format!("{}{REALMS_PATH}", request.base_url.trim_end_matches('/'));
        let response = client
            .post(&url)
            .bearer_auth(token)
            .json(&request.realm)
            .send()
            .await?;

        match response.status() {
            StatusCode::CREATED => {
                info!(url = %url, realm = %request.realm.realm, "Created keycloak realm");
                Ok(RealmCreation::Created)
            }
            StatusCode::CONFLICT => {
                info!(url = %url, realm = %request.realm.realm, "Keycloak realm already exists");
                Ok(RealmCreation::AlreadyExists)
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(SsoError::RealmRejected {
                    url,
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

#[cfg(test)]
#[path = "keycloak_tests.rs"]
mod keycloak_tests;
