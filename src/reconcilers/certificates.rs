// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Certificate chain issuance for internal TLS.
//!
//! Each instance has one self-signed root stored in the authority secret
//! (`<name>-ca` unless `spec.tls.ca.secretName` names another). Leaf
//! certificates for the server and the repo server are signed by that root and
//! stored in their own secrets, annotated with the fingerprint of the root that
//! signed them.
//!
//! ```text
//! NoAuthority ──generate──▶ AuthorityPresent ──sign──▶ LeafPresent(purpose)
//! ```
//!
//! Both the authority and the leaves are create-only. A leaf is only looked at
//! again when its recorded fingerprint no longer matches the root, which
//! happens when the authority secret was recreated. The leaf is then verified
//! against the current root and reissued if it no longer chains to it.
//!
//! Leaf issuance never runs without a readable authority; it is deferred to a
//! later pass instead.

use anyhow::{Context as _, Result};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::ResourceExt;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::argocd_resources::config::{
    build_ca_config_map, build_ca_secret, build_tls_secret, ca_secret_name, server_tls_secret_name,
};
use crate::argocd_resources::{instance_namespace, repo_server_dns_names, server_dns_names};
use crate::cluster::ClusterApi;
use crate::constants::{
    ARGOCD_REPO_SERVER_TLS_SECRET_NAME, COMPONENT_REPO_SERVER, COMPONENT_SERVER, TLS_CERT_KEY,
    TLS_PRIVATE_KEY,
};
use crate::crd::ArgoCD;
use crate::labels::{ISSUER_FINGERPRINT_ANNOTATION, ROLLOUT_REPO_TLS_CHANGED, ROLLOUT_TLS_CHANGED};
use crate::pki::{self, CertificateAuthority};
use crate::reconcilers::converge::{converge, ensure_created, Outcome};
use crate::reconcilers::rollout::{repo_tls_consumers, server_tls_consumers, WorkloadRef};

/// What a leaf certificate is used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeafPurpose {
    /// Serving certificate of the API/UI server
    Server,
    /// mTLS between the repo server and its clients
    RepoServer,
}

impl LeafPurpose {
    #[must_use]
    pub fn secret_name(self, instance: &ArgoCD) -> String {
        match self {
            Self::Server => server_tls_secret_name(instance),
            Self::RepoServer => ARGOCD_REPO_SERVER_TLS_SECRET_NAME.to_string(),
        }
    }

    fn component(self) -> &'static str {
        match self {
            Self::Server => COMPONENT_SERVER,
            Self::RepoServer => COMPONENT_REPO_SERVER,
        }
    }

    /// Names the certificate must cover.
    #[must_use]
    pub fn dns_names(self, instance: &ArgoCD, route_host: Option<&str>) -> Vec<String> {
        match self {
            Self::Server => server_dns_names(instance, route_host),
            Self::RepoServer => repo_server_dns_names(instance),
        }
    }

    /// Rollout label stamped on consumers after a reissue.
    #[must_use]
    pub fn rollout_key(self) -> &'static str {
        match self {
            Self::Server => ROLLOUT_TLS_CHANGED,
            Self::RepoServer => ROLLOUT_REPO_TLS_CHANGED,
        }
    }

    /// Workloads to restart after a reissue.
    #[must_use]
    pub fn consumers(self, instance: &ArgoCD) -> Vec<WorkloadRef> {
        match self {
            Self::Server => server_tls_consumers(instance),
            Self::RepoServer => repo_tls_consumers(instance),
        }
    }
}

/// Result of one leaf issuance step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IssueOutcome {
    /// No readable authority yet; nothing written
    Deferred,
    /// Leaf secret created
    Issued,
    /// Leaf secret already valid for the current root
    Present,
    /// Leaf no longer chained to the root and was replaced; consumers need a restart
    Reissued,
}

impl IssueOutcome {
    #[must_use]
    pub fn needs_rollout(self) -> bool {
        self == Self::Reissued
    }

    #[must_use]
    pub fn is_write(self) -> bool {
        matches!(self, Self::Issued | Self::Reissued)
    }
}

/// Outcome of a full certificate pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertificateReport {
    pub authority: Outcome,
    pub leaves: Vec<(LeafPurpose, IssueOutcome)>,
}

impl CertificateReport {
    /// Leaves reissued during this pass.
    pub fn reissued(&self) -> impl Iterator<Item = LeafPurpose> + '_ {
        self.leaves
            .iter()
            .filter(|(_, outcome)| outcome.needs_rollout())
            .map(|(purpose, _)| *purpose)
    }
}

fn data_str(secret: &Secret, key: &str) -> Option<String> {
    secret
        .data
        .as_ref()?
        .get(key)
        .and_then(|v| String::from_utf8(v.0.clone()).ok())
        .filter(|s| !s.is_empty())
}

/// Reads the instance's authority, or `None` if it is missing or unreadable.
///
/// # Errors
///
/// Returns an error only if the cluster read fails.
pub async fn load_authority<A: ClusterApi>(
    api: &A,
    instance: &ArgoCD,
) -> Result<Option<CertificateAuthority>> {
    let namespace = instance_namespace(instance);
    let name = ca_secret_name(instance);
    let Some(secret) = api.get::<Secret>(&namespace, &name).await? else {
        return Ok(None);
    };
    let (Some(cert), Some(key)) = (data_str(&secret, TLS_CERT_KEY), data_str(&secret, TLS_PRIVATE_KEY))
    else {
        warn!(namespace = %namespace, name = %name, "Authority secret is missing tls.crt or tls.key");
        return Ok(None);
    };
    match CertificateAuthority::from_pem(&cert, &key) {
        Ok(authority) => Ok(Some(authority)),
        Err(e) => {
            warn!(namespace = %namespace, name = %name, error = %e, "Authority secret is unreadable");
            Ok(None)
        }
    }
}

/// Creates the authority if absent and publishes its certificate.
///
/// An existing authority secret is never regenerated.
///
/// # Errors
///
/// Returns an error if key generation or a cluster call fails.
pub async fn ensure_authority<A: ClusterApi>(api: &A, instance: &ArgoCD) -> Result<Outcome> {
    let namespace = instance_namespace(instance);
    let name = ca_secret_name(instance);

    let outcome = if api.get::<Secret>(&namespace, &name).await?.is_some() {
        Outcome::Unchanged
    } else {
        let authority = CertificateAuthority::generate(&instance.name_any())
            .context("failed to generate certificate authority")?;
        let outcome = ensure_created(api, instance, build_ca_secret(instance, &authority)).await?;
        info!(namespace = %namespace, name = %name, "Generated certificate authority");
        outcome
    };

    if let Some(authority) = load_authority(api, instance).await? {
        converge(
            api,
            instance,
            true,
            build_ca_config_map(instance, authority.cert_pem()),
        )
        .await?;
    }
    Ok(outcome)
}

/// Issues or checks the leaf certificate for `purpose`.
///
/// # Arguments
///
/// * `route_host` - Host admitted for the server route, added to the server's names
///
/// # Errors
///
/// Returns an error if signing or a cluster call fails.
pub async fn ensure_leaf<A: ClusterApi>(
    api: &A,
    instance: &ArgoCD,
    purpose: LeafPurpose,
    route_host: Option<&str>,
) -> Result<IssueOutcome> {
    let namespace = instance_namespace(instance);
    let name = purpose.secret_name(instance);

    let Some(authority) = load_authority(api, instance).await? else {
        warn!(
            namespace = %namespace,
            name = %name,
            "No certificate authority available, deferring leaf issuance"
        );
        return Ok(IssueOutcome::Deferred);
    };
    let root_fingerprint = authority.fingerprint()?;

    let Some(mut existing) = api.get::<Secret>(&namespace, &name).await? else {
        let leaf = authority.issue_leaf(&purpose.dns_names(instance, route_host))?;
        let secret = build_tls_secret(instance, &name, purpose.component(), &leaf, &root_fingerprint);
        ensure_created(api, instance, secret).await?;
        return Ok(IssueOutcome::Issued);
    };

    let recorded = existing
        .annotations()
        .get(ISSUER_FINGERPRINT_ANNOTATION)
        .cloned();
    if recorded.as_deref() == Some(root_fingerprint.as_str()) {
        debug!(namespace = %namespace, name = %name, "Leaf certificate is current");
        return Ok(IssueOutcome::Present);
    }

    let still_valid = data_str(&existing, TLS_CERT_KEY)
        .is_some_and(|cert| pki::verify_chain(&cert, authority.cert_pem()).is_ok());
    if still_valid {
        let patch = json!({
            "metadata": { "annotations": { ISSUER_FINGERPRINT_ANNOTATION: root_fingerprint } }
        });
        api.patch_merge::<Secret>(&namespace, &name, &patch).await?;
        debug!(namespace = %namespace, name = %name, "Leaf certificate still chains to the root");
        return Ok(IssueOutcome::Present);
    }

    let leaf = authority.issue_leaf(&purpose.dns_names(instance, route_host))?;
    existing
        .data
        .get_or_insert_with(BTreeMap::new)
        .extend([
            (TLS_CERT_KEY.to_string(), ByteString(leaf.cert_pem.into_bytes())),
            (TLS_PRIVATE_KEY.to_string(), ByteString(leaf.key_pem.into_bytes())),
        ]);
    existing
        .annotations_mut()
        .insert(ISSUER_FINGERPRINT_ANNOTATION.to_string(), root_fingerprint);
    api.replace(&namespace, &existing).await?;
    info!(
        namespace = %namespace,
        name = %name,
        "Reissued leaf certificate for a new authority"
    );
    Ok(IssueOutcome::Reissued)
}

/// Runs the authority step followed by every leaf.
///
/// # Errors
///
/// Returns the first error from any step.
pub async fn reconcile_certificates<A: ClusterApi>(
    api: &A,
    instance: &ArgoCD,
    route_host: Option<&str>,
) -> Result<CertificateReport> {
    let authority = ensure_authority(api, instance).await?;
    let mut leaves = Vec::with_capacity(2);
    for purpose in [LeafPurpose::Server, LeafPurpose::RepoServer] {
        leaves.push((purpose, ensure_leaf(api, instance, purpose, route_host).await?));
    }
    Ok(CertificateReport { authority, leaves })
}

#[cfg(test)]
#[path = "certificates_tests.rs"]
mod certificates_tests;
