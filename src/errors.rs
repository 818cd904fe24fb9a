// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Domain error types for the Argo CD operator.
//!
//! Reconcilers return [`anyhow::Result`] and attach context as errors bubble up.
//! The enums here cover the failures that callers need to tell apart:
//! - [`PkiError`] - certificate authority and leaf certificate handling
//! - [`SsoError`] - keycloak admin API interaction
//!
//! A missing cluster object is never an error; see [`crate::cluster::ClusterApi::get`].

use thiserror::Error;

/// Errors raised while generating, parsing or verifying X.509 material.
#[derive(Error, Debug)]
pub enum PkiError {
    /// Key pair generation failed
    #[error("failed to generate key pair: {0}")]
    KeyGeneration(String),

    /// Certificate construction or signing failed
    #[error("failed to generate certificate: {0}")]
    CertificateGeneration(String),

    /// Stored PEM could not be decoded
    #[error("invalid PEM data: {0}")]
    InvalidPem(String),

    /// DER payload is not a well-formed certificate
    #[error("failed to parse certificate: {0}")]
    Parse(String),

    /// Certificate was not signed by the expected authority or is outside its validity window
    #[error("certificate verification failed: {0}")]
    Verification(String),
}

/// Errors raised while configuring the keycloak realm.
#[derive(Error, Debug)]
pub enum SsoError {
    /// Broker admin credentials are missing a required key
    #[error("admin credentials secret {secret} is missing key {key}")]
    MissingCredentials {
        /// Secret that was read
        secret: String,
        /// Key that was absent or empty
        key: String,
    },

    /// Token endpoint rejected the admin login
    #[error("keycloak token request to {url} failed with HTTP {status}: {body}")]
    TokenRejected {
        url: String,
        status: u16,
        body: String,
    },

    /// Admin API rejected the realm definition
    #[error("keycloak realm request to {url} failed with HTTP {status}: {body}")]
    RealmRejected {
        url: String,
        status: u16,
        body: String,
    },

    /// Broker certificate could not be used as a trust anchor
    #[error("invalid broker certificate: {0}")]
    InvalidTrustCertificate(String),

    /// Transport-level failure talking to the broker
    #[error("keycloak request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl SsoError {
    /// HTTP status carried by the error, if any.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::TokenRejected { status, .. } | Self::RealmRejected { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
