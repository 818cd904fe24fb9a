// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! X.509 primitives for the per-instance certificate authority.
//!
//! Each Argo CD instance gets its own self-signed root. Leaf certificates for
//! the server and the repo server are signed by that root so that components
//! can verify each other with the root published in `<name>-ca`.
//!
//! # Validity
//!
//! - Root certificates: 10 years
//! - Leaf certificates: 1 year
//!
//! # Example
//!
//! ```rust
//! use argocd_operator::pki::{verify_chain, CertificateAuthority};
//!
//! let ca = CertificateAuthority::generate("example").unwrap();
//! let leaf = ca
//!     .issue_leaf(&["example-server".to_string()])
//!     .unwrap();
//! verify_chain(&leaf.cert_pem, ca.cert_pem()).unwrap();
//! ```

use rcgen::{
    string::Ia5String, BasicConstraints, CertificateParams, DistinguishedName, DnType, DnValue,
    ExtendedKeyUsagePurpose, IsCa, Issuer, KeyPair, KeyUsagePurpose, SanType,
};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use x509_parser::prelude::*;

use crate::constants::{CA_COMMON_NAME, CA_VALIDITY_YEARS, LEAF_VALIDITY_YEARS};
use crate::errors::PkiError;

/// Result type for PKI operations
pub type Result<T> = std::result::Result<T, PkiError>;

/// Validity window starting now and lasting `years`.
fn validity(years: i64) -> (::time::OffsetDateTime, ::time::OffsetDateTime) {
    let now = ::time::OffsetDateTime::now_utc();
    (now, now + ::time::Duration::days(years * 365))
}

/// Decodes the first PEM block and returns its DER contents.
///
/// # Errors
///
/// Returns [`PkiError::InvalidPem`] if the input holds no PEM block.
pub fn parse_pem(pem_data: &str) -> Result<Vec<u8>> {
    let block = ::pem::parse(pem_data.as_bytes()).map_err(|e| PkiError::InvalidPem(e.to_string()))?;
    Ok(block.contents().to_vec())
}

/// Lowercase hex SHA-256 of a certificate's DER encoding.
///
/// # Errors
///
/// Returns an error if the PEM cannot be decoded.
pub fn fingerprint(cert_pem: &str) -> Result<String> {
    let der = parse_pem(cert_pem)?;
    let digest = Sha256::digest(&der);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    Ok(out)
}

/// PEM-encoded leaf certificate and its private key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeafCertificate {
    pub cert_pem: String,
    pub key_pem: String,
}

/// Root certificate authority for one instance.
///
/// `KeyPair` is not `Clone`, so the key is held as PEM and loaded per signing.
#[derive(Clone, Debug)]
pub struct CertificateAuthority {
    cert_pem: String,
    key_pem: String,
}

impl CertificateAuthority {
    /// Generates a new self-signed root for the instance named `organization`.
    ///
    /// # Errors
    ///
    /// Returns an error if key generation or self-signing fails.
    pub fn generate(organization: &str) -> Result<Self> {
        let mut params = CertificateParams::default();

        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, DnValue::Utf8String(CA_COMMON_NAME.to_string()));
        dn.push(
            DnType::OrganizationName,
            DnValue::Utf8String(organization.to_string()),
        );
        params.distinguished_name = dn;

        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];

        let (not_before, not_after) = validity(CA_VALIDITY_YEARS);
        params.not_before = not_before;
        params.not_after = not_after;

        let key_pair = KeyPair::generate().map_err(|e| PkiError::KeyGeneration(e.to_string()))?;
        let cert = params
            .self_signed(&key_pair)
            .map_err(|e| PkiError::CertificateGeneration(e.to_string()))?;

        Ok(Self {
            cert_pem: cert.pem(),
            key_pem: key_pair.serialize_pem(),
        })
    }

    /// Loads a stored authority, checking both halves parse.
    ///
    /// # Errors
    ///
    /// Returns an error if the certificate or key PEM is malformed.
    pub fn from_pem(cert_pem: &str, key_pem: &str) -> Result<Self> {
        KeyPair::from_pem(key_pem).map_err(|e| PkiError::InvalidPem(e.to_string()))?;
        let der = parse_pem(cert_pem)?;
        X509Certificate::from_der(&der).map_err(|e| PkiError::Parse(e.to_string()))?;

        Ok(Self {
            cert_pem: cert_pem.to_string(),
            key_pem: key_pem.to_string(),
        })
    }

    #[must_use]
    pub fn cert_pem(&self) -> &str {
        &self.cert_pem
    }

    #[must_use]
    pub fn key_pem(&self) -> &str {
        &self.key_pem
    }

    /// SHA-256 fingerprint of the root certificate.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored PEM cannot be decoded.
    pub fn fingerprint(&self) -> Result<String> {
        fingerprint(&self.cert_pem)
    }

    /// Issues a leaf certificate for the given DNS names, signed by this root.
    ///
    /// The first name becomes the common name. The certificate is usable for
    /// both server and client authentication.
    ///
    /// # Errors
    ///
    /// Returns an error if `dns_names` is empty, a name is not valid IA5, or signing fails.
    pub fn issue_leaf(&self, dns_names: &[String]) -> Result<LeafCertificate> {
        let common_name = dns_names.first().ok_or_else(|| {
            PkiError::CertificateGeneration("at least one DNS name is required".to_string())
        })?;

        let mut params = CertificateParams::default();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, DnValue::Utf8String(common_name.clone()));
        params.distinguished_name = dn;

        params.is_ca = IsCa::NoCa;
        params.key_usages = vec![
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyEncipherment,
        ];
        params.extended_key_usages = vec![
            ExtendedKeyUsagePurpose::ServerAuth,
            ExtendedKeyUsagePurpose::ClientAuth,
        ];

        let (not_before, not_after) = validity(LEAF_VALIDITY_YEARS);
        params.not_before = not_before;
        params.not_after = not_after;

        params.subject_alt_names = dns_names
            .iter()
            .map(|name| {
                Ia5String::try_from(name.clone())
                    .map(SanType::DnsName)
                    .map_err(|e| {
                        PkiError::CertificateGeneration(format!("invalid DNS name '{name}': {e}"))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let leaf_key = KeyPair::generate().map_err(|e| PkiError::KeyGeneration(e.to_string()))?;

        let ca_key = KeyPair::from_pem(&self.key_pem).map_err(|e| PkiError::InvalidPem(e.to_string()))?;
        let issuer = Issuer::from_ca_cert_pem(&self.cert_pem, &ca_key)
            .map_err(|e| PkiError::Parse(e.to_string()))?;

        let cert = params
            .signed_by(&leaf_key, &issuer)
            .map_err(|e| PkiError::CertificateGeneration(e.to_string()))?;

        Ok(LeafCertificate {
            cert_pem: cert.pem(),
            key_pem: leaf_key.serialize_pem(),
        })
    }
}

/// Checks that `leaf_pem` was signed by `ca_pem` and is currently valid.
///
/// # Errors
///
/// Returns [`PkiError::Verification`] if the signature does not match the root
/// or the leaf is outside its validity window, and a parse error if either
/// certificate is malformed.
pub fn verify_chain(leaf_pem: &str, ca_pem: &str) -> Result<()> {
    let leaf_der = parse_pem(leaf_pem)?;
    let (_, leaf) = X509Certificate::from_der(&leaf_der).map_err(|e| PkiError::Parse(e.to_string()))?;

    let ca_der = parse_pem(ca_pem)?;
    let (_, ca) = X509Certificate::from_der(&ca_der).map_err(|e| PkiError::Parse(e.to_string()))?;

    leaf.verify_signature(Some(ca.public_key()))
        .map_err(|e| PkiError::Verification(format!("signature does not match root: {e}")))?;

    if !leaf.validity().is_valid() {
        return Err(PkiError::Verification(
            "certificate is outside its validity window".to_string(),
        ));
    }

    Ok(())
}

/// DNS names (SAN entries) of a certificate.
///
/// # Errors
///
/// Returns an error if the certificate is malformed.
pub fn dns_names(cert_pem: &str) -> Result<Vec<String>> {
    let der = parse_pem(cert_pem)?;
    let (_, cert) = X509Certificate::from_der(&der).map_err(|e| PkiError::Parse(e.to_string()))?;
    let names = cert
        .subject_alternative_name()
        .map_err(|e| PkiError::Parse(e.to_string()))?
        .map(|ext| {
            ext.value
                .general_names
                .iter()
                .filter_map(|gn| match gn {
                    GeneralName::DNSName(name) => Some((*name).to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(names)
}

#[cfg(test)]
#[path = "pki_tests.rs"]
mod pki_tests;
