// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `errors.rs`

#[cfg(test)]
mod tests {
    use crate::errors::{PkiError, SsoError};

    #[test]
    fn test_sso_error_status_code() {
        let err = SsoError::RealmRejected {
            url: "https://kc/auth/admin/realms".to_string(),
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.status_code(), Some(500));
        assert!(err.to_string().contains("HTTP 500"));

        let err = SsoError::MissingCredentials {
            secret: "keycloak-secret".to_string(),
            key: "SSO_PASSWORD".to_string(),
        };
        assert_eq!(err.status_code(), None);
        assert!(err.to_string().contains("SSO_PASSWORD"));
    }

    #[test]
    fn test_pki_error_display() {
        let err = PkiError::Verification("bad signature".to_string());
        assert_eq!(
            err.to_string(),
            "certificate verification failed: bad signature"
        );
    }
}
