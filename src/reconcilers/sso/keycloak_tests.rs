// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `keycloak`

#[cfg(test)]
mod tests {
    use crate::errors::SsoError;
    use crate::reconcilers::sso::keycloak::{
        KeycloakAdminClient, RealmConfigurator, RealmCreation, RealmRequest,
    };
    use crate::reconcilers::sso::realm::{realm_definition, RealmParameters};
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(base_url: &str) -> RealmRequest {
        RealmRequest {
            base_url: base_url.to_string(),
            username: "admin".to_string(),
            password: "s3cret".to_string(),
            trust_certificate: None,
            verify_tls: false,
            realm: realm_definition(&RealmParameters {
                platform_host: "argocd.apps.example.com".to_string(),
                client_secret: "client".to_string(),
                broker_client_id: "example-argocd-keycloak-broker".to_string(),
                broker_client_secret: "broker".to_string(),
                cluster_api_url: "https://api.example.com:6443".to_string(),
            }),
        }
    }

    async fn mount_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/auth/realms/master/protocol/openid-connect/token"))
            .and(body_string_contains("grant_type=password"))
            .and(body_string_contains("client_id=admin-cli"))
            .and(body_string_contains("username=admin"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "access_token": "tok" })),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_realm_created() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("POST"))
            .and(path("/auth/admin/realms"))
            .and(header("authorization", "Bearer tok"))
            .and(body_string_contains("\"realm\":\"argocd\""))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let result = KeycloakAdminClient::new()
            .create_realm(&request(&server.uri()))
            .await
            .unwrap();
        assert_eq!(result, RealmCreation::Created);
    }

    #[tokio::test]
    async fn test_existing_realm_is_success() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("POST"))
            .and(path("/auth/admin/realms"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let result = KeycloakAdminClient::new()
            .create_realm(&request(&format!("{}/", server.uri())))
            .await
            .unwrap();
        assert_eq!(result, RealmCreation::AlreadyExists);
    }

    #[tokio::test]
    async fn test_rejected_login_stops_before_realm_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/realms/master/protocol/openid-connect/token"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_grant"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/admin/realms"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let err = KeycloakAdminClient::new()
            .create_realm(&request(&server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, SsoError::TokenRejected { .. }));
        assert_eq!(err.status_code(), Some(401));
    }

    #[tokio::test]
    async fn test_rejected_realm_reports_status() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("POST"))
            .and(path("/auth/admin/realms"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = KeycloakAdminClient::new()
            .create_realm(&request(&server.uri()))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(500));
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_invalid_trust_certificate_is_rejected() {
        let mut req = request("https://keycloak.invalid");
        req.verify_tls = true;
        req.trust_certificate = Some("not a certificate".to_string());
        let err = KeycloakAdminClient::new().create_realm(&req).await.unwrap_err();
        assert!(matches!(
            err,
            SsoError::InvalidTrustCertificate(_) | SsoError::Transport(_)
        ));
    }

    #[test]
    fn test_realm_payload_shape() {
        let realm = request("http://unused").realm;
        let value = serde_json::to_value(&realm).unwrap();
        assert_eq!(value["sslRequired"], "external");
        assert_eq!(value["clients"][0]["clientId"], "argocd");
        assert_eq!(
            value["clients"][0]["redirectUris"][0],
            "https://argocd.apps.example.com/auth/callback"
        );
        assert_eq!(value["identityProviders"][0]["alias"], "openshift-v4");
        assert_eq!(
            value["identityProviders"][0]["config"]["baseUrl"],
            "https://api.example.com:6443"
        );
        assert_eq!(value["clientScopes"][0]["name"], "groups");
    }
}
