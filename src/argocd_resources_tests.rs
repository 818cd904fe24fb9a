// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `argocd_resources`

#[cfg(test)]
mod tests {
    use crate::argocd_resources::config::{
        build_argocd_cm, build_argocd_secret, build_known_hosts_cm, build_rbac_cm,
        ca_secret_name, SsoSettings,
    };
    use crate::argocd_resources::identity::{
        build_cluster_role_binding, build_role_binding, cluster_role_name, component_enabled,
        service_account_name,
    };
    use crate::argocd_resources::network::{
        build_grpc_ingress, build_server_hpa, build_server_route, build_server_service,
    };
    use crate::argocd_resources::sso::{
        build_keycloak_template_instance, build_oauth_client, oidc_config_yaml,
        realm_credentials_secret_name,
    };
    use crate::argocd_resources::workloads::{
        build_application_controller, build_dex_deployment, build_server_deployment,
    };
    use crate::argocd_resources::{
        build_labels, build_metadata, build_owner_references, grpc_host, repo_server_dns_names,
        server_dns_names, server_host,
    };
    use crate::cluster::fake::argocd;
    use crate::constants::{
        COMPONENT_APPLICATION_CONTROLLER, COMPONENT_DEX_SERVER, COMPONENT_SERVER,
        KEYCLOAK_CLIENT_SECRET_KEY, SERVER_SECRET_KEY,
    };
    use crate::crd::{ArgoCD, SsoProvider, SsoSpec};
    use crate::labels::{K8S_COMPONENT, K8S_MANAGED_BY, K8S_NAME, SERVING_CERT_ANNOTATION};
    use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

    fn instance() -> ArgoCD {
        argocd("example", "argocd")
    }

    fn with_provider(provider: SsoProvider) -> ArgoCD {
        let mut instance = instance();
        instance.spec.sso = Some(SsoSpec {
            provider: Some(provider),
            ..Default::default()
        });
        instance
    }

    #[test]
    fn test_build_labels() {
        let labels = build_labels(&instance(), COMPONENT_SERVER);
        assert_eq!(labels.get(K8S_NAME).unwrap(), "example-server");
        assert_eq!(labels.get(K8S_COMPONENT).unwrap(), "server");
        assert_eq!(labels.get(K8S_MANAGED_BY).unwrap(), "argocd-operator");
    }

    #[test]
    fn test_build_metadata_is_namespaced() {
        let meta = build_metadata(&instance(), "argocd-cm", "config");
        assert_eq!(meta.namespace.as_deref(), Some("argocd"));
        assert_eq!(meta.name.as_deref(), Some("argocd-cm"));
        assert!(meta.owner_references.is_none());
    }

    #[test]
    fn test_owner_reference_points_at_instance() {
        let refs = build_owner_references(&instance());
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, "ArgoCD");
        assert_eq!(refs[0].api_version, "argoproj.io/v1beta1");
        assert_eq!(refs[0].uid, "example-uid");
        assert_eq!(refs[0].controller, Some(true));
    }

    #[test]
    fn test_hosts_default_from_instance_name() {
        let instance = instance();
        assert_eq!(server_host(&instance), "example");
        assert_eq!(grpc_host(&instance), "example-grpc");
    }

    #[test]
    fn test_server_dns_names_include_enabled_endpoints() {
        let mut instance = instance();
        assert_eq!(
            server_dns_names(&instance, None),
            vec![
                "example-server".to_string(),
                "example-server.argocd.svc.cluster.local".to_string()
            ]
        );

        instance.spec.server.host = Some("argocd.example.com".into());
        instance.spec.server.ingress.enabled = true;
        instance.spec.server.grpc.ingress.enabled = true;
        let names = server_dns_names(&instance, Some("route.apps.example.com"));
        assert!(names.contains(&"argocd.example.com".to_string()));
        assert!(names.contains(&"example-grpc".to_string()));
        assert!(names.contains(&"route.apps.example.com".to_string()));
    }

    #[test]
    fn test_repo_server_dns_names() {
        assert_eq!(
            repo_server_dns_names(&instance()),
            vec![
                "example-repo-server".to_string(),
                "example-repo-server.argocd.svc.cluster.local".to_string()
            ]
        );
    }

    #[test]
    fn test_identity_names() {
        let instance = instance();
        assert_eq!(
            service_account_name(&instance, COMPONENT_SERVER),
            "example-argocd-server"
        );
        assert_eq!(
            cluster_role_name(&instance, COMPONENT_APPLICATION_CONTROLLER),
            "example-argocd-argocd-application-controller"
        );
    }

    #[test]
    fn test_dex_identity_follows_provider() {
        assert!(!component_enabled(&instance(), COMPONENT_DEX_SERVER));
        assert!(component_enabled(
            &with_provider(SsoProvider::Dex),
            COMPONENT_DEX_SERVER
        ));
        assert!(!component_enabled(
            &with_provider(SsoProvider::Keycloak),
            COMPONENT_DEX_SERVER
        ));
    }

    #[test]
    fn test_bindings_reference_matching_roles() {
        let instance = instance();
        let binding = build_role_binding(&instance, COMPONENT_SERVER);
        assert_eq!(binding.role_ref.kind, "Role");
        assert_eq!(binding.role_ref.name, "example-argocd-server");
        let subject = &binding.subjects.as_ref().unwrap()[0];
        assert_eq!(subject.namespace.as_deref(), Some("argocd"));

        let cluster_binding = build_cluster_role_binding(&instance, COMPONENT_SERVER);
        assert_eq!(cluster_binding.role_ref.kind, "ClusterRole");
        assert!(cluster_binding.metadata.namespace.is_none());
    }

    #[test]
    fn test_ca_secret_name_override() {
        let mut instance = instance();
        assert_eq!(ca_secret_name(&instance), "example-ca");
        instance.spec.tls.ca.secret_name = Some("corp-ca".into());
        assert_eq!(ca_secret_name(&instance), "corp-ca");
    }

    #[test]
    fn test_argocd_cm_defaults() {
        let cm = build_argocd_cm(&instance(), &SsoSettings::default(), "https://api");
        let data = cm.data.unwrap();
        assert_eq!(data.get("admin.enabled").unwrap(), "true");
        assert_eq!(data.get("url").unwrap(), "https://example");
        assert!(!data.contains_key("dex.config"));
        assert!(!data.contains_key("oidc.config"));
    }

    #[test]
    fn test_argocd_cm_generates_openshift_dex_config() {
        let mut instance = with_provider(SsoProvider::Dex);
        instance.spec.sso.as_mut().unwrap().dex.open_shift_oauth = true;
        let cm = build_argocd_cm(&instance, &SsoSettings::default(), "https://api.example:6443");
        let dex = cm.data.unwrap().remove("dex.config").unwrap();
        assert!(dex.contains("openshift"));
        assert!(dex.contains("system:serviceaccount:argocd:example-argocd-dex-server"));
        assert!(dex.contains("https://api.example:6443"));
    }

    #[test]
    fn test_argocd_cm_sso_overrides_spec_oidc_and_extra_config_wins() {
        let mut instance = instance();
        instance.spec.oidc_config = Some("from-spec".into());
        instance.spec.extra_config = Some([("url".to_string(), "https://custom".to_string())].into());
        let sso = SsoSettings {
            oidc_config: Some("from-keycloak".into()),
            ..Default::default()
        };
        let data = build_argocd_cm(&instance, &sso, "https://api").data.unwrap();
        assert_eq!(data.get("oidc.config").unwrap(), "from-keycloak");
        assert_eq!(data.get("url").unwrap(), "https://custom");
    }

    #[test]
    fn test_rbac_cm_scopes() {
        let instance = instance();
        let data = build_rbac_cm(&instance, &SsoSettings::default()).data.unwrap();
        assert_eq!(data.get("scopes").unwrap(), "[groups]");
        assert_eq!(data.get("policy.default").unwrap(), "role:readonly");

        let sso = SsoSettings {
            rbac_scopes: Some("[groups,email]".into()),
            ..Default::default()
        };
        let data = build_rbac_cm(&instance, &sso).data.unwrap();
        assert_eq!(data.get("scopes").unwrap(), "[groups,email]");
    }

    #[test]
    fn test_known_hosts_can_exclude_defaults() {
        let mut instance = instance();
        instance.spec.initial_ssh_known_hosts.exclude_default_hosts = true;
        instance.spec.initial_ssh_known_hosts.keys = Some("git.example.com ssh-rsa AAAA".into());
        let data = build_known_hosts_cm(&instance).data.unwrap();
        assert_eq!(
            data.get("ssh_known_hosts").unwrap(),
            "git.example.com ssh-rsa AAAA\n"
        );
    }

    #[test]
    fn test_argocd_secret_carries_tls_and_client_secret() {
        let sso = SsoSettings {
            keycloak_client_secret: Some("s3cret".into()),
            ..Default::default()
        };
        let secret = build_argocd_secret(&instance(), "key", Some((b"cert", b"pk")), &sso);
        let data = secret.data.unwrap();
        assert_eq!(data.get(SERVER_SECRET_KEY).unwrap().0, b"key");
        assert_eq!(data.get("tls.crt").unwrap().0, b"cert");
        assert_eq!(data.get(KEYCLOAK_CLIENT_SECRET_KEY).unwrap().0, b"s3cret");
    }

    #[test]
    fn test_server_service_targets_http_port() {
        let service = build_server_service(&instance());
        let ports = service.spec.unwrap().ports.unwrap();
        assert_eq!(ports.len(), 2);
        assert!(ports
            .iter()
            .all(|p| p.target_port == Some(IntOrString::Int(8080))));
    }

    #[test]
    fn test_grpc_ingress_uses_grpc_backend_protocol() {
        let ingress = build_grpc_ingress(&instance());
        let annotations = ingress.metadata.annotations.unwrap();
        assert_eq!(
            annotations
                .get("nginx.ingress.kubernetes.io/backend-protocol")
                .unwrap(),
            "GRPC"
        );
        let rules = ingress.spec.unwrap().rules.unwrap();
        assert_eq!(rules[0].host.as_deref(), Some("example-grpc"));
    }

    #[test]
    fn test_route_termination_follows_insecure() {
        let mut instance = instance();
        let route = build_server_route(&instance);
        assert_eq!(route.spec.tls.unwrap().termination, "passthrough");

        instance.spec.server.insecure = true;
        let route = build_server_route(&instance);
        assert_eq!(route.spec.tls.unwrap().termination, "edge");
    }

    #[test]
    fn test_hpa_defaults() {
        let hpa = build_server_hpa(&instance());
        let spec = hpa.spec.unwrap();
        assert_eq!(spec.min_replicas, Some(1));
        assert_eq!(spec.max_replicas, 3);
        assert_eq!(spec.scale_target_ref.name, "example-server");
    }

    #[test]
    fn test_server_replicas_omitted_under_autoscale() {
        let mut instance = instance();
        instance.spec.server.replicas = Some(2);
        assert_eq!(
            build_server_deployment(&instance).spec.unwrap().replicas,
            Some(2)
        );

        instance.spec.server.autoscale.enabled = true;
        assert_eq!(build_server_deployment(&instance).spec.unwrap().replicas, None);
    }

    #[test]
    fn test_server_points_at_dex_only_when_enabled() {
        let args = |instance: &ArgoCD| {
            build_server_deployment(instance).spec.unwrap().template.spec.unwrap().containers[0]
                .command
                .clone()
                .unwrap()
        };
        assert!(!args(&instance()).contains(&"--dex-server".to_string()));
        assert!(args(&with_provider(SsoProvider::Dex)).contains(&"--dex-server".to_string()));
    }

    #[test]
    fn test_dex_deployment_has_copy_init_container() {
        let deployment = build_dex_deployment(&with_provider(SsoProvider::Dex));
        let pod = deployment.spec.unwrap().template.spec.unwrap();
        assert_eq!(pod.init_containers.unwrap()[0].name, "copyutil");
        assert_eq!(
            pod.service_account_name.as_deref(),
            Some("example-argocd-dex-server")
        );
    }

    #[test]
    fn test_application_controller_processors() {
        let mut instance = instance();
        instance.spec.controller.processors.operation = Some(3);
        let statefulset = build_application_controller(&instance);
        let command = statefulset.spec.unwrap().template.spec.unwrap().containers[0]
            .command
            .clone()
            .unwrap();
        let index = command
            .iter()
            .position(|a| a == "--operation-processors")
            .unwrap();
        assert_eq!(command[index + 1], "3");
    }

    #[test]
    fn test_keycloak_template_instance_objects() {
        let template_instance = build_keycloak_template_instance(&with_provider(SsoProvider::Keycloak));
        assert_eq!(template_instance.metadata.name.as_deref(), Some("rhsso"));
        let objects = &template_instance.spec.template.objects;
        let kinds: Vec<&str> = objects.iter().filter_map(|o| o["kind"].as_str()).collect();
        assert_eq!(kinds, vec!["Secret", "Service", "Route", "DeploymentConfig"]);
        assert_eq!(
            objects[1]["metadata"]["annotations"][SERVING_CERT_ANNOTATION],
            "sso-x509-https-secret"
        );
        assert_eq!(objects[2]["spec"]["tls"]["termination"], "reencrypt");
        assert_eq!(template_instance.spec.template.parameters.len(), 2);
    }

    #[test]
    fn test_oauth_client_name_is_unique_per_instance() {
        let a = build_oauth_client(&argocd("argocd", "team-a"), "a", "kc-a.example.com");
        let b = build_oauth_client(&argocd("argocd", "team-b"), "b", "kc-b.example.com");
        assert_ne!(a.metadata.name, b.metadata.name);
    }

    #[test]
    fn test_oauth_client_redirects_to_broker() {
        let client = build_oauth_client(&instance(), "broker-secret", "keycloak.apps.example.com");
        assert_eq!(
            client.metadata.name.as_deref(),
            Some("example-argocd-keycloak-broker")
        );
        assert_eq!(client.kind, "OAuthClient");
        assert_eq!(
            client.redirect_uris,
            vec![
                "https://keycloak.apps.example.com/auth/realms/argocd/broker/openshift-v4/endpoint"
                    .to_string()
            ]
        );
        assert_eq!(client.grant_method.as_deref(), Some("prompt"));
    }

    #[test]
    fn test_oidc_config_root_ca_optional() {
        let without = oidc_config_yaml("kc.example.com", None);
        assert!(without.contains("https://kc.example.com/auth/realms/argocd"));
        assert!(without.contains("$oidc.keycloak.clientSecret"));
        assert!(!without.contains("rootCA"));

        let with = oidc_config_yaml("kc.example.com", Some("-----BEGIN CERTIFICATE-----"));
        assert!(with.contains("rootCA"));
    }

    #[test]
    fn test_realm_credentials_secret_name() {
        assert_eq!(
            realm_credentials_secret_name(&instance()),
            "example-keycloak-realm"
        );
    }
}
