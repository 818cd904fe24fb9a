// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the Argo CD operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for the `ArgoCD` CRD
pub const API_GROUP: &str = "argoproj.io";

/// API version for the `ArgoCD` CRD
pub const API_VERSION: &str = "v1beta1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "argoproj.io/v1beta1";

/// Kind name for `ArgoCD` resource
pub const KIND_ARGOCD: &str = "ArgoCD";

/// API group that signals the template-instantiation capability
pub const TEMPLATE_API_GROUP: &str = "template.openshift.io";

/// API group that signals the route capability
pub const ROUTE_API_GROUP: &str = "route.openshift.io";

// ============================================================================
// Component Names
// ============================================================================

/// Suffix for the application controller workload and identity
pub const COMPONENT_APPLICATION_CONTROLLER: &str = "application-controller";

/// Suffix for the API/UI server
pub const COMPONENT_SERVER: &str = "server";

/// Suffix for the repository server
pub const COMPONENT_REPO_SERVER: &str = "repo-server";

/// Suffix for the redis cache
pub const COMPONENT_REDIS: &str = "redis";

/// Suffix for the dex OIDC server
pub const COMPONENT_DEX_SERVER: &str = "dex-server";

// ============================================================================
// Fixed Object Names
// ============================================================================

/// Main Argo CD configuration map
pub const ARGOCD_CM_NAME: &str = "argocd-cm";

/// RBAC policy configuration map
pub const ARGOCD_RBAC_CM_NAME: &str = "argocd-rbac-cm";

/// SSH known hosts configuration map
pub const ARGOCD_KNOWN_HOSTS_CM_NAME: &str = "argocd-ssh-known-hosts-cm";

/// TLS certificates configuration map
pub const ARGOCD_TLS_CERTS_CM_NAME: &str = "argocd-tls-certs-cm";

/// GPG keys configuration map
pub const ARGOCD_GPG_KEYS_CM_NAME: &str = "argocd-gpg-keys-cm";

/// Main credential store consumed by every Argo CD component
pub const ARGOCD_SECRET_NAME: &str = "argocd-secret";

/// Repo server mTLS leaf secret
pub const ARGOCD_REPO_SERVER_TLS_SECRET_NAME: &str = "argocd-repo-server-tls";

// ============================================================================
// Secret Keys
// ============================================================================

/// Certificate key in TLS secrets
pub const TLS_CERT_KEY: &str = "tls.crt";

/// Private key in TLS secrets
pub const TLS_PRIVATE_KEY: &str = "tls.key";

/// CA certificate key in the public CA config map
pub const CA_CERT_KEY: &str = "ca.crt";

/// Generated admin password in the cluster secret
pub const ADMIN_PASSWORD_KEY: &str = "admin.password";

/// Server session signing key in `argocd-secret`
pub const SERVER_SECRET_KEY: &str = "server.secretkey";

/// Keycloak OIDC client secret in `argocd-secret`
pub const KEYCLOAK_CLIENT_SECRET_KEY: &str = "oidc.keycloak.clientSecret";

/// Secret type for TLS material
pub const SECRET_TYPE_TLS: &str = "kubernetes.io/tls";

/// Secret type for opaque data
pub const SECRET_TYPE_OPAQUE: &str = "Opaque";

// ============================================================================
// Images and Versions
// ============================================================================

/// Default Argo CD image
pub const DEFAULT_ARGOCD_IMAGE: &str = "quay.io/argoproj/argocd";

/// Default Argo CD version
pub const DEFAULT_ARGOCD_VERSION: &str = "v2.13.1";

/// Default redis image
pub const DEFAULT_REDIS_IMAGE: &str = "docker.io/library/redis";

/// Default redis version
pub const DEFAULT_REDIS_VERSION: &str = "7.0.15-alpine";

/// Default dex image
pub const DEFAULT_DEX_IMAGE: &str = "ghcr.io/dexidp/dex";

/// Default dex version
pub const DEFAULT_DEX_VERSION: &str = "v2.41.1";

/// Default keycloak (RH-SSO) image
pub const DEFAULT_KEYCLOAK_IMAGE: &str = "registry.redhat.io/rh-sso-7/sso76-openshift-rhel8";

/// Default keycloak version
pub const DEFAULT_KEYCLOAK_VERSION: &str = "7.6";

// ============================================================================
// Ports
// ============================================================================

/// Argo CD server HTTP port
pub const SERVER_HTTP_PORT: i32 = 8080;

/// Argo CD server HTTPS port exposed by the service
pub const SERVER_HTTPS_PORT: i32 = 443;

/// Argo CD server metrics port
pub const SERVER_METRICS_PORT: i32 = 8083;

/// Repo server gRPC port
pub const REPO_SERVER_PORT: i32 = 8081;

/// Repo server metrics port
pub const REPO_SERVER_METRICS_PORT: i32 = 8084;

/// Application controller metrics port
pub const CONTROLLER_METRICS_PORT: i32 = 8082;

/// Redis port
pub const REDIS_PORT: i32 = 6379;

/// Dex HTTP port
pub const DEX_HTTP_PORT: i32 = 5556;

/// Dex gRPC port
pub const DEX_GRPC_PORT: i32 = 5557;

/// Keycloak HTTPS port
pub const KEYCLOAK_HTTPS_PORT: i32 = 8443;

// ============================================================================
// Certificate Authority Constants
// ============================================================================

/// Validity period for the instance root certificate (10 years)
pub const CA_VALIDITY_YEARS: i64 = 10;

/// Validity period for leaf certificates (1 year)
pub const LEAF_VALIDITY_YEARS: i64 = 1;

/// Common name for root certificates issued by the operator
pub const CA_COMMON_NAME: &str = "argocd-operator";

/// Cluster-local DNS suffix for service names
pub const CLUSTER_DOMAIN_SUFFIX: &str = "svc.cluster.local";

// ============================================================================
// SSO Constants
// ============================================================================

/// TemplateInstance name for the keycloak broker
pub const KEYCLOAK_TEMPLATE_INSTANCE_NAME: &str = "rhsso";

/// DeploymentConfig, Service and Route name of the keycloak broker
pub const KEYCLOAK_NAME: &str = "keycloak";

/// Generated admin credentials of the keycloak broker
pub const KEYCLOAK_ADMIN_SECRET_NAME: &str = "keycloak-secret";

/// Serving certificate issued by the platform for the keycloak service
pub const KEYCLOAK_SERVING_CERT_SECRET_NAME: &str = "sso-x509-https-secret";

/// Admin username key in the keycloak admin secret
pub const KEYCLOAK_ADMIN_USERNAME_KEY: &str = "SSO_USERNAME";

/// Admin password key in the keycloak admin secret
pub const KEYCLOAK_ADMIN_PASSWORD_KEY: &str = "SSO_PASSWORD";

/// Realm created for Argo CD
pub const KEYCLOAK_REALM: &str = "argocd";

/// OIDC client registered for Argo CD inside the realm
pub const KEYCLOAK_ARGOCD_CLIENT_ID: &str = "argocd";

/// Suffix of the OAuth client registered with the platform for the keycloak broker
pub const KEYCLOAK_BROKER_CLIENT_ID: &str = "keycloak-broker";

/// Identity provider alias inside the realm
pub const KEYCLOAK_IDENTITY_PROVIDER: &str = "openshift-v4";

/// Key for the Argo CD client secret in the realm credentials secret
pub const REALM_CLIENT_SECRET_KEY: &str = "clientSecret";

/// Key for the broker client secret in the realm credentials secret
pub const REALM_BROKER_CLIENT_SECRET_KEY: &str = "brokerClientSecret";

/// Length of generated client secrets and passwords
pub const GENERATED_SECRET_LENGTH: usize = 32;

// ============================================================================
// Controller Requeue Constants
// ============================================================================

/// Requeue interval once an instance is available and settled (5 minutes)
pub const REQUEUE_READY_SECS: u64 = 300;

/// Requeue interval while an instance is still converging (30 seconds)
pub const REQUEUE_PENDING_SECS: u64 = 30;

/// Requeue duration for controller errors (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Field manager name used for status patches
pub const FIELD_MANAGER: &str = "argocd-operator";

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Default bind address for the metrics and probe server
pub const DEFAULT_METRICS_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Default API server URL handed to the broker identity provider
pub const DEFAULT_CLUSTER_API_URL: &str = "https://kubernetes.default.svc";
