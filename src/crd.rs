// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for Argo CD instance management.
//!
//! This module defines the [`ArgoCD`] custom resource, which declares one Argo CD
//! installation, plus typed views of the OpenShift resources the operator creates
//! or reads when the platform offers them.
//!
//! # Resource Types
//!
//! ## Owned by this operator
//!
//! - [`ArgoCD`] - One Argo CD instance (server, repo server, controller, redis, SSO)
//!
//! ## Platform resources (OpenShift)
//!
//! - [`Route`] - External HTTP(S) endpoint (`route.openshift.io/v1`)
//! - [`TemplateInstance`] - Instantiated template (`template.openshift.io/v1`)
//! - [`DeploymentConfig`] - Legacy workload used by the keycloak template (`apps.openshift.io/v1`)
//! - [`OAuthClient`] - Cluster OAuth client registration (`oauth.openshift.io/v1`)
//!
//! # Example: Declaring an instance with keycloak SSO
//!
//! ```rust,no_run
//! use argocd_operator::crd::{ArgoCDSpec, SsoProvider, SsoSpec};
//!
//! let spec = ArgoCDSpec {
//!     sso: Some(SsoSpec {
//!         provider: Some(SsoProvider::Keycloak),
//!         ..Default::default()
//!     }),
//!     ..Default::default()
//! };
//! assert!(spec.keycloak_requested());
//! ```

use k8s_openapi::api::core::v1::{ResourceRequirements, Toleration};
use k8s_openapi::api::networking::v1::IngressTLS;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::constants::{
    DEFAULT_ARGOCD_IMAGE, DEFAULT_ARGOCD_VERSION, DEFAULT_DEX_IMAGE, DEFAULT_DEX_VERSION,
    DEFAULT_KEYCLOAK_IMAGE, DEFAULT_KEYCLOAK_VERSION, DEFAULT_REDIS_IMAGE, DEFAULT_REDIS_VERSION,
};

// ============================================================================
// ArgoCD
// ============================================================================

/// Desired state of one Argo CD installation.
///
/// Every field is optional; the operator fills in defaults so that an empty
/// `spec: {}` yields a working single-replica installation.
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "argoproj.io",
    version = "v1beta1",
    kind = "ArgoCD",
    namespaced,
    shortname = "argocd",
    doc = "ArgoCD declares one Argo CD installation. The operator derives the workloads, services, secrets, certificates and SSO integration from it and keeps them converged."
)]
#[kube(status = "ArgoCDStatus")]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDSpec {
    /// Container image for the server, repo server and application controller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Image tag for the server, repo server and application controller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// API/UI server settings.
    #[serde(default)]
    pub server: ServerSpec,

    /// Repository server settings.
    #[serde(default)]
    pub repo: RepoSpec,

    /// Application controller settings.
    #[serde(default)]
    pub controller: ControllerSpec,

    /// Redis cache settings.
    #[serde(default)]
    pub redis: RedisSpec,

    /// Single sign-on provider selection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sso: Option<SsoSpec>,

    /// RBAC policy written to `argocd-rbac-cm`.
    #[serde(default)]
    pub rbac: RbacSpec,

    /// Certificate authority settings.
    #[serde(default)]
    pub tls: TlsSpec,

    /// Label key Argo CD uses to track application resources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_instance_label_key: Option<String>,

    /// Enables application status badges.
    #[serde(default)]
    pub status_badge_enabled: bool,

    /// Enables anonymous read access.
    #[serde(default)]
    pub users_anonymous_enabled: bool,

    /// Disables the built-in admin user.
    #[serde(default)]
    pub disable_admin: bool,

    /// Raw OIDC configuration. Ignored while keycloak SSO is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oidc_config: Option<String>,

    /// Additional `argocd-cm` entries, merged last.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_config: Option<BTreeMap<String, String>>,

    /// Initial SSH known hosts.
    #[serde(default, rename = "initialSSHKnownHosts")]
    pub initial_ssh_known_hosts: SshHostsSpec,

    /// Node selector and tolerations applied to every workload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_placement: Option<NodePlacementSpec>,
}

impl ArgoCDSpec {
    /// Core image reference (`image:version`) for server, repo server and controller.
    #[must_use]
    pub fn argocd_image(&self) -> String {
        image_ref(
            self.image.as_deref(),
            self.version.as_deref(),
            DEFAULT_ARGOCD_IMAGE,
            DEFAULT_ARGOCD_VERSION,
        )
    }

    /// Returns the configured SSO provider, if any.
    #[must_use]
    pub fn sso_provider(&self) -> Option<SsoProvider> {
        self.sso.as_ref().and_then(|sso| sso.provider)
    }

    /// True when the dex provider is selected.
    #[must_use]
    pub fn dex_enabled(&self) -> bool {
        self.sso_provider() == Some(SsoProvider::Dex)
    }

    /// True when the keycloak provider is selected.
    #[must_use]
    pub fn keycloak_requested(&self) -> bool {
        self.sso_provider() == Some(SsoProvider::Keycloak)
    }

    /// Keycloak settings, or defaults when none are declared.
    #[must_use]
    pub fn keycloak(&self) -> Cow<'_, KeycloakSpec> {
        match &self.sso {
            Some(sso) => Cow::Borrowed(&sso.keycloak),
            None => Cow::Owned(KeycloakSpec::default()),
        }
    }

    /// Dex settings, or defaults when none are declared.
    #[must_use]
    pub fn dex(&self) -> Cow<'_, DexSpec> {
        match &self.sso {
            Some(sso) => Cow::Borrowed(&sso.dex),
            None => Cow::Owned(DexSpec::default()),
        }
    }
}

/// Builds `image:tag` from optional overrides.
fn image_ref(image: Option<&str>, version: Option<&str>, image_default: &str, version_default: &str) -> String {
    let image = image.filter(|i| !i.is_empty()).unwrap_or(image_default);
    let version = version.filter(|v| !v.is_empty()).unwrap_or(version_default);
    // Digests are appended with '@', tags with ':'
    if version.starts_with("sha256:") {
        format!("{image}@{version}")
    } else {
        format!("{image}:{version}")
    }
}

/// API/UI server settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerSpec {
    /// Replica count. Ignored while autoscaling is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    /// Serve plain HTTP (TLS terminated upstream).
    #[serde(default)]
    pub insecure: bool,

    /// External hostname for ingress and routes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Service type for `<name>-server`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,

    /// Container resources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,

    /// Horizontal autoscaling.
    #[serde(default)]
    pub autoscale: AutoscaleSpec,

    /// HTTP ingress.
    #[serde(default)]
    pub ingress: IngressSpec,

    /// gRPC endpoint used by the CLI.
    #[serde(default)]
    pub grpc: GrpcSpec,

    /// OpenShift route.
    #[serde(default)]
    pub route: ServerRouteSpec,
}

/// Horizontal autoscaling settings for the server.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AutoscaleSpec {
    #[serde(default)]
    pub enabled: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_replicas: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_replicas: Option<i32>,

    #[serde(
        rename = "targetCPUUtilizationPercentage",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_cpu_utilization_percentage: Option<i32>,
}

/// Ingress settings shared by the HTTP and gRPC endpoints.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IngressSpec {
    #[serde(default)]
    pub enabled: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingress_class_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,

    /// HTTP path, defaults to `/`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<Vec<IngressTLS>>,
}

/// gRPC endpoint settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GrpcSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default)]
    pub ingress: IngressSpec,
}

/// OpenShift route settings for the server.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerRouteSpec {
    #[serde(default)]
    pub enabled: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
}

/// Repository server settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RepoSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
}

/// Application controller settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ControllerSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,

    #[serde(default)]
    pub processors: ProcessorsSpec,
}

/// Application controller processor counts.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorsSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
}

/// Redis cache settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RedisSpec {
    /// Defaults to `true`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
}

impl RedisSpec {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    #[must_use]
    pub fn image_ref(&self) -> String {
        image_ref(
            self.image.as_deref(),
            self.version.as_deref(),
            DEFAULT_REDIS_IMAGE,
            DEFAULT_REDIS_VERSION,
        )
    }
}

/// Supported single sign-on providers.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SsoProvider {
    Dex,
    Keycloak,
}

/// Single sign-on settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SsoSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<SsoProvider>,

    #[serde(default)]
    pub dex: DexSpec,

    #[serde(default)]
    pub keycloak: KeycloakSpec,
}

/// Dex settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DexSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Configure dex with the OpenShift OAuth connector.
    #[serde(default, rename = "openShiftOAuth")]
    pub open_shift_oauth: bool,

    /// Raw `dex.config` YAML.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
}

impl DexSpec {
    #[must_use]
    pub fn image_ref(&self) -> String {
        image_ref(
            self.image.as_deref(),
            self.version.as_deref(),
            DEFAULT_DEX_IMAGE,
            DEFAULT_DEX_VERSION,
        )
    }
}

/// Keycloak broker settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeycloakSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// PEM root CA for the broker, overriding the platform-issued serving certificate.
    #[serde(rename = "rootCA", skip_serializing_if = "Option::is_none")]
    pub root_ca: Option<String>,

    /// Verify the broker's TLS certificate. Defaults to `true`.
    #[serde(rename = "verifyTLS", skip_serializing_if = "Option::is_none")]
    pub verify_tls: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
}

impl KeycloakSpec {
    #[must_use]
    pub fn verify_tls(&self) -> bool {
        self.verify_tls.unwrap_or(true)
    }

    #[must_use]
    pub fn image_ref(&self) -> String {
        image_ref(
            self.image.as_deref(),
            self.version.as_deref(),
            DEFAULT_KEYCLOAK_IMAGE,
            DEFAULT_KEYCLOAK_VERSION,
        )
    }
}

/// RBAC settings for `argocd-rbac-cm`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RbacSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_policy: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,

    /// OIDC scopes consulted for group membership, e.g. `[groups]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scopes: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_matcher_mode: Option<String>,
}

/// Certificate authority settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TlsSpec {
    #[serde(default)]
    pub ca: CaSpec,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaSpec {
    /// Authority secret name. Defaults to `<name>-ca`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
}

/// SSH known hosts settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SshHostsSpec {
    #[serde(default)]
    pub exclude_default_hosts: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<String>,
}

/// Placement applied to every workload.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodePlacementSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_selector: Option<BTreeMap<String, String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerations: Option<Vec<Toleration>>,
}

/// Readiness of one component.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum ComponentPhase {
    #[default]
    Unknown,
    Pending,
    Running,
}

/// Aggregate readiness of an instance.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum InstancePhase {
    #[default]
    Pending,
    Available,
}

/// Observed state of an [`ArgoCD`] instance.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDStatus {
    #[serde(default)]
    pub phase: InstancePhase,

    #[serde(default)]
    pub application_controller: ComponentPhase,

    #[serde(default)]
    pub server: ComponentPhase,

    #[serde(default)]
    pub repo: ComponentPhase,

    #[serde(default)]
    pub redis: ComponentPhase,

    #[serde(default)]
    pub sso: ComponentPhase,

    /// External host of the server, or its cluster-local name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

// ============================================================================
// OpenShift platform resources
// ============================================================================

/// OpenShift route (`route.openshift.io/v1`).
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[kube(
    group = "route.openshift.io",
    version = "v1",
    kind = "Route",
    namespaced,
    schema = "disabled"
)]
#[kube(status = "RouteStatus")]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    pub to: RouteTargetReference,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<RoutePort>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<RouteTlsConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub wildcard_policy: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteTargetReference {
    pub kind: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<i32>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoutePort {
    pub target_port: IntOrString,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteTlsConfig {
    /// `edge`, `passthrough` or `reencrypt`.
    pub termination: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub insecure_edge_termination_policy: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteStatus {
    #[serde(default)]
    pub ingress: Vec<RouteIngress>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteIngress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl Route {
    /// Host the router admitted, falling back to the requested host.
    #[must_use]
    pub fn admitted_host(&self) -> Option<String> {
        self.status
            .as_ref()
            .and_then(|s| s.ingress.iter().find_map(|i| i.host.clone()))
            .or_else(|| self.spec.host.clone())
            .filter(|h| !h.is_empty())
    }
}

/// OpenShift template instantiation (`template.openshift.io/v1`).
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[kube(
    group = "template.openshift.io",
    version = "v1",
    kind = "TemplateInstance",
    namespaced,
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct TemplateInstanceSpec {
    pub template: Template,
}

/// Inline template carried by a [`TemplateInstance`].
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    #[serde(default)]
    pub metadata: ObjectMeta,

    /// Raw object manifests; `${PARAM}` references are expanded by the platform.
    #[serde(default)]
    pub objects: Vec<serde_json::Value>,

    #[serde(default)]
    pub parameters: Vec<TemplateParameter>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateParameter {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Generator expression, e.g. `[a-zA-Z0-9]{8}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub generate: Option<String>,
}

/// OpenShift deployment config (`apps.openshift.io/v1`). Only the fields
/// needed to judge readiness are modelled; the rest round-trips untouched
/// because the operator never replaces it.
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[kube(
    group = "apps.openshift.io",
    version = "v1",
    kind = "DeploymentConfig",
    namespaced,
    schema = "disabled"
)]
#[kube(status = "DeploymentConfigStatus")]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfigSpec {
    #[serde(default)]
    pub replicas: i32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfigStatus {
    #[serde(default)]
    pub available_replicas: i32,

    #[serde(default)]
    pub ready_replicas: i32,
}

/// OpenShift OAuth client (`oauth.openshift.io/v1`), cluster-scoped.
///
/// The type has no `spec`: its fields sit at the top level of the object, so it
/// implements [`kube::Resource`] by hand instead of deriving a custom resource.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct OAuthClient {
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    pub kind: String,

    pub metadata: ObjectMeta,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    #[serde(rename = "redirectURIs", default, skip_serializing_if = "Vec::is_empty")]
    pub redirect_uris: Vec<String>,

    /// `auto` or `prompt`.
    #[serde(rename = "grantMethod", skip_serializing_if = "Option::is_none")]
    pub grant_method: Option<String>,
}

impl OAuthClient {
    /// Creates an empty client registration with type information filled in.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            api_version: "oauth.openshift.io/v1".to_string(),
            kind: "OAuthClient".to_string(),
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

impl kube::Resource for OAuthClient {
    type DynamicType = ();
    type Scope = k8s_openapi::ClusterResourceScope;

    fn kind(_: &()) -> Cow<'_, str> {
        Cow::Borrowed("OAuthClient")
    }

    fn group(_: &()) -> Cow<'_, str> {
        Cow::Borrowed("oauth.openshift.io")
    }

    fn version(_: &()) -> Cow<'_, str> {
        Cow::Borrowed("v1")
    }

    fn plural(_: &()) -> Cow<'_, str> {
        Cow::Borrowed("oauthclients")
    }

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}
