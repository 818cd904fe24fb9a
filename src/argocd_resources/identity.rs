// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Service accounts, roles and role bindings for Argo CD components.
//!
//! Each component runs under its own service account `<name>-argocd-<component>`
//! with a namespaced role of the same name. The application controller and the
//! server additionally get cluster roles named `<name>-<namespace>-argocd-<component>`
//! when the namespace is on the cluster-config allow-list.

use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{
    ClusterRole, ClusterRoleBinding, PolicyRule, Role, RoleBinding, RoleRef, Subject,
};

use super::{build_cluster_metadata, build_metadata, instance_namespace};
use crate::constants::{
    COMPONENT_APPLICATION_CONTROLLER, COMPONENT_DEX_SERVER, COMPONENT_REDIS, COMPONENT_SERVER,
};
use crate::crd::ArgoCD;
use kube::ResourceExt;

const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";

/// Components that run under a dedicated service account.
pub const IDENTITY_COMPONENTS: [&str; 4] = [
    COMPONENT_APPLICATION_CONTROLLER,
    COMPONENT_SERVER,
    COMPONENT_DEX_SERVER,
    COMPONENT_REDIS,
];

/// Components that may hold cluster-wide permissions.
pub const CLUSTER_COMPONENTS: [&str; 2] = [COMPONENT_APPLICATION_CONTROLLER, COMPONENT_SERVER];

/// `<name>-argocd-<component>`
#[must_use]
pub fn service_account_name(instance: &ArgoCD, component: &str) -> String {
    format!("{}-argocd-{component}", instance.name_any())
}

/// `<name>-<namespace>-argocd-<component>`
#[must_use]
pub fn cluster_role_name(instance: &ArgoCD, component: &str) -> String {
    format!(
        "{}-{}-argocd-{component}",
        instance.name_any(),
        instance_namespace(instance)
    )
}

/// Whether the identity objects of `component` are wanted for this instance.
#[must_use]
pub fn component_enabled(instance: &ArgoCD, component: &str) -> bool {
    match component {
        COMPONENT_DEX_SERVER => instance.spec.dex_enabled(),
        _ => true,
    }
}

fn rule(api_groups: &[&str], resources: &[&str], verbs: &[&str]) -> PolicyRule {
    PolicyRule {
        api_groups: Some(api_groups.iter().map(|s| (*s).to_string()).collect()),
        resources: Some(resources.iter().map(|s| (*s).to_string()).collect()),
        verbs: verbs.iter().map(|s| (*s).to_string()).collect(),
        ..Default::default()
    }
}

/// Namespaced permissions per component.
#[must_use]
pub fn policy_rules(component: &str) -> Vec<PolicyRule> {
    match component {
        COMPONENT_APPLICATION_CONTROLLER => vec![rule(&["*"], &["*"], &["*"])],
        COMPONENT_SERVER => vec![
            rule(&["*"], &["*"], &["get", "list", "watch", "patch", "delete"]),
            rule(
                &[""],
                &["secrets", "configmaps"],
                &["create", "get", "list", "watch", "update", "patch", "delete"],
            ),
            rule(
                &["argoproj.io"],
                &["applications", "appprojects", "applicationsets"],
                &["create", "get", "list", "watch", "update", "delete", "patch"],
            ),
            rule(&[""], &["events"], &["create", "list"]),
        ],
        COMPONENT_DEX_SERVER => vec![rule(&[""], &["secrets", "configmaps"], &["get", "list", "watch"])],
        COMPONENT_REDIS => vec![PolicyRule {
            api_groups: Some(vec!["security.openshift.io".to_string()]),
            resources: Some(vec!["securitycontextconstraints".to_string()]),
            resource_names: Some(vec!["restricted".to_string()]),
            verbs: vec!["use".to_string()],
            ..Default::default()
        }],
        _ => Vec::new(),
    }
}

/// Cluster-wide permissions per component.
#[must_use]
pub fn cluster_policy_rules(component: &str) -> Vec<PolicyRule> {
    match component {
        COMPONENT_APPLICATION_CONTROLLER => vec![
            rule(&["*"], &["*"], &["*"]),
            PolicyRule {
                non_resource_urls: Some(vec!["*".to_string()]),
                verbs: vec!["*".to_string()],
                ..Default::default()
            },
        ],
        COMPONENT_SERVER => vec![
            rule(&["*"], &["*"], &["get", "list", "watch", "patch", "delete"]),
            rule(&[""], &["events"], &["list"]),
            rule(
                &["argoproj.io"],
                &["applications", "applicationsets"],
                &["create", "get", "list", "watch", "update", "delete", "patch"],
            ),
        ],
        _ => Vec::new(),
    }
}

fn service_account_subject(instance: &ArgoCD, component: &str) -> Subject {
    Subject {
        kind: "ServiceAccount".to_string(),
        name: service_account_name(instance, component),
        namespace: Some(instance_namespace(instance)),
        ..Default::default()
    }
}

#[must_use]
pub fn build_service_account(instance: &ArgoCD, component: &str) -> ServiceAccount {
    ServiceAccount {
        metadata: build_metadata(instance, &service_account_name(instance, component), component),
        ..Default::default()
    }
}

#[must_use]
pub fn build_role(instance: &ArgoCD, component: &str) -> Role {
    Role {
        metadata: build_metadata(instance, &service_account_name(instance, component), component),
        rules: Some(policy_rules(component)),
    }
}

#[must_use]
pub fn build_role_binding(instance: &ArgoCD, component: &str) -> RoleBinding {
    let name = service_account_name(instance, component);
    RoleBinding {
        metadata: build_metadata(instance, &name, component),
        role_ref: RoleRef {
            api_group: RBAC_API_GROUP.to_string(),
            kind: "Role".to_string(),
            name,
        },
        subjects: Some(vec![service_account_subject(instance, component)]),
    }
}

#[must_use]
pub fn build_cluster_role(instance: &ArgoCD, component: &str) -> ClusterRole {
    ClusterRole {
        metadata: build_cluster_metadata(instance, &cluster_role_name(instance, component), component),
        rules: Some(cluster_policy_rules(component)),
        ..Default::default()
    }
}

#[must_use]
pub fn build_cluster_role_binding(instance: &ArgoCD, component: &str) -> ClusterRoleBinding {
    let name = cluster_role_name(instance, component);
    ClusterRoleBinding {
        metadata: build_cluster_metadata(instance, &name, component),
        role_ref: RoleRef {
            api_group: RBAC_API_GROUP.to_string(),
            kind: "ClusterRole".to_string(),
            name,
        },
        subjects: Some(vec![service_account_subject(instance, component)]),
    }
}
