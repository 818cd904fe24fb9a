// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Argo CD Kubernetes resource builders
//!
//! This module provides functions to build every object an [`ArgoCD`] instance
//! owns. All functions are pure: they read the instance and return the desired
//! object, leaving fetch/diff/write to the convergence engine.
//!
//! # Submodules
//!
//! - [`identity`] - Service accounts, roles and bindings
//! - [`config`] - Config maps and secrets
//! - [`network`] - Services, ingresses, routes and the autoscaler
//! - [`workloads`] - Deployments and the application controller stateful set
//! - [`sso`] - Keycloak broker template and OAuth client

pub mod config;
pub mod identity;
pub mod network;
pub mod sso;
pub mod workloads;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::ResourceExt;
use std::collections::BTreeMap;

use crate::constants::{
    API_GROUP_VERSION, CLUSTER_DOMAIN_SUFFIX, COMPONENT_REPO_SERVER, COMPONENT_SERVER, KIND_ARGOCD,
};
use crate::crd::ArgoCD;
use crate::labels::{
    K8S_COMPONENT, K8S_MANAGED_BY, K8S_NAME, K8S_PART_OF, MANAGED_BY_OPERATOR, PART_OF_ARGOCD,
};

/// Namespace of the instance.
#[must_use]
pub fn instance_namespace(instance: &ArgoCD) -> String {
    instance.namespace().unwrap_or_default()
}

/// `<instance>-<suffix>`
#[must_use]
pub fn resource_name(instance: &ArgoCD, suffix: &str) -> String {
    format!("{}-{suffix}", instance.name_any())
}

/// Cluster-local FQDN of an instance service.
#[must_use]
pub fn service_fqdn(instance: &ArgoCD, suffix: &str) -> String {
    format!(
        "{}.{}.{CLUSTER_DOMAIN_SUFFIX}",
        resource_name(instance, suffix),
        instance_namespace(instance)
    )
}

/// Builds standardized Kubernetes labels for one component of an instance.
///
/// # Arguments
///
/// * `instance` - The owning `ArgoCD` resource
/// * `component` - Component suffix (e.g., `server`, `repo-server`)
///
/// # Returns
///
/// A `BTreeMap` of label key-value pairs
#[must_use]
pub fn build_labels(instance: &ArgoCD, component: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(K8S_NAME.into(), resource_name(instance, component));
    labels.insert(K8S_COMPONENT.into(), component.into());
    labels.insert(K8S_PART_OF.into(), PART_OF_ARGOCD.into());
    labels.insert(K8S_MANAGED_BY.into(), MANAGED_BY_OPERATOR.into());
    labels
}

/// Pod selector for a component. Kept to a single label because selectors are immutable.
#[must_use]
pub fn selector_labels(instance: &ArgoCD, component: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(K8S_NAME.to_string(), resource_name(instance, component))])
}

/// Metadata for a namespaced object owned by the instance.
#[must_use]
pub fn build_metadata(instance: &ArgoCD, name: &str, component: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(instance_namespace(instance)),
        labels: Some(build_labels(instance, component)),
        ..Default::default()
    }
}

/// Metadata for a cluster-scoped object. Ownership labels are added by the
/// convergence engine.
#[must_use]
pub fn build_cluster_metadata(instance: &ArgoCD, name: &str, component: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        labels: Some(build_labels(instance, component)),
        ..Default::default()
    }
}

/// Builds owner references for a resource owned by an `ArgoCD` instance
///
/// Sets up cascade deletion so that deleting the instance removes every
/// namespaced object it owns.
#[must_use]
pub fn build_owner_references(instance: &ArgoCD) -> Vec<OwnerReference> {
    vec![OwnerReference {
        api_version: API_GROUP_VERSION.to_string(),
        kind: KIND_ARGOCD.to_string(),
        name: instance.name_any(),
        uid: instance.metadata.uid.clone().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }]
}

/// External host of the server: `spec.server.host`, defaulting to the instance name.
#[must_use]
pub fn server_host(instance: &ArgoCD) -> String {
    instance
        .spec
        .server
        .host
        .clone()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| instance.name_any())
}

/// External host of the gRPC endpoint: `spec.server.grpc.host`, defaulting to `<name>-grpc`.
#[must_use]
pub fn grpc_host(instance: &ArgoCD) -> String {
    instance
        .spec
        .server
        .grpc
        .host
        .clone()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| resource_name(instance, "grpc"))
}

/// DNS names for the server's serving certificate.
///
/// `route_host` is the host admitted for the server route, if routes are in use.
#[must_use]
pub fn server_dns_names(instance: &ArgoCD, route_host: Option<&str>) -> Vec<String> {
    let mut names = vec![
        resource_name(instance, COMPONENT_SERVER),
        service_fqdn(instance, COMPONENT_SERVER),
    ];
    let server = &instance.spec.server;
    if server.ingress.enabled {
        names.push(server_host(instance));
    }
    if server.grpc.ingress.enabled {
        names.push(grpc_host(instance));
    }
    if let Some(host) = route_host {
        names.push(host.to_string());
    }
    names.dedup();
    names
}

/// DNS names for the repo server's internal certificate.
#[must_use]
pub fn repo_server_dns_names(instance: &ArgoCD) -> Vec<String> {
    vec![
        resource_name(instance, COMPONENT_REPO_SERVER),
        service_fqdn(instance, COMPONENT_REPO_SERVER),
    ]
}

#[cfg(test)]
#[path = "argocd_resources_tests.rs"]
mod argocd_resources_tests;
