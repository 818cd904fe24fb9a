// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-kind allow-lists of operator-owned fields.
//!
//! | Kind | Fields |
//! |------|--------|
//! | Deployment, StatefulSet | `replicas` (when desired sets it), pod template labels (additive), containers, init containers, volumes, service account, node selector, tolerations |
//! | Service | `selector`, `type`, ports (by name/port/targetPort/protocol, keeping allocated node ports) |
//! | ConfigMap | `data` |
//! | Secret | `data` (additive) |
//! | ServiceAccount | labels (additive) |
//! | Role, ClusterRole | `rules` |
//! | RoleBinding, ClusterRoleBinding | `subjects`; a different `roleRef` forces recreation |
//! | HorizontalPodAutoscaler | `minReplicas`, `maxReplicas`, `metrics`, `scaleTargetRef` |
//! | Ingress | annotations (additive), `ingressClassName`, `rules`, `tls` |
//! | Route | annotations (additive), `spec` (keeping an assigned host) |
//! | OAuthClient | `secret`, `redirectURIs`, `grantMethod` |
//! | TemplateInstance | nothing |
//!
//! Container `resources` are compared by quantity value, not by string.

use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::core::v1::{
    ConfigMap, Container, PodTemplateSpec, ResourceRequirements, Secret, Service, ServiceAccount,
    ServicePort,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use std::collections::BTreeMap;

use super::ManagedObject;
use crate::crd::{OAuthClient, Route, TemplateInstance};

/// Sets `current` to `desired` if they differ.
fn assign<T: PartialEq + Clone>(current: &mut T, desired: &T) -> bool {
    if current == desired {
        return false;
    }
    *current = desired.clone();
    true
}

/// Like [`assign`], but an absent value equals its default.
///
/// The API server omits empty maps and fills in empty structs, so `None` and
/// `Some(default)` must not count as drift.
fn assign_defaulted<T: PartialEq + Clone + Default>(current: &mut Option<T>, desired: &Option<T>) -> bool {
    let have = current.clone().unwrap_or_default();
    let want = desired.clone().unwrap_or_default();
    if have == want {
        return false;
    }
    *current = desired.clone();
    true
}

/// Writes every desired entry, leaving other keys alone.
fn merge_map<V: PartialEq + Clone>(
    current: &mut Option<BTreeMap<String, V>>,
    desired: Option<&BTreeMap<String, V>>,
) -> bool {
    let Some(desired) = desired.filter(|d| !d.is_empty()) else {
        return false;
    };
    let current = current.get_or_insert_with(BTreeMap::new);
    let mut changed = false;
    for (key, value) in desired {
        if current.get(key) != Some(value) {
            current.insert(key.clone(), value.clone());
            changed = true;
        }
    }
    changed
}

const NANOS: i128 = 1_000_000_000;

/// Value of a Kubernetes quantity in billionths of a unit.
///
/// Handles binary (`Ki`..`Ei`) and decimal (`n`..`E`) suffixes and exponent
/// notation, so `0.5`, `500m` and `5e-1` all compare equal. Digits below one
/// nano-unit are dropped, as the API server does.
fn quantity_nanos(quantity: &str) -> Option<i128> {
    let quantity = quantity.trim();
    let split = quantity
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '+' || c == '-'))
        .unwrap_or(quantity.len());
    let (number, suffix) = quantity.split_at(split);

    let (negative, digits) = match number.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, number.strip_prefix('+').unwrap_or(number)),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if (whole.is_empty() && fraction.is_empty())
        || !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit())
    {
        return None;
    }
    let mut nanos = if whole.is_empty() {
        0
    } else {
        whole.parse::<i128>().ok()?.checked_mul(NANOS)?
    };
    let fraction: String = fraction.chars().chain(std::iter::repeat('0')).take(9).collect();
    nanos += fraction.parse::<i128>().ok()?;

    let scaled = match suffix {
        "" => Some(nanos),
        "Ki" => nanos.checked_mul(1 << 10),
        "Mi" => nanos.checked_mul(1 << 20),
        "Gi" => nanos.checked_mul(1 << 30),
        "Ti" => nanos.checked_mul(1 << 40),
        "Pi" => nanos.checked_mul(1 << 50),
        "Ei" => nanos.checked_mul(1 << 60),
        "n" => Some(nanos / NANOS),
        "u" => Some(nanos / 1_000_000),
        "m" => Some(nanos / 1_000),
        "k" => nanos.checked_mul(10_i128.pow(3)),
        "M" => nanos.checked_mul(10_i128.pow(6)),
        "G" => nanos.checked_mul(10_i128.pow(9)),
        "T" => nanos.checked_mul(10_i128.pow(12)),
        "P" => nanos.checked_mul(10_i128.pow(15)),
        "E" => nanos.checked_mul(10_i128.pow(18)),
        exponent => {
            let power: i32 = exponent
                .strip_prefix(['e', 'E'])
                .filter(|p| !p.is_empty())?
                .parse()
                .ok()?;
            if power >= 0 {
                nanos.checked_mul(10_i128.checked_pow(power.unsigned_abs())?)
            } else {
                10_i128.checked_pow(power.unsigned_abs()).map(|d| nanos / d)
            }
        }
    }?;
    Some(if negative { -scaled } else { scaled })
}

fn quantity_eq(a: &Quantity, b: &Quantity) -> bool {
    match (quantity_nanos(&a.0), quantity_nanos(&b.0)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn quantities_eq(
    a: Option<&BTreeMap<String, Quantity>>,
    b: Option<&BTreeMap<String, Quantity>>,
) -> bool {
    let empty = BTreeMap::new();
    let (a, b) = (a.unwrap_or(&empty), b.unwrap_or(&empty));
    a.len() == b.len()
        && a.iter()
            .all(|(name, q)| b.get(name).is_some_and(|other| quantity_eq(q, other)))
}

/// Sizing compared by value; the API server canonicalises quantities (`0.5` to `500m`).
fn assign_resources(
    current: &mut Option<ResourceRequirements>,
    desired: &Option<ResourceRequirements>,
) -> bool {
    let have = current.clone().unwrap_or_default();
    let want = desired.clone().unwrap_or_default();
    let same = quantities_eq(have.limits.as_ref(), want.limits.as_ref())
        && quantities_eq(have.requests.as_ref(), want.requests.as_ref())
        && have.claims.unwrap_or_default() == want.claims.unwrap_or_default();
    if same {
        return false;
    }
    *current = desired.clone();
    true
}

fn merge_container(current: &mut Container, desired: &Container) -> bool {
    let mut changed = assign(&mut current.image, &desired.image);
    changed |= assign(&mut current.command, &desired.command);
    changed |= assign(&mut current.args, &desired.args);
    changed |= assign_defaulted(&mut current.env, &desired.env);
    changed |= assign_resources(&mut current.resources, &desired.resources);
    changed |= assign_defaulted(&mut current.volume_mounts, &desired.volume_mounts);
    changed
}

/// Converges a container list. A different length or container name replaces the list.
fn merge_containers(current: &mut Vec<Container>, desired: &[Container]) -> bool {
    let same_shape = current.len() == desired.len()
        && current.iter().zip(desired).all(|(c, d)| c.name == d.name);
    if !same_shape {
        *current = desired.to_vec();
        return true;
    }
    current
        .iter_mut()
        .zip(desired)
        .fold(false, |changed, (c, d)| merge_container(c, d) | changed)
}

fn merge_optional_containers(
    current: &mut Option<Vec<Container>>,
    desired: &Option<Vec<Container>>,
) -> bool {
    if let (Some(have), Some(want)) = (current.as_mut(), desired) {
        return merge_containers(have, want);
    }
    assign_defaulted(current, desired)
}

fn merge_pod_template(current: &mut PodTemplateSpec, desired: &PodTemplateSpec) -> bool {
    let mut changed = false;
    if let Some(want) = &desired.metadata {
        let meta = current.metadata.get_or_insert_with(Default::default);
        changed |= merge_map(&mut meta.labels, want.labels.as_ref());
    }

    let Some(want) = &desired.spec else {
        return changed;
    };
    let pod = current.spec.get_or_insert_with(Default::default);
    changed |= merge_containers(&mut pod.containers, &want.containers);
    changed |= merge_optional_containers(&mut pod.init_containers, &want.init_containers);
    changed |= assign_defaulted(&mut pod.volumes, &want.volumes);
    // The API server defaults the account to "default"; only an explicit one is owned.
    if want.service_account_name.is_some() {
        changed |= assign(&mut pod.service_account_name, &want.service_account_name);
    }
    changed |= assign_defaulted(&mut pod.node_selector, &want.node_selector);
    changed |= assign_defaulted(&mut pod.tolerations, &want.tolerations);
    changed
}

impl ManagedObject for Deployment {
    fn merge_from(&mut self, desired: &Self) -> bool {
        let Some(want) = &desired.spec else {
            return false;
        };
        let spec = self.spec.get_or_insert_with(Default::default);
        let mut changed = false;
        if want.replicas.is_some() {
            changed |= assign(&mut spec.replicas, &want.replicas);
        }
        changed | merge_pod_template(&mut spec.template, &want.template)
    }
}

impl ManagedObject for StatefulSet {
    fn merge_from(&mut self, desired: &Self) -> bool {
        let Some(want) = &desired.spec else {
            return false;
        };
        let spec = self.spec.get_or_insert_with(Default::default);
        let mut changed = false;
        if want.replicas.is_some() {
            changed |= assign(&mut spec.replicas, &want.replicas);
        }
        changed | merge_pod_template(&mut spec.template, &want.template)
    }
}

type PortKey<'a> = (
    Option<&'a String>,
    i32,
    Option<&'a k8s_openapi::apimachinery::pkg::util::intstr::IntOrString>,
    Option<&'a String>,
);

fn port_key(port: &ServicePort) -> PortKey<'_> {
    (
        port.name.as_ref(),
        port.port,
        port.target_port.as_ref(),
        port.protocol.as_ref(),
    )
}

fn merge_ports(current: &mut Option<Vec<ServicePort>>, desired: &Option<Vec<ServicePort>>) -> bool {
    let have = current.clone().unwrap_or_default();
    let want = desired.clone().unwrap_or_default();
    if have.iter().map(port_key).eq(want.iter().map(port_key)) {
        return false;
    }
    let ports = want
        .into_iter()
        .map(|mut port| {
            if port.node_port.is_none() {
                port.node_port = have
                    .iter()
                    .find(|p| p.name == port.name)
                    .and_then(|p| p.node_port);
            }
            port
        })
        .collect();
    *current = Some(ports);
    true
}

impl ManagedObject for Service {
    fn merge_from(&mut self, desired: &Self) -> bool {
        let Some(want) = &desired.spec else {
            return false;
        };
        let spec = self.spec.get_or_insert_with(Default::default);
        let mut changed = assign_defaulted(&mut spec.selector, &want.selector);
        if want.type_.is_some() {
            changed |= assign(&mut spec.type_, &want.type_);
        }
        changed | merge_ports(&mut spec.ports, &want.ports)
    }
}

impl ManagedObject for ConfigMap {
    fn merge_from(&mut self, desired: &Self) -> bool {
        assign_defaulted(&mut self.data, &desired.data)
    }
}

impl ManagedObject for Secret {
    fn merge_from(&mut self, desired: &Self) -> bool {
        merge_map(&mut self.data, desired.data.as_ref())
    }
}

impl ManagedObject for ServiceAccount {
    fn merge_from(&mut self, desired: &Self) -> bool {
        merge_map(&mut self.metadata.labels, desired.metadata.labels.as_ref())
    }
}

impl ManagedObject for Role {
    fn merge_from(&mut self, desired: &Self) -> bool {
        assign_defaulted(&mut self.rules, &desired.rules)
    }
}

impl ManagedObject for ClusterRole {
    fn merge_from(&mut self, desired: &Self) -> bool {
        assign_defaulted(&mut self.rules, &desired.rules)
    }
}

impl ManagedObject for RoleBinding {
    fn merge_from(&mut self, desired: &Self) -> bool {
        assign_defaulted(&mut self.subjects, &desired.subjects)
    }

    fn requires_recreate(&self, desired: &Self) -> bool {
        self.role_ref != desired.role_ref
    }
}

impl ManagedObject for ClusterRoleBinding {
    fn merge_from(&mut self, desired: &Self) -> bool {
        assign_defaulted(&mut self.subjects, &desired.subjects)
    }

    fn requires_recreate(&self, desired: &Self) -> bool {
        self.role_ref != desired.role_ref
    }
}

impl ManagedObject for HorizontalPodAutoscaler {
    fn merge_from(&mut self, desired: &Self) -> bool {
        let Some(want) = &desired.spec else {
            return false;
        };
        let spec = self.spec.get_or_insert_with(Default::default);
        let mut changed = assign(&mut spec.min_replicas, &want.min_replicas);
        changed |= assign(&mut spec.max_replicas, &want.max_replicas);
        changed |= assign_defaulted(&mut spec.metrics, &want.metrics);
        changed | assign(&mut spec.scale_target_ref, &want.scale_target_ref)
    }
}

impl ManagedObject for Ingress {
    fn merge_from(&mut self, desired: &Self) -> bool {
        let mut changed = merge_map(
            &mut self.metadata.annotations,
            desired.metadata.annotations.as_ref(),
        );
        let Some(want) = &desired.spec else {
            return changed;
        };
        let spec = self.spec.get_or_insert_with(Default::default);
        changed |= assign(&mut spec.ingress_class_name, &want.ingress_class_name);
        changed |= assign_defaulted(&mut spec.rules, &want.rules);
        changed | assign_defaulted(&mut spec.tls, &want.tls)
    }
}

impl ManagedObject for Route {
    fn merge_from(&mut self, desired: &Self) -> bool {
        let changed = merge_map(
            &mut self.metadata.annotations,
            desired.metadata.annotations.as_ref(),
        );
        let mut want = desired.spec.clone();
        // The router assigns a host when none is requested.
        if want.host.is_none() {
            want.host.clone_from(&self.spec.host);
        }
        changed | assign(&mut self.spec, &want)
    }
}

impl ManagedObject for OAuthClient {
    fn merge_from(&mut self, desired: &Self) -> bool {
        let mut changed = assign(&mut self.secret, &desired.secret);
        changed |= assign(&mut self.redirect_uris, &desired.redirect_uris);
        changed | assign(&mut self.grant_method, &desired.grant_method)
    }
}

impl ManagedObject for TemplateInstance {
    fn merge_from(&mut self, _desired: &Self) -> bool {
        false
    }
}

#[cfg(test)]
#[path = "merge_tests.rs"]
mod merge_tests;
