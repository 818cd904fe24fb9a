// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Deployments and the application controller stateful set.
//!
//! Volume sources spell out the fields the API server would otherwise default
//! (`defaultMode`, `optional`) so that live and desired pod templates compare equal.

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, StatefulSet, StatefulSetSpec};
use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, Container, ContainerPort, EmptyDirVolumeSource, PodSpec,
    PodTemplateSpec, ResourceRequirements, SecretVolumeSource, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};

use super::identity::service_account_name;
use super::{build_labels, build_metadata, resource_name, selector_labels, service_fqdn};
use crate::constants::{
    ARGOCD_GPG_KEYS_CM_NAME, ARGOCD_KNOWN_HOSTS_CM_NAME, ARGOCD_REPO_SERVER_TLS_SECRET_NAME,
    ARGOCD_TLS_CERTS_CM_NAME, COMPONENT_APPLICATION_CONTROLLER, COMPONENT_DEX_SERVER,
    COMPONENT_REDIS, COMPONENT_REPO_SERVER, COMPONENT_SERVER, CONTROLLER_METRICS_PORT,
    DEX_GRPC_PORT, DEX_HTTP_PORT, REDIS_PORT, REPO_SERVER_METRICS_PORT, REPO_SERVER_PORT,
    SERVER_HTTP_PORT, SERVER_METRICS_PORT,
};
use crate::crd::ArgoCD;

const DEFAULT_VOLUME_MODE: i32 = 0o644;
const DEFAULT_OPERATION_PROCESSORS: i32 = 10;
const DEFAULT_STATUS_PROCESSORS: i32 = 20;

const VOLUME_SSH_KNOWN_HOSTS: &str = "ssh-known-hosts";
const VOLUME_TLS_CERTS: &str = "tls-certs";
const VOLUME_GPG_KEYS: &str = "gpg-keys";
const VOLUME_REPO_SERVER_TLS: &str = "argocd-repo-server-tls";
const VOLUME_STATIC_FILES: &str = "static-files";
const VOLUME_TMP: &str = "tmp";

fn config_map_volume(name: &str, config_map: &str) -> Volume {
    Volume {
        name: name.to_string(),
        config_map: Some(ConfigMapVolumeSource {
            name: config_map.to_string().into(),
            default_mode: Some(DEFAULT_VOLUME_MODE),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn secret_volume(name: &str, secret: &str) -> Volume {
    Volume {
        name: name.to_string(),
        secret: Some(SecretVolumeSource {
            secret_name: Some(secret.to_string()),
            default_mode: Some(DEFAULT_VOLUME_MODE),
            optional: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn empty_dir_volume(name: &str) -> Volume {
    Volume {
        name: name.to_string(),
        empty_dir: Some(EmptyDirVolumeSource::default()),
        ..Default::default()
    }
}

fn mount(name: &str, path: &str) -> VolumeMount {
    VolumeMount {
        name: name.to_string(),
        mount_path: path.to_string(),
        ..Default::default()
    }
}

fn container_port(name: &str, port: i32) -> ContainerPort {
    ContainerPort {
        name: Some(name.to_string()),
        container_port: port,
        protocol: Some("TCP".to_string()),
        ..Default::default()
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn redis_address(instance: &ArgoCD) -> String {
    format!("{}:{REDIS_PORT}", service_fqdn(instance, COMPONENT_REDIS))
}

fn repo_server_address(instance: &ArgoCD) -> String {
    format!("{}:{REPO_SERVER_PORT}", service_fqdn(instance, COMPONENT_REPO_SERVER))
}

/// Pod template shared by every workload: labels, service account and node placement.
fn pod_template(
    instance: &ArgoCD,
    component: &str,
    service_account: Option<String>,
    containers: Vec<Container>,
    init_containers: Option<Vec<Container>>,
    volumes: Vec<Volume>,
) -> PodTemplateSpec {
    let placement = instance.spec.node_placement.clone().unwrap_or_default();
    PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some(build_labels(instance, component)),
            ..Default::default()
        }),
        spec: Some(PodSpec {
            service_account_name: service_account,
            containers,
            init_containers,
            volumes: if volumes.is_empty() { None } else { Some(volumes) },
            node_selector: placement.node_selector,
            tolerations: placement.tolerations,
            ..Default::default()
        }),
    }
}

fn deployment(
    instance: &ArgoCD,
    component: &str,
    replicas: Option<i32>,
    template: PodTemplateSpec,
) -> Deployment {
    Deployment {
        metadata: build_metadata(instance, &resource_name(instance, component), component),
        spec: Some(DeploymentSpec {
            replicas,
            selector: LabelSelector {
                match_labels: Some(selector_labels(instance, component)),
                ..Default::default()
            },
            template,
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn container(
    name: &str,
    image: String,
    command: Vec<String>,
    ports: Vec<ContainerPort>,
    resources: Option<ResourceRequirements>,
    mounts: Vec<VolumeMount>,
) -> Container {
    Container {
        name: name.to_string(),
        image: Some(image),
        command: Some(command),
        ports: Some(ports),
        resources,
        volume_mounts: if mounts.is_empty() { None } else { Some(mounts) },
        ..Default::default()
    }
}

/// `<name>-server`. Replicas are left to the autoscaler when it is enabled.
#[must_use]
pub fn build_server_deployment(instance: &ArgoCD) -> Deployment {
    let server = &instance.spec.server;
    let mut command = strings(&["argocd-server", "--staticassets", "/shared/app"]);
    command.extend([
        "--repo-server".to_string(),
        repo_server_address(instance),
        "--redis".to_string(),
        redis_address(instance),
    ]);
    if instance.spec.dex_enabled() {
        command.extend([
            "--dex-server".to_string(),
            format!("https://{}:{DEX_HTTP_PORT}", service_fqdn(instance, COMPONENT_DEX_SERVER)),
        ]);
    }
    if server.insecure {
        command.push("--insecure".to_string());
    }

    let template = pod_template(
        instance,
        COMPONENT_SERVER,
        Some(service_account_name(instance, COMPONENT_SERVER)),
        vec![container(
            "argocd-server",
            instance.spec.argocd_image(),
            command,
            vec![
                container_port("http", SERVER_HTTP_PORT),
                container_port("metrics", SERVER_METRICS_PORT),
            ],
            server.resources.clone(),
            vec![
                mount(VOLUME_SSH_KNOWN_HOSTS, "/app/config/ssh"),
                mount(VOLUME_TLS_CERTS, "/app/config/tls"),
                mount(VOLUME_REPO_SERVER_TLS, "/app/config/server/tls"),
            ],
        )],
        None,
        vec![
            config_map_volume(VOLUME_SSH_KNOWN_HOSTS, ARGOCD_KNOWN_HOSTS_CM_NAME),
            config_map_volume(VOLUME_TLS_CERTS, ARGOCD_TLS_CERTS_CM_NAME),
            secret_volume(VOLUME_REPO_SERVER_TLS, ARGOCD_REPO_SERVER_TLS_SECRET_NAME),
        ],
    );

    let replicas = if server.autoscale.enabled {
        None
    } else {
        Some(server.replicas.unwrap_or(1))
    };
    deployment(instance, COMPONENT_SERVER, replicas, template)
}

/// `<name>-repo-server`
#[must_use]
pub fn build_repo_server_deployment(instance: &ArgoCD) -> Deployment {
    let repo = &instance.spec.repo;
    let mut command = strings(&["uid_entrypoint.sh", "argocd-repo-server"]);
    command.extend(["--redis".to_string(), redis_address(instance)]);

    let template = pod_template(
        instance,
        COMPONENT_REPO_SERVER,
        None,
        vec![container(
            "argocd-repo-server",
            instance.spec.argocd_image(),
            command,
            vec![
                container_port("server", REPO_SERVER_PORT),
                container_port("metrics", REPO_SERVER_METRICS_PORT),
            ],
            repo.resources.clone(),
            vec![
                mount(VOLUME_SSH_KNOWN_HOSTS, "/app/config/ssh"),
                mount(VOLUME_TLS_CERTS, "/app/config/tls"),
                mount(VOLUME_GPG_KEYS, "/app/config/gpg/source"),
                mount(VOLUME_REPO_SERVER_TLS, "/app/config/reposerver/tls"),
                mount(VOLUME_TMP, "/tmp"),
            ],
        )],
        None,
        vec![
            config_map_volume(VOLUME_SSH_KNOWN_HOSTS, ARGOCD_KNOWN_HOSTS_CM_NAME),
            config_map_volume(VOLUME_TLS_CERTS, ARGOCD_TLS_CERTS_CM_NAME),
            config_map_volume(VOLUME_GPG_KEYS, ARGOCD_GPG_KEYS_CM_NAME),
            secret_volume(VOLUME_REPO_SERVER_TLS, ARGOCD_REPO_SERVER_TLS_SECRET_NAME),
            empty_dir_volume(VOLUME_TMP),
        ],
    );
    deployment(
        instance,
        COMPONENT_REPO_SERVER,
        Some(repo.replicas.unwrap_or(1)),
        template,
    )
}

/// `<name>-redis`
#[must_use]
pub fn build_redis_deployment(instance: &ArgoCD) -> Deployment {
    let redis = &instance.spec.redis;
    let mut redis_container = container(
        "redis",
        redis.image_ref(),
        strings(&["redis-server"]),
        vec![container_port("redis", REDIS_PORT)],
        redis.resources.clone(),
        Vec::new(),
    );
    redis_container.args = Some(strings(&["--save", "", "--appendonly", "no"]));

    let template = pod_template(
        instance,
        COMPONENT_REDIS,
        Some(service_account_name(instance, COMPONENT_REDIS)),
        vec![redis_container],
        None,
        Vec::new(),
    );
    deployment(instance, COMPONENT_REDIS, Some(1), template)
}

/// `<name>-dex-server`. An init container copies the Argo CD binary that wraps dex.
#[must_use]
pub fn build_dex_deployment(instance: &ArgoCD) -> Deployment {
    let dex = instance.spec.dex();
    let copy_util = Container {
        name: "copyutil".to_string(),
        image: Some(instance.spec.argocd_image()),
        command: Some(strings(&["cp", "-n", "/usr/local/bin/argocd", "/shared/argocd-dex"])),
        volume_mounts: Some(vec![mount(VOLUME_STATIC_FILES, "/shared")]),
        ..Default::default()
    };
    let template = pod_template(
        instance,
        COMPONENT_DEX_SERVER,
        Some(service_account_name(instance, COMPONENT_DEX_SERVER)),
        vec![container(
            "dex",
            dex.image_ref(),
            strings(&["/shared/argocd-dex", "rundex"]),
            vec![
                container_port("http", DEX_HTTP_PORT),
                container_port("grpc", DEX_GRPC_PORT),
            ],
            dex.resources.clone(),
            vec![mount(VOLUME_STATIC_FILES, "/shared")],
        )],
        Some(vec![copy_util]),
        vec![empty_dir_volume(VOLUME_STATIC_FILES)],
    );
    deployment(instance, COMPONENT_DEX_SERVER, Some(1), template)
}

/// `<name>-application-controller`
#[must_use]
pub fn build_application_controller(instance: &ArgoCD) -> StatefulSet {
    let controller = &instance.spec.controller;
    let mut command = strings(&["argocd-application-controller"]);
    command.extend([
        "--operation-processors".to_string(),
        controller
            .processors
            .operation
            .unwrap_or(DEFAULT_OPERATION_PROCESSORS)
            .to_string(),
        "--status-processors".to_string(),
        controller
            .processors
            .status
            .unwrap_or(DEFAULT_STATUS_PROCESSORS)
            .to_string(),
        "--repo-server".to_string(),
        repo_server_address(instance),
        "--redis".to_string(),
        redis_address(instance),
    ]);

    let template = pod_template(
        instance,
        COMPONENT_APPLICATION_CONTROLLER,
        Some(service_account_name(instance, COMPONENT_APPLICATION_CONTROLLER)),
        vec![container(
            "argocd-application-controller",
            instance.spec.argocd_image(),
            command,
            vec![container_port("metrics", CONTROLLER_METRICS_PORT)],
            controller.resources.clone(),
            vec![mount(VOLUME_REPO_SERVER_TLS, "/app/config/controller/tls")],
        )],
        None,
        vec![secret_volume(VOLUME_REPO_SERVER_TLS, ARGOCD_REPO_SERVER_TLS_SECRET_NAME)],
    );

    let name = resource_name(instance, COMPONENT_APPLICATION_CONTROLLER);
    StatefulSet {
        metadata: build_metadata(instance, &name, COMPONENT_APPLICATION_CONTROLLER),
        spec: Some(StatefulSetSpec {
            replicas: Some(1),
            service_name: name.into(),
            selector: LabelSelector {
                match_labels: Some(selector_labels(instance, COMPONENT_APPLICATION_CONTROLLER)),
                ..Default::default()
            },
            template,
            ..Default::default()
        }),
        ..Default::default()
    }
}
