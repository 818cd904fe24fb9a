// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Services, ingresses, routes and the server autoscaler.

use k8s_openapi::api::autoscaling::v2::{
    CrossVersionObjectReference, HorizontalPodAutoscaler, HorizontalPodAutoscalerSpec, MetricSpec,
    MetricTarget, ResourceMetricSource,
};
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec as K8sIngressSpec, IngressTLS, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

use super::{build_metadata, grpc_host, resource_name, selector_labels, server_host};
use crate::constants::{
    ARGOCD_SECRET_NAME, COMPONENT_APPLICATION_CONTROLLER, COMPONENT_DEX_SERVER, COMPONENT_REDIS,
    COMPONENT_REPO_SERVER, COMPONENT_SERVER, CONTROLLER_METRICS_PORT, DEX_GRPC_PORT,
    DEX_HTTP_PORT, REDIS_PORT, REPO_SERVER_METRICS_PORT, REPO_SERVER_PORT, SERVER_HTTPS_PORT,
    SERVER_HTTP_PORT, SERVER_METRICS_PORT,
};
use crate::crd::{
    ArgoCD, IngressSpec, Route, RoutePort, RouteSpec, RouteTargetReference, RouteTlsConfig,
};

const DEFAULT_SERVICE_TYPE: &str = "ClusterIP";
const DEFAULT_MIN_REPLICAS: i32 = 1;
const DEFAULT_MAX_REPLICAS: i32 = 3;
const DEFAULT_TARGET_CPU: i32 = 50;

fn port(name: &str, port: i32, target: i32) -> ServicePort {
    ServicePort {
        name: Some(name.to_string()),
        port,
        target_port: Some(IntOrString::Int(target)),
        protocol: Some("TCP".to_string()),
        ..Default::default()
    }
}

fn service(
    instance: &ArgoCD,
    suffix: &str,
    component: &str,
    service_type: Option<&str>,
    ports: Vec<ServicePort>,
) -> Service {
    Service {
        metadata: build_metadata(instance, &resource_name(instance, suffix), component),
        spec: Some(ServiceSpec {
            selector: Some(selector_labels(instance, component)),
            type_: Some(service_type.unwrap_or(DEFAULT_SERVICE_TYPE).to_string()),
            ports: Some(ports),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// `<name>-server`
#[must_use]
pub fn build_server_service(instance: &ArgoCD) -> Service {
    service(
        instance,
        COMPONENT_SERVER,
        COMPONENT_SERVER,
        instance.spec.server.service_type.as_deref(),
        vec![
            port("http", 80, SERVER_HTTP_PORT),
            port("https", SERVER_HTTPS_PORT, SERVER_HTTP_PORT),
        ],
    )
}

/// `<name>-server-metrics`
#[must_use]
pub fn build_server_metrics_service(instance: &ArgoCD) -> Service {
    service(
        instance,
        "server-metrics",
        COMPONENT_SERVER,
        None,
        vec![port("metrics", SERVER_METRICS_PORT, SERVER_METRICS_PORT)],
    )
}

/// `<name>-repo-server`
#[must_use]
pub fn build_repo_server_service(instance: &ArgoCD) -> Service {
    service(
        instance,
        COMPONENT_REPO_SERVER,
        COMPONENT_REPO_SERVER,
        None,
        vec![
            port("server", REPO_SERVER_PORT, REPO_SERVER_PORT),
            port("metrics", REPO_SERVER_METRICS_PORT, REPO_SERVER_METRICS_PORT),
        ],
    )
}

/// `<name>-metrics`, exposing the application controller.
#[must_use]
pub fn build_controller_metrics_service(instance: &ArgoCD) -> Service {
    service(
        instance,
        "metrics",
        COMPONENT_APPLICATION_CONTROLLER,
        None,
        vec![port("metrics", CONTROLLER_METRICS_PORT, CONTROLLER_METRICS_PORT)],
    )
}

/// `<name>-redis`
#[must_use]
pub fn build_redis_service(instance: &ArgoCD) -> Service {
    service(
        instance,
        COMPONENT_REDIS,
        COMPONENT_REDIS,
        None,
        vec![port("tcp-redis", REDIS_PORT, REDIS_PORT)],
    )
}

/// `<name>-dex-server`
#[must_use]
pub fn build_dex_service(instance: &ArgoCD) -> Service {
    service(
        instance,
        COMPONENT_DEX_SERVER,
        COMPONENT_DEX_SERVER,
        None,
        vec![
            port("http", DEX_HTTP_PORT, DEX_HTTP_PORT),
            port("grpc", DEX_GRPC_PORT, DEX_GRPC_PORT),
        ],
    )
}

fn ingress(
    instance: &ArgoCD,
    suffix: &str,
    host: String,
    settings: &IngressSpec,
    default_annotations: &[(&str, &str)],
    backend_port: &str,
) -> Ingress {
    let mut metadata = build_metadata(instance, &resource_name(instance, suffix), COMPONENT_SERVER);
    let mut annotations: BTreeMap<String, String> = default_annotations
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    if let Some(extra) = &settings.annotations {
        annotations.extend(extra.clone());
    }
    metadata.annotations = Some(annotations);

    let tls = settings.tls.clone().unwrap_or_else(|| {
        vec![IngressTLS {
            hosts: Some(vec![host.clone()]),
            secret_name: Some(ARGOCD_SECRET_NAME.to_string()),
        }]
    });

    Ingress {
        metadata,
        spec: Some(K8sIngressSpec {
            ingress_class_name: settings.ingress_class_name.clone(),
            rules: Some(vec![IngressRule {
                host: Some(host),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some(settings.path.clone().unwrap_or_else(|| "/".to_string())),
                        path_type: "ImplementationSpecific".to_string(),
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: resource_name(instance, COMPONENT_SERVER),
                                port: Some(ServiceBackendPort {
                                    name: Some(backend_port.to_string()),
                                    number: None,
                                }),
                            }),
                            ..Default::default()
                        },
                    }],
                }),
            }]),
            tls: Some(tls),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// `<name>-server` ingress for the UI and API.
#[must_use]
pub fn build_server_ingress(instance: &ArgoCD) -> Ingress {
    ingress(
        instance,
        COMPONENT_SERVER,
        server_host(instance),
        &instance.spec.server.ingress,
        &[
            ("nginx.ingress.kubernetes.io/force-ssl-redirect", "true"),
            ("nginx.ingress.kubernetes.io/ssl-passthrough", "true"),
        ],
        "https",
    )
}

/// `<name>-grpc` ingress for the CLI.
#[must_use]
pub fn build_grpc_ingress(instance: &ArgoCD) -> Ingress {
    ingress(
        instance,
        "grpc",
        grpc_host(instance),
        &instance.spec.server.grpc.ingress,
        &[("nginx.ingress.kubernetes.io/backend-protocol", "GRPC")],
        "https",
    )
}

/// `<name>-server` route. Passthrough unless the server runs insecure.
#[must_use]
pub fn build_server_route(instance: &ArgoCD) -> Route {
    let server = &instance.spec.server;
    let mut route = Route::new(
        &resource_name(instance, COMPONENT_SERVER),
        RouteSpec {
            host: server.host.clone().filter(|h| !h.is_empty()),
            path: None,
            to: RouteTargetReference {
                kind: "Service".to_string(),
                name: resource_name(instance, COMPONENT_SERVER),
                weight: Some(100),
            },
            port: Some(RoutePort {
                target_port: IntOrString::String(
                    if server.insecure { "http" } else { "https" }.to_string(),
                ),
            }),
            tls: Some(RouteTlsConfig {
                termination: if server.insecure { "edge" } else { "passthrough" }.to_string(),
                insecure_edge_termination_policy: Some("Redirect".to_string()),
            }),
            wildcard_policy: Some("None".to_string()),
        },
    );
    let mut metadata = build_metadata(instance, &resource_name(instance, COMPONENT_SERVER), COMPONENT_SERVER);
    metadata.annotations = server.route.annotations.clone();
    route.metadata = metadata;
    route
}

/// `<name>-server` autoscaler.
#[must_use]
pub fn build_server_hpa(instance: &ArgoCD) -> HorizontalPodAutoscaler {
    let autoscale = &instance.spec.server.autoscale;
    HorizontalPodAutoscaler {
        metadata: build_metadata(instance, &resource_name(instance, COMPONENT_SERVER), COMPONENT_SERVER),
        spec: Some(HorizontalPodAutoscalerSpec {
            scale_target_ref: CrossVersionObjectReference {
                api_version: Some("apps/v1".to_string()),
                kind: "Deployment".to_string(),
                name: resource_name(instance, COMPONENT_SERVER),
            },
            min_replicas: Some(autoscale.min_replicas.unwrap_or(DEFAULT_MIN_REPLICAS)),
            max_replicas: autoscale.max_replicas.unwrap_or(DEFAULT_MAX_REPLICAS),
            metrics: Some(vec![MetricSpec {
                type_: "Resource".to_string(),
                resource: Some(ResourceMetricSource {
                    name: "cpu".to_string(),
                    target: MetricTarget {
                        type_: "Utilization".to_string(),
                        average_utilization: Some(
                            autoscale
                                .target_cpu_utilization_percentage
                                .unwrap_or(DEFAULT_TARGET_CPU),
                        ),
                        ..Default::default()
                    },
                }),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}
