// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context as _, Result};
use argocd_operator::{
    cluster::{KubeClusterApi, PlatformCapabilities},
    config::{LogFormat, OperatorConfig},
    constants::{ERROR_REQUEUE_DURATION_SECS, METRICS_SERVER_PATH, TOKIO_WORKER_THREADS},
    crd::ArgoCD,
    metrics,
    reconcilers::{reconcile_argocd, sso::keycloak::KeycloakAdminClient, ReconcileSettings},
};
use axum::{http::StatusCode, routing::get, Router};
use clap::Parser;
use futures::StreamExt;
use k8s_openapi::api::{
    apps::v1::{Deployment, StatefulSet},
    core::v1::{ConfigMap, Secret, Service},
};
use kube::{
    runtime::{controller::Action, watcher::Config, Controller},
    Api, Client, ResourceExt,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct ReconcileError(#[from] anyhow::Error);

/// Shared by every reconciliation.
struct Context {
    api: KubeClusterApi,
    keycloak: KeycloakAdminClient,
    settings: ReconcileSettings,
}

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("argocd-operator")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

/// Format: timestamp file:line LEVEL message. `RUST_LOG` overrides the default `info` filter.
fn init_logging(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main() -> Result<()> {
    let config = OperatorConfig::parse();
    init_logging(config.log_format);

    // reqwest and kube both use rustls; pick the provider before either builds a client
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("A rustls crypto provider was already installed");
    }

    info!("Starting Argo CD operator");
    let allow_list = config.allow_list();
    if allow_list.is_empty() {
        info!("No namespaces may own cluster-scoped objects; cluster roles will not be created");
    }

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    let capabilities = PlatformCapabilities::discover(&client).await?;
    info!(
        routes = capabilities.routes,
        templates = capabilities.templates,
        "Discovered platform capabilities"
    );

    let context = Arc::new(Context {
        api: KubeClusterApi::new(client.clone()),
        keycloak: KeycloakAdminClient::new(),
        settings: ReconcileSettings {
            capabilities,
            allow_list,
            cluster_api_url: config.cluster_api_url.clone(),
        },
    });

    // The controller and the probe server should never exit
    tokio::select! {
        result = run_argocd_controller(client, config.watch_namespace.as_deref(), context) => {
            error!("CRITICAL: ArgoCD controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("ArgoCD controller exited unexpectedly without error")
        }
        result = serve_metrics(&config.metrics_bind_address) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("metrics server exited unexpectedly without error")
        }
    }
}

async fn metrics_handler() -> (StatusCode, String) {
    match metrics::gather_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Serves `/metrics` and the liveness and readiness probes.
async fn serve_metrics(bind_address: &str) -> Result<()> {
    let app = Router::new()
        .route(METRICS_SERVER_PATH, get(metrics_handler))
        .route("/healthz", get(|| async { "ok" }))
        .route("/readyz", get(|| async { "ok" }));

    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .with_context(|| format!("failed to bind metrics server to {bind_address}"))?;
    info!(address = %bind_address, "Metrics server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Run the `ArgoCD` controller
async fn run_argocd_controller(
    client: Client,
    watch_namespace: Option<&str>,
    context: Arc<Context>,
) -> Result<()> {
    info!(namespace = ?watch_namespace, "Starting ArgoCD controller");

    let (instances, deployments, stateful_sets, services, config_maps, secrets) =
        match watch_namespace {
            Some(ns) => (
                Api::<ArgoCD>::namespaced(client.clone(), ns),
                Api::<Deployment>::namespaced(client.clone(), ns),
                Api::<StatefulSet>::namespaced(client.clone(), ns),
                Api::<Service>::namespaced(client.clone(), ns),
                Api::<ConfigMap>::namespaced(client.clone(), ns),
                Api::<Secret>::namespaced(client, ns),
            ),
            None => (
                Api::<ArgoCD>::all(client.clone()),
                Api::<Deployment>::all(client.clone()),
                Api::<StatefulSet>::all(client.clone()),
                Api::<Service>::all(client.clone()),
                Api::<ConfigMap>::all(client.clone()),
                Api::<Secret>::all(client),
            ),
        };

    Controller::new(instances, Config::default())
        .owns(deployments, Config::default())
        .owns(stateful_sets, Config::default())
        .owns(services, Config::default())
        .owns(config_maps, Config::default())
        .owns(secrets, Config::default())
        .run(reconcile_argocd_wrapper, error_policy, context)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Reconcile wrapper for `ArgoCD`
async fn reconcile_argocd_wrapper(
    instance: Arc<ArgoCD>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    match reconcile_argocd(&ctx.api, &ctx.keycloak, &ctx.settings, &instance).await {
        Ok(report) => {
            metrics::record_reconciliation_success(start.elapsed());
            info!(
                namespace = ?instance.namespace(),
                name = %instance.name_any(),
                writes = report.writes,
                available = report.available,
                sso = report.sso_state.as_str(),
                "Successfully reconciled ArgoCD"
            );
            Ok(Action::requeue(report.requeue_after()))
        }
        Err(e) => {
            metrics::record_reconciliation_error(start.elapsed());
            error!(
                namespace = ?instance.namespace(),
                name = %instance.name_any(),
                "Failed to reconcile ArgoCD: {:#}",
                e
            );
            Err(e.into())
        }
    }
}

/// Error policy for controller
fn error_policy(_resource: Arc<ArgoCD>, _err: &ReconcileError, _ctx: Arc<Context>) -> Action {
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}
