// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `status.rs`

#[cfg(test)]
mod tests {
    use crate::argocd_resources::workloads::{
        build_application_controller, build_redis_deployment, build_repo_server_deployment,
        build_server_deployment,
    };
    use crate::cluster::fake::{argocd, FakeCluster, Op};
    use crate::crd::{
        ArgoCD, ArgoCDStatus, ComponentPhase, InstancePhase, Route, RouteSpec,
        RouteTargetReference, SsoProvider, SsoSpec,
    };
    use crate::reconcilers::sso::SsoState;
    use crate::reconcilers::status::{
        compute_status, instance_phase, update_status, workload_phase,
    };
    use k8s_openapi::api::apps::v1::{Deployment, DeploymentStatus, StatefulSet, StatefulSetStatus};

    const NS: &str = "argocd";

    fn ready(mut deployment: Deployment) -> Deployment {
        let replicas = deployment.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
        deployment.status = Some(DeploymentStatus {
            ready_replicas: Some(replicas),
            ..Default::default()
        });
        deployment
    }

    fn ready_controller(mut stateful_set: StatefulSet) -> StatefulSet {
        stateful_set.status = Some(StatefulSetStatus {
            ready_replicas: Some(1),
            replicas: 1,
            ..Default::default()
        });
        stateful_set
    }

    fn seed_ready_workloads(cluster: &FakeCluster, instance: &ArgoCD) {
        cluster.seed(NS, &ready(build_server_deployment(instance)));
        cluster.seed(NS, &ready(build_repo_server_deployment(instance)));
        cluster.seed(NS, &ready(build_redis_deployment(instance)));
        cluster.seed(NS, &ready_controller(build_application_controller(instance)));
    }

    #[test]
    fn test_workload_phase() {
        assert_eq!(workload_phase(1, 1), ComponentPhase::Running);
        assert_eq!(workload_phase(3, 2), ComponentPhase::Pending);
        assert_eq!(workload_phase(0, 0), ComponentPhase::Pending);
    }

    #[test]
    fn test_instance_phase_requires_redis_only_when_enabled() {
        let mut status = ArgoCDStatus {
            server: ComponentPhase::Running,
            repo: ComponentPhase::Running,
            application_controller: ComponentPhase::Running,
            ..Default::default()
        };
        assert_eq!(instance_phase(&status, true), InstancePhase::Pending);
        assert_eq!(instance_phase(&status, false), InstancePhase::Available);
        status.redis = ComponentPhase::Running;
        assert_eq!(instance_phase(&status, true), InstancePhase::Available);
    }

    #[tokio::test]
    async fn test_empty_cluster_is_unknown() {
        let cluster = FakeCluster::new();
        let status = compute_status(&cluster, &argocd("example", NS), None, false)
            .await
            .unwrap();
        assert_eq!(status.phase, InstancePhase::Pending);
        assert_eq!(status.server, ComponentPhase::Unknown);
        assert_eq!(status.application_controller, ComponentPhase::Unknown);
        assert_eq!(
            status.host.as_deref(),
            Some("example-server.argocd.svc.cluster.local")
        );
        assert_eq!(status.observed_generation, Some(1));
    }

    #[tokio::test]
    async fn test_ready_workloads_are_available() {
        let cluster = FakeCluster::new();
        let instance = argocd("example", NS);
        seed_ready_workloads(&cluster, &instance);

        let status = compute_status(&cluster, &instance, None, false).await.unwrap();
        assert_eq!(status.server, ComponentPhase::Running);
        assert_eq!(status.redis, ComponentPhase::Running);
        assert_eq!(status.phase, InstancePhase::Available);
        assert_eq!(status.sso, ComponentPhase::Unknown);
    }

    #[tokio::test]
    async fn test_unready_deployment_is_pending() {
        let cluster = FakeCluster::new();
        let instance = argocd("example", NS);
        seed_ready_workloads(&cluster, &instance);
        cluster.seed(NS, &build_repo_server_deployment(&instance));

        let status = compute_status(&cluster, &instance, None, false).await.unwrap();
        assert_eq!(status.repo, ComponentPhase::Pending);
        assert_eq!(status.phase, InstancePhase::Pending);
    }

    #[tokio::test]
    async fn test_route_host_is_preferred() {
        let cluster = FakeCluster::new();
        let instance = argocd("example", NS);
        cluster.seed(
            NS,
            &Route::new(
                "example-server",
                RouteSpec {
                    host: Some("argocd.apps.example.com".to_string()),
                    to: RouteTargetReference {
                        kind: "Service".to_string(),
                        name: "example-server".to_string(),
                        weight: None,
                    },
                    ..Default::default()
                },
            ),
        );

        let status = compute_status(&cluster, &instance, None, true).await.unwrap();
        assert_eq!(status.host.as_deref(), Some("argocd.apps.example.com"));
        // Routes ignored where the API is absent
        let status = compute_status(&cluster, &instance, None, false).await.unwrap();
        assert_eq!(
            status.host.as_deref(),
            Some("example-server.argocd.svc.cluster.local")
        );
    }

    #[tokio::test]
    async fn test_keycloak_phase_follows_state() {
        let cluster = FakeCluster::new();
        let mut instance = argocd("example", NS);
        instance.spec.sso = Some(SsoSpec {
            provider: Some(SsoProvider::Keycloak),
            ..Default::default()
        });

        let status = compute_status(&cluster, &instance, Some(SsoState::RealmPending), false)
            .await
            .unwrap();
        assert_eq!(status.sso, ComponentPhase::Pending);

        // Without a fresh state the reported phase is kept
        instance.status = Some(ArgoCDStatus {
            sso: ComponentPhase::Running,
            ..Default::default()
        });
        let status = compute_status(&cluster, &instance, None, false).await.unwrap();
        assert_eq!(status.sso, ComponentPhase::Running);
    }

    #[tokio::test]
    async fn test_update_only_patches_changes() {
        let cluster = FakeCluster::new();
        let instance = argocd("example", NS);
        cluster.seed(NS, &instance);
        seed_ready_workloads(&cluster, &instance);

        let (status, patched) = update_status(&cluster, &instance, None, false).await.unwrap();
        assert!(patched);
        assert_eq!(status.phase, InstancePhase::Available);
        let live: ArgoCD = cluster.object(NS, "example").unwrap();
        assert_eq!(live.status.unwrap(), status);

        cluster.clear_writes();
        // The stale copy still has no status; the live object is compared
        let (_, patched) = update_status(&cluster, &instance, None, false).await.unwrap();
        assert!(!patched);
        assert_eq!(cluster.write_count(), 0);

        cluster.remove::<Deployment>(NS, "example-server");
        update_status(&cluster, &instance, None, false).await.unwrap();
        assert_eq!(
            cluster.writes_for("ArgoCD"),
            vec![(Op::PatchStatus, "example".to_string())]
        );
    }
}
