// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `finalizers.rs`

#[cfg(test)]
mod tests {
    use crate::argocd_resources::identity::{build_cluster_role, build_cluster_role_binding};
    use crate::argocd_resources::sso::build_oauth_client;
    use crate::cluster::fake::{argocd, FakeCluster, Op};
    use crate::config::NamespaceAllowList;
    use crate::constants::{COMPONENT_APPLICATION_CONTROLLER, COMPONENT_SERVER};
    use crate::crd::{ArgoCD, OAuthClient};
    use crate::labels::FINALIZER_ARGOCD;
    use crate::reconcilers::converge::converge_cluster_scoped;
    use crate::reconcilers::finalizers::{
        ensure_finalizer, handle_deletion, remove_finalizer, FinalizerCleanup,
    };
    use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding};
    use kube::ResourceExt;

    const TEST_NAMESPACE: &str = "argocd";
    const OTHER_FINALIZER: &str = "example.com/keep";

    fn seeded(cluster: &FakeCluster, finalizers: &[&str]) -> ArgoCD {
        let mut instance = argocd("example", TEST_NAMESPACE);
        instance.metadata.finalizers = Some(finalizers.iter().map(|f| (*f).to_string()).collect());
        cluster.seed(TEST_NAMESPACE, &instance);
        instance
    }

    async fn own_cluster_objects(cluster: &FakeCluster, instance: &ArgoCD) {
        let allow = NamespaceAllowList::all();
        for component in [COMPONENT_APPLICATION_CONTROLLER, COMPONENT_SERVER] {
            converge_cluster_scoped(cluster, instance, &allow, true, build_cluster_role(instance, component))
                .await
                .unwrap();
            converge_cluster_scoped(
                cluster,
                instance,
                &allow,
                true,
                build_cluster_role_binding(instance, component),
            )
            .await
            .unwrap();
        }
        converge_cluster_scoped(
            cluster,
            instance,
            &allow,
            true,
            build_oauth_client(instance, "secret", "keycloak.example.com"),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_ensure_finalizer_adds_once() {
        let cluster = FakeCluster::new();
        let instance = seeded(&cluster, &[OTHER_FINALIZER]);

        assert!(ensure_finalizer(&cluster, &instance, FINALIZER_ARGOCD).await.unwrap());
        let live: ArgoCD = cluster.object(TEST_NAMESPACE, "example").unwrap();
        assert_eq!(live.finalizers(), &[OTHER_FINALIZER, FINALIZER_ARGOCD]);

        cluster.clear_writes();
        assert!(!ensure_finalizer(&cluster, &live, FINALIZER_ARGOCD).await.unwrap());
        assert_eq!(cluster.write_count(), 0);
    }

    #[tokio::test]
    async fn test_remove_finalizer_keeps_others() {
        let cluster = FakeCluster::new();
        let instance = seeded(&cluster, &[FINALIZER_ARGOCD, OTHER_FINALIZER]);

        remove_finalizer(&cluster, &instance, FINALIZER_ARGOCD).await.unwrap();
        let live: ArgoCD = cluster.object(TEST_NAMESPACE, "example").unwrap();
        assert_eq!(live.finalizers(), &[OTHER_FINALIZER]);

        // Already absent
        cluster.clear_writes();
        remove_finalizer(&cluster, &live, FINALIZER_ARGOCD).await.unwrap();
        assert_eq!(cluster.write_count(), 0);
    }

    #[tokio::test]
    async fn test_cleanup_only_deletes_owned_objects() {
        let cluster = FakeCluster::new();
        let instance = seeded(&cluster, &[FINALIZER_ARGOCD]);
        own_cluster_objects(&cluster, &instance).await;

        let other = argocd("other", "team-b");
        converge_cluster_scoped(
            &cluster,
            &other,
            &NamespaceAllowList::all(),
            true,
            build_cluster_role(&other, COMPONENT_SERVER),
        )
        .await
        .unwrap();
        assert_eq!(cluster.count::<ClusterRole>(), 3);

        instance.cleanup(&cluster).await.unwrap();
        assert_eq!(cluster.count::<ClusterRole>(), 1);
        assert_eq!(cluster.count::<ClusterRoleBinding>(), 0);
        assert_eq!(cluster.count::<OAuthClient>(), 0);
    }

    #[tokio::test]
    async fn test_handle_deletion_releases_finalizer_after_cleanup() {
        let cluster = FakeCluster::new();
        let instance = seeded(&cluster, &[FINALIZER_ARGOCD]);
        own_cluster_objects(&cluster, &instance).await;
        cluster.clear_writes();

        handle_deletion(&cluster, &instance, FINALIZER_ARGOCD).await.unwrap();
        assert_eq!(cluster.count::<ClusterRole>(), 0);
        let live: ArgoCD = cluster.object(TEST_NAMESPACE, "example").unwrap();
        assert!(live.finalizers().is_empty());
        assert_eq!(
            cluster.writes_for("ArgoCD"),
            vec![(Op::Patch, "example".to_string())]
        );
    }

    #[tokio::test]
    async fn test_deletion_completes_without_oauth_api() {
        let cluster = FakeCluster::new();
        cluster.unserve("OAuthClient");
        let instance = seeded(&cluster, &[FINALIZER_ARGOCD]);
        let allow = NamespaceAllowList::all();
        for component in [COMPONENT_APPLICATION_CONTROLLER, COMPONENT_SERVER] {
            converge_cluster_scoped(&cluster, &instance, &allow, true, build_cluster_role(&instance, component))
                .await
                .unwrap();
        }

        handle_deletion(&cluster, &instance, FINALIZER_ARGOCD).await.unwrap();
        assert_eq!(cluster.count::<ClusterRole>(), 0);
        let live: ArgoCD = cluster.object(TEST_NAMESPACE, "example").unwrap();
        assert!(live.finalizers().is_empty());
    }

    #[tokio::test]
    async fn test_failed_cleanup_keeps_finalizer() {
        let cluster = FakeCluster::new();
        let instance = seeded(&cluster, &[FINALIZER_ARGOCD]);
        own_cluster_objects(&cluster, &instance).await;
        cluster.fail(Op::Delete, "ClusterRole");

        assert!(handle_deletion(&cluster, &instance, FINALIZER_ARGOCD)
            .await
            .is_err());
        let live: ArgoCD = cluster.object(TEST_NAMESPACE, "example").unwrap();
        assert_eq!(live.finalizers(), &[FINALIZER_ARGOCD]);
    }

    #[tokio::test]
    async fn test_deletion_without_finalizer_is_noop() {
        let cluster = FakeCluster::new();
        let instance = seeded(&cluster, &[]);
        own_cluster_objects(&cluster, &instance).await;
        cluster.clear_writes();

        handle_deletion(&cluster, &instance, FINALIZER_ARGOCD).await.unwrap();
        assert_eq!(cluster.write_count(), 0);
        assert_eq!(cluster.count::<ClusterRole>(), 2);
    }
}
