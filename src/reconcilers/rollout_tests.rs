// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `rollout`

#[cfg(test)]
mod tests {
    use crate::argocd_resources::workloads::{build_application_controller, build_server_deployment};
    use crate::cluster::fake::{argocd, FakeCluster, Op};
    use crate::labels::{ROLLOUT_REPO_TLS_CHANGED, ROLLOUT_SECRET_CHANGED};
    use crate::reconcilers::rollout::{
        argocd_secret_consumers, repo_tls_consumers, rollout_timestamp, trigger_rollout,
        trigger_rollouts, WorkloadRef,
    };
    use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};

    const NS: &str = "argocd";

    fn template_label(deployment: &Deployment, key: &str) -> Option<String> {
        deployment
            .spec
            .as_ref()?
            .template
            .metadata
            .as_ref()?
            .labels
            .as_ref()?
            .get(key)
            .cloned()
    }

    #[test]
    fn test_timestamp_is_label_safe() {
        let ts = rollout_timestamp();
        assert_eq!(ts.len(), "20250101-120000.000".len());
        assert!(ts
            .chars()
            .all(|c| c.is_ascii_digit() || c == '-' || c == '.'));
    }

    #[test]
    fn test_consumer_lists() {
        let instance = argocd("example", NS);
        let names: Vec<String> = argocd_secret_consumers(&instance)
            .into_iter()
            .map(|w| w.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "example-server",
                "example-repo-server",
                "example-application-controller"
            ]
        );
        assert_eq!(repo_tls_consumers(&instance).len(), 3);
    }

    #[tokio::test]
    async fn test_absent_workload_is_noop() {
        let cluster = FakeCluster::new();
        let restarted = trigger_rollout(
            &cluster,
            NS,
            &WorkloadRef::deployment("example-server"),
            ROLLOUT_SECRET_CHANGED,
        )
        .await
        .unwrap();
        assert!(!restarted);
        assert_eq!(cluster.write_count(), 0);
    }

    #[tokio::test]
    async fn test_rollout_stamps_template_label() {
        let cluster = FakeCluster::new();
        let instance = argocd("example", NS);
        cluster.seed(NS, &build_server_deployment(&instance));

        let restarted = trigger_rollout(
            &cluster,
            NS,
            &WorkloadRef::deployment("example-server"),
            ROLLOUT_SECRET_CHANGED,
        )
        .await
        .unwrap();
        assert!(restarted);
        assert_eq!(
            cluster.writes_for("Deployment"),
            vec![(Op::Replace, "example-server".to_string())]
        );

        let live: Deployment = cluster.object(NS, "example-server").unwrap();
        assert!(template_label(&live, ROLLOUT_SECRET_CHANGED).is_some());
        // Existing template labels are kept
        assert!(template_label(&live, "app.kubernetes.io/name").is_some());
    }

    #[tokio::test]
    async fn test_rollouts_cover_stateful_sets() {
        let cluster = FakeCluster::new();
        let instance = argocd("example", NS);
        cluster.seed(NS, &build_server_deployment(&instance));
        cluster.seed(NS, &build_application_controller(&instance));

        let restarted = trigger_rollouts(
            &cluster,
            NS,
            &repo_tls_consumers(&instance),
            ROLLOUT_REPO_TLS_CHANGED,
        )
        .await
        .unwrap();
        // The repo server deployment does not exist yet
        assert_eq!(restarted, 2);

        let controller: StatefulSet = cluster
            .object(NS, "example-application-controller")
            .unwrap();
        let labels = controller.spec.unwrap().template.metadata.unwrap().labels.unwrap();
        assert!(labels.contains_key(ROLLOUT_REPO_TLS_CHANGED));
    }
}
