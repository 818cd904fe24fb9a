// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `merge.rs`

#[cfg(test)]
mod tests {
    use super::super::{quantity_nanos, ManagedObject};
    use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
    use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec, ResourceRequirements};
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
    use std::collections::BTreeMap;

    fn deployment(cpu: &str, memory: &str) -> Deployment {
        let requests = BTreeMap::from([
            ("cpu".to_string(), Quantity(cpu.to_string())),
            ("memory".to_string(), Quantity(memory.to_string())),
        ]);
        Deployment {
            spec: Some(DeploymentSpec {
                template: PodTemplateSpec {
                    spec: Some(PodSpec {
                        containers: vec![Container {
                            name: "argocd-server".to_string(),
                            resources: Some(ResourceRequirements {
                                requests: Some(requests),
                                ..Default::default()
                            }),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_quantity_nanos_suffixes() {
        assert_eq!(quantity_nanos("1"), Some(1_000_000_000));
        assert_eq!(quantity_nanos("0.5"), quantity_nanos("500m"));
        assert_eq!(quantity_nanos("5e-1"), quantity_nanos("500m"));
        assert_eq!(quantity_nanos(".25"), quantity_nanos("250m"));
        assert_eq!(quantity_nanos("1Ki"), quantity_nanos("1024"));
        assert_eq!(quantity_nanos("1Gi"), quantity_nanos("1024Mi"));
        assert_eq!(quantity_nanos("1k"), quantity_nanos("1e3"));
        assert_eq!(quantity_nanos("1E"), quantity_nanos("1e18"));
        assert_eq!(quantity_nanos("1u"), Some(1_000));
        assert_eq!(quantity_nanos("1n"), Some(1));
        assert_eq!(quantity_nanos("-1m"), Some(-1_000_000));
        assert_ne!(quantity_nanos("1G"), quantity_nanos("1Gi"));
    }

    #[test]
    fn test_quantity_nanos_rejects_garbage() {
        assert_eq!(quantity_nanos(""), None);
        assert_eq!(quantity_nanos("abc"), None);
        assert_eq!(quantity_nanos("1Zi"), None);
        assert_eq!(quantity_nanos("1e"), None);
        assert_eq!(quantity_nanos("1.2.3"), None);
    }

    #[test]
    fn test_canonicalised_resources_are_not_drift() {
        // What the API server stores for a user-supplied `cpu: 0.5`, `memory: 0.5Gi`
        let mut live = deployment("500m", "512Mi");
        let desired = deployment("0.5", "0.5Gi");
        assert!(!live.merge_from(&desired));
    }

    #[test]
    fn test_changed_resources_are_drift() {
        let mut live = deployment("500m", "512Mi");
        let desired = deployment("1", "512Mi");
        assert!(live.merge_from(&desired));

        let pod = live.spec.unwrap().template.spec.unwrap();
        let requests = pod.containers[0].resources.clone().unwrap().requests.unwrap();
        assert_eq!(requests["cpu"], Quantity("1".to_string()));
    }
}
