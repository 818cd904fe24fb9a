// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for operator configuration

#[cfg(test)]
mod tests {
    use crate::config::{LogFormat, NamespaceAllowList, OperatorConfig};
    use clap::Parser;

    #[test]
    fn test_allow_list_trims_and_skips_empty_entries() {
        let allow = NamespaceAllowList::parse(" argocd , ,team-a,");
        assert!(allow.allows("argocd"));
        assert!(allow.allows("team-a"));
        assert!(!allow.allows(""));
        assert!(!allow.allows("team-b"));
    }

    #[test]
    fn test_allow_list_wildcard_admits_everything() {
        let allow = NamespaceAllowList::parse("team-a,*");
        assert!(allow.allows("kube-system"));
        assert!(NamespaceAllowList::all().allows("x"));
    }

    #[test]
    fn test_empty_allow_list_admits_nothing() {
        let allow = NamespaceAllowList::parse("");
        assert!(allow.is_empty());
        assert!(!allow.allows("argocd"));
    }

    #[test]
    fn test_allow_list_requires_exact_match() {
        let allow = NamespaceAllowList::parse("argo");
        assert!(!allow.allows("argocd"));
    }

    #[test]
    fn test_operator_config_defaults() {
        let config = OperatorConfig::try_parse_from(["argocd-operator"]).unwrap();
        assert_eq!(config.metrics_bind_address, "0.0.0.0:8080");
        assert_eq!(config.cluster_api_url, "https://kubernetes.default.svc");
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.watch_namespace.is_none());
    }

    #[test]
    fn test_operator_config_flags() {
        let config = OperatorConfig::try_parse_from([
            "argocd-operator",
            "--cluster-config-namespaces",
            "argocd,ops",
            "--log-format",
            "json",
            "--watch-namespace",
            "argocd",
        ])
        .unwrap();
        assert!(config.allow_list().allows("ops"));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.watch_namespace.as_deref(), Some("argocd"));
    }
}
