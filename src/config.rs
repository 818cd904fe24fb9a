// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator configuration.
//!
//! Every setting is a command-line flag that can also be supplied through the
//! environment, so the operator can be configured from a Deployment manifest
//! without a wrapper script.

use clap::{Parser, ValueEnum};

use crate::constants::{DEFAULT_CLUSTER_API_URL, DEFAULT_METRICS_BIND_ADDRESS};

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Compact human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Process-level configuration for the operator.
#[derive(Clone, Debug, Parser)]
#[command(name = "argocd-operator", version, about = "Kubernetes operator for Argo CD")]
pub struct OperatorConfig {
    /// Namespaces whose instances may own cluster-scoped objects (comma separated, `*` for all)
    #[arg(long, env = "ARGOCD_CLUSTER_CONFIG_NAMESPACES", default_value = "")]
    pub cluster_config_namespaces: String,

    /// Restrict the watch to a single namespace
    #[arg(long, env = "WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,

    /// Address for the metrics and health probe server
    #[arg(long, env = "METRICS_BIND_ADDRESS", default_value = DEFAULT_METRICS_BIND_ADDRESS)]
    pub metrics_bind_address: String,

    /// API server URL the keycloak broker uses to reach the cluster OAuth server
    #[arg(long, env = "CLUSTER_API_URL", default_value = DEFAULT_CLUSTER_API_URL)]
    pub cluster_api_url: String,

    /// Log output format
    #[arg(long, env = "RUST_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text, ignore_case = true)]
    pub log_format: LogFormat,
}

impl OperatorConfig {
    /// Parses the namespace allow-list from the configured value.
    #[must_use]
    pub fn allow_list(&self) -> NamespaceAllowList {
        NamespaceAllowList::parse(&self.cluster_config_namespaces)
    }
}

/// Predicate deciding which namespaces may own cluster-scoped objects.
///
/// # Example
///
/// ```rust
/// use argocd_operator::config::NamespaceAllowList;
///
/// let allow = NamespaceAllowList::parse("argocd, team-a");
/// assert!(allow.allows("team-a"));
/// assert!(!allow.allows("team-b"));
/// assert!(NamespaceAllowList::parse("*").allows("anything"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NamespaceAllowList {
    entries: Vec<String>,
}

impl NamespaceAllowList {
    /// Parses a comma-separated list. Whitespace is trimmed and empty entries ignored.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let entries = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self { entries }
    }

    /// Allow-list that admits every namespace.
    #[must_use]
    pub fn all() -> Self {
        Self {
            entries: vec!["*".to_string()],
        }
    }

    /// True when `namespace` is listed or the list contains `*`.
    #[must_use]
    pub fn allows(&self, namespace: &str) -> bool {
        self.entries.iter().any(|e| e == "*" || e == namespace)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
