// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the Argo CD operator.
//!
//! All metrics carry the `argocd_operator_` prefix and are exposed on `/metrics`
//! by the probe server started in `main`.
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - Passes per instance and their duration
//! - **Object Metrics** - Writes performed by the convergence engine, by kind
//! - **Rollout Metrics** - Restarts forced through pod template labels
//! - **SSO Metrics** - Keycloak realm configuration calls
//!
//! # Example
//!
//! ```rust,no_run
//! use argocd_operator::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success(std::time::Duration::from_secs(1));
//! ```

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all operator metrics
const METRICS_NAMESPACE: &str = "argocd_operator";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliation passes by outcome
///
/// Labels:
/// - `status`: Outcome (`success`, `error`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of reconciliation passes by outcome",
    );
    let counter = CounterVec::new(opts, &["status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconciliation passes in seconds
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliation passes in seconds",
    )
    .buckets(vec![0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram = HistogramVec::new(opts, &["status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Object Metrics
// ============================================================================

/// Total number of object writes by kind and action
///
/// Labels:
/// - `kind`: Object kind (e.g., `Deployment`, `Secret`)
/// - `action`: `created`, `updated`, `recreated` or `deleted`
pub static OBJECT_WRITES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_object_writes_total"),
        "Total number of object writes by kind and action",
    );
    let counter = CounterVec::new(opts, &["kind", "action"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Rollout Metrics
// ============================================================================

/// Total number of forced rollouts
///
/// Labels:
/// - `workload`: Workload name
/// - `trigger`: Pod template label that was bumped
pub static ROLLOUTS_TRIGGERED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_rollouts_triggered_total"),
        "Total number of forced workload rollouts",
    );
    let counter = CounterVec::new(opts, &["workload", "trigger"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// SSO Metrics
// ============================================================================

/// Total number of keycloak realm configuration calls by result
///
/// Labels:
/// - `result`: `created`, `exists` or `error`
pub static REALM_CONFIGURATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_realm_configurations_total"),
        "Total number of keycloak realm configuration calls by result",
    );
    let counter = CounterVec::new(opts, &["result"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Record a successful reconciliation pass
pub fn record_reconciliation_success(duration: Duration) {
    RECONCILIATION_TOTAL.with_label_values(&["success"]).inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&["success"])
        .observe(duration.as_secs_f64());
}

/// Record a failed reconciliation pass
pub fn record_reconciliation_error(duration: Duration) {
    RECONCILIATION_TOTAL.with_label_values(&["error"]).inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&["error"])
        .observe(duration.as_secs_f64());
}

/// Record an object write performed by the convergence engine
///
/// # Arguments
/// * `kind` - The kind of object written
/// * `action` - `created`, `updated`, `recreated` or `deleted`
pub fn record_object_write(kind: &str, action: &str) {
    OBJECT_WRITES_TOTAL.with_label_values(&[kind, action]).inc();
}

/// Record a forced rollout
pub fn record_rollout(workload: &str, trigger: &str) {
    ROLLOUTS_TRIGGERED_TOTAL
        .with_label_values(&[workload, trigger])
        .inc();
}

/// Record a realm configuration call
pub fn record_realm_configuration(result: &str) {
    REALM_CONFIGURATIONS_TOTAL
        .with_label_values(&[result])
        .inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_reconciliation_success() {
        record_reconciliation_success(Duration::from_millis(500));

        let counter = RECONCILIATION_TOTAL.with_label_values(&["success"]);
        assert!(counter.get() > 0.0);

        let histogram = RECONCILIATION_DURATION_SECONDS.with_label_values(&["success"]);
        assert!(histogram.get_sample_count() > 0);
    }

    #[test]
    fn test_record_object_write() {
        record_object_write("TestKind", "created");
        let counter = OBJECT_WRITES_TOTAL.with_label_values(&["TestKind", "created"]);
        assert!(counter.get() > 0.0);
    }

    #[test]
    fn test_gather_metrics_includes_prefix() {
        record_realm_configuration("created");
        record_rollout("test-server", "argocd.argoproj.io/tls-changed");
        let text = gather_metrics().unwrap();
        assert!(text.contains("argocd_operator_realm_configurations_total"));
        assert!(text.contains("argocd_operator_rollouts_triggered_total"));
    }
}
