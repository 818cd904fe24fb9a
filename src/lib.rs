// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # argocd-operator - Argo CD Operator for Kubernetes
//!
//! A Kubernetes operator written in Rust that manages the full lifecycle of
//! Argo CD installations declared through the `ArgoCD` custom resource.
//!
//! ## Overview
//!
//! For every `ArgoCD` instance the operator converges:
//!
//! - Service accounts, roles and (for allowed namespaces) cluster roles
//! - An internal certificate authority and the server and repo server certificates
//! - The Argo CD secrets and config maps
//! - Services, workloads, the autoscaler, ingresses and OpenShift routes
//! - An optional keycloak broker and realm for single sign-on
//!
//! ## Modules
//!
//! - [`crd`] - The `ArgoCD` resource and the OpenShift kinds it interacts with
//! - [`reconcilers`] - Reconciliation logic
//! - [`argocd_resources`] - Builders for every dependent object
//! - [`cluster`] - Cluster access and platform capability discovery
//! - [`pki`] - Certificate generation and verification
//! - [`config`] - Command-line and environment configuration
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use argocd_operator::crd::{ArgoCD, ArgoCDSpec};
//!
//! // An empty spec yields a working single-replica installation
//! let instance = ArgoCD::new("example", ArgoCDSpec::default());
//! assert!(instance.spec.redis.is_enabled());
//! ```

pub mod argocd_resources;
pub mod cluster;
pub mod config;
pub mod constants;
pub mod crd;
pub mod errors;
pub mod labels;
pub mod metrics;
pub mod pki;
pub mod reconcilers;
