// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Platform capability discovery.
//!
//! Some features depend on API groups that only exist on OpenShift: routes
//! and the template service used to deploy the keycloak broker. Discovery runs
//! once at startup and the result is passed to every reconciliation pass.

use anyhow::{Context as _, Result};
use kube::Client;
use tracing::info;

use crate::constants::{ROUTE_API_GROUP, TEMPLATE_API_GROUP};

/// Optional API groups available on the cluster.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlatformCapabilities {
    /// `template.openshift.io` is served (template instantiation).
    pub templates: bool,
    /// `route.openshift.io` is served.
    pub routes: bool,
}

impl PlatformCapabilities {
    /// Capabilities of an OpenShift cluster.
    #[must_use]
    pub fn openshift() -> Self {
        Self {
            templates: true,
            routes: true,
        }
    }

    /// Derives capabilities from a list of served API group names.
    #[must_use]
    pub fn from_groups<'a>(groups: impl IntoIterator<Item = &'a str>) -> Self {
        groups
            .into_iter()
            .fold(Self::default(), |mut caps, group| {
                match group {
                    TEMPLATE_API_GROUP => caps.templates = true,
                    ROUTE_API_GROUP => caps.routes = true,
                    _ => {}
                }
                caps
            })
    }

    /// Queries the API server for served groups.
    ///
    /// # Errors
    ///
    /// Returns an error if the discovery request fails.
    pub async fn discover(client: &Client) -> Result<Self> {
        let groups = client
            .list_api_groups()
            .await
            .context("failed to list API groups")?;
        let caps = Self::from_groups(groups.groups.iter().map(|g| g.name.as_str()));
        info!(
            templates = caps.templates,
            routes = caps.routes,
            "Discovered platform capabilities"
        );
        Ok(caps)
    }
}

#[cfg(test)]
#[path = "capabilities_tests.rs"]
mod capabilities_tests;
