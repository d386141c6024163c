// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resource kind resolution backed by API discovery.
//!
//! Discovery results are held in an immutable [`ResourceSnapshot`]. A refresh
//! builds a complete new snapshot and swaps it in, so concurrent readers see
//! either the old or the new view and never a mix of both.

use crate::constants::discovery::{DEPRECATED_KINDS, MIN_REFRESH_AGE};
use crate::error::{ClusterError, Result};
use crate::types::display_gvk;
use crate::utils::{read, write};
use kube::api::{Api, DynamicObject};
use kube::core::GroupVersionKind;
use kube::discovery::{ApiCapabilities, ApiResource, Scope};
use kube::{Client, Discovery};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tracing::{debug, info, instrument};

/// How a kind is addressed on the API server
#[derive(Debug, Clone)]
pub struct ResourceMapping {
    pub api_resource: ApiResource,
    pub namespaced: bool,
    pub verbs: Vec<String>,
}

impl ResourceMapping {
    pub fn new(api_resource: ApiResource, namespaced: bool, verbs: Vec<String>) -> Self {
        Self {
            api_resource,
            namespaced,
            verbs,
        }
    }

    fn from_discovered(api_resource: ApiResource, caps: &ApiCapabilities) -> Self {
        Self::new(
            api_resource,
            matches!(caps.scope, Scope::Namespaced),
            caps.operations.clone(),
        )
    }

    pub fn gvk(&self) -> GroupVersionKind {
        GroupVersionKind::gvk(
            &self.api_resource.group,
            &self.api_resource.version,
            &self.api_resource.kind,
        )
    }

    pub fn supports_verb(&self, verb: &str) -> bool {
        self.verbs.iter().any(|v| v == verb)
    }

    /// Dynamic API for this kind.
    ///
    /// Cluster scoped kinds ignore `namespace`; namespaced kinds without one
    /// address all namespaces.
    pub fn dynamic_api(&self, client: Client, namespace: Option<&str>) -> Api<DynamicObject> {
        match namespace.filter(|_| self.namespaced) {
            Some(ns) => Api::namespaced_with(client, ns, &self.api_resource),
            None => Api::all_with(client, &self.api_resource),
        }
    }
}

/// One consistent discovery result
#[derive(Debug)]
pub struct ResourceSnapshot {
    mappings: HashMap<GroupVersionKind, ResourceMapping>,
    preferred: Vec<GroupVersionKind>,
    fetched_at: Instant,
}

impl ResourceSnapshot {
    /// Build a snapshot from all known mappings and the kinds of each group's preferred version
    pub fn from_parts(
        mappings: impl IntoIterator<Item = ResourceMapping>,
        preferred: impl IntoIterator<Item = GroupVersionKind>,
    ) -> Self {
        let mappings: HashMap<_, _> = mappings.into_iter().map(|m| (m.gvk(), m)).collect();
        let preferred: BTreeSet<_> = preferred
            .into_iter()
            .filter(|gvk| mappings.contains_key(gvk) && !is_deprecated(gvk))
            .map(|gvk| (gvk.group.clone(), gvk.version.clone(), gvk.kind.clone()))
            .collect();

        Self {
            mappings,
            preferred: preferred
                .into_iter()
                .map(|(g, v, k)| GroupVersionKind::gvk(&g, &v, &k))
                .collect(),
            fetched_at: Instant::now(),
        }
    }

    fn from_discovery(discovery: &Discovery) -> Self {
        let mut mappings = Vec::new();
        let mut preferred = Vec::new();

        for group in discovery.groups() {
            // every served version stays resolvable, not only the preferred one
            for version in group.versions() {
                for (ar, caps) in group.versioned_resources(version) {
                    mappings.push(ResourceMapping::from_discovered(ar, &caps));
                }
            }
            for (ar, _) in group.recommended_resources() {
                preferred.push(GroupVersionKind::gvk(&ar.group, &ar.version, &ar.kind));
            }
        }

        Self::from_parts(mappings, preferred)
    }

    pub fn get(&self, gvk: &GroupVersionKind) -> Option<&ResourceMapping> {
        self.mappings.get(gvk)
    }

    /// Preferred-version kinds supporting at least one of `verbs`
    pub fn kinds_supporting_verbs(&self, verbs: &[&str]) -> Vec<GroupVersionKind> {
        self.preferred
            .iter()
            .filter(|gvk| {
                self.mappings
                    .get(*gvk)
                    .is_some_and(|m| verbs.iter().any(|v| m.supports_verb(v)))
            })
            .cloned()
            .collect()
    }

    /// Number of discovered kinds across every served version
    pub fn kind_count(&self) -> usize {
        self.mappings.len()
    }

    pub fn age(&self) -> std::time::Duration {
        self.fetched_at.elapsed()
    }
}

fn is_deprecated(gvk: &GroupVersionKind) -> bool {
    DEPRECATED_KINDS
        .iter()
        .any(|(group, kind)| gvk.group == *group && gvk.kind == *kind)
}

/// Thread-safe resolver over the current discovery snapshot
pub struct ResourceResolver {
    snapshot: RwLock<Arc<ResourceSnapshot>>,
}

impl ResourceResolver {
    pub fn new(snapshot: ResourceSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Run full discovery against the cluster
    #[instrument(skip(client))]
    pub async fn discover(client: Client) -> Result<Self> {
        Ok(Self::new(fetch_snapshot(client).await?))
    }

    /// Current snapshot, stable for as long as the caller holds it
    pub fn snapshot(&self) -> Arc<ResourceSnapshot> {
        read(&self.snapshot).clone()
    }

    /// Replace the snapshot wholesale
    pub fn install(&self, snapshot: ResourceSnapshot) {
        *write(&self.snapshot) = Arc::new(snapshot);
    }

    pub fn resolve_kind(&self, gvk: &GroupVersionKind) -> Result<ResourceMapping> {
        self.snapshot()
            .get(gvk)
            .cloned()
            .ok_or_else(|| ClusterError::NoMatchingKind(display_gvk(gvk)))
    }

    pub fn kinds_supporting_verbs(&self, verbs: &[&str]) -> Vec<GroupVersionKind> {
        self.snapshot().kinds_supporting_verbs(verbs)
    }

    /// Re-run discovery, skipped when not forced and the snapshot is still fresh.
    ///
    /// Returns whether a new snapshot was installed.
    #[instrument(skip(self, client))]
    pub async fn refresh(&self, client: Client, force: bool) -> Result<bool> {
        let age = self.snapshot().age();
        if !force && age < MIN_REFRESH_AGE {
            debug!("Skipping discovery refresh, snapshot is {:?} old", age);
            return Ok(false);
        }

        let snapshot = fetch_snapshot(client).await?;
        self.install(snapshot);
        Ok(true)
    }
}

async fn fetch_snapshot(client: Client) -> Result<ResourceSnapshot> {
    let discovery = Discovery::new(client).run().await?;
    let snapshot = ResourceSnapshot::from_discovery(&discovery);
    info!(
        "Discovered {} resource kinds ({} preferred)",
        snapshot.kind_count(),
        snapshot.preferred.len()
    );
    Ok(snapshot)
}
