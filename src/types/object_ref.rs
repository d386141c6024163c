// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::error::{ClusterError, Result};
use kube::api::DynamicObject;
use kube::core::GroupVersionKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a single object in the cluster.
///
/// Used for addressing get/patch/update/delete calls and as the key of
/// per-object warning maps. Fields are fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectRef {
    group: String,
    version: String,
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
    name: String,
}

impl ObjectRef {
    pub fn new(gvk: &GroupVersionKind, namespace: Option<&str>, name: &str) -> Self {
        Self {
            group: gvk.group.clone(),
            version: gvk.version.clone(),
            kind: gvk.kind.clone(),
            namespace: namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
            name: name.to_string(),
        }
    }

    /// Build the reference of an object from its apiVersion, kind and metadata
    pub fn from_object(obj: &DynamicObject) -> Result<Self> {
        let types = obj
            .types
            .as_ref()
            .ok_or_else(|| ClusterError::InvalidObject("object has no apiVersion/kind".into()))?;
        let name = obj
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| ClusterError::InvalidObject(format!("{} has no metadata.name", types.kind)))?;
        let gvk = gvk_from_api_version(&types.api_version, &types.kind);
        Ok(Self::new(&gvk, obj.metadata.namespace.as_deref(), name))
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn gvk(&self) -> GroupVersionKind {
        GroupVersionKind::gvk(&self.group, &self.version, &self.kind)
    }

    pub fn api_version(&self) -> String {
        self.gvk().api_version()
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{} {}/{}", self.api_version(), self.kind, ns, self.name),
            None => write!(f, "{}/{} {}", self.api_version(), self.kind, self.name),
        }
    }
}

/// Split an apiVersion string into group and version ("v1" is the core group)
pub fn gvk_from_api_version(api_version: &str, kind: &str) -> GroupVersionKind {
    let (group, version) = api_version.split_once('/').unwrap_or(("", api_version));
    GroupVersionKind::gvk(group, version, kind)
}

/// Human readable form of a kind, "apps/v1/Deployment" or "v1/ConfigMap"
pub fn display_gvk(gvk: &GroupVersionKind) -> String {
    format!("{}/{}", gvk.api_version(), gvk.kind)
}

/// A deprecation or compatibility notice returned by the API server for one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiWarning {
    pub code: u16,
    pub agent: String,
    pub text: String,
}

impl fmt::Display for ApiWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.code, self.agent, self.text)
    }
}
