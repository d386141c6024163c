// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Read operations: single kind lists, cross-kind fan-out and lookups by reference.

use super::{FanOut, K8sCluster};
use crate::constants::fanout::{GET_BY_REFS_WORKERS, LIST_ALL_WORKERS};
use crate::error::{ClusterError, Result};
use crate::types::{display_gvk, ApiWarning, ListOptions, ObjectRef};
use crate::utils::lock;
use kube::api::{DynamicObject, ListParams, TypeMeta};
use kube::core::GroupVersionKind;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, instrument, trace};

/// Objects of several kinds together with the warnings of each kind
pub type ObjectsByKind = (Vec<DynamicObject>, HashMap<GroupVersionKind, Vec<ApiWarning>>);

/// Objects fetched by reference together with the warnings of each reference
pub type ObjectsByRef = (Vec<DynamicObject>, HashMap<ObjectRef, Vec<ApiWarning>>);

fn list_params(opts: &ListOptions) -> ListParams {
    let selector = opts.label_selector();
    if selector.is_empty() {
        ListParams::default()
    } else {
        ListParams::default().labels(&selector)
    }
}

fn type_meta(gvk: &GroupVersionKind) -> TypeMeta {
    TypeMeta {
        api_version: gvk.api_version(),
        kind: gvk.kind.clone(),
    }
}

/// Outcomes that mean "nothing there" rather than failure
fn is_absent(err: &ClusterError) -> bool {
    err.is_not_found() || err.is_no_match()
}

impl K8sCluster {
    /// List the objects of one kind, in one namespace or in all of them
    #[instrument(skip(self, opts), fields(kind = %display_gvk(gvk)))]
    pub async fn list_objects(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&str>,
        opts: &ListOptions,
    ) -> Result<(Vec<DynamicObject>, Vec<ApiWarning>)> {
        let mapping = self.resources.resolve_kind(gvk)?;
        let params = list_params(opts);

        let (list, warnings) = self
            .pool
            .with_client(&self.cancel, |client| async move {
                mapping
                    .dynamic_api(client, namespace)
                    .list(&params)
                    .await
                    .map_err(|e| ClusterError::api("list", display_gvk(gvk), e))
            })
            .await?;

        let objects = list
            .items
            .into_iter()
            .map(|mut obj| {
                if obj.types.is_none() {
                    obj.types = Some(type_meta(gvk));
                }
                obj
            })
            .collect::<Vec<_>>();
        trace!("Listed {} objects", objects.len());

        Ok((objects, warnings))
    }

    /// List only the metadata of one kind's objects.
    ///
    /// The returned objects carry the requested apiVersion and kind and an empty body.
    #[instrument(skip(self, opts), fields(kind = %display_gvk(gvk)))]
    pub async fn list_objects_metadata_only(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&str>,
        opts: &ListOptions,
    ) -> Result<(Vec<DynamicObject>, Vec<ApiWarning>)> {
        let mapping = self.resources.resolve_kind(gvk)?;
        let params = list_params(opts);

        let (list, warnings) = self
            .pool
            .with_client(&self.cancel, |client| async move {
                mapping
                    .dynamic_api(client, namespace)
                    .list_metadata(&params)
                    .await
                    .map_err(|e| ClusterError::api("list", display_gvk(gvk), e))
            })
            .await?;

        let objects = list
            .items
            .into_iter()
            .map(|item| DynamicObject {
                types: Some(type_meta(gvk)),
                metadata: item.metadata,
                data: serde_json::json!({}),
            })
            .collect();

        Ok((objects, warnings))
    }

    /// List every preferred kind supporting one of `verbs`.
    ///
    /// Kinds that disappear or turn out to be unknown while listing are skipped.
    #[instrument(skip(self, opts))]
    pub async fn list_all_objects(
        &self,
        verbs: &[&str],
        namespace: Option<&str>,
        opts: &ListOptions,
        metadata_only: bool,
    ) -> Result<ObjectsByKind> {
        let kinds = self.resources.kinds_supporting_verbs(verbs);
        debug!("Listing objects of {} kinds", kinds.len());

        let acc: Arc<Mutex<ObjectsByKind>> = Arc::default();
        let mut fan_out = FanOut::new(LIST_ALL_WORKERS, &self.cancel);

        for gvk in kinds {
            let cluster = self.clone();
            let namespace = namespace.map(str::to_string);
            let opts = opts.clone();
            let acc = acc.clone();

            fan_out.submit(async move {
                let listed = if metadata_only {
                    cluster
                        .list_objects_metadata_only(&gvk, namespace.as_deref(), &opts)
                        .await
                } else {
                    cluster.list_objects(&gvk, namespace.as_deref(), &opts).await
                };

                let (objects, warnings) = match listed {
                    Ok(listed) => listed,
                    Err(e) if is_absent(&e) => {
                        trace!("Skipping {}: {}", display_gvk(&gvk), e);
                        return Ok(());
                    }
                    Err(e) => return Err(e),
                };

                let mut acc = lock(&acc);
                acc.0.extend(objects);
                if !warnings.is_empty() {
                    acc.1.insert(gvk, warnings);
                }
                Ok(())
            });
        }

        fan_out.wait().await?;
        let merged = std::mem::take(&mut *lock(&acc));
        Ok(merged)
    }

    #[instrument(skip(self, object_ref), fields(object = %object_ref))]
    pub async fn get_single_object(
        &self,
        object_ref: &ObjectRef,
    ) -> Result<(DynamicObject, Vec<ApiWarning>)> {
        let mapping = self.resources.resolve_kind(&object_ref.gvk())?;

        self.pool
            .with_client(&self.cancel, |client| async move {
                mapping
                    .dynamic_api(client, object_ref.namespace())
                    .get(object_ref.name())
                    .await
                    .map_err(|e| ClusterError::api("get", object_ref, e))
            })
            .await
    }

    /// Fetch many objects concurrently.
    ///
    /// References that don't exist, or whose kind is unknown, are left out of
    /// the result and of the warnings.
    #[instrument(skip(self, refs), fields(count = refs.len()))]
    pub async fn get_objects_by_refs(&self, refs: &[ObjectRef]) -> Result<ObjectsByRef> {
        let acc: Arc<Mutex<ObjectsByRef>> = Arc::default();
        let mut fan_out = FanOut::new(GET_BY_REFS_WORKERS, &self.cancel);

        for object_ref in refs {
            let cluster = self.clone();
            let object_ref = object_ref.clone();
            let acc = acc.clone();

            fan_out.submit(async move {
                let (object, warnings) = match cluster.get_single_object(&object_ref).await {
                    Ok(found) => found,
                    Err(e) if is_absent(&e) => {
                        trace!("Skipping {}: {}", object_ref, e);
                        return Ok(());
                    }
                    Err(e) => return Err(e),
                };

                let mut acc = lock(&acc);
                acc.0.push(object);
                if !warnings.is_empty() {
                    acc.1.insert(object_ref, warnings);
                }
                Ok(())
            });
        }

        fan_out.wait().await?;
        let merged = std::mem::take(&mut *lock(&acc));
        Ok(merged)
    }
}
