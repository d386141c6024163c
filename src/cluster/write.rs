// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Write operations: server-side apply, full update and delete.
//!
//! The handle's dry-run flag, or a per-call `force_dry_run`, sends the
//! request with `dryRun=All` so the server validates without persisting.

use super::K8sCluster;
use crate::constants::FIELD_MANAGER;
use crate::error::{ClusterError, Result};
use crate::types::{ApiWarning, DeleteOptions, ObjectRef, PatchOptions, UpdateOptions};
use kube::api::{DeleteParams, DynamicObject, Patch, PatchParams, PostParams};
use tracing::{debug, info, instrument, trace};

impl K8sCluster {
    /// Server-side apply `obj` after applying the compatibility fixes
    #[instrument(skip(self, obj, opts), fields(force_apply = opts.force_apply))]
    pub async fn patch_object(
        &self,
        obj: &DynamicObject,
        opts: &PatchOptions,
    ) -> Result<(DynamicObject, Vec<ApiWarning>)> {
        let object_ref = ObjectRef::from_object(obj)?;
        let mapping = self.resources.resolve_kind(&object_ref.gvk())?;

        let value = serde_json::to_value(obj)?;
        let value = self.fix_object_for_patch(&value).into_owned();

        let mut params = PatchParams::apply(FIELD_MANAGER);
        if opts.force_apply {
            params = params.force();
        }
        params.dry_run = self.effective_dry_run(opts.force_dry_run);
        trace!("Patching {} (dry_run={})", object_ref, params.dry_run);

        self.pool
            .with_client(&self.cancel, |client| async move {
                mapping
                    .dynamic_api(client, object_ref.namespace())
                    .patch(object_ref.name(), &params, &Patch::Apply(&value))
                    .await
                    .map_err(|e| ClusterError::api("patch", &object_ref, e))
            })
            .await
    }

    /// Replace `obj` as a whole
    #[instrument(skip(self, obj, opts))]
    pub async fn update_object(
        &self,
        obj: &DynamicObject,
        opts: &UpdateOptions,
    ) -> Result<(DynamicObject, Vec<ApiWarning>)> {
        let object_ref = ObjectRef::from_object(obj)?;
        let mapping = self.resources.resolve_kind(&object_ref.gvk())?;

        let params = PostParams {
            dry_run: self.effective_dry_run(opts.force_dry_run),
            field_manager: Some(FIELD_MANAGER.to_string()),
        };
        trace!("Updating {} (dry_run={})", object_ref, params.dry_run);

        self.pool
            .with_client(&self.cancel, |client| async move {
                mapping
                    .dynamic_api(client, object_ref.namespace())
                    .replace(object_ref.name(), &params, obj)
                    .await
                    .map_err(|e| ClusterError::api("update", &object_ref, e))
            })
            .await
    }

    /// Delete one object with foreground propagation.
    ///
    /// Unless dry-running or asked not to wait, returns only once the object
    /// is gone. Cancellation while waiting yields [`ClusterError::DeletionTimeout`].
    #[instrument(skip(self, object_ref, opts), fields(object = %object_ref))]
    pub async fn delete_single_object(
        &self,
        object_ref: &ObjectRef,
        opts: &DeleteOptions,
    ) -> Result<Vec<ApiWarning>> {
        let mapping = self.resources.resolve_kind(&object_ref.gvk())?;
        let dry_run = self.effective_dry_run(opts.force_dry_run);

        let mut params = DeleteParams::foreground();
        params.dry_run = dry_run;
        let ignore_not_found = opts.ignore_not_found;

        let ((), warnings) = self
            .pool
            .with_client(&self.cancel, |client| async move {
                let deleted = mapping
                    .dynamic_api(client, object_ref.namespace())
                    .delete(object_ref.name(), &params)
                    .await;
                match deleted {
                    Ok(_) => Ok(()),
                    Err(e) => {
                        let err = ClusterError::api("delete", object_ref, e);
                        if ignore_not_found && err.is_not_found() {
                            debug!("{} already gone", object_ref);
                            Ok(())
                        } else {
                            Err(err)
                        }
                    }
                }
            })
            .await?;

        if !dry_run && !opts.no_wait {
            self.wait_for_deletion(object_ref).await?;
        }
        info!("Deleted {}{}", object_ref, if dry_run { " (dry-run)" } else { "" });

        Ok(warnings)
    }

    async fn wait_for_deletion(&self, object_ref: &ObjectRef) -> Result<()> {
        loop {
            match self.get_single_object(object_ref).await {
                Ok(_) => trace!("{} still present", object_ref),
                Err(e) if e.is_not_found() => return Ok(()),
                Err(e) if e.is_cancelled() => {
                    return Err(ClusterError::DeletionTimeout(object_ref.clone()))
                }
                Err(e) => return Err(e),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.delete_poll_interval) => {}
                _ = self.cancel.cancelled() => {
                    return Err(ClusterError::DeletionTimeout(object_ref.clone()));
                }
            }
        }
    }
}
