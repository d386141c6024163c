// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Concurrency-safe handle on one cluster's API surface.

pub mod fanout;
pub mod patch_fixes;
pub mod proxy;
pub mod query;
pub mod write;

use crate::config::Config;
use crate::error::{ClusterError, Result};
use crate::kubernetes::{
    load_kube_config, parse_server_version, ClientConnector, ClientPool, KubeConfigConnector,
    ResourceResolver,
};
use semver::Version;
use serde_json::Value;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

pub use fanout::FanOut;
pub use patch_fixes::fix_object_for_patch;

/// Handle on one cluster.
///
/// Cloning is cheap: clones share the client pool and the resource resolver.
/// Every blocking wait of an operation ends when the handle's cancellation
/// token fires.
#[derive(Clone)]
pub struct K8sCluster {
    dry_run: bool,
    cancel: CancellationToken,
    delete_poll_interval: Duration,
    pool: Arc<ClientPool>,
    resources: Arc<ResourceResolver>,
    server_version: Version,
    ca_certificates: Option<Arc<Vec<Vec<u8>>>>,
}

impl K8sCluster {
    /// Connect using the kubeconfig selected by `config`
    #[instrument(skip(config, cancel), fields(context = ?config.context, dry_run = config.dry_run))]
    pub async fn connect(config: &Config, cancel: CancellationToken) -> Result<Self> {
        let kube_config = load_kube_config(config).await?;
        let ca_certificates = kube_config.root_cert.clone().map(Arc::new);

        let mut cluster =
            Self::with_connector(KubeConfigConnector::new(kube_config), config, cancel).await?;
        cluster.ca_certificates = ca_certificates;
        Ok(cluster)
    }

    /// Build a handle on top of any client connector.
    ///
    /// Fills the pool, detects the server version and runs discovery.
    pub async fn with_connector(
        connector: impl ClientConnector + 'static,
        config: &Config,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let pool = Arc::new(ClientPool::new(connector, config.pool_size)?);

        let (version_info, _) = pool
            .with_client(&cancel, |client| async move {
                client.apiserver_version().await.map_err(ClusterError::from)
            })
            .await?;
        let server_version = parse_server_version(&version_info)?;
        info!("Connected to Kubernetes {}", server_version);

        let (resources, _) = pool
            .with_client(&cancel, ResourceResolver::discover)
            .await?;

        Ok(Self {
            dry_run: config.dry_run,
            cancel,
            delete_poll_interval: config.delete_poll_interval,
            pool,
            resources: Arc::new(resources),
            server_version,
            ca_certificates: None,
        })
    }

    /// Clone of this handle that performs real writes
    pub fn read_write(&self) -> Self {
        Self {
            dry_run: false,
            ..self.clone()
        }
    }

    /// Clone of this handle whose waits end when `cancel` fires
    pub fn with_cancellation(&self, cancel: CancellationToken) -> Self {
        Self {
            cancel,
            ..self.clone()
        }
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn server_version(&self) -> &Version {
        &self.server_version
    }

    /// DER encoded CA certificates of the connection, if the kubeconfig carries any
    pub fn ca_certificates(&self) -> Option<&[Vec<u8>]> {
        self.ca_certificates.as_deref().map(Vec::as_slice)
    }

    pub fn resources(&self) -> &ResourceResolver {
        &self.resources
    }

    /// Re-run discovery; without `force` a recent snapshot is kept
    pub async fn refresh_resources(&self, force: bool) -> Result<bool> {
        let resources = self.resources.clone();
        let (refreshed, _) = self
            .pool
            .with_client(&self.cancel, |client| async move {
                resources.refresh(client, force).await
            })
            .await?;
        Ok(refreshed)
    }

    /// Drop and rebuild every pooled client, waiting for all checkouts to return
    pub async fn reinitialize_pool(&self) -> Result<()> {
        self.pool.reinitialize(&self.cancel).await
    }

    /// Apply the version-gated compatibility fixes of this cluster to an object
    pub fn fix_object_for_patch<'a>(&self, obj: &'a Value) -> Cow<'a, Value> {
        fix_object_for_patch(obj, &self.server_version)
    }

    fn effective_dry_run(&self, force_dry_run: bool) -> bool {
        self.dry_run || force_dry_run
    }
}
