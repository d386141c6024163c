// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Client construction and kubeconfig loading

use crate::config::Config;
use crate::error::{ClusterError, Result};
use crate::kubernetes::warnings::{WarningLayer, WarningSink};
use kube::{
    client::ClientBuilder,
    config::{KubeConfigOptions, Kubeconfig},
    Client, Config as KConfig,
};
use tracing::{debug, info, instrument};

/// Builds the low-level client of one pool entry.
///
/// Every call must produce a client with its own transport whose response
/// warnings end up in the given sink.
pub trait ClientConnector: Send + Sync {
    fn connect(&self, warnings: WarningSink) -> Result<Client>;
}

impl<F> ClientConnector for F
where
    F: Fn(WarningSink) -> Result<Client> + Send + Sync,
{
    fn connect(&self, warnings: WarningSink) -> Result<Client> {
        self(warnings)
    }
}

/// Connector backed by a resolved kube client configuration
pub struct KubeConfigConnector {
    config: KConfig,
}

impl KubeConfigConnector {
    pub fn new(config: KConfig) -> Self {
        Self { config }
    }
}

impl ClientConnector for KubeConfigConnector {
    fn connect(&self, warnings: WarningSink) -> Result<Client> {
        let builder = ClientBuilder::try_from(self.config.clone())
            .map_err(|e| ClusterError::ClientBuild(format!("Failed to create client: {}", e)))?;
        Ok(builder.with_layer(&WarningLayer::new(warnings)).build())
    }
}

/// Resolve the kube client configuration for the target cluster
#[instrument(skip(config), fields(context = ?config.context))]
pub async fn load_kube_config(config: &Config) -> Result<KConfig> {
    let options = KubeConfigOptions {
        context: config.context.clone(),
        ..Default::default()
    };

    if let Some(data) = &config.kubeconfig_data {
        debug!("Using inline kubeconfig");
        return kube_config_from_yaml(data, &options).await;
    }

    let kube_config = if config.context.is_some() {
        KConfig::from_kubeconfig(&options).await.map_err(|e| {
            ClusterError::ClientBuild(format!("Failed to load kubeconfig: {}", e))
        })?
    } else {
        KConfig::infer()
            .await
            .map_err(|e| ClusterError::ClientBuild(format!("Failed to infer config: {}", e)))?
    };

    info!("Using cluster at {}", kube_config.cluster_url);
    Ok(kube_config)
}

/// Create a client configuration from a kubeconfig string
async fn kube_config_from_yaml(kubeconfig: &str, options: &KubeConfigOptions) -> Result<KConfig> {
    let kubeconfig_parsed: Kubeconfig = serde_yaml::from_str(kubeconfig)
        .map_err(|e| ClusterError::ClientBuild(format!("Failed to parse kubeconfig: {}", e)))?;

    KConfig::from_custom_kubeconfig(kubeconfig_parsed, options)
        .await
        .map_err(|e| ClusterError::ClientBuild(format!("Failed to create config: {}", e)))
}
