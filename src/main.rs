// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use kluster::config::Config;
use kluster::types::{display_gvk, ListOptions};
use kluster::K8sCluster;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: context={:?}, dry_run={}, pool_size={}",
        config.context, config.dry_run, config.pool_size
    );

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling pending requests");
            ctrl_c.cancel();
        }
    });

    let cluster = K8sCluster::connect(&config, cancel)
        .await
        .context("Failed to connect to Kubernetes cluster")?;
    info!("Connected to Kubernetes cluster, server version {}", cluster.server_version());

    let (objects, warnings) = cluster
        .list_all_objects(
            &["list"],
            config.namespace.as_deref(),
            &ListOptions::default(),
            true,
        )
        .await
        .context("Failed to list cluster objects")?;

    for (gvk, kind_warnings) in &warnings {
        for warning in kind_warnings {
            warn!("{}: {}", display_gvk(gvk), warning);
        }
    }
    info!("Found {} objects", objects.len());

    Ok(())
}
