// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::{DEFAULT_CLIENT_POOL_SIZE, DELETE_POLL_INTERVAL};
use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Cluster access configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Kubeconfig context to use, the current context when unset
    pub context: Option<String>,
    /// Inline kubeconfig YAML, takes precedence over the kubeconfig file
    pub kubeconfig_data: Option<String>,
    pub dry_run: bool,
    /// Number of clients kept in the pool
    pub pool_size: usize,
    pub delete_poll_interval: Duration,
    pub namespace: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            context: None,
            kubeconfig_data: None,
            dry_run: false,
            pool_size: DEFAULT_CLIENT_POOL_SIZE,
            delete_poll_interval: DELETE_POLL_INTERVAL,
            namespace: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let context = env::var("KUBE_CONTEXT").ok().filter(|c| !c.is_empty());
        let kubeconfig_data = env::var("KUBECONFIG_DATA").ok().filter(|c| !c.is_empty());
        let namespace = env::var("NAMESPACE").ok().filter(|n| !n.is_empty());

        let dry_run: bool = env::var("DRY_RUN")
            .unwrap_or("false".to_string())
            .parse()
            .context("DRY_RUN must be 'true' or 'false'")?;

        let pool_size = match env::var("CLIENT_POOL_SIZE") {
            Ok(v) => v
                .parse::<usize>()
                .context("CLIENT_POOL_SIZE must be a positive integer")?,
            Err(_) => DEFAULT_CLIENT_POOL_SIZE,
        };
        if pool_size == 0 {
            anyhow::bail!("CLIENT_POOL_SIZE must be greater than zero");
        }

        let delete_poll_interval = match env::var("DELETE_POLL_INTERVAL_MS") {
            Ok(v) => Duration::from_millis(
                v.parse()
                    .context("DELETE_POLL_INTERVAL_MS must be a number of milliseconds")?,
            ),
            Err(_) => DELETE_POLL_INTERVAL,
        };

        Ok(Config {
            context,
            kubeconfig_data,
            dry_run,
            pool_size,
            delete_poll_interval,
            namespace,
        })
    }
}
