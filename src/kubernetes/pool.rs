// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Fixed-size pool of pre-built clients.
//!
//! Building a client parses TLS material and sets up a connection pool, so the
//! entries are created once and handed out exclusively per call. The semaphore
//! holds exactly one permit per idle entry.

use crate::error::{ClusterError, Result};
use crate::kubernetes::client::ClientConnector;
use crate::kubernetes::warnings::WarningSink;
use crate::types::ApiWarning;
use crate::utils::lock;
use kube::Client;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

/// One slot's worth of ready-to-use client plus its warning buffer
pub struct PooledClientEntry {
    client: Client,
    warnings: WarningSink,
}

impl PooledClientEntry {
    fn connect(connector: &dyn ClientConnector) -> Result<Self> {
        let warnings = WarningSink::new();
        let client = connector.connect(warnings.clone())?;
        Ok(Self { client, warnings })
    }
}

pub struct ClientPool {
    connector: Arc<dyn ClientConnector>,
    size: usize,
    slots: Arc<Semaphore>,
    idle: Arc<Mutex<Vec<PooledClientEntry>>>,
}

impl ClientPool {
    /// Build `size` entries up front
    pub fn new(connector: impl ClientConnector + 'static, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(ClusterError::ClientBuild(
                "client pool size must be greater than zero".into(),
            ));
        }

        let connector: Arc<dyn ClientConnector> = Arc::new(connector);
        let entries = (0..size)
            .map(|_| PooledClientEntry::connect(connector.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        debug!("Created client pool with {} entries", size);

        Ok(Self {
            connector,
            size,
            slots: Arc::new(Semaphore::new(size)),
            idle: Arc::new(Mutex::new(entries)),
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of entries currently waiting in the pool
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    /// Take an entry out of the pool, waiting until one is free or `cancel` fires
    pub async fn checkout(&self, cancel: &CancellationToken) -> Result<PooledClient> {
        let permit = match self.slots.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(TryAcquireError::Closed) => return Err(ClusterError::PoolClosed),
            Err(TryAcquireError::NoPermits) => {
                trace!("No idle client, waiting for a free slot");
                tokio::select! {
                    permit = self.slots.clone().acquire_owned() => {
                        permit.map_err(|_| ClusterError::PoolClosed)?
                    }
                    _ = cancel.cancelled() => return Err(ClusterError::NoClientAvailable),
                }
            }
        };

        let entry = lock(&self.idle).pop().ok_or(ClusterError::PoolClosed)?;
        entry.warnings.reset();

        Ok(PooledClient {
            client: entry.client.clone(),
            warnings: entry.warnings.clone(),
            entry: Some(entry),
            idle: self.idle.clone(),
            _permit: permit,
        })
    }

    /// Run `f` with an exclusively held client.
    ///
    /// The entry is returned to the pool whatever the outcome, and the
    /// warnings collected during this call only are handed back with the value.
    /// When `cancel` fires first, `f` is dropped mid-request and its warnings
    /// are discarded.
    pub async fn with_client<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        f: F,
    ) -> Result<(T, Vec<ApiWarning>)>
    where
        F: FnOnce(Client) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let client = self.checkout(cancel).await?;
        let result = tokio::select! {
            result = f(client.client().clone()) => result,
            _ = cancel.cancelled() => {
                debug!("Abandoning in-flight request, cancelled");
                client.take_warnings();
                return Err(ClusterError::Cancelled);
            }
        };
        let warnings = client.take_warnings();
        drop(client);

        result.map(|value| (value, warnings))
    }

    /// Drain every entry, drop it, and build a fresh set.
    ///
    /// Waits until all entries are back so no connection outlives a
    /// credential change, or until `cancel` fires.
    pub async fn reinitialize(&self, cancel: &CancellationToken) -> Result<()> {
        let permits = u32::try_from(self.size)
            .map_err(|_| ClusterError::ClientBuild("client pool too large".into()))?;
        let _all = tokio::select! {
            all = self.slots.acquire_many(permits) => all.map_err(|_| ClusterError::PoolClosed)?,
            _ = cancel.cancelled() => return Err(ClusterError::NoClientAvailable),
        };

        let fresh = (0..self.size)
            .map(|_| PooledClientEntry::connect(self.connector.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        // dropping the old clients closes their idle connections
        *lock(&self.idle) = fresh;
        info!("Reinitialized client pool with {} entries", self.size);

        Ok(())
    }
}

/// Checked-out pool entry, returned to the pool on drop
pub struct PooledClient {
    client: Client,
    warnings: WarningSink,
    entry: Option<PooledClientEntry>,
    idle: Arc<Mutex<Vec<PooledClientEntry>>>,
    _permit: OwnedSemaphorePermit,
}

impl PooledClient {
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Warnings collected since checkout
    pub fn take_warnings(&self) -> Vec<ApiWarning> {
        self.warnings.take()
    }
}

impl Drop for PooledClient {
    fn drop(&mut self) {
        if let Some(entry) = self.entry.take() {
            lock(&self.idle).push(entry);
        }
        // the permit is released after this, once the entry is back
    }
}
