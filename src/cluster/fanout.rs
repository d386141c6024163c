// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Bounded parallel execution of independent query units.
//!
//! Once a unit fails, no further unit starts. Units already running are
//! drained and their errors other than the first are dropped.

use crate::error::{ClusterError, Result};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::trace;

pub struct FanOut {
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
    stop: CancellationToken,
    skipped: Arc<AtomicBool>,
    tasks: JoinSet<Result<()>>,
}

impl FanOut {
    /// At most `workers` units run at a time. Cancelling `cancel` stops new units as well.
    pub fn new(workers: usize, cancel: &CancellationToken) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(workers.max(1))),
            cancel: cancel.clone(),
            stop: cancel.child_token(),
            skipped: Arc::new(AtomicBool::new(false)),
            tasks: JoinSet::new(),
        }
    }

    pub fn submit<F>(&mut self, unit: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        if self.stop.is_cancelled() {
            self.skipped.store(true, Ordering::SeqCst);
            return;
        }

        let permits = self.permits.clone();
        let stop = self.stop.clone();
        let skipped = self.skipped.clone();
        self.tasks.spawn(async move {
            let _permit = tokio::select! {
                permit = permits.acquire_owned() => permit
                    .map_err(|_| ClusterError::TaskFailed("worker semaphore closed".into()))?,
                _ = stop.cancelled() => {
                    skipped.store(true, Ordering::SeqCst);
                    return Ok(());
                }
            };
            if stop.is_cancelled() {
                skipped.store(true, Ordering::SeqCst);
                return Ok(());
            }

            let result = unit.await;
            if result.is_err() {
                stop.cancel();
            }
            result
        });
    }

    /// Wait for every submitted unit and return the first error
    pub async fn wait(mut self) -> Result<()> {
        let mut first_error = None;

        while let Some(joined) = self.tasks.join_next().await {
            let result = joined
                .map_err(|e| ClusterError::TaskFailed(e.to_string()))
                .and_then(|r| r);
            if let Err(e) = result {
                self.stop.cancel();
                if first_error.is_none() {
                    first_error = Some(e);
                } else {
                    trace!("Dropping follow-up fan-out error: {}", e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None if self.cancel.is_cancelled() && self.skipped.load(Ordering::SeqCst) => {
                Err(ClusterError::NoClientAvailable)
            }
            None => Ok(()),
        }
    }
}
