// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::types::ObjectRef;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("failed to {operation} {target}: {source}")]
    Api {
        operation: &'static str,
        target: String,
        #[source]
        source: kube::Error,
    },

    #[error("no matches for kind {0}")]
    NoMatchingKind(String),

    #[error("no client available, context cancelled")]
    NoClientAvailable,

    #[error("operation cancelled while waiting for the API server")]
    Cancelled,

    #[error("client pool is closed")]
    PoolClosed,

    #[error("timed out waiting for deletion of {0}")]
    DeletionTimeout(ObjectRef),

    #[error("Failed to build client: {0}")]
    ClientBuild(String),

    #[error("Invalid object: {0}")]
    InvalidObject(String),

    #[error("Invalid server version: {0}")]
    InvalidServerVersion(String),

    #[error("Failed to serialize object: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("proxy request to {target} failed (status {status:?}): {message}")]
    Proxy {
        target: String,
        status: Option<u16>,
        message: String,
    },

    #[error("fan-out task failed: {0}")]
    TaskFailed(String),
}

impl ClusterError {
    pub(crate) fn api(operation: &'static str, target: impl ToString, source: kube::Error) -> Self {
        ClusterError::Api {
            operation,
            target: target.to_string(),
            source,
        }
    }

    /// The API server answered 404 for the addressed object or collection.
    pub fn is_not_found(&self) -> bool {
        match self {
            ClusterError::Api { source, .. } | ClusterError::Kube(source) => {
                matches!(source, kube::Error::Api(err) if err.code == 404)
            }
            _ => false,
        }
    }

    /// The kind is unknown to the cluster's discovery data.
    pub fn is_no_match(&self) -> bool {
        matches!(self, ClusterError::NoMatchingKind(_))
    }

    /// The caller's cancellation fired while this operation was waiting.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            ClusterError::NoClientAvailable
                | ClusterError::Cancelled
                | ClusterError::DeletionTimeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ClusterError>;
