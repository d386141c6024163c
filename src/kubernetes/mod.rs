// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes plumbing: client construction, pooling, discovery and version detection.

pub mod client;
pub mod pool;
pub mod resources;
pub mod version;
pub mod warnings;

pub use client::{load_kube_config, ClientConnector, KubeConfigConnector};
pub use pool::{ClientPool, PooledClient};
pub use resources::{ResourceMapping, ResourceResolver, ResourceSnapshot};
pub use version::parse_server_version;
pub use warnings::{WarningLayer, WarningSink};
