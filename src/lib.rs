// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod cluster;
pub mod config;
pub mod constants;
pub mod error;
pub mod kubernetes;
pub mod types;
mod utils;

#[cfg(test)]
pub mod test_utils;

pub use cluster::K8sCluster;
pub use error::{ClusterError, Result};
