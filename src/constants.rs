// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::time::Duration;

/// Field manager used for server-side apply and updates
pub const FIELD_MANAGER: &str = "kluster";

/// Number of pre-built clients kept in the pool
pub const DEFAULT_CLIENT_POOL_SIZE: usize = 16;

/// Fan-out worker budgets
pub mod fanout {
    /// Workers used when listing across resource kinds
    pub const LIST_ALL_WORKERS: usize = 8;
    /// Workers used when fetching objects by reference
    pub const GET_BY_REFS_WORKERS: usize = 32;
}

/// Interval between existence checks while waiting for a deletion
pub const DELETE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Discovery cache configuration
pub mod discovery {
    use std::time::Duration;

    /// Non-forced refreshes keep a snapshot younger than this
    pub const MIN_REFRESH_AGE: Duration = Duration::from_secs(30);

    /// Deprecated (group, kind) aliases left out of "all kinds" scans
    pub const DEPRECATED_KINDS: &[(&str, &str)] = &[("extensions", "Ingress")];
}

/// Protocol assumed by the API server for ports that omit one
pub const DEFAULT_PORT_PROTOCOL: &str = "TCP";
