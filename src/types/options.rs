// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Per-call option records.

use std::collections::BTreeMap;

/// Options for list calls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Equality-based label selector, every pair must match
    pub labels: BTreeMap<String, String>,
}

impl ListOptions {
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Render the labels as a selector string (`k1=v1,k2=v2`)
    pub fn label_selector(&self) -> String {
        self.labels
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchOptions {
    /// Send the patch as dry-run even when the cluster handle is read-write
    pub force_dry_run: bool,
    /// Take ownership of fields managed by other field managers
    pub force_apply: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    pub force_dry_run: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    pub force_dry_run: bool,
    /// Return as soon as the API server accepted the delete
    pub no_wait: bool,
    /// Treat a missing object as successfully deleted
    pub ignore_not_found: bool,
}
