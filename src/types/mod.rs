// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Types crossing the cluster access boundary.

pub mod object_ref;
pub mod options;

pub use object_ref::{display_gvk, gvk_from_api_version, ApiWarning, ObjectRef};
pub use options::{DeleteOptions, ListOptions, PatchOptions, UpdateOptions};
