// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! API server version detection

use crate::error::{ClusterError, Result};
use k8s_openapi::apimachinery::pkg::version::Info;
use semver::Version;

/// Parse the server version reported by `/version`.
///
/// `gitVersion` carries the full version (`v1.30.2+k3s1`, `v1.29.4-eks-036c24b`).
/// When it can't be parsed, fall back to the major/minor fields, which some
/// providers suffix with `+` (`"29+"`).
pub fn parse_server_version(info: &Info) -> Result<Version> {
    if let Ok(v) = Version::parse(info.git_version.trim_start_matches('v')) {
        return Ok(v);
    }

    let major = leading_number(&info.major);
    let minor = leading_number(&info.minor);
    match (major, minor) {
        (Some(major), Some(minor)) => Ok(Version::new(major, minor, 0)),
        _ => Err(ClusterError::InvalidServerVersion(format!(
            "gitVersion={} major={} minor={}",
            info.git_version, info.major, info.minor
        ))),
    }
}

fn leading_number(s: &str) -> Option<u64> {
    let digits: String = s.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}
