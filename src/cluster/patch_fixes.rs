// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Compatibility fixes applied to objects before server-side apply.
//!
//! Each fix is gated on the API server version and rewrites values at a set
//! of paths. `*` in a path visits every element of a list.

use crate::constants::DEFAULT_PORT_PROTOCOL;
use semver::Version;
use serde_json::{Map, Value};
use std::borrow::Cow;
use tracing::trace;

type Path = &'static [&'static str];

struct PatchFix {
    name: &'static str,
    applies_to: fn(&Version) -> bool,
    paths: &'static [Path],
    /// Rewrite the map found at a path, returning whether anything changed
    fix: fn(&mut Map<String, Value>) -> bool,
}

const CONTAINER_PORTS: Path = &["spec", "template", "spec", "containers", "*", "ports", "*"];
const SERVICE_PORTS: Path = &["spec", "ports", "*"];
const CONTAINER_LIMITS: Path = &["spec", "template", "spec", "containers", "*", "resources", "limits"];
const CONTAINER_REQUESTS: Path = &["spec", "template", "spec", "containers", "*", "resources", "requests"];
const LIMIT_RANGE_DEFAULT: Path = &["spec", "limits", "*", "default"];
const LIMIT_RANGE_DEFAULT_REQUEST: Path = &["spec", "limits", "*", "defaultRequest"];

const FIXES: &[PatchFix] = &[
    PatchFix {
        name: "default-port-protocol",
        // structured-merge-diff still rejects applies that omit defaulted list keys
        applies_to: |_| true,
        paths: &[CONTAINER_PORTS, SERVICE_PORTS],
        fix: default_port_protocol,
    },
    PatchFix {
        name: "stringify-cpu",
        applies_to: |v| *v < Version::new(1, 1000, 0),
        paths: &[
            CONTAINER_LIMITS,
            CONTAINER_REQUESTS,
            LIMIT_RANGE_DEFAULT,
            LIMIT_RANGE_DEFAULT_REQUEST,
        ],
        fix: stringify_cpu,
    },
];

/// Normalize an object so server-side apply accepts it on the given server.
///
/// Returns the input untouched when no fix changes anything.
pub fn fix_object_for_patch<'a>(obj: &'a Value, server_version: &Version) -> Cow<'a, Value> {
    let mut fixed = Cow::Borrowed(obj);

    for patch_fix in FIXES.iter().filter(|f| (f.applies_to)(server_version)) {
        for path in patch_fix.paths {
            if !any_map_at(&fixed, path, &needs_fix(patch_fix.fix)) {
                continue;
            }
            trace!("Applying {} at {}", patch_fix.name, path.join("."));
            for_each_map_at(fixed.to_mut(), path, patch_fix.fix);
        }
    }

    fixed
}

/// Dry-run a fix on a copy of a single map
fn needs_fix(fix: fn(&mut Map<String, Value>) -> bool) -> impl Fn(&Map<String, Value>) -> bool {
    move |map| fix(&mut map.clone())
}

fn default_port_protocol(port: &mut Map<String, Value>) -> bool {
    if port.contains_key("protocol") {
        return false;
    }
    port.insert("protocol".to_string(), Value::from(DEFAULT_PORT_PROTOCOL));
    true
}

/// Null is left as is.
fn stringify_cpu(resources: &mut Map<String, Value>) -> bool {
    let quantity = match resources.get("cpu") {
        // 1.0 becomes "1", not serde_json's "1.0"
        Some(Value::Number(n)) if n.is_f64() => n.as_f64().map(|f| f.to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    };
    match quantity {
        Some(quantity) => {
            resources.insert("cpu".to_string(), Value::String(quantity));
            true
        }
        None => false,
    }
}

fn any_map_at(value: &Value, path: &[&str], pred: &dyn Fn(&Map<String, Value>) -> bool) -> bool {
    match path.split_first() {
        None => value.as_object().is_some_and(pred),
        Some((&"*", rest)) => value
            .as_array()
            .is_some_and(|items| items.iter().any(|item| any_map_at(item, rest, pred))),
        Some((key, rest)) => value
            .get(*key)
            .is_some_and(|child| any_map_at(child, rest, pred)),
    }
}

fn for_each_map_at(value: &mut Value, path: &[&str], fix: fn(&mut Map<String, Value>) -> bool) {
    match path.split_first() {
        None => {
            if let Some(map) = value.as_object_mut() {
                fix(map);
            }
        }
        Some((&"*", rest)) => {
            if let Some(items) = value.as_array_mut() {
                for item in items {
                    for_each_map_at(item, rest, fix);
                }
            }
        }
        Some((key, rest)) => {
            if let Some(child) = value.get_mut(*key) {
                for_each_map_at(child, rest, fix);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn v(major: u64, minor: u64) -> Version {
        Version::new(major, minor, 0)
    }

    #[test]
    fn test_container_ports_get_default_protocol() {
        let obj = json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "spec": {"template": {"spec": {"containers": [
                {"name": "web", "ports": [{"containerPort": 80}, {"containerPort": 53, "protocol": "UDP"}]}
            ]}}}
        });

        let fixed = fix_object_for_patch(&obj, &v(1, 30));

        let ports = &fixed["spec"]["template"]["spec"]["containers"][0]["ports"];
        assert_eq!(ports[0]["protocol"], "TCP");
        assert_eq!(ports[1]["protocol"], "UDP");
        // input untouched
        assert!(obj["spec"]["template"]["spec"]["containers"][0]["ports"][0]
            .get("protocol")
            .is_none());
    }

    #[test]
    fn test_service_ports_get_default_protocol() {
        let obj = json!({"kind": "Service", "spec": {"ports": [{"port": 80}, {"port": 443}]}});
        let fixed = fix_object_for_patch(&obj, &v(1, 30));

        assert_eq!(fixed["spec"]["ports"][0]["protocol"], "TCP");
        assert_eq!(fixed["spec"]["ports"][1]["protocol"], "TCP");
    }

    #[test]
    fn test_port_protocol_applies_on_any_version() {
        let obj = json!({"spec": {"ports": [{"port": 80}]}});
        let fixed = fix_object_for_patch(&obj, &v(1, 2000));
        assert_eq!(fixed["spec"]["ports"][0]["protocol"], "TCP");
    }

    #[test]
    fn test_container_cpu_is_stringified() {
        let obj = json!({"spec": {"template": {"spec": {"containers": [
            {"name": "a", "resources": {"limits": {"cpu": 1, "memory": "1Gi"}, "requests": {"cpu": 0.5}}},
            {"name": "b", "resources": {"limits": {"cpu": "250m"}}}
        ]}}}});

        let fixed = fix_object_for_patch(&obj, &v(1, 30));
        let containers = &fixed["spec"]["template"]["spec"]["containers"];

        assert_eq!(containers[0]["resources"]["limits"]["cpu"], "1");
        assert_eq!(containers[0]["resources"]["limits"]["memory"], "1Gi");
        assert_eq!(containers[0]["resources"]["requests"]["cpu"], "0.5");
        assert_eq!(containers[1]["resources"]["limits"]["cpu"], "250m");
    }

    #[test]
    fn test_limit_range_cpu_is_stringified() {
        let obj = json!({"kind": "LimitRange", "spec": {"limits": [
            {"type": "Container", "default": {"cpu": 2}, "defaultRequest": {"cpu": 1}}
        ]}});

        let fixed = fix_object_for_patch(&obj, &v(1, 30));

        assert_eq!(fixed["spec"]["limits"][0]["default"]["cpu"], "2");
        assert_eq!(fixed["spec"]["limits"][0]["defaultRequest"]["cpu"], "1");
    }

    #[test]
    fn test_cpu_left_alone_on_new_servers() {
        let obj = json!({"spec": {"limits": [{"default": {"cpu": 2}}]}});
        let fixed = fix_object_for_patch(&obj, &v(1, 1000));
        assert_eq!(fixed["spec"]["limits"][0]["default"]["cpu"], 2);
    }

    #[test]
    fn test_unaffected_object_is_borrowed() {
        let obj = json!({"kind": "ConfigMap", "data": {"ports": "80"}});
        let fixed = fix_object_for_patch(&obj, &v(1, 30));
        assert!(matches!(fixed, Cow::Borrowed(_)));
    }

    #[test]
    fn test_missing_paths_and_wrong_shapes_are_ignored() {
        let obj = json!({"spec": {"ports": "not-a-list", "template": {"spec": {"containers": [
            "not-a-map", {"name": "x"}
        ]}}}});
        let fixed = fix_object_for_patch(&obj, &v(1, 30));
        assert_eq!(*fixed, obj);
    }

    #[test]
    fn test_cpu_float_and_null_values() {
        let obj = json!({"spec": {"limits": [
            {"default": {"cpu": 1.0}},
            {"default": {"cpu": 0.5}},
            {"default": {"cpu": null}}
        ]}});

        let fixed = fix_object_for_patch(&obj, &v(1, 30));

        assert_eq!(fixed["spec"]["limits"][0]["default"]["cpu"], "1");
        assert_eq!(fixed["spec"]["limits"][1]["default"]["cpu"], "0.5");
        assert!(fixed["spec"]["limits"][2]["default"]["cpu"].is_null());
    }
}
