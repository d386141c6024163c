// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for mocking Kubernetes API responses.

use crate::cluster::K8sCluster;
use crate::config::Config;
use crate::error::Result;
use crate::kubernetes::client::ClientConnector;
use crate::kubernetes::warnings::{WarningLayer, WarningSink};
use http::{Request, Response};
use http_body_util::BodyExt;
use kube::client::Body;
use kube::Client;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::{BoxError, Layer, Service};

#[derive(Clone, Debug)]
enum MockResponse {
    Reply {
        status: u16,
        body: String,
        warnings: Vec<String>,
    },
    TransportError(String),
}

/// A request seen by the mock
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn query_contains(&self, needle: &str) -> bool {
        self.query.as_deref().is_some_and(|q| q.contains(needle))
    }

    pub fn json_body(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

/// A mock HTTP service that returns predefined responses based on request paths.
///
/// Registering several responses for the same method and path plays them
/// back in order, repeating the last one. Unmatched requests get a 404.
#[derive(Clone, Default)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), VecDeque<MockResponse>>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    latency: Option<Duration>,
    path_latency: Arc<Mutex<HashMap<(String, String), Duration>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, method: &str, path: &str, response: MockResponse) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry((method.to_string(), path.to_string()))
            .or_default()
            .push_back(response);
        self
    }

    /// Add a response for requests matching the method and exact path
    pub fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.push(
            method,
            path,
            MockResponse::Reply {
                status,
                body: body.to_string(),
                warnings: vec![],
            },
        )
    }

    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    pub fn on_patch(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PATCH", path, status, body)
    }

    pub fn on_put(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PUT", path, status, body)
    }

    pub fn on_delete(self, path: &str, status: u16, body: &str) -> Self {
        self.on("DELETE", path, status, body)
    }

    /// Add a GET response carrying raw `Warning` header values
    pub fn on_get_with_warnings(self, path: &str, status: u16, body: &str, warnings: &[&str]) -> Self {
        self.push(
            "GET",
            path,
            MockResponse::Reply {
                status,
                body: body.to_string(),
                warnings: warnings.iter().map(|w| w.to_string()).collect(),
            },
        )
    }

    /// Fail requests to this path below the HTTP layer
    pub fn on_transport_error(self, method: &str, path: &str) -> Self {
        self.push(
            method,
            path,
            MockResponse::TransportError(format!("connection reset on {} {}", method, path)),
        )
    }

    /// Delay every response
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Delay responses to one method and path, overriding the service-wide latency
    pub fn with_latency_on(self, method: &str, path: &str, latency: Duration) -> Self {
        self.path_latency
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), latency);
        self
    }

    /// Register legacy discovery endpoints serving the given kinds
    pub fn with_discovery(self, kinds: &[MockKind]) -> Self {
        let mut by_group_version: BTreeMap<(String, String), Vec<&MockKind>> = BTreeMap::new();
        for kind in kinds {
            by_group_version
                .entry((kind.group.clone(), kind.version.clone()))
                .or_default()
                .push(kind);
        }

        let core_versions: Vec<_> = by_group_version
            .keys()
            .filter(|(g, _)| g.is_empty())
            .map(|(_, v)| v.clone())
            .collect();
        let mut groups: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (g, v) in by_group_version.keys().filter(|(g, _)| !g.is_empty()) {
            groups.entry(g).or_default().push(v);
        }
        let groups: Vec<_> = groups
            .iter()
            .map(|(group, versions)| {
                let versions: Vec<_> = versions
                    .iter()
                    .map(|v| json!({"groupVersion": format!("{}/{}", group, v), "version": v}))
                    .collect();
                json!({
                    "name": group,
                    "versions": versions,
                    "preferredVersion": versions[0],
                })
            })
            .collect();

        let mut mock = self
            .on_get(
                "/api",
                200,
                &json!({
                    "kind": "APIVersions",
                    "versions": core_versions,
                    "serverAddressByClientCIDRs": []
                })
                .to_string(),
            )
            .on_get(
                "/apis",
                200,
                &json!({"kind": "APIGroupList", "apiVersion": "v1", "groups": groups}).to_string(),
            );

        for ((group, version), kinds) in &by_group_version {
            let group_version = if group.is_empty() {
                version.clone()
            } else {
                format!("{}/{}", group, version)
            };
            let path = if group.is_empty() {
                format!("/api/{}", version)
            } else {
                format!("/apis/{}", group_version)
            };
            let resources: Vec<_> = kinds
                .iter()
                .map(|k| {
                    json!({
                        "name": k.plural,
                        "singularName": "",
                        "namespaced": k.namespaced,
                        "kind": k.kind,
                        "verbs": k.verbs,
                    })
                })
                .collect();
            mock = mock.on_get(
                &path,
                200,
                &json!({
                    "kind": "APIResourceList",
                    "apiVersion": "v1",
                    "groupVersion": group_version,
                    "resources": resources
                })
                .to_string(),
            );
        }

        mock
    }

    /// Register the `/version` endpoint
    pub fn with_version(self, git_version: &str) -> Self {
        let trimmed = git_version.trim_start_matches('v');
        let mut parts = trimmed.split('.');
        let major = parts.next().unwrap_or_default().to_string();
        let minor = parts.next().unwrap_or_default().to_string();
        self.on_get(
            "/version",
            200,
            &json!({
                "major": major,
                "minor": minor,
                "gitVersion": git_version,
                "gitCommit": "fake",
                "gitTreeState": "clean",
                "buildDate": "2024-01-01T00:00:00Z",
                "goVersion": "go1.22.0",
                "compiler": "gc",
                "platform": "linux/amd64"
            })
            .to_string(),
        )
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    /// All requests received so far, in arrival order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    fn next_response(&self, method: &str, path: &str) -> Option<MockResponse> {
        let mut responses = self.responses.lock().unwrap();
        let queue = responses.get_mut(&(method.to_string(), path.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let query = req.uri().query().map(str::to_string);

        let response = self.next_response(&method, &path);
        let requests = self.requests.clone();
        let latency = self
            .path_latency
            .lock()
            .unwrap()
            .get(&(method.clone(), path.clone()))
            .copied()
            .or(self.latency);

        Box::pin(async move {
            let body = req
                .into_body()
                .collect()
                .await
                .map_err(|e| -> BoxError { e.to_string().into() })?
                .to_bytes()
                .to_vec();
            requests.lock().unwrap().push(RecordedRequest {
                method: method.clone(),
                path: path.clone(),
                query,
                body,
            });

            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }

            let (status, body, warnings) = match response {
                Some(MockResponse::Reply {
                    status,
                    body,
                    warnings,
                }) => (status, body, warnings),
                Some(MockResponse::TransportError(message)) => return Err(message.into()),
                // Default 404 for unmatched requests
                None => (404, not_found_json("resource", &path), vec![]),
            };

            let mut builder = Response::builder()
                .status(status)
                .header("content-type", "application/json");
            for warning in warnings {
                builder = builder.header("warning", warning);
            }
            Ok(builder.body(Body::from(body.into_bytes())).unwrap())
        })
    }
}

/// A resource kind served by [`MockService::with_discovery`]
#[derive(Clone, Debug)]
pub struct MockKind {
    pub group: String,
    pub version: String,
    pub plural: String,
    pub kind: String,
    pub namespaced: bool,
    pub verbs: Vec<String>,
}

impl MockKind {
    pub fn namespaced(group: &str, version: &str, plural: &str, kind: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            plural: plural.to_string(),
            kind: kind.to_string(),
            namespaced: true,
            verbs: ["create", "delete", "get", "list", "patch", "update", "watch"]
                .iter()
                .map(|v| v.to_string())
                .collect(),
        }
    }

    pub fn cluster_scoped(group: &str, version: &str, plural: &str, kind: &str) -> Self {
        Self {
            namespaced: false,
            ..Self::namespaced(group, version, plural, kind)
        }
    }

    pub fn with_verbs(mut self, verbs: &[&str]) -> Self {
        self.verbs = verbs.iter().map(|v| v.to_string()).collect();
        self
    }
}

/// The kinds most tests work with
pub fn default_kinds() -> Vec<MockKind> {
    vec![
        MockKind::namespaced("", "v1", "configmaps", "ConfigMap"),
        MockKind::namespaced("", "v1", "services", "Service"),
        MockKind::cluster_scoped("", "v1", "namespaces", "Namespace"),
        MockKind::namespaced("apps", "v1", "deployments", "Deployment"),
    ]
}

/// Connector handing out clients backed by the mock, each with its own warning layer
pub fn mock_connector(mock: MockService) -> impl ClientConnector {
    move |sink: WarningSink| -> Result<Client> {
        Ok(Client::new(WarningLayer::new(sink).layer(mock.clone()), "default"))
    }
}

/// Build a cluster handle against the mock, which must serve `/version` and discovery
pub async fn test_cluster(mock: MockService, config: &Config) -> K8sCluster {
    K8sCluster::with_connector(mock_connector(mock), config, CancellationToken::new())
        .await
        .unwrap()
}

/// Config with a small pool and a fast delete poll
pub fn test_config() -> Config {
    Config {
        pool_size: 4,
        delete_poll_interval: Duration::from_millis(10),
        ..Default::default()
    }
}

/// Create a mock object JSON
pub fn object_json(api_version: &str, kind: &str, namespace: Option<&str>, name: &str) -> Value {
    let mut metadata = json!({"name": name, "uid": format!("uid-{}", name)});
    if let Some(ns) = namespace {
        metadata["namespace"] = json!(ns);
    }
    json!({
        "apiVersion": api_version,
        "kind": kind,
        "metadata": metadata
    })
}

/// Create a list response; items are left as given
pub fn list_json(api_version: &str, kind: &str, items: Vec<Value>) -> String {
    json!({
        "apiVersion": api_version,
        "kind": format!("{}List", kind),
        "metadata": {"resourceVersion": "1"},
        "items": items
    })
    .to_string()
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("{} \"{}\" not found", resource, name),
        "reason": "NotFound",
        "code": 404
    })
    .to_string()
}

/// Create a 500 response
pub fn server_error_json(message: &str) -> String {
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": message,
        "reason": "InternalError",
        "code": 500
    })
    .to_string()
}
