// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use super::K8sCluster;
use crate::error::{ClusterError, Result};
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use http_body_util::{BodyDataStream, BodyExt};
use kube::client::Body;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Service reference in the `[scheme:]name[:port]` form used by the proxy subresource
pub fn join_scheme_name_port(scheme: &str, name: &str, port: &str) -> String {
    if !scheme.is_empty() {
        format!("{}:{}:{}", scheme, name, port)
    } else if !port.is_empty() {
        format!("{}:{}", name, port)
    } else {
        name.to_string()
    }
}

fn proxy_uri(namespace: &str, service: &str, path: &str, params: &BTreeMap<String, String>) -> String {
    let mut uri = format!(
        "/api/v1/namespaces/{}/services/{}/proxy/{}",
        namespace,
        service,
        path.trim_start_matches('/')
    );
    if !params.is_empty() {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params)
            .finish();
        uri.push('?');
        uri.push_str(&query);
    }
    uri
}

impl K8sCluster {
    /// GET `path` on a service through the API server proxy, streaming the response body.
    ///
    /// The pooled client is only held until the response headers arrive.
    #[instrument(skip(self, params))]
    pub async fn proxy_get(
        &self,
        scheme: &str,
        namespace: &str,
        name: &str,
        port: &str,
        path: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<BoxStream<'static, Result<Bytes>>> {
        let service = join_scheme_name_port(scheme, name, port);
        let target = format!("{}/{}", namespace, service);
        let uri = proxy_uri(namespace, &service, path, params);
        debug!("Proxying GET {}", uri);

        let proxy_error = |status: Option<u16>, message: String| ClusterError::Proxy {
            target: target.clone(),
            status,
            message,
        };

        let request = http::Request::get(&uri)
            .body(Body::from(Vec::new()))
            .map_err(|e| proxy_error(None, e.to_string()))?;

        let (response, _) = self
            .pool
            .with_client(&self.cancel, |client| async move {
                client.send(request).await.map_err(ClusterError::from)
            })
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .into_body()
                .collect()
                .await
                .map(|collected| String::from_utf8_lossy(&collected.to_bytes()).into_owned())
                .unwrap_or_else(|e| e.to_string());
            return Err(proxy_error(Some(status.as_u16()), body));
        }

        Ok(BodyDataStream::new(response.into_body())
            .map_err(move |e| ClusterError::Proxy {
                target: target.clone(),
                status: None,
                message: e.to_string(),
            })
            .boxed())
    }
}
