// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Capture of API server `Warning` response headers.
//!
//! Every pooled client gets its own [`WarningSink`] attached through a
//! [`WarningLayer`] on its HTTP stack, so warnings produced by one checkout
//! never leak into another caller's results.

use crate::types::ApiWarning;
use crate::utils::lock;
use futures::future::BoxFuture;
use http::{header::WARNING, HeaderMap, Request, Response};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::debug;

/// Shared buffer of warnings collected by one pooled client
#[derive(Clone, Default, Debug)]
pub struct WarningSink {
    warnings: Arc<Mutex<Vec<ApiWarning>>>,
}

impl WarningSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, warning: ApiWarning) {
        debug!("API server warning: {}", warning);
        lock(&self.warnings).push(warning);
    }

    pub fn reset(&self) {
        lock(&self.warnings).clear();
    }

    /// Move out everything collected so far
    pub fn take(&self) -> Vec<ApiWarning> {
        std::mem::take(&mut *lock(&self.warnings))
    }

    fn record_headers(&self, headers: &HeaderMap) {
        for value in headers.get_all(WARNING) {
            match value.to_str() {
                Ok(v) => parse_warning_header(v).into_iter().for_each(|w| self.record(w)),
                Err(_) => debug!("Ignoring non-ASCII warning header"),
            }
        }
    }
}

/// Tower layer that records response warnings into a [`WarningSink`]
#[derive(Clone)]
pub struct WarningLayer {
    sink: WarningSink,
}

impl WarningLayer {
    pub fn new(sink: WarningSink) -> Self {
        Self { sink }
    }
}

impl<S> Layer<S> for WarningLayer {
    type Service = WarningCollector<S>;

    fn layer(&self, inner: S) -> Self::Service {
        WarningCollector {
            inner,
            sink: self.sink.clone(),
        }
    }
}

#[derive(Clone)]
pub struct WarningCollector<S> {
    inner: S,
    sink: WarningSink,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for WarningCollector<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: 'static,
    ResBody: 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let sink = self.sink.clone();
        let response = self.inner.call(req);

        Box::pin(async move {
            let response = response.await?;
            sink.record_headers(response.headers());
            Ok(response)
        })
    }
}

/// Parse one `Warning` header value (RFC 7234 section 5.5).
///
/// The value may hold several comma separated entries of the form
/// `<code> <agent> "<text>" ["<date>"]`. Parsing stops at the first
/// malformed entry, keeping the ones before it.
pub fn parse_warning_header(value: &str) -> Vec<ApiWarning> {
    let mut warnings = Vec::new();
    let mut rest = value;

    loop {
        rest = rest.trim_start_matches(|c: char| c == ',' || c.is_whitespace());
        if rest.is_empty() {
            break;
        }

        let Some((code, tail)) = rest.split_once(' ') else {
            break;
        };
        let Ok(code) = code.parse::<u16>() else {
            break;
        };
        if !(100..1000).contains(&code) {
            break;
        }

        let Some((agent, tail)) = tail.trim_start().split_once(' ') else {
            break;
        };
        let Some((text, tail)) = read_quoted(tail.trim_start()) else {
            break;
        };

        warnings.push(ApiWarning {
            code,
            agent: agent.to_string(),
            text,
        });

        // optional warn-date
        rest = tail.trim_start();
        if rest.starts_with('"') {
            match read_quoted(rest) {
                Some((_, tail)) => rest = tail,
                None => break,
            }
        }
    }

    warnings
}

/// Read a quoted-string, returning its unescaped content and the remainder
fn read_quoted(input: &str) -> Option<(String, &str)> {
    let body = input.strip_prefix('"')?;
    let mut text = String::new();
    let mut chars = body.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => text.push(chars.next()?.1),
            '"' => return Some((text, &body[i + 1..])),
            _ => text.push(c),
        }
    }
    None
}
