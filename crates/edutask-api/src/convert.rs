//! Conversions between gateway types and axum/http types.

use anyhow::Context;
use axum::body::Body;
use axum::http::{HeaderMap, Request};
use bytes::Bytes;
use edutask_gateway::Scope;

/// Rebuild an `http::Request` from a scope and the received body.
///
/// Header order and duplicates are kept. A path without a leading `/`
/// (including the empty path) is treated as rooted.
pub fn scope_to_request(scope: &Scope, body: Bytes) -> anyhow::Result<Request<Body>> {
    let target = scope.path_and_query();
    let target = if target.starts_with('/') {
        target
    } else {
        format!("/{target}")
    };

    let mut builder = Request::builder()
        .method(scope.method())
        .uri(target.as_str());
    for (name, value) in scope.headers() {
        builder = builder.header(&name[..], &value[..]);
    }

    builder
        .body(Body::from(body))
        .with_context(|| format!("invalid request for {} {target}", scope.method()))
}

/// Convert headers to a list of (name, value) byte pairs.
pub fn headers_to_pairs(headers: &HeaderMap) -> Vec<(Bytes, Bytes)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                Bytes::copy_from_slice(name.as_str().as_bytes()),
                Bytes::copy_from_slice(value.as_bytes()),
            )
        })
        .collect()
}
