//! HTTP type conversions between hyper and the gateway adapter.
//!
//! The local trigger receives `http` requests and must hand the adapter
//! the same whole-body [`InboundRequest`] the hosting runtime would.

use bytes::Bytes;
use edutask_gateway::{AssembledResponse, InboundRequest};
use http::request::Parts;
use http::{Response, StatusCode};
use http_body_util::Full;
use tracing::warn;

/// Build an [`InboundRequest`] from request parts and a buffered body.
pub fn inbound_from_parts(parts: &Parts, body: Bytes) -> InboundRequest {
    let mut request = InboundRequest::new(parts.method.as_str(), parts.uri.path())
        .with_query_string(parts.uri.query().unwrap_or("").to_string())
        .with_body(body);

    for (name, value) in &parts.headers {
        request = request.with_header(name.as_str(), Bytes::copy_from_slice(value.as_bytes()));
    }
    request
}

/// Convert an [`AssembledResponse`] into a hyper response.
///
/// A response that `http` refuses (bad status, control characters in a
/// header) degrades to a plain 500.
pub fn response_to_hyper(response: AssembledResponse) -> Response<Full<Bytes>> {
    let (status, headers, body) = response.into_parts();

    let mut builder = Response::builder().status(status);
    for (name, value) in &headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    builder.body(Full::new(body)).unwrap_or_else(|err| {
        warn!(error = %err, status, "response rejected by http, replacing with 500");
        let mut fallback = Response::new(Full::new(Bytes::from_static(b"Internal Server Error")));
        *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}
