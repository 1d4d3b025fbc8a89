//! Serving an axum router over the gateway protocol.
//!
//! `RouterApp` is the application side of the adapter: it pulls the
//! request body, runs the router, and pushes the response back as a
//! start event followed by one body chunk per data frame.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use bytes::{Bytes, BytesMut};
use edutask_gateway::{
    App, BoxFuture, InboundEvent, OutboundEvent, RequestReceiver, ResponseSender, Scope,
};
use http_body_util::BodyExt;
use tower::ServiceExt;
use tracing::debug;

use crate::convert::{headers_to_pairs, scope_to_request};

#[derive(Clone)]
pub struct RouterApp {
    router: Router,
}

impl RouterApp {
    pub fn new(router: Router) -> Self {
        Self { router }
    }
}

impl App for RouterApp {
    fn call(
        &self,
        scope: Arc<Scope>,
        receive: RequestReceiver,
        send: ResponseSender,
    ) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(serve(self.router.clone(), scope, receive, send))
    }
}

async fn serve(
    router: Router,
    scope: Arc<Scope>,
    mut receive: RequestReceiver,
    mut send: ResponseSender,
) -> anyhow::Result<()> {
    let body = read_body(&mut receive).await?;
    let request = scope_to_request(&scope, body)?;

    let response = router.oneshot(request).await?;
    let (parts, mut body) = response.into_parts();
    debug!(status = parts.status.as_u16(), "route handled");

    send.send(OutboundEvent::start(
        parts.status.as_u16(),
        headers_to_pairs(&parts.headers),
    ))
    .await?;

    while let Some(frame) = body.frame().await {
        let frame = frame.context("failed to read response body")?;
        if let Ok(data) = frame.into_data() {
            if !data.is_empty() {
                send.send(OutboundEvent::body(data, true)).await?;
            }
        }
    }
    send.send(OutboundEvent::body(Bytes::new(), false)).await?;

    Ok(())
}

async fn read_body(receive: &mut RequestReceiver) -> anyhow::Result<Bytes> {
    let mut body = BytesMut::new();
    loop {
        match receive.recv().await? {
            InboundEvent::Request {
                body: chunk,
                more_body,
            } => {
                body.extend_from_slice(&chunk);
                if !more_body {
                    return Ok(body.freeze());
                }
            }
            InboundEvent::Disconnect => {
                anyhow::bail!("client disconnected before the request body was read")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use edutask_gateway::{Adapter, InboundRequest};

    #[tokio::test]
    async fn request_body_reaches_route() {
        let router = Router::new().route("/echo", post(|body: Bytes| async move { body }));
        let adapter = Adapter::new(RouterApp::new(router));

        let resp = adapter
            .handle(InboundRequest::new("POST", "/echo").with_body("three students"))
            .await;
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.body().as_ref(), b"three students");
    }

    #[tokio::test]
    async fn route_headers_are_forwarded() {
        let router = Router::new().route(
            "/plain",
            post(|| async { ([("content-type", "text/plain"), ("x-lesson", "7")], "ok") }),
        );
        let adapter = Adapter::new(RouterApp::new(router));

        let resp = adapter.handle(InboundRequest::new("POST", "/plain")).await;
        assert_eq!(resp.header("content-type"), Some("text/plain"));
        assert_eq!(resp.header("x-lesson"), Some("7"));
    }

    #[tokio::test]
    async fn empty_route_body_still_completes() {
        let router = Router::new().route(
            "/nothing",
            post(|| async { axum::http::StatusCode::NO_CONTENT }),
        );
        let adapter = Adapter::new(RouterApp::new(router));

        let resp = adapter.handle(InboundRequest::new("POST", "/nothing")).await;
        assert_eq!(resp.status(), 204);
        assert!(resp.body().is_empty());
    }
}
