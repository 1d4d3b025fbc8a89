//! Local HTTP trigger.
//!
//! `LocalTrigger` runs a hyper HTTP/1.1 server that stands in for the
//! hosting runtime during development. Each request is buffered, handed
//! to the gateway [`Adapter`] and answered with the assembled response.
//! The deployment options are enforced the way the platform enforces
//! them: at most `max_instances` calls in flight (429 beyond that) and a
//! wall-clock ceiling per call (504 past it).

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use edutask_gateway::{Adapter, App, AssembledResponse};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, error, info, warn};

use crate::config::FunctionOptions;
use crate::convert::{inbound_from_parts, response_to_hyper};

/// Local stand-in for the hosting runtime's HTTP trigger.
pub struct LocalTrigger<A: ?Sized> {
    bind_addr: SocketAddr,
    adapter: Adapter<A>,
    options: FunctionOptions,
}

impl<A: App + ?Sized + 'static> LocalTrigger<A> {
    pub fn new(bind_addr: SocketAddr, adapter: Adapter<A>, options: FunctionOptions) -> Self {
        Self {
            bind_addr,
            adapter,
            options,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// Bind the configured address and serve until `shutdown` fires.
    pub async fn serve(self, shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.bind_addr)
            .await
            .with_context(|| format!("failed to bind local trigger on {}", self.bind_addr))?;
        self.serve_with_listener(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` fires.
    ///
    /// Calls still in flight at shutdown observe the same signal as
    /// their cancellation and are answered with a 500.
    pub async fn serve_with_listener(
        self,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let local_addr = listener.local_addr().context("listener has no local address")?;
        info!(
            addr = %local_addr,
            max_instances = self.options.max_instances,
            timeout_secs = self.options.timeout.as_secs(),
            "local trigger listening"
        );

        let invoker = Arc::new(Invoker {
            adapter: self.adapter,
            instances: Arc::new(Semaphore::new(self.options.max_instances as usize)),
            options: self.options,
            shutdown: shutdown.clone(),
        });

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    let (stream, peer_addr) = accept_result.context("accept failed")?;
                    let invoker = invoker.clone();

                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        let svc = service_fn(move |req: Request<Incoming>| {
                            let invoker = invoker.clone();
                            async move { Ok::<_, Infallible>(invoker.invoke(req).await) }
                        });

                        if let Err(e) = http1::Builder::new().serve_connection(io, svc).await {
                            error!(%peer_addr, error = %e, "connection error");
                        }
                    });
                }
                _ = shutdown.changed() => {
                    info!("local trigger shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}

struct Invoker<A: ?Sized> {
    adapter: Adapter<A>,
    instances: Arc<Semaphore>,
    options: FunctionOptions,
    shutdown: watch::Receiver<bool>,
}

impl<A: App + ?Sized> Invoker<A> {
    async fn invoke(&self, req: Request<Incoming>) -> Response<Full<Bytes>> {
        let Ok(_instance) = self.instances.clone().try_acquire_owned() else {
            warn!(
                max_instances = self.options.max_instances,
                "all instances busy, rejecting call"
            );
            return response_to_hyper(AssembledResponse::json_error(
                429,
                "Too Many Requests: all function instances are busy",
            ));
        };

        let (parts, body) = req.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                warn!(error = %e, "failed to read request body");
                return response_to_hyper(AssembledResponse::json_error(
                    400,
                    &format!("Bad Request: {e}"),
                ));
            }
        };

        let inbound = inbound_from_parts(&parts, body);
        let call = self.adapter.handle_with_cancel(inbound, self.shutdown.clone());

        match tokio::time::timeout(self.options.timeout, call).await {
            Ok(response) => {
                debug!(status = response.status(), "call answered");
                response_to_hyper(response)
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.options.timeout.as_secs(),
                    method = %parts.method,
                    path = %parts.uri.path(),
                    "call exceeded the timeout"
                );
                response_to_hyper(AssembledResponse::json_error(
                    504,
                    "Gateway Timeout: function exceeded its timeout",
                ))
            }
        }
    }
}
