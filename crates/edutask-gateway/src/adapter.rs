//! Adapter entry point.
//!
//! `Adapter` owns one application and turns each [`InboundRequest`]
//! into exactly one [`AssembledResponse`]. Failures never escape: they
//! become a 500 JSON response carrying the error message.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info_span, Instrument};

use crate::channel;
use crate::collector::ResponseCollector;
use crate::driver::{drive, App, CancelSignal};
use crate::error::{GatewayError, GatewayResult};
use crate::request::InboundRequest;
use crate::response::AssembledResponse;
use crate::scope::Scope;

pub struct Adapter<A: ?Sized> {
    app: Arc<A>,
}

impl<A: ?Sized> Clone for Adapter<A> {
    fn clone(&self) -> Self {
        Self {
            app: self.app.clone(),
        }
    }
}

impl<A: App> Adapter<A> {
    pub fn new(app: A) -> Self {
        Self { app: Arc::new(app) }
    }
}

impl<A: App + ?Sized> Adapter<A> {
    pub fn from_arc(app: Arc<A>) -> Self {
        Self { app }
    }

    pub fn app(&self) -> &A {
        &self.app
    }

    /// Handle one call.
    ///
    /// Scope, channel and collector are created for this call only and
    /// are joined before the future resolves.
    pub async fn handle(&self, request: InboundRequest) -> AssembledResponse {
        let (_cancel_tx, cancel) = watch::channel(false);
        self.handle_with_cancel(request, cancel).await
    }

    /// Like [`handle()`](Adapter::handle), but aborts promptly once
    /// `cancel` fires. The aborted call still yields a 500 response.
    pub async fn handle_with_cancel(
        &self,
        request: InboundRequest,
        cancel: CancelSignal,
    ) -> AssembledResponse {
        let span = info_span!("invoke", method = %request.method(), path = %request.path());

        async move {
            match self.run(request, cancel).await {
                Ok(response) => {
                    debug!(
                        status = response.status(),
                        bytes = response.body().len(),
                        "call completed"
                    );
                    response
                }
                Err(err) => {
                    error!(error = %err, "call failed");
                    AssembledResponse::internal_error(&err.to_string())
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Handle one call from synchronous code.
    ///
    /// Builds a current-thread runtime for this call alone and tears it
    /// down before returning. Called from inside an async context it
    /// answers 500 without running the application.
    pub fn handle_blocking(&self, request: InboundRequest) -> AssembledResponse {
        if tokio::runtime::Handle::try_current().is_ok() {
            let err = GatewayError::NestedRuntime;
            error!(error = %err, method = %request.method(), path = %request.path(), "call failed");
            return AssembledResponse::internal_error(&err.to_string());
        }

        match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(self.handle(request)),
            Err(err) => {
                let err = GatewayError::Runtime(err);
                error!(error = %err, "call failed");
                AssembledResponse::internal_error(&err.to_string())
            }
        }
    }

    async fn run(
        &self,
        request: InboundRequest,
        cancel: CancelSignal,
    ) -> GatewayResult<AssembledResponse> {
        let scope = Arc::new(Scope::from_request(&request));
        let (sink, events) = channel::channel();

        let driver = drive(
            self.app.as_ref(),
            scope,
            request.body().clone(),
            sink,
            cancel,
        );
        let collector = ResponseCollector::new().collect(events);

        let ((), response) = tokio::try_join!(driver, collector)?;
        Ok(response)
    }
}
