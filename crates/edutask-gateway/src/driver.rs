//! Gateway protocol driver.
//!
//! Runs an [`App`] exactly once against a [`Scope`], handing it a
//! [`RequestReceiver`] for the inbound side and a [`ResponseSender`]
//! for the outbound side. The driver never looks at routes; it only
//! moves events and enforces their order.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::FutureExt;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::channel::EventSender;
use crate::error::{GatewayError, GatewayResult};
use crate::event::{InboundEvent, OutboundEvent};
use crate::scope::Scope;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Cancellation signal for one call. The call is cancelled once the
/// watched value becomes `true`.
pub type CancelSignal = watch::Receiver<bool>;

/// An application that speaks the gateway protocol.
///
/// `call` gets the immutable scope plus the two event handles and
/// resolves once the application is done. Returning an error (or
/// panicking) fails the call.
pub trait App: Send + Sync {
    fn call(
        &self,
        scope: Arc<Scope>,
        receive: RequestReceiver,
        send: ResponseSender,
    ) -> BoxFuture<'_, anyhow::Result<()>>;
}

impl<A: App + ?Sized> App for Arc<A> {
    fn call(
        &self,
        scope: Arc<Scope>,
        receive: RequestReceiver,
        send: ResponseSender,
    ) -> BoxFuture<'_, anyhow::Result<()>> {
        (**self).call(scope, receive, send)
    }
}

/// An [`App`] backed by a closure. See [`app_fn`].
pub struct FnApp<F> {
    f: F,
}

/// Wrap an async closure as an [`App`].
pub fn app_fn<F, Fut>(f: F) -> FnApp<F>
where
    F: Fn(Arc<Scope>, RequestReceiver, ResponseSender) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    FnApp { f }
}

impl<F, Fut> App for FnApp<F>
where
    F: Fn(Arc<Scope>, RequestReceiver, ResponseSender) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn call(
        &self,
        scope: Arc<Scope>,
        receive: RequestReceiver,
        send: ResponseSender,
    ) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin((self.f)(scope, receive, send))
    }
}

/// Inbound half handed to the application.
///
/// The first `recv()` yields the whole body. Later calls wait until the
/// response has completed (or can no longer be sent) and then yield
/// [`InboundEvent::Disconnect`].
pub struct RequestReceiver {
    body: Option<Bytes>,
    completed: watch::Receiver<bool>,
    cancel: CancelSignal,
}

impl RequestReceiver {
    fn new(body: Bytes, completed: watch::Receiver<bool>, cancel: CancelSignal) -> Self {
        Self {
            body: Some(body),
            completed,
            cancel,
        }
    }

    pub async fn recv(&mut self) -> GatewayResult<InboundEvent> {
        if *self.cancel.borrow() {
            return Err(GatewayError::Cancelled);
        }

        if let Some(body) = self.body.take() {
            trace!(bytes = body.len(), "delivering request body");
            return Ok(InboundEvent::Request {
                body,
                more_body: false,
            });
        }

        tokio::select! {
            _ = cancelled(&mut self.cancel) => Err(GatewayError::Cancelled),
            // A dropped sender means no response can follow either.
            _ = wait_until_set(&mut self.completed) => Ok(InboundEvent::Disconnect),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SendState {
    NotStarted,
    Streaming,
    Complete,
}

/// Outbound half handed to the application.
///
/// Rejects events that break the start-then-body order, so the
/// application sees protocol mistakes at the point it makes them.
pub struct ResponseSender {
    sink: EventSender<OutboundEvent>,
    state: SendState,
    completed: watch::Sender<bool>,
    cancel: CancelSignal,
}

impl ResponseSender {
    fn new(
        sink: EventSender<OutboundEvent>,
        completed: watch::Sender<bool>,
        cancel: CancelSignal,
    ) -> Self {
        Self {
            sink,
            state: SendState::NotStarted,
            completed,
            cancel,
        }
    }

    pub async fn send(&mut self, event: OutboundEvent) -> GatewayResult<()> {
        if *self.cancel.borrow() {
            return Err(GatewayError::Cancelled);
        }

        match (self.state, &event) {
            (SendState::Complete, _) => return Err(GatewayError::EventAfterComplete),
            (SendState::NotStarted, OutboundEvent::ResponseBody { .. }) => {
                return Err(GatewayError::BodyBeforeStart);
            }
            (SendState::Streaming, OutboundEvent::ResponseStart { .. }) => {
                return Err(GatewayError::DuplicateResponseStart);
            }
            _ => {}
        }

        let finished = event.is_final();
        trace!(kind = event.kind(), finished, "forwarding response event");
        self.sink.send(event)?;

        if finished {
            self.state = SendState::Complete;
            self.completed.send_replace(true);
        } else {
            self.state = SendState::Streaming;
        }

        // Let the collector drain the event before the application goes on.
        tokio::task::yield_now().await;
        Ok(())
    }

    /// Returns `true` once the final body chunk has been sent.
    pub fn is_complete(&self) -> bool {
        self.state == SendState::Complete
    }
}

/// Run `app` to completion for one call.
///
/// Outbound events go to `sink` in the order the application emits
/// them; `sink` is dropped when the application returns, which ends the
/// stream for the collector. Cancellation drops the application future
/// and returns [`GatewayError::Cancelled`].
pub async fn drive<A: App + ?Sized>(
    app: &A,
    scope: Arc<Scope>,
    body: Bytes,
    sink: EventSender<OutboundEvent>,
    cancel: CancelSignal,
) -> GatewayResult<()> {
    let (completed_tx, completed_rx) = watch::channel(false);
    let receive = RequestReceiver::new(body, completed_rx, cancel.clone());
    let send = ResponseSender::new(sink, completed_tx, cancel.clone());

    // `call` may panic before it returns a future.
    let call = AssertUnwindSafe(async move { app.call(scope, receive, send).await })
        .catch_unwind();
    let mut cancel = cancel;

    tokio::select! {
        biased;
        _ = cancelled(&mut cancel) => {
            debug!("call cancelled while application was running");
            Err(GatewayError::Cancelled)
        }
        outcome = call => match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(GatewayError::from_handler(err)),
            Err(panic) => Err(GatewayError::HandlerPanicked(panic_message(panic.as_ref()))),
        },
    }
}

/// Resolves once the signal fires. Pends forever if nobody can fire it.
async fn cancelled(signal: &mut CancelSignal) {
    if !wait_until_set(signal).await {
        std::future::pending::<()>().await;
    }
}

/// Wait for the flag to become `true`. Returns `false` if the sender
/// was dropped first.
async fn wait_until_set(flag: &mut watch::Receiver<bool>) -> bool {
    loop {
        if *flag.borrow_and_update() {
            return true;
        }
        if flag.changed().await.is_err() {
            return false;
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{channel, EventReceiver};

    fn no_cancel() -> (watch::Sender<bool>, CancelSignal) {
        watch::channel(false)
    }

    async fn drain(mut events: EventReceiver<OutboundEvent>) -> Vec<OutboundEvent> {
        let mut out = Vec::new();
        while let Some(event) = events.recv().await {
            out.push(event);
        }
        out
    }

    fn scope() -> Arc<Scope> {
        Arc::new(Scope::from_request(&crate::InboundRequest::new("GET", "/")))
    }

    #[tokio::test]
    async fn forwards_events_in_emission_order() {
        let app = app_fn(|_scope, _receive, mut send: ResponseSender| async move {
            send.send(OutboundEvent::start(200, [("content-type", "text/plain")]))
                .await?;
            send.send(OutboundEvent::body("foo", true)).await?;
            send.send(OutboundEvent::body("bar", false)).await?;
            anyhow::Ok(())
        });
        let (_tx, cancel) = no_cancel();
        let (sink, events) = channel();

        let (result, events) =
            tokio::join!(drive(&app, scope(), Bytes::new(), sink, cancel), drain(events));
        result.unwrap();

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].kind(), "http.response.start");
        assert_eq!(events[1], OutboundEvent::body("foo", true));
        assert_eq!(events[2], OutboundEvent::body("bar", false));
    }

    #[tokio::test]
    async fn receive_yields_body_once_then_disconnect() {
        let app = app_fn(
            |_scope, mut receive: RequestReceiver, mut send: ResponseSender| async move {
                let first = receive.recv().await?;
                assert_eq!(
                    first,
                    InboundEvent::Request {
                        body: Bytes::from_static(b"payload"),
                        more_body: false,
                    }
                );
                send.send(OutboundEvent::start(204, Vec::<(Bytes, Bytes)>::new()))
                    .await?;
                send.send(OutboundEvent::body("", false)).await?;
                assert_eq!(receive.recv().await?, InboundEvent::Disconnect);
                anyhow::Ok(())
            },
        );
        let (_tx, cancel) = no_cancel();
        let (sink, events) = channel();

        let (result, _) = tokio::join!(
            drive(&app, scope(), Bytes::from_static(b"payload"), sink, cancel),
            drain(events)
        );
        result.unwrap();
    }

    #[tokio::test]
    async fn sender_rejects_out_of_order_events() {
        let app = app_fn(|_scope, _receive, mut send: ResponseSender| async move {
            let err = send.send(OutboundEvent::body("early", false)).await.unwrap_err();
            assert!(matches!(err, GatewayError::BodyBeforeStart));

            send.send(OutboundEvent::start(200, Vec::<(Bytes, Bytes)>::new()))
                .await?;
            let err = send
                .send(OutboundEvent::start(500, Vec::<(Bytes, Bytes)>::new()))
                .await
                .unwrap_err();
            assert!(matches!(err, GatewayError::DuplicateResponseStart));

            send.send(OutboundEvent::body("done", false)).await?;
            assert!(send.is_complete());
            let err = send.send(OutboundEvent::body("late", false)).await.unwrap_err();
            assert!(matches!(err, GatewayError::EventAfterComplete));
            anyhow::Ok(())
        });
        let (_tx, cancel) = no_cancel();
        let (sink, events) = channel();

        let (result, events) =
            tokio::join!(drive(&app, scope(), Bytes::new(), sink, cancel), drain(events));
        result.unwrap();
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn handler_error_is_reported() {
        let app = app_fn(|_scope, _receive, _send| async move {
            Err::<(), _>(anyhow::anyhow!("lesson lookup failed"))
        });
        let (_tx, cancel) = no_cancel();
        let (sink, _events) = channel();

        let err = drive(&app, scope(), Bytes::new(), sink, cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Handler(_)));
        assert_eq!(err.to_string(), "lesson lookup failed");
    }

    #[tokio::test]
    async fn handler_panic_is_caught() {
        let app = app_fn(|_scope, _receive, _send| async move {
            if true {
                panic!("index out of range");
            }
            anyhow::Ok(())
        });
        let (_tx, cancel) = no_cancel();
        let (sink, _events) = channel();

        let err = drive(&app, scope(), Bytes::new(), sink, cancel)
            .await
            .unwrap_err();
        match err {
            GatewayError::HandlerPanicked(message) => assert_eq!(message, "index out of range"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancellation_aborts_a_stuck_application() {
        let app = app_fn(|_scope, mut receive: RequestReceiver, send| async move {
            let _send = send;
            receive.recv().await?;
            // Nothing completes the response, so this waits for cancellation.
            receive.recv().await?;
            anyhow::Ok(())
        });
        let (tx, cancel) = no_cancel();
        let (sink, _events) = channel();

        let run = drive(&app, scope(), Bytes::new(), sink, cancel);
        let trigger = async {
            tokio::task::yield_now().await;
            tx.send_replace(true);
        };
        let (result, ()) = tokio::join!(run, trigger);
        assert!(result.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn already_cancelled_call_does_not_run() {
        let app = app_fn(|_scope, _receive, mut send: ResponseSender| async move {
            send.send(OutboundEvent::start(200, Vec::<(Bytes, Bytes)>::new()))
                .await?;
            anyhow::Ok(())
        });
        let (_tx, cancel) = watch::channel(true);
        let (sink, events) = channel();

        let (result, events) =
            tokio::join!(drive(&app, scope(), Bytes::new(), sink, cancel), drain(events));
        assert!(result.unwrap_err().is_cancelled());
        assert!(events.is_empty());
    }
}
