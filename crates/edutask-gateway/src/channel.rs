//! Per-call event channel.
//!
//! A single-writer, single-reader ordered queue. The sender is not
//! `Clone`, so there is exactly one producer; dropping it ends the
//! stream for the reader.

use tokio::sync::mpsc;

use crate::error::{GatewayError, GatewayResult};

/// Create a fresh channel for one call.
pub fn channel<T>() -> (EventSender<T>, EventReceiver<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { inner: tx }, EventReceiver { inner: rx })
}

/// Producer half. Sends never wait; ordering is preserved.
#[derive(Debug)]
pub struct EventSender<T> {
    inner: mpsc::UnboundedSender<T>,
}

impl<T> EventSender<T> {
    /// Queue an event. Fails only if the receiver has been dropped.
    pub fn send(&self, event: T) -> GatewayResult<()> {
        self.inner
            .send(event)
            .map_err(|_| GatewayError::ChannelClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

/// Consumer half.
#[derive(Debug)]
pub struct EventReceiver<T> {
    inner: mpsc::UnboundedReceiver<T>,
}

impl<T> EventReceiver<T> {
    /// Wait for the next event. Returns `None` once the sender is gone
    /// and every queued event has been delivered.
    pub async fn recv(&mut self) -> Option<T> {
        self.inner.recv().await
    }
}
