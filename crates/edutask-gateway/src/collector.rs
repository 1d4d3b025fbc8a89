//! Response collector.
//!
//! Reduces the outbound event stream of one call into a single
//! [`AssembledResponse`].
//!
//! ```text
//! AwaitingStart ──ResponseStart──► AwaitingBody ──final chunk / close()──► Done
//!                                    │    ▲
//!                                    └────┘ chunk with more_body
//! ```
//!
//! `finalize()` is only valid in `Done`. Earlier calls return an error
//! instead of a partial response.

use std::collections::BTreeMap;

use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::channel::EventReceiver;
use crate::error::{GatewayError, GatewayResult};
use crate::event::OutboundEvent;
use crate::response::AssembledResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingStart,
    AwaitingBody,
    Done,
}

#[derive(Debug)]
pub struct ResponseCollector {
    state: State,
    status: u16,
    headers: BTreeMap<String, String>,
    body: BytesMut,
}

impl Default for ResponseCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCollector {
    pub fn new() -> Self {
        Self {
            state: State::AwaitingStart,
            status: 200,
            headers: BTreeMap::new(),
            body: BytesMut::new(),
        }
    }

    pub fn on_event(&mut self, event: OutboundEvent) -> GatewayResult<()> {
        match (self.state, event) {
            (State::Done, _) => Err(GatewayError::EventAfterComplete),
            (State::AwaitingStart, OutboundEvent::ResponseStart { status, headers }) => {
                if !(100..=599).contains(&status) {
                    return Err(GatewayError::InvalidStatus(status));
                }
                self.status = status;
                for (name, value) in headers {
                    let name = decode_header(&name, "name")?.to_ascii_lowercase();
                    let value = decode_header(&value, "value")?;
                    self.headers.insert(name, value);
                }
                self.state = State::AwaitingBody;
                Ok(())
            }
            (State::AwaitingStart, OutboundEvent::ResponseBody { .. }) => {
                Err(GatewayError::BodyBeforeStart)
            }
            (State::AwaitingBody, OutboundEvent::ResponseStart { .. }) => {
                Err(GatewayError::DuplicateResponseStart)
            }
            (State::AwaitingBody, OutboundEvent::ResponseBody { body, more_body }) => {
                self.body.extend_from_slice(&body);
                if !more_body {
                    self.state = State::Done;
                }
                Ok(())
            }
        }
    }

    /// Mark the end of the event stream.
    ///
    /// A started response without a final chunk is complete with the
    /// chunks received so far. An unstarted one stays unstarted.
    pub fn close(&mut self) {
        if self.state == State::AwaitingBody {
            self.state = State::Done;
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    pub fn finalize(self) -> GatewayResult<AssembledResponse> {
        match self.state {
            State::AwaitingStart => Err(GatewayError::ResponseNotStarted),
            State::AwaitingBody => Err(GatewayError::ResponseIncomplete),
            State::Done => Ok(AssembledResponse::new(
                self.status,
                self.headers,
                self.body.freeze(),
            )),
        }
    }

    /// Consume `events` until the producer goes away, then finalize.
    pub async fn collect(
        mut self,
        mut events: EventReceiver<OutboundEvent>,
    ) -> GatewayResult<AssembledResponse> {
        while let Some(event) = events.recv().await {
            self.on_event(event)?;
        }
        self.close();
        debug!(
            status = self.status,
            bytes = self.body.len(),
            "response stream ended"
        );
        self.finalize()
    }
}

fn decode_header(raw: &Bytes, part: &str) -> GatewayResult<String> {
    String::from_utf8(raw.to_vec()).map_err(|_| {
        GatewayError::InvalidHeaderEncoding(format!(
            "header {part} is not valid UTF-8: {:?}",
            String::from_utf8_lossy(raw)
        ))
    })
}
