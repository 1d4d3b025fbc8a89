//! edutask-gateway — function-runtime adapter for the EduTask API.
//!
//! The hosting runtime hands over one request with its body already
//! buffered and wants one response back. The application speaks the
//! asynchronous gateway protocol instead: it receives a [`Scope`], pulls
//! [`InboundEvent`]s and pushes [`OutboundEvent`]s. This crate bridges
//! the two.
//!
//! # Architecture
//!
//! ```text
//! InboundRequest
//!   │
//!   ▼
//! Adapter::handle
//!   ├── Scope::from_request
//!   ├── channel()  ── EventSender ──► ResponseSender (handed to the app)
//!   │             └─ EventReceiver ─► ResponseCollector
//!   ├── try_join!(drive(app, ...), collector.collect(...))
//!   │
//!   ▼
//! AssembledResponse   (or a 500 JSON error response)
//! ```
//!
//! Everything is created per call and joined inside the `handle` future.
//! Nothing is spawned, so dropping the future cancels the whole call.

pub mod adapter;
pub mod channel;
pub mod collector;
pub mod driver;
mod error;
mod event;
mod request;
mod response;
mod scope;

pub use adapter::Adapter;
pub use channel::{EventReceiver, EventSender};
pub use collector::ResponseCollector;
pub use driver::{app_fn, App, BoxFuture, CancelSignal, FnApp, RequestReceiver, ResponseSender};
pub use error::{GatewayError, GatewayResult};
pub use event::{InboundEvent, OutboundEvent};
pub use request::InboundRequest;
pub use response::AssembledResponse;
pub use scope::{Scope, ScopeKind};
