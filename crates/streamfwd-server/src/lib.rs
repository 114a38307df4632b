//! # streamfwd-server
//!
//! Relays a server-streaming upstream to an HTTP client.
//!
//! - **Negotiation**: `Accept: text/event-stream` selects SSE framing, anything
//!   else newline-delimited JSON; `fields` selects a projection
//! - **Marshaling**: each message is sent as `{"result": ...}`, projected and
//!   framed per request
//! - **Dedup**: optional suppression of repeated messages per key
//! - **Keepalive**: `:\n` comment lines on idle SSE streams, serialized with
//!   payload writes
//! - **HTTP**: [`http::stream_response`] and [`http::unary_response`] build
//!   `axum` responses

#![deny(unsafe_code)]

pub mod dedup;
pub mod errors;
pub mod forwarder;
pub mod http;
pub mod keepalive;
pub mod marshaler;
pub mod negotiation;
pub mod receive;
pub mod test_utils;

pub use dedup::{DedupReceiver, MessageKeyFn};
pub use errors::{BoxError, ForwardError, Result};
pub use forwarder::{ForwardOutcome, ForwarderConfig, StreamForwarder, StreamState, marshal_unary};
pub use http::{stream_response, unary_response};
pub use keepalive::{KeepaliveHandle, SerializedWriter, Ticker, TickerFactory, with_keepalive};
pub use marshaler::{MessageMarshaler, ResultEnvelope};
pub use negotiation::Negotiation;
pub use receive::{BoxReceiver, Receive, StreamReceiver};
