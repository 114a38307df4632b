//! Stream forwarding loop.
//!
//! [`StreamForwarder::forward`] drives one stream through
//! `Negotiating → Streaming → Draining → Closed`: it layers dedup and
//! keepalive over the receiver as configured, then writes one marshaled
//! `{"result": ...}` chunk per message until the upstream ends, fails, or the
//! stream context is cancelled.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use streamfwd_core::Projection;
use streamfwd_settings::ForwarderSettings;
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::dedup::{DedupReceiver, MessageKeyFn};
use crate::errors::{ForwardError, Result};
use crate::keepalive::{SerializedWriter, TickerFactory, interval_ticker_factory, with_keepalive};
use crate::marshaler::{MessageMarshaler, ResultEnvelope};
use crate::negotiation::Negotiation;
use crate::receive::{BoxReceiver, Receive};

/// Lifecycle of one forwarded stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Framing and projection are being decided.
    Negotiating,
    /// Messages are being forwarded.
    Streaming,
    /// The loop ended; background work is being stopped.
    Draining,
    /// No further writes.
    Closed,
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Negotiating => "negotiating",
            Self::Streaming => "streaming",
            Self::Draining => "draining",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Runtime knobs for [`StreamForwarder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwarderConfig {
    /// Inject keepalives into SSE streams.
    pub keepalive_enabled: bool,
    /// Idle time before a keepalive is written.
    pub keepalive_interval: Duration,
}

impl From<&ForwarderSettings> for ForwarderConfig {
    fn from(settings: &ForwarderSettings) -> Self {
        Self {
            keepalive_enabled: settings.keepalive.enabled,
            keepalive_interval: settings.keepalive.interval(),
        }
    }
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self::from(&ForwarderSettings::default())
    }
}

/// Counters reported when a stream ends cleanly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwardOutcome {
    /// Messages written to the sink.
    pub messages: u64,
    /// Keepalive frames written to the sink.
    pub keepalives: u64,
}

/// Forwards streamed messages of type `M` to HTTP response sinks.
///
/// One forwarder is shared by every request of a route; per-stream state
/// lives inside [`forward`](Self::forward).
pub struct StreamForwarder<M> {
    message_key: Option<MessageKeyFn<M>>,
    config: ForwarderConfig,
    ticker_factory: TickerFactory,
}

impl<M> fmt::Debug for StreamForwarder<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamForwarder")
            .field("dedup", &self.message_key.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<M> StreamForwarder<M>
where
    M: Serialize + Send + Sync + 'static,
{
    /// Create a forwarder without dedup, using the real clock for keepalives.
    pub fn new(config: ForwarderConfig) -> Self {
        Self {
            message_key: None,
            config,
            ticker_factory: interval_ticker_factory(),
        }
    }

    /// Create a forwarder from loaded settings.
    pub fn from_settings(settings: &ForwarderSettings) -> Self {
        Self::new(ForwarderConfig::from(settings))
    }

    /// Suppress consecutive duplicates per key computed by `key_of`.
    #[must_use]
    pub fn with_message_key(mut self, key_of: MessageKeyFn<M>) -> Self {
        self.message_key = Some(key_of);
        self
    }

    /// Replace the keepalive ticker source.
    #[must_use]
    pub fn with_ticker_factory(mut self, factory: TickerFactory) -> Self {
        self.ticker_factory = factory;
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &ForwarderConfig {
        &self.config
    }

    /// Forward every message from `recv` to `writer`.
    ///
    /// Returns the outcome on clean end-of-stream. Any other ending, including
    /// cancellation of `ctx`, is returned as an error after the keepalive task
    /// has been joined.
    pub async fn forward<R, W>(
        &self,
        ctx: &CancellationToken,
        negotiation: &Negotiation,
        recv: R,
        writer: W,
    ) -> Result<ForwardOutcome>
    where
        R: Receive<Message = M> + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let mut state = StreamState::Negotiating;
        let marshaler = negotiation.marshaler();

        let mut recv: BoxReceiver<M> = Box::new(recv);
        if let Some(key_of) = &self.message_key {
            recv = Box::new(DedupReceiver::new(
                recv,
                Arc::clone(key_of),
                marshaler.clone(),
                ctx.clone(),
            ));
        }

        let (writer, mut recv, keepalive) =
            if marshaler.is_sse() && self.config.keepalive_enabled {
                let (writer, recv, handle) = with_keepalive(
                    ctx,
                    writer,
                    recv,
                    self.config.keepalive_interval,
                    &self.ticker_factory,
                );
                (writer, Box::new(recv) as BoxReceiver<M>, Some(handle))
            } else {
                (SerializedWriter::new(writer), recv, None)
            };

        transition(&mut state, StreamState::Streaming);
        let mut messages = 0u64;
        let ended = loop {
            let next = tokio::select! {
                biased;
                () = ctx.cancelled() => Err(ForwardError::Cancelled),
                next = recv.recv() => next,
            };
            match next {
                Ok(Some(message)) => {
                    if let Err(err) = write_message(&marshaler, &writer, &message).await {
                        break Err(err);
                    }
                    messages += 1;
                }
                Ok(None) => break Ok(()),
                Err(err) => break Err(err),
            }
        };

        transition(&mut state, StreamState::Draining);
        let keepalives = match keepalive {
            Some(handle) => handle.shutdown().await,
            None => 0,
        };
        transition(&mut state, StreamState::Closed);

        match ended {
            Ok(()) => {
                debug!(messages, keepalives, "stream completed");
                Ok(ForwardOutcome {
                    messages,
                    keepalives,
                })
            }
            Err(err) if err.is_cancelled() => {
                debug!(messages, keepalives, "stream cancelled");
                Err(err)
            }
            Err(err) => {
                warn!(messages, keepalives, error = %err, "stream ended with error");
                Err(err)
            }
        }
    }
}

async fn write_message<M, W>(
    marshaler: &MessageMarshaler,
    writer: &SerializedWriter<W>,
    message: &M,
) -> Result<()>
where
    M: Serialize + Sync,
    W: AsyncWrite + Unpin + Send,
{
    let chunk = marshaler.marshal(&ResultEnvelope::new(message))?;
    writer.write_parts(&[chunk.as_slice(), marshaler.delimiter()]).await?;
    Ok(())
}

fn transition(state: &mut StreamState, next: StreamState) {
    debug!(from = %state, to = %next, "stream state");
    *state = next;
}

/// Marshal a single response with `projection`. No envelope, never SSE.
pub fn marshal_unary<M: Serialize + ?Sized>(projection: &Projection, message: &M) -> Result<Vec<u8>> {
    MessageMarshaler::new(projection.clone(), false).marshal(message)
}
