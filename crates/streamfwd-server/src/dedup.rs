//! Suppression of repeated messages.
//!
//! Watch-style upstreams often resend an object that did not change. The
//! [`DedupReceiver`] remembers, per application key, the last payload it let
//! through and skips messages whose marshaled bytes match it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::errors::{BoxError, ForwardError, Result};
use crate::marshaler::{MessageMarshaler, ResultEnvelope};
use crate::receive::Receive;

/// Computes the dedup key of a message.
pub type MessageKeyFn<M> = Arc<dyn Fn(&M) -> std::result::Result<String, BoxError> + Send + Sync>;

/// Wraps a receiver and drops messages identical to the last one seen under
/// the same key.
pub struct DedupReceiver<R: Receive> {
    inner: R,
    key_of: MessageKeyFn<R::Message>,
    marshaler: MessageMarshaler,
    cancel: CancellationToken,
    last_by_key: HashMap<String, Vec<u8>>,
}

impl<R: Receive> DedupReceiver<R> {
    /// Wrap `inner`.
    ///
    /// Payloads are compared in the form `marshaler` produces, so two messages
    /// that differ only in projected-away fields count as duplicates.
    pub fn new(
        inner: R,
        key_of: MessageKeyFn<R::Message>,
        marshaler: MessageMarshaler,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            inner,
            key_of,
            marshaler,
            cancel,
            last_by_key: HashMap::new(),
        }
    }

    /// Number of distinct keys seen so far.
    pub fn tracked_keys(&self) -> usize {
        self.last_by_key.len()
    }
}

#[async_trait]
impl<R: Receive> Receive for DedupReceiver<R> {
    type Message = R::Message;

    async fn recv(&mut self) -> Result<Option<Self::Message>> {
        loop {
            if self.cancel.is_cancelled() {
                return Err(ForwardError::Cancelled);
            }

            let Some(message) = self.inner.recv().await? else {
                return Ok(None);
            };
            let key = (self.key_of)(&message).map_err(ForwardError::MessageKey)?;
            let data = self.marshaler.marshal(&ResultEnvelope::new(&message))?;

            if self.last_by_key.get(&key).is_some_and(|prev| *prev == data) {
                trace!(key = %key, "suppressed duplicate message");
                continue;
            }
            let _ = self.last_by_key.insert(key, data);
            return Ok(Some(message));
        }
    }
}
