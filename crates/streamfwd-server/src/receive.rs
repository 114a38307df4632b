//! The upstream "receive next message" contract.
//!
//! The forwarder pulls messages one at a time. `Ok(None)` is the
//! end-of-stream sentinel; any `Err` ends the stream.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::Serialize;

use crate::errors::{BoxError, ForwardError, Result};

/// A source of streamed messages.
#[async_trait]
pub trait Receive: Send {
    /// The message type produced by this source.
    type Message: Serialize + Send + Sync + 'static;

    /// Wait for the next message. `Ok(None)` means the stream ended cleanly.
    async fn recv(&mut self) -> Result<Option<Self::Message>>;
}

/// Type-erased receiver, used when layering wrappers at runtime.
pub type BoxReceiver<M> = Box<dyn Receive<Message = M>>;

#[async_trait]
impl<T: Receive + ?Sized> Receive for Box<T> {
    type Message = T::Message;

    async fn recv(&mut self) -> Result<Option<Self::Message>> {
        (**self).recv().await
    }
}

/// Adapts a `Stream` of results into a [`Receive`].
///
/// Stream errors become [`ForwardError::Transport`] with the stream error
/// as source.
#[derive(Debug)]
pub struct StreamReceiver<S> {
    inner: S,
}

impl<S> StreamReceiver<S> {
    /// Wrap a stream.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S, M, E> Receive for StreamReceiver<S>
where
    S: Stream<Item = std::result::Result<M, E>> + Unpin + Send,
    M: Serialize + Send + Sync + 'static,
    E: Into<BoxError> + Send,
{
    type Message = M;

    async fn recv(&mut self) -> Result<Option<M>> {
        match self.inner.next().await {
            None => Ok(None),
            Some(Ok(message)) => Ok(Some(message)),
            Some(Err(err)) => Err(ForwardError::Transport(err.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use futures::stream;

    #[tokio::test]
    async fn yields_messages_then_end_of_stream() {
        let mut rx = StreamReceiver::new(stream::iter(vec![
            Ok::<_, std::io::Error>(1),
            Ok(2),
        ]));
        assert_eq!(rx.recv().await.unwrap(), Some(1));
        assert_eq!(rx.recv().await.unwrap(), Some(2));
        assert_eq!(rx.recv().await.unwrap(), None);
    }

    #[tokio::test]
    async fn stream_error_becomes_transport() {
        let mut rx = StreamReceiver::new(stream::iter(vec![Err::<u8, _>(std::io::Error::other(
            "connection reset",
        ))]));
        let err = rx.recv().await.unwrap_err();
        assert_matches!(err, ForwardError::Transport(_));
        assert_eq!(err.to_string(), "connection reset");
    }

    #[tokio::test]
    async fn boxed_receiver_delegates() {
        let mut rx: BoxReceiver<&'static str> = Box::new(StreamReceiver::new(stream::iter(
            vec![Ok::<_, std::io::Error>("a")],
        )));
        assert_eq!(rx.recv().await.unwrap(), Some("a"));
        assert_eq!(rx.recv().await.unwrap(), None);
    }
}
