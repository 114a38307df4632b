//! Test doubles for driving the forwarder without a clock or a socket.
//!
//! [`ManualTicker`] fires only when told to and records resets; [`SharedBuf`]
//! is an in-memory sink whose contents can be read while a stream is running.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;

use crate::keepalive::{Ticker, TickerFactory};

/// A [`Ticker`] fired by hand.
///
/// Each [`fire`](Self::fire) queues exactly one tick. Resets are counted but
/// never cancel a tick that is already queued.
#[derive(Debug)]
pub struct ManualTicker {
    tx: mpsc::UnboundedSender<()>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<()>>,
    resets: AtomicUsize,
    stopped: AtomicBool,
}

impl ManualTicker {
    /// Create a ticker with no queued ticks.
    pub fn new() -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            tx,
            rx: tokio::sync::Mutex::new(rx),
            resets: AtomicUsize::new(0),
            stopped: AtomicBool::new(false),
        })
    }

    /// Queue one tick.
    pub fn fire(&self) {
        let _ = self.tx.send(());
    }

    /// Number of `reset` calls so far.
    pub fn reset_count(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    /// Whether `stop` has been called.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Factory handing out this ticker regardless of the requested period.
    pub fn factory(self: &Arc<Self>) -> TickerFactory {
        let ticker = Arc::clone(self);
        Arc::new(move |_period| Arc::clone(&ticker) as Arc<dyn Ticker>)
    }
}

#[async_trait]
impl Ticker for ManualTicker {
    async fn tick(&self) {
        let mut rx = self.rx.lock().await;
        if rx.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }

    fn reset(&self, _period: Duration) {
        let _ = self.resets.fetch_add(1, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// Cloneable in-memory [`AsyncWrite`] sink.
#[derive(Debug, Clone, Default)]
pub struct SharedBuf {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuf {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.inner.lock().clone()
    }

    /// Contents as text, replacing invalid UTF-8.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock()).into_owned()
    }
}

impl AsyncWrite for SharedBuf {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        self.inner.lock().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
