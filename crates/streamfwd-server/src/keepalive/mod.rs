//! Keepalive injection for idle SSE streams.
//!
//! [`with_keepalive`] wraps a response sink and a receiver. A background task
//! writes an SSE comment line (`:\n`) whenever the ticker fires, and every
//! real message received pushes the next tick out by a full interval. All
//! writes, keepalive or payload, go through one [`SerializedWriter`].

mod ticker;
mod writer;

pub use ticker::{IntervalTicker, Ticker, TickerFactory, interval_ticker_factory};
pub use writer::SerializedWriter;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWrite;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::receive::Receive;

/// SSE comment line written on each tick.
pub const KEEPALIVE_FRAME: &[u8] = b":\n";

/// Write a keepalive frame on every tick until `cancel` fires.
///
/// Write failures are logged and the loop keeps going; the stream context
/// decides when the task ends. The ticker is stopped on exit.
pub async fn run_keepalive<W>(
    writer: SerializedWriter<W>,
    ticker: Arc<dyn Ticker>,
    cancel: CancellationToken,
    writes: Arc<AtomicU64>,
) where
    W: AsyncWrite + Unpin + Send,
{
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = ticker.tick() => {
                match writer.write(KEEPALIVE_FRAME).await {
                    Ok(()) => {
                        let _ = writes.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(err) => warn!(error = %err, "keepalive write failed"),
                }
            }
        }
    }
    ticker.stop();
    debug!(writes = writes.load(Ordering::Relaxed), "keepalive task stopped");
}

/// Owns the background keepalive task of one stream.
#[derive(Debug)]
pub struct KeepaliveHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    writes: Arc<AtomicU64>,
}

impl KeepaliveHandle {
    /// Keepalive frames written so far.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Whether the background task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the task and wait for it. An in-flight keepalive write completes
    /// first. Returns the total number of keepalive frames written.
    pub async fn shutdown(self) -> u64 {
        self.cancel.cancel();
        if let Err(err) = self.task.await {
            warn!(error = %err, "keepalive task did not exit cleanly");
        }
        self.writes.load(Ordering::Relaxed)
    }
}

/// Receiver that postpones the next keepalive whenever a message arrives.
pub struct KeepaliveReceiver<R> {
    inner: R,
    ticker: Arc<dyn Ticker>,
    interval: Duration,
    ctx: CancellationToken,
}

#[async_trait]
impl<R: Receive> Receive for KeepaliveReceiver<R> {
    type Message = R::Message;

    async fn recv(&mut self) -> Result<Option<Self::Message>> {
        let received = self.inner.recv().await;
        if matches!(received, Ok(Some(_))) && !self.ctx.is_cancelled() {
            self.ticker.reset(self.interval);
        }
        received
    }
}

/// Layer keepalive injection over `writer` and `recv`.
///
/// Returns the write-serializing sink to use for payload writes, the wrapped
/// receiver, and the handle owning the background task. The task runs under
/// a child of `ctx`, so cancelling the stream stops it and
/// [`KeepaliveHandle::shutdown`] can stop it on its own.
pub fn with_keepalive<W, R>(
    ctx: &CancellationToken,
    writer: W,
    recv: R,
    interval: Duration,
    factory: &TickerFactory,
) -> (SerializedWriter<W>, KeepaliveReceiver<R>, KeepaliveHandle)
where
    W: AsyncWrite + Unpin + Send + 'static,
    R: Receive,
{
    let writer = SerializedWriter::new(writer);
    let ticker = factory(interval);
    let cancel = ctx.child_token();
    let writes = Arc::new(AtomicU64::new(0));

    let task = tokio::spawn(run_keepalive(
        writer.clone(),
        Arc::clone(&ticker),
        cancel.clone(),
        Arc::clone(&writes),
    ));
    debug!(interval_ms = interval.as_millis(), "keepalive task started");

    let recv = KeepaliveReceiver {
        inner: recv,
        ticker,
        interval,
        ctx: ctx.clone(),
    };
    let handle = KeepaliveHandle {
        cancel,
        task,
        writes,
    };
    (writer, recv, handle)
}
