//! Lock-guarded response sink shared by payload and keepalive writes.

use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Shared handle that serializes writes to one response body.
///
/// Payload chunks and keepalive frames go through the same lock, so a frame
/// never lands inside another write.
#[derive(Debug)]
pub struct SerializedWriter<W> {
    inner: Arc<Mutex<W>>,
}

impl<W> Clone for SerializedWriter<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W: AsyncWrite + Unpin + Send> SerializedWriter<W> {
    /// Take ownership of `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(writer)),
        }
    }

    /// Write `buf` in full and flush.
    pub async fn write(&self, buf: &[u8]) -> std::io::Result<()> {
        self.write_parts(&[buf]).await
    }

    /// Write each part in order under a single lock acquisition, then flush.
    pub async fn write_parts(&self, parts: &[&[u8]]) -> std::io::Result<()> {
        let mut writer = self.inner.lock().await;
        for part in parts {
            writer.write_all(part).await?;
        }
        writer.flush().await
    }
}
