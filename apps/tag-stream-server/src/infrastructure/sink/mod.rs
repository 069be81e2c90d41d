//! Channel Sink
//!
//! [`TagSink`] adapter feeding a streamed HTTP response body. Written bytes
//! accumulate locally; each flush hands them to the body as one chunk over
//! a bounded channel. A closed channel means the body (and with it the
//! client connection) has been dropped.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::sync::mpsc;

use crate::application::ports::{SinkError, TagSink};

/// One chunk of a streamed response body.
pub type BodyChunk = Result<Bytes, std::io::Error>;

/// Sink writing into the sending half of a body channel.
pub struct ChannelSink {
    tx: mpsc::Sender<BodyChunk>,
    pending: BytesMut,
}

impl ChannelSink {
    /// Wrap the sending half of a body channel.
    #[must_use]
    pub fn new(tx: mpsc::Sender<BodyChunk>) -> Self {
        Self {
            tx,
            pending: BytesMut::with_capacity(1024),
        }
    }

    /// End the body with an error so the client sees a broken transfer
    /// rather than a silently truncated document.
    pub async fn abort(&mut self, message: String) {
        self.pending.clear();
        let _ = self.tx.send(Err(std::io::Error::other(message))).await;
    }
}

#[async_trait]
impl TagSink for ChannelSink {
    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        if self.tx.is_closed() {
            return Err(SinkError::Disconnected);
        }
        self.pending.extend_from_slice(bytes);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let chunk = self.pending.split().freeze();
        self.tx
            .send(Ok(chunk))
            .await
            .map_err(|_| SinkError::Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn flush_sends_one_chunk() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut sink = ChannelSink::new(tx);

        sink.write_all(b"{\"tags\": [").await.unwrap();
        sink.write_all(b"]}").await.unwrap();
        sink.flush().await.unwrap();
        sink.flush().await.unwrap();
        drop(sink);

        assert_eq!(rx.recv().await.unwrap().unwrap(), Bytes::from_static(b"{\"tags\": []}"));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn dropped_receiver_is_a_disconnect() {
        let (tx, rx) = mpsc::channel(4);
        let mut sink = ChannelSink::new(tx);
        drop(rx);

        assert!(matches!(
            sink.write_all(b"x").await,
            Err(SinkError::Disconnected)
        ));
        sink.pending.extend_from_slice(b"x");
        assert!(matches!(sink.flush().await, Err(SinkError::Disconnected)));
    }

    #[tokio::test]
    async fn abort_sends_error_chunk() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut sink = ChannelSink::new(tx);

        sink.write_all(b"partial").await.unwrap();
        sink.abort("error reading XML".to_string()).await;

        let err = rx.recv().await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "error reading XML");
    }
}
